//! Wire codec: [`SpecDocument`] to and from the portable JSON document.
//!
//! The codec performs no I/O. Top-level sections are typed; entries inside
//! them stay as raw JSON until decoded so one malformed entry is dropped with
//! a diagnostic instead of failing the whole document.

use std::borrow::Cow;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;
use crate::report::{EnumDiagnosticKind, ReportDiagnostics};
use crate::spec::{
    EnumBorderLine, EnumCell, EnumFillPattern, EnumHorizontalAlign, EnumPageOrientation,
    EnumVerticalAlign, SpecAlignmentStyle, SpecBorderStyle, SpecCellStyle, SpecDocument,
    SpecEncodeOptions, SpecFillStyle, SpecFontStyle, SpecOutlineEntry, SpecSheet,
    SpecSheetDimensions,
};
use crate::util::{
    derive_cell_ref, derive_column_label, derive_style_key, parse_column_label, parse_range_ref,
    parse_row_number, parse_style_key, parse_temporal,
};

/// Largest magnitude emitted as a JSON integer.
const N_INTEGRAL_EXACT_MAX: f64 = 9_007_199_254_740_992.0;

////////////////////////////////////////////////////////////////////////////////
// #region WireModel

/// Top-level wire document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireDocument {
    pub source_file: Option<String>,
    pub sheet_count: Option<u64>,
    /// Sheet name to row-major grid. Required on decode.
    pub sheets: Option<IndexMap<String, Value>>,
    /// Sheet name to [`WireGroupingInfo`].
    pub grouping_info: Option<IndexMap<String, Value>>,
    /// Sheet name to [`WireFormattingInfo`].
    pub formatting_info: Option<IndexMap<String, Value>>,
    /// Sheet name to `[row_count, column_count]`.
    pub sheet_dimensions: Option<IndexMap<String, Value>>,
}

/// Outline levels of one sheet, sign-encoded (`-L` means hidden at level `L`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireGroupingInfo {
    /// Legacy list, always emitted empty and ignored on decode.
    pub row_groups: Option<Vec<Value>>,
    /// Legacy list, always emitted empty and ignored on decode.
    pub column_groups: Option<Vec<Value>>,
    /// 1-based row number to signed level.
    pub row_outline_levels: Option<IndexMap<String, Value>>,
    /// Column letters to signed level.
    pub column_outline_levels: Option<IndexMap<String, Value>>,
}

/// Styles, merges and sheet properties of one sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireFormattingInfo {
    /// `"<row>_<col letters>"` to [`WireCellFormat`].
    pub cell_formats: Option<IndexMap<String, Value>>,
    pub merged_cells: Option<Vec<Value>>,
    pub sheet_properties: Option<WireSheetProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireSheetProperties {
    /// `visible`, `hidden` or `veryHidden`.
    pub sheet_state: Option<String>,
    pub page_setup: Option<WirePageSetup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WirePageSetup {
    pub orientation: Option<String>,
    #[serde(rename = "paperSize")]
    pub paper_size: Option<Value>,
}

/// One styled cell. Absent components are not emitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireCellFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<WireFont>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<WireFill>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<WireBorder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<WireAlignment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireFont {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireFill {
    #[serde(rename = "patternType")]
    pub pattern_type: Option<String>,
    #[serde(rename = "fgColor")]
    pub fg_color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireBorder {
    pub left: Option<String>,
    pub right: Option<String>,
    pub top: Option<String>,
    pub bottom: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireAlignment {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Encode

/// Encode a document into its wire form.
///
/// Every sheet gets a grouping, formatting and dimensions entry. Outline
/// entries are sign-encoded; empty styles are never emitted.
pub fn encode(document: &SpecDocument) -> Result<WireDocument, serde_json::Error> {
    let mut dict_sheets = IndexMap::new();
    let mut dict_grouping = IndexMap::new();
    let mut dict_formatting = IndexMap::new();
    let mut dict_dimensions = IndexMap::new();

    for sheet in document.sheets() {
        let l_rows: Vec<Value> = sheet
            .grid
            .iter()
            .map(|row| Value::Array(row.iter().map(derive_value_from_cell).collect()))
            .collect();
        dict_sheets.insert(sheet.name.clone(), Value::Array(l_rows));
        dict_grouping.insert(
            sheet.name.clone(),
            serde_json::to_value(derive_wire_grouping(sheet))?,
        );
        dict_formatting.insert(
            sheet.name.clone(),
            serde_json::to_value(derive_wire_formatting(sheet))?,
        );
        dict_dimensions.insert(
            sheet.name.clone(),
            Value::from(vec![sheet.dimensions.n_rows, sheet.dimensions.n_cols]),
        );
    }

    Ok(WireDocument {
        source_file: Some(document.source_identifier().to_string()),
        sheet_count: Some(document.sheets().len() as u64),
        sheets: Some(dict_sheets),
        grouping_info: Some(dict_grouping),
        formatting_info: Some(dict_formatting),
        sheet_dimensions: Some(dict_dimensions),
    })
}

/// Serialize a wire document to JSON text.
pub fn to_json_string(
    wire: &WireDocument,
    options: &SpecEncodeOptions,
) -> Result<String, serde_json::Error> {
    if options.if_pretty {
        serde_json::to_string_pretty(wire)
    } else {
        serde_json::to_string(wire)
    }
}

/// Encode a document straight to JSON text.
pub fn encode_to_string(
    document: &SpecDocument,
    options: &SpecEncodeOptions,
) -> Result<String, serde_json::Error> {
    to_json_string(&encode(document)?, options)
}

fn derive_value_from_cell(cell: &EnumCell) -> Value {
    match cell {
        EnumCell::Empty => Value::Null,
        EnumCell::Text(val) | EnumCell::Temporal(val) => Value::String(val.clone()),
        EnumCell::Boolean(val) => Value::Bool(*val),
        EnumCell::Number(val) => {
            if val.fract() == 0.0 && val.abs() < N_INTEGRAL_EXACT_MAX {
                Value::from(*val as i64)
            } else {
                // Non-finite numbers have no JSON form.
                serde_json::Number::from_f64(*val).map_or(Value::Null, Value::Number)
            }
        }
    }
}

fn derive_wire_grouping(sheet: &SpecSheet) -> WireGroupingInfo {
    WireGroupingInfo {
        row_groups: Some(Vec::new()),
        column_groups: Some(Vec::new()),
        row_outline_levels: Some(
            sheet
                .row_outline
                .iter()
                .map(|(row_idx, entry)| ((row_idx + 1).to_string(), Value::from(entry.to_signed())))
                .collect(),
        ),
        column_outline_levels: Some(
            sheet
                .column_outline
                .iter()
                .map(|(col_idx, entry)| (derive_column_label(*col_idx), Value::from(entry.to_signed())))
                .collect(),
        ),
    }
}

fn derive_wire_formatting(sheet: &SpecSheet) -> WireFormattingInfo {
    let dict_formats: IndexMap<String, Value> = sheet
        .cell_styles
        .iter()
        .filter_map(|((row_idx, col_idx), spec_style)| {
            let wire_format = derive_wire_cell_format(spec_style);
            serde_json::to_value(wire_format)
                .ok()
                .map(|value| (derive_style_key(*row_idx, *col_idx), value))
        })
        .collect();

    let props = &sheet.sheet_properties;
    WireFormattingInfo {
        cell_formats: Some(dict_formats),
        merged_cells: Some(
            sheet
                .merged_ranges
                .iter()
                .map(|range_ref| Value::String(range_ref.to_string()))
                .collect(),
        ),
        sheet_properties: Some(WireSheetProperties {
            sheet_state: Some(if props.is_visible { "visible" } else { "hidden" }.to_string()),
            page_setup: Some(WirePageSetup {
                orientation: props.orientation.as_token().map(str::to_string),
                paper_size: props.paper_size.map(Value::from),
            }),
        }),
    }
}

fn derive_wire_cell_format(spec_style: &SpecCellStyle) -> WireCellFormat {
    WireCellFormat {
        font: spec_style.font.as_ref().map(|font| WireFont {
            name: font.name.clone(),
            size: font.size,
            bold: font.bold,
            italic: font.italic,
            color: font.color.clone(),
        }),
        fill: spec_style.fill.as_ref().map(|fill| WireFill {
            pattern_type: fill.pattern_kind.map(|p| p.as_str().to_string()),
            fg_color: fill.foreground_color.clone(),
        }),
        border: spec_style.border.as_ref().map(|border| WireBorder {
            left: border.left.map(|v| v.as_str().to_string()),
            right: border.right.map(|v| v.as_str().to_string()),
            top: border.top.map(|v| v.as_str().to_string()),
            bottom: border.bottom.map(|v| v.as_str().to_string()),
        }),
        alignment: spec_style.alignment.as_ref().map(|alignment| WireAlignment {
            horizontal: alignment.horizontal.map(|v| v.as_str().to_string()),
            vertical: alignment.vertical.map(|v| v.as_str().to_string()),
        }),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Decode

/// Decode JSON text.
pub fn decode_str(text: &str) -> Result<(SpecDocument, ReportDiagnostics), DecodeError> {
    decode_slice(text.as_bytes())
}

/// Decode JSON bytes.
///
/// Bare `NaN`, `Infinity` and `-Infinity` tokens, as written by legacy
/// producers, are read as `null`.
pub fn decode_slice(bytes: &[u8]) -> Result<(SpecDocument, ReportDiagnostics), DecodeError> {
    let v_json = replace_non_finite_tokens(bytes);
    if let Cow::Owned(_) = v_json {
        log::debug!("Non-finite number tokens read as null.");
    }
    decode_value(serde_json::from_slice(&v_json)?)
}

/// Decode a parsed JSON value.
///
/// A top-level section of the wrong JSON type is ignored with a diagnostic;
/// only a missing or unusable `sheets` collection is fatal.
pub fn decode_value(value: Value) -> Result<(SpecDocument, ReportDiagnostics), DecodeError> {
    let mut dict_root: serde_json::Map<String, Value> = serde_json::from_value(value)?;
    let mut report = ReportDiagnostics::default();

    let sheets = match dict_root.remove("sheets") {
        None | Some(Value::Null) => return Err(DecodeError::MissingSheets),
        Some(value_sheets) => Some(serde_json::from_value(value_sheets)?),
    };
    let wire = WireDocument {
        source_file: derive_wire_section(&mut dict_root, "source_file", &mut report),
        sheet_count: derive_wire_section(&mut dict_root, "sheet_count", &mut report),
        sheets,
        grouping_info: derive_wire_section(&mut dict_root, "grouping_info", &mut report),
        formatting_info: derive_wire_section(&mut dict_root, "formatting_info", &mut report),
        sheet_dimensions: derive_wire_section(&mut dict_root, "sheet_dimensions", &mut report),
    };
    decode_wire(wire, report)
}

/// Decode a wire document.
///
/// A missing `sheets` collection is fatal. Everything else degrades:
/// malformed entries and references to unknown sheets are dropped with a
/// diagnostic.
pub fn decode(wire: WireDocument) -> Result<(SpecDocument, ReportDiagnostics), DecodeError> {
    decode_wire(wire, ReportDiagnostics::default())
}

fn decode_wire(
    wire: WireDocument,
    mut report: ReportDiagnostics,
) -> Result<(SpecDocument, ReportDiagnostics), DecodeError> {
    let dict_sheets = wire.sheets.ok_or(DecodeError::MissingSheets)?;

    let mut dict_grouping = wire.grouping_info.unwrap_or_default();
    let mut dict_formatting = wire.formatting_info.unwrap_or_default();
    let mut dict_dimensions = wire.sheet_dimensions.unwrap_or_default();

    let mut l_sheets = Vec::with_capacity(dict_sheets.len());
    for (c_sheet_name, value_grid) in dict_sheets {
        let mut sheet = SpecSheet::new(c_sheet_name.clone());
        sheet.grid = derive_grid_from_value(&value_grid, &c_sheet_name, &mut report);
        let (n_rows_grid, n_cols_grid) = sheet.grid_extent();
        sheet.dimensions = SpecSheetDimensions {
            n_rows: n_rows_grid,
            n_cols: n_cols_grid,
        };

        if let Some(value_dims) = dict_dimensions.shift_remove(&c_sheet_name) {
            apply_wire_dimensions(&mut sheet, &value_dims, &mut report);
        }
        if let Some(value_grouping) = dict_grouping.shift_remove(&c_sheet_name) {
            apply_wire_grouping(&mut sheet, value_grouping, &mut report);
        }
        if let Some(value_formatting) = dict_formatting.shift_remove(&c_sheet_name) {
            apply_wire_formatting(&mut sheet, value_formatting, &mut report);
        }
        l_sheets.push(sheet);
    }

    for (c_section, dict_left) in [
        ("grouping_info", dict_grouping),
        ("formatting_info", dict_formatting),
        ("sheet_dimensions", dict_dimensions),
    ] {
        for c_sheet_name in dict_left.keys() {
            report.record(
                EnumDiagnosticKind::UnknownSheetReference,
                Some(c_sheet_name),
                Some(c_section.to_string()),
                "Sheet not present in the sheet collection; entry dropped.",
            );
        }
    }

    if let Some(n_sheet_count) = wire.sheet_count
        && n_sheet_count != l_sheets.len() as u64
    {
        log::debug!(
            "Recorded sheet_count {n_sheet_count} differs from {} decoded sheet(s).",
            l_sheets.len()
        );
    }

    let document = SpecDocument::new(
        wire.source_file.unwrap_or_default(),
        l_sheets,
        &mut report,
    )?;
    Ok((document, report))
}

/// Take one optional top-level section; `null` is absent, a wrong type is reported.
fn derive_wire_section<T: DeserializeOwned>(
    dict_root: &mut serde_json::Map<String, Value>,
    key: &str,
    report: &mut ReportDiagnostics,
) -> Option<T> {
    let value = dict_root.remove(key)?;
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(val) => Some(val),
        Err(e) => {
            report.record(
                EnumDiagnosticKind::MalformedWireEntry,
                None,
                Some(key.to_string()),
                format!("Top-level section unreadable: {e}; ignored."),
            );
            None
        }
    }
}

/// Rewrite bare non-finite number tokens outside strings to `null`.
fn replace_non_finite_tokens(bytes: &[u8]) -> Cow<'_, [u8]> {
    const TUP_NON_FINITE: [&[u8]; 3] = [b"-Infinity", b"Infinity", b"NaN"];

    let mut v_out: Option<Vec<u8>> = None;
    let mut if_in_string = false;
    let mut if_escaped = false;
    let mut idx = 0;
    while idx < bytes.len() {
        let byte = bytes[idx];
        if if_in_string {
            if if_escaped {
                if_escaped = false;
            } else if byte == b'\\' {
                if_escaped = true;
            } else if byte == b'"' {
                if_in_string = false;
            }
        } else if byte == b'"' {
            if_in_string = true;
        } else if let Some(token) = TUP_NON_FINITE
            .iter()
            .copied()
            .find(|token| bytes[idx..].starts_with(token))
        {
            v_out
                .get_or_insert_with(|| bytes[..idx].to_vec())
                .extend_from_slice(b"null");
            idx += token.len();
            continue;
        }
        if let Some(v_out) = v_out.as_mut() {
            v_out.push(byte);
        }
        idx += 1;
    }

    match v_out {
        Some(v_out) => Cow::Owned(v_out),
        None => Cow::Borrowed(bytes),
    }
}

fn derive_grid_from_value(
    value: &Value,
    sheet_name: &str,
    report: &mut ReportDiagnostics,
) -> Vec<Vec<EnumCell>> {
    let l_rows = match value {
        Value::Array(l_rows) => l_rows,
        Value::Null => return Vec::new(),
        _ => {
            report.record(
                EnumDiagnosticKind::MalformedWireEntry,
                Some(sheet_name),
                None,
                "Sheet grid is not an array; captured as empty.",
            );
            return Vec::new();
        }
    };

    let mut grid = Vec::with_capacity(l_rows.len());
    for (row_idx, value_row) in l_rows.iter().enumerate() {
        let Value::Array(l_values) = value_row else {
            report.record(
                EnumDiagnosticKind::MalformedWireEntry,
                Some(sheet_name),
                Some((row_idx + 1).to_string()),
                "Row is not an array; kept as an empty row.",
            );
            grid.push(Vec::new());
            continue;
        };
        let l_cells = l_values
            .iter()
            .enumerate()
            .map(|(col_idx, value_cell)| {
                derive_cell_from_value(value_cell).unwrap_or_else(|| {
                    report.record(
                        EnumDiagnosticKind::MalformedWireEntry,
                        Some(sheet_name),
                        Some(derive_cell_ref(row_idx, col_idx)),
                        "Nested value is not a cell; captured as empty.",
                    );
                    EnumCell::Empty
                })
            })
            .collect();
        grid.push(l_cells);
    }
    grid
}

/// Wire value to a cell; `None` for arrays and objects.
///
/// Strings in the exact canonical temporal form decode as temporal cells.
fn derive_cell_from_value(value: &Value) -> Option<EnumCell> {
    let cell = match value {
        Value::Null => EnumCell::Empty,
        Value::Bool(val) => EnumCell::Boolean(*val),
        Value::Number(val) => EnumCell::Number(val.as_f64()?),
        Value::String(val) if parse_temporal(val).is_some() => EnumCell::Temporal(val.clone()),
        Value::String(val) => EnumCell::Text(val.clone()),
        Value::Array(_) | Value::Object(_) => return None,
    };
    Some(cell)
}

fn apply_wire_dimensions(sheet: &mut SpecSheet, value: &Value, report: &mut ReportDiagnostics) {
    let dims = value.as_array().and_then(|l_dims| match l_dims.as_slice() {
        [n_rows, n_cols] => Some((n_rows.as_u64()?, n_cols.as_u64()?)),
        _ => None,
    });
    match dims {
        Some((n_rows, n_cols)) => {
            sheet.dimensions = SpecSheetDimensions {
                n_rows: n_rows as usize,
                n_cols: n_cols as usize,
            };
        }
        None => report.record(
            EnumDiagnosticKind::MalformedWireEntry,
            Some(&sheet.name),
            Some("sheet_dimensions".to_string()),
            format!("Expected [row_count, column_count], got {value}; using grid extent."),
        ),
    }
}

fn apply_wire_grouping(sheet: &mut SpecSheet, value: Value, report: &mut ReportDiagnostics) {
    let wire_grouping: WireGroupingInfo = match serde_json::from_value(value) {
        Ok(val) => val,
        Err(e) => {
            report.record(
                EnumDiagnosticKind::MalformedWireEntry,
                Some(&sheet.name),
                Some("grouping_info".to_string()),
                format!("Grouping entry unreadable: {e}"),
            );
            return;
        }
    };

    for (c_key, value_level) in wire_grouping.row_outline_levels.unwrap_or_default() {
        let Some(row_idx) = parse_row_number(&c_key) else {
            report.record(
                EnumDiagnosticKind::MalformedWireEntry,
                Some(&sheet.name),
                Some(c_key),
                "Row outline key is not a row number.",
            );
            continue;
        };
        if let Some(entry) = derive_outline_entry(&value_level, &sheet.name, &c_key, report) {
            sheet.row_outline.insert(row_idx, entry);
        }
    }
    for (c_key, value_level) in wire_grouping.column_outline_levels.unwrap_or_default() {
        let Some(col_idx) = parse_column_label(&c_key) else {
            report.record(
                EnumDiagnosticKind::MalformedWireEntry,
                Some(&sheet.name),
                Some(c_key),
                "Column outline key is not a column label.",
            );
            continue;
        };
        if let Some(entry) = derive_outline_entry(&value_level, &sheet.name, &c_key, report) {
            sheet.column_outline.insert(col_idx, entry);
        }
    }
}

fn derive_outline_entry(
    value: &Value,
    sheet_name: &str,
    key: &str,
    report: &mut ReportDiagnostics,
) -> Option<SpecOutlineEntry> {
    let result = value
        .as_i64()
        .ok_or_else(|| format!("Outline level {value} is not an integer."))
        .and_then(SpecOutlineEntry::from_signed);
    match result {
        Ok(entry) => entry,
        Err(reason) => {
            report.record(
                EnumDiagnosticKind::MalformedWireEntry,
                Some(sheet_name),
                Some(key.to_string()),
                reason,
            );
            None
        }
    }
}

fn apply_wire_formatting(sheet: &mut SpecSheet, value: Value, report: &mut ReportDiagnostics) {
    let wire_formatting: WireFormattingInfo = match serde_json::from_value(value) {
        Ok(val) => val,
        Err(e) => {
            report.record(
                EnumDiagnosticKind::MalformedWireEntry,
                Some(&sheet.name),
                Some("formatting_info".to_string()),
                format!("Formatting entry unreadable: {e}"),
            );
            return;
        }
    };

    for (c_key, value_format) in wire_formatting.cell_formats.unwrap_or_default() {
        let Some((row_idx, col_idx)) = parse_style_key(&c_key) else {
            report.record(
                EnumDiagnosticKind::MalformedWireEntry,
                Some(&sheet.name),
                Some(c_key),
                "Cell format key is not <row>_<column>.",
            );
            continue;
        };
        let wire_format: WireCellFormat = match serde_json::from_value(value_format) {
            Ok(val) => val,
            Err(e) => {
                report.record(
                    EnumDiagnosticKind::MalformedWireEntry,
                    Some(&sheet.name),
                    Some(c_key),
                    format!("Cell format unreadable: {e}"),
                );
                continue;
            }
        };
        let mut l_issues = Vec::new();
        let spec_style = derive_cell_style(wire_format, &mut l_issues);
        for c_issue in l_issues {
            report.record(
                EnumDiagnosticKind::StyleDegraded,
                Some(&sheet.name),
                Some(c_key.clone()),
                c_issue,
            );
        }
        if let Some(spec_style) = spec_style.normalized() {
            sheet.cell_styles.insert((row_idx, col_idx), spec_style);
        }
    }

    for value_ref in wire_formatting.merged_cells.unwrap_or_default() {
        match value_ref.as_str().and_then(parse_range_ref) {
            Some(range_ref) => {
                sheet.merged_ranges.insert(range_ref);
            }
            None => report.record(
                EnumDiagnosticKind::MalformedWireEntry,
                Some(&sheet.name),
                Some(value_ref.to_string()),
                "Merged range is not an A1 range.",
            ),
        }
    }

    if let Some(wire_props) = wire_formatting.sheet_properties {
        apply_wire_sheet_properties(sheet, wire_props, report);
    }
}

/// Wire style to model style; unknown tokens are dropped into `l_issues`.
///
/// Color tokens are kept verbatim and only checked when applied.
fn derive_cell_style(wire_format: WireCellFormat, l_issues: &mut Vec<String>) -> SpecCellStyle {
    let font = wire_format.font.map(|font| SpecFontStyle {
        name: font.name,
        size: font.size,
        bold: font.bold,
        italic: font.italic,
        color: font.color,
    });
    let fill = wire_format.fill.map(|fill| SpecFillStyle {
        pattern_kind: derive_token(fill.pattern_type, EnumFillPattern::from_token, "fill pattern", l_issues),
        foreground_color: fill.fg_color,
    });
    let border = wire_format.border.map(|border| SpecBorderStyle {
        left: derive_token(border.left, EnumBorderLine::from_token, "border line", l_issues),
        right: derive_token(border.right, EnumBorderLine::from_token, "border line", l_issues),
        top: derive_token(border.top, EnumBorderLine::from_token, "border line", l_issues),
        bottom: derive_token(border.bottom, EnumBorderLine::from_token, "border line", l_issues),
    });
    let alignment = wire_format.alignment.map(|alignment| SpecAlignmentStyle {
        horizontal: derive_token(
            alignment.horizontal,
            EnumHorizontalAlign::from_token,
            "horizontal alignment",
            l_issues,
        ),
        vertical: derive_token(
            alignment.vertical,
            EnumVerticalAlign::from_token,
            "vertical alignment",
            l_issues,
        ),
    });

    SpecCellStyle {
        font,
        fill,
        border,
        alignment,
    }
}

fn derive_token<T>(
    token: Option<String>,
    parse: fn(&str) -> Option<T>,
    what: &str,
    l_issues: &mut Vec<String>,
) -> Option<T> {
    let c_token = token?;
    let parsed = parse(&c_token);
    if parsed.is_none() {
        l_issues.push(format!("Unknown {what} {c_token:?}; dropped."));
    }
    parsed
}

fn apply_wire_sheet_properties(
    sheet: &mut SpecSheet,
    wire_props: WireSheetProperties,
    report: &mut ReportDiagnostics,
) {
    match wire_props.sheet_state.as_deref() {
        None | Some("visible") => sheet.sheet_properties.is_visible = true,
        Some("hidden") | Some("veryHidden") => sheet.sheet_properties.is_visible = false,
        Some(c_state) => report.record(
            EnumDiagnosticKind::MalformedWireEntry,
            Some(&sheet.name),
            Some("sheet_state".to_string()),
            format!("Unknown sheet state {c_state:?}; kept visible."),
        ),
    }

    let Some(wire_page) = wire_props.page_setup else {
        return;
    };
    sheet.sheet_properties.orientation = match wire_page.orientation.as_deref() {
        None | Some("portrait") | Some("landscape") => {
            EnumPageOrientation::from_token(wire_page.orientation.as_deref())
        }
        Some(c_orientation) => {
            report.record(
                EnumDiagnosticKind::MalformedWireEntry,
                Some(&sheet.name),
                Some("orientation".to_string()),
                format!("Unknown orientation {c_orientation:?}; left unset."),
            );
            EnumPageOrientation::Unset
        }
    };
    sheet.sheet_properties.paper_size = match wire_page.paper_size {
        None | Some(Value::Null) => None,
        Some(value) => {
            let paper_size = match &value {
                Value::Number(val) => val.as_u64().and_then(|v| u32::try_from(v).ok()),
                Value::String(val) => val.trim().parse().ok(),
                _ => None,
            };
            if paper_size.is_none() {
                report.record(
                    EnumDiagnosticKind::MalformedWireEntry,
                    Some(&sheet.name),
                    Some("paperSize".to_string()),
                    format!("Paper size {value} is not a positive integer; dropped."),
                );
            }
            paper_size
        }
    };
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode_json(value: Value) -> Result<(SpecDocument, ReportDiagnostics), DecodeError> {
        decode_str(&value.to_string())
    }

    #[test]
    fn test_missing_sheets_is_fatal() {
        let err = decode_json(json!({"sheet_count": 1})).expect_err("no sheets");
        assert!(matches!(err, DecodeError::MissingSheets));

        let err = decode_json(json!({"sheets": null})).expect_err("null sheets");
        assert!(matches!(err, DecodeError::MissingSheets));
    }

    #[test]
    fn test_non_finite_tokens_outside_strings_become_null() {
        let c_json = br#"{"a": [NaN, -Infinity, Infinity, "NaN \" Infinity", 1.5]}"#;
        let v_json = replace_non_finite_tokens(c_json);
        assert_eq!(
            std::str::from_utf8(&v_json).expect("utf8"),
            r#"{"a": [null, null, null, "NaN \" Infinity", 1.5]}"#
        );
        assert!(matches!(replace_non_finite_tokens(b"[1, \"x\"]"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_wrong_typed_sections_are_ignored() {
        let (document, report) = decode_json(json!({
            "source_file": 7,
            "sheet_count": "1",
            "sheets": {"S": [["a"]]},
            "grouping_info": [],
            "formatting_info": "none",
            "sheet_dimensions": {"S": [1, 1]}
        }))
        .expect("decode");
        assert_eq!(document.sheet_names(), vec!["S"]);
        assert_eq!(document.source_identifier(), "");
        assert_eq!(report.count_of(EnumDiagnosticKind::MalformedWireEntry), 4);
        let l_targets: Vec<_> = report
            .diagnostics
            .iter()
            .filter_map(|d| d.target.as_deref())
            .collect();
        assert_eq!(
            l_targets,
            vec!["source_file", "sheet_count", "grouping_info", "formatting_info"]
        );
    }

    #[test]
    fn test_non_object_root_and_sheets_are_fatal() {
        assert!(matches!(decode_str("[1, 2]"), Err(DecodeError::MalformedJson(_))));
        assert!(matches!(
            decode_json(json!({"sheets": [["a"]]})),
            Err(DecodeError::MalformedJson(_))
        ));
    }

    #[test]
    fn test_outline_levels_are_sign_encoded() {
        let mut sheet = SpecSheet::new("Sales");
        sheet.grid = vec![vec![EnumCell::Number(1.0)]; 4];
        sheet.row_outline.insert(1, SpecOutlineEntry::new(1, true).expect("level"));
        sheet.row_outline.insert(2, SpecOutlineEntry::new(2, false).expect("level"));
        sheet.column_outline.insert(27, SpecOutlineEntry::new(3, true).expect("level"));
        sheet.dimensions = SpecSheetDimensions { n_rows: 4, n_cols: 28 };
        let mut report = ReportDiagnostics::default();
        let document = SpecDocument::new("in.xlsx", vec![sheet], &mut report).expect("document");

        let wire = encode(&document).expect("encode");
        let value_grouping = &wire.grouping_info.as_ref().expect("grouping")["Sales"];
        assert_eq!(value_grouping["row_outline_levels"], json!({"2": -1, "3": 2}));
        assert_eq!(value_grouping["column_outline_levels"], json!({"AB": -3}));
        assert_eq!(value_grouping["row_groups"], json!([]));

        let (decoded, report) = decode(wire).expect("decode");
        assert!(report.is_empty());
        assert_eq!(decoded, document);
    }

    #[test]
    fn test_zero_levels_are_absent_and_bad_levels_reported() {
        let (document, report) = decode_json(json!({
            "sheets": {"Sales": [[1], [2], [3]]},
            "grouping_info": {"Sales": {"row_outline_levels": {"1": 0, "2": "x", "0": 1, "3": -1}}}
        }))
        .expect("decode");
        let sheet = document.sheet("Sales").expect("sheet");
        assert_eq!(sheet.row_outline.len(), 1);
        assert!(sheet.row_outline[&2].hidden());
        assert_eq!(report.count_of(EnumDiagnosticKind::MalformedWireEntry), 2);
    }

    #[test]
    fn test_cells_decode_by_json_type() {
        let (document, report) = decode_json(json!({
            "sheets": {"S": [[null, "x", 2, 2.5, true, "2024-01-02 03:04:05", "2024-01-02", [1]]]}
        }))
        .expect("decode");
        let l_cells = &document.sheet("S").expect("sheet").grid[0];
        assert_eq!(
            l_cells,
            &vec![
                EnumCell::Empty,
                EnumCell::Text("x".to_string()),
                EnumCell::Number(2.0),
                EnumCell::Number(2.5),
                EnumCell::Boolean(true),
                EnumCell::Temporal("2024-01-02 03:04:05".to_string()),
                EnumCell::Text("2024-01-02".to_string()),
                EnumCell::Empty,
            ]
        );
        assert_eq!(report.count_of(EnumDiagnosticKind::MalformedWireEntry), 1);
    }

    #[test]
    fn test_integral_numbers_encode_as_integers() {
        assert_eq!(derive_value_from_cell(&EnumCell::Number(3.0)), json!(3));
        assert_eq!(derive_value_from_cell(&EnumCell::Number(-0.5)), json!(-0.5));
        assert_eq!(derive_value_from_cell(&EnumCell::Number(f64::NAN)), Value::Null);
    }

    #[test]
    fn test_unknown_sheet_references_are_dropped() {
        let (document, report) = decode_json(json!({
            "sheets": {"Sales": [[1]]},
            "grouping_info": {"Ghost": {"row_outline_levels": {"1": 1}}},
            "formatting_info": {"Ghost": {}},
            "sheet_dimensions": {"Ghost": [1, 1]},
            "extra_key": {"ignored": true}
        }))
        .expect("decode");
        assert_eq!(document.sheet_names(), vec!["Sales"]);
        assert_eq!(report.count_of(EnumDiagnosticKind::UnknownSheetReference), 3);
    }

    #[test]
    fn test_dimensions_are_a_floor() {
        let (document, _) = decode_json(json!({
            "sheets": {"Sales": [[1, 2, 3], [4, 5, 6], [7, 8, 9], [1, 1, 1]]},
            "sheet_dimensions": {"Sales": [5, 3]}
        }))
        .expect("decode");
        let sheet = document.sheet("Sales").expect("sheet");
        assert_eq!(sheet.grid.len(), 4);
        assert_eq!(sheet.dimensions, SpecSheetDimensions { n_rows: 5, n_cols: 3 });

        let (document, _) = decode_json(json!({
            "sheets": {"Sales": [[1, 2, 3]]},
            "sheet_dimensions": {"Sales": [0, 0]}
        }))
        .expect("decode");
        let sheet = document.sheet("Sales").expect("sheet");
        assert_eq!(sheet.dimensions, SpecSheetDimensions { n_rows: 1, n_cols: 3 });
    }

    #[test]
    fn test_legacy_formatting_payload() {
        let (document, report) = decode_json(json!({
            "sheets": {"Sales": [[1, 2], [3, 4]]},
            "formatting_info": {"Sales": {
                "cell_formats": {
                    "1_A": {"font": {"name": "Arial", "size": 12.0, "bold": true, "italic": false,
                                     "color": "Values must be of type <class 'str'>"},
                            "fill": {"patternType": null, "fgColor": "00000000"},
                            "border": {"left": "thin", "right": null, "top": "zigzag", "bottom": null},
                            "alignment": {"horizontal": null, "vertical": null}},
                    "2_B": {"fill": {"patternType": "solid", "fgColor": "FFFFFF00"}},
                    "bogus": {}
                },
                "merged_cells": ["A1:B1", 7],
                "sheet_properties": {"sheet_state": "veryHidden",
                                     "page_setup": {"orientation": "landscape", "paperSize": 9}}
            }}
        }))
        .expect("decode");
        let sheet = document.sheet("Sales").expect("sheet");

        let spec_style = &sheet.cell_styles[&(0, 0)];
        let font = spec_style.font.as_ref().expect("font");
        assert_eq!(font.color.as_deref(), Some("Values must be of type <class 'str'>"));
        assert!(spec_style.alignment.is_none());
        assert_eq!(
            spec_style.border.as_ref().and_then(|b| b.left),
            Some(EnumBorderLine::Thin)
        );
        assert_eq!(
            sheet.cell_styles[&(1, 1)].fill.as_ref().and_then(|f| f.pattern_kind),
            Some(EnumFillPattern::Solid)
        );

        assert_eq!(sheet.merged_ranges.len(), 1);
        assert!(!sheet.sheet_properties.is_visible);
        assert_eq!(sheet.sheet_properties.orientation, EnumPageOrientation::Landscape);
        assert_eq!(sheet.sheet_properties.paper_size, Some(9));
        assert_eq!(report.count_of(EnumDiagnosticKind::StyleDegraded), 1);
        assert_eq!(report.count_of(EnumDiagnosticKind::MalformedWireEntry), 2);
    }

    #[test]
    fn test_empty_styles_are_not_emitted() {
        let mut sheet = SpecSheet::new("S");
        sheet.grid = vec![vec![EnumCell::Number(1.0)]];
        sheet.cell_styles.insert(
            (0, 0),
            SpecCellStyle {
                font: Some(SpecFontStyle {
                    bold: Some(true),
                    ..Default::default()
                }),
                fill: Some(SpecFillStyle::default()),
                ..Default::default()
            },
        );
        let mut report = ReportDiagnostics::default();
        let document = SpecDocument::new("s.xlsx", vec![sheet], &mut report).expect("document");
        let c_json = encode_to_string(&document, &SpecEncodeOptions { if_pretty: false }).expect("json");
        let value: Value = serde_json::from_str(&c_json).expect("parse");
        let value_format = &value["formatting_info"]["S"]["cell_formats"]["1_A"];
        assert!(value_format.get("font").is_some());
        assert!(value_format.get("fill").is_none());
        assert!(value_format.get("border").is_none());
    }
}
