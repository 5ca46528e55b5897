//! Capture engine: source workbook to [`SpecDocument`].
//!
//! Values are read through `calamine`, which also handles legacy and
//! OpenDocument sources. For OOXML packages the structure parts are read a
//! second time through [`crate::ooxml`] to recover outline levels, styles,
//! merges, visibility and page setup.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};
use zip::ZipArchive;

use crate::error::CaptureError;
use crate::ooxml::{
    SpecSheetXmlMeta, SpecStyleTable, SpecWorkbookSheetEntry, parse_sheet_xml, read_style_table,
    read_workbook_entries, read_zip_text,
};
use crate::report::{EnumDiagnosticKind, ReportDiagnostics};
use crate::spec::{
    EnumCell, SpecCaptureOptions, SpecDocument, SpecSheet, SpecSheetDimensions,
};
use crate::util::{
    derive_cell_ref, derive_datetime_from_excel_serial, format_temporal, normalize_temporal_text,
    parse_range_ref,
};

////////////////////////////////////////////////////////////////////////////////
// #region CaptureEntry

/// Capture a workbook file.
///
/// The file is read once into memory and handed to [`capture_bytes`]; the
/// source path is used as the document's source identifier.
pub fn capture(
    path: &Path,
    options: &SpecCaptureOptions,
) -> Result<(SpecDocument, ReportDiagnostics), CaptureError> {
    let c_source_identifier = path.display().to_string();
    let v_bytes = std::fs::read(path).map_err(|e| CaptureError::SourceUnreadable {
        source_identifier: c_source_identifier.clone(),
        message: e.to_string(),
    })?;
    capture_bytes(&v_bytes, &c_source_identifier, options)
}

/// Capture a workbook held in memory.
///
/// Unreadable sources fail the whole call. Anything that goes wrong inside a
/// readable source degrades the affected cell, style or sheet and is recorded
/// in the returned diagnostics.
pub fn capture_bytes(
    bytes: &[u8],
    source_identifier: &str,
    options: &SpecCaptureOptions,
) -> Result<(SpecDocument, ReportDiagnostics), CaptureError> {
    let mut report = ReportDiagnostics::default();

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| {
        CaptureError::SourceUnreadable {
            source_identifier: source_identifier.to_string(),
            message: e.to_string(),
        }
    })?;
    let l_sheet_names = workbook.sheet_names();
    log::debug!(
        "Capturing {source_identifier}: {} sheet(s).",
        l_sheet_names.len()
    );

    let mut package = read_package_structure(bytes, source_identifier, options, &mut report)?;
    if package.is_none() {
        log::info!("{source_identifier} is not an OOXML package; capturing values only.");
    }

    let mut l_sheets = Vec::with_capacity(l_sheet_names.len());
    for c_sheet_name in l_sheet_names {
        let grid = match workbook.worksheet_range(&c_sheet_name) {
            Ok(range) => derive_grid_from_range(&range, &c_sheet_name, &mut report),
            Err(e) => {
                report.record(
                    EnumDiagnosticKind::SheetDegraded,
                    Some(&c_sheet_name),
                    None,
                    format!("Cell values unreadable, captured as empty: {e}"),
                );
                Vec::new()
            }
        };

        let mut sheet = SpecSheet::new(c_sheet_name);
        sheet.grid = grid;
        let (n_rows_grid, n_cols_grid) = sheet.grid_extent();
        sheet.dimensions = SpecSheetDimensions {
            n_rows: n_rows_grid,
            n_cols: n_cols_grid,
        };
        if let Some(package) = package.as_mut() {
            package.apply_to_sheet(&mut sheet, options, &mut report);
        }
        l_sheets.push(sheet);
    }

    let document = SpecDocument::new(source_identifier, l_sheets, &mut report).map_err(|e| {
        CaptureError::InvalidDocument {
            source_identifier: source_identifier.to_string(),
            source: e,
        }
    })?;
    log::debug!(
        "Captured {source_identifier} with {} diagnostic(s).",
        report.diagnostic_count()
    );
    Ok((document, report))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValues

/// Read a calamine range into a grid anchored at `A1`.
///
/// The grid is rectangular and stops at the last row and column holding a
/// value; the used range is tracked separately in the sheet dimensions.
fn derive_grid_from_range(
    range: &Range<Data>,
    sheet_name: &str,
    report: &mut ReportDiagnostics,
) -> Vec<Vec<EnumCell>> {
    let Some((n_row_end, n_col_end)) = range.end() else {
        return Vec::new();
    };
    let n_rows = n_row_end as usize + 1;
    let n_cols = n_col_end as usize + 1;

    let mut l_rows: Vec<Vec<EnumCell>> = Vec::with_capacity(n_rows);
    let mut n_rows_used = 0;
    let mut n_cols_used = 0;
    for row_idx in 0..n_rows {
        let mut l_cells = Vec::with_capacity(n_cols);
        for col_idx in 0..n_cols {
            let cell = match range.get_value((row_idx as u32, col_idx as u32)) {
                Some(value) => derive_cell_from_data(value, sheet_name, row_idx, col_idx, report),
                None => EnumCell::Empty,
            };
            if !cell.is_empty() {
                n_rows_used = row_idx + 1;
                n_cols_used = n_cols_used.max(col_idx + 1);
            }
            l_cells.push(cell);
        }
        l_rows.push(l_cells);
    }

    l_rows.truncate(n_rows_used);
    for l_cells in &mut l_rows {
        l_cells.truncate(n_cols_used);
    }
    l_rows
}

fn derive_cell_from_data(
    value: &Data,
    sheet_name: &str,
    row_idx: usize,
    col_idx: usize,
    report: &mut ReportDiagnostics,
) -> EnumCell {
    match value {
        Data::Empty => EnumCell::Empty,
        Data::String(val) if val.is_empty() => EnumCell::Empty,
        Data::String(val) => EnumCell::Text(val.clone()),
        Data::Bool(val) => EnumCell::Boolean(*val),
        Data::Int(val) => EnumCell::Number(*val as f64),
        Data::Float(val) => EnumCell::Number(*val),
        Data::DateTime(val) => {
            if val.is_duration() {
                return EnumCell::Number(val.as_f64());
            }
            match derive_datetime_from_excel_serial(val.as_f64()) {
                Some(dt) => EnumCell::Temporal(format_temporal(&dt)),
                None => {
                    report.record(
                        EnumDiagnosticKind::CellDegraded,
                        Some(sheet_name),
                        Some(derive_cell_ref(row_idx, col_idx)),
                        format!("Date serial {} has no calendar date; kept as number.", val.as_f64()),
                    );
                    EnumCell::Number(val.as_f64())
                }
            }
        }
        Data::DateTimeIso(val) => match normalize_temporal_text(val) {
            Some(c_text) => EnumCell::Temporal(c_text),
            None => EnumCell::Text(val.clone()),
        },
        Data::DurationIso(val) => EnumCell::Text(val.clone()),
        Data::Error(err) => {
            report.record(
                EnumDiagnosticKind::CellDegraded,
                Some(sheet_name),
                Some(derive_cell_ref(row_idx, col_idx)),
                format!("Cell error {err:?} captured as empty."),
            );
            EnumCell::Empty
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PackageStructure

/// OOXML structure read alongside the values.
struct SpecPackageStructure {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    dict_entries: BTreeMap<String, SpecWorkbookSheetEntry>,
    style_table: SpecStyleTable,
}

/// Open the structure parts of an OOXML package.
///
/// Returns `Ok(None)` for sources that are not zip packages or carry no
/// workbook part. A workbook part that cannot be parsed means the source is
/// corrupt.
fn read_package_structure(
    bytes: &[u8],
    source_identifier: &str,
    options: &SpecCaptureOptions,
    report: &mut ReportDiagnostics,
) -> Result<Option<SpecPackageStructure>, CaptureError> {
    let Ok(mut archive) = ZipArchive::new(Cursor::new(bytes.to_vec())) else {
        return Ok(None);
    };
    let l_entries = read_workbook_entries(&mut archive).map_err(|message| {
        CaptureError::SourceUnreadable {
            source_identifier: source_identifier.to_string(),
            message,
        }
    })?;
    let Some(l_entries) = l_entries else {
        return Ok(None);
    };

    let style_table = if options.if_capture_styles {
        read_style_table(&mut archive).unwrap_or_else(|message| {
            report.record(
                EnumDiagnosticKind::StyleDegraded,
                None,
                None,
                format!("Style tables unreadable; styles omitted: {message}"),
            );
            SpecStyleTable::default()
        })
    } else {
        SpecStyleTable::default()
    };

    let dict_entries = l_entries
        .into_iter()
        .map(|entry| (entry.name.clone(), entry))
        .collect();
    Ok(Some(SpecPackageStructure {
        archive,
        dict_entries,
        style_table,
    }))
}

impl SpecPackageStructure {
    /// Merge the worksheet part of `sheet` into the captured values.
    fn apply_to_sheet(
        &mut self,
        sheet: &mut SpecSheet,
        options: &SpecCaptureOptions,
        report: &mut ReportDiagnostics,
    ) {
        let Some(entry) = self.dict_entries.get(&sheet.name) else {
            report.record(
                EnumDiagnosticKind::SheetDegraded,
                Some(&sheet.name),
                None,
                "Sheet missing from workbook part; structure not captured.",
            );
            return;
        };
        sheet.sheet_properties.is_visible = entry.is_visible;

        let Some(c_part_path) = entry.part_path.clone() else {
            report.record(
                EnumDiagnosticKind::SheetDegraded,
                Some(&sheet.name),
                None,
                "Worksheet relationship unresolved; structure not captured.",
            );
            return;
        };
        let meta = match read_zip_text(&mut self.archive, &c_part_path)
            .and_then(|c_xml| c_xml.ok_or_else(|| format!("Part {c_part_path} missing.")))
            .and_then(|c_xml| parse_sheet_xml(&c_xml))
        {
            Ok(meta) => meta,
            Err(message) => {
                report.record(
                    EnumDiagnosticKind::SheetDegraded,
                    Some(&sheet.name),
                    None,
                    format!("Worksheet structure unreadable: {message}"),
                );
                return;
            }
        };

        self.apply_sheet_meta(sheet, meta, options, report);
    }

    fn apply_sheet_meta(
        &self,
        sheet: &mut SpecSheet,
        meta: SpecSheetXmlMeta,
        options: &SpecCaptureOptions,
        report: &mut ReportDiagnostics,
    ) {
        let mut n_rows = sheet.dimensions.n_rows.max(meta.cell_extent.0);
        let mut n_cols = sheet.dimensions.n_cols.max(meta.cell_extent.1);
        // A sheet without cells still reports `A1` as its used range.
        if meta.cell_extent != (0, 0)
            && let Some(range_ref) = meta.dimension
        {
            n_rows = n_rows.max(range_ref.row_end + 1);
            n_cols = n_cols.max(range_ref.col_end + 1);
        }

        if options.if_capture_outline {
            if let Some(row_idx) = meta.row_outline.keys().next_back() {
                n_rows = n_rows.max(row_idx + 1);
            }
            if let Some(col_idx) = meta.column_outline.keys().next_back() {
                n_cols = n_cols.max(col_idx + 1);
            }
            sheet.row_outline = meta.row_outline;
            sheet.column_outline = meta.column_outline;
        }

        if options.if_capture_merges {
            for c_ref in &meta.merged_refs {
                match parse_range_ref(c_ref) {
                    Some(range_ref) => {
                        n_rows = n_rows.max(range_ref.row_end + 1);
                        n_cols = n_cols.max(range_ref.col_end + 1);
                        sheet.merged_ranges.insert(range_ref);
                    }
                    None => report.record(
                        EnumDiagnosticKind::SheetDegraded,
                        Some(&sheet.name),
                        Some(c_ref.clone()),
                        "Merged range reference unreadable; dropped.",
                    ),
                }
            }
        }

        if options.if_capture_styles {
            for ((row_idx, col_idx), n_style_id) in &meta.cell_style_ids {
                let (spec_style, l_issues) = self.style_table.resolve(*n_style_id);
                for c_issue in l_issues {
                    report.record(
                        EnumDiagnosticKind::StyleDegraded,
                        Some(&sheet.name),
                        Some(derive_cell_ref(*row_idx, *col_idx)),
                        c_issue,
                    );
                }
                if let Some(spec_style) = spec_style {
                    sheet.cell_styles.insert((*row_idx, *col_idx), spec_style);
                }
            }
        }

        sheet.sheet_properties.orientation = meta.orientation;
        sheet.sheet_properties.paper_size = meta.paper_size;
        sheet.dimensions = SpecSheetDimensions { n_rows, n_cols };
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_bytes_rejects_garbage() {
        let err = capture_bytes(b"definitely not a workbook", "garbage.xlsx", &SpecCaptureOptions::default())
            .expect_err("garbage must not capture");
        assert!(matches!(err, CaptureError::SourceUnreadable { .. }));
    }

    #[test]
    fn test_capture_missing_file_is_unreadable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = capture(&dir.path().join("missing.xlsx"), &SpecCaptureOptions::default())
            .expect_err("missing file");
        match err {
            CaptureError::SourceUnreadable {
                source_identifier, ..
            } => assert!(source_identifier.ends_with("missing.xlsx")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cell_errors_degrade_to_empty() {
        let mut report = ReportDiagnostics::default();
        let cell = derive_cell_from_data(
            &Data::Error(calamine::CellErrorType::Div0),
            "Sales",
            1,
            2,
            &mut report,
        );
        assert_eq!(cell, EnumCell::Empty);
        assert_eq!(report.count_of(EnumDiagnosticKind::CellDegraded), 1);
        assert_eq!(report.diagnostics[0].target.as_deref(), Some("C2"));
    }

    #[test]
    fn test_fictitious_leap_day_is_kept_as_number() {
        let mut report = ReportDiagnostics::default();
        let value = calamine::ExcelDateTime::new(60.0, calamine::ExcelDateTimeType::DateTime, false);
        let cell = derive_cell_from_data(&Data::DateTime(value), "Sales", 0, 1, &mut report);
        assert_eq!(cell, EnumCell::Number(60.0));
        assert_eq!(report.count_of(EnumDiagnosticKind::CellDegraded), 1);
        assert_eq!(report.diagnostics[0].target.as_deref(), Some("B1"));
    }

    #[test]
    fn test_iso_datetime_text_is_canonicalized() {
        let mut report = ReportDiagnostics::default();
        let cell = derive_cell_from_data(
            &Data::DateTimeIso("2024-03-05T07:08:09".to_string()),
            "Sales",
            0,
            0,
            &mut report,
        );
        assert_eq!(cell, EnumCell::Temporal("2024-03-05 07:08:09".to_string()));
        assert!(report.is_empty());
    }
}
