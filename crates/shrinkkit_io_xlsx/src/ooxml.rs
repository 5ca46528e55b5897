//! Readers for the OOXML package parts that carry workbook structure.
//!
//! Cell values come from `calamine`; this module covers what it does not
//! expose: sheet visibility, outline levels, per-cell style ids, the style
//! tables, merged ranges, page setup and the recorded used range.

use std::collections::BTreeMap;
use std::io::{Read, Seek};

use quick_xml::Reader as XmlReader;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::conf::{C_PART_STYLES, C_PART_WORKBOOK, C_PART_WORKBOOK_RELS, N_NCOLS_EXCEL_MAX};
use crate::spec::{
    EnumBorderLine, EnumFillPattern, EnumHorizontalAlign, EnumPageOrientation, EnumVerticalAlign,
    SpecAlignmentStyle, SpecBorderStyle, SpecCellStyle, SpecFillStyle, SpecFontStyle,
    SpecOutlineEntry, SpecRangeRef,
};
use crate::util::{normalize_argb, parse_cell_ref, parse_range_ref};

////////////////////////////////////////////////////////////////////////////////
// #region PackageModels

/// One `<sheet>` entry of `xl/workbook.xml`, resolved to its part path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecWorkbookSheetEntry {
    /// Sheet name.
    pub name: String,
    /// Zip entry of the worksheet part, if the relationship resolved.
    pub part_path: Option<String>,
    /// `state` is absent or `visible`.
    pub is_visible: bool,
}

/// Structural facts read from one worksheet part.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSheetXmlMeta {
    /// `<dimension ref>` used range.
    pub dimension: Option<SpecRangeRef>,
    /// Row outline entries by zero-based row.
    pub row_outline: BTreeMap<usize, SpecOutlineEntry>,
    /// Column outline entries by zero-based column.
    pub column_outline: BTreeMap<usize, SpecOutlineEntry>,
    /// Non-default `s` attribute by zero-based `(row, col)`.
    pub cell_style_ids: BTreeMap<(usize, usize), usize>,
    /// Raw `<mergeCell ref>` values.
    pub merged_refs: Vec<String>,
    /// `(rows, cols)` spanned by `<c>` elements.
    pub cell_extent: (usize, usize),
    /// `<pageSetup orientation>`.
    pub orientation: EnumPageOrientation,
    /// `<pageSetup paperSize>`.
    pub paper_size: Option<u32>,
}

/// One `<xf>` record of `<cellXfs>`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecCellXf {
    pub font_id: usize,
    pub fill_id: usize,
    pub border_id: usize,
    pub alignment: SpecAlignmentStyle,
}

/// Style tables of `xl/styles.xml`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecStyleTable {
    pub fonts: Vec<SpecFontStyle>,
    pub fills: Vec<SpecFillStyle>,
    pub borders: Vec<SpecBorderStyle>,
    pub cell_xfs: Vec<SpecCellXf>,
}

impl SpecStyleTable {
    /// Resolve a cell `s` index to the style components that differ from
    /// the workbook defaults.
    ///
    /// Font 0, fills 0-1 and border 0 are the reserved defaults. Dangling ids
    /// are reported in the second tuple element and that component omitted.
    pub fn resolve(&self, xf_idx: usize) -> (Option<SpecCellStyle>, Vec<String>) {
        let mut l_issues = Vec::new();
        let Some(xf) = self.cell_xfs.get(xf_idx) else {
            l_issues.push(format!("cell format index {xf_idx} not in cellXfs"));
            return (None, l_issues);
        };

        let mut spec_style = SpecCellStyle::default();
        if xf.font_id != 0 {
            match self.fonts.get(xf.font_id) {
                Some(font) => spec_style.font = Some(font.clone()),
                None => l_issues.push(format!("font index {} not in fonts", xf.font_id)),
            }
        }
        if xf.fill_id > 1 {
            match self.fills.get(xf.fill_id) {
                Some(fill) if fill.pattern_kind.is_some_and(|p| p != EnumFillPattern::None) => {
                    spec_style.fill = Some(fill.clone());
                }
                Some(_) => {}
                None => l_issues.push(format!("fill index {} not in fills", xf.fill_id)),
            }
        }
        if xf.border_id != 0 {
            match self.borders.get(xf.border_id) {
                Some(border) => spec_style.border = Some(border.clone()),
                None => l_issues.push(format!("border index {} not in borders", xf.border_id)),
            }
        }
        spec_style.alignment = Some(xf.alignment.clone());

        (spec_style.normalized(), l_issues)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PackageAccess

/// Read a zip entry as text; a missing entry is `Ok(None)`.
pub fn read_zip_text<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, String> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(format!("Failed to open zip entry {name}: {err}")),
    };
    let mut c_text = String::new();
    file.read_to_string(&mut c_text)
        .map_err(|e| format!("Failed to read zip entry {name}: {e}"))?;
    Ok(Some(c_text))
}

/// List workbook sheets in source order with their part paths.
///
/// `Ok(None)` when the package has no `xl/workbook.xml` (not a spreadsheet
/// package).
pub fn read_workbook_entries<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<Option<Vec<SpecWorkbookSheetEntry>>, String> {
    let Some(c_xml_workbook) = read_zip_text(archive, C_PART_WORKBOOK)? else {
        return Ok(None);
    };
    let dict_rels = match read_zip_text(archive, C_PART_WORKBOOK_RELS)? {
        Some(c_xml_rels) => parse_relationships_xml(&c_xml_rels)?,
        None => BTreeMap::new(),
    };

    let l_entries = parse_workbook_xml(&c_xml_workbook)?
        .into_iter()
        .map(|(name, rel_id, is_visible)| SpecWorkbookSheetEntry {
            name,
            part_path: rel_id
                .and_then(|id| dict_rels.get(&id))
                .map(|target| resolve_part_path(target)),
            is_visible,
        })
        .collect();
    Ok(Some(l_entries))
}

/// Read and parse `xl/styles.xml`; a package without one has empty tables.
pub fn read_style_table<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<SpecStyleTable, String> {
    match read_zip_text(archive, C_PART_STYLES)? {
        Some(c_xml) => parse_styles_xml(&c_xml),
        None => Ok(SpecStyleTable::default()),
    }
}

/// Resolve a relationship target relative to `xl/`.
pub fn resolve_part_path(target: &str) -> String {
    if let Some(c_abs) = target.strip_prefix('/') {
        return c_abs.to_string();
    }
    let mut l_segments: Vec<&str> = vec!["xl"];
    for c_segment in target.split('/') {
        match c_segment {
            "" | "." => {}
            ".." => {
                l_segments.pop();
            }
            _ => l_segments.push(c_segment),
        }
    }
    l_segments.join("/")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WorkbookParts

/// `(name, relationship id, is_visible)` per `<sheet>`.
pub fn parse_workbook_xml(xml: &str) -> Result<Vec<(String, Option<String>, bool)>, String> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf: Vec<u8> = Vec::new();
    let mut l_sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"sheet"
                    && let Some(c_name) = derive_attr_value(&e, b"name")
                {
                    let c_state = derive_attr_value(&e, b"state");
                    let if_visible = c_state.as_deref().is_none_or(|v| v == "visible");
                    l_sheets.push((c_name, derive_attr_value(&e, b"id"), if_visible));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("Failed to parse workbook XML: {e}")),
            _ => {}
        }
        buf.clear();
    }

    Ok(l_sheets)
}

/// Relationship id to target.
pub fn parse_relationships_xml(xml: &str) -> Result<BTreeMap<String, String>, String> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf: Vec<u8> = Vec::new();
    let mut dict_rels = BTreeMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"Relationship"
                    && let Some(c_id) = derive_attr_value(&e, b"Id")
                    && let Some(c_target) = derive_attr_value(&e, b"Target")
                {
                    dict_rels.insert(c_id, c_target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("Failed to parse relationships XML: {e}")),
            _ => {}
        }
        buf.clear();
    }

    Ok(dict_rels)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WorksheetPart

/// Parse the structural facts of one worksheet part.
pub fn parse_sheet_xml(xml: &str) -> Result<SpecSheetXmlMeta, String> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf: Vec<u8> = Vec::new();
    let mut meta = SpecSheetXmlMeta::default();

    let mut n_row_current: usize = 0;
    let mut n_col_next: usize = 0;
    let mut if_row_seen = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"dimension" => {
                    meta.dimension = derive_attr_value(&e, b"ref").and_then(|v| parse_range_ref(&v));
                }
                b"col" => {
                    let n_min = derive_attr_usize(&e, b"min").unwrap_or(0);
                    let n_max = derive_attr_usize(&e, b"max").unwrap_or(n_min);
                    if n_min > 0
                        && let Some(entry) = derive_outline_entry(&e)
                    {
                        for col_idx in (n_min - 1)..n_max.min(N_NCOLS_EXCEL_MAX) {
                            meta.column_outline.insert(col_idx, entry);
                        }
                    }
                }
                b"row" => {
                    n_row_current = match derive_attr_usize(&e, b"r") {
                        Some(n_row) if n_row > 0 => n_row - 1,
                        _ if if_row_seen => n_row_current + 1,
                        _ => 0,
                    };
                    if_row_seen = true;
                    n_col_next = 0;
                    if let Some(entry) = derive_outline_entry(&e) {
                        meta.row_outline.insert(n_row_current, entry);
                    }
                }
                b"c" => {
                    let (row_idx, col_idx) = derive_attr_value(&e, b"r")
                        .and_then(|v| parse_cell_ref(&v))
                        .unwrap_or((n_row_current, n_col_next));
                    n_col_next = col_idx + 1;
                    meta.cell_extent = (
                        meta.cell_extent.0.max(row_idx + 1),
                        meta.cell_extent.1.max(col_idx + 1),
                    );
                    if let Some(n_style_id) = derive_attr_usize(&e, b"s")
                        && n_style_id != 0
                    {
                        meta.cell_style_ids.insert((row_idx, col_idx), n_style_id);
                    }
                }
                b"mergeCell" => {
                    if let Some(c_ref) = derive_attr_value(&e, b"ref") {
                        meta.merged_refs.push(c_ref);
                    }
                }
                b"pageSetup" => {
                    meta.orientation =
                        EnumPageOrientation::from_token(derive_attr_value(&e, b"orientation").as_deref());
                    meta.paper_size = derive_attr_value(&e, b"paperSize").and_then(|v| v.parse().ok());
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("Failed to parse worksheet XML: {e}")),
            _ => {}
        }
        buf.clear();
    }

    Ok(meta)
}

fn derive_outline_entry(e: &BytesStart<'_>) -> Option<SpecOutlineEntry> {
    let n_level = derive_attr_value(e, b"outlineLevel")
        .and_then(|v| v.parse::<u8>().ok())
        .unwrap_or(0);
    SpecOutlineEntry::new(n_level, derive_attr_flag(e, b"hidden"))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StylesPart

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumStyleSection {
    Other,
    Fonts,
    Fills,
    Borders,
    CellXfs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumBorderSide {
    Left,
    Right,
    Top,
    Bottom,
}

/// Streaming state of the `styles.xml` walk.
struct StyleXmlState {
    enum_section: EnumStyleSection,
    font_current: Option<SpecFontStyle>,
    fill_current: Option<SpecFillStyle>,
    border_current: Option<SpecBorderStyle>,
    xf_current: Option<SpecCellXf>,
    table: SpecStyleTable,
}

impl StyleXmlState {
    fn open(&mut self, e: &BytesStart<'_>) {
        let c_name = e.local_name();
        let c_name = c_name.as_ref();
        match (self.enum_section, c_name) {
            (_, b"fonts") => self.enum_section = EnumStyleSection::Fonts,
            (_, b"fills") => self.enum_section = EnumStyleSection::Fills,
            (_, b"borders") => self.enum_section = EnumStyleSection::Borders,
            (_, b"cellXfs") => self.enum_section = EnumStyleSection::CellXfs,
            (_, b"cellStyleXfs" | b"dxfs" | b"cellStyles") => {
                self.enum_section = EnumStyleSection::Other;
            }

            (EnumStyleSection::Fonts, b"font") => {
                self.font_current = Some(SpecFontStyle {
                    bold: Some(false),
                    italic: Some(false),
                    ..Default::default()
                });
            }
            (EnumStyleSection::Fonts, _) => {
                if let Some(font) = self.font_current.as_mut() {
                    match c_name {
                        b"b" => font.bold = Some(derive_attr_flag_default(e, b"val", true)),
                        b"i" => font.italic = Some(derive_attr_flag_default(e, b"val", true)),
                        b"sz" => {
                            font.size = derive_attr_value(e, b"val").and_then(|v| v.parse().ok());
                        }
                        b"name" => font.name = derive_attr_value(e, b"val"),
                        b"color" => {
                            font.color = derive_attr_value(e, b"rgb").and_then(|v| normalize_argb(&v));
                        }
                        _ => {}
                    }
                }
            }

            (EnumStyleSection::Fills, b"fill") => self.fill_current = Some(SpecFillStyle::default()),
            (EnumStyleSection::Fills, b"patternFill") => {
                if let Some(fill) = self.fill_current.as_mut() {
                    fill.pattern_kind = Some(
                        derive_attr_value(e, b"patternType")
                            .and_then(|v| EnumFillPattern::from_token(&v))
                            .unwrap_or(EnumFillPattern::None),
                    );
                }
            }
            (EnumStyleSection::Fills, b"fgColor") => {
                if let Some(fill) = self.fill_current.as_mut() {
                    fill.foreground_color =
                        derive_attr_value(e, b"rgb").and_then(|v| normalize_argb(&v));
                }
            }

            (EnumStyleSection::Borders, b"border") => {
                self.border_current = Some(SpecBorderStyle::default());
            }
            (EnumStyleSection::Borders, _) => {
                let enum_side = match c_name {
                    b"left" | b"start" => EnumBorderSide::Left,
                    b"right" | b"end" => EnumBorderSide::Right,
                    b"top" => EnumBorderSide::Top,
                    b"bottom" => EnumBorderSide::Bottom,
                    _ => return,
                };
                if let Some(border) = self.border_current.as_mut() {
                    let line = derive_attr_value(e, b"style").and_then(|v| EnumBorderLine::from_token(&v));
                    match enum_side {
                        EnumBorderSide::Left => border.left = line,
                        EnumBorderSide::Right => border.right = line,
                        EnumBorderSide::Top => border.top = line,
                        EnumBorderSide::Bottom => border.bottom = line,
                    }
                }
            }

            (EnumStyleSection::CellXfs, b"xf") => {
                self.xf_current = Some(SpecCellXf {
                    font_id: derive_attr_usize(e, b"fontId").unwrap_or(0),
                    fill_id: derive_attr_usize(e, b"fillId").unwrap_or(0),
                    border_id: derive_attr_usize(e, b"borderId").unwrap_or(0),
                    alignment: SpecAlignmentStyle::default(),
                });
            }
            (EnumStyleSection::CellXfs, b"alignment") => {
                if let Some(xf) = self.xf_current.as_mut() {
                    xf.alignment = SpecAlignmentStyle {
                        horizontal: derive_attr_value(e, b"horizontal")
                            .and_then(|v| EnumHorizontalAlign::from_token(&v)),
                        vertical: derive_attr_value(e, b"vertical")
                            .and_then(|v| EnumVerticalAlign::from_token(&v)),
                    };
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, c_name: &[u8]) {
        match c_name {
            b"fonts" | b"fills" | b"borders" | b"cellXfs" | b"cellStyleXfs" | b"dxfs" => {
                self.enum_section = EnumStyleSection::Other;
            }
            b"font" => {
                if let Some(font) = self.font_current.take() {
                    self.table.fonts.push(font);
                }
            }
            b"fill" => {
                if let Some(fill) = self.fill_current.take() {
                    self.table.fills.push(fill);
                }
            }
            b"border" => {
                if let Some(border) = self.border_current.take() {
                    self.table.borders.push(border);
                }
            }
            b"xf" => {
                if let Some(xf) = self.xf_current.take() {
                    self.table.cell_xfs.push(xf);
                }
            }
            _ => {}
        }
    }
}

/// Parse the font, fill, border and cell-format tables of `styles.xml`.
pub fn parse_styles_xml(xml: &str) -> Result<SpecStyleTable, String> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf: Vec<u8> = Vec::new();
    let mut state = StyleXmlState {
        enum_section: EnumStyleSection::Other,
        font_current: None,
        fill_current: None,
        border_current: None,
        xf_current: None,
        table: SpecStyleTable::default(),
    };

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => state.open(&e),
            Ok(Event::Empty(e)) => {
                state.open(&e);
                state.close(e.local_name().as_ref());
            }
            Ok(Event::End(e)) => state.close(e.local_name().as_ref()),
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("Failed to parse styles XML: {e}")),
            _ => {}
        }
        buf.clear();
    }

    Ok(state.table)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region AttributeHelpers

fn derive_attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

fn derive_attr_usize(e: &BytesStart<'_>, key: &[u8]) -> Option<usize> {
    derive_attr_value(e, key).and_then(|v| v.trim().parse().ok())
}

fn derive_attr_flag(e: &BytesStart<'_>, key: &[u8]) -> bool {
    derive_attr_flag_default(e, key, false)
}

fn derive_attr_flag_default(e: &BytesStart<'_>, key: &[u8], default: bool) -> bool {
    match derive_attr_value(e, key).as_deref() {
        Some("1") | Some("true") => true,
        Some("0") | Some("false") => false,
        _ => default,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    const C_XML_STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="2">
    <font><sz val="11"/><color theme="1"/><name val="Calibri"/></font>
    <font><b/><sz val="12"/><color rgb="FFFF0000"/><name val="Arial"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border><left style="thin"><color auto="1"/></left><right/><top/><bottom style="double"/><diagonal/></border>
  </borders>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="0" fontId="1" fillId="2" borderId="1" xfId="0" applyFont="1"/>
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0" applyAlignment="1"><alignment horizontal="center" vertical="top"/></xf>
    <xf numFmtId="0" fontId="9" fillId="0" borderId="0" xfId="0"/>
  </cellXfs>
  <dxfs count="1"><dxf><font><b/></font></dxf></dxfs>
</styleSheet>"#;

    #[test]
    fn test_parse_styles_tables() {
        let table = parse_styles_xml(C_XML_STYLES).expect("styles parse");
        assert_eq!(table.fonts.len(), 2);
        assert_eq!(table.fills.len(), 3);
        assert_eq!(table.borders.len(), 2);
        assert_eq!(table.cell_xfs.len(), 4);
        assert_eq!(table.fonts[0].color, None);
        assert_eq!(table.fonts[1].bold, Some(true));
        assert_eq!(table.fonts[1].color.as_deref(), Some("FFFF0000"));
    }

    #[test]
    fn test_resolve_skips_defaults_and_reports_dangling_ids() {
        let table = parse_styles_xml(C_XML_STYLES).expect("styles parse");

        assert_eq!(table.resolve(0), (None, vec![]));

        let (spec_style, l_issues) = table.resolve(1);
        let spec_style = spec_style.expect("styled");
        assert!(l_issues.is_empty());
        assert_eq!(spec_style.font.as_ref().and_then(|f| f.size), Some(12.0));
        let fill = spec_style.fill.expect("fill");
        assert_eq!(fill.pattern_kind, Some(EnumFillPattern::Solid));
        assert_eq!(fill.foreground_color.as_deref(), Some("FFFFFF00"));
        let border = spec_style.border.expect("border");
        assert_eq!(border.left, Some(EnumBorderLine::Thin));
        assert_eq!(border.bottom, Some(EnumBorderLine::Double));
        assert_eq!(border.right, None);

        let (spec_style, _) = table.resolve(2);
        let alignment = spec_style.and_then(|s| s.alignment).expect("alignment");
        assert_eq!(alignment.horizontal, Some(EnumHorizontalAlign::Center));
        assert_eq!(alignment.vertical, Some(EnumVerticalAlign::Top));

        let (spec_style, l_issues) = table.resolve(3);
        assert!(spec_style.is_none());
        assert_eq!(l_issues.len(), 1);
    }

    #[test]
    fn test_parse_sheet_xml_structure() {
        let c_xml = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <dimension ref="A1:C5"/>
  <cols><col min="2" max="3" width="9" hidden="1" outlineLevel="2"/><col min="4" max="4" width="20"/></cols>
  <sheetData>
    <row r="1"><c r="A1" t="s" s="1"><v>0</v></c><c r="B1"><v>2</v></c></row>
    <row r="2" hidden="1" outlineLevel="1"><c r="A2"><v>1</v></c></row>
    <row r="3" outlineLevel="1"><c><v>1</v></c><c s="2"><v>5</v></c></row>
  </sheetData>
  <mergeCells count="1"><mergeCell ref="A1:B1"/></mergeCells>
  <pageSetup orientation="landscape" paperSize="9"/>
</worksheet>"#;
        let meta = parse_sheet_xml(c_xml).expect("sheet parse");

        assert_eq!(meta.dimension, Some(SpecRangeRef::new(0, 0, 4, 2)));
        assert_eq!(meta.row_outline.len(), 2);
        assert!(meta.row_outline[&1].hidden());
        assert!(!meta.row_outline[&2].hidden());
        assert_eq!(meta.column_outline.len(), 2);
        assert_eq!(meta.column_outline[&1].level(), 2);
        assert!(meta.column_outline[&2].hidden());
        assert_eq!(meta.cell_style_ids.get(&(0, 0)), Some(&1));
        assert_eq!(meta.cell_style_ids.get(&(2, 1)), Some(&2));
        assert_eq!(meta.cell_extent, (3, 2));
        assert_eq!(meta.merged_refs, vec!["A1:B1".to_string()]);
        assert_eq!(meta.orientation, EnumPageOrientation::Landscape);
        assert_eq!(meta.paper_size, Some(9));
    }

    #[test]
    fn test_parse_workbook_and_relationships() {
        let c_xml_workbook = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Sales" sheetId="1" r:id="rId1"/>
    <sheet name="Notes &amp; Misc" sheetId="2" state="hidden" r:id="rId2"/>
  </sheets>
</workbook>"#;
        let l_sheets = parse_workbook_xml(c_xml_workbook).expect("workbook parse");
        assert_eq!(
            l_sheets,
            vec![
                ("Sales".to_string(), Some("rId1".to_string()), true),
                ("Notes & Misc".to_string(), Some("rId2".to_string()), false),
            ]
        );

        let c_xml_rels = r#"<Relationships>
  <Relationship Id="rId1" Type="x/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="x/worksheet" Target="/xl/worksheets/sheet2.xml"/>
</Relationships>"#;
        let dict_rels = parse_relationships_xml(c_xml_rels).expect("rels parse");
        assert_eq!(resolve_part_path(&dict_rels["rId1"]), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_part_path(&dict_rels["rId2"]), "xl/worksheets/sheet2.xml");
        assert_eq!(resolve_part_path("../customXml/item1.xml"), "customXml/item1.xml");
    }
}
