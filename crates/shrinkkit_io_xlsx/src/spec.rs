//! Shared document model, style model and option specifications.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::conf::{
    C_BATCH_PATTERN_DEFAULT, C_BATCH_SUFFIX_DEFAULT, C_TEMPORAL_NUM_FORMAT, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX,
};
use crate::error::ModelError;
use crate::report::{EnumDiagnosticKind, ReportDiagnostics};
use crate::util::{derive_cell_ref, derive_column_label, derive_grid_extent, parse_range_ref};

////////////////////////////////////////////////////////////////////////////////
// #region CellValue

/// Tagged cell value.
///
/// Formulas are not represented; capture keeps their last computed value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCell {
    /// Blank cell.
    #[default]
    Empty,
    /// Text value.
    Text(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
    /// Date/time value in canonical text form (`YYYY-MM-DD HH:MM:SS`).
    Temporal(String),
}

impl EnumCell {
    /// Whether the cell holds no value.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region OutlineSpecification

/// Outline state of one row or column.
///
/// Only grouped rows/columns carry an entry, so `level` is always `>= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecOutlineEntry {
    level: u8,
    hidden: bool,
}

impl SpecOutlineEntry {
    /// Build an entry; level 0 means "ungrouped" and yields `None`.
    pub fn new(level: u8, hidden: bool) -> Option<Self> {
        if level == 0 {
            return None;
        }
        Some(Self { level, hidden })
    }

    /// Outline nesting depth.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Whether the row/column is collapsed out of view.
    pub fn hidden(&self) -> bool {
        self.hidden
    }

    /// Wire encoding: magnitude is the level, negative means hidden.
    pub fn to_signed(&self) -> i64 {
        let n_level = i64::from(self.level);
        if self.hidden { -n_level } else { n_level }
    }

    /// Inverse of [`Self::to_signed`]. Zero decodes to `None`.
    pub fn from_signed(value: i64) -> Result<Option<Self>, String> {
        let n_level = u8::try_from(value.unsigned_abs())
            .map_err(|_| format!("Outline level out of range: {value}"))?;
        Ok(Self::new(n_level, value < 0))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StyleTokens

/// Fill pattern kinds, using OOXML `patternType` tokens on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumFillPattern {
    None,
    Solid,
    MediumGray,
    DarkGray,
    LightGray,
    DarkHorizontal,
    DarkVertical,
    DarkDown,
    DarkUp,
    DarkGrid,
    DarkTrellis,
    LightHorizontal,
    LightVertical,
    LightDown,
    LightUp,
    LightGrid,
    LightTrellis,
    Gray125,
    Gray0625,
}

impl EnumFillPattern {
    /// OOXML token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Solid => "solid",
            Self::MediumGray => "mediumGray",
            Self::DarkGray => "darkGray",
            Self::LightGray => "lightGray",
            Self::DarkHorizontal => "darkHorizontal",
            Self::DarkVertical => "darkVertical",
            Self::DarkDown => "darkDown",
            Self::DarkUp => "darkUp",
            Self::DarkGrid => "darkGrid",
            Self::DarkTrellis => "darkTrellis",
            Self::LightHorizontal => "lightHorizontal",
            Self::LightVertical => "lightVertical",
            Self::LightDown => "lightDown",
            Self::LightUp => "lightUp",
            Self::LightGrid => "lightGrid",
            Self::LightTrellis => "lightTrellis",
            Self::Gray125 => "gray125",
            Self::Gray0625 => "gray0625",
        }
    }

    /// Parse an OOXML token.
    pub fn from_token(token: &str) -> Option<Self> {
        let enum_pattern = match token {
            "none" => Self::None,
            "solid" => Self::Solid,
            "mediumGray" => Self::MediumGray,
            "darkGray" => Self::DarkGray,
            "lightGray" => Self::LightGray,
            "darkHorizontal" => Self::DarkHorizontal,
            "darkVertical" => Self::DarkVertical,
            "darkDown" => Self::DarkDown,
            "darkUp" => Self::DarkUp,
            "darkGrid" => Self::DarkGrid,
            "darkTrellis" => Self::DarkTrellis,
            "lightHorizontal" => Self::LightHorizontal,
            "lightVertical" => Self::LightVertical,
            "lightDown" => Self::LightDown,
            "lightUp" => Self::LightUp,
            "lightGrid" => Self::LightGrid,
            "lightTrellis" => Self::LightTrellis,
            "gray125" => Self::Gray125,
            "gray0625" => Self::Gray0625,
            _ => return None,
        };
        Some(enum_pattern)
    }
}

/// Border line styles. Absence of a side is `None` at the field level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumBorderLine {
    Thin,
    Medium,
    Dashed,
    Dotted,
    Thick,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantDashDot,
}

impl EnumBorderLine {
    /// OOXML token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thin => "thin",
            Self::Medium => "medium",
            Self::Dashed => "dashed",
            Self::Dotted => "dotted",
            Self::Thick => "thick",
            Self::Double => "double",
            Self::Hair => "hair",
            Self::MediumDashed => "mediumDashed",
            Self::DashDot => "dashDot",
            Self::MediumDashDot => "mediumDashDot",
            Self::DashDotDot => "dashDotDot",
            Self::MediumDashDotDot => "mediumDashDotDot",
            Self::SlantDashDot => "slantDashDot",
        }
    }

    /// Parse an OOXML token. `"none"` is not a line and yields `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        let enum_line = match token {
            "thin" => Self::Thin,
            "medium" => Self::Medium,
            "dashed" => Self::Dashed,
            "dotted" => Self::Dotted,
            "thick" => Self::Thick,
            "double" => Self::Double,
            "hair" => Self::Hair,
            "mediumDashed" => Self::MediumDashed,
            "dashDot" => Self::DashDot,
            "mediumDashDot" => Self::MediumDashDot,
            "dashDotDot" => Self::DashDotDot,
            "mediumDashDotDot" => Self::MediumDashDotDot,
            "slantDashDot" => Self::SlantDashDot,
            _ => return None,
        };
        Some(enum_line)
    }
}

/// Horizontal alignment tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumHorizontalAlign {
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterContinuous,
    Distributed,
}

impl EnumHorizontalAlign {
    /// OOXML token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Fill => "fill",
            Self::Justify => "justify",
            Self::CenterContinuous => "centerContinuous",
            Self::Distributed => "distributed",
        }
    }

    /// Parse an OOXML token.
    pub fn from_token(token: &str) -> Option<Self> {
        let enum_align = match token {
            "general" => Self::General,
            "left" => Self::Left,
            "center" => Self::Center,
            "right" => Self::Right,
            "fill" => Self::Fill,
            "justify" => Self::Justify,
            "centerContinuous" => Self::CenterContinuous,
            "distributed" => Self::Distributed,
            _ => return None,
        };
        Some(enum_align)
    }
}

/// Vertical alignment tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumVerticalAlign {
    Top,
    Center,
    Bottom,
    Justify,
    Distributed,
}

impl EnumVerticalAlign {
    /// OOXML token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Center => "center",
            Self::Bottom => "bottom",
            Self::Justify => "justify",
            Self::Distributed => "distributed",
        }
    }

    /// Parse an OOXML token.
    pub fn from_token(token: &str) -> Option<Self> {
        let enum_align = match token {
            "top" => Self::Top,
            "center" => Self::Center,
            "bottom" => Self::Bottom,
            "justify" => Self::Justify,
            "distributed" => Self::Distributed,
            _ => return None,
        };
        Some(enum_align)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellStyleSpecification

/// Font attributes. Colors are kept as captured text (e.g. `FFFF0000`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecFontStyle {
    /// Font family name.
    pub name: Option<String>,
    /// Font size in points.
    pub size: Option<f64>,
    /// Bold flag.
    pub bold: Option<bool>,
    /// Italic flag.
    pub italic: Option<bool>,
    /// Font color token.
    pub color: Option<String>,
}

impl SpecFontStyle {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.size.is_none()
            && self.bold.is_none()
            && self.italic.is_none()
            && self.color.is_none()
    }
}

/// Fill attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecFillStyle {
    /// Pattern kind.
    pub pattern_kind: Option<EnumFillPattern>,
    /// Pattern foreground color token.
    pub foreground_color: Option<String>,
}

impl SpecFillStyle {
    pub fn is_empty(&self) -> bool {
        self.pattern_kind.is_none() && self.foreground_color.is_none()
    }
}

/// Per-side border lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecBorderStyle {
    pub left: Option<EnumBorderLine>,
    pub right: Option<EnumBorderLine>,
    pub top: Option<EnumBorderLine>,
    pub bottom: Option<EnumBorderLine>,
}

impl SpecBorderStyle {
    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none() && self.top.is_none() && self.bottom.is_none()
    }
}

/// Cell alignment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecAlignmentStyle {
    pub horizontal: Option<EnumHorizontalAlign>,
    pub vertical: Option<EnumVerticalAlign>,
}

impl SpecAlignmentStyle {
    pub fn is_empty(&self) -> bool {
        self.horizontal.is_none() && self.vertical.is_none()
    }
}

/// Style of one cell. Every component is independently optional.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecCellStyle {
    pub font: Option<SpecFontStyle>,
    pub fill: Option<SpecFillStyle>,
    pub border: Option<SpecBorderStyle>,
    pub alignment: Option<SpecAlignmentStyle>,
}

impl SpecCellStyle {
    /// Whether no component carries any attribute.
    pub fn is_empty(&self) -> bool {
        self.font.as_ref().is_none_or(SpecFontStyle::is_empty)
            && self.fill.as_ref().is_none_or(SpecFillStyle::is_empty)
            && self.border.as_ref().is_none_or(SpecBorderStyle::is_empty)
            && self.alignment.as_ref().is_none_or(SpecAlignmentStyle::is_empty)
    }

    /// Drop empty components; return `None` when nothing is left.
    pub fn normalized(self) -> Option<Self> {
        let spec_style = Self {
            font: self.font.filter(|v| !v.is_empty()),
            fill: self.fill.filter(|v| !v.is_empty()),
            border: self.border.filter(|v| !v.is_empty()),
            alignment: self.alignment.filter(|v| !v.is_empty()),
        };
        if spec_style.is_empty() {
            None
        } else {
            Some(spec_style)
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RangeSpecification

/// Rectangular cell range with zero-based inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecRangeRef {
    pub row_start: usize,
    pub col_start: usize,
    pub row_end: usize,
    pub col_end: usize,
}

impl SpecRangeRef {
    /// Build a range from two corners in any order.
    pub fn new(row_a: usize, col_a: usize, row_b: usize, col_b: usize) -> Self {
        Self {
            row_start: row_a.min(row_b),
            col_start: col_a.min(col_b),
            row_end: row_a.max(row_b),
            col_end: col_a.max(col_b),
        }
    }

    pub fn is_single_cell(&self) -> bool {
        self.row_start == self.row_end && self.col_start == self.col_end
    }

    /// Whether the two ranges share at least one cell.
    pub fn overlaps(&self, other: &SpecRangeRef) -> bool {
        self.row_start <= other.row_end
            && other.row_start <= self.row_end
            && self.col_start <= other.col_end
            && other.col_start <= self.col_end
    }

    /// Whether the range fits inside `n_rows` x `n_cols`.
    pub fn fits_within(&self, dimensions: &SpecSheetDimensions) -> bool {
        self.row_end < dimensions.n_rows && self.col_end < dimensions.n_cols
    }
}

impl fmt::Display for SpecRangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c_start = derive_cell_ref(self.row_start, self.col_start);
        if self.is_single_cell() {
            return write!(f, "{c_start}");
        }
        write!(f, "{c_start}:{}", derive_cell_ref(self.row_end, self.col_end))
    }
}

impl FromStr for SpecRangeRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_range_ref(s).ok_or_else(|| format!("Invalid range reference: {s:?}"))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetSpecification

static CELL_EMPTY: EnumCell = EnumCell::Empty;

/// Recorded used-range size of a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpecSheetDimensions {
    pub n_rows: usize,
    pub n_cols: usize,
}

/// Page orientation from page setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnumPageOrientation {
    #[default]
    Unset,
    Portrait,
    Landscape,
}

impl EnumPageOrientation {
    /// Wire token; `None` for unset.
    pub fn as_token(&self) -> Option<&'static str> {
        match self {
            Self::Unset => None,
            Self::Portrait => Some("portrait"),
            Self::Landscape => Some("landscape"),
        }
    }

    /// Parse a wire token; unknown tokens are treated as unset.
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some("portrait") => Self::Portrait,
            Some("landscape") => Self::Landscape,
            _ => Self::Unset,
        }
    }
}

/// Sheet-level properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecSheetProperties {
    /// Sheet is shown in the tab bar.
    pub is_visible: bool,
    /// Page orientation.
    pub orientation: EnumPageOrientation,
    /// OOXML paper size code.
    pub paper_size: Option<u32>,
}

impl Default for SpecSheetProperties {
    fn default() -> Self {
        Self {
            is_visible: true,
            orientation: EnumPageOrientation::Unset,
            paper_size: None,
        }
    }
}

/// One captured sheet.
///
/// Rows and columns are zero-based in memory; labels and 1-based row numbers
/// only appear on the wire.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSheet {
    /// Sheet name, unique within its document.
    pub name: String,
    /// Row-major cell values anchored at `A1`. Rows may be jagged.
    pub grid: Vec<Vec<EnumCell>>,
    /// Recorded used-range size; a floor for reconstruction.
    pub dimensions: SpecSheetDimensions,
    /// Outline entries by row index.
    pub row_outline: BTreeMap<usize, SpecOutlineEntry>,
    /// Outline entries by column index.
    pub column_outline: BTreeMap<usize, SpecOutlineEntry>,
    /// Merged regions.
    pub merged_ranges: BTreeSet<SpecRangeRef>,
    /// Styles by `(row, column)` index.
    pub cell_styles: BTreeMap<(usize, usize), SpecCellStyle>,
    /// Visibility and page setup.
    pub sheet_properties: SpecSheetProperties,
}

impl SpecSheet {
    /// Empty sheet with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// `(rows, widest row)` of the grid itself.
    pub fn grid_extent(&self) -> (usize, usize) {
        derive_grid_extent(&self.grid)
    }

    /// Value at `(row, col)`, treating cells beyond the grid as empty.
    pub fn cell(&self, row_idx: usize, col_idx: usize) -> &EnumCell {
        self.grid
            .get(row_idx)
            .and_then(|row| row.get(col_idx))
            .unwrap_or(&CELL_EMPTY)
    }

    /// Enforce sheet invariants.
    ///
    /// Dimensions are raised to the grid extents (never lowered) and capped at
    /// Excel limits. Styles, merges and outline entries addressing cells
    /// outside the dimensions are dropped and recorded.
    pub fn normalize(&mut self, report: &mut ReportDiagnostics) {
        let (n_rows_grid, n_cols_grid) = self.grid_extent();
        self.dimensions.n_rows = self.dimensions.n_rows.max(n_rows_grid);
        self.dimensions.n_cols = self.dimensions.n_cols.max(n_cols_grid);

        if self.dimensions.n_rows > N_NROWS_EXCEL_MAX || self.dimensions.n_cols > N_NCOLS_EXCEL_MAX
        {
            report.record(
                EnumDiagnosticKind::OutOfRangeReference,
                Some(&self.name),
                None,
                format!(
                    "Dimensions {}x{} exceed Excel limits; capped.",
                    self.dimensions.n_rows, self.dimensions.n_cols
                ),
            );
            self.dimensions.n_rows = self.dimensions.n_rows.min(N_NROWS_EXCEL_MAX);
            self.dimensions.n_cols = self.dimensions.n_cols.min(N_NCOLS_EXCEL_MAX);
        }

        let dims = self.dimensions;
        let c_sheet_name = self.name.clone();

        self.row_outline.retain(|row_idx, _| {
            let if_keep = *row_idx < dims.n_rows;
            if !if_keep {
                report.record(
                    EnumDiagnosticKind::OutOfRangeReference,
                    Some(&c_sheet_name),
                    Some((row_idx + 1).to_string()),
                    "Row outline entry outside sheet dimensions.",
                );
            }
            if_keep
        });
        self.column_outline.retain(|col_idx, _| {
            let if_keep = *col_idx < dims.n_cols;
            if !if_keep {
                report.record(
                    EnumDiagnosticKind::OutOfRangeReference,
                    Some(&c_sheet_name),
                    Some(derive_column_label(*col_idx)),
                    "Column outline entry outside sheet dimensions.",
                );
            }
            if_keep
        });
        self.merged_ranges.retain(|range_ref| {
            let if_keep = range_ref.fits_within(&dims);
            if !if_keep {
                report.record(
                    EnumDiagnosticKind::OutOfRangeReference,
                    Some(&c_sheet_name),
                    Some(range_ref.to_string()),
                    "Merged range outside sheet dimensions.",
                );
            }
            if_keep
        });

        let dict_styles = std::mem::take(&mut self.cell_styles);
        for ((row_idx, col_idx), spec_style) in dict_styles {
            if row_idx >= dims.n_rows || col_idx >= dims.n_cols {
                report.record(
                    EnumDiagnosticKind::OutOfRangeReference,
                    Some(&c_sheet_name),
                    Some(derive_cell_ref(row_idx, col_idx)),
                    "Cell style outside sheet dimensions.",
                );
                continue;
            }
            if let Some(spec_style) = spec_style.normalized() {
                self.cell_styles.insert((row_idx, col_idx), spec_style);
            }
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DocumentSpecification

/// Captured workbook. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecDocument {
    source_identifier: String,
    sheets: Vec<SpecSheet>,
}

impl SpecDocument {
    /// Validate and freeze a document.
    ///
    /// Every sheet is normalized (see [`SpecSheet::normalize`]); anomalies go
    /// into `report`. Duplicate sheet names are rejected.
    pub fn new(
        source_identifier: impl Into<String>,
        mut sheets: Vec<SpecSheet>,
        report: &mut ReportDiagnostics,
    ) -> Result<Self, ModelError> {
        let mut set_names = BTreeSet::new();
        for sheet in &sheets {
            if !set_names.insert(sheet.name.as_str()) {
                return Err(ModelError::DuplicateSheetName(sheet.name.clone()));
            }
        }
        for sheet in &mut sheets {
            sheet.normalize(report);
        }
        Ok(Self {
            source_identifier: source_identifier.into(),
            sheets,
        })
    }

    /// Name or path of the captured source.
    pub fn source_identifier(&self) -> &str {
        &self.source_identifier
    }

    /// Sheets in source order.
    pub fn sheets(&self) -> &[SpecSheet] {
        &self.sheets
    }

    /// Look up a sheet by exact name.
    pub fn sheet(&self, name: &str) -> Option<&SpecSheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }
}

/// Per-sheet counters returned by [`crate::facade::describe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetStructure {
    pub name: String,
    pub n_rows: usize,
    pub n_cols: usize,
    pub n_rows_grouped: usize,
    pub n_cols_grouped: usize,
    pub n_cells_styled: usize,
    pub n_ranges_merged: usize,
    pub is_visible: bool,
}

/// Workbook structure summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecStructureInfo {
    pub source_identifier: String,
    pub sheet_count: usize,
    pub sheets: Vec<SpecSheetStructure>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Capture switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCaptureOptions {
    /// Record row/column outline levels.
    pub if_capture_outline: bool,
    /// Record per-cell styles.
    pub if_capture_styles: bool,
    /// Record merged ranges.
    pub if_capture_merges: bool,
}

impl Default for SpecCaptureOptions {
    fn default() -> Self {
        Self {
            if_capture_outline: true,
            if_capture_styles: true,
            if_capture_merges: true,
        }
    }
}

/// Wire serialization switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecEncodeOptions {
    /// Indent JSON output.
    pub if_pretty: bool,
}

impl Default for SpecEncodeOptions {
    fn default() -> Self {
        Self { if_pretty: true }
    }
}

/// Output sheet-name conflict handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumSheetNameConflictRule {
    /// Invalid or colliding names fail that sheet.
    #[default]
    Fail,
    /// Sanitize and suffix names until unique.
    Rename,
}

/// Reconstruction switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRebuildOptions {
    /// Run the grouping pass.
    pub if_apply_grouping: bool,
    /// Run the formatting pass (styles, merges, sheet properties).
    pub if_apply_formatting: bool,
    /// Sheet-name conflict handling.
    pub rule_sheet_name_conflict: EnumSheetNameConflictRule,
    /// Number format given to temporal cells.
    pub temporal_num_format: String,
}

impl Default for SpecRebuildOptions {
    fn default() -> Self {
        Self {
            if_apply_grouping: true,
            if_apply_formatting: true,
            rule_sheet_name_conflict: EnumSheetNameConflictRule::Fail,
            temporal_num_format: C_TEMPORAL_NUM_FORMAT.to_string(),
        }
    }
}

/// Directory batch conversion options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecBatchOptions {
    /// Glob matched against file names.
    pub pattern: String,
    /// Extension of written files.
    pub suffix_out: String,
    /// Maximum worker threads.
    pub num_workers_max: Option<usize>,
    /// Capture switches for every file.
    pub capture_options: SpecCaptureOptions,
    /// Wire switches for every file.
    pub encode_options: SpecEncodeOptions,
}

impl Default for SpecBatchOptions {
    fn default() -> Self {
        Self {
            pattern: C_BATCH_PATTERN_DEFAULT.to_string(),
            suffix_out: C_BATCH_SUFFIX_DEFAULT.to_string(),
            num_workers_max: None,
            capture_options: SpecCaptureOptions::default(),
            encode_options: SpecEncodeOptions::default(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outline_sign_encoding_is_inverse_for_positive_levels() {
        for n_level in 1..=7u8 {
            for if_hidden in [false, true] {
                let entry = SpecOutlineEntry::new(n_level, if_hidden).expect("non-zero level");
                let n_signed = entry.to_signed();
                assert_eq!(n_signed < 0, if_hidden);
                assert_eq!(n_signed.unsigned_abs(), u64::from(n_level));
                assert_eq!(SpecOutlineEntry::from_signed(n_signed), Ok(Some(entry)));
            }
        }
    }

    #[test]
    fn test_outline_level_zero_is_absent() {
        assert_eq!(SpecOutlineEntry::new(0, true), None);
        assert_eq!(SpecOutlineEntry::from_signed(0), Ok(None));
        assert!(SpecOutlineEntry::from_signed(-300).is_err());
    }

    #[test]
    fn test_style_normalized_drops_empty_components() {
        let spec_style = SpecCellStyle {
            font: Some(SpecFontStyle::default()),
            border: Some(SpecBorderStyle {
                left: Some(EnumBorderLine::Thin),
                ..Default::default()
            }),
            ..Default::default()
        };
        let spec_style = spec_style.normalized().expect("border survives");
        assert!(spec_style.font.is_none());
        assert!(spec_style.border.is_some());

        let spec_empty = SpecCellStyle {
            fill: Some(SpecFillStyle::default()),
            ..Default::default()
        };
        assert!(spec_empty.normalized().is_none());
    }

    #[test]
    fn test_range_ref_display_and_overlap() {
        let range_a: SpecRangeRef = "B3:A1".parse().expect("valid range");
        assert_eq!(range_a, SpecRangeRef::new(0, 0, 2, 1));
        assert_eq!(range_a.to_string(), "A1:B3");

        let range_b: SpecRangeRef = "B2:C4".parse().expect("valid range");
        let range_c: SpecRangeRef = "D1:E2".parse().expect("valid range");
        assert!(range_a.overlaps(&range_b));
        assert!(!range_a.overlaps(&range_c));
        assert!("A0".parse::<SpecRangeRef>().is_err());
    }

    #[test]
    fn test_sheet_normalize_raises_dimensions_and_drops_out_of_range() {
        let mut sheet = SpecSheet::new("Sales");
        sheet.grid = vec![vec![EnumCell::Number(1.0); 3]; 4];
        sheet.dimensions = SpecSheetDimensions { n_rows: 5, n_cols: 2 };
        sheet
            .row_outline
            .insert(9, SpecOutlineEntry::new(1, false).expect("level"));
        sheet.merged_ranges.insert(SpecRangeRef::new(0, 0, 0, 1));
        sheet.merged_ranges.insert(SpecRangeRef::new(4, 0, 6, 0));
        sheet.cell_styles.insert(
            (1, 1),
            SpecCellStyle {
                alignment: Some(SpecAlignmentStyle {
                    horizontal: Some(EnumHorizontalAlign::Center),
                    vertical: None,
                }),
                ..Default::default()
            },
        );
        sheet.cell_styles.insert((2, 2), SpecCellStyle::default());

        let mut report = ReportDiagnostics::default();
        sheet.normalize(&mut report);

        assert_eq!(sheet.dimensions, SpecSheetDimensions { n_rows: 5, n_cols: 3 });
        assert!(sheet.row_outline.is_empty());
        assert_eq!(sheet.merged_ranges.len(), 1);
        assert_eq!(sheet.cell_styles.len(), 1);
        assert_eq!(report.count_of(EnumDiagnosticKind::OutOfRangeReference), 2);
    }

    #[test]
    fn test_document_rejects_duplicate_sheet_names() {
        let mut report = ReportDiagnostics::default();
        let res = SpecDocument::new(
            "book.xlsx",
            vec![SpecSheet::new("A"), SpecSheet::new("A")],
            &mut report,
        );
        assert!(matches!(res, Err(ModelError::DuplicateSheetName(name)) if name == "A"));
    }
}
