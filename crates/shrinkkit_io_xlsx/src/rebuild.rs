//! Reconstruction engine: [`SpecDocument`] to a new xlsx workbook.
//!
//! Runs three passes over every sheet. The value pass is mandatory and can
//! fail a single sheet. The grouping and formatting passes are best-effort:
//! every item that cannot be applied is recorded and skipped.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{Datelike, Timelike};
use rust_xlsxwriter::{
    Color, ExcelDateTime, Format, FormatAlign, FormatBorder, FormatPattern, Workbook, Worksheet,
    XlsxError,
};

use crate::conf::N_OUTLINE_LEVEL_MAX;
use crate::error::ReconstructError;
use crate::report::{
    EnumDiagnosticKind, EnumRebuildStage, ReportDiagnostics, ReportRebuild, SpecSheetFailure,
};
use crate::spec::{
    EnumBorderLine, EnumCell, EnumFillPattern, EnumHorizontalAlign, EnumPageOrientation,
    EnumSheetNameConflictRule, EnumVerticalAlign, SpecAlignmentStyle, SpecBorderStyle,
    SpecCellStyle, SpecDocument, SpecFillStyle, SpecFontStyle, SpecRangeRef, SpecRebuildOptions,
    SpecSheet, SpecSheetDimensions,
};
use crate::util::{
    create_sheet_identifier, derive_cell_ref, derive_column_label, is_within_excel_limits,
    parse_color_token, parse_temporal, sanitize_sheet_name, validate_sheet_name,
};

/// Largest font size Excel accepts.
const N_FONT_SIZE_MAX: f64 = 409.0;

////////////////////////////////////////////////////////////////////////////////
// #region OutputWorkbook

/// One sheet of the output workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecOutputSheet {
    /// Name in the output (differs from the source only under `Rename`).
    pub name: String,
    /// Name in the reconstructed document.
    pub name_source: String,
    /// Logical extent, at least the recorded dimensions.
    pub dimensions: SpecSheetDimensions,
}

/// Reconstructed workbook, buffered in memory until saved.
pub struct OutputWorkbook {
    workbook: Workbook,
    l_sheets: Vec<SpecOutputSheet>,
}

impl OutputWorkbook {
    /// Output sheet names in order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.l_sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }

    /// Output sheets in order.
    pub fn sheets(&self) -> &[SpecOutputSheet] {
        &self.l_sheets
    }

    /// Logical extent of an output sheet.
    pub fn sheet_extent(&self, name: &str) -> Option<SpecSheetDimensions> {
        self.l_sheets
            .iter()
            .find(|sheet| sheet.name == name)
            .map(|sheet| sheet.dimensions)
    }

    /// Write the workbook to `path`.
    pub fn save(&mut self, path: &Path) -> Result<(), ReconstructError> {
        self.workbook
            .save(path)
            .map_err(|e| ReconstructError::Save {
                message: derive_xlsx_error_text(e),
            })
    }

    /// Serialize the workbook into xlsx bytes.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>, ReconstructError> {
        self.workbook
            .save_to_buffer()
            .map_err(|e| ReconstructError::Save {
                message: derive_xlsx_error_text(e),
            })
    }
}

/// Result of a successful reconstruction.
pub struct SpecRebuildOutput {
    pub workbook: OutputWorkbook,
    pub report: ReportRebuild,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Reconstruct

/// Rebuild a workbook from a document.
///
/// Fails only when the value pass leaves no usable sheet. Every other problem
/// lands in the returned report.
pub fn reconstruct(
    document: &SpecDocument,
    options: &SpecRebuildOptions,
) -> Result<SpecRebuildOutput, ReconstructError> {
    let mut rebuilder = WorkbookRebuilder::new(options);
    log::debug!(
        "Reconstructing {} sheet(s) from {}.",
        document.sheets().len(),
        document.source_identifier()
    );

    let mut l_builds: Vec<SheetBuild<'_>> = document
        .sheets()
        .iter()
        .filter_map(|sheet| rebuilder.write_values(sheet))
        .collect();
    if l_builds.is_empty() {
        rebuilder.report.stage = EnumRebuildStage::Failed;
        log::error!("{}", rebuilder.report);
        return Err(ReconstructError::NoUsableSheets {
            failures: rebuilder.report.sheets_failed,
        });
    }
    rebuilder.report.stage = EnumRebuildStage::ValuesWritten;

    if options.if_apply_grouping {
        for build in &mut l_builds {
            rebuilder.apply_grouping(build);
        }
    }
    rebuilder.report.stage = EnumRebuildStage::GroupingApplied;

    if options.if_apply_formatting {
        for build in &mut l_builds {
            rebuilder.apply_formatting(build);
        }
    }
    rebuilder.report.stage = EnumRebuildStage::FormattingApplied;

    rebuilder.ensure_visible_sheet(&mut l_builds);

    let mut workbook = Workbook::new();
    let mut l_sheets = Vec::with_capacity(l_builds.len());
    for build in l_builds {
        rebuilder.report.sheets_written.push(build.c_name_out.clone());
        l_sheets.push(SpecOutputSheet {
            name: build.c_name_out,
            name_source: build.sheet.name.clone(),
            dimensions: build.dimensions,
        });
        workbook.push_worksheet(build.worksheet);
    }
    rebuilder.report.stage = EnumRebuildStage::Done;
    log::debug!("{}", rebuilder.report);

    Ok(SpecRebuildOutput {
        workbook: OutputWorkbook { workbook, l_sheets },
        report: rebuilder.report,
    })
}

/// Per-sheet state carried across passes.
struct SheetBuild<'a> {
    sheet: &'a SpecSheet,
    c_name_out: String,
    worksheet: Worksheet,
    dimensions: SpecSheetDimensions,
    if_visible: bool,
}

struct WorkbookRebuilder<'o> {
    options: &'o SpecRebuildOptions,
    fmt_default: Format,
    fmt_temporal: Format,
    set_names_folded: BTreeSet<String>,
    report: ReportRebuild,
}

impl<'o> WorkbookRebuilder<'o> {
    fn new(options: &'o SpecRebuildOptions) -> Self {
        Self {
            options,
            fmt_default: Format::new(),
            fmt_temporal: Format::new().set_num_format(&options.temporal_num_format),
            set_names_folded: BTreeSet::new(),
            report: ReportRebuild::default(),
        }
    }

    fn diagnostics(&mut self) -> &mut ReportDiagnostics {
        &mut self.report.diagnostics
    }

    fn fail_sheet(&mut self, sheet_name: &str, reason: String) {
        self.report.diagnostics.record(
            EnumDiagnosticKind::SheetReconstructionFailure,
            Some(sheet_name),
            None,
            reason.clone(),
        );
        self.report.sheets_failed.push(SpecSheetFailure {
            sheet_name: sheet_name.to_string(),
            reason,
        });
    }

    ////////////////////////////////////////////////////////////////////////////
    // #region ValuePass

    /// Create the output sheet and write its values. `None` fails the sheet.
    fn write_values<'a>(&mut self, sheet: &'a SpecSheet) -> Option<SheetBuild<'a>> {
        let c_name_out = match self.derive_output_sheet_name(&sheet.name) {
            Ok(val) => val,
            Err(reason) => {
                self.fail_sheet(&sheet.name, reason);
                return None;
            }
        };

        let mut worksheet = Worksheet::new();
        if let Err(e) = worksheet.set_name(&c_name_out) {
            self.set_names_folded.remove(&c_name_out.to_lowercase());
            self.fail_sheet(&sheet.name, derive_xlsx_error_text(e));
            return None;
        }

        for (row_idx, l_cells) in sheet.grid.iter().enumerate() {
            for (col_idx, cell) in l_cells.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                if !is_within_excel_limits(row_idx, col_idx) {
                    self.diagnostics().record(
                        EnumDiagnosticKind::CellDegraded,
                        Some(&sheet.name),
                        Some(format!("R{}C{}", row_idx + 1, col_idx + 1)),
                        "Cell outside Excel limits; dropped.",
                    );
                    continue;
                }
                let format = self.derive_value_format(cell);
                if let Err(reason) =
                    self.write_cell_degrading(&mut worksheet, sheet, row_idx, col_idx, cell, &format)
                {
                    self.diagnostics().record(
                        EnumDiagnosticKind::CellDegraded,
                        Some(&sheet.name),
                        Some(derive_cell_ref(row_idx, col_idx)),
                        format!("Value not written: {reason}"),
                    );
                }
            }
        }

        let (n_rows_grid, n_cols_grid) = sheet.grid_extent();
        let dimensions = SpecSheetDimensions {
            n_rows: sheet.dimensions.n_rows.max(n_rows_grid),
            n_cols: sheet.dimensions.n_cols.max(n_cols_grid),
        };
        self.write_extent_anchor(&mut worksheet, sheet, &dimensions);

        log::debug!("Sheet {:?} values written as {c_name_out:?}.", sheet.name);
        Some(SheetBuild {
            sheet,
            c_name_out,
            worksheet,
            dimensions,
            if_visible: true,
        })
    }

    /// Resolve the output name under the configured conflict rule.
    fn derive_output_sheet_name(&mut self, name: &str) -> Result<String, String> {
        match self.options.rule_sheet_name_conflict {
            EnumSheetNameConflictRule::Fail => {
                validate_sheet_name(name)?;
                if !self.set_names_folded.insert(name.to_lowercase()) {
                    return Err(format!(
                        "Sheet name {name:?} collides (case-insensitive) with an earlier sheet."
                    ));
                }
                Ok(name.to_string())
            }
            EnumSheetNameConflictRule::Rename => {
                let c_base = sanitize_sheet_name(name, "_");
                let mut c_candidate = c_base.clone();
                let mut n_idx = 1usize;
                while !self.set_names_folded.insert(c_candidate.to_lowercase()) {
                    c_candidate = create_sheet_identifier(&c_base, n_idx);
                    n_idx += 1;
                }
                if c_candidate != name {
                    self.diagnostics().record(
                        EnumDiagnosticKind::SheetDegraded,
                        Some(name),
                        None,
                        format!("Renamed to {c_candidate:?}."),
                    );
                }
                Ok(c_candidate)
            }
        }
    }

    /// Pin the used range to the recorded dimensions.
    ///
    /// Padding is logical; only the bottom-right cell is materialized as an
    /// unformatted blank so the saved file reports the full extent.
    fn write_extent_anchor(
        &mut self,
        worksheet: &mut Worksheet,
        sheet: &SpecSheet,
        dimensions: &SpecSheetDimensions,
    ) {
        if dimensions.n_rows == 0 || dimensions.n_cols == 0 {
            return;
        }
        let (row_idx, col_idx) = (dimensions.n_rows - 1, dimensions.n_cols - 1);
        if !sheet.cell(row_idx, col_idx).is_empty() {
            return;
        }
        let result = cast_row_num(row_idx).and_then(|row_num| {
            worksheet
                .write_blank(row_num, cast_col_num(col_idx)?, &self.fmt_default)
                .map(|_| ())
                .map_err(derive_xlsx_error_text)
        });
        if let Err(reason) = result {
            self.diagnostics().record(
                EnumDiagnosticKind::CellDegraded,
                Some(&sheet.name),
                Some(derive_cell_ref(row_idx, col_idx)),
                format!("Extent anchor not written: {reason}"),
            );
        }
    }

    /// Write one cell; temporal text Excel cannot represent falls back to a string.
    fn write_cell_degrading(
        &mut self,
        worksheet: &mut Worksheet,
        sheet: &SpecSheet,
        row_idx: usize,
        col_idx: usize,
        cell: &EnumCell,
        format: &Format,
    ) -> Result<(), String> {
        match write_cell_with_format(worksheet, row_idx, col_idx, cell, format) {
            Ok(()) => Ok(()),
            Err(reason) => {
                let EnumCell::Temporal(c_text) = cell else {
                    return Err(reason);
                };
                self.diagnostics().record(
                    EnumDiagnosticKind::CellDegraded,
                    Some(&sheet.name),
                    Some(derive_cell_ref(row_idx, col_idx)),
                    format!("Temporal value written as text: {reason}"),
                );
                worksheet
                    .write_string_with_format(
                        cast_row_num(row_idx)?,
                        cast_col_num(col_idx)?,
                        c_text,
                        format,
                    )
                    .map(|_| ())
                    .map_err(derive_xlsx_error_text)
            }
        }
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region GroupingPass

    fn apply_grouping(&mut self, build: &mut SheetBuild<'_>) {
        let sheet = build.sheet;
        for (row_idx, entry) in &sheet.row_outline {
            let result = self.validate_outline_level(entry.level()).and_then(|_| {
                let row_num = cast_row_num(*row_idx)?;
                for _ in 0..entry.level() {
                    build
                        .worksheet
                        .group_rows(row_num, row_num)
                        .map_err(derive_xlsx_error_text)?;
                }
                if entry.hidden() {
                    build
                        .worksheet
                        .set_row_hidden(row_num)
                        .map_err(derive_xlsx_error_text)?;
                }
                Ok(())
            });
            if let Err(reason) = result {
                self.diagnostics().record(
                    EnumDiagnosticKind::GroupingApplicationSkipped,
                    Some(&sheet.name),
                    Some((row_idx + 1).to_string()),
                    reason,
                );
            }
        }

        for (col_idx, entry) in &sheet.column_outline {
            let result = self.validate_outline_level(entry.level()).and_then(|_| {
                let col_num = cast_col_num(*col_idx)?;
                for _ in 0..entry.level() {
                    build
                        .worksheet
                        .group_columns(col_num, col_num)
                        .map_err(derive_xlsx_error_text)?;
                }
                if entry.hidden() {
                    build
                        .worksheet
                        .set_column_hidden(col_num)
                        .map_err(derive_xlsx_error_text)?;
                }
                Ok(())
            });
            if let Err(reason) = result {
                self.diagnostics().record(
                    EnumDiagnosticKind::GroupingApplicationSkipped,
                    Some(&sheet.name),
                    Some(derive_column_label(*col_idx)),
                    reason,
                );
            }
        }
    }

    fn validate_outline_level(&self, level: u8) -> Result<(), String> {
        if level > N_OUTLINE_LEVEL_MAX {
            return Err(format!(
                "Outline level {level} exceeds Excel maximum {N_OUTLINE_LEVEL_MAX}."
            ));
        }
        Ok(())
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region FormattingPass

    fn apply_formatting(&mut self, build: &mut SheetBuild<'_>) {
        let sheet = build.sheet;

        let mut dict_formats: BTreeMap<(usize, usize), Format> = BTreeMap::new();
        for ((row_idx, col_idx), spec_style) in &sheet.cell_styles {
            let format = self.derive_cell_format(sheet, *row_idx, *col_idx, spec_style);
            let cell = sheet.cell(*row_idx, *col_idx);
            if let Err(reason) =
                self.write_cell_degrading(&mut build.worksheet, sheet, *row_idx, *col_idx, cell, &format)
            {
                self.diagnostics().record(
                    EnumDiagnosticKind::StyleApplicationSkipped,
                    Some(&sheet.name),
                    Some(derive_cell_ref(*row_idx, *col_idx)),
                    format!("Styled cell not written: {reason}"),
                );
            }
            dict_formats.insert((*row_idx, *col_idx), format);
        }

        self.apply_merges(build, &dict_formats);
        self.apply_sheet_properties(build);
    }

    /// Build the output format of a styled cell.
    ///
    /// Font, fill, border and alignment are applied independently; a component
    /// that cannot be applied is skipped and recorded.
    fn derive_cell_format(
        &mut self,
        sheet: &SpecSheet,
        row_idx: usize,
        col_idx: usize,
        spec_style: &SpecCellStyle,
    ) -> Format {
        let mut format = self.derive_value_format(sheet.cell(row_idx, col_idx));

        let mut l_skipped: Vec<(&str, String)> = Vec::new();
        if let Some(font) = &spec_style.font {
            match apply_font(format.clone(), font) {
                Ok(val) => format = val,
                Err(reason) => l_skipped.push(("font", reason)),
            }
        }
        if let Some(fill) = &spec_style.fill {
            match apply_fill(format.clone(), fill) {
                Ok(val) => format = val,
                Err(reason) => l_skipped.push(("fill", reason)),
            }
        }
        if let Some(border) = &spec_style.border {
            format = apply_border(format, border);
        }
        if let Some(alignment) = &spec_style.alignment {
            format = apply_alignment(format, alignment);
        }

        for (c_component, reason) in l_skipped {
            self.diagnostics().record(
                EnumDiagnosticKind::StyleApplicationSkipped,
                Some(&sheet.name),
                Some(derive_cell_ref(row_idx, col_idx)),
                format!("{c_component} skipped: {reason}"),
            );
        }
        format
    }

    fn derive_value_format(&self, cell: &EnumCell) -> Format {
        match cell {
            EnumCell::Temporal(_) => self.fmt_temporal.clone(),
            _ => self.fmt_default.clone(),
        }
    }

    /// Merge ranges after styles, then restore the values and styles the
    /// merge blanked out.
    fn apply_merges(&mut self, build: &mut SheetBuild<'_>, dict_formats: &BTreeMap<(usize, usize), Format>) {
        let sheet = build.sheet;
        let mut l_merged: Vec<SpecRangeRef> = Vec::new();

        for range_ref in &sheet.merged_ranges {
            let result = if range_ref.is_single_cell() {
                Err("Single-cell range cannot be merged.".to_string())
            } else if let Some(other) = l_merged.iter().find(|other| other.overlaps(range_ref)) {
                Err(format!("Overlaps merged range {other}."))
            } else {
                self.merge_range(build, range_ref, dict_formats)
            };

            match result {
                Ok(()) => l_merged.push(*range_ref),
                Err(reason) => self.diagnostics().record(
                    EnumDiagnosticKind::MergeApplicationSkipped,
                    Some(&sheet.name),
                    Some(range_ref.to_string()),
                    reason,
                ),
            }
        }
    }

    fn merge_range(
        &mut self,
        build: &mut SheetBuild<'_>,
        range_ref: &SpecRangeRef,
        dict_formats: &BTreeMap<(usize, usize), Format>,
    ) -> Result<(), String> {
        let sheet = build.sheet;
        let (row_first, col_first) = (range_ref.row_start, range_ref.col_start);
        let cell_first = sheet.cell(row_first, col_first);
        let format_first = match dict_formats.get(&(row_first, col_first)) {
            Some(format) => format.clone(),
            None => self.derive_value_format(cell_first),
        };

        build
            .worksheet
            .merge_range(
                cast_row_num(range_ref.row_start)?,
                cast_col_num(range_ref.col_start)?,
                cast_row_num(range_ref.row_end)?,
                cast_col_num(range_ref.col_end)?,
                "",
                &format_first,
            )
            .map_err(derive_xlsx_error_text)?;

        if !cell_first.is_empty() {
            self.write_cell_degrading(
                &mut build.worksheet,
                sheet,
                row_first,
                col_first,
                cell_first,
                &format_first,
            )?;
        }

        for row_idx in range_ref.row_start..=range_ref.row_end {
            for ((_, col_idx), format) in
                dict_formats.range((row_idx, range_ref.col_start)..=(row_idx, range_ref.col_end))
            {
                if (row_idx, *col_idx) == (row_first, col_first) {
                    continue;
                }
                build
                    .worksheet
                    .write_blank(cast_row_num(row_idx)?, cast_col_num(*col_idx)?, format)
                    .map_err(derive_xlsx_error_text)?;
            }
        }
        Ok(())
    }

    fn apply_sheet_properties(&mut self, build: &mut SheetBuild<'_>) {
        let props = &build.sheet.sheet_properties;
        match props.orientation {
            EnumPageOrientation::Landscape => {
                build.worksheet.set_landscape();
            }
            EnumPageOrientation::Portrait => {
                build.worksheet.set_portrait();
            }
            EnumPageOrientation::Unset => {}
        }

        if let Some(n_paper_size) = props.paper_size {
            match u8::try_from(n_paper_size) {
                Ok(n_paper) => {
                    build.worksheet.set_paper_size(n_paper);
                }
                Err(_) => self.diagnostics().record(
                    EnumDiagnosticKind::SheetPropertySkipped,
                    Some(&build.sheet.name),
                    Some("paperSize".to_string()),
                    format!("Paper size {n_paper_size} is not a valid paper code."),
                ),
            }
        }

        build.if_visible = props.is_visible;
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region Visibility

    /// Hide sheets as recorded while keeping one visible, active sheet.
    fn ensure_visible_sheet(&mut self, l_builds: &mut [SheetBuild<'_>]) {
        let idx_active = match l_builds.iter().position(|build| build.if_visible) {
            Some(idx) => idx,
            None => {
                let Some(build) = l_builds.first_mut() else {
                    return;
                };
                build.if_visible = true;
                let c_sheet_name = build.sheet.name.clone();
                self.diagnostics().record(
                    EnumDiagnosticKind::SheetPropertySkipped,
                    Some(&c_sheet_name),
                    Some("sheet_state".to_string()),
                    "Every sheet is hidden; first sheet kept visible.",
                );
                0
            }
        };

        for (idx, build) in l_builds.iter_mut().enumerate() {
            if !build.if_visible {
                build.worksheet.set_hidden(true);
            }
            if idx == idx_active {
                build.worksheet.set_active(true);
            }
        }
    }

    // #endregion
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FormatHelpers

fn apply_font(format: Format, font: &SpecFontStyle) -> Result<Format, String> {
    let mut format = format;
    if let Some(val) = font.name.as_deref().map(str::trim)
        && !val.is_empty()
    {
        format = format.set_font_name(val);
    }
    if let Some(val) = font.size {
        if !(val.is_finite() && val > 0.0 && val <= N_FONT_SIZE_MAX) {
            return Err(format!("invalid font size {val}"));
        }
        format = format.set_font_size(val);
    }
    if font.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if font.italic.unwrap_or(false) {
        format = format.set_italic();
    }
    if let Some(val) = &font.color {
        let n_rgb = parse_color_token(val).ok_or_else(|| format!("invalid color token {val:?}"))?;
        format = format.set_font_color(Color::RGB(n_rgb));
    }
    Ok(format)
}

/// A fill without a pattern (or with `none`) is treated as no fill.
fn apply_fill(format: Format, fill: &SpecFillStyle) -> Result<Format, String> {
    let Some(pattern_kind) = fill.pattern_kind.filter(|p| *p != EnumFillPattern::None) else {
        return Ok(format);
    };
    let mut format = format.set_pattern(derive_format_pattern(pattern_kind));
    if let Some(val) = &fill.foreground_color {
        let n_rgb = parse_color_token(val).ok_or_else(|| format!("invalid color token {val:?}"))?;
        format = format.set_foreground_color(Color::RGB(n_rgb));
    }
    Ok(format)
}

fn apply_border(format: Format, border: &SpecBorderStyle) -> Format {
    let mut format = format;
    if let Some(val) = border.left {
        format = format.set_border_left(derive_format_border(val));
    }
    if let Some(val) = border.right {
        format = format.set_border_right(derive_format_border(val));
    }
    if let Some(val) = border.top {
        format = format.set_border_top(derive_format_border(val));
    }
    if let Some(val) = border.bottom {
        format = format.set_border_bottom(derive_format_border(val));
    }
    format
}

fn apply_alignment(format: Format, alignment: &SpecAlignmentStyle) -> Format {
    let mut format = format;
    if let Some(val) = alignment.horizontal {
        format = format.set_align(derive_format_align_horizontal(val));
    }
    if let Some(val) = alignment.vertical {
        format = format.set_align(derive_format_align_vertical(val));
    }
    format
}

fn derive_format_pattern(pattern_kind: EnumFillPattern) -> FormatPattern {
    match pattern_kind {
        EnumFillPattern::None => FormatPattern::None,
        EnumFillPattern::Solid => FormatPattern::Solid,
        EnumFillPattern::MediumGray => FormatPattern::MediumGray,
        EnumFillPattern::DarkGray => FormatPattern::DarkGray,
        EnumFillPattern::LightGray => FormatPattern::LightGray,
        EnumFillPattern::DarkHorizontal => FormatPattern::DarkHorizontal,
        EnumFillPattern::DarkVertical => FormatPattern::DarkVertical,
        EnumFillPattern::DarkDown => FormatPattern::DarkDown,
        EnumFillPattern::DarkUp => FormatPattern::DarkUp,
        EnumFillPattern::DarkGrid => FormatPattern::DarkGrid,
        EnumFillPattern::DarkTrellis => FormatPattern::DarkTrellis,
        EnumFillPattern::LightHorizontal => FormatPattern::LightHorizontal,
        EnumFillPattern::LightVertical => FormatPattern::LightVertical,
        EnumFillPattern::LightDown => FormatPattern::LightDown,
        EnumFillPattern::LightUp => FormatPattern::LightUp,
        EnumFillPattern::LightGrid => FormatPattern::LightGrid,
        EnumFillPattern::LightTrellis => FormatPattern::LightTrellis,
        EnumFillPattern::Gray125 => FormatPattern::Gray125,
        EnumFillPattern::Gray0625 => FormatPattern::Gray0625,
    }
}

fn derive_format_border(line: EnumBorderLine) -> FormatBorder {
    match line {
        EnumBorderLine::Thin => FormatBorder::Thin,
        EnumBorderLine::Medium => FormatBorder::Medium,
        EnumBorderLine::Dashed => FormatBorder::Dashed,
        EnumBorderLine::Dotted => FormatBorder::Dotted,
        EnumBorderLine::Thick => FormatBorder::Thick,
        EnumBorderLine::Double => FormatBorder::Double,
        EnumBorderLine::Hair => FormatBorder::Hair,
        EnumBorderLine::MediumDashed => FormatBorder::MediumDashed,
        EnumBorderLine::DashDot => FormatBorder::DashDot,
        EnumBorderLine::MediumDashDot => FormatBorder::MediumDashDot,
        EnumBorderLine::DashDotDot => FormatBorder::DashDotDot,
        EnumBorderLine::MediumDashDotDot => FormatBorder::MediumDashDotDot,
        EnumBorderLine::SlantDashDot => FormatBorder::SlantDashDot,
    }
}

fn derive_format_align_horizontal(align: EnumHorizontalAlign) -> FormatAlign {
    match align {
        EnumHorizontalAlign::General => FormatAlign::General,
        EnumHorizontalAlign::Left => FormatAlign::Left,
        EnumHorizontalAlign::Center => FormatAlign::Center,
        EnumHorizontalAlign::Right => FormatAlign::Right,
        EnumHorizontalAlign::Fill => FormatAlign::Fill,
        EnumHorizontalAlign::Justify => FormatAlign::Justify,
        EnumHorizontalAlign::CenterContinuous => FormatAlign::CenterAcross,
        EnumHorizontalAlign::Distributed => FormatAlign::Distributed,
    }
}

fn derive_format_align_vertical(align: EnumVerticalAlign) -> FormatAlign {
    match align {
        EnumVerticalAlign::Top => FormatAlign::Top,
        EnumVerticalAlign::Center => FormatAlign::VerticalCenter,
        EnumVerticalAlign::Bottom => FormatAlign::Bottom,
        EnumVerticalAlign::Justify => FormatAlign::VerticalJustify,
        EnumVerticalAlign::Distributed => FormatAlign::VerticalDistributed,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellWriters

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCell,
    format: &Format,
) -> Result<(), String> {
    let row_num = cast_row_num(row_idx)?;
    let col_num = cast_col_num(col_idx)?;
    match value {
        EnumCell::Empty => {
            worksheet
                .write_blank(row_num, col_num, format)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCell::Text(val) => {
            worksheet
                .write_string_with_format(row_num, col_num, val, format)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCell::Number(val) => {
            if !val.is_finite() {
                return Err(format!("non-finite number {val}"));
            }
            worksheet
                .write_number_with_format(row_num, col_num, *val, format)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCell::Boolean(val) => {
            worksheet
                .write_boolean_with_format(row_num, col_num, *val, format)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCell::Temporal(val) => {
            let datetime = derive_excel_datetime(val)?;
            worksheet
                .write_datetime_with_format(row_num, col_num, &datetime, format)
                .map_err(derive_xlsx_error_text)?;
        }
    }
    Ok(())
}

/// Canonical temporal text to an Excel date/time.
fn derive_excel_datetime(text: &str) -> Result<ExcelDateTime, String> {
    let value = parse_temporal(text).ok_or_else(|| format!("not canonical temporal text {text:?}"))?;
    let n_year = u16::try_from(value.year()).map_err(|_| format!("year out of range in {text:?}"))?;
    ExcelDateTime::from_ymd(n_year, value.month() as u8, value.day() as u8)
        .and_then(|dt| dt.and_hms(value.hour() as u16, value.minute() as u8, f64::from(value.second())))
        .map_err(derive_xlsx_error_text)
}

fn cast_row_num(value: usize) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("row index overflow: {value}"))
}

fn cast_col_num(value: usize) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("column index overflow: {value}"))
}

fn derive_xlsx_error_text(err: XlsxError) -> String {
    format!("xlsx write error: {err}")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::SpecOutlineEntry;

    fn build_document(l_sheets: Vec<SpecSheet>) -> SpecDocument {
        let mut report = ReportDiagnostics::default();
        SpecDocument::new("test.json", l_sheets, &mut report).expect("document")
    }

    fn build_sheet(name: &str, n_rows: usize) -> SpecSheet {
        let mut sheet = SpecSheet::new(name);
        sheet.grid = (0..n_rows)
            .map(|row_idx| vec![EnumCell::Number(row_idx as f64), EnumCell::Text(format!("r{row_idx}"))])
            .collect();
        sheet
    }

    #[test]
    fn test_invalid_sheet_fails_alone() {
        let document = build_document(vec![build_sheet("Good", 2), build_sheet("Bad[1]", 2)]);
        let output = reconstruct(&document, &SpecRebuildOptions::default()).expect("partial success");
        assert_eq!(output.workbook.sheet_names(), vec!["Good"]);
        assert_eq!(output.report.sheets_failed.len(), 1);
        assert_eq!(output.report.sheets_failed[0].sheet_name, "Bad[1]");
        assert_eq!(output.report.stage, EnumRebuildStage::Done);
        assert_eq!(
            output
                .report
                .diagnostics
                .count_of(EnumDiagnosticKind::SheetReconstructionFailure),
            1
        );
    }

    #[test]
    fn test_no_usable_sheet_is_fatal() {
        let document = build_document(vec![build_sheet("a:b", 1)]);
        let err = reconstruct(&document, &SpecRebuildOptions::default())
            .err()
            .expect("must fail");
        match err {
            ReconstructError::NoUsableSheets { failures } => assert_eq!(failures.len(), 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rename_rule_resolves_conflicts() {
        let document = build_document(vec![
            build_sheet("Data", 1),
            build_sheet("DATA", 1),
            build_sheet("a/b", 1),
        ]);
        let options = SpecRebuildOptions {
            rule_sheet_name_conflict: EnumSheetNameConflictRule::Rename,
            ..Default::default()
        };
        let output = reconstruct(&document, &options).expect("rename");
        assert_eq!(output.workbook.sheet_names(), vec!["Data", "DATA_1", "a_b"]);
        assert!(output.report.sheets_failed.is_empty());
    }

    #[test]
    fn test_dimensions_pad_logical_extent() {
        let mut sheet = build_sheet("Sales", 4);
        sheet.dimensions = SpecSheetDimensions { n_rows: 5, n_cols: 3 };
        let document = build_document(vec![sheet]);
        let output = reconstruct(&document, &SpecRebuildOptions::default()).expect("rebuild");
        assert_eq!(
            output.workbook.sheet_extent("Sales"),
            Some(SpecSheetDimensions { n_rows: 5, n_cols: 3 })
        );
    }

    #[test]
    fn test_excess_outline_level_is_skipped() {
        let mut sheet = build_sheet("Sales", 3);
        sheet.row_outline.insert(0, SpecOutlineEntry::new(8, false).expect("level"));
        sheet.row_outline.insert(1, SpecOutlineEntry::new(2, true).expect("level"));
        let document = build_document(vec![sheet]);
        let output = reconstruct(&document, &SpecRebuildOptions::default()).expect("rebuild");
        let report = &output.report.diagnostics;
        assert_eq!(report.count_of(EnumDiagnosticKind::GroupingApplicationSkipped), 1);
        assert_eq!(report.diagnostic_count(), 1);
    }

    #[test]
    fn test_invalid_color_skips_only_that_component() {
        let mut sheet = build_sheet("Sales", 2);
        sheet.cell_styles.insert(
            (0, 0),
            SpecCellStyle {
                font: Some(SpecFontStyle {
                    bold: Some(true),
                    ..Default::default()
                }),
                fill: Some(SpecFillStyle {
                    pattern_kind: Some(EnumFillPattern::Solid),
                    foreground_color: Some("not-a-color".to_string()),
                }),
                ..Default::default()
            },
        );
        sheet.cell_styles.insert(
            (1, 1),
            SpecCellStyle {
                border: Some(SpecBorderStyle {
                    left: Some(EnumBorderLine::Thin),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        let document = build_document(vec![sheet]);
        let output = reconstruct(&document, &SpecRebuildOptions::default()).expect("rebuild");
        let report = &output.report.diagnostics;
        assert_eq!(report.count_of(EnumDiagnosticKind::StyleApplicationSkipped), 1);
        assert_eq!(report.diagnostic_count(), 1);
    }

    #[test]
    fn test_overlapping_and_single_cell_merges_are_skipped() {
        let mut sheet = build_sheet("Sales", 4);
        sheet.merged_ranges.insert(SpecRangeRef::new(0, 0, 1, 1));
        sheet.merged_ranges.insert(SpecRangeRef::new(1, 1, 2, 1));
        sheet.merged_ranges.insert(SpecRangeRef::new(3, 0, 3, 0));
        sheet.merged_ranges.insert(SpecRangeRef::new(3, 1, 3, 1));
        sheet.merged_ranges.insert(SpecRangeRef::new(2, 0, 3, 0));
        let document = build_document(vec![sheet]);
        let output = reconstruct(&document, &SpecRebuildOptions::default()).expect("rebuild");
        let report = &output.report.diagnostics;
        assert_eq!(report.count_of(EnumDiagnosticKind::MergeApplicationSkipped), 3);
    }

    #[test]
    fn test_all_hidden_keeps_first_visible() {
        let mut sheet_a = build_sheet("A", 1);
        sheet_a.sheet_properties.is_visible = false;
        let mut sheet_b = build_sheet("B", 1);
        sheet_b.sheet_properties.is_visible = false;
        let document = build_document(vec![sheet_a, sheet_b]);
        let mut output = reconstruct(&document, &SpecRebuildOptions::default()).expect("rebuild");
        assert_eq!(
            output
                .report
                .diagnostics
                .count_of(EnumDiagnosticKind::SheetPropertySkipped),
            1
        );
        let v_bytes = output.workbook.save_to_buffer().expect("save");
        assert!(!v_bytes.is_empty());
    }

    #[test]
    fn test_temporal_before_excel_epoch_degrades_to_text() {
        let mut sheet = SpecSheet::new("Dates");
        sheet.grid = vec![vec![
            EnumCell::Temporal("2024-02-29 12:30:00".to_string()),
            EnumCell::Temporal("1850-01-01 00:00:00".to_string()),
        ]];
        let document = build_document(vec![sheet]);
        let output = reconstruct(&document, &SpecRebuildOptions::default()).expect("rebuild");
        assert_eq!(output.report.diagnostics.count_of(EnumDiagnosticKind::CellDegraded), 1);
    }
}
