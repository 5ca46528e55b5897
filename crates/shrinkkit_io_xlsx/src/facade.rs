//! Orchestration entry points: workbook to JSON and back.
//!
//! Each function only sequences the engines; every rule lives in
//! [`crate::capture`], [`crate::codec`] or [`crate::rebuild`].

use std::fs;
use std::path::Path;

use crate::capture::{capture, capture_bytes};
use crate::codec::{decode_slice, encode_to_string};
use crate::error::ConvertError;
use crate::rebuild::reconstruct;
use crate::report::{ReportDiagnostics, ReportRebuild};
use crate::spec::{
    SpecCaptureOptions, SpecDocument, SpecEncodeOptions, SpecRebuildOptions, SpecSheetStructure,
    SpecStructureInfo,
};

////////////////////////////////////////////////////////////////////////////////
// #region FileEntry

/// Capture `path_in` and write its wire JSON to `path_out`.
pub fn to_json(
    path_in: &Path,
    path_out: &Path,
    capture_options: &SpecCaptureOptions,
    encode_options: &SpecEncodeOptions,
) -> Result<ReportDiagnostics, ConvertError> {
    let (document, report) = capture(path_in, capture_options)?;
    let c_json = encode_to_string(&document, encode_options).map_err(ConvertError::Encode)?;
    write_output(path_out, c_json.as_bytes())?;
    log::info!(
        "Wrote {} ({} sheet(s), {} diagnostic(s)).",
        path_out.display(),
        document.sheets().len(),
        report.diagnostic_count()
    );
    Ok(report)
}

/// Decode the wire JSON at `path_in` and save the rebuilt workbook to `path_out`.
///
/// Decode diagnostics are merged into the returned report.
pub fn json_to_excel(
    path_in: &Path,
    path_out: &Path,
    rebuild_options: &SpecRebuildOptions,
) -> Result<ReportRebuild, ConvertError> {
    let v_bytes = fs::read(path_in).map_err(|e| ConvertError::Io {
        path: path_in.to_path_buf(),
        source: e,
    })?;
    let (document, report_decode) = decode_slice(&v_bytes)?;
    let mut output = reconstruct(&document, rebuild_options)?;

    if let Some(parent) = path_out.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| ConvertError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    output.workbook.save(path_out)?;

    let mut report = output.report;
    merge_decode_diagnostics(&mut report, report_decode);
    log::info!("Wrote {}. {report}", path_out.display());
    Ok(report)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region BytesEntry

/// In-memory [`to_json`]: workbook bytes to JSON bytes.
pub fn to_json_bytes(
    bytes: &[u8],
    source_identifier: &str,
    capture_options: &SpecCaptureOptions,
    encode_options: &SpecEncodeOptions,
) -> Result<(Vec<u8>, ReportDiagnostics), ConvertError> {
    let (document, report) = capture_bytes(bytes, source_identifier, capture_options)?;
    let c_json = encode_to_string(&document, encode_options).map_err(ConvertError::Encode)?;
    Ok((c_json.into_bytes(), report))
}

/// In-memory [`json_to_excel`]: JSON bytes to xlsx bytes.
pub fn json_to_excel_bytes(
    bytes: &[u8],
    rebuild_options: &SpecRebuildOptions,
) -> Result<(Vec<u8>, ReportRebuild), ConvertError> {
    let (document, report_decode) = decode_slice(bytes)?;
    let mut output = reconstruct(&document, rebuild_options)?;
    let v_xlsx = output.workbook.save_to_buffer()?;

    let mut report = output.report;
    merge_decode_diagnostics(&mut report, report_decode);
    Ok((v_xlsx, report))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Describe

/// Per-sheet structure counters of a document.
pub fn describe(document: &SpecDocument) -> SpecStructureInfo {
    let l_sheets: Vec<SpecSheetStructure> = document
        .sheets()
        .iter()
        .map(|sheet| SpecSheetStructure {
            name: sheet.name.clone(),
            n_rows: sheet.dimensions.n_rows,
            n_cols: sheet.dimensions.n_cols,
            n_rows_grouped: sheet.row_outline.len(),
            n_cols_grouped: sheet.column_outline.len(),
            n_cells_styled: sheet.cell_styles.len(),
            n_ranges_merged: sheet.merged_ranges.len(),
            is_visible: sheet.sheet_properties.is_visible,
        })
        .collect();

    SpecStructureInfo {
        source_identifier: document.source_identifier().to_string(),
        sheet_count: l_sheets.len(),
        sheets: l_sheets,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

/// Decode anomalies come first; they precede every reconstruction step.
fn merge_decode_diagnostics(report: &mut ReportRebuild, report_decode: ReportDiagnostics) {
    let mut report_all = report_decode;
    report_all.extend(std::mem::take(&mut report.diagnostics));
    report.diagnostics = report_all;
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| ConvertError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    fs::write(path, bytes).map_err(|e| ConvertError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
