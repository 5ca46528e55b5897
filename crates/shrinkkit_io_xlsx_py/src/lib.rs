use std::collections::BTreeMap;
use std::path::PathBuf;

use pyo3::exceptions::{PyNotADirectoryError, PyOSError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyBytes;
use shrinkkit_io_xlsx::conf::{
    derive_default_batch_options, derive_default_capture_options, derive_default_rebuild_options,
};
use shrinkkit_io_xlsx::{
    BatchError, ConvertError, EnumSheetNameConflictRule, ReportBatch, ReportDiagnostics,
    ReportRebuild, SpecBatchOptions, SpecCaptureOptions, SpecDiagnostic, SpecEncodeOptions,
    SpecRebuildOptions, batch_to_json, json_to_excel, json_to_excel_bytes, to_json, to_json_bytes,
};

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "shrinkkit.xlsx.roundtrip.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

////////////////////////////////////////////////////////////////////////////////
// #region Reports

#[pyclass(name = "SpecDiagnostic")]
#[derive(Debug, Clone)]
struct PySpecDiagnostic {
    #[pyo3(get)]
    kind: String,
    #[pyo3(get)]
    sheet_name: Option<String>,
    #[pyo3(get)]
    target: Option<String>,
    #[pyo3(get)]
    reason: String,
}

impl From<SpecDiagnostic> for PySpecDiagnostic {
    fn from(spec_diagnostic: SpecDiagnostic) -> Self {
        Self {
            kind: spec_diagnostic.kind.as_str().to_string(),
            sheet_name: spec_diagnostic.sheet_name,
            target: spec_diagnostic.target,
            reason: spec_diagnostic.reason,
        }
    }
}

#[pymethods]
impl PySpecDiagnostic {
    fn __str__(&self) -> String {
        format!(
            "[{}] {}{}: {}",
            self.kind,
            self.sheet_name.as_deref().unwrap_or("-"),
            self.target
                .as_deref()
                .map(|target| format!("!{target}"))
                .unwrap_or_default(),
            self.reason
        )
    }
}

#[pyclass(name = "ReportDiagnostics")]
#[derive(Debug, Clone)]
struct PyReportDiagnostics {
    inner: ReportDiagnostics,
}

#[pymethods]
impl PyReportDiagnostics {
    #[getter]
    fn diagnostics(&self) -> Vec<PySpecDiagnostic> {
        self.inner
            .diagnostics
            .iter()
            .cloned()
            .map(PySpecDiagnostic::from)
            .collect()
    }

    #[getter]
    fn diagnostic_count(&self) -> usize {
        self.inner.diagnostic_count()
    }

    fn to_dict(&self) -> BTreeMap<String, u64> {
        self.inner.to_dict()
    }

    #[pyo3(signature = (prefix = "[DIAG]"))]
    fn format(&self, prefix: &str) -> String {
        self.inner.format(prefix)
    }

    fn __str__(&self) -> String {
        self.inner.to_string()
    }
}

#[pyclass(name = "ReportRebuild")]
#[derive(Debug, Clone)]
struct PyReportRebuild {
    inner: ReportRebuild,
}

#[pymethods]
impl PyReportRebuild {
    #[getter]
    fn stage(&self) -> String {
        format!("{:?}", self.inner.stage)
    }

    #[getter]
    fn sheets_written(&self) -> Vec<String> {
        self.inner.sheets_written.clone()
    }

    #[getter]
    fn sheets_failed(&self) -> Vec<(String, String)> {
        self.inner
            .sheets_failed
            .iter()
            .map(|failure| (failure.sheet_name.clone(), failure.reason.clone()))
            .collect()
    }

    #[getter]
    fn diagnostics(&self) -> PyReportDiagnostics {
        PyReportDiagnostics {
            inner: self.inner.diagnostics.clone(),
        }
    }

    fn to_dict(&self) -> BTreeMap<String, u64> {
        self.inner.to_dict()
    }

    #[pyo3(signature = (prefix = "[REBUILD]"))]
    fn format(&self, prefix: &str) -> String {
        self.inner.format(prefix)
    }

    fn __str__(&self) -> String {
        self.inner.to_string()
    }
}

#[pyclass(name = "SpecBatchError")]
#[derive(Debug, Clone)]
struct PySpecBatchError {
    #[pyo3(get)]
    path: String,
    #[pyo3(get)]
    exception: String,
}

#[pyclass(name = "ReportBatch")]
#[derive(Debug, Clone)]
struct PyReportBatch {
    #[pyo3(get)]
    cnt_matched: u64,
    #[pyo3(get)]
    cnt_scanned: u64,
    #[pyo3(get)]
    cnt_converted: u64,
    #[pyo3(get)]
    cnt_diagnostics: u64,
    #[pyo3(get)]
    warnings: Vec<String>,
    #[pyo3(get)]
    errors: Vec<PySpecBatchError>,
}

impl From<ReportBatch> for PyReportBatch {
    fn from(report_batch: ReportBatch) -> Self {
        Self {
            cnt_matched: report_batch.cnt_matched,
            cnt_scanned: report_batch.cnt_scanned,
            cnt_converted: report_batch.cnt_converted,
            cnt_diagnostics: report_batch.cnt_diagnostics,
            warnings: report_batch.warnings,
            errors: report_batch
                .errors
                .into_iter()
                .map(|spec_error| PySpecBatchError {
                    path: spec_error.path.to_string_lossy().to_string(),
                    exception: spec_error.exception,
                })
                .collect(),
        }
    }
}

#[pymethods]
impl PyReportBatch {
    #[getter]
    fn error_count(&self) -> usize {
        self.errors.len()
    }

    #[getter]
    fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_matched".to_string(), self.cnt_matched);
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_converted".to_string(), self.cnt_converted);
        dict_counts.insert("cnt_diagnostics".to_string(), self.cnt_diagnostics);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    #[pyo3(signature = (prefix = "[BATCH]"))]
    fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} matched={} scanned={} converted={} diagnostics={} errors={} warnings={}",
            self.cnt_matched,
            self.cnt_scanned,
            self.cnt_converted,
            self.cnt_diagnostics,
            self.error_count(),
            self.warning_count()
        )
    }

    fn __str__(&self) -> String {
        self.format("[BATCH]")
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Parsers

fn parse_rule_sheet_name_conflict(value: &str) -> PyResult<EnumSheetNameConflictRule> {
    match value {
        "fail" => Ok(EnumSheetNameConflictRule::Fail),
        "rename" => Ok(EnumSheetNameConflictRule::Rename),
        _ => Err(PyValueError::new_err(format!(
            "Invalid sheet name conflict rule: `{value}`. Expected one of: ['fail', 'rename']"
        ))),
    }
}

fn derive_rebuild_options(
    if_apply_grouping: bool,
    if_apply_formatting: bool,
    rule_sheet_name_conflict: &str,
    temporal_num_format: Option<String>,
) -> PyResult<SpecRebuildOptions> {
    let spec_default = derive_default_rebuild_options();
    Ok(SpecRebuildOptions {
        if_apply_grouping,
        if_apply_formatting,
        rule_sheet_name_conflict: parse_rule_sheet_name_conflict(rule_sheet_name_conflict)?,
        temporal_num_format: temporal_num_format.unwrap_or(spec_default.temporal_num_format),
    })
}

fn map_convert_error(exception: ConvertError) -> PyErr {
    match exception {
        ConvertError::Io { path, source } => {
            PyOSError::new_err(format!("I/O failed at {}: {source}", path.display()))
        }
        ConvertError::Capture(_) | ConvertError::Decode(_) => {
            PyValueError::new_err(exception.to_string())
        }
        ConvertError::Reconstruct(_) | ConvertError::Encode(_) => {
            PyRuntimeError::new_err(exception.to_string())
        }
    }
}

fn map_batch_error(exception: BatchError) -> PyErr {
    match exception {
        BatchError::SourceNotDirectory(path_src) => PyNotADirectoryError::new_err(format!(
            "Source is not a directory: {}",
            path_src.display()
        )),
        BatchError::DestinationInitFailed { .. } => PyOSError::new_err(exception.to_string()),
        BatchError::InvalidPattern { .. } => PyValueError::new_err(exception.to_string()),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Functions

#[pyfunction(name = "to_json")]
#[pyo3(signature = (
    file_in,
    file_out,
    if_capture_outline = true,
    if_capture_styles = true,
    if_capture_merges = true,
    if_pretty = true
))]
fn to_json_py(
    py: Python<'_>,
    file_in: String,
    file_out: String,
    if_capture_outline: bool,
    if_capture_styles: bool,
    if_capture_merges: bool,
    if_pretty: bool,
) -> PyResult<PyReportDiagnostics> {
    let spec_capture_options = SpecCaptureOptions {
        if_capture_outline,
        if_capture_styles,
        if_capture_merges,
    };
    let spec_encode_options = SpecEncodeOptions { if_pretty };

    let report = py.allow_threads(|| {
        to_json(
            &PathBuf::from(file_in),
            &PathBuf::from(file_out),
            &spec_capture_options,
            &spec_encode_options,
        )
    });
    let report = report.map_err(map_convert_error)?;
    Ok(PyReportDiagnostics { inner: report })
}

#[pyfunction(name = "to_json_bytes")]
#[pyo3(signature = (data, source_identifier = "<bytes>", if_pretty = true))]
fn to_json_bytes_py<'py>(
    py: Python<'py>,
    data: &[u8],
    source_identifier: &str,
    if_pretty: bool,
) -> PyResult<(Bound<'py, PyBytes>, PyReportDiagnostics)> {
    let spec_encode_options = SpecEncodeOptions { if_pretty };
    let (v_json, report) = to_json_bytes(
        data,
        source_identifier,
        &derive_default_capture_options(),
        &spec_encode_options,
    )
    .map_err(map_convert_error)?;
    Ok((PyBytes::new(py, &v_json), PyReportDiagnostics { inner: report }))
}

#[pyfunction(name = "json_to_excel")]
#[pyo3(signature = (
    file_in,
    file_out,
    if_apply_grouping = true,
    if_apply_formatting = true,
    rule_sheet_name_conflict = "fail",
    temporal_num_format = None
))]
fn json_to_excel_py(
    py: Python<'_>,
    file_in: String,
    file_out: String,
    if_apply_grouping: bool,
    if_apply_formatting: bool,
    rule_sheet_name_conflict: &str,
    temporal_num_format: Option<String>,
) -> PyResult<PyReportRebuild> {
    let spec_rebuild_options = derive_rebuild_options(
        if_apply_grouping,
        if_apply_formatting,
        rule_sheet_name_conflict,
        temporal_num_format,
    )?;

    let report = py.allow_threads(|| {
        json_to_excel(
            &PathBuf::from(file_in),
            &PathBuf::from(file_out),
            &spec_rebuild_options,
        )
    });
    let report = report.map_err(map_convert_error)?;
    Ok(PyReportRebuild { inner: report })
}

#[pyfunction(name = "json_to_excel_bytes")]
#[pyo3(signature = (
    data,
    if_apply_grouping = true,
    if_apply_formatting = true,
    rule_sheet_name_conflict = "fail"
))]
fn json_to_excel_bytes_py<'py>(
    py: Python<'py>,
    data: &[u8],
    if_apply_grouping: bool,
    if_apply_formatting: bool,
    rule_sheet_name_conflict: &str,
) -> PyResult<(Bound<'py, PyBytes>, PyReportRebuild)> {
    let spec_rebuild_options = derive_rebuild_options(
        if_apply_grouping,
        if_apply_formatting,
        rule_sheet_name_conflict,
        None,
    )?;
    let (v_xlsx, report) =
        json_to_excel_bytes(data, &spec_rebuild_options).map_err(map_convert_error)?;
    Ok((PyBytes::new(py, &v_xlsx), PyReportRebuild { inner: report }))
}

#[pyfunction(name = "batch_to_json")]
#[pyo3(signature = (
    dir_source,
    dir_destination,
    pattern = None,
    suffix_out = None,
    num_workers_max = None,
    if_pretty = true
))]
fn batch_to_json_py(
    py: Python<'_>,
    dir_source: String,
    dir_destination: String,
    pattern: Option<String>,
    suffix_out: Option<String>,
    num_workers_max: Option<usize>,
    if_pretty: bool,
) -> PyResult<PyReportBatch> {
    let spec_default = derive_default_batch_options();
    let spec_batch_options = SpecBatchOptions {
        pattern: pattern.unwrap_or(spec_default.pattern),
        suffix_out: suffix_out.unwrap_or(spec_default.suffix_out),
        num_workers_max,
        capture_options: spec_default.capture_options,
        encode_options: SpecEncodeOptions { if_pretty },
    };

    let report = py.allow_threads(|| batch_to_json(dir_source, dir_destination, &spec_batch_options));
    let report = report.map_err(map_batch_error)?;
    Ok(PyReportBatch::from(report))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[pymodule]
fn _shrinkkit_io_xlsx_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PySpecDiagnostic>()?;
    module.add_class::<PyReportDiagnostics>()?;
    module.add_class::<PyReportRebuild>()?;
    module.add_class::<PySpecBatchError>()?;
    module.add_class::<PyReportBatch>()?;
    module.add_function(wrap_pyfunction!(to_json_py, module)?)?;
    module.add_function(wrap_pyfunction!(to_json_bytes_py, module)?)?;
    module.add_function(wrap_pyfunction!(json_to_excel_py, module)?)?;
    module.add_function(wrap_pyfunction!(json_to_excel_bytes_py, module)?)?;
    module.add_function(wrap_pyfunction!(batch_to_json_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
