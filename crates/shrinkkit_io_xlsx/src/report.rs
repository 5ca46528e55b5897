//! Diagnostic models, per-call reports and the batch report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

////////////////////////////////////////////////////////////////////////////////
// #region Diagnostics

/// Category of a non-fatal anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnumDiagnosticKind {
    /// A cell value could not be represented and was captured as empty.
    CellDegraded,
    /// A style component could not be resolved and was omitted.
    StyleDegraded,
    /// A whole sheet could only be read partially.
    SheetDegraded,
    /// A sheet failed the mandatory value pass.
    SheetReconstructionFailure,
    /// An outline entry could not be applied.
    GroupingApplicationSkipped,
    /// A style component could not be applied.
    StyleApplicationSkipped,
    /// A merged range could not be applied.
    MergeApplicationSkipped,
    /// A sheet property could not be applied.
    SheetPropertySkipped,
    /// An entry addressed a cell outside the sheet dimensions.
    OutOfRangeReference,
    /// A wire map referenced a sheet that does not exist.
    UnknownSheetReference,
    /// A wire entry had an unusable key or value.
    MalformedWireEntry,
}

impl EnumDiagnosticKind {
    /// Stable identifier used in summaries and bindings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CellDegraded => "CellDegraded",
            Self::StyleDegraded => "StyleDegraded",
            Self::SheetDegraded => "SheetDegraded",
            Self::SheetReconstructionFailure => "SheetReconstructionFailure",
            Self::GroupingApplicationSkipped => "GroupingApplicationSkipped",
            Self::StyleApplicationSkipped => "StyleApplicationSkipped",
            Self::MergeApplicationSkipped => "MergeApplicationSkipped",
            Self::SheetPropertySkipped => "SheetPropertySkipped",
            Self::OutOfRangeReference => "OutOfRangeReference",
            Self::UnknownSheetReference => "UnknownSheetReference",
            Self::MalformedWireEntry => "MalformedWireEntry",
        }
    }
}

impl fmt::Display for EnumDiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded anomaly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDiagnostic {
    /// Category.
    pub kind: EnumDiagnosticKind,
    /// Sheet the item belongs to, if any.
    pub sheet_name: Option<String>,
    /// Cell, range, row or column the item addressed, in wire notation.
    pub target: Option<String>,
    /// Human-readable reason.
    pub reason: String,
}

impl fmt::Display for SpecDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(sheet_name) = &self.sheet_name {
            write!(f, " sheet={sheet_name:?}")?;
        }
        if let Some(target) = &self.target {
            write!(f, " target={target}")?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Accumulated diagnostics of one call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportDiagnostics {
    /// Diagnostics in the order they were recorded.
    pub diagnostics: Vec<SpecDiagnostic>,
}

impl ReportDiagnostics {
    /// Record a diagnostic and emit it at `warn` level.
    pub fn record(
        &mut self,
        kind: EnumDiagnosticKind,
        sheet_name: Option<&str>,
        target: Option<String>,
        reason: impl Into<String>,
    ) {
        let spec_diagnostic = SpecDiagnostic {
            kind,
            sheet_name: sheet_name.map(str::to_string),
            target,
            reason: reason.into(),
        };
        log::warn!("{spec_diagnostic}");
        self.diagnostics.push(spec_diagnostic);
    }

    /// Append all diagnostics of `other`.
    pub fn extend(&mut self, other: ReportDiagnostics) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn diagnostic_count(&self) -> usize {
        self.diagnostics.len()
    }

    /// Number of diagnostics of one kind.
    pub fn count_of(&self, kind: EnumDiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    /// Iterate diagnostics of one kind.
    pub fn iter_kind(&self, kind: EnumDiagnosticKind) -> impl Iterator<Item = &SpecDiagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    /// Machine-readable per-kind counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        for spec_diagnostic in &self.diagnostics {
            *dict_counts
                .entry(spec_diagnostic.kind.as_str().to_string())
                .or_insert(0) += 1;
        }
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        if dict_counts.is_empty() {
            return format!("{prefix} diagnostics=0");
        }
        let l_parts: Vec<String> = dict_counts
            .iter()
            .map(|(kind, cnt)| format!("{kind}={cnt}"))
            .collect();
        format!(
            "{prefix} diagnostics={} {}",
            self.diagnostic_count(),
            l_parts.join(" ")
        )
    }
}

impl fmt::Display for ReportDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[DIAG]"))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RebuildReport

/// Reconstruction state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumRebuildStage {
    #[default]
    Start,
    ValuesWritten,
    GroupingApplied,
    FormattingApplied,
    Done,
    /// The value pass produced no usable sheet.
    Failed,
}

/// One sheet that failed the value pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetFailure {
    /// Sheet name as found in the document.
    pub sheet_name: String,
    /// User-facing reason.
    pub reason: String,
}

impl fmt::Display for SpecSheetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sheet {:?}: {}", self.sheet_name, self.reason)
    }
}

/// Outcome of one reconstruction call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportRebuild {
    /// Last state reached.
    pub stage: EnumRebuildStage,
    /// Output sheet names, in output order.
    pub sheets_written: Vec<String>,
    /// Sheets dropped by the value pass.
    pub sheets_failed: Vec<SpecSheetFailure>,
    /// Every skipped or degraded item.
    pub diagnostics: ReportDiagnostics,
}

impl ReportRebuild {
    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert(
            "cnt_sheets_written".to_string(),
            self.sheets_written.len() as u64,
        );
        dict_counts.insert(
            "cnt_sheets_failed".to_string(),
            self.sheets_failed.len() as u64,
        );
        dict_counts.insert(
            "cnt_diagnostics".to_string(),
            self.diagnostics.diagnostic_count() as u64,
        );
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} stage={:?} written={} failed={} diagnostics={}",
            self.stage,
            dict_counts["cnt_sheets_written"],
            dict_counts["cnt_sheets_failed"],
            dict_counts["cnt_diagnostics"]
        )
    }
}

impl fmt::Display for ReportRebuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[REBUILD]"))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region BatchReport

/// One file that failed batch conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecBatchError {
    /// Source file path.
    pub path: PathBuf,
    /// User-facing error text.
    pub exception: String,
}

/// Aggregate counters for one `batch_to_json` run.
#[derive(Debug, Default, Clone)]
pub struct ReportBatch {
    /// Number of files matching the pattern.
    pub cnt_matched: u64,
    /// Total directory entries scanned.
    pub cnt_scanned: u64,
    /// Number of files converted successfully.
    pub cnt_converted: u64,
    /// Diagnostics summed over converted files.
    pub cnt_diagnostics: u64,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
    /// Per-file failures.
    pub errors: Vec<SpecBatchError>,
}

impl ReportBatch {
    /// Number of collected hard errors.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_matched".to_string(), self.cnt_matched);
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_converted".to_string(), self.cnt_converted);
        dict_counts.insert("cnt_diagnostics".to_string(), self.cnt_diagnostics);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} matched={} scanned={} converted={} diagnostics={} errors={} warnings={}",
            dict_counts["cnt_matched"],
            dict_counts["cnt_scanned"],
            dict_counts["cnt_converted"],
            dict_counts["cnt_diagnostics"],
            dict_counts["cnt_errors"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[BATCH]"))
    }
}

/// Mutable accumulator for batch statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportBatchBuilder {
    /// See [`ReportBatch::cnt_matched`].
    pub cnt_matched: u64,
    /// See [`ReportBatch::cnt_scanned`].
    pub cnt_scanned: u64,
    /// See [`ReportBatch::cnt_converted`].
    pub cnt_converted: u64,
    /// See [`ReportBatch::cnt_diagnostics`].
    pub cnt_diagnostics: u64,
    /// See [`ReportBatch::errors`].
    pub errors: Vec<SpecBatchError>,
    /// See [`ReportBatch::warnings`].
    pub warnings: Vec<String>,
}

impl ReportBatchBuilder {
    /// Increment matched count by one.
    pub fn add_matched(&mut self) {
        self.cnt_matched += 1;
    }

    /// Increment scanned count by one.
    pub fn add_scanned(&mut self) {
        self.cnt_scanned += 1;
    }

    /// Count one converted file and its diagnostics.
    pub fn add_converted(&mut self, cnt_diagnostics: usize) {
        self.cnt_converted += 1;
        self.cnt_diagnostics += cnt_diagnostics as u64;
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Add one path-scoped error.
    pub fn add_error(&mut self, path: PathBuf, exception: String) {
        log::error!("{}: {exception}", path.display());
        self.errors.push(SpecBatchError { path, exception });
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportBatch {
        ReportBatch {
            cnt_matched: self.cnt_matched,
            cnt_scanned: self.cnt_scanned,
            cnt_converted: self.cnt_converted,
            cnt_diagnostics: self.cnt_diagnostics,
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
