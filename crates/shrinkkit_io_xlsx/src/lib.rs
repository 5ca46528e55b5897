//! `shrinkkit_io_xlsx` v1:
//! Workbook structure capture and round-trip reconstruction.
//!
//! Data flow: source workbook → `capture` → `SpecDocument` → `codec` → wire
//! JSON → `codec` → `SpecDocument` → `rebuild` → output workbook.
//!
//! Modules:
//! - `conf`    : constants and default presets
//! - `spec`    : document model and options
//! - `report`  : diagnostics and run reports
//! - `error`   : fatal error types
//! - `util`    : pure helper functions
//! - `ooxml`   : package part readers (workbook, sheet, styles)
//! - `capture` : source workbook to document
//! - `codec`   : document to/from wire JSON
//! - `rebuild` : document to output workbook
//! - `facade`  : file and in-memory entry points
//! - `batch`   : directory conversion
pub mod batch;
pub mod capture;
pub mod codec;
pub mod conf;
pub mod error;
pub mod facade;
mod ooxml;
pub mod rebuild;
pub mod report;
pub mod spec;
pub mod util;

pub use batch::batch_to_json;
pub use capture::{capture, capture_bytes};
pub use codec::{
    WireDocument, decode, decode_slice, decode_str, decode_value, encode, encode_to_string,
};
pub use conf::{
    C_TEMPORAL_FORMAT, C_TEMPORAL_NUM_FORMAT, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX, N_OUTLINE_LEVEL_MAX, TUP_EXCEL_ILLEGAL,
};
pub use error::{BatchError, CaptureError, ConvertError, DecodeError, ModelError, ReconstructError};
pub use facade::{describe, json_to_excel, json_to_excel_bytes, to_json, to_json_bytes};
pub use rebuild::{OutputWorkbook, SpecOutputSheet, SpecRebuildOutput, reconstruct};
pub use report::{
    EnumDiagnosticKind, EnumRebuildStage, ReportBatch, ReportDiagnostics, ReportRebuild,
    SpecDiagnostic, SpecSheetFailure,
};
pub use spec::{
    EnumBorderLine, EnumCell, EnumFillPattern, EnumHorizontalAlign, EnumPageOrientation,
    EnumSheetNameConflictRule, EnumVerticalAlign, SpecAlignmentStyle, SpecBatchOptions,
    SpecBorderStyle, SpecCaptureOptions, SpecCellStyle, SpecDocument, SpecEncodeOptions,
    SpecFillStyle, SpecFontStyle, SpecOutlineEntry, SpecRangeRef, SpecRebuildOptions, SpecSheet,
    SpecSheetDimensions, SpecSheetProperties, SpecSheetStructure, SpecStructureInfo,
};
