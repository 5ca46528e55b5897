//! XLSX constants and default preset factories.

use crate::spec::{SpecBatchOptions, SpecCaptureOptions, SpecEncodeOptions, SpecRebuildOptions};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];
/// Deepest row/column outline level Excel renders.
pub const N_OUTLINE_LEVEL_MAX: u8 = 7;

/// Canonical text form of temporal cell values.
pub const C_TEMPORAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Excel number format applied when temporal cells are rebuilt.
pub const C_TEMPORAL_NUM_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Default file pattern for batch conversion.
pub const C_BATCH_PATTERN_DEFAULT: &str = "*.xls*";
/// Default suffix of batch conversion outputs.
pub const C_BATCH_SUFFIX_DEFAULT: &str = "json";

/// Zip entry of the workbook part inside an OOXML package.
pub const C_PART_WORKBOOK: &str = "xl/workbook.xml";
/// Zip entry of the workbook relationship part.
pub const C_PART_WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
/// Zip entry of the shared style part.
pub const C_PART_STYLES: &str = "xl/styles.xml";

/// Build default capture options.
pub fn derive_default_capture_options() -> SpecCaptureOptions {
    SpecCaptureOptions::default()
}

/// Build default wire encoding options.
pub fn derive_default_encode_options() -> SpecEncodeOptions {
    SpecEncodeOptions::default()
}

/// Build default reconstruction options.
pub fn derive_default_rebuild_options() -> SpecRebuildOptions {
    SpecRebuildOptions::default()
}

/// Build default batch options.
pub fn derive_default_batch_options() -> SpecBatchOptions {
    SpecBatchOptions::default()
}
