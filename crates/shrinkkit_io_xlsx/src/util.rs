//! Stateless helper utilities shared by capture, codec and reconstruction.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::conf::{
    C_TEMPORAL_FORMAT, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL,
};
use crate::spec::{EnumCell, SpecRangeRef};

////////////////////////////////////////////////////////////////////////////////
// #region CellAddressing

/// Zero-based column index to its letter label (`0 -> "A"`, `26 -> "AA"`).
pub fn derive_column_label(col_idx: usize) -> String {
    let mut l_chars = Vec::new();
    let mut n_rest = col_idx + 1;
    while n_rest > 0 {
        let n_digit = (n_rest - 1) % 26;
        l_chars.push(char::from(b'A' + n_digit as u8));
        n_rest = (n_rest - 1) / 26;
    }
    l_chars.iter().rev().collect()
}

/// Letter label to zero-based column index. Accepts lower case.
pub fn parse_column_label(label: &str) -> Option<usize> {
    if label.is_empty() {
        return None;
    }
    let mut n_value: usize = 0;
    for c in label.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let n_digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        n_value = n_value.checked_mul(26)?.checked_add(n_digit)?;
    }
    Some(n_value - 1)
}

/// Zero-based `(row, col)` to an A1 reference.
pub fn derive_cell_ref(row_idx: usize, col_idx: usize) -> String {
    format!("{}{}", derive_column_label(col_idx), row_idx + 1)
}

/// A1 reference (absolute markers allowed) to zero-based `(row, col)`.
pub fn parse_cell_ref(cell_ref: &str) -> Option<(usize, usize)> {
    let c_ref: String = cell_ref.trim().chars().filter(|c| *c != '$').collect();
    let n_split = c_ref.find(|c: char| c.is_ascii_digit())?;
    let (c_col, c_row) = c_ref.split_at(n_split);
    let col_idx = parse_column_label(c_col)?;
    let n_row: usize = c_row.parse().ok()?;
    if n_row == 0 {
        return None;
    }
    Some((n_row - 1, col_idx))
}

/// `"A1:B3"` or a single `"A1"` to a range.
pub fn parse_range_ref(range_ref: &str) -> Option<SpecRangeRef> {
    match range_ref.split_once(':') {
        Some((c_start, c_end)) => {
            let (row_a, col_a) = parse_cell_ref(c_start)?;
            let (row_b, col_b) = parse_cell_ref(c_end)?;
            Some(SpecRangeRef::new(row_a, col_a, row_b, col_b))
        }
        None => {
            let (row_idx, col_idx) = parse_cell_ref(range_ref)?;
            Some(SpecRangeRef::new(row_idx, col_idx, row_idx, col_idx))
        }
    }
}

/// Wire key of a styled cell: 1-based row, underscore, column letters.
pub fn derive_style_key(row_idx: usize, col_idx: usize) -> String {
    format!("{}_{}", row_idx + 1, derive_column_label(col_idx))
}

/// Inverse of [`derive_style_key`].
pub fn parse_style_key(key: &str) -> Option<(usize, usize)> {
    let (c_row, c_col) = key.split_once('_')?;
    let n_row: usize = c_row.trim().parse().ok()?;
    if n_row == 0 {
        return None;
    }
    Some((n_row - 1, parse_column_label(c_col.trim())?))
}

/// Wire key of a row outline entry (1-based row number).
pub fn parse_row_number(key: &str) -> Option<usize> {
    let n_row: usize = key.trim().parse().ok()?;
    n_row.checked_sub(1)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColorTokens

/// Parse `RRGGBB`, `AARRGGBB` or `#RRGGBB` into a 24-bit RGB value.
///
/// Alpha is discarded; anything else is rejected.
pub fn parse_color_token(token: &str) -> Option<u32> {
    let c_hex = token.trim().trim_start_matches('#');
    if !c_hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match c_hex.len() {
        6 => u32::from_str_radix(c_hex, 16).ok(),
        8 => u32::from_str_radix(&c_hex[2..], 16).ok(),
        _ => None,
    }
}

/// Normalize an OOXML `rgb` attribute to upper-case `AARRGGBB`.
pub fn normalize_argb(raw: &str) -> Option<String> {
    let c_hex = raw.trim().trim_start_matches('#');
    if !c_hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match c_hex.len() {
        6 => Some(format!("FF{}", c_hex.to_ascii_uppercase())),
        8 => Some(c_hex.to_ascii_uppercase()),
        _ => None,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TemporalValues

/// Canonical text of a date/time value.
pub fn format_temporal(value: &NaiveDateTime) -> String {
    value.format(C_TEMPORAL_FORMAT).to_string()
}

/// Parse canonical temporal text; other shapes yield `None`.
pub fn parse_temporal(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, C_TEMPORAL_FORMAT).ok()
}

/// Normalize ISO-like text (`T` separator, fractional seconds) to canonical form.
pub fn normalize_temporal_text(text: &str) -> Option<String> {
    let c_text = text.trim();
    for c_fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(value) = NaiveDateTime::parse_from_str(c_text, c_fmt) {
            return Some(format_temporal(&value));
        }
    }
    if let Ok(value) = NaiveDate::parse_from_str(c_text, "%Y-%m-%d") {
        return value.and_hms_opt(0, 0, 0).map(|v| format_temporal(&v));
    }
    None
}

/// Excel 1900-system serial to a date/time, rounded to whole seconds.
///
/// Serial day 60 is Excel's fictitious 1900-02-29 and has no calendar date.
pub fn derive_datetime_from_excel_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let n_days = serial.trunc() as i64;
    if n_days == 60 {
        return None;
    }
    let n_secs = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    // Serials before the fictitious leap day are offset by one.
    let date_epoch = if n_days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    date_epoch
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(TimeDelta::try_days(n_days)?)?
        .checked_add_signed(TimeDelta::try_seconds(n_secs)?)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Check a name against Excel sheet-name rules.
pub fn validate_sheet_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Sheet name is empty.".to_string());
    }
    let n_len = name.chars().count();
    if n_len > N_LEN_EXCEL_SHEET_NAME_MAX {
        return Err(format!(
            "Sheet name {name:?} has {n_len} chars (max {N_LEN_EXCEL_SHEET_NAME_MAX})."
        ));
    }
    if let Some(c_illegal) = TUP_EXCEL_ILLEGAL.iter().find(|c| name.contains(*c)) {
        return Err(format!("Sheet name {name:?} contains illegal char {c_illegal:?}."));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(format!("Sheet name {name:?} starts or ends with an apostrophe."));
    }
    Ok(())
}

/// Create suffixed sheet name (`base_1`, `base_2`, ...), respecting length cap.
pub fn create_sheet_identifier(base_name: &str, part_idx_1based: usize) -> String {
    let c_sheet_name_suffix = format!("_{part_idx_1based}");
    let n_len_base_name_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_sheet_name_suffix.len());

    let c_sheet_name_base: String = base_name
        .chars()
        .take(usize::max(1, n_len_base_name_max))
        .collect();

    format!("{c_sheet_name_base}{c_sheet_name_suffix}")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region GridUtils

/// `(rows, widest row)` of a possibly jagged grid.
pub fn derive_grid_extent(grid: &[Vec<EnumCell>]) -> (usize, usize) {
    let n_cols = grid.iter().map(Vec::len).max().unwrap_or(0);
    (grid.len(), n_cols)
}

/// Whether `(row, col)` fits on an Excel worksheet.
pub fn is_within_excel_limits(row_idx: usize, col_idx: usize) -> bool {
    row_idx < N_NROWS_EXCEL_MAX && col_idx < N_NCOLS_EXCEL_MAX
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Workers

/// Worker count: explicit value clamped to CPU count, else up to 8.
pub fn calculate_worker_limit(num_workers_max: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match num_workers_max {
        Some(n) => n.clamp(1, n_cpu),
        None => n_cpu.clamp(1, 8),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
