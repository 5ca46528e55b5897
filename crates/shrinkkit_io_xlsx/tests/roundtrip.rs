use rust_xlsxwriter::{Color, ExcelDateTime, Format, FormatAlign, FormatBorder, FormatPattern, Workbook};
use serde_json::Value;
use shrinkkit_io_xlsx::conf::{derive_default_capture_options, derive_default_encode_options};
use shrinkkit_io_xlsx::{
    DecodeError, EnumCell, EnumDiagnosticKind, EnumPageOrientation, SpecDocument, SpecRangeRef,
    SpecRebuildOptions, capture_bytes, decode_str, encode, encode_to_string, json_to_excel_bytes,
    reconstruct,
};

const C_SOURCE: &str = "fixture.xlsx";

fn build_fixture() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let fmt_header = Format::new()
        .set_bold()
        .set_pattern(FormatPattern::Solid)
        .set_background_color(Color::RGB(0xFFFF00))
        .set_border(FormatBorder::Thin);
    let fmt_date = Format::new().set_num_format("yyyy-mm-dd hh:mm");
    let fmt_title = Format::new().set_bold().set_align(FormatAlign::Center);

    let sales = workbook.add_worksheet();
    sales.set_name("Sales").expect("name");
    for (col_idx, c_header) in ["Region", "Units", "When"].iter().enumerate() {
        sales
            .write_string_with_format(0, col_idx as u16, *c_header, &fmt_header)
            .expect("header");
    }
    let dt_north = ExcelDateTime::from_ymd(2024, 1, 15)
        .and_then(|dt| dt.and_hms(8, 30, 0.0))
        .expect("date");
    let dt_south = ExcelDateTime::from_ymd(2023, 12, 31)
        .and_then(|dt| dt.and_hms(23, 59, 59.0))
        .expect("date");
    sales.write_string(1, 0, "North").expect("cell");
    sales.write_number(1, 1, 10).expect("cell");
    sales
        .write_datetime_with_format(1, 2, &dt_north, &fmt_date)
        .expect("cell");
    sales.write_string(2, 0, "South").expect("cell");
    sales.write_number(2, 1, 12.5).expect("cell");
    sales
        .write_datetime_with_format(2, 2, &dt_south, &fmt_date)
        .expect("cell");
    sales.write_string(3, 0, "Total").expect("cell");
    sales.write_boolean(3, 1, true).expect("cell");
    sales.group_rows(1, 2).expect("group rows");
    sales.set_row_hidden(1).expect("hide row");
    sales.set_row_hidden(2).expect("hide row");
    sales.group_columns(1, 1).expect("group columns");
    sales.set_landscape();
    sales.set_paper_size(9);

    let layout = workbook.add_worksheet();
    layout.set_name("Layout").expect("name");
    layout
        .merge_range(0, 0, 1, 1, "Title", &fmt_title)
        .expect("merge");
    layout.write_string(2, 0, "body").expect("cell");
    layout.write_number(2, 3, -4.25).expect("cell");

    let hidden = workbook.add_worksheet();
    hidden.set_name("Hidden").expect("name");
    hidden.write_string(0, 0, "secret").expect("cell");
    hidden.set_hidden(true);

    workbook.save_to_buffer().expect("fixture")
}

fn capture_fixture(bytes: &[u8]) -> SpecDocument {
    let (document, _) =
        capture_bytes(bytes, C_SOURCE, &derive_default_capture_options()).expect("capture");
    document
}

/// capture → encode → decode → reconstruct, returning the rebuilt bytes.
fn run_cycle(document: &SpecDocument) -> Vec<u8> {
    let c_json = encode_to_string(document, &derive_default_encode_options()).expect("encode");
    let (decoded, report_decode) = decode_str(&c_json).expect("decode");
    assert!(report_decode.is_empty(), "{report_decode}");
    let mut output = reconstruct(&decoded, &SpecRebuildOptions::default()).expect("reconstruct");
    output.workbook.save_to_buffer().expect("save")
}

fn assert_same_values(a: &SpecDocument, b: &SpecDocument) {
    assert_eq!(a.sheet_names(), b.sheet_names());
    for (sheet_a, sheet_b) in a.sheets().iter().zip(b.sheets()) {
        let n_rows = sheet_a.dimensions.n_rows.max(sheet_b.dimensions.n_rows);
        let n_cols = sheet_a.dimensions.n_cols.max(sheet_b.dimensions.n_cols);
        for row_idx in 0..n_rows {
            for col_idx in 0..n_cols {
                assert_eq!(
                    sheet_a.cell(row_idx, col_idx),
                    sheet_b.cell(row_idx, col_idx),
                    "{}!R{}C{}",
                    sheet_a.name,
                    row_idx + 1,
                    col_idx + 1
                );
            }
        }
    }
}

#[test]
fn capture_reads_values_and_structure() {
    let document = capture_fixture(&build_fixture());
    assert_eq!(document.sheet_names(), vec!["Sales", "Layout", "Hidden"]);

    let sales = document.sheet("Sales").expect("sales");
    assert_eq!(sales.cell(0, 0), &EnumCell::Text("Region".to_string()));
    assert_eq!(sales.cell(1, 1), &EnumCell::Number(10.0));
    assert_eq!(
        sales.cell(1, 2),
        &EnumCell::Temporal("2024-01-15 08:30:00".to_string())
    );
    assert_eq!(sales.cell(3, 1), &EnumCell::Boolean(true));
    assert_eq!(sales.cell(3, 2), &EnumCell::Empty);
    assert_eq!(sales.dimensions.n_rows, 4);
    assert_eq!(sales.dimensions.n_cols, 3);

    let entry = sales.row_outline.get(&1).expect("row 2 grouped");
    assert_eq!((entry.level(), entry.hidden()), (1, true));
    assert!(!sales.row_outline.contains_key(&3));
    let entry = sales.column_outline.get(&1).expect("column B grouped");
    assert_eq!((entry.level(), entry.hidden()), (1, false));

    assert_eq!(sales.sheet_properties.orientation, EnumPageOrientation::Landscape);
    assert_eq!(sales.sheet_properties.paper_size, Some(9));
    let style_header = sales.cell_styles.get(&(0, 0)).expect("header style");
    assert_eq!(
        style_header.font.as_ref().and_then(|font| font.bold),
        Some(true)
    );
    assert!(style_header.fill.is_some());
    assert!(style_header.border.is_some());

    let layout = document.sheet("Layout").expect("layout");
    assert!(layout.merged_ranges.contains(&SpecRangeRef::new(0, 0, 1, 1)));
    assert_eq!(layout.cell(0, 0), &EnumCell::Text("Title".to_string()));
    assert_eq!(layout.cell(2, 3), &EnumCell::Number(-4.25));

    let hidden = document.sheet("Hidden").expect("hidden");
    assert!(!hidden.sheet_properties.is_visible);
}

#[test]
fn full_cycle_preserves_values_grouping_and_merges() {
    let document_first = capture_fixture(&build_fixture());
    let document_second = capture_fixture(&run_cycle(&document_first));

    assert_same_values(&document_first, &document_second);

    let sales = document_second.sheet("Sales").expect("sales");
    for row_idx in [1, 2] {
        let entry = sales.row_outline.get(&row_idx).expect("grouped row");
        assert_eq!((entry.level(), entry.hidden()), (1, true));
    }
    assert!(!sales.row_outline.contains_key(&0));
    assert!(!sales.row_outline.contains_key(&3));
    assert_eq!(
        sales.column_outline,
        document_first.sheet("Sales").expect("sales").column_outline
    );

    for (sheet_first, sheet_second) in document_first.sheets().iter().zip(document_second.sheets()) {
        assert_eq!(sheet_first.merged_ranges, sheet_second.merged_ranges);
        assert_eq!(sheet_first.sheet_properties, sheet_second.sheet_properties);
        assert_eq!(sheet_first.dimensions, sheet_second.dimensions);
    }
}

#[test]
fn second_cycle_is_a_fixed_point() {
    let document_first = capture_fixture(&build_fixture());
    let document_second = capture_fixture(&run_cycle(&document_first));
    let document_third = capture_fixture(&run_cycle(&document_second));
    assert_eq!(document_second, document_third);
}

#[test]
fn outline_entries_are_sign_encoded() {
    let document = capture_fixture(&build_fixture());
    let wire = encode(&document).expect("encode");
    let value_grouping = wire
        .grouping_info
        .as_ref()
        .and_then(|dict| dict.get("Sales"))
        .expect("grouping entry");

    assert_eq!(value_grouping["row_outline_levels"]["2"], Value::from(-1));
    assert_eq!(value_grouping["row_outline_levels"]["3"], Value::from(-1));
    assert!(value_grouping["row_outline_levels"].get("1").is_none());
    assert!(value_grouping["row_outline_levels"].get("4").is_none());
    assert_eq!(value_grouping["column_outline_levels"]["B"], Value::from(1));
    assert_eq!(value_grouping["row_groups"], Value::Array(Vec::new()));
}

#[test]
fn recorded_dimensions_pad_rebuilt_sheet() {
    let c_wire = r#"{
        "source_file": "sales.xlsx",
        "sheets": {"Sales": [["a", 1, true], ["b", 2, false], ["c", 3, null], ["d", 4, null]]},
        "sheet_dimensions": {"Sales": [5, 3]}
    }"#;
    let (v_xlsx, report) =
        json_to_excel_bytes(c_wire.as_bytes(), &SpecRebuildOptions::default()).expect("rebuild");
    assert!(report.diagnostics.is_empty(), "{}", report.diagnostics);

    let document = capture_fixture(&v_xlsx);
    let sales = document.sheet("Sales").expect("sales");
    assert_eq!(sales.dimensions.n_rows, 5);
    assert_eq!(sales.dimensions.n_cols, 3);
    for col_idx in 0..3 {
        assert_eq!(sales.cell(4, col_idx), &EnumCell::Empty);
    }
    assert_eq!(sales.cell(3, 1), &EnumCell::Number(4.0));
}

#[test]
fn grouping_scenario_from_wire() {
    let c_wire = r#"{
        "sheets": {"Sales": [["h"], ["r2"], ["r3"], ["r4"]]},
        "grouping_info": {"Sales": {"row_outline_levels": {"2": -1, "3": -1}}}
    }"#;
    let (v_xlsx, _) =
        json_to_excel_bytes(c_wire.as_bytes(), &SpecRebuildOptions::default()).expect("rebuild");
    let document = capture_fixture(&v_xlsx);
    let sales = document.sheet("Sales").expect("sales");

    for row_idx in [1, 2] {
        let entry = sales.row_outline.get(&row_idx).expect("grouped row");
        assert_eq!((entry.level(), entry.hidden()), (1, true));
    }
    assert!(sales.row_outline.get(&0).is_none());
    assert!(sales.row_outline.get(&3).is_none());
}

#[test]
fn invalid_color_is_isolated_to_one_diagnostic() {
    let c_wire = r##"{
        "sheets": {
            "Sales": [["a", "b"], [1, 2]],
            "Other": [["x"]]
        },
        "formatting_info": {
            "Sales": {
                "cell_formats": {
                    "1_A": {"font": {"bold": true, "color": "not-a-color"}},
                    "1_B": {"fill": {"patternType": "solid", "fgColor": "FF00FF00"}},
                    "2_A": {"border": {"left": "thin"}}
                },
                "merged_cells": []
            }
        }
    }"##;
    let (v_xlsx, report) =
        json_to_excel_bytes(c_wire.as_bytes(), &SpecRebuildOptions::default()).expect("rebuild");
    assert_eq!(report.sheets_written, vec!["Sales".to_string(), "Other".to_string()]);
    assert_eq!(
        report
            .diagnostics
            .count_of(EnumDiagnosticKind::StyleApplicationSkipped),
        1
    );
    assert_eq!(report.diagnostics.diagnostic_count(), 1);

    let document = capture_fixture(&v_xlsx);
    let sales = document.sheet("Sales").expect("sales");
    assert!(sales.cell_styles.get(&(0, 1)).and_then(|s| s.fill.as_ref()).is_some());
    assert!(sales.cell_styles.get(&(1, 0)).and_then(|s| s.border.as_ref()).is_some());
    assert_eq!(sales.cell(1, 1), &EnumCell::Number(2.0));
}

#[test]
fn missing_sheets_produces_no_document() {
    let err = decode_str(r#"{"sheet_count": 1}"#).err().expect("must fail");
    assert!(matches!(err, DecodeError::MissingSheets));
}

#[test]
fn hidden_sheet_round_trips_and_first_stays_visible() {
    let c_wire = r#"{
        "sheets": {"A": [["a"]], "B": [["b"]]},
        "formatting_info": {
            "A": {"sheet_properties": {"sheet_state": "hidden"}},
            "B": {"sheet_properties": {"sheet_state": "visible"}}
        }
    }"#;
    let (v_xlsx, report) =
        json_to_excel_bytes(c_wire.as_bytes(), &SpecRebuildOptions::default()).expect("rebuild");
    assert!(report.diagnostics.is_empty(), "{}", report.diagnostics);

    let document = capture_fixture(&v_xlsx);
    assert!(!document.sheet("A").expect("A").sheet_properties.is_visible);
    assert!(document.sheet("B").expect("B").sheet_properties.is_visible);
}

#[test]
fn legacy_nan_cells_decode_as_empty_and_rebuild() {
    let c_wire = r#"{"source_file": "a.xlsx", "sheet_count": 1, "sheets": {"S": [["a", NaN], [1.0, 2.0]]}}"#;
    let (document, report) = decode_str(c_wire).expect("decode");
    assert!(report.is_empty(), "{report}");
    let sheet = document.sheet("S").expect("sheet");
    assert_eq!(sheet.cell(0, 0), &EnumCell::Text("a".to_string()));
    assert_eq!(sheet.cell(0, 1), &EnumCell::Empty);
    assert_eq!(sheet.cell(1, 1), &EnumCell::Number(2.0));

    let (v_xlsx, report) =
        json_to_excel_bytes(c_wire.as_bytes(), &SpecRebuildOptions::default()).expect("rebuild");
    assert!(report.diagnostics.is_empty(), "{}", report.diagnostics);
    let rebuilt = capture_fixture(&v_xlsx);
    assert_eq!(rebuilt.sheet("S").expect("sheet").cell(1, 0), &EnumCell::Number(1.0));
}

#[test]
fn wrong_typed_top_level_sections_degrade() {
    let (document, report) =
        decode_str(r#"{"sheets": {"S": [["a"]]}, "grouping_info": []}"#).expect("decode");
    assert_eq!(document.sheet_names(), vec!["S"]);
    assert_eq!(report.count_of(EnumDiagnosticKind::MalformedWireEntry), 1);

    let (document, report) =
        decode_str(r#"{"sheets": {"S": [["a"]]}, "sheet_count": "1"}"#).expect("decode");
    assert_eq!(document.sheet_names(), vec!["S"]);
    assert_eq!(report.count_of(EnumDiagnosticKind::MalformedWireEntry), 1);

    let (_, report) =
        decode_str(r#"{"sheets": {"S": [["a"]]}, "formatting_info": null}"#).expect("decode");
    assert!(report.is_empty(), "{report}");
}

#[test]
fn malformed_sheet_entries_are_dropped_not_fatal() {
    let c_wire = r#"{
        "sheets": {"S": [["a", {"x": 1}], "not a row", [3]]},
        "grouping_info": {"S": {"row_outline_levels": {"one": 1, "3": 1}}},
        "formatting_info": {"S": {"cell_formats": {"1_A": {"font": {"bold": true}}, "bogus": {}}, "merged_cells": ["A1:B1", 5]}},
        "sheet_dimensions": {"S": "3x2"}
    }"#;
    let (document, report) = decode_str(c_wire).expect("decode");
    let sheet = document.sheet("S").expect("sheet");
    assert_eq!(sheet.cell(0, 1), &EnumCell::Empty);
    assert_eq!(sheet.cell(2, 0), &EnumCell::Number(3.0));
    assert!(sheet.row_outline.contains_key(&2));
    assert!(sheet.cell_styles.contains_key(&(0, 0)));
    assert_eq!(sheet.merged_ranges.len(), 1);
    assert_eq!(report.count_of(EnumDiagnosticKind::MalformedWireEntry), 6);

    let (_, report_rebuild) =
        json_to_excel_bytes(c_wire.as_bytes(), &SpecRebuildOptions::default()).expect("rebuild");
    assert_eq!(report_rebuild.sheets_written, vec!["S".to_string()]);
}

#[test]
fn entries_for_unknown_sheets_are_reported() {
    let c_wire = r#"{
        "sheets": {"S": [["a"]]},
        "grouping_info": {"Ghost": {"row_outline_levels": {"1": 1}}},
        "sheet_dimensions": {"S": [1, 1], "Ghost": [2, 2]}
    }"#;
    let (document, report) = decode_str(c_wire).expect("decode");
    assert_eq!(document.sheet_names(), vec!["S"]);
    let l_unknown: Vec<_> = report
        .iter_kind(EnumDiagnosticKind::UnknownSheetReference)
        .map(|d| (d.sheet_name.as_deref(), d.target.as_deref()))
        .collect();
    assert_eq!(
        l_unknown,
        vec![
            (Some("Ghost"), Some("grouping_info")),
            (Some("Ghost"), Some("sheet_dimensions")),
        ]
    );
}
