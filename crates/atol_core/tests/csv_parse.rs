use atol_core::import::csv::REQUIRED_COLUMNS;
use atol_core::{parse_import_csv, ParseError, ParsedRow};

fn header() -> String {
    REQUIRED_COLUMNS.join(",")
}

fn row16(cells: [&str; 16]) -> String {
    cells.join(",")
}

#[test]
fn parses_rows_in_file_order_with_file_line_numbers() {
    let text = format!(
        "{}\n{}\n\n{}\n",
        header(),
        row16([
            "universe", "W", "Work", "", "", "", "", "", "", "", "", "", "", "", "", "1"
        ]),
        row16([
            "phylum", "W", "", "R", "Research", "", "", "", "", "", "", "", "", "", "", "2"
        ]),
    );

    let rows = parse_import_csv(&text).unwrap();
    assert_eq!(rows.len(), 2);

    let ParsedRow::Universe(universe) = &rows[0] else {
        panic!("expected universe row, got {:?}", rows[0]);
    };
    assert_eq!(universe.line, 2);
    assert_eq!(universe.code, "W");
    assert_eq!(universe.name, "Work");
    assert_eq!(universe.display_order.value, Some(1));

    // Blank line 3 is skipped but still counted.
    let ParsedRow::Phylum(phylum) = &rows[1] else {
        panic!("expected phylum row, got {:?}", rows[1]);
    };
    assert_eq!(phylum.line, 4);
    assert_eq!(phylum.universe_code, "W");
    assert_eq!(phylum.code, "R");
    assert_eq!(phylum.name, "Research");
}

#[test]
fn empty_input_is_a_parse_error() {
    assert_eq!(parse_import_csv(""), Err(ParseError::EmptyFile));
    assert_eq!(parse_import_csv("\n\n   \n"), Err(ParseError::EmptyFile));
}

#[test]
fn missing_columns_are_named_exactly() {
    let partial_header = REQUIRED_COLUMNS
        .iter()
        .filter(|name| **name != "task_status" && **name != "id")
        .copied()
        .collect::<Vec<_>>()
        .join(",");

    let err = parse_import_csv(&partial_header).unwrap_err();
    assert_eq!(
        err,
        ParseError::MissingColumns {
            columns: vec!["task_status".to_string(), "id".to_string()],
        }
    );
}

#[test]
fn column_count_mismatch_reports_file_line() {
    let text = format!("{}\nuniverse,W,Work", header());

    let err = parse_import_csv(&text).unwrap_err();
    assert_eq!(
        err,
        ParseError::ColumnCount {
            line: 2,
            expected: 16,
            found: 3,
        }
    );
}

#[test]
fn unknown_row_type_is_rejected() {
    let text = format!(
        "{}\n{}",
        header(),
        row16([
            "galaxy", "W", "Work", "", "", "", "", "", "", "", "", "", "", "", "", ""
        ]),
    );

    let err = parse_import_csv(&text).unwrap_err();
    assert_eq!(
        err,
        ParseError::UnknownRowType {
            line: 2,
            value: "galaxy".to_string(),
        }
    );
}

#[test]
fn row_type_is_case_insensitive() {
    let text = format!(
        "{}\n{}",
        header(),
        row16([
            "Universe", "W", "Work", "", "", "", "", "", "", "", "", "", "", "", "", ""
        ]),
    );

    let rows = parse_import_csv(&text).unwrap();
    assert!(matches!(rows[0], ParsedRow::Universe(_)));
}

#[test]
fn quoted_fields_preserve_commas_and_escaped_quotes() {
    let title = r#""Fix tokenizer, then ship ""v2""""#;
    let text = format!(
        "{}\n{}",
        header(),
        row16([
            "task", "W", "", "R", "", "", "", "1", "", "1", title, "R", "3", "WR-01.01", "", "0"
        ]),
    );

    let rows = parse_import_csv(&text).unwrap();
    let ParsedRow::Task(task) = &rows[0] else {
        panic!("expected task row, got {:?}", rows[0]);
    };
    assert_eq!(task.title, r#"Fix tokenizer, then ship "v2""#);
    assert_eq!(task.base_code, "WR-01.01");
}

#[test]
fn numeric_coercion_failure_keeps_the_raw_text() {
    let text = format!(
        "{}\n{}",
        header(),
        row16([
            "group", "W", "", "R", "", "", "", "abc", "Inbox", "", "", "", "", "", "", ""
        ]),
    );

    let rows = parse_import_csv(&text).unwrap();
    let ParsedRow::Group(group) = &rows[0] else {
        panic!("expected group row, got {:?}", rows[0]);
    };
    assert_eq!(group.group_num.raw, "abc");
    assert_eq!(group.group_num.value, None);
    assert!(group.display_order.is_blank());
}

#[test]
fn empty_family_code_becomes_none() {
    let text = format!(
        "{}\n{}",
        header(),
        row16([
            "group", "W", "", "R", "", "", "", "7", "Inbox", "", "", "", "", "", "", "0"
        ]),
    );

    let rows = parse_import_csv(&text).unwrap();
    let ParsedRow::Group(group) = &rows[0] else {
        panic!("expected group row, got {:?}", rows[0]);
    };
    assert_eq!(group.family_code, None);
    assert_eq!(group.group_num.value, Some(7));
}
