//! CSV tokenizer for snapshot import files.
//!
//! # Responsibility
//! - Split raw CSV text into typed, line-numbered rows.
//! - Enforce header shape and per-row field counts.
//!
//! # Invariants
//! - Row order out equals row order in the file.
//! - Line numbers are 1-based and counted against the original file,
//!   header included.
//! - Numeric cells keep their raw text when coercion fails; the
//!   tokenizer never substitutes a default.

use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Exact column set required in the header, in canonical export order.
pub const REQUIRED_COLUMNS: [&str; 16] = [
    "type",
    "universe_code",
    "universe_name",
    "phylum_code",
    "phylum_name",
    "family_code",
    "family_name",
    "group_num",
    "group_name",
    "task_num",
    "task_title",
    "task_status",
    "task_priority",
    "base_code",
    "id",
    "display_order",
];

/// Structural failure that aborts the whole import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The file has no non-blank lines.
    EmptyFile,
    /// The header lacks one or more required columns.
    MissingColumns { columns: Vec<String> },
    /// A data row's field count differs from the header's.
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    /// A row's `type` cell is not one of the five entity kinds.
    UnknownRowType { line: usize, value: String },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyFile => write!(f, "import file contains no rows"),
            Self::MissingColumns { columns } => {
                write!(f, "missing required columns: {}", columns.join(", "))
            }
            Self::ColumnCount {
                line,
                expected,
                found,
            } => write!(f, "line {line}: expected {expected} fields, found {found}"),
            Self::UnknownRowType { line, value } => {
                write!(f, "line {line}: unknown row type `{value}`")
            }
        }
    }
}

impl Error for ParseError {}

/// Numeric CSV cell with deferred coercion.
///
/// The raw text survives a failed parse so validation can cite the
/// offending value instead of a silent default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntField {
    pub raw: String,
    pub value: Option<i64>,
}

impl IntField {
    fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        Self {
            raw: trimmed.to_string(),
            value: trimmed.parse::<i64>().ok(),
        }
    }

    /// Returns whether the cell was empty in the file.
    pub fn is_blank(&self) -> bool {
        self.raw.is_empty()
    }
}

/// One `type=universe` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniverseRow {
    pub line: usize,
    pub code: String,
    pub name: String,
    pub display_order: IntField,
}

/// One `type=phylum` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhylumRow {
    pub line: usize,
    pub universe_code: String,
    pub code: String,
    pub name: String,
    pub display_order: IntField,
}

/// One `type=family` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyRow {
    pub line: usize,
    pub universe_code: String,
    pub phylum_code: String,
    pub code: String,
    pub name: String,
    pub display_order: IntField,
}

/// One `type=group` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRow {
    pub line: usize,
    pub universe_code: String,
    pub phylum_code: String,
    pub family_code: Option<String>,
    pub group_num: IntField,
    pub name: String,
    pub display_order: IntField,
}

/// One `type=task` record.
///
/// `status` stays raw text here; membership in the fixed status set is
/// a validation rule, not a parse rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub line: usize,
    pub universe_code: String,
    pub phylum_code: String,
    pub family_code: Option<String>,
    pub group_num: IntField,
    pub task_num: IntField,
    pub title: String,
    pub status: String,
    pub priority: IntField,
    pub base_code: String,
    pub id: String,
    pub display_order: IntField,
}

/// Typed import record, tagged by entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRow {
    Universe(UniverseRow),
    Phylum(PhylumRow),
    Family(FamilyRow),
    Group(GroupRow),
    Task(TaskRow),
}

impl ParsedRow {
    /// 1-based source line of this record.
    pub fn line(&self) -> usize {
        match self {
            Self::Universe(row) => row.line,
            Self::Phylum(row) => row.line,
            Self::Family(row) => row.line,
            Self::Group(row) => row.line,
            Self::Task(row) => row.line,
        }
    }

    /// Lowercase kind name as written in the `type` column.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Universe(_) => "universe",
            Self::Phylum(_) => "phylum",
            Self::Family(_) => "family",
            Self::Group(_) => "group",
            Self::Task(_) => "task",
        }
    }
}

struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(header: &[String]) -> Self {
        let index = header
            .iter()
            .enumerate()
            .map(|(position, name)| (name.trim().to_string(), position))
            .collect();
        Self { index }
    }

    fn value<'row>(&self, fields: &'row [String], name: &str) -> &'row str {
        self.index
            .get(name)
            .and_then(|position| fields.get(*position))
            .map_or("", String::as_str)
    }
}

/// Tokenizes a whole import file into ordered typed rows.
///
/// # Errors
/// - [`ParseError::EmptyFile`] when no non-blank lines exist.
/// - [`ParseError::MissingColumns`] naming exactly the absent columns.
/// - [`ParseError::ColumnCount`] on the first row whose field count
///   differs from the header's.
/// - [`ParseError::UnknownRowType`] on the first unrecognized `type`.
pub fn parse_import_csv(text: &str) -> Result<Vec<ParsedRow>, ParseError> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| (index + 1, line));

    let Some((_, header_line)) = lines.next() else {
        return Err(ParseError::EmptyFile);
    };

    let header = split_csv_line(header_line);
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !header.iter().any(|name| name.trim() == **required))
        .map(|required| required.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ParseError::MissingColumns { columns: missing });
    }

    let columns = Columns::new(&header);
    let mut rows = Vec::new();
    for (line, raw) in lines {
        let fields = split_csv_line(raw);
        if fields.len() != header.len() {
            return Err(ParseError::ColumnCount {
                line,
                expected: header.len(),
                found: fields.len(),
            });
        }
        rows.push(parse_row(line, &columns, &fields)?);
    }

    Ok(rows)
}

fn parse_row(line: usize, columns: &Columns, fields: &[String]) -> Result<ParsedRow, ParseError> {
    let cell = |name: &str| columns.value(fields, name).to_string();
    let optional_code = |name: &str| {
        let value = columns.value(fields, name);
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    };
    let number = |name: &str| IntField::parse(columns.value(fields, name));

    let kind = columns.value(fields, "type").trim().to_ascii_lowercase();
    let row = match kind.as_str() {
        "universe" => ParsedRow::Universe(UniverseRow {
            line,
            code: cell("universe_code"),
            name: cell("universe_name"),
            display_order: number("display_order"),
        }),
        "phylum" => ParsedRow::Phylum(PhylumRow {
            line,
            universe_code: cell("universe_code"),
            code: cell("phylum_code"),
            name: cell("phylum_name"),
            display_order: number("display_order"),
        }),
        "family" => ParsedRow::Family(FamilyRow {
            line,
            universe_code: cell("universe_code"),
            phylum_code: cell("phylum_code"),
            code: cell("family_code"),
            name: cell("family_name"),
            display_order: number("display_order"),
        }),
        "group" => ParsedRow::Group(GroupRow {
            line,
            universe_code: cell("universe_code"),
            phylum_code: cell("phylum_code"),
            family_code: optional_code("family_code"),
            group_num: number("group_num"),
            name: cell("group_name"),
            display_order: number("display_order"),
        }),
        "task" => ParsedRow::Task(TaskRow {
            line,
            universe_code: cell("universe_code"),
            phylum_code: cell("phylum_code"),
            family_code: optional_code("family_code"),
            group_num: number("group_num"),
            task_num: number("task_num"),
            title: cell("task_title"),
            status: cell("task_status"),
            priority: number("task_priority"),
            base_code: cell("base_code"),
            id: cell("id"),
            display_order: number("display_order"),
        }),
        _ => {
            return Err(ParseError::UnknownRowType {
                line,
                value: columns.value(fields, "type").trim().to_string(),
            })
        }
    };

    Ok(row)
}

/// Splits one CSV line, honoring double-quoted fields.
///
/// A doubled quote inside a quoted field is an escaped literal quote;
/// commas inside quotes do not split fields.
pub(crate) fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(ch);
            }
        } else {
            match ch {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut field)),
                _ => field.push(ch),
            }
        }
    }
    fields.push(field);

    fields
}

#[cfg(test)]
mod tests {
    use super::split_csv_line;

    #[test]
    fn plain_fields_split_on_commas() {
        assert_eq!(split_csv_line("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(split_csv_line("a,,c"), vec!["a", "", "c"]);
    }

    #[test]
    fn trailing_comma_yields_trailing_empty_field() {
        assert_eq!(split_csv_line("a,"), vec!["a", ""]);
    }

    #[test]
    fn quoted_comma_does_not_split() {
        assert_eq!(
            split_csv_line(r#"task,"Fix parser, then ship",R"#),
            vec!["task", "Fix parser, then ship", "R"]
        );
    }

    #[test]
    fn doubled_quote_is_literal_quote() {
        assert_eq!(
            split_csv_line(r#""He said ""go"", twice",x"#),
            vec![r#"He said "go", twice"#, "x"]
        );
    }

    #[test]
    fn empty_quoted_field() {
        assert_eq!(split_csv_line(r#""",x"#), vec!["", "x"]);
    }
}
