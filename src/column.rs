use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::record::Value;
use crate::util::parse_numeric;

/// How a column's values are rendered, edited and compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Number,
    Email,
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(ColumnType::Text),
            "number" | "numeric" => Ok(ColumnType::Number),
            "email" => Ok(ColumnType::Email),
            other => Err(format!("Unknown column type: '{}'. Use text, number or email.", other)),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColumnType::Text => "text",
            ColumnType::Number => "number",
            ColumnType::Email => "email",
        })
    }
}

/// Column descriptor. The ordered column list doubles as the table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub label: String,
    pub visible: bool,
    pub sortable: bool,
    #[serde(rename = "type")]
    pub kind: ColumnType,
}

impl Column {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            visible: true,
            sortable: true,
            kind,
        }
    }

    /// A user-added column, keyed by the slug of its label
    pub fn from_label(label: &str, kind: ColumnType) -> Self {
        Self::new(slugify(label), label.trim(), kind)
    }

    /// Turn raw input into a value typed by this column.
    /// Number columns fall back to text when the input is not numeric.
    pub fn coerce(&self, raw: &str) -> Value {
        match self.kind {
            ColumnType::Number => match parse_numeric(raw) {
                Some(n) => Value::Number(n),
                None => Value::text(raw),
            },
            ColumnType::Text | ColumnType::Email => Value::text(raw),
        }
    }
}

/// The reserved-field columns every table starts with
pub fn default_columns() -> Vec<Column> {
    vec![
        Column::new("name", "Name", ColumnType::Text),
        Column::new("email", "Email", ColumnType::Email),
        Column::new("age", "Age", ColumnType::Number),
        Column::new("role", "Role", ColumnType::Text),
    ]
}

/// Lower-case a label and collapse whitespace runs into `_`
pub fn slugify(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Start Date"), "start_date");
        assert_eq!(slugify("  Cost   Centre "), "cost_centre");
        assert_eq!(slugify("team"), "team");
    }

    #[test]
    fn test_from_label_defaults() {
        let col = Column::from_label("Start Date", ColumnType::Text);
        assert_eq!(col.id, "start_date");
        assert_eq!(col.label, "Start Date");
        assert!(col.visible);
        assert!(col.sortable);
    }

    #[test]
    fn test_coerce_by_type() {
        let num = Column::new("salary", "Salary", ColumnType::Number);
        assert_eq!(num.coerce("1,200"), Value::Number(1200.0));
        assert_eq!(num.coerce("$30"), Value::Number(30.0));
        assert_eq!(num.coerce("n/a"), Value::text("n/a"));

        let text = Column::new("team", "Team", ColumnType::Text);
        assert_eq!(text.coerce("42"), Value::text("42"));
    }

    #[test]
    fn test_column_type_parse() {
        assert_eq!("Number".parse::<ColumnType>(), Ok(ColumnType::Number));
        assert_eq!("email".parse::<ColumnType>(), Ok(ColumnType::Email));
        assert!("date".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_default_columns_cover_reserved_fields() {
        let ids: Vec<String> = default_columns().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, crate::record::RESERVED_FIELDS);
    }
}
