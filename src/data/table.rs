use std::collections::HashSet;
use std::fmt;

use crate::error::TableError;

// ---------------------------------------------------------------------------
// Value – a single table cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell, typed by guessing from its text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Value {
    /// Guess the cell type from raw CSV text.
    pub fn guess(s: &str) -> Self {
        if s.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
        if s == "true" || s == "false" {
            return Value::Bool(s == "true");
        }
        Value::String(s.to_string())
    }

    /// Numeric view for plotting consumers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – column-major sample table
// ---------------------------------------------------------------------------

/// Ordered, named columns of equal length. One row per sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    values: Vec<Vec<Value>>,
}

impl Table {
    /// An empty table with the given header.
    pub fn new(columns: Vec<String>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.as_str()) {
                return Err(TableError::DuplicateColumn(col.clone()));
            }
        }
        let values = vec![Vec::new(); columns.len()];
        Ok(Table { columns, values })
    }

    /// Build from `(name, values)` pairs; all columns must be the same length.
    pub fn from_columns(columns: Vec<(String, Vec<Value>)>) -> Result<Self, TableError> {
        let (names, values): (Vec<String>, Vec<Vec<Value>>) = columns.into_iter().unzip();
        let mut table = Table::new(names)?;
        if let Some(expected) = values.first().map(Vec::len) {
            for (name, col) in table.columns.iter().zip(&values) {
                if col.len() != expected {
                    return Err(TableError::ColumnLength {
                        column: name.clone(),
                        expected,
                        found: col.len(),
                    });
                }
            }
        }
        table.values = values;
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        for (col, value) in self.values.iter_mut().zip(row) {
            col.push(value);
        }
        Ok(())
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(&self.values[idx])
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.values.first().map_or(0, Vec::len)
    }

    /// No rows (a header-only table is empty).
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> String {
        v.to_string()
    }

    #[test]
    fn test_guess_types() {
        assert_eq!(Value::guess(""), Value::Null);
        assert_eq!(Value::guess("42"), Value::Integer(42));
        assert_eq!(Value::guess("4.5"), Value::Float(4.5));
        assert_eq!(Value::guess("true"), Value::Bool(true));
        assert_eq!(
            Value::guess("2024-01-01T00:00:00Z"),
            Value::String(s("2024-01-01T00:00:00Z"))
        );
    }

    #[test]
    fn test_push_rows_and_lookup() {
        let mut table = Table::new(vec![s("utc"), s("x")]).unwrap();
        assert!(table.is_empty());
        table.push_row(vec![Value::guess("1"), Value::guess("0.5")]).unwrap();
        table.push_row(vec![Value::guess("2"), Value::guess("0.7")]).unwrap();

        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.column("x").unwrap()[1], Value::Float(0.7));
        assert!(table.column("y").is_none());
    }

    #[test]
    fn test_row_width_checked() {
        let mut table = Table::new(vec![s("a"), s("b")]).unwrap();
        let err = table.push_row(vec![Value::Null]).unwrap_err();
        assert_eq!(err, TableError::RowWidth { expected: 2, found: 1 });
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let err = Table::new(vec![s("a"), s("a")]).unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn(s("a")));
    }

    #[test]
    fn test_from_columns_length_mismatch() {
        let err = Table::from_columns(vec![
            (s("a"), vec![Value::Integer(1), Value::Integer(2)]),
            (s("b"), vec![Value::Integer(1)]),
        ])
        .unwrap_err();
        assert!(matches!(err, TableError::ColumnLength { .. }));
    }
}
