//! Tabular feature collection handed to the exporter.

use std::fmt;

use crate::error::{PipelineError, Result};

/// One cell of a feature table
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Missing,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(v) if v.is_finite() => Value::Number(v),
            _ => Value::Missing,
        }
    }
}

impl fmt::Display for Value {
    /// Missing values render as an empty field.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(v) => write!(f, "{v}"),
            Value::Missing => Ok(()),
        }
    }
}

/// Rows of named columns; every row has one value per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl FeatureTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(PipelineError::InvalidConfig(format!(
                "row has {} values for {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of `column` in row `row`
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Project onto `selectors`, in selector order.
    pub fn select<S: AsRef<str>>(&self, selectors: &[S]) -> Result<FeatureTable> {
        let indices = selectors
            .iter()
            .map(|s| {
                self.column_index(s.as_ref())
                    .ok_or_else(|| PipelineError::UnknownColumn(s.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FeatureTable {
            columns: selectors.iter().map(|s| s.as_ref().to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FeatureTable {
        let mut t = FeatureTable::new(vec!["id".into(), "a".into(), "b".into()]);
        t.push_row(vec![Value::Text("p1".into()), Value::Number(1.5), Value::Missing])
            .unwrap();
        t
    }

    #[test]
    fn select_reorders_columns() {
        let t = table().select(&["b", "id"]).unwrap();
        assert_eq!(t.columns(), ["b", "id"]);
        assert_eq!(t.get(0, "id"), Some(&Value::Text("p1".into())));
        assert_eq!(t.get(0, "b"), Some(&Value::Missing));
    }

    #[test]
    fn unknown_selector_fails() {
        assert!(matches!(table().select(&["c"]), Err(PipelineError::UnknownColumn(c)) if c == "c"));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let mut t = table();
        assert!(t.push_row(vec![Value::Missing]).is_err());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Number(0.25).to_string(), "0.25");
        assert_eq!(Value::Missing.to_string(), "");
        assert_eq!(Value::from(Some(f64::NAN)), Value::Missing);
    }
}
