//! Tabular query results.
//!
//! A [`ResultSet`] is an ordered list of rows sharing one column set. Column
//! order is display order. The schema of a set built from loosely shaped
//! records (JSON objects, for instance) is taken from its first record.

use std::fmt;

use serde_json::Value as JsonValue;

/// A scalar cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// NULL value.
    Null,
    /// Integer number.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text value.
    Text(String),
}

impl Scalar {
    /// Returns whether this is NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the text shown in an editable cell.
    ///
    /// NULL renders as the empty string so that clearing a cell and leaving
    /// a NULL cell untouched compare equal.
    #[must_use]
    pub fn edit_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Converts a JSON value into a scalar.
    ///
    /// Booleans and nested values are kept as their JSON text.
    #[must_use]
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or_else(|| Self::Text(n.to_string())),
            JsonValue::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(String::from(value))
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Errors raised when a result set is built from inconsistent rows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// A row does not have one value per column.
    #[error("row {row} has {found} values but the result has {expected} columns")]
    RowWidth {
        /// Index of the offending row.
        row: usize,
        /// Number of columns in the result.
        expected: usize,
        /// Number of values in the row.
        found: usize,
    },

    /// A record in a JSON payload is not an object.
    #[error("row {0} is not an object")]
    NotAnObject(usize),
}

/// One row of a result set, aligned with the set's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<Scalar>,
}

impl Row {
    /// Returns the row's values in column order.
    #[must_use]
    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    /// Returns the value at a column index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Scalar> {
        self.values.get(index)
    }
}

/// An ordered, homogeneous set of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl ResultSet {
    /// Creates a result set from column names and positional rows.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::RowWidth`] if any row is not as wide as the
    /// column list.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Scalar>>) -> Result<Self, ShapeError> {
        let expected = columns.len();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(row, values)| {
                if values.len() == expected {
                    Ok(Row { values })
                } else {
                    Err(ShapeError::RowWidth {
                        row,
                        expected,
                        found: values.len(),
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { columns, rows })
    }

    /// Creates a result set from keyed records.
    ///
    /// The first record's keys define the schema. Later records are read by
    /// key; a missing key reads as NULL and unknown keys are dropped.
    #[must_use]
    pub fn from_records(records: Vec<Vec<(String, Scalar)>>) -> Self {
        let columns: Vec<String> = records
            .first()
            .map(|first| first.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default();

        let rows = records
            .into_iter()
            .map(|mut record| {
                let values = columns
                    .iter()
                    .map(|column| {
                        record
                            .iter()
                            .position(|(k, _)| k == column)
                            .map_or(Scalar::Null, |idx| record.swap_remove(idx).1)
                    })
                    .collect();
                Row { values }
            })
            .collect();

        Self { columns, rows }
    }

    /// Creates a result set from an array of JSON objects.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::NotAnObject`] if an element is not an object.
    pub fn from_json_rows(rows: &[JsonValue]) -> Result<Self, ShapeError> {
        let records = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                row.as_object()
                    .map(|obj| {
                        obj.iter()
                            .map(|(k, v)| (k.clone(), Scalar::from_json(v)))
                            .collect::<Vec<_>>()
                    })
                    .ok_or(ShapeError::NotAnObject(idx))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_records(records))
    }

    /// Returns the column names in display order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the rows.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns whether the set has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the index of the first column matching the predicate.
    pub fn column_index(&self, predicate: impl Fn(&str) -> bool) -> Option<usize> {
        self.columns.iter().position(|c| predicate(c))
    }

    /// Returns the value of a named column in a row.
    #[must_use]
    pub fn value(&self, row: usize, column: &str) -> Option<&Scalar> {
        let idx = self.column_index(|c| c == column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Returns `(column, value)` pairs for one row in display order.
    pub fn entries(&self, row: usize) -> impl Iterator<Item = (&str, &Scalar)> + '_ {
        self.rows
            .get(row)
            .into_iter()
            .flat_map(|r| self.columns.iter().map(String::as_str).zip(r.values.iter()))
    }
}
