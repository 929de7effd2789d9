//! Parameterized commands and result rows.

use crate::error::{StorageError, StorageResult};
use crate::value::SqlValue;
use std::fmt;

/// A parameterized text command.
///
/// Parameters are referenced in the text as `:name` and bound by name
/// without the leading colon. Every bound name must occur in the text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Command {
    text: String,
    params: Vec<(String, SqlValue)>,
}

impl Command {
    /// Creates a command with no parameters.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Creates a command from text and an already collected parameter list.
    #[must_use]
    pub fn with_params(text: impl Into<String>, params: Vec<(String, SqlValue)>) -> Self {
        Self {
            text: text.into(),
            params,
        }
    }

    /// Binds a named parameter.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(name, value);
        self
    }

    /// Binds a named parameter in place.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) {
        self.params.push((name.into(), value.into()));
    }

    /// Returns the command text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the bound parameters in binding order.
    #[must_use]
    pub fn params(&self) -> &[(String, SqlValue)] {
        &self.params
    }

    /// Looks up a bound parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&SqlValue> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// One result row, addressed by zero-based column index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<SqlValue>,
}

impl Row {
    /// Creates a row from its column values.
    #[must_use]
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value of a column.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MissingColumn`] if the index is out of range.
    pub fn get(&self, index: usize) -> StorageResult<&SqlValue> {
        self.values
            .get(index)
            .ok_or(StorageError::MissingColumn { index })
    }

    /// Returns an integer column.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is missing or not an integer.
    pub fn get_i64(&self, index: usize) -> StorageResult<i64> {
        match self.get(index)? {
            SqlValue::Integer(n) => Ok(*n),
            other => Err(StorageError::type_mismatch(index, "integer", other.type_name())),
        }
    }

    /// Returns a text column.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is missing or not text.
    pub fn get_str(&self, index: usize) -> StorageResult<&str> {
        match self.get(index)? {
            SqlValue::Text(s) => Ok(s),
            other => Err(StorageError::type_mismatch(index, "text", other.type_name())),
        }
    }

    /// Returns a blob column.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is missing or not a blob.
    pub fn get_blob(&self, index: usize) -> StorageResult<&[u8]> {
        match self.get(index)? {
            SqlValue::Blob(b) => Ok(b),
            other => Err(StorageError::type_mismatch(index, "blob", other.type_name())),
        }
    }

    /// Moves a column value out of the row, leaving `NULL` behind.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MissingColumn`] if the index is out of range.
    pub fn take(&mut self, index: usize) -> StorageResult<SqlValue> {
        self.values
            .get_mut(index)
            .map(|v| std::mem::replace(v, SqlValue::Null))
            .ok_or(StorageError::MissingColumn { index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_collects_params() {
        let cmd = Command::new("SELECT :a, :b").bind("a", 1i64).bind("b", "two");
        assert_eq!(cmd.params().len(), 2);
        assert_eq!(cmd.param("a"), Some(&SqlValue::Integer(1)));
        assert_eq!(cmd.param("b"), Some(&SqlValue::Text("two".into())));
        assert_eq!(cmd.param("c"), None);
    }

    #[test]
    fn row_typed_accessors() {
        let row = Row::new(vec![SqlValue::Integer(3), SqlValue::Text("x".into())]);
        assert_eq!(row.get_i64(0).unwrap(), 3);
        assert_eq!(row.get_str(1).unwrap(), "x");
        assert!(matches!(
            row.get_i64(1),
            Err(StorageError::TypeMismatch { index: 1, .. })
        ));
        assert!(matches!(
            row.get(5),
            Err(StorageError::MissingColumn { index: 5 })
        ));
    }

    #[test]
    fn row_take_leaves_null() {
        let mut row = Row::new(vec![SqlValue::Blob(vec![1, 2])]);
        assert_eq!(row.take(0).unwrap(), SqlValue::Blob(vec![1, 2]));
        assert!(row.get(0).unwrap().is_null());
    }
}
