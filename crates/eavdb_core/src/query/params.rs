//! Statement-wide parameter naming.

use eavdb_storage::SqlValue;
use std::collections::HashSet;

/// Allocates unique bound-parameter names within one statement.
///
/// Names derive from a base (usually an operand) with every character that
/// is not ASCII alphanumeric replaced by `_`. A base that was already
/// handed out gets a `_<counter>` suffix.
#[derive(Debug, Default)]
pub struct ParamScope {
    used: HashSet<String>,
    counter: usize,
}

impl ParamScope {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `name` verbatim so later allocations avoid it.
    pub fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_string());
    }

    /// Returns a fresh parameter name derived from `base`.
    pub fn allocate(&mut self, base: &str) -> String {
        let mut sanitized: String = base
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        if sanitized.is_empty() {
            sanitized.push('p');
        }

        if self.used.insert(sanitized.clone()) {
            return sanitized;
        }
        loop {
            self.counter += 1;
            let candidate = format!("{sanitized}_{}", self.counter);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Allocates a name and pushes the binding onto `params`.
    pub fn bind(&mut self, base: &str, value: SqlValue, params: &mut Vec<(String, SqlValue)>) -> String {
        let name = self.allocate(base);
        params.push((name.clone(), value));
        name
    }
}
