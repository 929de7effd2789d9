//! Comparison leaves of a criteria tree.

use eavdb_codec::Value;
use std::fmt;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl Operator {
    /// Returns the SQL comparison token.
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

/// `operand <operator> value`
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// Property name or reserved header name.
    pub operand: String,
    /// Comparison.
    pub operator: Operator,
    /// Right-hand side.
    pub value: Value,
}

impl Clause {
    /// Creates a clause.
    pub fn new(operand: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            operand: operand.into(),
            operator,
            value: value.into(),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.operand, self.operator, self.value)
    }
}
