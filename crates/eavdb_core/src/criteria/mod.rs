//! Typed search criteria.
//!
//! A criteria tree is built from [`Clause`] leaves combined with
//! [`Criteria::and`], [`Criteria::or`] and negation. There is no way to
//! splice raw predicate text into a tree; the query compiler is the only
//! producer of backend text.
//!
//! ```
//! use eavdb_core::criteria::{Criteria, OrderBy};
//!
//! let filter = Criteria::eq("City", "Oslo")
//!     .and(Criteria::ge("Age", 18i64))
//!     .and(!Criteria::is_null("Email"));
//! let order = OrderBy::asc("Name").then_desc("Age");
//! assert_eq!(order.len(), 2);
//! assert!(matches!(filter, Criteria::And(..)));
//! ```

mod clause;
mod order;

pub use clause::{Clause, Operator};
pub use order::{Direction, OrderBy, SortKey};

use eavdb_codec::Value;
use std::ops::Not;

/// Reserved operand addressing the object ID column.
pub const ID: &str = "ID";
/// Reserved operand addressing the object name column.
pub const NAME: &str = "Name";
/// Reserved operand addressing the object stamp column.
pub const STAMP: &str = "Stamp";

/// Returns true if `operand` names a header column rather than a property.
#[must_use]
pub fn is_reserved(operand: &str) -> bool {
    matches!(operand, ID | NAME | STAMP)
}

/// A boolean tree of comparisons.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    /// Single comparison.
    Clause(Clause),
    /// Both sides must hold.
    And(Box<Criteria>, Box<Criteria>),
    /// Either side must hold.
    Or(Box<Criteria>, Box<Criteria>),
    /// The inner tree must not hold.
    Not(Box<Criteria>),
}

impl Criteria {
    /// Builds a single comparison.
    pub fn clause(operand: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Criteria::Clause(Clause::new(operand, operator, value))
    }

    /// `operand = value`
    pub fn eq(operand: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::clause(operand, Operator::Eq, value)
    }

    /// `operand <> value`
    pub fn ne(operand: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::clause(operand, Operator::Ne, value)
    }

    /// `operand < value`
    pub fn lt(operand: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::clause(operand, Operator::Lt, value)
    }

    /// `operand <= value`
    pub fn le(operand: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::clause(operand, Operator::Le, value)
    }

    /// `operand > value`
    pub fn gt(operand: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::clause(operand, Operator::Gt, value)
    }

    /// `operand >= value`
    pub fn ge(operand: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::clause(operand, Operator::Ge, value)
    }

    /// Matches objects that do not have the property at all.
    pub fn is_null(operand: impl Into<String>) -> Self {
        Self::clause(operand, Operator::Eq, Value::Null)
    }

    /// Matches objects that have the property, scalar or binary.
    pub fn is_present(operand: impl Into<String>) -> Self {
        Self::clause(operand, Operator::Ne, Value::Null)
    }

    /// Combines with `AND`.
    #[must_use]
    pub fn and(self, other: Criteria) -> Self {
        Criteria::And(Box::new(self), Box::new(other))
    }

    /// Combines with `OR`.
    #[must_use]
    pub fn or(self, other: Criteria) -> Self {
        Criteria::Or(Box::new(self), Box::new(other))
    }

    /// Wraps in `NOT`.
    #[must_use]
    pub fn negate(self) -> Self {
        Criteria::Not(Box::new(self))
    }

    /// Returns the number of leaf clauses.
    #[must_use]
    pub fn clause_count(&self) -> usize {
        match self {
            Criteria::Clause(_) => 1,
            Criteria::And(l, r) | Criteria::Or(l, r) => l.clause_count() + r.clause_count(),
            Criteria::Not(inner) => inner.clause_count(),
        }
    }
}

impl Not for Criteria {
    type Output = Criteria;

    fn not(self) -> Criteria {
        self.negate()
    }
}

impl From<Clause> for Criteria {
    fn from(clause: Clause) -> Self {
        Criteria::Clause(clause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names_are_case_sensitive() {
        assert!(is_reserved("ID"));
        assert!(is_reserved("Name"));
        assert!(is_reserved("Stamp"));
        assert!(!is_reserved("id"));
        assert!(!is_reserved("Title"));
    }

    #[test]
    fn null_helpers_use_null_operand() {
        let Criteria::Clause(c) = Criteria::is_present("Email") else {
            panic!("expected clause");
        };
        assert_eq!(c.operator, Operator::Ne);
        assert!(c.value.is_null());
    }

    #[test]
    fn combinators_nest() {
        let tree = Criteria::eq("A", 1i64)
            .or(Criteria::eq("B", 2i64))
            .and(!Criteria::eq("C", 3i64));
        assert_eq!(tree.clause_count(), 3);
        let Criteria::And(_, right) = tree else {
            panic!("expected and");
        };
        assert!(matches!(*right, Criteria::Not(_)));
    }
}
