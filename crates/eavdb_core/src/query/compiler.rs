//! Compiler from criteria trees to parameterized SQL.

use crate::criteria::{self, Clause, Criteria, Operator, OrderBy};
use crate::eav;
use crate::error::{StoreError, StoreResult};
use crate::query::params::ParamScope;
use eavdb_codec::{Precision, Value};
use eavdb_storage::{Command, SqlValue};
use std::fmt::Write as _;

const TYPE_PARAM: &str = "type";
const TAKE_PARAM: &str = "take";
const SKIP_PARAM: &str = "skip";

/// Output of [`compile`]: one predicate shared by a page and a count query.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    predicate: String,
    joins: String,
    order: String,
    predicate_params: Vec<(String, SqlValue)>,
    order_params: Vec<(String, SqlValue)>,
}

impl CompiledQuery {
    /// Returns the `WHERE` expression over the `Objects o` alias.
    #[must_use]
    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    /// Returns the `ORDER BY` expression.
    #[must_use]
    pub fn order(&self) -> &str {
        &self.order
    }

    /// Builds the command counting every match.
    #[must_use]
    pub fn count_command(&self) -> Command {
        Command::with_params(
            format!("SELECT COUNT(*) FROM Objects o WHERE {}", self.predicate),
            self.predicate_params.clone(),
        )
    }

    /// Builds the command returning one window of header rows.
    ///
    /// Rows are `(ID, Type, Name, Stamp)`.
    #[must_use]
    pub fn page_command(&self, skip: i64, take: i64) -> Command {
        let text = format!(
            "SELECT o.ID, o.Type, o.Name, o.Stamp FROM Objects o{} WHERE {} ORDER BY {} \
             LIMIT :{TAKE_PARAM} OFFSET :{SKIP_PARAM}",
            self.joins, self.predicate, self.order
        );
        let mut params = self.order_params.clone();
        params.extend(self.predicate_params.iter().cloned());
        params.push((TAKE_PARAM.to_string(), SqlValue::Integer(take)));
        params.push((SKIP_PARAM.to_string(), SqlValue::Integer(skip)));
        Command::with_params(text, params)
    }
}

/// Compiles a search over objects of `type_name`.
///
/// # Errors
///
/// Returns `InvalidCriteria` for clauses the store cannot evaluate: empty
/// operands, binary or NaN values, null compared with anything but `Eq`/`Ne`,
/// and reserved operands with a mismatched value type. Returns
/// `InvalidArgument` for an empty type name.
///
/// Timestamp operands are rounded to `precision` before binding, so they
/// compare against values as `save` stored them.
pub fn compile(
    criteria: Option<&Criteria>,
    order: Option<&OrderBy>,
    type_name: &str,
    precision: Precision,
) -> StoreResult<CompiledQuery> {
    if type_name.is_empty() {
        return Err(StoreError::invalid_argument("type name must not be empty"));
    }

    let mut scope = ParamScope::new();
    scope.reserve(TYPE_PARAM);
    scope.reserve(TAKE_PARAM);
    scope.reserve(SKIP_PARAM);

    let mut predicate_params = vec![(TYPE_PARAM.to_string(), SqlValue::from(type_name))];
    let mut predicate = format!("o.Type = :{TYPE_PARAM}");
    if let Some(tree) = criteria {
        let mut out = String::new();
        write_criteria(tree, precision, &mut scope, &mut predicate_params, &mut out)?;
        let _ = write!(predicate, " AND ({out})");
    }

    let mut order_params = Vec::new();
    let (joins, order) = compile_order(order, &mut scope, &mut order_params)?;

    Ok(CompiledQuery {
        predicate,
        joins,
        order,
        predicate_params,
        order_params,
    })
}

fn write_criteria(
    tree: &Criteria,
    precision: Precision,
    scope: &mut ParamScope,
    params: &mut Vec<(String, SqlValue)>,
    out: &mut String,
) -> StoreResult<()> {
    match tree {
        Criteria::Clause(clause) => write_clause(clause, precision, scope, params, out),
        Criteria::And(left, right) | Criteria::Or(left, right) => {
            let joiner = if matches!(tree, Criteria::And(..)) { "AND" } else { "OR" };
            out.push('(');
            write_criteria(left, precision, scope, params, out)?;
            let _ = write!(out, ") {joiner} (");
            write_criteria(right, precision, scope, params, out)?;
            out.push(')');
            Ok(())
        }
        Criteria::Not(inner) => {
            out.push_str("NOT (");
            write_criteria(inner, precision, scope, params, out)?;
            out.push(')');
            Ok(())
        }
    }
}

fn write_clause(
    clause: &Clause,
    precision: Precision,
    scope: &mut ParamScope,
    params: &mut Vec<(String, SqlValue)>,
    out: &mut String,
) -> StoreResult<()> {
    let operand = clause.operand.as_str();
    if operand.is_empty() {
        return Err(StoreError::invalid_criteria("operand name must not be empty"));
    }
    if matches!(clause.value, Value::Binary(_)) {
        return Err(StoreError::invalid_criteria(format!(
            "binary values cannot be compared ({operand})"
        )));
    }
    if clause.value.is_nan() {
        return Err(StoreError::invalid_criteria(format!(
            "NaN cannot be compared ({operand})"
        )));
    }

    if criteria::is_reserved(operand) {
        return write_reserved(clause, scope, params, out);
    }

    if clause.value.is_null() {
        let exists = match clause.operator {
            Operator::Ne => "",
            Operator::Eq => "NOT ",
            op => {
                return Err(StoreError::invalid_criteria(format!(
                    "null can only be compared with = or <> ({operand} {op} null)"
                )));
            }
        };
        let name = scope.bind(&format!("n_{operand}"), SqlValue::from(operand), params);
        let _ = write!(
            out,
            "{exists}(EXISTS (SELECT 1 FROM Properties p WHERE p.ObjectID = o.ID AND p.Name = :{name}) \
             OR EXISTS (SELECT 1 FROM Binaries b WHERE b.ObjectID = o.ID AND b.Name = :{name}))"
        );
        return Ok(());
    }

    let comparison = comparison_for(clause.operator, &clause.value);
    let coerced = clause.value.clone().coerce(precision);
    let raw = eav::to_sql(&coerced).map_err(|e| StoreError::invalid_criteria(e.to_string()))?;
    let name = scope.bind(&format!("n_{operand}"), SqlValue::from(operand), params);
    let value = scope.bind(&format!("v_{operand}"), raw, params);
    let _ = write!(
        out,
        "EXISTS (SELECT 1 FROM Properties p WHERE p.ObjectID = o.ID AND p.Name = :{name} \
         AND p.Value {comparison} :{value})"
    );
    Ok(())
}

fn write_reserved(
    clause: &Clause,
    scope: &mut ParamScope,
    params: &mut Vec<(String, SqlValue)>,
    out: &mut String,
) -> StoreResult<()> {
    let operand = clause.operand.as_str();
    let raw = match (operand, &clause.value) {
        (_, Value::Null) => {
            return Err(StoreError::invalid_criteria(format!(
                "{operand} is never null"
            )));
        }
        (criteria::ID, Value::Integer(id)) => SqlValue::Integer(*id),
        (criteria::NAME, Value::Text(name)) => SqlValue::Text(name.clone()),
        (criteria::STAMP, Value::Integer(ticks)) => SqlValue::Integer(*ticks),
        (criteria::STAMP, Value::Timestamp(ts)) => SqlValue::Integer(ts.unix_micros()),
        (_, other) => {
            return Err(StoreError::invalid_criteria(format!(
                "{operand} cannot be compared with a {} value",
                other.kind().name()
            )));
        }
    };
    let comparison = comparison_for(clause.operator, &clause.value);
    let name = scope.bind(operand, raw, params);
    let _ = write!(out, "o.{operand} {comparison} :{name}");
    Ok(())
}

fn comparison_for(operator: Operator, value: &Value) -> &'static str {
    match (operator, value) {
        (Operator::Eq, Value::Text(_)) => "LIKE",
        (Operator::Ne, Value::Text(_)) => "NOT LIKE",
        (op, _) => op.sql(),
    }
}

fn compile_order(
    order: Option<&OrderBy>,
    scope: &mut ParamScope,
    params: &mut Vec<(String, SqlValue)>,
) -> StoreResult<(String, String)> {
    let mut joins = String::new();
    let mut terms = Vec::new();
    let mut has_id = false;

    for (k, key) in order.into_iter().flatten().enumerate() {
        let operand = key.operand.as_str();
        let dir = key.direction.sql();
        if operand.is_empty() {
            return Err(StoreError::invalid_criteria("sort operand must not be empty"));
        }
        if criteria::is_reserved(operand) {
            has_id |= operand == criteria::ID;
            terms.push(format!("o.{operand} {dir}"));
            continue;
        }
        let name = scope.bind(&format!("s_{operand}"), SqlValue::from(operand), params);
        let _ = write!(
            joins,
            " LEFT JOIN Properties s{k} ON s{k}.ObjectID = o.ID AND s{k}.Name = :{name}"
        );
        terms.push(format!("s{k}.Value {dir}"));
    }
    if !has_id {
        terms.push("o.ID ASC".to_string());
    }
    Ok((joins, terms.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::Direction;
    use eavdb_codec::Timestamp;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn page(criteria: &Criteria) -> Command {
        compile(Some(criteria), None, "T", Precision::Millis).unwrap().page_command(0, 10)
    }

    #[test]
    fn no_criteria_filters_by_type_only() {
        let q = compile(None, None, "Invoice", Precision::Millis).unwrap();
        assert_eq!(q.predicate(), "o.Type = :type");
        assert_eq!(q.order(), "o.ID ASC");
        let count = q.count_command();
        assert_eq!(count.text(), "SELECT COUNT(*) FROM Objects o WHERE o.Type = :type");
        assert_eq!(count.param("type"), Some(&SqlValue::Text("Invoice".into())));
    }

    #[test]
    fn property_text_equality_uses_like() {
        let q = compile(Some(&Criteria::eq("City", "Os%")), None, "T", Precision::Millis).unwrap();
        assert_eq!(
            q.predicate(),
            "o.Type = :type AND (EXISTS (SELECT 1 FROM Properties p WHERE p.ObjectID = o.ID \
             AND p.Name = :n_City AND p.Value LIKE :v_City))"
        );
        let ne = page(&Criteria::ne("City", "Oslo"));
        assert!(ne.text().contains("p.Value NOT LIKE :v_City"));
    }

    #[test]
    fn numeric_comparison_is_direct() {
        let cmd = page(&Criteria::ge("Age", 18i64));
        assert!(cmd.text().contains("p.Value >= :v_Age"));
        assert_eq!(cmd.param("v_Age"), Some(&SqlValue::Integer(18)));
        let cmd = page(&Criteria::eq("Active", true));
        assert!(cmd.text().contains("p.Value = :v_Active"));
        assert_eq!(cmd.param("v_Active"), Some(&SqlValue::Integer(1)));
    }

    #[test]
    fn null_operands_check_both_tables() {
        let present = compile(Some(&Criteria::is_present("Photo")), None, "T", Precision::Millis).unwrap();
        assert!(present.predicate().contains(
            "(EXISTS (SELECT 1 FROM Properties p WHERE p.ObjectID = o.ID AND p.Name = :n_Photo) \
             OR EXISTS (SELECT 1 FROM Binaries b WHERE b.ObjectID = o.ID AND b.Name = :n_Photo))"
        ));
        assert!(!present.predicate().contains("NOT"));

        let absent = compile(Some(&Criteria::is_null("Photo")), None, "T", Precision::Millis).unwrap();
        assert!(absent.predicate().contains("AND (NOT (EXISTS"));
    }

    #[test]
    fn null_with_ordering_operator_is_rejected() {
        let err = compile(Some(&Criteria::lt("Photo", Value::Null)), None, "T", Precision::Millis).unwrap_err();
        assert!(matches!(err, StoreError::InvalidCriteria { .. }));
    }

    #[test]
    fn invalid_operands_are_rejected() {
        for tree in [
            Criteria::eq("", 1i64),
            Criteria::eq("Data", vec![1u8]),
            Criteria::eq("Ratio", f64::NAN),
            Criteria::eq("ID", "seven"),
            Criteria::eq("Name", 3i64),
            Criteria::eq("Stamp", 1.5),
            Criteria::is_null("ID"),
            // nested failures surface too
            Criteria::eq("A", 1i64).and(!Criteria::eq("", 2i64)),
        ] {
            let err = compile(Some(&tree), None, "T", Precision::Millis).unwrap_err();
            assert!(matches!(err, StoreError::InvalidCriteria { .. }), "{tree:?}");
        }
    }

    #[test]
    fn empty_type_is_invalid_argument() {
        assert!(matches!(
            compile(None, None, "", Precision::Millis),
            Err(StoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn reserved_operands_hit_header_columns() {
        let tree = Criteria::gt("ID", 5i64)
            .and(Criteria::eq("Name", "Ac%"))
            .and(Criteria::lt("Stamp", Timestamp::from_unix_micros(99).unwrap()));
        let cmd = page(&tree);
        assert!(cmd.text().contains("o.ID > :ID"));
        assert!(cmd.text().contains("o.Name LIKE :Name"));
        assert!(cmd.text().contains("o.Stamp < :Stamp"));
        assert_eq!(cmd.param("Stamp"), Some(&SqlValue::Integer(99)));
    }

    #[test]
    fn timestamp_operands_use_stored_precision() {
        let at = Timestamp::from_unix_micros(10_600_000).unwrap();
        let tree = Criteria::eq("At", at);
        let q = compile(Some(&tree), None, "T", Precision::Seconds).unwrap();
        assert_eq!(q.count_command().param("v_At"), Some(&SqlValue::Integer(11_000_000)));
    }

    #[test]
    fn combinators_parenthesize() {
        let tree = Criteria::eq("A", 1i64).or(!Criteria::eq("B", 2i64));
        let q = compile(Some(&tree), None, "T", Precision::Millis).unwrap();
        let p = q.predicate();
        assert!(p.starts_with("o.Type = :type AND ((EXISTS"));
        assert!(p.contains(") OR (NOT (EXISTS"));
    }

    #[test]
    fn repeated_operands_get_unique_params() {
        let tree = Criteria::ge("Age", 18i64).and(Criteria::lt("Age", 65i64));
        let cmd = page(&tree);
        assert_eq!(cmd.param("v_Age"), Some(&SqlValue::Integer(18)));
        assert_eq!(cmd.param("v_Age_2"), Some(&SqlValue::Integer(65)));
        assert!(cmd.text().contains(":n_Age_1"));
    }

    #[test]
    fn property_named_like_a_window_param() {
        let cmd = page(&Criteria::eq("take", 1i64));
        assert_eq!(cmd.param("take"), Some(&SqlValue::Integer(10)));
        assert!(cmd.text().contains("p.Name = :n_take"));
    }

    #[test]
    fn order_by_joins_properties_and_ties_on_id() {
        let order = OrderBy::desc("City").then("Stamp", Direction::Ascending);
        let q = compile(None, Some(&order), "T", Precision::Millis).unwrap();
        let cmd = q.page_command(20, 5);
        assert!(cmd
            .text()
            .contains(" LEFT JOIN Properties s0 ON s0.ObjectID = o.ID AND s0.Name = :s_City"));
        assert!(cmd
            .text()
            .contains("ORDER BY s0.Value DESC, o.Stamp ASC, o.ID ASC LIMIT :take OFFSET :skip"));
        assert_eq!(cmd.param("skip"), Some(&SqlValue::Integer(20)));

        // count never carries order bindings
        assert!(q.count_command().param("s_City").is_none());
    }

    #[test]
    fn explicit_id_order_drops_tie_breaker() {
        let q = compile(None, Some(&OrderBy::desc("ID")), "T", Precision::Millis).unwrap();
        assert_eq!(q.order(), "o.ID DESC");
    }

    fn operand() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("ID".to_string()),
            Just("Name".to_string()),
            "[A-Za-z _.-]{1,6}",
        ]
    }

    fn leaf() -> impl Strategy<Value = Criteria> {
        (operand(), 0..6usize, any::<i64>()).prop_map(|(op, code, n)| {
            let value = if op == "Name" { Value::from(format!("n{n}")) } else { Value::from(n) };
            let operator = [Operator::Eq, Operator::Ne, Operator::Lt, Operator::Le, Operator::Gt, Operator::Ge][code];
            Criteria::clause(op, operator, value)
        })
    }

    fn tree() -> impl Strategy<Value = Criteria> {
        leaf().prop_recursive(4, 24, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(l, r)| l.and(r)),
                (inner.clone(), inner.clone()).prop_map(|(l, r)| l.or(r)),
                inner.prop_map(|c| !c),
            ]
        })
    }

    proptest! {
        #[test]
        fn parameter_names_are_unique_and_referenced(tree in tree(), sort in operand()) {
            let q = compile(Some(&tree), Some(&OrderBy::asc(sort)), "T", Precision::Millis).unwrap();
            for cmd in [q.page_command(1, 2), q.count_command()] {
                let mut seen = HashSet::new();
                for (name, _) in cmd.params() {
                    prop_assert!(seen.insert(name.clone()), "duplicate {}", name);
                    prop_assert!(cmd.text().contains(&format!(":{}", name)), "param {} unreferenced", name);
                }
            }
        }
    }
}
