//! Property-based test generators using proptest.
//!
//! Strategies only produce values the engine accepts: no NaN floats,
//! non-empty property names, and criteria trees the compiler can compile.

use bytes::Bytes;
use eavdb_codec::{Timestamp, Value};
use eavdb_core::criteria::{Criteria, Operator};
use eavdb_core::{Properties, PropertiesBuilder, Property, PropertyState};
use proptest::prelude::*;

/// Strategy for generating property names, including ones that need
/// parameter-name sanitizing.
pub fn property_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[A-Z][a-zA-Z0-9]{0,11}").expect("Invalid regex"),
        prop::string::string_regex("[a-z][a-z .:-]{0,8}[a-z]").expect("Invalid regex"),
    ]
    .prop_filter("reserved names address header columns", |s| {
        !eavdb_core::criteria::is_reserved(s)
    })
}

/// Strategy for generating timestamps already at millisecond precision.
pub fn timestamp_strategy() -> impl Strategy<Value = Timestamp> {
    (-2_000_000_000_000i64..4_000_000_000_000i64)
        .prop_map(|millis| Timestamp::from_unix_micros(millis * 1_000).expect("in range"))
}

/// Strategy for generating scalar values that round-trip exactly.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e12f64..1.0e12f64).prop_map(Value::Float),
        timestamp_strategy().prop_map(Value::Timestamp),
        "[a-zA-Z0-9 äöåß€%_-]{0,40}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(|b| Value::from(Bytes::from(b))),
    ]
}

/// Strategy for generating a set of new properties with unique names.
pub fn properties_strategy(max: usize) -> impl Strategy<Value = Properties> {
    prop::collection::btree_map(property_name_strategy(), scalar_value_strategy(), 0..max).prop_map(|map| {
        let mut builder = PropertiesBuilder::new();
        for (name, value) in map {
            builder
                .push(Property::new(name, value, PropertyState::New))
                .expect("names are unique");
        }
        builder.build()
    })
}

fn operator_strategy() -> impl Strategy<Value = Operator> {
    prop_oneof![
        Just(Operator::Eq),
        Just(Operator::Ne),
        Just(Operator::Lt),
        Just(Operator::Le),
        Just(Operator::Gt),
        Just(Operator::Ge),
    ]
}

/// Strategy for generating a single compilable clause.
pub fn clause_strategy() -> impl Strategy<Value = Criteria> {
    prop_oneof![
        (property_name_strategy(), operator_strategy(), any::<i64>())
            .prop_map(|(name, op, n)| Criteria::clause(name, op, n)),
        (property_name_strategy(), operator_strategy(), "[a-z%_]{0,6}")
            .prop_map(|(name, op, s)| Criteria::clause(name, op, s)),
        property_name_strategy().prop_map(|n| Criteria::is_null(n)),
        property_name_strategy().prop_map(|n| Criteria::is_present(n)),
        (operator_strategy(), 0i64..1_000).prop_map(|(op, id)| Criteria::clause("ID", op, id)),
    ]
}

/// Strategy for generating compilable criteria trees.
pub fn criteria_strategy() -> impl Strategy<Value = Criteria> {
    clause_strategy().prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| l.and(r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| l.or(r)),
            inner.prop_map(|c| !c),
        ]
    })
}
