//! Mapping between [`Value`]s and EAV property rows.
//!
//! Every `Properties` row carries a `Kind` tag next to the untyped `Value`
//! column so a value decodes to the variant it was written as. Booleans are
//! stored as `0`/`1` and timestamps as microseconds since the Unix epoch.

use crate::error::{StoreError, StoreResult};
use bytes::Bytes;
use eavdb_codec::{Binary, Timestamp, Value, ValueKind};
use eavdb_storage::SqlValue;

/// Encodes a value as a `(Kind, Value)` pair for a property row.
///
/// # Errors
///
/// Returns `InvalidArgument` for NaN floats and for stored binary handles,
/// which have no inline form.
pub(crate) fn encode(value: &Value) -> StoreResult<(i64, SqlValue)> {
    Ok((value.kind().code(), to_sql(value)?))
}

/// Converts a value to the backend representation used for comparisons.
pub(crate) fn to_sql(value: &Value) -> StoreResult<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Integer(n) => SqlValue::Integer(*n),
        Value::Float(f) if f.is_nan() => {
            return Err(StoreError::invalid_argument("NaN cannot be stored"));
        }
        Value::Float(f) => SqlValue::Real(*f),
        Value::Timestamp(ts) => SqlValue::Integer(ts.unix_micros()),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Binary(Binary::Inline(bytes)) => SqlValue::Blob(bytes.to_vec()),
        Value::Binary(Binary::Stored(handle)) => {
            return Err(StoreError::invalid_argument(format!(
                "{handle} has no inline representation"
            )));
        }
    })
}

/// Decodes a property row.
///
/// # Errors
///
/// Returns `InvalidArgument` for unknown kind codes and for payloads that
/// do not match their kind.
pub(crate) fn decode(kind: i64, raw: SqlValue) -> StoreResult<Value> {
    let kind = ValueKind::from_code(kind)?;
    let value = match (kind, raw) {
        (ValueKind::Null, _) => Value::Null,
        (ValueKind::Bool, SqlValue::Integer(n)) => Value::Bool(n != 0),
        (ValueKind::Integer, SqlValue::Integer(n)) => Value::Integer(n),
        (ValueKind::Float, SqlValue::Real(f)) => Value::Float(f),
        #[allow(clippy::cast_precision_loss)]
        (ValueKind::Float, SqlValue::Integer(n)) => Value::Float(n as f64),
        (ValueKind::Timestamp, SqlValue::Integer(micros)) => {
            Value::Timestamp(Timestamp::from_unix_micros(micros)?)
        }
        (ValueKind::Text, SqlValue::Text(s)) => Value::Text(s),
        (ValueKind::Binary, SqlValue::Blob(b)) => Value::Binary(Binary::Inline(Bytes::from(b))),
        (kind, raw) => {
            return Err(StoreError::invalid_argument(format!(
                "stored {} payload does not decode as {}",
                raw.type_name(),
                kind.name()
            )));
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eavdb_codec::BlobHandle;

    fn round_trip(value: Value) -> Value {
        let (kind, raw) = encode(&value).unwrap();
        decode(kind, raw).unwrap()
    }

    #[test]
    fn scalars_round_trip() {
        for value in [
            Value::Null,
            Value::Bool(true),
            Value::Bool(false),
            Value::Integer(i64::MIN),
            Value::Float(-0.25),
            Value::Text("äöü".into()),
            Value::from(vec![1u8, 2, 3]),
        ] {
            assert_eq!(round_trip(value.clone()), value);
        }
    }

    #[test]
    fn timestamps_store_micros() {
        let ts = Timestamp::from_unix_micros(1_600_000_000_000_001).unwrap();
        let (kind, raw) = encode(&Value::from(ts)).unwrap();
        assert_eq!(kind, ValueKind::Timestamp.code());
        assert_eq!(raw, SqlValue::Integer(1_600_000_000_000_001));
    }

    #[test]
    fn nan_and_handles_are_rejected() {
        assert!(encode(&Value::Float(f64::NAN)).is_err());
        assert!(encode(&Value::from(BlobHandle::new(1, 2))).is_err());
    }

    #[test]
    fn mismatched_payload_is_an_error() {
        let err = decode(ValueKind::Integer.code(), SqlValue::Text("x".into())).unwrap_err();
        assert!(err.to_string().contains("does not decode as integer"));
        assert!(decode(99, SqlValue::Null).is_err());
    }
}
