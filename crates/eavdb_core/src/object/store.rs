//! Save, retrieve and delete over one connection.
//!
//! These functions issue commands directly and assume the caller has
//! opened a transaction bracket; the facade wraps each in
//! [`TransactionManager::run`](crate::transaction::TransactionManager::run).

use super::{Link, LinkedObject, Links, Properties, PropertiesBuilder, Property, RetrieveResult, SaveResult};
use crate::blob::chunks;
use crate::collaborator::{IdentityCache, ObjectFactory};
use crate::config::Config;
use crate::eav;
use crate::error::{StoreError, StoreResult};
use crate::types::{LinkState, ObjectHeader, PropertyState, Stamp};
use eavdb_codec::{Binary, Value};
use eavdb_storage::{Command, Connection, Row, SqlValue};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use tracing::{debug, trace};

fn header_from_row(row: &Row) -> StoreResult<ObjectHeader> {
    Ok(ObjectHeader {
        id: row.get_i64(0)?,
        type_name: row.get_str(1)?.to_string(),
        name: row.get_str(2)?.to_string(),
        stamp: Stamp::new(row.get_i64(3)?),
    })
}

/// Reads one header row.
pub(crate) fn read_header(conn: &mut dyn Connection, id: i64) -> StoreResult<Option<ObjectHeader>> {
    let rows = conn.query(
        &Command::new("SELECT ID, Type, Name, Stamp FROM Objects WHERE ID = :id").bind("id", id),
    )?;
    rows.first().map(header_from_row).transpose()
}

fn require_header(conn: &mut dyn Connection, id: i64) -> StoreResult<ObjectHeader> {
    read_header(conn, id)?.ok_or_else(|| StoreError::not_found(format!("object {id}")))
}

/// Fails with `Conflict` if the store holds a newer version than `header`.
fn check_stamp(conn: &mut dyn Connection, header: &ObjectHeader) -> StoreResult<ObjectHeader> {
    let stored = require_header(conn, header.id)?;
    if header.stamp < stored.stamp {
        return Err(StoreError::Conflict {
            id: header.id,
            expected: header.stamp,
            actual: stored.stamp,
        });
    }
    Ok(stored)
}

/// Removes the `Properties` row of one property, if any.
pub(crate) fn delete_scalar(conn: &mut dyn Connection, object_id: i64, name: &str) -> StoreResult<u64> {
    Ok(conn.execute(
        &Command::new("DELETE FROM Properties WHERE ObjectID = :object AND Name = :name")
            .bind("object", object_id)
            .bind("name", name),
    )?)
}

fn upsert_scalar(conn: &mut dyn Connection, object_id: i64, name: &str, value: &Value) -> StoreResult<()> {
    let (kind, raw) = eav::encode(value)?;
    conn.execute(
        &Command::new(
            "INSERT INTO Properties (ObjectID, Name, Kind, Value) VALUES (:object, :name, :kind, :value) \
             ON CONFLICT (ObjectID, Name) DO UPDATE SET Kind = excluded.Kind, Value = excluded.Value",
        )
        .bind("object", object_id)
        .bind("name", name)
        .bind("kind", kind)
        .bind("value", raw),
    )?;
    Ok(())
}

/// Writes one new or changed property and returns it as stored.
fn write_property(conn: &mut dyn Connection, config: &Config, object_id: i64, property: &Property) -> StoreResult<Value> {
    let name = property.name.as_str();
    match &property.value {
        Value::Binary(Binary::Inline(bytes)) if bytes.len() >= config.inline_threshold => {
            delete_scalar(conn, object_id, name)?;
            let handle = chunks::write_all(conn, object_id, name, config.chunk_size, bytes)?;
            trace!(object_id, name, length = handle.length, "binary property stored out of line");
            Ok(Value::from(handle))
        }
        Value::Binary(Binary::Stored(handle)) => {
            let source = chunks::load(conn, handle.id)?;
            if source.object_id == object_id && source.name == name {
                return Ok(Value::from(source.handle()));
            }
            delete_scalar(conn, object_id, name)?;
            let copied = chunks::copy(conn, source.id, object_id, name)?;
            trace!(object_id, name, source = source.id, "binary property copied");
            Ok(Value::from(copied))
        }
        other => {
            let value = other.clone().coerce(config.timestamp_precision);
            upsert_scalar(conn, object_id, name, &value)?;
            chunks::delete(conn, object_id, name)?;
            Ok(value)
        }
    }
}

fn validate_links(links: &Links) -> StoreResult<()> {
    for link in links {
        if link.target.id <= 0 {
            return Err(StoreError::invalid_argument(format!(
                "link target {} has not been saved",
                link.target
            )));
        }
        if link.target.type_name.is_empty() {
            return Err(StoreError::invalid_argument(format!(
                "link target {} has no type",
                link.target.id
            )));
        }
    }
    Ok(())
}

fn current_targets(conn: &mut dyn Connection, object_id: i64) -> StoreResult<HashSet<i64>> {
    conn.query(&Command::new("SELECT TargetID FROM Links WHERE ObjectID = :object").bind("object", object_id))?
        .iter()
        .map(|row| -> StoreResult<i64> { Ok(row.get_i64(0)?) })
        .collect()
}

fn insert_links(conn: &mut dyn Connection, object_id: i64, batch: &[&Link]) -> StoreResult<()> {
    let mut text = String::from("INSERT INTO Links (ObjectID, TargetID, TargetType) VALUES ");
    let mut params = vec![("object".to_string(), SqlValue::Integer(object_id))];
    for (i, link) in batch.iter().enumerate() {
        if i > 0 {
            text.push_str(", ");
        }
        let _ = write!(text, "(:object, :t{i}, :y{i})");
        params.push((format!("t{i}"), SqlValue::Integer(link.target.id)));
        params.push((format!("y{i}"), SqlValue::from(link.target.type_name.as_str())));
    }
    conn.execute(&Command::with_params(text, params))?;
    Ok(())
}

fn delete_links(conn: &mut dyn Connection, object_id: i64, batch: &[&Link]) -> StoreResult<()> {
    let placeholders: Vec<String> = (0..batch.len()).map(|i| format!(":t{i}")).collect();
    let mut command = Command::new(format!(
        "DELETE FROM Links WHERE ObjectID = :object AND TargetID IN ({})",
        placeholders.join(", ")
    ))
    .bind("object", object_id);
    for (i, link) in batch.iter().enumerate() {
        command = command.bind(format!("t{i}"), link.target.id);
    }
    conn.execute(&command)?;
    Ok(())
}

/// Applies a link delta and returns the edges actually changed.
fn write_links(conn: &mut dyn Connection, config: &Config, object_id: i64, links: &Links) -> StoreResult<Links> {
    let current = current_targets(conn, object_id)?;
    let inserts: Vec<&Link> = links
        .iter()
        .filter(|l| l.state == LinkState::New && !current.contains(&l.target.id))
        .collect();
    let deletes: Vec<&Link> = links
        .iter()
        .filter(|l| l.state == LinkState::Deleted && current.contains(&l.target.id))
        .collect();

    for batch in inserts.chunks(config.link_batch_size) {
        insert_links(conn, object_id, batch)?;
    }
    for batch in deletes.chunks(config.link_batch_size) {
        delete_links(conn, object_id, batch)?;
    }
    trace!(object_id, inserted = inserts.len(), deleted = deletes.len(), "links written");

    Ok(Links::from_vec(
        inserts.into_iter().chain(deletes).cloned().collect(),
    ))
}

/// Saves a header, a property delta and optionally a link delta.
pub(crate) fn save(
    conn: &mut dyn Connection,
    config: &Config,
    header: &ObjectHeader,
    links: Option<&Links>,
    properties: &Properties,
) -> StoreResult<SaveResult> {
    if header.type_name.is_empty() {
        return Err(StoreError::invalid_argument("type name must not be empty"));
    }
    if let Some(links) = links {
        validate_links(links)?;
    }

    let now = Stamp::now();
    let id = if header.is_new() {
        conn.query_scalar(
            &Command::new("INSERT INTO Objects (Type, Name, Stamp) VALUES (:type, :name, :stamp) RETURNING ID")
                .bind("type", header.type_name.as_str())
                .bind("name", header.name.as_str())
                .bind("stamp", now.ticks()),
        )?
        .and_then(|v| v.as_i64())
        .ok_or_else(|| StoreError::illegal_state("insert returned no object ID"))?
    } else {
        check_stamp(conn, header)?;
        header.id
    };

    let mut changed = PropertiesBuilder::new();
    for property in properties {
        let stored = match property.state {
            PropertyState::Unchanged => continue,
            PropertyState::Deleted => {
                delete_scalar(conn, id, &property.name)?;
                chunks::delete(conn, id, &property.name)?;
                Value::Null
            }
            PropertyState::New | PropertyState::Changed => write_property(conn, config, id, property)?,
        };
        changed.push(Property::new(property.name.clone(), stored, property.state))?;
    }

    let changed_links = match links {
        Some(links) => write_links(conn, config, id, links)?,
        None => Links::empty(),
    };

    if !header.is_new() {
        conn.execute(
            &Command::new("UPDATE Objects SET Stamp = MAX(:now, Stamp + 1), Name = :name WHERE ID = :id")
                .bind("now", now.ticks())
                .bind("name", header.name.as_str())
                .bind("id", id),
        )?;
    }
    let stored = require_header(conn, id)?;
    debug!(id, type_name = %stored.type_name, stamp = stored.stamp.ticks(), count = changed.len(), "object saved");

    Ok(SaveResult {
        header: stored,
        links: changed_links,
        properties: changed.build(),
    })
}

fn load_properties(conn: &mut dyn Connection, object_id: i64) -> StoreResult<Properties> {
    let mut builder = PropertiesBuilder::new();
    let rows = conn.query(
        &Command::new("SELECT Name, Kind, Value FROM Properties WHERE ObjectID = :object ORDER BY Name")
            .bind("object", object_id),
    )?;
    for mut row in rows {
        let name = row.get_str(0)?.to_string();
        let kind = row.get_i64(1)?;
        let value = eav::decode(kind, row.take(2)?)?;
        builder.push(Property::new(name, value, PropertyState::Unchanged))?;
    }
    for blob in chunks::list(conn, object_id)? {
        builder.push(Property::new(blob.name.clone(), blob.handle(), PropertyState::Unchanged))?;
    }
    Ok(builder.build())
}

fn load_links(
    conn: &mut dyn Connection,
    config: &Config,
    factory: &dyn ObjectFactory,
    cache: &dyn IdentityCache,
    object_id: i64,
) -> StoreResult<Vec<LinkedObject>> {
    let edges: Vec<(i64, String)> = conn
        .query(
            &Command::new("SELECT TargetID, TargetType FROM Links WHERE ObjectID = :object ORDER BY TargetID")
                .bind("object", object_id),
        )?
        .iter()
        .map(|row| -> StoreResult<(i64, String)> { Ok((row.get_i64(0)?, row.get_str(1)?.to_string())) })
        .collect::<StoreResult<_>>()?;

    let mut resolved: Vec<Option<LinkedObject>> = Vec::with_capacity(edges.len());
    let mut misses = Vec::new();
    for (index, (id, type_name)) in edges.iter().enumerate() {
        match cache.lookup(*id, type_name) {
            Some(object) => resolved.push(Some(LinkedObject {
                header: object.header().clone(),
                object,
                cached: true,
            })),
            None => {
                resolved.push(None);
                misses.push(index);
            }
        }
    }

    let mut headers = HashMap::new();
    for batch in misses.chunks(config.link_batch_size) {
        let placeholders: Vec<String> = (0..batch.len()).map(|i| format!(":t{i}")).collect();
        let mut command = Command::new(format!(
            "SELECT ID, Type, Name, Stamp FROM Objects WHERE ID IN ({})",
            placeholders.join(", ")
        ));
        for (i, &index) in batch.iter().enumerate() {
            command = command.bind(format!("t{i}"), edges[index].0);
        }
        for row in conn.query(&command)? {
            let header = header_from_row(&row)?;
            headers.insert(header.id, header);
        }
    }

    for index in misses {
        let (id, type_name) = &edges[index];
        let header = headers
            .remove(id)
            .ok_or_else(|| StoreError::not_found(format!("linked object {id}")))?;
        let object = factory.create_instance(type_name, header.id, header.stamp, &header.name)?;
        resolved[index] = Some(LinkedObject {
            header,
            object,
            cached: false,
        });
    }

    Ok(resolved.into_iter().flatten().collect())
}

/// Retrieves an object unless the caller's copy is current.
pub(crate) fn retrieve(
    conn: &mut dyn Connection,
    config: &Config,
    factory: &dyn ObjectFactory,
    cache: &dyn IdentityCache,
    header: &ObjectHeader,
) -> StoreResult<RetrieveResult> {
    let stored = require_header(conn, header.id)?;
    if stored.stamp == header.stamp {
        trace!(id = header.id, "retrieve skipped, caller is current");
        return Ok(RetrieveResult {
            header: stored,
            links: Vec::new(),
            properties: Properties::empty(),
            current: true,
        });
    }

    let properties = load_properties(conn, stored.id)?;
    let links = load_links(conn, config, factory, cache, stored.id)?;
    debug!(id = stored.id, type_name = %stored.type_name, count = properties.len(), "object retrieved");
    Ok(RetrieveResult {
        header: stored,
        links,
        properties,
        current: false,
    })
}

/// Deletes an object after the stamp check.
pub(crate) fn delete(conn: &mut dyn Connection, header: &ObjectHeader) -> StoreResult<()> {
    check_stamp(conn, header)?;
    conn.execute(&Command::new("DELETE FROM Objects WHERE ID = :id").bind("id", header.id))?;
    debug!(id = header.id, type_name = %header.type_name, "object deleted");
    Ok(())
}

/// Returns true if an object row exists.
pub(crate) fn exists(conn: &mut dyn Connection, id: i64) -> StoreResult<bool> {
    Ok(conn
        .query_scalar(&Command::new("SELECT 1 FROM Objects WHERE ID = :id").bind("id", id))?
        .is_some_and(|v| !SqlValue::is_null(&v)))
}
