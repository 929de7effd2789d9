//! Row-level operations on `Binaries` and `BinaryChunks`.
//!
//! Every function issues its commands on the given connection and assumes
//! the caller holds an open transaction bracket.

use crate::error::{StoreError, StoreResult};
use eavdb_codec::BlobHandle;
use eavdb_storage::{Command, Connection, Row};

/// A `Binaries` header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BlobRow {
    pub id: i64,
    pub object_id: i64,
    pub name: String,
    pub length: u64,
    pub chunk_size: usize,
}

impl BlobRow {
    fn from_row(row: &Row) -> StoreResult<Self> {
        let chunk_size = usize::try_from(row.get_i64(4)?)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| StoreError::illegal_state("stored chunk size is not positive"))?;
        Ok(Self {
            id: row.get_i64(0)?,
            object_id: row.get_i64(1)?,
            name: row.get_str(2)?.to_string(),
            length: u64::try_from(row.get_i64(3)?).unwrap_or(0),
            chunk_size,
        })
    }

    pub(crate) fn handle(&self) -> BlobHandle {
        BlobHandle::new(self.id, i64::try_from(self.length).unwrap_or(i64::MAX))
    }
}

const SELECT_ROW: &str = "SELECT ID, ObjectID, Name, Length, ChunkSize FROM Binaries";

fn as_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Loads a row by ID.
///
/// # Errors
///
/// Returns `NotFound` if no such value exists.
pub(crate) fn load(conn: &mut dyn Connection, id: i64) -> StoreResult<BlobRow> {
    let rows = conn.query(&Command::new(format!("{SELECT_ROW} WHERE ID = :id")).bind("id", id))?;
    match rows.first() {
        Some(row) => BlobRow::from_row(row),
        None => Err(StoreError::not_found(format!("binary value {id}"))),
    }
}

/// Loads the row of one object property, if it exists.
pub(crate) fn find(conn: &mut dyn Connection, object_id: i64, name: &str) -> StoreResult<Option<BlobRow>> {
    let rows = conn.query(
        &Command::new(format!("{SELECT_ROW} WHERE ObjectID = :object AND Name = :name"))
            .bind("object", object_id)
            .bind("name", name),
    )?;
    rows.first().map(BlobRow::from_row).transpose()
}

/// Lists every binary value held by an object.
pub(crate) fn list(conn: &mut dyn Connection, object_id: i64) -> StoreResult<Vec<BlobRow>> {
    conn.query(
        &Command::new(format!("{SELECT_ROW} WHERE ObjectID = :object ORDER BY Name"))
            .bind("object", object_id),
    )?
    .iter()
    .map(BlobRow::from_row)
    .collect()
}

/// Creates an empty value.
pub(crate) fn create(conn: &mut dyn Connection, object_id: i64, name: &str, chunk_size: usize) -> StoreResult<BlobRow> {
    let id = conn
        .query_scalar(
            &Command::new(
                "INSERT INTO Binaries (ObjectID, Name, Length, Generation, ChunkSize) \
                 VALUES (:object, :name, 0, 0, :chunk) RETURNING ID",
            )
            .bind("object", object_id)
            .bind("name", name)
            .bind("chunk", as_i64(chunk_size as u64)),
        )?
        .and_then(|v| v.as_i64())
        .ok_or_else(|| StoreError::illegal_state("insert returned no binary ID"))?;
    Ok(BlobRow {
        id,
        object_id,
        name: name.to_string(),
        length: 0,
        chunk_size,
    })
}

/// Drops every chunk of a value and marks it as a new generation.
pub(crate) fn truncate(conn: &mut dyn Connection, row: &mut BlobRow, chunk_size: usize) -> StoreResult<()> {
    conn.execute(&Command::new("DELETE FROM BinaryChunks WHERE BinaryID = :id").bind("id", row.id))?;
    conn.execute(
        &Command::new(
            "UPDATE Binaries SET Length = 0, ChunkSize = :chunk, Generation = Generation + 1 \
             WHERE ID = :id",
        )
        .bind("chunk", as_i64(chunk_size as u64))
        .bind("id", row.id),
    )?;
    row.length = 0;
    row.chunk_size = chunk_size;
    Ok(())
}

fn fetch_chunk(conn: &mut dyn Connection, id: i64, seq: u64) -> StoreResult<Option<Vec<u8>>> {
    let value = conn.query_scalar(
        &Command::new("SELECT Data FROM BinaryChunks WHERE BinaryID = :id AND Seq = :seq")
            .bind("id", id)
            .bind("seq", as_i64(seq)),
    )?;
    Ok(value.and_then(|v| v.as_blob().map(<[u8]>::to_vec)))
}

fn put_chunk(conn: &mut dyn Connection, id: i64, seq: u64, data: &[u8]) -> StoreResult<()> {
    conn.execute(
        &Command::new("INSERT OR REPLACE INTO BinaryChunks (BinaryID, Seq, Data) VALUES (:id, :seq, :data)")
            .bind("id", id)
            .bind("seq", as_i64(seq))
            .bind("data", data),
    )?;
    Ok(())
}

/// Appends `data` at the end of a value and returns the new length.
pub(crate) fn append(conn: &mut dyn Connection, row: &mut BlobRow, mut data: &[u8]) -> StoreResult<u64> {
    if data.is_empty() {
        return Ok(row.length);
    }
    let size = row.chunk_size as u64;
    let mut length = row.length;

    #[allow(clippy::cast_possible_truncation)]
    let partial = (length % size) as usize;
    if partial != 0 {
        let seq = length / size;
        let mut chunk = fetch_chunk(conn, row.id, seq)?.unwrap_or_default();
        chunk.resize(partial, 0);
        let take = (row.chunk_size - partial).min(data.len());
        chunk.extend_from_slice(&data[..take]);
        put_chunk(conn, row.id, seq, &chunk)?;
        data = &data[take..];
        length += take as u64;
    }
    for piece in data.chunks(row.chunk_size) {
        put_chunk(conn, row.id, length / size, piece)?;
        length += piece.len() as u64;
    }

    conn.execute(
        &Command::new("UPDATE Binaries SET Length = :len WHERE ID = :id")
            .bind("len", as_i64(length))
            .bind("id", row.id),
    )?;
    row.length = length;
    Ok(length)
}

/// Reads up to `buf.len()` bytes starting at `position`.
///
/// Returns fewer bytes only at the end of the value.
pub(crate) fn read_at(conn: &mut dyn Connection, row: &BlobRow, position: u64, buf: &mut [u8]) -> StoreResult<usize> {
    if position >= row.length || buf.is_empty() {
        return Ok(0);
    }
    let size = row.chunk_size as u64;
    #[allow(clippy::cast_possible_truncation)]
    let want = (row.length - position).min(buf.len() as u64) as usize;

    let mut done = 0;
    while done < want {
        let pos = position + done as u64;
        #[allow(clippy::cast_possible_truncation)]
        let offset = (pos % size) as usize;
        let chunk = fetch_chunk(conn, row.id, pos / size)?.ok_or_else(|| {
            StoreError::illegal_state(format!("binary value {} is missing chunk {}", row.id, pos / size))
        })?;
        if offset >= chunk.len() {
            break;
        }
        let n = (chunk.len() - offset).min(want - done);
        buf[done..done + n].copy_from_slice(&chunk[offset..offset + n]);
        done += n;
    }
    Ok(done)
}

/// Reads a whole value.
pub(crate) fn read_all(conn: &mut dyn Connection, row: &BlobRow) -> StoreResult<Vec<u8>> {
    let rows = conn.query(
        &Command::new("SELECT Data FROM BinaryChunks WHERE BinaryID = :id ORDER BY Seq").bind("id", row.id),
    )?;
    let mut out = Vec::with_capacity(usize::try_from(row.length).unwrap_or(0));
    for r in &rows {
        out.extend_from_slice(r.get_blob(0)?);
    }
    out.truncate(usize::try_from(row.length).unwrap_or(usize::MAX));
    Ok(out)
}

/// Stores `data` as the value of an object property, replacing any
/// previous value.
pub(crate) fn write_all(
    conn: &mut dyn Connection,
    object_id: i64,
    name: &str,
    chunk_size: usize,
    data: &[u8],
) -> StoreResult<BlobHandle> {
    let mut row = match find(conn, object_id, name)? {
        Some(mut row) => {
            truncate(conn, &mut row, chunk_size)?;
            row
        }
        None => create(conn, object_id, name, chunk_size)?,
    };
    append(conn, &mut row, data)?;
    Ok(row.handle())
}

/// Copies the value `source_id` into an object property.
///
/// The chunks are copied row for row inside the store.
pub(crate) fn copy(conn: &mut dyn Connection, source_id: i64, object_id: i64, name: &str) -> StoreResult<BlobHandle> {
    let source = load(conn, source_id)?;
    let mut target = match find(conn, object_id, name)? {
        Some(mut row) => {
            truncate(conn, &mut row, source.chunk_size)?;
            row
        }
        None => create(conn, object_id, name, source.chunk_size)?,
    };
    conn.execute(
        &Command::new(
            "INSERT INTO BinaryChunks (BinaryID, Seq, Data) \
             SELECT :target, Seq, Data FROM BinaryChunks WHERE BinaryID = :source",
        )
        .bind("target", target.id)
        .bind("source", source.id),
    )?;
    conn.execute(
        &Command::new("UPDATE Binaries SET Length = :len WHERE ID = :id")
            .bind("len", as_i64(source.length))
            .bind("id", target.id),
    )?;
    target.length = source.length;
    Ok(target.handle())
}

/// Deletes the value of an object property. Returns the rows removed.
pub(crate) fn delete(conn: &mut dyn Connection, object_id: i64, name: &str) -> StoreResult<u64> {
    Ok(conn.execute(
        &Command::new("DELETE FROM Binaries WHERE ObjectID = :object AND Name = :name")
            .bind("object", object_id)
            .bind("name", name),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eavdb_storage::SqliteConnection;

    fn setup() -> (SqliteConnection, i64) {
        let mut conn = SqliteConnection::memory();
        conn.open().unwrap();
        let id = conn
            .query_scalar(&Command::new(
                "INSERT INTO Objects (Type, Name, Stamp) VALUES ('Doc', '', 1) RETURNING ID",
            ))
            .unwrap()
            .and_then(|v| v.as_i64())
            .unwrap();
        (conn, id)
    }

    fn bytes(n: usize) -> Vec<u8> {
        (0..n).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn append_splits_into_chunks() {
        let (mut conn, obj) = setup();
        let mut row = create(&mut conn, obj, "Scan", 4).unwrap();
        assert_eq!(append(&mut conn, &mut row, &bytes(10)).unwrap(), 10);
        let chunks = conn
            .query_scalar(&Command::new("SELECT COUNT(*) FROM BinaryChunks"))
            .unwrap()
            .and_then(|v| v.as_i64());
        assert_eq!(chunks, Some(3));
    }

    #[test]
    fn append_fills_partial_last_chunk() {
        let (mut conn, obj) = setup();
        let mut row = create(&mut conn, obj, "Scan", 4).unwrap();
        append(&mut conn, &mut row, b"abcdef").unwrap();
        append(&mut conn, &mut row, b"ghij").unwrap();
        let reloaded = load(&mut conn, row.id).unwrap();
        assert_eq!(reloaded.length, 10);
        assert_eq!(read_all(&mut conn, &reloaded).unwrap(), b"abcdefghij");
    }

    #[test]
    fn read_at_crosses_chunk_boundaries() {
        let (mut conn, obj) = setup();
        let data = bytes(23);
        let mut row = create(&mut conn, obj, "Scan", 5).unwrap();
        append(&mut conn, &mut row, &data).unwrap();

        let mut buf = [0u8; 9];
        assert_eq!(read_at(&mut conn, &row, 3, &mut buf).unwrap(), 9);
        assert_eq!(&buf, &data[3..12]);

        // short read at the end
        assert_eq!(read_at(&mut conn, &row, 20, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &data[20..]);
        assert_eq!(read_at(&mut conn, &row, 23, &mut buf).unwrap(), 0);
    }

    #[test]
    fn write_all_replaces_and_bumps_generation() {
        let (mut conn, obj) = setup();
        write_all(&mut conn, obj, "Scan", 4, &bytes(9)).unwrap();
        let handle = write_all(&mut conn, obj, "Scan", 4, b"xy").unwrap();
        assert_eq!(handle.length, 2);
        let generation = conn
            .query_scalar(&Command::new("SELECT Generation FROM Binaries WHERE ID = :id").bind("id", handle.id))
            .unwrap()
            .and_then(|v| v.as_i64());
        assert_eq!(generation, Some(1));
        let row = load(&mut conn, handle.id).unwrap();
        assert_eq!(read_all(&mut conn, &row).unwrap(), b"xy");
    }

    #[test]
    fn copy_duplicates_chunks() {
        let (mut conn, obj) = setup();
        let data = bytes(17);
        let source = write_all(&mut conn, obj, "A", 4, &data).unwrap();
        let copied = copy(&mut conn, source.id, obj, "B").unwrap();
        assert_ne!(copied.id, source.id);
        assert_eq!(copied.length, 17);
        let row = load(&mut conn, copied.id).unwrap();
        assert_eq!(row.chunk_size, 4);
        assert_eq!(read_all(&mut conn, &row).unwrap(), data);
    }

    #[test]
    fn missing_value_is_not_found() {
        let (mut conn, _) = setup();
        assert!(matches!(load(&mut conn, 404), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn list_and_delete() {
        let (mut conn, obj) = setup();
        write_all(&mut conn, obj, "B", 8, b"1").unwrap();
        write_all(&mut conn, obj, "A", 8, b"2").unwrap();
        let names: Vec<_> = list(&mut conn, obj).unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(delete(&mut conn, obj, "A").unwrap(), 1);
        assert_eq!(delete(&mut conn, obj, "A").unwrap(), 0);
        assert!(find(&mut conn, obj, "A").unwrap().is_none());
    }
}
