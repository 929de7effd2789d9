//! Out-of-line binary values and streaming.

use eavdb_core::{BlobHandle, Config, ObjectHeader, Properties, Stamp, StoreError, Value};
use eavdb_testkit::prelude::*;
use std::io::{Read, Seek, SeekFrom, Write};

const CHUNK: usize = 16;

fn small_chunks() -> TestDatabase {
    TestDatabase::memory_with_config(Config::new().chunk_size(CHUNK).inline_threshold(8))
}

fn document(db: &mut TestDatabase) -> ObjectHeader {
    db.save(&ObjectHeader::new("Document", "d1"), None, &Properties::empty())
        .unwrap()
        .header
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn read_back(db: &mut TestDatabase, handle: BlobHandle) -> Vec<u8> {
    let mut stream = db.open_blob(handle).unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).unwrap();
    out
}

fn stored_handle(db: &mut TestDatabase, header: &ObjectHeader, name: &str) -> Option<BlobHandle> {
    let unread = ObjectHeader {
        stamp: Stamp::NONE,
        ..header.clone()
    };
    db.retrieve(&unread)
        .unwrap()
        .properties
        .value(name)
        .and_then(Value::as_binary)
        .and_then(|b| b.handle())
}

#[test]
fn streamed_value_spans_chunks() {
    let mut db = small_chunks();
    let header = document(&mut db);
    let data = pattern(CHUNK * 2 + 37);

    let mut stream = db.create_blob(&header, "Body").unwrap();
    stream.write_all(&data[..CHUNK]).unwrap();
    stream.write_all(&data[CHUNK..CHUNK * 2]).unwrap();
    stream.write_all(&data[CHUNK * 2..]).unwrap();
    let handle = stream.close().unwrap().expect("value was written");
    assert_eq!(handle.length, data.len() as i64);

    assert_eq!(stored_handle(&mut db, &header, "Body"), Some(handle));
    assert_eq!(read_back(&mut db, handle), data);
}

#[test]
fn read_at_returns_a_sub_range() {
    let mut db = small_chunks();
    let header = document(&mut db);
    let data = pattern(CHUNK * 2 + 37);
    let props = Properties::builder().added("Body", data.clone()).unwrap().build();
    let saved = db.save(&header, None, &props).unwrap();
    let handle = saved
        .properties
        .value("Body")
        .and_then(Value::as_binary)
        .and_then(|b| b.handle())
        .expect("large values are stored out of line");

    let mut stream = db.open_blob(handle).unwrap();
    let mut buf = [0u8; 10];
    assert_eq!(stream.read_at(CHUNK as u64 + 10, &mut buf).unwrap(), 10);
    assert_eq!(&buf[..], &data[CHUNK + 10..CHUNK + 20]);
    assert_eq!(stream.position(), 0);

    // a read past the end is short
    let mut tail = [0u8; 64];
    let n = stream.read_at(data.len() as u64 - 5, &mut tail).unwrap();
    assert_eq!(&tail[..n], &data[data.len() - 5..]);
}

#[test]
fn small_binaries_stay_inline() {
    let mut db = small_chunks();
    let header = document(&mut db);
    let props = Properties::builder().added("Tag", vec![1u8, 2, 3]).unwrap().build();
    let saved = db.save(&header, None, &props).unwrap();
    let value = saved.properties.value("Tag").unwrap();
    assert_eq!(value.as_bytes().map(|b| b.to_vec()), Some(vec![1, 2, 3]));
    assert_eq!(db.log().count_matching("INSERT INTO Binaries"), 0);
}

#[test]
fn enclosing_rollback_discards_stream_writes() {
    let mut db = small_chunks();
    let header = document(&mut db);

    db.begin().unwrap();
    let mut stream = db.create_blob(&header, "Body").unwrap();
    stream.write_all(&pattern(50)).unwrap();
    let handle = stream.close().unwrap().unwrap();
    db.rollback().unwrap();
    assert_eq!(db.log().rollbacks(), 1);
    assert_eq!(db.log().commits(), 1);

    assert!(matches!(db.open_blob(handle), Err(StoreError::NotFound { .. })));
    assert_eq!(stored_handle(&mut db, &header, "Body"), None);
}

#[test]
fn writing_past_the_end_zero_fills() {
    let mut db = small_chunks();
    let header = document(&mut db);

    let mut stream = db.create_blob(&header, "Body").unwrap();
    stream.write_all(b"abc").unwrap();
    stream.seek(SeekFrom::Start(6)).unwrap();
    stream.write_all(b"xyz").unwrap();
    let handle = stream.close().unwrap().unwrap();

    assert_eq!(read_back(&mut db, handle), b"abc\0\0\0xyz");
}

#[test]
fn overwrite_in_the_middle_replaces_bytes() {
    let mut db = small_chunks();
    let header = document(&mut db);
    let data = pattern(40);
    let props = Properties::builder().added("Body", data.clone()).unwrap().build();
    db.save(&header, None, &props).unwrap();
    let handle = stored_handle(&mut db, &header, "Body").unwrap();

    let mut stream = db.open_blob(handle).unwrap();
    stream.seek(SeekFrom::Start(20)).unwrap();
    stream.write_all(b"ZZ").unwrap();
    let mut peek = [0u8; 4];
    stream.read_at(19, &mut peek).unwrap();
    assert_eq!(&peek[1..3], b"ZZ");
    stream.flush().unwrap();
    drop(stream);

    let mut expected = data;
    expected[20..22].copy_from_slice(b"ZZ");
    let handle = stored_handle(&mut db, &header, "Body").unwrap();
    assert_eq!(read_back(&mut db, handle), expected);
}

#[test]
fn dropping_a_stream_writes_back_pending_edits() {
    let mut db = small_chunks();
    let header = document(&mut db);

    let mut stream = db.create_blob(&header, "Body").unwrap();
    stream.write_all(b"hello world").unwrap();
    stream.seek(SeekFrom::Start(0)).unwrap();
    stream.write_all(b"J").unwrap();
    drop(stream);

    let handle = stored_handle(&mut db, &header, "Body").unwrap();
    assert_eq!(handle.length, 11);
    assert_eq!(read_back(&mut db, handle), b"Jello world");
}

#[test]
fn streaming_over_an_inline_value_moves_it_out_of_line() {
    let mut db = small_chunks();
    let header = document(&mut db);
    let props = Properties::builder().added("Thumb", vec![1u8; 4]).unwrap().build();
    db.save(&header, None, &props).unwrap();

    let mut stream = db.create_blob(&header, "Thumb").unwrap();
    stream.write_all(b"new content").unwrap();
    let handle = stream.close().unwrap().unwrap();

    assert_eq!(stored_handle(&mut db, &header, "Thumb"), Some(handle));
    assert_eq!(read_back(&mut db, handle), b"new content");
}

#[test]
fn out_of_order_stream_over_a_scalar_replaces_it() {
    let mut db = small_chunks();
    let header = document(&mut db);
    let props = Properties::builder().added("Note", "plain text").unwrap().build();
    db.save(&header, None, &props).unwrap();

    let mut stream = db.create_blob(&header, "Note").unwrap();
    stream.seek(SeekFrom::Start(2)).unwrap();
    stream.write_all(b"zz").unwrap();
    let handle = stream.close().unwrap().unwrap();

    assert_eq!(stored_handle(&mut db, &header, "Note"), Some(handle));
    assert_eq!(read_back(&mut db, handle), b"\0\0zz");
}

#[test]
fn release_discards_edits_and_is_idempotent() {
    let mut db = small_chunks();
    let header = document(&mut db);
    let data = pattern(20);
    let props = Properties::builder().added("Body", data.clone()).unwrap().build();
    db.save(&header, None, &props).unwrap();
    let handle = stored_handle(&mut db, &header, "Body").unwrap();

    let mut stream = db.open_blob(handle).unwrap();
    stream.write_all(b"Q").unwrap();
    stream.release().unwrap();
    stream.release().unwrap();
    stream.close().unwrap();

    assert_eq!(read_back(&mut db, handle), data);
}

#[test]
fn create_blob_replaces_previous_value() {
    let mut db = small_chunks();
    let header = document(&mut db);
    let props = Properties::builder().added("Body", pattern(60)).unwrap().build();
    db.save(&header, None, &props).unwrap();

    let mut stream = db.create_blob(&header, "Body").unwrap();
    stream.write_all(b"short").unwrap();
    let handle = stream.close().unwrap().unwrap();

    assert_eq!(handle.length, 5);
    assert_eq!(read_back(&mut db, handle), b"short");
}

#[test]
fn streaming_leaves_the_stamp_alone() {
    let mut db = small_chunks();
    let header = document(&mut db);

    let mut stream = db.create_blob(&header, "Body").unwrap();
    stream.write_all(&pattern(30)).unwrap();
    stream.close().unwrap();

    assert_eq!(db.header(header.id).unwrap(), Some(header));
}

#[test]
fn create_blob_requires_a_saved_object() {
    let mut db = small_chunks();
    assert!(matches!(
        db.create_blob(&ObjectHeader::new("Document", "x"), "Body"),
        Err(StoreError::InvalidArgument { .. })
    ));

    let header = document(&mut db);
    assert!(matches!(
        db.create_blob(&header, ""),
        Err(StoreError::InvalidArgument { .. })
    ));
    db.delete(&header).unwrap();
    assert!(matches!(
        db.create_blob(&header, "Body"),
        Err(StoreError::NotFound { .. })
    ));
}

#[test]
fn deleting_the_owner_removes_its_values() {
    let mut db = small_chunks();
    let header = document(&mut db);
    let props = Properties::builder().added("Body", pattern(50)).unwrap().build();
    db.save(&header, None, &props).unwrap();
    let handle = stored_handle(&mut db, &header, "Body").unwrap();

    let current = db.header(header.id).unwrap().unwrap();
    db.delete(&current).unwrap();
    assert!(matches!(db.open_blob(handle), Err(StoreError::NotFound { .. })));
}
