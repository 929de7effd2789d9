//! Two handles over one store file racing on the same object.

use eavdb_core::{ObjectHeader, Properties, StoreError};
use eavdb_testkit::prelude::*;
use std::sync::Barrier;
use std::thread;

const WRITERS: usize = 4;

#[test]
fn exactly_one_stale_writer_wins() {
    let mut db = TestDatabase::file();
    let props = Properties::builder().added("Qty", 1i64).unwrap().build();
    let saved = db.save(&ObjectHeader::new("Widget", "w"), None, &props).unwrap().header;

    let handles: Vec<_> = (0..WRITERS).map(|_| db.second_handle().0).collect();
    let barrier = Barrier::new(WRITERS);

    let results: Vec<_> = thread::scope(|s| {
        let workers: Vec<_> = handles
            .into_iter()
            .enumerate()
            .map(|(i, mut handle)| {
                let barrier = &barrier;
                let saved = &saved;
                s.spawn(move || {
                    let update = Properties::builder().changed("Qty", i as i64 + 10).unwrap().build();
                    barrier.wait();
                    handle.save(saved, None, &update)
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    let wins = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(StoreError::Conflict { .. })))
        .count();
    assert_eq!(wins, 1);
    assert_eq!(conflicts, WRITERS - 1);

    let current = db.header(saved.id).unwrap().unwrap();
    assert!(current.stamp > saved.stamp);
}

#[test]
fn second_handle_sees_committed_writes() {
    let mut db = TestDatabase::file();
    let (mut other, log) = db.second_handle();
    let saved = db
        .save(&ObjectHeader::new("Widget", "w"), None, &Properties::empty())
        .unwrap()
        .header;

    assert_eq!(other.header(saved.id).unwrap(), Some(saved));
    assert_eq!(log.begins(), 1);
}
