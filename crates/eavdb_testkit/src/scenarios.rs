//! Populated stores for integration tests.

use eavdb_codec::Value;
use eavdb_core::{Database, Links, ObjectHeader, Properties};

/// Cities assigned round-robin by [`customers`].
pub const CITIES: [&str; 3] = ["Oslo", "Bergen", "Tromsø"];

/// Saves `n` `Customer` objects named `c0`, `c1`, ...
///
/// Customer `i` has `City = CITIES[i % 3]` and `Age = 20 + i`; every
/// even customer also has an `Email`.
pub fn customers(db: &mut Database, n: usize) -> Vec<ObjectHeader> {
    (0..n)
        .map(|i| {
            let mut builder = Properties::builder()
                .added("City", CITIES[i % CITIES.len()])
                .expect("unique")
                .added("Age", 20 + i as i64)
                .expect("unique");
            if i % 2 == 0 {
                builder = builder
                    .added("Email", format!("c{i}@example.com"))
                    .expect("unique");
            }
            db.save(&ObjectHeader::new("Customer", format!("c{i}")), None, &builder.build())
                .expect("save customer")
                .header
        })
        .collect()
}

/// Saves one `Order` linked to every given part and returns its header.
pub fn order_with_parts(db: &mut Database, parts: &[ObjectHeader]) -> ObjectHeader {
    let mut links = Links::builder();
    for part in parts {
        links = links.add(part.clone()).expect("unique part");
    }
    db.save(
        &ObjectHeader::new("Order", "o1"),
        Some(&links.build()),
        &Properties::empty(),
    )
    .expect("save order")
    .header
}

/// Saves `n` `Part` objects named `p0`, `p1`, ...
pub fn parts(db: &mut Database, n: usize) -> Vec<ObjectHeader> {
    (0..n)
        .map(|i| {
            let props = Properties::builder()
                .added("Weight", Value::Float(i as f64 * 0.5))
                .expect("unique")
                .build();
            db.save(&ObjectHeader::new("Part", format!("p{i}")), None, &props)
                .expect("save part")
                .header
        })
        .collect()
}
