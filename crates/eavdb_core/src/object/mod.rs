//! Object CRUD over the EAV layout.
//!
//! An object is a header row in `Objects`, zero or more property rows in
//! `Properties` or `Binaries`, and outgoing edges in `Links`. Saves are
//! differential: only properties marked new, changed or deleted are
//! written, and links only when the caller passes a link set.

mod link;
mod property;
pub(crate) mod store;

pub use link::{Link, Links, LinksBuilder};
pub use property::{Properties, PropertiesBuilder, Property};

use crate::collaborator::ObjectRef;
use crate::types::ObjectHeader;

/// Outcome of a save.
#[derive(Debug, Clone)]
pub struct SaveResult {
    /// Header as stored after the save, with the new stamp.
    pub header: ObjectHeader,
    /// Edges actually inserted or removed.
    pub links: Links,
    /// Properties written or removed, with values as stored.
    pub properties: Properties,
}

/// A linked object resolved during retrieve.
#[derive(Debug, Clone)]
pub struct LinkedObject {
    /// Header of the target.
    pub header: ObjectHeader,
    /// Business object from the identity cache or the factory.
    pub object: ObjectRef,
    /// True if the object came from the identity cache.
    pub cached: bool,
}

/// Outcome of a retrieve.
#[derive(Debug, Clone)]
pub struct RetrieveResult {
    /// Header as stored.
    pub header: ObjectHeader,
    /// Outgoing links, empty when `current` is true.
    pub links: Vec<LinkedObject>,
    /// Stored properties, empty when `current` is true.
    pub properties: Properties,
    /// True if the caller's stamp matched and nothing else was loaded.
    pub current: bool,
}
