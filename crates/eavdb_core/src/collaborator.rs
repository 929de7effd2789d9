//! Collaborators the engine consumes: object factory and identity cache.
//!
//! The engine never constructs business objects itself. Retrieve resolves
//! each linked object through an [`IdentityCache`] first and falls back to
//! an [`ObjectFactory`] for the misses.

use crate::error::StoreResult;
use crate::types::{ObjectHeader, Stamp};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A business object produced by a factory or held in a cache.
pub trait BusinessObject: Send + Sync + fmt::Debug {
    /// Returns the object's header.
    fn header(&self) -> &ObjectHeader;

    /// Returns the object for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a business object.
pub type ObjectRef = Arc<dyn BusinessObject>;

/// Constructs business objects by type name.
pub trait ObjectFactory: Send {
    /// Creates an instance of `type_name` carrying the given header fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unknown to the factory.
    fn create_instance(&self, type_name: &str, id: i64, stamp: Stamp, name: &str) -> StoreResult<ObjectRef>;
}

/// Looks up already materialized objects.
pub trait IdentityCache: Send {
    /// Returns the cached object for `(id, type_name)`, if any.
    fn lookup(&self, id: i64, type_name: &str) -> Option<ObjectRef>;
}

/// A business object that is nothing but its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    header: ObjectHeader,
}

impl StoredObject {
    /// Wraps a header.
    #[must_use]
    pub fn new(header: ObjectHeader) -> Self {
        Self { header }
    }
}

impl BusinessObject for StoredObject {
    fn header(&self) -> &ObjectHeader {
        &self.header
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Factory producing [`StoredObject`]s for every type name.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderFactory;

impl ObjectFactory for HeaderFactory {
    fn create_instance(&self, type_name: &str, id: i64, stamp: Stamp, name: &str) -> StoreResult<ObjectRef> {
        Ok(Arc::new(StoredObject::new(ObjectHeader::stored(
            id, type_name, name, stamp,
        ))))
    }
}

/// Cache that never hits.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl IdentityCache for NoCache {
    fn lookup(&self, _id: i64, _type_name: &str) -> Option<ObjectRef> {
        None
    }
}
