//! Link collections.

use crate::error::{StoreError, StoreResult};
use crate::types::{LinkState, ObjectHeader};
use std::collections::HashSet;

/// A directed edge to another object, with its change state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Header of the target object.
    pub target: ObjectHeader,
    /// Change state.
    pub state: LinkState,
}

/// Immutable set of links with unique targets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Links {
    items: Vec<Link>,
}

impl Links {
    /// Returns an empty set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> LinksBuilder {
        LinksBuilder::default()
    }

    /// Iterates links in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Link> {
        self.items.iter()
    }

    /// Returns the number of links.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no links.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true if a link to `target_id` is present.
    #[must_use]
    pub fn contains(&self, target_id: i64) -> bool {
        self.items.iter().any(|l| l.target.id == target_id)
    }

    pub(crate) fn from_vec(items: Vec<Link>) -> Self {
        Self { items }
    }
}

impl<'a> IntoIterator for &'a Links {
    type Item = &'a Link;
    type IntoIter = std::slice::Iter<'a, Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Append-only builder for [`Links`].
#[derive(Debug, Default)]
pub struct LinksBuilder {
    items: Vec<Link>,
    targets: HashSet<i64>,
}

impl LinksBuilder {
    fn push(mut self, target: ObjectHeader, state: LinkState) -> StoreResult<Self> {
        if !self.targets.insert(target.id) {
            return Err(StoreError::invalid_argument(format!(
                "duplicate link to object {}",
                target.id
            )));
        }
        self.items.push(Link { target, state });
        Ok(self)
    }

    /// Appends an edge to add.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the target already has a link.
    pub fn add(self, target: ObjectHeader) -> StoreResult<Self> {
        self.push(target, LinkState::New)
    }

    /// Appends an edge to remove.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the target already has a link.
    pub fn remove(self, target: ObjectHeader) -> StoreResult<Self> {
        self.push(target, LinkState::Deleted)
    }

    /// Freezes the collection.
    #[must_use]
    pub fn build(self) -> Links {
        Links { items: self.items }
    }
}
