//! Property collections.

use crate::error::{StoreError, StoreResult};
use crate::types::PropertyState;
use eavdb_codec::Value;
use std::collections::HashSet;

/// A named value with its change state.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Case-sensitive name, unique within an object.
    pub name: String,
    /// Value; [`Value::Null`] is an explicit null, not an absent property.
    pub value: Value,
    /// Change state.
    pub state: PropertyState,
}

impl Property {
    /// Creates a property.
    pub fn new(name: impl Into<String>, value: impl Into<Value>, state: PropertyState) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            state,
        }
    }
}

/// Immutable set of properties with unique names.
///
/// Built with [`PropertiesBuilder`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Properties {
    items: Vec<Property>,
}

impl Properties {
    /// Returns an empty set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> PropertiesBuilder {
        PropertiesBuilder::new()
    }

    /// Returns the property called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.items.iter().find(|p| p.name == name)
    }

    /// Returns the value of `name`; `None` means the property is absent.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).map(|p| &p.value)
    }

    /// Returns true if a property called `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates properties in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Property> {
        self.items.iter()
    }

    /// Returns the number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a Properties {
    type Item = &'a Property;
    type IntoIter = std::slice::Iter<'a, Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Append-only builder for [`Properties`].
#[derive(Debug, Default)]
pub struct PropertiesBuilder {
    items: Vec<Property>,
    names: HashSet<String>,
}

impl PropertiesBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a property.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty or duplicate name.
    pub fn push(&mut self, property: Property) -> StoreResult<&mut Self> {
        if property.name.is_empty() {
            return Err(StoreError::invalid_argument("property name must not be empty"));
        }
        if !self.names.insert(property.name.clone()) {
            return Err(StoreError::invalid_argument(format!(
                "duplicate property {:?}",
                property.name
            )));
        }
        self.items.push(property);
        Ok(self)
    }

    /// Appends a property that did not exist before.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty or duplicate name.
    pub fn added(mut self, name: impl Into<String>, value: impl Into<Value>) -> StoreResult<Self> {
        self.push(Property::new(name, value, PropertyState::New))?;
        Ok(self)
    }

    /// Appends a property with a new value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty or duplicate name.
    pub fn changed(mut self, name: impl Into<String>, value: impl Into<Value>) -> StoreResult<Self> {
        self.push(Property::new(name, value, PropertyState::Changed))?;
        Ok(self)
    }

    /// Appends a property to be removed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty or duplicate name.
    pub fn deleted(mut self, name: impl Into<String>) -> StoreResult<Self> {
        self.push(Property::new(name, Value::Null, PropertyState::Deleted))?;
        Ok(self)
    }

    /// Returns the number of properties so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing was appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Freezes the collection.
    #[must_use]
    pub fn build(self) -> Properties {
        Properties { items: self.items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_differs_from_null() {
        let props = Properties::builder()
            .added("Fax", Value::Null)
            .unwrap()
            .build();
        assert_eq!(props.value("Fax"), Some(&Value::Null));
        assert_eq!(props.value("Phone"), None);
    }

    #[test]
    fn duplicates_are_rejected() {
        let err = Properties::builder()
            .added("A", 1i64)
            .unwrap()
            .changed("A", 2i64)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument { .. }));
    }

    #[test]
    fn names_are_case_sensitive() {
        let props = Properties::builder()
            .added("a", 1i64)
            .unwrap()
            .added("A", 2i64)
            .unwrap()
            .build();
        assert_eq!(props.len(), 2);
        assert_eq!(props.value("A"), Some(&Value::Integer(2)));
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(Properties::builder().added("", 1i64).is_err());
    }

    #[test]
    fn push_keeps_order() {
        let mut builder = PropertiesBuilder::new();
        builder
            .push(Property::new("Z", 1i64, PropertyState::New))
            .unwrap()
            .push(Property::new("B", 2i64, PropertyState::Deleted))
            .unwrap();
        let names: Vec<_> = builder.build().iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, ["Z", "B"]);
    }
}
