//! Result ordering.

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

impl Direction {
    pub(crate) const fn sql(self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    /// Property name or reserved header name.
    pub operand: String,
    /// Direction.
    pub direction: Direction,
}

/// Ordered sequence of sort keys.
///
/// Built append-only; earlier keys take precedence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderBy {
    keys: Vec<SortKey>,
}

impl OrderBy {
    /// Orders by one key.
    pub fn by(operand: impl Into<String>, direction: Direction) -> Self {
        Self::default().then(operand, direction)
    }

    /// Orders ascending by one key.
    pub fn asc(operand: impl Into<String>) -> Self {
        Self::by(operand, Direction::Ascending)
    }

    /// Orders descending by one key.
    pub fn desc(operand: impl Into<String>) -> Self {
        Self::by(operand, Direction::Descending)
    }

    /// Appends a key.
    #[must_use]
    pub fn then(mut self, operand: impl Into<String>, direction: Direction) -> Self {
        self.keys.push(SortKey {
            operand: operand.into(),
            direction,
        });
        self
    }

    /// Appends an ascending key.
    #[must_use]
    pub fn then_asc(self, operand: impl Into<String>) -> Self {
        self.then(operand, Direction::Ascending)
    }

    /// Appends a descending key.
    #[must_use]
    pub fn then_desc(self, operand: impl Into<String>) -> Self {
        self.then(operand, Direction::Descending)
    }

    /// Iterates keys in precedence order.
    pub fn iter(&self) -> std::slice::Iter<'_, SortKey> {
        self.keys.iter()
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if there are no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<'a> IntoIterator for &'a OrderBy {
    type Item = &'a SortKey;
    type IntoIter = std::slice::Iter<'a, SortKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}
