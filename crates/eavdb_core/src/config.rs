//! Engine configuration.

use crate::error::{StoreError, StoreResult};
use eavdb_codec::Precision;

/// Configuration for a [`crate::Database`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Binary values of at least this many bytes are stored out of line.
    pub inline_threshold: usize,

    /// Size of one stored chunk of an out-of-line binary value.
    pub chunk_size: usize,

    /// Maximum number of link rows per insert or delete statement.
    pub link_batch_size: usize,

    /// Granularity timestamps are rounded to before they are written.
    pub timestamp_precision: Precision,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inline_threshold: 8000,
            chunk_size: 64 * 1024, // 64 KiB
            link_batch_size: 256,
            timestamp_precision: Precision::Millis,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the inline threshold.
    #[must_use]
    pub const fn inline_threshold(mut self, bytes: usize) -> Self {
        self.inline_threshold = bytes;
        self
    }

    /// Sets the chunk size.
    #[must_use]
    pub const fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Sets the link batch size.
    #[must_use]
    pub const fn link_batch_size(mut self, rows: usize) -> Self {
        self.link_batch_size = rows;
        self
    }

    /// Sets the timestamp precision.
    #[must_use]
    pub const fn timestamp_precision(mut self, precision: Precision) -> Self {
        self.timestamp_precision = precision;
        self
    }

    /// Checks that every size is usable.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if a size is zero.
    pub fn validate(&self) -> StoreResult<()> {
        if self.chunk_size == 0 {
            return Err(StoreError::invalid_argument("chunk_size must be positive"));
        }
        if self.link_batch_size == 0 {
            return Err(StoreError::invalid_argument(
                "link_batch_size must be positive",
            ));
        }
        if self.inline_threshold == 0 {
            return Err(StoreError::invalid_argument(
                "inline_threshold must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.inline_threshold, 8000);
        assert_eq!(config.chunk_size, 65_536);
        assert_eq!(config.link_batch_size, 256);
        assert_eq!(config.timestamp_precision, Precision::Millis);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .chunk_size(16)
            .inline_threshold(32)
            .link_batch_size(2)
            .timestamp_precision(Precision::Seconds);

        assert_eq!(config.chunk_size, 16);
        assert_eq!(config.inline_threshold, 32);
        assert_eq!(config.link_batch_size, 2);
        assert_eq!(config.timestamp_precision, Precision::Seconds);
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(Config::new().chunk_size(0).validate().is_err());
        assert!(Config::new().link_batch_size(0).validate().is_err());
        assert!(Config::new().inline_threshold(0).validate().is_err());
    }
}
