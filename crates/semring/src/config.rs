use thiserror::Error;

/// Ring capacity of each channel in the demo pipeline.
pub const DEFAULT_CAPACITY: usize = 4;

/// Number of items each stage handles in the demo pipeline.
pub const DEFAULT_ITEM_COUNT: usize = 8;

/// Configuration for a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Slots per channel ring. One slot is reserved, so a channel holds at
    /// most `capacity - 1` items.
    pub capacity: usize,
    /// Items produced, transformed and consumed (the same `N` for every stage).
    pub item_count: usize,
}

/// Rejected configuration values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The ring would have no usable slot.
    #[error("capacity must be at least 2 (one slot is reserved), got {capacity}")]
    CapacityTooSmall {
        /// The rejected capacity.
        capacity: usize,
    },
}

impl Config {
    /// Creates a configuration with custom settings.
    pub const fn new(capacity: usize, item_count: usize) -> Self {
        Self {
            capacity,
            item_count,
        }
    }

    /// Number of items a channel holds at once.
    #[inline]
    pub const fn usable_capacity(&self) -> usize {
        self.capacity.saturating_sub(1)
    }

    /// Sets the ring capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the item count.
    pub fn with_item_count(mut self, item_count: usize) -> Self {
        self.item_count = item_count;
        self
    }

    /// Checks that the pipeline can make progress with these values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity < 2 {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        DEMO_CONFIG
    }
}

/// Capacity 4, eight items: the letters `a` through `h`.
pub const DEMO_CONFIG: Config = Config::new(DEFAULT_CAPACITY, DEFAULT_ITEM_COUNT);
