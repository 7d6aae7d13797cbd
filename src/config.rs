//! Table configuration.

use std::time::Duration;
use Error;

/// The default number of buckets.
pub const DEFAULT_CAPACITY: usize = 16;
/// The default fill ratio at which the table grows.
pub const DEFAULT_LOAD_FACTOR: f64 = 0.5;
/// The factor the capacity is multiplied by when the table grows.
pub const GROWTH_FACTOR: usize = 2;
/// How long `heavy_read` holds the read lock by default.
pub const HEAVY_READ_DELAY: Duration = Duration::from_millis(20);

/// Construction parameters of a `ConcurrentHashTable`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// The initial number of buckets.
    ///
    /// Must be positive.
    pub capacity: usize,
    /// The fill ratio (entries per bucket) at which the table grows.
    ///
    /// Must be in `(0, 1]`. The check happens before every insertion, so the table grows once
    /// `len / capacity` reaches this value.
    pub load_factor: f64,
    /// The factor the capacity is multiplied by on growth.
    ///
    /// Must be at least 2.
    pub growth_factor: usize,
    /// How long `heavy_read` holds the read lock.
    pub heavy_read_delay: Duration,
}

impl Config {
    /// Check the parameters.
    pub fn validate(&self) -> Result<(), Error> {
        if self.capacity == 0 {
            return Err(Error::InvalidCapacity {
                capacity: self.capacity,
            });
        }

        // Written so that NaN fails the check too.
        if !(self.load_factor > 0.0 && self.load_factor <= 1.0) {
            return Err(Error::InvalidLoadFactor {
                load_factor: self.load_factor,
            });
        }

        if self.growth_factor < 2 {
            return Err(Error::InvalidGrowthFactor {
                growth_factor: self.growth_factor,
            });
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            capacity: DEFAULT_CAPACITY,
            load_factor: DEFAULT_LOAD_FACTOR,
            growth_factor: GROWTH_FACTOR,
            heavy_read_delay: HEAVY_READ_DELAY,
        }
    }
}
