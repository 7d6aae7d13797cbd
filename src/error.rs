//! Errors.
//!
//! Absence is never an error: lookups return `Option` and removals return `bool`. What is left is
//! rejecting bad construction parameters and reporting an interrupted wait.

quick_error! {
    /// A table error.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Error {
        /// The initial capacity was zero.
        InvalidCapacity {
            capacity: usize,
        } {
            display("Invalid capacity {} - the table needs at least one bucket.", capacity)
            description("Invalid capacity.")
        }
        /// The load factor was outside `(0, 1]`.
        InvalidLoadFactor {
            load_factor: f64,
        } {
            display("Invalid load factor {} - expected a value in (0, 1].", load_factor)
            description("Invalid load factor.")
        }
        /// The growth factor would not grow the table.
        InvalidGrowthFactor {
            growth_factor: usize,
        } {
            display("Invalid growth factor {} - expected at least 2.", growth_factor)
            description("Invalid growth factor.")
        }
        /// A wait was interrupted through its `Interrupt` handle.
        ///
        /// This is a cancellation, not a fault: the operation simply did not run to completion.
        Interrupted {
            display("Interrupted while waiting.")
            description("Interrupted while waiting.")
        }
    }
}
