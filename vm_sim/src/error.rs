/*
 *  Copyright (C) 2025  Markus Elias Gerber
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use thiserror::Error;

/// Result type used by every fallible operation of this crate
pub type Result<T> = core::result::Result<T, VMError>;

/// Errors reported by the simulator engines.
///
/// None of these are transient: the caller has to fix its input
/// (or its configuration) before trying again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VMError {
    /// Rejected before any state was touched
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The buddy allocator has no free block of a sufficient order.
    /// Its free lists are left untouched.
    #[error("out of memory: cannot allocate {requested} units (order {order})")]
    OutOfMemory { requested: usize, order: usize },

    /// The address (or object slot) is not currently allocated
    #[error("invalid free: {address} is not allocated")]
    InvalidFree { address: usize },

    /// A replacement module was asked for a victim while no page was resident.
    /// This is a broken invariant inside the paging engine.
    #[error("replacement exhausted: no resident page to select as victim")]
    ReplacementExhausted,

    #[error("unknown slab cache '{0}'")]
    UnknownCache(String),
}

impl VMError {
    pub(crate) fn invalid_config(msg: impl Into<String>) -> Self {
        VMError::InvalidConfiguration(msg.into())
    }
}

#[cfg(test)]
mod test {
    use super::VMError;

    #[test]
    fn test_error_messages() {
        let err = VMError::OutOfMemory {
            requested: 300,
            order: 9,
        };
        assert_eq!(
            err.to_string(),
            "out of memory: cannot allocate 300 units (order 9)"
        );

        let err = VMError::invalid_config("frame count must be positive");
        assert!(err.to_string().contains("frame count must be positive"));
    }
}
