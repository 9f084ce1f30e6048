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

use static_assertions::const_assert;

use crate::error::{Result, VMError};

/// Time needed for one memory access that hits a resident page
pub const DEFAULT_MEMORY_ACCESS_TIME_NS: u64 = 200;

/// Time needed to service one page fault (8ms)
pub const DEFAULT_PAGE_FAULT_SERVICE_TIME_NS: u64 = 8_000_000;

/// Size Δ of the working set window
pub const DEFAULT_WORKING_SET_WINDOW: usize = 4;

const_assert!(DEFAULT_WORKING_SET_WINDOW > 0);
const_assert!(DEFAULT_PAGE_FAULT_SERVICE_TIME_NS > DEFAULT_MEMORY_ACCESS_TIME_NS);

/// Options every simulator instance is constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VMConfig {
    pub memory_access_time_ns: u64,
    pub page_fault_service_time_ns: u64,
    pub working_set_window: usize,
}

impl Default for VMConfig {
    fn default() -> Self {
        Self {
            memory_access_time_ns: DEFAULT_MEMORY_ACCESS_TIME_NS,
            page_fault_service_time_ns: DEFAULT_PAGE_FAULT_SERVICE_TIME_NS,
            working_set_window: DEFAULT_WORKING_SET_WINDOW,
        }
    }
}

impl VMConfig {
    pub fn validate(&self) -> Result<()> {
        if self.working_set_window == 0 {
            return Err(VMError::invalid_config(
                "working set window must hold at least one reference",
            ));
        }

        if self.memory_access_time_ns == 0 {
            return Err(VMError::invalid_config(
                "memory access time must be positive",
            ));
        }

        Ok(())
    }

    /// Parses a (partial) configuration, missing keys fall back to the defaults
    #[cfg(feature = "serde")]
    pub fn from_json(text: &str) -> Result<Self> {
        let config: VMConfig = serde_json::from_str(text)
            .map_err(|err| VMError::invalid_config(format!("malformed config: {}", err)))?;
        config.validate()?;

        Ok(config)
    }
}
