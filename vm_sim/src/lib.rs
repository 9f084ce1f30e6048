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

mod cow;
mod demand_paging;
mod error;
mod frame_pool;
mod page_table;
mod reference_string;
mod vm_config;

#[cfg(test)]
mod test;

pub mod analysis;
pub mod modules;
pub mod working_set;

pub use cow::{CopyOnWriteManager, Pid, SharedPage, SharedPageId, WriteOutcome};
pub use demand_paging::{
    simulate, AccessOutcome, DemandPagingEngine, Eviction, PagingStatistics, SimulationReport,
};
pub use error::{Result, VMError};
pub use frame_pool::{FrameAllocation, FrameId, FramePool};
pub use page_table::{PageNumber, PageTable, PageTableDumpEntry, PageTableEntry};
pub use reference_string::{PageReference, ReferenceString};
pub use vm_config::{
    VMConfig, DEFAULT_MEMORY_ACCESS_TIME_NS, DEFAULT_PAGE_FAULT_SERVICE_TIME_NS,
    DEFAULT_WORKING_SET_WINDOW,
};
