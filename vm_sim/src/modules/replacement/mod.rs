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

mod clock;
mod fifo;
mod frequency;
mod lru;
mod optimal;

pub use clock::ClockReplacementModule;
pub use fifo::FifoReplacementModule;
pub use frequency::{LfuReplacementModule, MfuReplacementModule};
pub use lru::LruReplacementModule;
pub use optimal::OptimalReplacementModule;

use core::{fmt, str::FromStr};

use crate::{
    error::{Result, VMError},
    frame_pool::{FrameId, FramePool},
    page_table::{PageNumber, PageTable, PageTableEntry},
};

/// Names the available replacement strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReplacementPolicy {
    Fifo,
    Lru,
    Optimal,
    Clock,
    Lfu,
    Mfu,
}

impl ReplacementPolicy {
    pub const ALL: [ReplacementPolicy; 6] = [
        ReplacementPolicy::Fifo,
        ReplacementPolicy::Lru,
        ReplacementPolicy::Optimal,
        ReplacementPolicy::Clock,
        ReplacementPolicy::Lfu,
        ReplacementPolicy::Mfu,
    ];

    /// Optimal needs the complete future reference string up front.
    /// All other policies only look at the past.
    #[inline]
    pub fn is_offline(&self) -> bool {
        matches!(self, ReplacementPolicy::Optimal)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReplacementPolicy::Fifo => "FIFO",
            ReplacementPolicy::Lru => "LRU",
            ReplacementPolicy::Optimal => "Optimal",
            ReplacementPolicy::Clock => "Clock",
            ReplacementPolicy::Lfu => "LFU",
            ReplacementPolicy::Mfu => "MFU",
        }
    }
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReplacementPolicy {
    type Err = VMError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fifo" => Ok(ReplacementPolicy::Fifo),
            "lru" => Ok(ReplacementPolicy::Lru),
            "optimal" | "opt" => Ok(ReplacementPolicy::Optimal),
            "clock" | "second-chance" => Ok(ReplacementPolicy::Clock),
            "lfu" => Ok(ReplacementPolicy::Lfu),
            "mfu" => Ok(ReplacementPolicy::Mfu),
            _ => Err(VMError::invalid_config(format!(
                "unknown replacement policy '{}'",
                s
            ))),
        }
    }
}

/// State a replacement module may inspect while choosing a victim.
///
/// Only called when every frame is owned.
pub struct VictimContext<'a> {
    frames: &'a FramePool,
    page_table: &'a mut PageTable,
    position: u64,
}

impl<'a> VictimContext<'a> {
    pub(crate) fn new(frames: &'a FramePool, page_table: &'a mut PageTable, position: u64) -> Self {
        Self {
            frames,
            page_table,
            position,
        }
    }

    #[inline]
    pub fn frames(&self) -> &FramePool {
        self.frames
    }

    #[inline]
    pub fn page_table(&self) -> &PageTable {
        &*self.page_table
    }

    /// Zero based index of the access that caused the fault
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn page_table_mut(&mut self) -> &mut PageTable {
        &mut *self.page_table
    }

    /// Picks the resident page with the smallest `key`.
    /// Resident pages are visited in page order, so ties go to the lowest page number.
    pub fn min_resident_by<K: Ord, F: Fn(&PageTableEntry) -> K>(&self, key: F) -> Result<PageNumber> {
        self.page_table
            .resident()
            .min_by_key(|entry| (key(entry), entry.page_number()))
            .map(|entry| entry.page_number())
            .ok_or(VMError::ReplacementExhausted)
    }
}

/// A page replacement strategy.
///
/// The engine reports every load, hit and eviction so that modules can keep
/// their own bookkeeping; `select_victim` must return a resident page.
pub trait ReplacementModule {
    fn policy(&self) -> ReplacementPolicy;

    /// `page` was loaded into `frame`
    fn page_loaded(&mut self, _page: PageNumber, _frame: FrameId) {}

    /// `page` was accessed while resident
    fn page_hit(&mut self, _page: PageNumber) {}

    /// `page` lost its frame
    fn page_evicted(&mut self, _page: PageNumber) {}

    fn select_victim(&mut self, ctx: VictimContext<'_>) -> Result<PageNumber>;
}
