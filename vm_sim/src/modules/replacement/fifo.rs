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

use std::collections::VecDeque;

use super::{ReplacementModule, ReplacementPolicy, VictimContext};
use crate::{
    error::{Result, VMError},
    frame_pool::FrameId,
    page_table::PageNumber,
};

/// Evicts the page that has been resident the longest.
///
/// Hits do not move a page inside the queue.
#[derive(Debug, Default)]
pub struct FifoReplacementModule {
    queue: VecDeque<PageNumber>,
}

impl FifoReplacementModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resident pages from oldest to newest
    pub fn arrival_order(&self) -> impl Iterator<Item = PageNumber> + '_ {
        self.queue.iter().copied()
    }
}

impl ReplacementModule for FifoReplacementModule {
    fn policy(&self) -> ReplacementPolicy {
        ReplacementPolicy::Fifo
    }

    fn page_loaded(&mut self, page: PageNumber, _frame: FrameId) {
        self.queue.push_back(page);
    }

    fn page_evicted(&mut self, page: PageNumber) {
        // victims are already popped in select_victim
        self.queue.retain(|queued| *queued != page);
    }

    fn select_victim(&mut self, ctx: VictimContext<'_>) -> Result<PageNumber> {
        let victim = self.queue.pop_front().ok_or(VMError::ReplacementExhausted)?;
        debug_assert!(
            ctx.page_table().get(victim).is_some_and(|entry| entry.is_valid()),
            "queued page {} should be resident",
            victim
        );
        Ok(victim)
    }
}

#[cfg(test)]
mod test {
    use super::FifoReplacementModule;
    use crate::{demand_paging::DemandPagingEngine, ReferenceString, VMConfig};

    #[test]
    fn test_hits_do_not_reorder() {
        let mut engine =
            DemandPagingEngine::new(3, FifoReplacementModule::new(), VMConfig::default()).unwrap();

        // page 1 is hit repeatedly but still leaves first
        engine.run(&ReferenceString::reads(&[1, 2, 3, 1, 1, 1, 4])).unwrap();

        assert!(!engine.page_table().get(1).unwrap().is_valid());
        let order: Vec<_> = engine.replacement().arrival_order().collect();
        assert_eq!(order, vec![2, 3, 4]);
    }
}
