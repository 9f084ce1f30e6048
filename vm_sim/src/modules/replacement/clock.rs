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

use log::trace;

use super::{ReplacementModule, ReplacementPolicy, VictimContext};
use crate::{
    error::{Result, VMError},
    frame_pool::FrameId,
    page_table::PageNumber,
};

/// Second chance replacement.
///
/// A hand sweeps over the frames in circular order. Referenced pages lose
/// their referenced bit and are skipped, the first unreferenced page is the
/// victim and the hand stops right after it.
#[derive(Debug, Default)]
pub struct ClockReplacementModule {
    hand: FrameId,
}

impl ClockReplacementModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame the next sweep starts at
    #[inline]
    pub fn hand(&self) -> FrameId {
        self.hand
    }
}

impl ReplacementModule for ClockReplacementModule {
    fn policy(&self) -> ReplacementPolicy {
        ReplacementPolicy::Clock
    }

    fn select_victim(&mut self, mut ctx: VictimContext<'_>) -> Result<PageNumber> {
        let frame_count = ctx.frames().total_frames();
        if ctx.frames().resident_count() == 0 {
            return Err(VMError::ReplacementExhausted);
        }

        // the first round clears every referenced bit, so the second one has to stop
        for _ in 0..(2 * frame_count) {
            let frame = self.hand;
            self.hand = (self.hand + 1) % frame_count;

            let Some(page) = ctx.frames().owner(frame) else {
                continue;
            };

            let entry = ctx
                .page_table_mut()
                .get_mut(page)
                .ok_or(VMError::ReplacementExhausted)?;

            if entry.is_referenced() {
                // page was accessed, give it another chance
                entry.set_referenced(false);
                trace!("Clock: second chance for page {} in frame {}", page, frame);
            } else {
                return Ok(page);
            }
        }

        Err(VMError::ReplacementExhausted)
    }
}

#[cfg(test)]
mod test {
    use super::ClockReplacementModule;
    use crate::{demand_paging::DemandPagingEngine, ReferenceString, VMConfig};

    fn engine(frames: usize) -> DemandPagingEngine<ClockReplacementModule> {
        DemandPagingEngine::new(frames, ClockReplacementModule::new(), VMConfig::default()).unwrap()
    }

    #[test]
    fn test_all_referenced_degrades_to_fifo() {
        let mut engine = engine(3);
        engine.run(&ReferenceString::reads(&[1, 2, 3, 1, 4])).unwrap();

        // every bit was set, so the hand clears all of them and comes back to frame 0
        let table = engine.page_table();
        assert!(!table.get(1).unwrap().is_valid());
        assert_eq!(table.get(4).unwrap().frame(), Some(0));
        assert!(!table.get(2).unwrap().is_referenced());
        assert!(!table.get(3).unwrap().is_referenced());
        assert_eq!(engine.replacement().hand(), 1);
    }

    #[test]
    fn test_referenced_page_gets_second_chance() {
        let mut engine = engine(3);
        engine.run(&ReferenceString::reads(&[1, 2, 3, 4, 2, 5])).unwrap();

        // after 4 replaced 1 the hand points at 2, which was referenced again
        let table = engine.page_table();
        assert!(table.get(2).unwrap().is_valid());
        assert!(!table.get(3).unwrap().is_valid());
        assert_eq!(table.get(5).unwrap().frame(), Some(2));
        assert_eq!(engine.statistics().total_faults, 5);
    }
}
