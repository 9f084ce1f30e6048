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

use super::{ReplacementModule, ReplacementPolicy, VictimContext};
use crate::{
    error::{Result, VMError},
    page_table::PageNumber,
    reference_string::ReferenceString,
};

/// Belady's optimal replacement.
///
/// **This policy is offline:** it is built from the complete reference string
/// and assumes that the n-th access issued to the engine is the n-th entry of
/// that string. It only makes sense inside a simulation and serves as the
/// lower bound the online policies are compared against.
#[derive(Debug, Clone)]
pub struct OptimalReplacementModule {
    future: Vec<PageNumber>,
}

impl OptimalReplacementModule {
    pub fn new(reference_string: &ReferenceString) -> Self {
        Self {
            future: reference_string.pages().collect(),
        }
    }

    /// Distance from `position` to the next use of `page`, `None` if it is never used again
    fn next_use(&self, page: PageNumber, position: usize) -> Option<usize> {
        let start = (position + 1).min(self.future.len());
        self.future[start..].iter().position(|next| *next == page)
    }
}

impl ReplacementModule for OptimalReplacementModule {
    fn policy(&self) -> ReplacementPolicy {
        ReplacementPolicy::Optimal
    }

    fn select_victim(&mut self, ctx: VictimContext<'_>) -> Result<PageNumber> {
        let position = ctx.position() as usize;
        let mut victim: Option<(usize, PageNumber)> = None;

        for entry in ctx.page_table().resident() {
            let page = entry.page_number();
            match self.next_use(page, position) {
                // never needed again, can't do better than that
                None => return Ok(page),
                Some(distance) => {
                    if victim.map_or(true, |(farthest, _)| distance > farthest) {
                        victim = Some((distance, page));
                    }
                }
            }
        }

        victim
            .map(|(_, page)| page)
            .ok_or(VMError::ReplacementExhausted)
    }
}

#[cfg(test)]
mod test {
    use super::OptimalReplacementModule;
    use crate::{demand_paging::DemandPagingEngine, ReferenceString, VMConfig};

    #[test]
    fn test_evicts_farthest_next_use() {
        let refs = ReferenceString::reads(&[1, 2, 3, 4, 1, 2, 3]);
        let mut engine =
            DemandPagingEngine::new(3, OptimalReplacementModule::new(&refs), VMConfig::default())
                .unwrap();

        // at the fault on 4, page 3 is needed last
        for reference in refs.prefix(4).iter() {
            engine.access(reference.page, reference.is_write).unwrap();
        }
        assert!(!engine.page_table().get(3).unwrap().is_valid());
    }

    #[test]
    fn test_unused_page_wins() {
        let refs = ReferenceString::reads(&[1, 2, 3, 4, 2, 3, 2]);
        let mut engine =
            DemandPagingEngine::new(3, OptimalReplacementModule::new(&refs), VMConfig::default())
                .unwrap();
        engine.run(&refs).unwrap();

        assert!(!engine.page_table().get(1).unwrap().is_valid());
        assert_eq!(engine.statistics().total_faults, 4);
    }
}
