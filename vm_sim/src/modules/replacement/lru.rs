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
use crate::{error::Result, page_table::PageNumber};

/// Evicts the resident page with the oldest access timestamp.
///
/// Timestamps live in the page table, so this module keeps no state.
#[derive(Debug, Default)]
pub struct LruReplacementModule;

impl LruReplacementModule {
    pub fn new() -> Self {
        Self
    }
}

impl ReplacementModule for LruReplacementModule {
    fn policy(&self) -> ReplacementPolicy {
        ReplacementPolicy::Lru
    }

    fn select_victim(&mut self, ctx: VictimContext<'_>) -> Result<PageNumber> {
        ctx.min_resident_by(|entry| entry.last_access())
    }
}
