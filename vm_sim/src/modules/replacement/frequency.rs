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

use core::cmp::Reverse;

use super::{ReplacementModule, ReplacementPolicy, VictimContext};
use crate::{error::Result, page_table::PageNumber};

// Both counting policies read the access counts kept in the page table.
// Counts are not reset on eviction, a page keeps its history when it returns.

/// Least frequently used: smallest access count, ties go to the lowest page number
#[derive(Debug, Default)]
pub struct LfuReplacementModule;

impl LfuReplacementModule {
    pub fn new() -> Self {
        Self
    }
}

impl ReplacementModule for LfuReplacementModule {
    fn policy(&self) -> ReplacementPolicy {
        ReplacementPolicy::Lfu
    }

    fn select_victim(&mut self, ctx: VictimContext<'_>) -> Result<PageNumber> {
        ctx.min_resident_by(|entry| entry.access_count())
    }
}

/// Most frequently used: largest access count, ties go to the lowest page number
#[derive(Debug, Default)]
pub struct MfuReplacementModule;

impl MfuReplacementModule {
    pub fn new() -> Self {
        Self
    }
}

impl ReplacementModule for MfuReplacementModule {
    fn policy(&self) -> ReplacementPolicy {
        ReplacementPolicy::Mfu
    }

    fn select_victim(&mut self, ctx: VictimContext<'_>) -> Result<PageNumber> {
        ctx.min_resident_by(|entry| Reverse(entry.access_count()))
    }
}
