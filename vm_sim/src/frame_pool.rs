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

use std::collections::BTreeSet;

use log::trace;

use crate::{
    error::{Result, VMError},
    page_table::PageNumber,
};

/// Index of a physical frame inside `[0, total_frames)`
pub type FrameId = usize;

/// Outcome of asking the pool for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAllocation {
    Allocated(FrameId),

    /// Every frame is owned by a resident page
    Full,
}

/// Fixed set of physical frames.
///
/// A frame is either in the free set or owned by exactly one page.
/// The lowest free index is always handed out first.
#[derive(Debug, Clone)]
pub struct FramePool {
    owners: Vec<Option<PageNumber>>,
    free: BTreeSet<FrameId>,
}

impl FramePool {
    pub fn new(total_frames: usize) -> Result<Self> {
        if total_frames == 0 {
            return Err(VMError::invalid_config("frame count must be positive"));
        }

        Ok(Self {
            owners: vec![None; total_frames],
            free: (0..total_frames).collect(),
        })
    }

    #[inline]
    pub fn total_frames(&self) -> usize {
        self.owners.len()
    }

    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    #[inline]
    pub fn resident_count(&self) -> usize {
        self.total_frames() - self.free_count()
    }

    /// Hands the lowest free frame over to `page`
    pub fn allocate(&mut self, page: PageNumber) -> FrameAllocation {
        match self.free.pop_first() {
            Some(frame) => {
                debug_assert!(self.owners[frame].is_none());
                self.owners[frame] = Some(page);
                trace!("Frame {} now owned by page {}", frame, page);
                FrameAllocation::Allocated(frame)
            }
            None => FrameAllocation::Full,
        }
    }

    /// Returns `frame` to the free set and reports its previous owner
    pub fn free(&mut self, frame: FrameId) -> Option<PageNumber> {
        let owner = self.owners.get_mut(frame)?.take();
        if owner.is_some() {
            self.free.insert(frame);
        }
        owner
    }

    #[inline]
    pub fn owner(&self, frame: FrameId) -> Option<PageNumber> {
        self.owners.get(frame).copied().flatten()
    }

    /// Iterates `(frame, page)` for every owned frame in frame order
    pub fn resident(&self) -> impl Iterator<Item = (FrameId, PageNumber)> + '_ {
        self.owners
            .iter()
            .enumerate()
            .filter_map(|(frame, owner)| owner.map(|page| (frame, page)))
    }
}
