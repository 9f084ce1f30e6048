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

mod page_status;

use core::fmt;
use std::collections::BTreeMap;

use page_status::PageStatus;

use crate::frame_pool::FrameId;

/// Virtual page number
pub type PageNumber = u64;

/// Residency state of one virtual page.
///
/// An entry is valid exactly when a frame is assigned to it.
/// Entries are never removed from their table, so access counts
/// and timestamps survive evictions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTableEntry {
    page_number: PageNumber,
    frame: Option<FrameId>,
    status: PageStatus,
    last_access: u64,
    access_count: u64,
}

impl PageTableEntry {
    pub(crate) fn new(page_number: PageNumber) -> Self {
        Self {
            page_number,
            frame: None,
            status: PageStatus::default(),
            last_access: 0,
            access_count: 0,
        }
    }

    #[inline]
    pub fn page_number(&self) -> PageNumber {
        self.page_number
    }

    #[inline]
    pub fn frame(&self) -> Option<FrameId> {
        self.frame
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.frame.is_some()
    }

    #[inline]
    pub fn is_referenced(&self) -> bool {
        self.status.is_referenced()
    }

    #[inline]
    pub fn is_modified(&self) -> bool {
        self.status.is_modified()
    }

    #[inline]
    pub fn last_access(&self) -> u64 {
        self.last_access
    }

    #[inline]
    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    #[inline]
    pub(crate) fn set_referenced(&mut self, val: bool) {
        self.status.set_referenced(val);
    }

    #[inline]
    pub(crate) fn set_modified(&mut self, val: bool) {
        self.status.set_modified(val);
    }

    /// Bookkeeping shared by hits and faults
    pub(crate) fn touch(&mut self, now: u64) {
        self.last_access = now;
        self.access_count += 1;
    }

    pub(crate) fn map(&mut self, frame: FrameId) {
        debug_assert!(self.frame.is_none(), "page {} is already resident", self.page_number);
        self.frame = Some(frame);
    }

    /// Drops the frame assignment. Referenced and modified bits are cleared
    /// as the page content now lives in backing store again.
    pub(crate) fn unmap(&mut self) -> Option<FrameId> {
        self.status.clear();
        self.frame.take()
    }
}

impl fmt::Display for PageTableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let valid = if self.is_valid() { "v" } else { "i" };
        let referenced = if self.is_referenced() { "R" } else { "-" };
        let modified = if self.is_modified() { "M" } else { "-" };
        match self.frame {
            Some(frame) => write!(
                f,
                "Page {}: [{}] Frame: {} {}{}",
                self.page_number, valid, frame, referenced, modified
            ),
            None => write!(
                f,
                "Page {}: [{}] Frame: - {}{}",
                self.page_number, valid, referenced, modified
            ),
        }
    }
}

/// Snapshot of one entry as exposed in simulation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PageTableDumpEntry {
    pub page_number: PageNumber,
    pub valid: bool,
    pub frame: Option<FrameId>,
    pub referenced: bool,
    pub modified: bool,
}

impl From<&PageTableEntry> for PageTableDumpEntry {
    fn from(entry: &PageTableEntry) -> Self {
        Self {
            page_number: entry.page_number(),
            valid: entry.is_valid(),
            frame: entry.frame(),
            referenced: entry.is_referenced(),
            modified: entry.is_modified(),
        }
    }
}

/// Page table of a single process, ordered by page number
#[derive(Debug, Clone, Default)]
pub struct PageTable {
    entries: BTreeMap<PageNumber, PageTableEntry>,
}

impl PageTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get_or_create(&mut self, page: PageNumber) -> &mut PageTableEntry {
        self.entries
            .entry(page)
            .or_insert_with(|| PageTableEntry::new(page))
    }

    #[inline]
    pub fn get(&self, page: PageNumber) -> Option<&PageTableEntry> {
        self.entries.get(&page)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, page: PageNumber) -> Option<&mut PageTableEntry> {
        self.entries.get_mut(&page)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageTableEntry> + '_ {
        self.entries.values()
    }

    /// Resident entries in ascending page number order
    pub fn resident(&self) -> impl Iterator<Item = &PageTableEntry> + '_ {
        self.entries.values().filter(|entry| entry.is_valid())
    }

    pub fn dump(&self) -> Vec<PageTableDumpEntry> {
        self.iter().map(PageTableDumpEntry::from).collect()
    }
}
