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

use core::fmt;
use std::collections::BTreeMap;

use log::{debug, trace};

use crate::{
    error::{Result, VMError},
    page_table::PageNumber,
};

/// Process identifier
pub type Pid = u32;

/// Opaque handle of a physical page that may be shared between processes.
/// Ids are handed out once and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SharedPageId(u64);

impl SharedPageId {
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SharedPageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedPage {
    data: String,
    ref_count: usize,
}

impl SharedPage {
    #[inline]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Number of page table entries currently pointing at this page
    #[inline]
    pub fn ref_count(&self) -> usize {
        self.ref_count
    }
}

/// What a write ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The page was shared, the writer got its own copy
    Copied { from: SharedPageId, to: SharedPageId },

    /// The writer was the only owner
    InPlace(SharedPageId),

    /// The writer had no page mapped there yet
    Created(SharedPageId),
}

impl WriteOutcome {
    /// Page the writer points to after the write
    pub fn target(&self) -> SharedPageId {
        match self {
            WriteOutcome::Copied { to, .. } => *to,
            WriteOutcome::InPlace(id) => *id,
            WriteOutcome::Created(id) => *id,
        }
    }
}

type ProcessPageTable = BTreeMap<PageNumber, SharedPageId>;

/// Copy-on-write page sharing between process address spaces.
///
/// `fork` only shares, data is copied lazily on the first write to a
/// page that has more than one owner. A shared page's reference count always
/// equals the number of entries pointing to it and pages are dropped as soon
/// as it reaches zero.
#[derive(Debug, Default)]
pub struct CopyOnWriteManager {
    shared_pages: BTreeMap<SharedPageId, SharedPage>,
    processes: BTreeMap<Pid, ProcessPageTable>,
    next_id: u64,
}

impl CopyOnWriteManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn create_page(&mut self, data: String) -> SharedPageId {
        let id = SharedPageId(self.next_id);
        self.next_id += 1;
        self.shared_pages.insert(id, SharedPage { data, ref_count: 1 });
        id
    }

    /// Drops one reference, returns `true` if the page was reclaimed
    fn release(&mut self, id: SharedPageId) -> bool {
        let Some(page) = self.shared_pages.get_mut(&id) else {
            debug_assert!(false, "dangling reference to shared page {}", id);
            return false;
        };

        page.ref_count -= 1;
        if page.ref_count == 0 {
            self.shared_pages.remove(&id);
            trace!("Shared page {} is no longer referenced, reclaimed", id);
            return true;
        }
        false
    }

    /// Maps a fresh private page holding `data` into `pid`'s address space.
    /// A page previously mapped at that position is released.
    pub fn map(&mut self, pid: Pid, page: PageNumber, data: impl Into<String>) -> SharedPageId {
        let id = self.create_page(data.into());
        let previous = self.processes.entry(pid).or_default().insert(page, id);
        if let Some(previous) = previous {
            self.release(previous);
        }
        id
    }

    /// Gives `child` a reference to every page of `parent`.
    ///
    /// Nothing is copied. If `child` already existed its old address space is
    /// released first. An unknown parent yields an empty child.
    /// Returns the number of pages now shared with the child.
    pub fn fork(&mut self, parent: Pid, child: Pid) -> Result<usize> {
        if parent == child {
            return Err(VMError::invalid_config(format!(
                "process {} cannot fork into itself",
                parent
            )));
        }

        self.exit(child);

        let table = self.processes.get(&parent).cloned().unwrap_or_default();
        for id in table.values() {
            match self.shared_pages.get_mut(id) {
                Some(page) => page.ref_count += 1,
                None => debug_assert!(false, "dangling reference to shared page {}", id),
            }
        }

        let shared = table.len();
        self.processes.insert(child, table);

        debug!("Fork: process {} shares {} page(s) with parent {}", child, shared, parent);
        Ok(shared)
    }

    /// Writes `data` to `page` of `pid`, copying the target first if it is shared
    pub fn write(&mut self, pid: Pid, page: PageNumber, data: impl Into<String>) -> WriteOutcome {
        let data = data.into();
        let current = self
            .processes
            .get(&pid)
            .and_then(|table| table.get(&page))
            .copied();

        let Some(id) = current else {
            let id = self.map(pid, page, data);
            debug!("Process {} page {}: created page {}", pid, page, id);
            return WriteOutcome::Created(id);
        };

        let Some(target) = self.shared_pages.get_mut(&id) else {
            debug_assert!(false, "dangling reference to shared page {}", id);
            let id = self.map(pid, page, data);
            return WriteOutcome::Created(id);
        };

        if target.ref_count > 1 {
            // copy on write
            target.ref_count -= 1;
            let copied = format!("{} -> {}", target.data, data);
            let new_id = self.create_page(copied);
            self.processes.entry(pid).or_default().insert(page, new_id);

            debug!(
                "Process {} page {}: page {} is shared, copied to {}",
                pid, page, id, new_id
            );
            WriteOutcome::Copied {
                from: id,
                to: new_id,
            }
        } else {
            target.data = data;
            debug!("Process {} page {}: direct write to page {}", pid, page, id);
            WriteOutcome::InPlace(id)
        }
    }

    /// Releases the whole address space of `pid`, returns how many pages were reclaimed
    pub fn exit(&mut self, pid: Pid) -> usize {
        let Some(table) = self.processes.remove(&pid) else {
            return 0;
        };

        table
            .into_values()
            .filter(|id| self.release(*id))
            .count()
    }

    pub fn read(&self, pid: Pid, page: PageNumber) -> Option<&str> {
        let id = self.processes.get(&pid)?.get(&page)?;
        self.shared_pages.get(id).map(SharedPage::data)
    }

    /// Page `pid` currently points to at `page`
    pub fn target(&self, pid: Pid, page: PageNumber) -> Option<SharedPageId> {
        self.processes.get(&pid)?.get(&page).copied()
    }

    pub fn is_shared(&self, pid: Pid, page: PageNumber) -> bool {
        self.target(pid, page)
            .and_then(|id| self.shared_pages.get(&id))
            .is_some_and(|shared| shared.ref_count > 1)
    }

    #[inline]
    pub fn shared_page(&self, id: SharedPageId) -> Option<&SharedPage> {
        self.shared_pages.get(&id)
    }

    /// `None` once the page was reclaimed
    pub fn ref_count(&self, id: SharedPageId) -> Option<usize> {
        self.shared_pages.get(&id).map(SharedPage::ref_count)
    }

    pub fn shared_pages(&self) -> impl Iterator<Item = (SharedPageId, &SharedPage)> + '_ {
        self.shared_pages.iter().map(|(id, page)| (*id, page))
    }

    pub fn process_pages(
        &self,
        pid: Pid,
    ) -> Option<impl Iterator<Item = (PageNumber, SharedPageId)> + '_> {
        self.processes
            .get(&pid)
            .map(|table| table.iter().map(|(page, id)| (*page, *id)))
    }

    pub fn processes(&self) -> impl Iterator<Item = Pid> + '_ {
        self.processes.keys().copied()
    }

    /// Number of page table entries that point to `id`
    pub fn fan_in(&self, id: SharedPageId) -> usize {
        self.processes
            .values()
            .flat_map(|table| table.values())
            .filter(|target| **target == id)
            .count()
    }
}
