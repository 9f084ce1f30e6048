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

use crate::error::{Result, VMError};

/// Fill state of one slab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlabState {
    Full,
    Partial,
    Empty,
}

/// Number of slabs of a cache in each state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlabStateCounts {
    pub full: usize,
    pub partial: usize,
    pub empty: usize,
}

/// Points to one object slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    pub cache: String,
    pub slab: usize,
    pub slot: usize,
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}:{}]", self.cache, self.slab, self.slot)
    }
}

#[derive(Debug, Clone)]
struct Slab {
    objects: Vec<Option<String>>,
    free_count: usize,
}

impl Slab {
    fn new(objects_per_slab: usize) -> Self {
        Self {
            objects: vec![None; objects_per_slab],
            free_count: objects_per_slab,
        }
    }

    fn state(&self) -> SlabState {
        if self.free_count == 0 {
            SlabState::Full
        } else if self.free_count == self.objects.len() {
            SlabState::Empty
        } else {
            SlabState::Partial
        }
    }

    /// Stores `data` in the lowest free slot
    fn store(&mut self, data: String) -> Option<usize> {
        let slot = self.objects.iter().position(Option::is_none)?;
        self.objects[slot] = Some(data);
        self.free_count -= 1;
        Some(slot)
    }
}

#[derive(Debug, Clone)]
struct SlabCache {
    object_size: usize,
    objects_per_slab: usize,
    slabs: Vec<Slab>,
}

impl SlabCache {
    /// Partial slabs first, then empty ones
    fn pick_slab(&self) -> Option<usize> {
        let with_state = |state: SlabState| {
            self.slabs
                .iter()
                .position(|slab| slab.state() == state)
        };
        with_state(SlabState::Partial).or_else(|| with_state(SlabState::Empty))
    }
}

/// Slab allocator: named caches of equally sized objects, each cache made of
/// fixed size slabs that are classified as full, partial or empty.
#[derive(Debug, Clone, Default)]
pub struct SlabAllocatorModule {
    caches: BTreeMap<String, SlabCache>,
}

impl SlabAllocatorModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache with one empty slab
    pub fn create_cache(
        &mut self,
        name: impl Into<String>,
        object_size: usize,
        objects_per_slab: usize,
    ) -> Result<()> {
        let name = name.into();
        if object_size == 0 || objects_per_slab == 0 {
            return Err(VMError::invalid_config(format!(
                "cache '{}' needs a positive object size and slab capacity",
                name
            )));
        }
        if self.caches.contains_key(&name) {
            return Err(VMError::invalid_config(format!(
                "cache '{}' already exists",
                name
            )));
        }

        debug!(
            "Created cache '{}' for objects of size {} ({} per slab)",
            name, object_size, objects_per_slab
        );
        self.caches.insert(
            name,
            SlabCache {
                object_size,
                objects_per_slab,
                slabs: vec![Slab::new(objects_per_slab)],
            },
        );
        Ok(())
    }

    /// Stores `data` in a free object slot of `cache`, growing the cache by one slab if needed
    pub fn allocate(&mut self, cache: &str, data: impl Into<String>) -> Result<ObjectHandle> {
        let entry = self
            .caches
            .get_mut(cache)
            .ok_or_else(|| VMError::UnknownCache(cache.to_string()))?;

        let slab = match entry.pick_slab() {
            Some(slab) => slab,
            None => {
                trace!("Cache '{}': no free slab, adding slab {}", cache, entry.slabs.len());
                entry.slabs.push(Slab::new(entry.objects_per_slab));
                entry.slabs.len() - 1
            }
        };

        let target = &mut entry.slabs[slab];
        let Some(slot) = target.store(data.into()) else {
            debug_assert!(false, "picked slab without a free slot");
            return Err(VMError::invalid_config(format!(
                "cache '{}' has no free slot in slab {}",
                cache, slab
            )));
        };

        trace!(
            "Cache '{}': allocated slot {} of slab {}, {}/{} free",
            cache,
            slot,
            slab,
            target.free_count,
            target.objects.len()
        );
        Ok(ObjectHandle {
            cache: cache.to_string(),
            slab,
            slot,
        })
    }

    /// Releases the object behind `handle`, returns its data
    pub fn free(&mut self, handle: &ObjectHandle) -> Result<String> {
        let invalid = || VMError::InvalidFree {
            address: handle.slot,
        };

        let slab = self
            .caches
            .get_mut(&handle.cache)
            .and_then(|cache| cache.slabs.get_mut(handle.slab))
            .ok_or_else(invalid)?;
        let data = slab
            .objects
            .get_mut(handle.slot)
            .and_then(Option::take)
            .ok_or_else(invalid)?;

        slab.free_count += 1;
        trace!(
            "Freed {}, {}/{} free",
            handle,
            slab.free_count,
            slab.objects.len()
        );
        Ok(data)
    }

    pub fn get(&self, handle: &ObjectHandle) -> Option<&str> {
        self.caches
            .get(&handle.cache)?
            .slabs
            .get(handle.slab)?
            .objects
            .get(handle.slot)?
            .as_deref()
    }

    pub fn object_size(&self, cache: &str) -> Option<usize> {
        self.caches.get(cache).map(|cache| cache.object_size)
    }

    /// State of every slab of `cache`, in creation order
    pub fn slabs(&self, cache: &str) -> Result<Vec<SlabState>> {
        let cache = self
            .caches
            .get(cache)
            .ok_or_else(|| VMError::UnknownCache(cache.to_string()))?;
        Ok(cache.slabs.iter().map(Slab::state).collect())
    }

    pub fn slab_states(&self, cache: &str) -> Result<SlabStateCounts> {
        let mut counts = SlabStateCounts::default();
        for state in self.slabs(cache)? {
            match state {
                SlabState::Full => counts.full += 1,
                SlabState::Partial => counts.partial += 1,
                SlabState::Empty => counts.empty += 1,
            }
        }
        Ok(counts)
    }

    pub fn caches(&self) -> impl Iterator<Item = &str> + '_ {
        self.caches.keys().map(String::as_str)
    }
}
