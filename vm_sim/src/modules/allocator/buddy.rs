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

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};

use crate::error::{Result, VMError};

/// Order of the smallest power of two that is `>= size`
fn order_of(size: usize) -> usize {
    size.next_power_of_two().trailing_zeros() as usize
}

/// Binary buddy allocator over the address range `[0, total_memory)`.
///
/// Blocks of order `k` span `1 << k` units. Two free blocks of the same order
/// whose addresses only differ in bit `k` are merged on free.
#[derive(Debug, Clone)]
pub struct BuddyAllocatorModule {
    total_memory: usize,
    max_order: usize,

    /// `free_list[k]` holds the start addresses of all free blocks of order `k`
    free_list: Vec<BTreeSet<usize>>,

    /// start address -> order
    allocated: BTreeMap<usize, usize>,
}

impl BuddyAllocatorModule {
    /// `total_memory` is rounded up to the next power of two
    pub fn new(total_memory: usize) -> Result<Self> {
        if total_memory == 0 {
            return Err(VMError::invalid_config(
                "buddy allocator needs a positive memory size",
            ));
        }
        let total_memory = total_memory.checked_next_power_of_two().ok_or_else(|| {
            VMError::invalid_config(format!("memory size {} is too large", total_memory))
        })?;
        let max_order = order_of(total_memory);

        let mut free_list = vec![BTreeSet::new(); max_order + 1];
        free_list[max_order].insert(0);

        debug!("Initialized buddy allocator with {} units", total_memory);
        Ok(Self {
            total_memory,
            max_order,
            free_list,
            allocated: BTreeMap::new(),
        })
    }

    /// Allocates a block of at least `size` units and returns its start address.
    ///
    /// Either the whole split succeeds or nothing changes.
    pub fn allocate(&mut self, size: usize) -> Result<usize> {
        if size == 0 {
            return Err(VMError::invalid_config("cannot allocate 0 units"));
        }

        let order = size
            .checked_next_power_of_two()
            .map(|size| size.trailing_zeros() as usize)
            .unwrap_or(usize::BITS as usize);
        let out_of_memory = VMError::OutOfMemory {
            requested: size,
            order,
        };
        if order > self.max_order {
            return Err(out_of_memory);
        }

        // find the first non-empty order
        let Some(current) = (order..=self.max_order).find(|i| !self.free_list[*i].is_empty())
        else {
            return Err(out_of_memory);
        };
        let Some(block) = self.free_list[current].pop_first() else {
            return Err(out_of_memory);
        };

        trace!("Allocate: Have to split {} bucket(s)", current - order);
        for j in (order..current).rev() {
            // keep the lower half, the upper one becomes free
            self.free_list[j].insert(block ^ (1 << j));
        }

        self.allocated.insert(block, order);
        debug!("Allocated {} units at address {:#010b}", 1usize << order, block);
        Ok(block)
    }

    /// Frees the block starting at `address` and merges it with free buddies
    pub fn free(&mut self, address: usize) -> Result<()> {
        let Some(order) = self.allocated.remove(&address) else {
            return Err(VMError::InvalidFree { address });
        };
        debug!("Freeing {} units at address {:#010b}", 1usize << order, address);

        let mut current_address = address;
        let mut current_order = order;
        while current_order < self.max_order {
            let buddy = current_address ^ (1 << current_order);
            if !self.free_list[current_order].remove(&buddy) {
                break;
            }

            trace!(
                "Free: merged {:#010b} with buddy {:#010b} (order {})",
                current_address,
                buddy,
                current_order
            );
            current_address = current_address.min(buddy);
            current_order += 1;
        }

        self.free_list[current_order].insert(current_address);
        Ok(())
    }

    #[inline]
    pub fn total_memory(&self) -> usize {
        self.total_memory
    }

    #[inline]
    pub fn max_order(&self) -> usize {
        self.max_order
    }

    /// Free block addresses of the given order, lowest first
    pub fn free_blocks(&self, order: usize) -> impl Iterator<Item = usize> + '_ {
        self.free_list
            .get(order)
            .into_iter()
            .flat_map(|list| list.iter().copied())
    }

    /// `(address, order)` of every free block, ordered by order then address
    pub fn free_list(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.free_list
            .iter()
            .enumerate()
            .flat_map(|(order, list)| list.iter().map(move |address| (*address, order)))
    }

    /// `(address, order)` of every allocated block, ordered by address
    pub fn allocated_blocks(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.allocated.iter().map(|(address, order)| (*address, *order))
    }

    pub fn free_memory(&self) -> usize {
        self.free_list().map(|(_, order)| 1usize << order).sum()
    }
}
