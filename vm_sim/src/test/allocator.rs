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

use rand::{rngs::SmallRng, Rng, SeedableRng};

use super::SEED;
use crate::{
    modules::allocator::{test::check_tiling, BuddyAllocatorModule},
    VMError,
};

#[test]
fn test_random_allocate_free_keeps_tiling() {
    let mut rand = SmallRng::seed_from_u64(SEED);
    let mut allocator = BuddyAllocatorModule::new(1024).unwrap();
    let mut allocated: Vec<(usize, usize)> = Vec::new();

    for _ in 0..1000 {
        if allocated.is_empty() || rand.gen_bool(0.55) {
            let size = rand.gen_range(1..=200);
            let free_before = allocator.free_memory();

            match allocator.allocate(size) {
                Ok(address) => {
                    assert!(
                        allocated
                            .iter()
                            .all(|(other, other_size)| address + size <= *other
                                || other + other_size <= address),
                        "block at {} overlaps",
                        address
                    );
                    assert_eq!(
                        free_before - allocator.free_memory(),
                        size.next_power_of_two()
                    );
                    allocated.push((address, size));
                }
                Err(VMError::OutOfMemory { requested, .. }) => {
                    assert_eq!(requested, size);
                    assert_eq!(allocator.free_memory(), free_before);
                }
                Err(err) => panic!("unexpected error: {}", err),
            }
        } else {
            let (address, _) = allocated.swap_remove(rand.gen_range(0..allocated.len()));
            allocator.free(address).unwrap();
        }

        check_tiling(&allocator);
    }

    for (address, _) in allocated {
        allocator.free(address).unwrap();
    }
    assert_eq!(allocator.free_list().collect::<Vec<_>>(), vec![(0, 10)]);
}
