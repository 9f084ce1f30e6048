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
use crate::{cow::test::check_ref_counts, CopyOnWriteManager, WriteOutcome};

#[test]
fn test_random_fork_write_exit() {
    let mut rand = SmallRng::seed_from_u64(SEED);
    let mut cow = CopyOnWriteManager::new();

    for page in 0..4 {
        cow.map(0, page, format!("init{}", page));
    }

    for step in 0..2000 {
        let pid = rand.gen_range(0..6);
        let page = rand.gen_range(0..6);

        match rand.gen_range(0..10) {
            0..=1 => {
                let child = rand.gen_range(0..6);
                if child == pid {
                    cow.fork(pid, child).expect_err("cannot fork into itself");
                } else {
                    let expected = cow.process_pages(pid).map_or(0, |pages| pages.count());
                    assert_eq!(cow.fork(pid, child).unwrap(), expected);
                }
            }
            2 => {
                cow.exit(pid);
                assert!(cow.process_pages(pid).is_none());
            }
            3 => {
                cow.map(pid, page, format!("map{}", step));
            }
            _ => {
                let was_shared = cow.is_shared(pid, page);
                let data = format!("write{}", step);
                let outcome = cow.write(pid, page, data.clone());

                match outcome {
                    WriteOutcome::Copied { from, to } => {
                        assert!(was_shared);
                        assert_ne!(from, to);
                        assert!(cow.read(pid, page).unwrap().ends_with(&data));
                    }
                    WriteOutcome::InPlace(_) | WriteOutcome::Created(_) => {
                        assert!(!was_shared);
                        assert_eq!(cow.read(pid, page), Some(data.as_str()));
                    }
                }
                assert!(!cow.is_shared(pid, page));
            }
        }

        check_ref_counts(&cow);
    }

    let pids: Vec<_> = cow.processes().collect();
    for pid in pids {
        cow.exit(pid);
        check_ref_counts(&cow);
    }
    assert_eq!(cow.shared_pages().count(), 0);
}
