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

use super::{belady_reference_string, classic_reference_string, init_logger, SEED};
use crate::{
    analysis::{belady_anomalies, compare_policies, fault_curve},
    modules::replacement::{ClockReplacementModule, ReplacementPolicy},
    simulate, DemandPagingEngine, PageReference, ReferenceString, VMConfig,
};

fn faults(policy: ReplacementPolicy, frames: usize, refs: &ReferenceString) -> u64 {
    simulate(policy, frames, refs, VMConfig::default())
        .unwrap()
        .statistics
        .total_faults
}

fn random_reference_string(rand: &mut SmallRng, len: usize, pages: u64) -> ReferenceString {
    (0..len)
        .map(|_| PageReference {
            page: rand.gen_range(0..pages),
            is_write: rand.gen_bool(0.3),
        })
        .collect()
}

#[test]
fn test_classic_fault_counts() {
    init_logger();
    let refs = classic_reference_string();

    let expected = [
        (ReplacementPolicy::Fifo, 15),
        (ReplacementPolicy::Lru, 12),
        (ReplacementPolicy::Optimal, 9),
        (ReplacementPolicy::Clock, 14),
        (ReplacementPolicy::Lfu, 14),
        (ReplacementPolicy::Mfu, 21),
    ];
    let reports = compare_policies(&ReplacementPolicy::ALL, 3, &refs, VMConfig::default()).unwrap();
    for ((policy, faults), report) in expected.iter().zip(reports.iter()) {
        assert_eq!(report.policy, *policy);
        assert_eq!(report.statistics.total_faults, *faults, "{}", policy);
        assert_eq!(report.statistics.total_accesses, 22);
        assert_eq!(report.page_table.iter().filter(|entry| entry.valid).count(), 3);
    }

    assert_eq!(faults(ReplacementPolicy::Fifo, 4, &refs), 10);
    assert_eq!(faults(ReplacementPolicy::Lru, 4, &refs), 8);
    assert_eq!(faults(ReplacementPolicy::Optimal, 4, &refs), 8);
}

#[test]
fn test_belady_anomaly() {
    init_logger();
    let refs = belady_reference_string();

    // more memory, more faults
    assert_eq!(faults(ReplacementPolicy::Fifo, 3, &refs), 9);
    assert_eq!(faults(ReplacementPolicy::Fifo, 4, &refs), 10);

    let curve = fault_curve(ReplacementPolicy::Fifo, &refs, 1..=7, VMConfig::default()).unwrap();
    assert_eq!(belady_anomalies(&curve), vec![4]);

    // LRU is a stack algorithm
    let curve = fault_curve(ReplacementPolicy::Lru, &refs, 1..=7, VMConfig::default()).unwrap();
    assert!(belady_anomalies(&curve).is_empty());
}

#[test]
fn test_fifo_frame_sweep() {
    let curve = fault_curve(
        ReplacementPolicy::Fifo,
        &classic_reference_string(),
        1..=7,
        VMConfig::default(),
    )
    .unwrap();
    let faults: Vec<u64> = curve.iter().map(|(_, faults)| *faults).collect();
    assert_eq!(faults, vec![22, 15, 15, 10, 9, 6, 6]);
    assert!(belady_anomalies(&curve).is_empty());
}

#[test]
fn test_optimal_is_lower_bound() {
    let mut rand = SmallRng::seed_from_u64(SEED);

    for _ in 0..30 {
        let refs = random_reference_string(&mut rand, 120, 12);
        for frames in 1..=8 {
            let optimal = faults(ReplacementPolicy::Optimal, frames, &refs);
            for policy in ReplacementPolicy::ALL {
                let faults = faults(policy, frames, &refs);
                assert!(
                    optimal <= faults,
                    "{} frames: optimal {} > {} {}",
                    frames,
                    optimal,
                    policy,
                    faults
                );
            }
        }
    }
}

#[test]
fn test_lru_never_gets_worse_with_more_frames() {
    let mut rand = SmallRng::seed_from_u64(SEED + 1);

    for _ in 0..30 {
        let refs = random_reference_string(&mut rand, 100, 10);
        let curve = fault_curve(ReplacementPolicy::Lru, &refs, 1..=10, VMConfig::default()).unwrap();
        assert!(belady_anomalies(&curve).is_empty(), "{:?}", curve);
        // every page fits: only cold misses are left
        let distinct = refs.pages().collect::<std::collections::BTreeSet<_>>().len() as u64;
        assert_eq!(curve.last().unwrap().1, distinct);
    }
}

#[test]
fn test_frames_and_page_table_agree() {
    let mut rand = SmallRng::seed_from_u64(SEED + 2);
    let refs = random_reference_string(&mut rand, 500, 20);

    let mut engine =
        DemandPagingEngine::new(5, ClockReplacementModule::new(), VMConfig::default()).unwrap();
    for reference in &refs {
        let outcome = engine.access(reference.page, reference.is_write).unwrap();

        let entry = engine.page_table().get(reference.page).unwrap();
        assert_eq!(entry.frame(), Some(outcome.frame()));
        assert!(entry.is_referenced());
        if reference.is_write {
            assert!(entry.is_modified());
        }

        assert!(engine.frames().resident_count() <= 5);
        assert_eq!(
            engine.page_table().resident().count(),
            engine.frames().resident_count()
        );
        for (frame, page) in engine.frames().resident() {
            assert_eq!(engine.page_table().get(page).unwrap().frame(), Some(frame));
        }
    }

    let statistics = engine.statistics();
    assert_eq!(statistics.total_accesses, 500);
    assert!(statistics.write_backs <= statistics.total_faults);
    assert_eq!(
        statistics.hits() + statistics.total_faults,
        statistics.total_accesses
    );
}

#[test]
fn test_write_back_counted_once_per_dirty_eviction() {
    let refs: ReferenceString = "1w,2,3w,4,5,1".parse().unwrap();
    let report = simulate(ReplacementPolicy::Fifo, 2, &refs, VMConfig::default()).unwrap();

    // 1 and 3 are dirty when they are evicted, 2 and 4 are clean
    assert_eq!(report.statistics.total_faults, 6);
    assert_eq!(report.statistics.write_backs, 2);
}
