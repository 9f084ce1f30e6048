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

//! Helpers to compare replacement policies and reason about paging cost.

use core::ops::RangeInclusive;

use log::debug;

use crate::{
    demand_paging::{simulate, SimulationReport},
    error::{Result, VMError},
    modules::replacement::ReplacementPolicy,
    reference_string::ReferenceString,
    VMConfig,
};

/// `EAT = (1 - p) * memory_access_time + p * page_fault_service_time`
pub fn effective_access_time(fault_rate: f64, config: &VMConfig) -> f64 {
    (1.0 - fault_rate) * config.memory_access_time_ns as f64
        + fault_rate * config.page_fault_service_time_ns as f64
}

/// How many times slower memory gets at the given fault rate
pub fn slowdown(fault_rate: f64, config: &VMConfig) -> f64 {
    effective_access_time(fault_rate, config) / config.memory_access_time_ns as f64
}

/// Largest fault rate that keeps the effective access time below
/// `max_slowdown` times the plain memory access time.
///
/// A `max_slowdown` of `1.1` corresponds to a 10% degradation.
pub fn max_fault_rate_for_slowdown(max_slowdown: f64, config: &VMConfig) -> Result<f64> {
    if max_slowdown.is_nan() || max_slowdown < 1.0 {
        return Err(VMError::invalid_config(format!(
            "slowdown budget {} has to be at least 1",
            max_slowdown
        )));
    }

    let access = config.memory_access_time_ns as f64;
    let fault = config.page_fault_service_time_ns as f64;
    if fault <= access {
        return Err(VMError::invalid_config(
            "page fault service time has to exceed the memory access time",
        ));
    }

    Ok((access * max_slowdown - access) / (fault - access))
}

/// Fault count of `policy` for every frame count in `frames`
pub fn fault_curve(
    policy: ReplacementPolicy,
    reference_string: &ReferenceString,
    frames: RangeInclusive<usize>,
    config: VMConfig,
) -> Result<Vec<(usize, u64)>> {
    frames
        .map(|frame_count| {
            let report = simulate(policy, frame_count, reference_string, config)?;
            debug!(
                "{} with {} frames: {} faults",
                policy, frame_count, report.statistics.total_faults
            );
            Ok((frame_count, report.statistics.total_faults))
        })
        .collect()
}

/// Frame counts at which adding a frame *increased* the number of faults
pub fn belady_anomalies(curve: &[(usize, u64)]) -> Vec<usize> {
    curve
        .windows(2)
        .filter(|pair| pair[1].1 > pair[0].1)
        .map(|pair| pair[1].0)
        .collect()
}

/// Runs the same reference string through several policies
pub fn compare_policies(
    policies: &[ReplacementPolicy],
    total_frames: usize,
    reference_string: &ReferenceString,
    config: VMConfig,
) -> Result<Vec<SimulationReport>> {
    policies
        .iter()
        .map(|policy| simulate(*policy, total_frames, reference_string, config))
        .collect()
}
