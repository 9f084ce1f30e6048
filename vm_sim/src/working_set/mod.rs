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

mod workload;

pub use workload::{LocalityWorkload, LOCALITY_GROUPS, LOCALITY_GROUP_SIZE, LOCALITY_SHIFT_PROBABILITY};

use core::fmt;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::{trace, warn};

use crate::{
    cow::Pid,
    error::{Result, VMError},
    page_table::PageNumber,
    VMConfig,
};

/// Sliding window over the last Δ references of one process
#[derive(Debug, Clone)]
pub struct ProcessWorkingSet {
    window: VecDeque<PageNumber>,
    working_set: BTreeSet<PageNumber>,
    accesses: u64,
    faults: u64,
}

impl ProcessWorkingSet {
    fn new() -> Self {
        Self {
            window: VecDeque::new(),
            working_set: BTreeSet::new(),
            accesses: 0,
            faults: 0,
        }
    }

    /// Distinct pages inside the window
    #[inline]
    pub fn working_set(&self) -> &BTreeSet<PageNumber> {
        &self.working_set
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.working_set.len()
    }

    /// References from oldest to newest
    pub fn window(&self) -> impl Iterator<Item = PageNumber> + '_ {
        self.window.iter().copied()
    }

    #[inline]
    pub fn accesses(&self) -> u64 {
        self.accesses
    }

    /// References to pages that were not part of the working set at that time
    #[inline]
    pub fn faults(&self) -> u64 {
        self.faults
    }
}

/// Result of comparing the total working set demand with the frame supply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ThrashingReport {
    pub total_demand: usize,
    pub total_frames: usize,
    pub thrashing: bool,
}

impl fmt::Display for ThrashingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total working set size = {}, available frames = {}{}",
            self.total_demand,
            self.total_frames,
            if self.thrashing { " (THRASHING)" } else { "" }
        )
    }
}

/// Working set model over several processes.
///
/// The tracker only reports, it never suspends or evicts anything itself.
#[derive(Debug, Clone)]
pub struct WorkingSetTracker {
    total_frames: usize,
    delta: usize,
    processes: BTreeMap<Pid, ProcessWorkingSet>,
    time: u64,
}

impl WorkingSetTracker {
    pub fn new(total_frames: usize, delta: usize) -> Result<Self> {
        if total_frames == 0 {
            return Err(VMError::invalid_config("frame count must be positive"));
        }
        if delta == 0 {
            return Err(VMError::invalid_config(
                "working set window must hold at least one reference",
            ));
        }

        Ok(Self {
            total_frames,
            delta,
            processes: BTreeMap::new(),
            time: 0,
        })
    }

    /// Uses `working_set_window` of `config` as Δ
    pub fn from_config(total_frames: usize, config: &VMConfig) -> Result<Self> {
        config.validate()?;
        Self::new(total_frames, config.working_set_window)
    }

    #[inline]
    pub fn delta(&self) -> usize {
        self.delta
    }

    #[inline]
    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// Number of references recorded so far, across all processes
    #[inline]
    pub fn time(&self) -> u64 {
        self.time
    }

    /// Starts tracking `pid` with an empty window. Does nothing if it is already tracked.
    pub fn add_process(&mut self, pid: Pid) {
        self.processes.entry(pid).or_insert_with(ProcessWorkingSet::new);
    }

    /// Records that `pid` referenced `page`. Unknown processes are added on the fly.
    /// Returns the new working set size of the process.
    pub fn record_access(&mut self, pid: Pid, page: PageNumber) -> usize {
        self.time += 1;
        let delta = self.delta;
        let process = self.processes.entry(pid).or_insert_with(ProcessWorkingSet::new);

        process.accesses += 1;
        if !process.working_set.contains(&page) {
            process.faults += 1;
        }

        if process.window.len() == delta {
            process.window.pop_front();
        }
        process.window.push_back(page);
        process.working_set = process.window.iter().copied().collect();

        trace!(
            "Time {}: process {} accessed page {}, WS size = {}",
            self.time,
            pid,
            page,
            process.working_set.len()
        );
        process.working_set.len()
    }

    #[inline]
    pub fn process(&self, pid: Pid) -> Option<&ProcessWorkingSet> {
        self.processes.get(&pid)
    }

    pub fn working_set_size(&self, pid: Pid) -> Option<usize> {
        self.process(pid).map(ProcessWorkingSet::size)
    }

    pub fn processes(&self) -> impl Iterator<Item = (Pid, &ProcessWorkingSet)> + '_ {
        self.processes.iter().map(|(pid, process)| (*pid, process))
    }

    /// Sum of all working set sizes
    pub fn total_demand(&self) -> usize {
        self.processes.values().map(ProcessWorkingSet::size).sum()
    }

    /// Thrashing means the working sets together need more frames than there are
    pub fn check_thrashing(&self) -> ThrashingReport {
        let total_demand = self.total_demand();
        let report = ThrashingReport {
            total_demand,
            total_frames: self.total_frames,
            thrashing: total_demand > self.total_frames,
        };

        if report.thrashing {
            warn!("Time {}: thrashing detected, {}", self.time, report);
        }
        report
    }

    /// Stops tracking `pid`, e.g. because the caller suspended it to relieve memory pressure
    pub fn suspend(&mut self, pid: Pid) -> Option<ProcessWorkingSet> {
        self.processes.remove(&pid)
    }
}
