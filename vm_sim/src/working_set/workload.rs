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

use super::{ThrashingReport, WorkingSetTracker};
use crate::{
    cow::Pid,
    error::{Result, VMError},
    page_table::PageNumber,
};

/// Pages per locality
pub const LOCALITY_GROUP_SIZE: usize = 10;

/// A process cycles through this many localities
pub const LOCALITY_GROUPS: usize = 3;

/// Chance to move on to the next locality after each reference
pub const LOCALITY_SHIFT_PROBABILITY: f64 = 0.1;

#[derive(Debug, Clone)]
struct LocalityState {
    pid: Pid,
    locality_size: usize,
    current: usize,
}

impl LocalityState {
    /// Page range of the current locality, the whole address space if it lies outside
    fn current_range(&self) -> (usize, usize) {
        let start = self.current * LOCALITY_GROUP_SIZE;
        let end = ((self.current + 1) * LOCALITY_GROUP_SIZE).min(self.locality_size);
        if start >= end {
            (0, self.locality_size)
        } else {
            (start, end)
        }
    }
}

/// Seeded generator of references with locality of reference.
///
/// Each process draws pages from its current locality and sometimes moves on to the next one,
/// which makes its working set grow and shrink the way real programs do.
#[derive(Debug, Clone)]
pub struct LocalityWorkload {
    rng: SmallRng,
    processes: Vec<LocalityState>,
}

impl LocalityWorkload {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            processes: Vec::new(),
        }
    }

    /// Adds a process that touches pages in `[0, locality_size)`
    pub fn add_process(&mut self, pid: Pid, locality_size: usize) -> Result<()> {
        if locality_size == 0 {
            return Err(VMError::invalid_config(format!(
                "process {} needs at least one page",
                pid
            )));
        }
        if self.processes.iter().any(|state| state.pid == pid) {
            return Err(VMError::invalid_config(format!(
                "process {} is already part of the workload",
                pid
            )));
        }

        self.processes.push(LocalityState {
            pid,
            locality_size,
            current: 0,
        });
        Ok(())
    }

    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.processes.iter().map(|state| state.pid)
    }

    /// Next reference of `pid`, `None` if the process is not part of the workload
    pub fn next_reference(&mut self, pid: Pid) -> Option<PageNumber> {
        let state = self.processes.iter_mut().find(|state| state.pid == pid)?;

        let (start, end) = state.current_range();
        let page = self.rng.gen_range(start..end) as PageNumber;

        if self.rng.gen_bool(LOCALITY_SHIFT_PROBABILITY) {
            state.current = (state.current + 1) % LOCALITY_GROUPS;
        }
        Some(page)
    }

    /// Lets every process issue one reference into `tracker`.
    /// Returns `(pid, page, working set size)` per process.
    pub fn step(&mut self, tracker: &mut WorkingSetTracker) -> Vec<(Pid, PageNumber, usize)> {
        let pids: Vec<Pid> = self.pids().collect();
        pids.into_iter()
            .filter_map(|pid| {
                let page = self.next_reference(pid)?;
                let size = tracker.record_access(pid, page);
                Some((pid, page, size))
            })
            .collect()
    }

    /// Steps until the tracker reports thrashing or `max_steps` is reached.
    /// Returns the (1 based) step and the report in the first case.
    pub fn run_until_thrashing(
        &mut self,
        tracker: &mut WorkingSetTracker,
        max_steps: usize,
    ) -> Option<(usize, ThrashingReport)> {
        for step in 1..=max_steps {
            self.step(tracker);

            let report = tracker.check_thrashing();
            if report.thrashing {
                return Some((step, report));
            }
        }
        None
    }
}
