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

use log::{debug, info};

use crate::{
    analysis::effective_access_time,
    error::{Result, VMError},
    frame_pool::{FrameAllocation, FrameId, FramePool},
    modules::replacement::{
        ClockReplacementModule, FifoReplacementModule, LfuReplacementModule,
        LruReplacementModule, MfuReplacementModule, OptimalReplacementModule, ReplacementModule,
        ReplacementPolicy, VictimContext,
    },
    page_table::{PageNumber, PageTable, PageTableDumpEntry},
    reference_string::ReferenceString,
    VMConfig,
};

/// A page that lost its frame while servicing a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub page: PageNumber,
    pub frame: FrameId,

    /// The page was dirty and had to be written back
    pub written_back: bool,
}

/// Result of a single memory reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    Hit {
        frame: FrameId,
    },
    Fault {
        frame: FrameId,

        /// `None` if a free frame was available
        evicted: Option<Eviction>,
    },
}

impl AccessOutcome {
    #[inline]
    pub fn is_fault(&self) -> bool {
        matches!(self, AccessOutcome::Fault { .. })
    }

    #[inline]
    pub fn frame(&self) -> FrameId {
        match self {
            AccessOutcome::Hit { frame } => *frame,
            AccessOutcome::Fault { frame, .. } => *frame,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PagingStatistics {
    pub total_accesses: u64,
    pub total_faults: u64,
    pub write_backs: u64,
    pub fault_rate: f64,
    pub effective_access_time_ns: f64,
}

impl PagingStatistics {
    #[inline]
    pub fn hits(&self) -> u64 {
        self.total_accesses - self.total_faults
    }
}

/// Everything a finished simulation run reports
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SimulationReport {
    pub policy: ReplacementPolicy,
    pub total_frames: usize,
    pub statistics: PagingStatistics,
    pub page_table: Vec<PageTableDumpEntry>,
}

/// Demand paging for a single process.
///
/// Pages are only loaded when they are referenced. If no frame is free,
/// the replacement module `R` decides which resident page has to go.
pub struct DemandPagingEngine<R: ReplacementModule> {
    frames: FramePool,
    page_table: PageTable,
    replacement: R,
    config: VMConfig,

    /// number of accesses so far, also used as the access timestamp
    clock: u64,
    faults: u64,
    write_backs: u64,
}

impl<R: ReplacementModule> DemandPagingEngine<R> {
    pub fn new(total_frames: usize, replacement: R, config: VMConfig) -> Result<Self> {
        config.validate()?;
        let frames = FramePool::new(total_frames)?;

        debug!(
            "Created {} paging engine with {} frames",
            replacement.policy(),
            total_frames
        );

        Ok(Self {
            frames,
            page_table: PageTable::new(),
            replacement,
            config,
            clock: 0,
            faults: 0,
            write_backs: 0,
        })
    }

    /// Simulates one memory reference.
    ///
    /// Counters and the entry's access bookkeeping only advance once the reference
    /// was serviced, a failed fault leaves the statistics untouched.
    pub fn access(&mut self, page: PageNumber, is_write: bool) -> Result<AccessOutcome> {
        let now = self.clock;
        let resident = self.page_table.get(page).and_then(|entry| entry.frame());

        let outcome = match resident {
            Some(frame) => {
                let entry = self.page_table.get_or_create(page);
                entry.set_referenced(true);
                if is_write {
                    entry.set_modified(true);
                }
                self.replacement.page_hit(page);

                debug!("Page {}: hit in frame {}", page, frame);
                AccessOutcome::Hit { frame }
            }
            None => {
                let outcome = self.handle_page_fault(page, is_write, now)?;
                self.faults += 1;
                debug!("Page {}: fault #{}", page, self.faults);
                outcome
            }
        };

        self.clock += 1;
        self.page_table.get_or_create(page).touch(now);
        Ok(outcome)
    }

    fn handle_page_fault(
        &mut self,
        page: PageNumber,
        is_write: bool,
        now: u64,
    ) -> Result<AccessOutcome> {
        let (frame, evicted) = match self.frames.allocate(page) {
            FrameAllocation::Allocated(frame) => (frame, None),
            FrameAllocation::Full => {
                debug!("No free frames, running {} replacement", self.replacement.policy());

                let victim = self.replacement.select_victim(VictimContext::new(
                    &self.frames,
                    &mut self.page_table,
                    now,
                ))?;
                let eviction = self.evict(victim)?;

                match self.frames.allocate(page) {
                    FrameAllocation::Allocated(frame) => (frame, Some(eviction)),
                    FrameAllocation::Full => return Err(VMError::ReplacementExhausted),
                }
            }
        };

        let entry = self.page_table.get_or_create(page);
        entry.map(frame);
        entry.set_referenced(true);
        entry.set_modified(is_write);
        self.replacement.page_loaded(page, frame);

        debug!("Allocated frame {} to page {}", frame, page);
        Ok(AccessOutcome::Fault { frame, evicted })
    }

    fn evict(&mut self, victim: PageNumber) -> Result<Eviction> {
        let entry = self
            .page_table
            .get_mut(victim)
            .ok_or(VMError::ReplacementExhausted)?;

        let written_back = entry.is_modified();
        let frame = entry.unmap().ok_or(VMError::ReplacementExhausted)?;
        if written_back {
            self.write_backs += 1;
            info!("Writing page {} back to disk (dirty)", victim);
        }

        let owner = self.frames.free(frame);
        debug_assert_eq!(owner, Some(victim), "frame owner and page table disagree");
        self.replacement.page_evicted(victim);

        debug!("Replaced page {} in frame {}", victim, frame);
        Ok(Eviction {
            page: victim,
            frame,
            written_back,
        })
    }

    /// Issues every reference of `reference_string` in order
    pub fn run(&mut self, reference_string: &ReferenceString) -> Result<PagingStatistics> {
        for reference in reference_string {
            self.access(reference.page, reference.is_write)?;
        }

        let statistics = self.statistics();
        info!(
            "{} with {} frames: {} accesses, {} faults ({:.2}%), EAT {:.2} ns",
            self.replacement.policy(),
            self.frames.total_frames(),
            statistics.total_accesses,
            statistics.total_faults,
            statistics.fault_rate * 100.0,
            statistics.effective_access_time_ns
        );
        Ok(statistics)
    }

    pub fn statistics(&self) -> PagingStatistics {
        let fault_rate = if self.clock == 0 {
            0.0
        } else {
            self.faults as f64 / self.clock as f64
        };

        let effective_access_time_ns = if self.clock == 0 {
            0.0
        } else {
            effective_access_time(fault_rate, &self.config)
        };

        PagingStatistics {
            total_accesses: self.clock,
            total_faults: self.faults,
            write_backs: self.write_backs,
            fault_rate,
            effective_access_time_ns,
        }
    }

    #[inline]
    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    pub fn page_table_dump(&self) -> Vec<PageTableDumpEntry> {
        self.page_table.dump()
    }

    #[inline]
    pub fn frames(&self) -> &FramePool {
        &self.frames
    }

    #[inline]
    pub fn replacement(&self) -> &R {
        &self.replacement
    }

    #[inline]
    pub fn config(&self) -> &VMConfig {
        &self.config
    }

    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            policy: self.replacement.policy(),
            total_frames: self.frames.total_frames(),
            statistics: self.statistics(),
            page_table: self.page_table_dump(),
        }
    }
}

fn run_with<R: ReplacementModule>(
    replacement: R,
    total_frames: usize,
    reference_string: &ReferenceString,
    config: VMConfig,
) -> Result<SimulationReport> {
    let mut engine = DemandPagingEngine::new(total_frames, replacement, config)?;
    engine.run(reference_string)?;
    Ok(engine.report())
}

/// Runs `reference_string` on a fresh engine using `policy`
pub fn simulate(
    policy: ReplacementPolicy,
    total_frames: usize,
    reference_string: &ReferenceString,
    config: VMConfig,
) -> Result<SimulationReport> {
    match policy {
        ReplacementPolicy::Fifo => run_with(
            FifoReplacementModule::new(),
            total_frames,
            reference_string,
            config,
        ),
        ReplacementPolicy::Lru => run_with(
            LruReplacementModule::new(),
            total_frames,
            reference_string,
            config,
        ),
        ReplacementPolicy::Optimal => run_with(
            OptimalReplacementModule::new(reference_string),
            total_frames,
            reference_string,
            config,
        ),
        ReplacementPolicy::Clock => run_with(
            ClockReplacementModule::new(),
            total_frames,
            reference_string,
            config,
        ),
        ReplacementPolicy::Lfu => run_with(
            LfuReplacementModule::new(),
            total_frames,
            reference_string,
            config,
        ),
        ReplacementPolicy::Mfu => run_with(
            MfuReplacementModule::new(),
            total_frames,
            reference_string,
            config,
        ),
    }
}

#[cfg(test)]
mod test {
    use super::{simulate, AccessOutcome, DemandPagingEngine, Eviction};
    use crate::{
        modules::replacement::{
            FifoReplacementModule, ReplacementModule, ReplacementPolicy, VictimContext,
        },
        PageNumber, ReferenceString, Result, VMConfig, VMError,
    };

    fn fifo_engine(frames: usize) -> DemandPagingEngine<FifoReplacementModule> {
        DemandPagingEngine::new(frames, FifoReplacementModule::new(), VMConfig::default()).unwrap()
    }

    #[test]
    fn test_zero_frames_rejected() {
        let res = DemandPagingEngine::new(0, FifoReplacementModule::new(), VMConfig::default());
        assert!(matches!(res, Err(VMError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_hit_and_fault_outcomes() {
        let mut engine = fifo_engine(2);

        assert_eq!(
            engine.access(1, false).unwrap(),
            AccessOutcome::Fault {
                frame: 0,
                evicted: None
            }
        );
        assert_eq!(engine.access(1, true).unwrap(), AccessOutcome::Hit { frame: 0 });
        assert_eq!(
            engine.access(2, false).unwrap(),
            AccessOutcome::Fault {
                frame: 1,
                evicted: None
            }
        );
        assert_eq!(
            engine.access(3, false).unwrap(),
            AccessOutcome::Fault {
                frame: 0,
                evicted: Some(Eviction {
                    page: 1,
                    frame: 0,
                    written_back: true
                })
            }
        );

        let stats = engine.statistics();
        assert_eq!(stats.total_accesses, 4);
        assert_eq!(stats.total_faults, 3);
        assert_eq!(stats.hits(), 1);
        assert_eq!(stats.write_backs, 1);
    }

    /// Gives up on every victim request
    struct FailingReplacementModule;

    impl ReplacementModule for FailingReplacementModule {
        fn policy(&self) -> ReplacementPolicy {
            ReplacementPolicy::Fifo
        }

        fn select_victim(&mut self, _ctx: VictimContext<'_>) -> Result<PageNumber> {
            Err(VMError::ReplacementExhausted)
        }
    }

    #[test]
    fn test_failed_fault_leaves_statistics() {
        let mut engine =
            DemandPagingEngine::new(1, FailingReplacementModule, VMConfig::default()).unwrap();
        engine.access(1, true).unwrap();

        assert_eq!(engine.access(2, false), Err(VMError::ReplacementExhausted));

        let stats = engine.statistics();
        assert_eq!(stats.total_accesses, 1);
        assert_eq!(stats.total_faults, 1);
        assert_eq!(stats.write_backs, 0);
        assert!(engine.page_table().get(2).is_none());

        let entry = engine.page_table().get(1).unwrap();
        assert!(entry.is_valid());
        assert_eq!(entry.access_count(), 1);
        assert_eq!(engine.frames().owner(0), Some(1));

        // the hit still gets the next timestamp
        engine.access(1, false).unwrap();
        assert_eq!(engine.page_table().get(1).unwrap().last_access(), 1);
    }

    #[test]
    fn test_entry_bookkeeping() {
        let mut engine = fifo_engine(2);
        let refs: ReferenceString = "1w,2,1,3,4".parse().unwrap();
        engine.run(&refs).unwrap();

        let stats = engine.statistics();
        assert_eq!(stats.total_faults, 4);
        assert_eq!(stats.write_backs, 1);

        let table = engine.page_table();
        let page1 = table.get(1).unwrap();
        assert!(!page1.is_valid());
        assert!(!page1.is_modified(), "written back pages are clean again");
        assert_eq!(page1.access_count(), 2);
        assert_eq!(page1.last_access(), 2);

        // valid iff a frame is assigned
        for entry in table.iter() {
            assert_eq!(entry.is_valid(), entry.frame().is_some());
        }
        assert_eq!(table.resident().count(), engine.frames().resident_count());
    }

    #[test]
    fn test_statistics_eat() {
        let mut engine = fifo_engine(1);
        let empty = engine.statistics();
        assert_eq!(empty.fault_rate, 0.0);
        assert_eq!(empty.effective_access_time_ns, 0.0);

        engine.run(&ReferenceString::reads(&[1, 1, 1, 2])).unwrap();
        let stats = engine.statistics();
        assert_eq!(stats.fault_rate, 0.5);
        assert_eq!(stats.effective_access_time_ns, 0.5 * 200.0 + 0.5 * 8_000_000.0);
    }

    #[test]
    fn test_simulate_report() {
        let refs = ReferenceString::reads(&[1, 2, 3, 1]);
        let report = simulate(ReplacementPolicy::Lru, 2, &refs, VMConfig::default()).unwrap();

        assert_eq!(report.policy, ReplacementPolicy::Lru);
        assert_eq!(report.total_frames, 2);
        assert_eq!(report.statistics.total_faults, 4);
        let dumped: Vec<_> = report.page_table.iter().map(|e| e.page_number).collect();
        assert_eq!(dumped, vec![1, 2, 3]);
        assert!(report.page_table.iter().filter(|e| e.valid).count() == 2);

        simulate(ReplacementPolicy::Clock, 0, &refs, VMConfig::default())
            .expect_err("zero frames");
    }
}
