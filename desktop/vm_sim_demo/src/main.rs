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

use std::{env, error::Error, fs};

use log::info;
use vm_sim::{
    analysis::{
        belady_anomalies, compare_policies, effective_access_time, fault_curve,
        max_fault_rate_for_slowdown, slowdown,
    },
    modules::{
        allocator::{BuddyAllocatorModule, SlabAllocatorModule},
        replacement::ReplacementPolicy,
    },
    working_set::{LocalityWorkload, WorkingSetTracker},
    CopyOnWriteManager, ReferenceString, VMConfig,
};

const CLASSIC_REFERENCE_STRING: &str = "7,0,1,2,0,3,0,4,2,3,0,3,0,3,2,1,2,0,1,7,0,1";
const BELADY_REFERENCE_STRING: &str = "1,2,3,4,1,2,5,1,2,3,4,5";
const WORKLOAD_SEED: u64 = 5446535461589659585;

fn main() -> Result<(), Box<dyn Error>> {
    use env_logger::{Builder, Env};
    Builder::from_env(Env::default())
        .filter_level(log::LevelFilter::Info)
        .format_module_path(false)
        .init();

    // optional json file with overrides for the timing constants and the window size
    let config = match env::args().nth(1) {
        Some(path) => VMConfig::from_json(&fs::read_to_string(path)?)?,
        None => VMConfig::default(),
    };
    info!("Using {:?}", config);

    run_policies(config)?;
    run_belady(config)?;
    run_copy_on_write()?;
    run_working_set(config)?;
    run_buddy()?;
    run_slab()?;
    run_access_time(config)?;

    Ok(())
}

fn section(title: &str) {
    println!("\n{}\n{}", title, "=".repeat(title.len()));
}

fn run_policies(config: VMConfig) -> Result<(), Box<dyn Error>> {
    section("Page replacement (3 frames)");

    let refs: ReferenceString = CLASSIC_REFERENCE_STRING.parse()?;
    println!("Reference string: {}", refs);

    let reports = compare_policies(&ReplacementPolicy::ALL, 3, &refs, config)?;
    for report in &reports {
        println!(
            "{:<8} faults: {:>2}, fault rate: {:>6.2}%, EAT: {:.2} ns",
            report.policy.name(),
            report.statistics.total_faults,
            report.statistics.fault_rate * 100.0,
            report.statistics.effective_access_time_ns
        );
    }

    let lru = reports
        .iter()
        .find(|report| report.policy == ReplacementPolicy::Lru);
    if let Some(lru) = lru {
        println!("{}", serde_json::to_string_pretty(lru)?);
    }
    Ok(())
}

fn run_belady(config: VMConfig) -> Result<(), Box<dyn Error>> {
    section("Belady's anomaly (FIFO)");

    let refs: ReferenceString = BELADY_REFERENCE_STRING.parse()?;
    let curve = fault_curve(ReplacementPolicy::Fifo, &refs, 1..=7, config)?;
    for (frames, faults) in &curve {
        println!("{} frame(s): {} faults", frames, faults);
    }

    let anomalies = belady_anomalies(&curve);
    if anomalies.is_empty() {
        println!("No anomaly");
    } else {
        println!("More frames caused more faults at: {:?}", anomalies);
    }
    Ok(())
}

fn run_copy_on_write() -> Result<(), Box<dyn Error>> {
    section("Copy-on-write");

    let mut cow = CopyOnWriteManager::new();
    for page in 0..3 {
        cow.map(1, page, format!("ParentData{}", page));
    }

    let shared = cow.fork(1, 2)?;
    println!("Fork: child 2 shares {} page(s) with parent 1", shared);

    let outcome = cow.write(2, 1, "ChildModifiedData");
    println!("Child writes page 1: {:?}", outcome);
    let outcome = cow.write(1, 0, "ParentModifiedData");
    println!("Parent writes page 0: {:?}", outcome);

    for (id, page) in cow.shared_pages() {
        println!("  {} refs={} data='{}'", id, page.ref_count(), page.data());
    }

    let reclaimed = cow.exit(2);
    println!("Child exits, {} page(s) reclaimed", reclaimed);
    Ok(())
}

fn run_working_set(config: VMConfig) -> Result<(), Box<dyn Error>> {
    section("Working set");

    let mut tracker = WorkingSetTracker::from_config(50, &config)?;
    let mut workload = LocalityWorkload::new(WORKLOAD_SEED);
    for (pid, locality_size) in [(1, 30), (2, 40), (3, 20)] {
        workload.add_process(pid, locality_size)?;
        tracker.add_process(pid);
    }

    for step in 1..=15 {
        let accesses = workload.step(&mut tracker);
        let sizes: Vec<String> = accesses
            .iter()
            .map(|(pid, page, size)| format!("P{}:{}(ws {})", pid, page, size))
            .collect();

        let report = tracker.check_thrashing();
        println!("Step {:>2}: {} -> {}", step, sizes.join(" "), report);
    }

    println!(
        "Thrashing report: {}",
        serde_json::to_string(&tracker.check_thrashing())?
    );
    Ok(())
}

fn run_buddy() -> Result<(), Box<dyn Error>> {
    section("Buddy allocator (256 KB)");

    let mut buddy = BuddyAllocatorModule::new(256)?;
    let mut addresses = Vec::new();
    for size in [21, 64, 16] {
        let address = buddy.allocate(size)?;
        println!("Allocated {} KB at {:#010b}", size, address);
        addresses.push(address);
    }

    buddy.free(addresses[1])?;
    println!("Freed the 64 KB block");

    for order in 0..=buddy.max_order() {
        let blocks: Vec<String> = buddy
            .free_blocks(order)
            .map(|address| format!("{:#010b}", address))
            .collect();
        if !blocks.is_empty() {
            println!("Order {} ({} KB): {}", order, 1usize << order, blocks.join(", "));
        }
    }
    println!("Free memory: {} KB", buddy.free_memory());
    Ok(())
}

fn run_slab() -> Result<(), Box<dyn Error>> {
    section("Slab allocator");

    let mut slab = SlabAllocatorModule::new();
    slab.create_cache("task_struct", 1024, 4)?;
    slab.create_cache("inode", 256, 8)?;

    let mut handles = Vec::new();
    for i in 0..5 {
        handles.push(slab.allocate("task_struct", format!("Process_{}", i))?);
    }
    handles.push(slab.allocate("inode", "inode_1")?);

    slab.free(&handles[1])?;
    slab.free(&handles[3])?;

    for cache in slab.caches() {
        let states = slab.slab_states(cache)?;
        println!(
            "{}: {} full, {} partial, {} empty",
            cache, states.full, states.partial, states.empty
        );
    }
    Ok(())
}

fn run_access_time(config: VMConfig) -> Result<(), Box<dyn Error>> {
    section("Effective access time");

    let fault_rate = 0.001;
    println!(
        "p = {}: EAT = {:.1} ns ({:.1}x slower)",
        fault_rate,
        effective_access_time(fault_rate, &config),
        slowdown(fault_rate, &config)
    );

    let budget = max_fault_rate_for_slowdown(1.1, &config)?;
    println!(
        "For less than 10% degradation: p < {:.3e} (one fault per {:.0} accesses)",
        budget,
        1.0 / budget
    );
    Ok(())
}
