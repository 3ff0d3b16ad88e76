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

mod trace;

use std::{
    env, fs,
    io::{self, stdout, Write},
    process::ExitCode,
};

use env_logger::{Builder, Env};
use log::{error, info, warn};
use paging_sim::{
    modules::eviction_policy::RandomEvictionPolicyModule, DefaultMemoryManager, MemoryConfig,
    MemoryError, MemoryStatistics,
};

use crate::trace::{parse_line, TraceLine, TraceOp};

fn load_config(path: Option<&String>) -> Result<MemoryConfig, String> {
    let Some(path) = path else {
        return Ok(MemoryConfig::default());
    };

    let text = fs::read_to_string(path).map_err(|err| format!("could not read {}: {}", path, err))?;
    serde_json::from_str(&text).map_err(|err| format!("could not parse {}: {}", path, err))
}

/// Runs one trace operation, returns the value the operation produced
fn execute(manager: &mut DefaultMemoryManager, line: TraceLine) -> Result<u64, MemoryError> {
    match line.op {
        TraceOp::Switch => manager.switch_to_process(line.pid).map(u64::from),
        TraceOp::Alloc(size) => manager.allocate_memory(line.pid, size).map(u64::from),
        TraceOp::Free(address) => manager.free_memory(line.pid, address),
        TraceOp::Access(segment, address) => {
            manager.access(line.pid, segment, address).map(u64::from)
        }
    }
}

fn print_summary(statistics: &MemoryStatistics) {
    let tlb = &statistics.tlb;
    println!("Accesses: {}", tlb.accesses);
    println!("L1 hits: {}", tlb.l1_hits);
    println!("L2 hits: {}", tlb.l2_hits);
    println!("TLB misses: {}", tlb.misses);
    println!("Page table hits: {}", statistics.page_table_hits);
    println!("Page faults: {}", statistics.page_faults);
    println!(
        "Misses by segment: code {}, stack {}, heap {}",
        statistics.code_misses, statistics.stack_misses, statistics.heap_misses
    );
    println!("Swap outs: {}", statistics.swap_outs);
    println!("Swap ins: {}", statistics.swap_ins);
    println!("L1 hit rate: {:.4}", tlb.l1_hit_rate());
    println!("L2 hit rate: {:.4}", tlb.l2_hit_rate());
    println!("TLB hit rate: {:.4}", tlb.hit_rate());
}

fn main() -> ExitCode {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_module_path(false)
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(trace_path) = args.get(1) else {
        let program = args.first().map(String::as_str).unwrap_or("trace_runner");
        error!("usage: {} <trace-file> [config.json]", program);
        return ExitCode::FAILURE;
    };

    let config = match load_config(args.get(2)) {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut manager =
        match DefaultMemoryManager::new(config, RandomEvictionPolicyModule::default()) {
            Ok(manager) => manager,
            Err(err) => {
                error!("{}", err);
                return ExitCode::FAILURE;
            }
        };

    let trace = match fs::read_to_string(trace_path) {
        Ok(trace) => trace,
        Err(err) => {
            error!("could not read {}: {}", trace_path, err);
            return ExitCode::FAILURE;
        }
    };

    for (number, line) in trace.lines().enumerate() {
        let line = match parse_line(line) {
            Ok(Some(line)) => line,
            Ok(None) => continue,
            Err(err) => {
                warn!("line {}: {}, skipping", number + 1, err);
                continue;
            }
        };

        match execute(&mut manager, line) {
            Ok(result) => info!(
                "{} {} {:#x} -> {:#x}",
                line.pid,
                line.op.name(),
                line.op.value(),
                result
            ),
            Err(err) => warn!(
                "{} {} {:#x} failed: {}",
                line.pid,
                line.op.name(),
                line.op.value(),
                err
            ),
        }
    }

    let statistics = manager.statistics();
    print_summary(&statistics);

    let mut out = stdout().lock();
    let written = serde_json::to_writer(&mut out, &statistics)
        .map_err(io::Error::from)
        .and_then(|_| writeln!(out));
    if let Err(err) = written {
        error!("could not write statistics: {}", err);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
