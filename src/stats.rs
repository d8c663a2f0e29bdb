// Container stats math: raw counter snapshot -> percentages and totals.
// Pure and deterministic; the engine adapter builds the snapshot.

use crate::models::ContainerStats;

/// One CPU counter reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuCounters {
    pub total_usage: u64,
    pub system_usage: u64,
    pub online_cpus: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub name: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlkioEntry {
    pub op: String,
    pub value: u64,
}

/// Two consecutive CPU readings plus the current memory, network and block I/O counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cpu: CpuCounters,
    pub precpu: CpuCounters,
    pub memory_usage: u64,
    pub memory_limit: Option<u64>,
    pub networks: Vec<InterfaceCounters>,
    pub blkio: Vec<BlkioEntry>,
}

/// CPU usage across all online CPUs, in percent (400% = four cores saturated).
/// Zero when the system counter did not advance (first sample, restart, counter reset).
pub fn cpu_percent(current: &CpuCounters, previous: &CpuCounters) -> f64 {
    let cpu_delta = current.total_usage as f64 - previous.total_usage as f64;
    let system_delta = current.system_usage as f64 - previous.system_usage as f64;
    if system_delta <= 0.0 {
        return 0.0;
    }
    let cpu_count = current.online_cpus.filter(|n| *n > 0).unwrap_or(1) as f64;
    (cpu_delta / system_delta) * cpu_count * 100.0
}

/// Usage over limit in percent; an absent or zero limit counts as 1 byte.
pub fn memory_percent(usage: u64, limit: Option<u64>) -> f64 {
    let limit = limit.filter(|l| *l > 0).unwrap_or(1);
    usage as f64 / limit as f64 * 100.0
}

fn blkio_total(entries: &[BlkioEntry], op: &str) -> u64 {
    entries
        .iter()
        .filter(|e| e.op.eq_ignore_ascii_case(op))
        .map(|e| e.value)
        .sum()
}

pub fn compute_stats(snapshot: &StatsSnapshot) -> ContainerStats {
    let (network_rx, network_tx) = snapshot
        .networks
        .iter()
        .fold((0u64, 0u64), |(rx, tx), n| {
            (rx + n.rx_bytes, tx + n.tx_bytes)
        });
    ContainerStats {
        cpu_percent: cpu_percent(&snapshot.cpu, &snapshot.precpu),
        memory_usage: snapshot.memory_usage,
        memory_limit: snapshot.memory_limit.unwrap_or(0),
        memory_percent: memory_percent(snapshot.memory_usage, snapshot.memory_limit),
        network_rx,
        network_tx,
        block_read: blkio_total(&snapshot.blkio, "read"),
        block_write: blkio_total(&snapshot.blkio, "write"),
    }
}
