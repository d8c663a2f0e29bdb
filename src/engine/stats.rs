// Raw Docker stats API response -> StatsSnapshot.

use bollard::models::ContainerStatsResponse;

use crate::stats::{BlkioEntry, CpuCounters, InterfaceCounters, StatsSnapshot};

fn cpu_counters(stats: Option<&bollard::models::ContainerCpuStats>) -> CpuCounters {
    let Some(stats) = stats else {
        return CpuCounters::default();
    };
    CpuCounters {
        total_usage: stats
            .cpu_usage
            .as_ref()
            .and_then(|u| u.total_usage)
            .unwrap_or(0),
        system_usage: stats.system_cpu_usage.unwrap_or(0),
        online_cpus: stats.online_cpus,
    }
}

/// Missing sections become zero counters; the math in `stats` handles the degenerate cases.
pub(crate) fn snapshot_from_response(s: &ContainerStatsResponse) -> StatsSnapshot {
    let mut networks: Vec<InterfaceCounters> = s
        .networks
        .as_ref()
        .map(|n| {
            n.iter()
                .map(|(name, v)| InterfaceCounters {
                    name: name.clone(),
                    rx_bytes: v.rx_bytes.unwrap_or(0),
                    tx_bytes: v.tx_bytes.unwrap_or(0),
                })
                .collect()
        })
        .unwrap_or_default();
    networks.sort_by(|a, b| a.name.cmp(&b.name));

    let blkio = s
        .blkio_stats
        .as_ref()
        .and_then(|b| b.io_service_bytes_recursive.as_ref())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| {
                    Some(BlkioEntry {
                        op: e.op.clone()?,
                        value: e.value.unwrap_or(0),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    StatsSnapshot {
        cpu: cpu_counters(s.cpu_stats.as_ref()),
        precpu: cpu_counters(s.precpu_stats.as_ref()),
        memory_usage: s.memory_stats.as_ref().and_then(|m| m.usage).unwrap_or(0),
        memory_limit: s.memory_stats.as_ref().and_then(|m| m.limit),
        networks,
        blkio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::compute_stats;
    use bollard::models::{
        ContainerBlkioStatEntry, ContainerBlkioStats, ContainerCpuStats, ContainerCpuUsage,
        ContainerMemoryStats, ContainerNetworkStats,
    };
    use std::collections::HashMap;

    fn minimal_cpu_stats(total_usage: u64, system_cpu_usage: u64) -> ContainerCpuStats {
        ContainerCpuStats {
            cpu_usage: Some(ContainerCpuUsage {
                total_usage: Some(total_usage),
                ..Default::default()
            }),
            system_cpu_usage: Some(system_cpu_usage),
            online_cpus: Some(2),
            throttling_data: None,
        }
    }

    #[test]
    fn snapshot_from_empty_response_is_zeroed() {
        let snap = snapshot_from_response(&ContainerStatsResponse::default());
        assert_eq!(snap, StatsSnapshot::default());
        assert_eq!(compute_stats(&snap).cpu_percent, 0.0);
    }

    #[test]
    fn snapshot_carries_cpu_memory_network_and_blkio() {
        let s = ContainerStatsResponse {
            cpu_stats: Some(minimal_cpu_stats(100_000_000, 1_000_000_000)),
            precpu_stats: Some(minimal_cpu_stats(50_000_000, 500_000_000)),
            memory_stats: Some(ContainerMemoryStats {
                usage: Some(256 * 1024 * 1024),
                limit: Some(512 * 1024 * 1024),
                ..Default::default()
            }),
            networks: Some({
                let mut m = HashMap::new();
                m.insert(
                    "eth0".to_string(),
                    ContainerNetworkStats {
                        rx_bytes: Some(1000),
                        tx_bytes: Some(2000),
                        ..Default::default()
                    },
                );
                m
            }),
            blkio_stats: Some(ContainerBlkioStats {
                io_service_bytes_recursive: Some(vec![
                    ContainerBlkioStatEntry {
                        op: Some("Read".to_string()),
                        value: Some(100),
                        ..Default::default()
                    },
                    ContainerBlkioStatEntry {
                        op: Some("Write".to_string()),
                        value: Some(200),
                        ..Default::default()
                    },
                ]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let snap = snapshot_from_response(&s);
        assert_eq!(snap.cpu.online_cpus, Some(2));
        assert_eq!(snap.memory_limit, Some(512 * 1024 * 1024));
        let out = compute_stats(&snap);
        assert!((out.cpu_percent - 20.0).abs() < 0.01);
        assert!((out.memory_percent - 50.0).abs() < 0.01);
        assert_eq!(out.network_rx, 1000);
        assert_eq!(out.network_tx, 2000);
        assert_eq!(out.block_read, 100);
        assert_eq!(out.block_write, 200);
    }
}
