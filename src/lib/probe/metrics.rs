use std::collections::HashMap;

use serde::Serialize;
use sysinfo::{CpuExt, DiskExt, NetworkExt, NetworksExt, System, SystemExt};
use tracing::*;

#[derive(Clone, Debug, Serialize)]
pub struct CpuMetrics {
    pub percent: f32,
    pub cores: usize,
    pub frequency_mhz: u64,
    pub per_core: Vec<f32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MemoryMetrics {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct DiskMetrics {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct InterfaceMetrics {
    pub up: bool,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub errors_in: u64,
    pub errors_out: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct NetworkMetrics {
    pub interfaces: HashMap<String, InterfaceMetrics>,
}

/// One reading of the host counters. Immutable once produced; callers get a
/// fresh snapshot each cache window instead of mutating an old one.
#[derive(Clone, Debug, Serialize)]
pub struct MetricsSnapshot {
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub disk: DiskMetrics,
    pub network: Option<NetworkMetrics>,
    pub boot_time: u64,
}

/// Read all host metrics once. Blocking (the CPU reading needs two samples
/// spaced by the sysinfo minimum interval) — call through `spawn_blocking`.
#[instrument(level = "debug")]
pub fn collect() -> MetricsSnapshot {
    let mut system = System::new_all();

    // CPU usage is a delta between two refreshes
    system.refresh_cpu();
    std::thread::sleep(System::MINIMUM_CPU_UPDATE_INTERVAL);
    system.refresh_cpu();
    system.refresh_memory();
    system.refresh_disks();
    system.refresh_networks();

    let cpu = CpuMetrics {
        percent: system.global_cpu_info().cpu_usage(),
        cores: system.cpus().len(),
        frequency_mhz: system.global_cpu_info().frequency(),
        per_core: system.cpus().iter().map(|cpu| cpu.cpu_usage()).collect(),
    };

    let total_memory = system.total_memory();
    let available_memory = system.available_memory();
    let memory = MemoryMetrics {
        total: total_memory,
        available: available_memory,
        used: system.used_memory(),
        free: system.free_memory(),
        percent: if total_memory > 0 {
            (total_memory - available_memory) as f32 / total_memory as f32 * 100.0
        } else {
            0.0
        },
    };

    let disk = root_disk_metrics(&system);

    let up_interfaces: HashMap<String, bool> = pnet::datalink::interfaces()
        .into_iter()
        .map(|interface| (interface.name.clone(), interface.is_up()))
        .collect();

    let interfaces: HashMap<String, InterfaceMetrics> = system
        .networks()
        .iter()
        .map(|(name, data)| {
            (
                name.clone(),
                InterfaceMetrics {
                    up: up_interfaces.get(name).copied().unwrap_or(false),
                    bytes_sent: data.total_transmitted(),
                    bytes_received: data.total_received(),
                    packets_sent: data.total_packets_transmitted(),
                    packets_received: data.total_packets_received(),
                    errors_in: data.total_errors_on_received(),
                    errors_out: data.total_errors_on_transmitted(),
                },
            )
        })
        .collect();

    MetricsSnapshot {
        cpu,
        memory,
        disk,
        network: Some(NetworkMetrics { interfaces }),
        boot_time: system.boot_time(),
    }
}

fn root_disk_metrics(system: &System) -> DiskMetrics {
    let main_disk = system
        .disks()
        .iter()
        .find(|disk| disk.mount_point().as_os_str() == "/");

    match main_disk {
        Some(disk) => {
            let total = disk.total_space();
            let free = disk.available_space();
            let used = total.saturating_sub(free);
            DiskMetrics {
                total,
                used,
                free,
                percent: if total > 0 {
                    used as f32 / total as f32 * 100.0
                } else {
                    0.0
                },
            }
        }
        None => {
            warn!("Failed to find the root mount, disk metrics are zeroed");
            DiskMetrics {
                total: 0,
                used: 0,
                free: 0,
                percent: 0.0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_produces_plausible_snapshot() {
        let snapshot = collect();

        assert!(snapshot.cpu.cores >= 1);
        assert_eq!(snapshot.cpu.per_core.len(), snapshot.cpu.cores);
        assert!(snapshot.memory.total > 0);
        assert!(snapshot.memory.available <= snapshot.memory.total);
        assert!((0.0..=100.0).contains(&snapshot.memory.percent));
        assert!((0.0..=100.0).contains(&snapshot.disk.percent));
        assert!(snapshot.boot_time > 0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = collect();
        let value = serde_json::to_value(&snapshot).unwrap();
        assert!(value.get("cpu").is_some());
        assert!(value.get("network").is_some());
    }
}
