use serde::Serialize;

use crate::{display::DisplayStatus, player::PlayerStatus, probe::metrics::MetricsSnapshot};

/// Per-dimension weights of the overall score. Must sum to 1.0.
pub mod weights {
    pub const CPU: f64 = 0.20;
    pub const MEMORY: f64 = 0.20;
    pub const DISK: f64 = 0.20;
    pub const PLAYER: f64 = 0.20;
    pub const DISPLAY: f64 = 0.15;
    pub const NETWORK: f64 = 0.05;
}

pub const CRITICAL_THRESHOLD: f64 = 50.0;
pub const WARNING_THRESHOLD: f64 = 80.0;

/// Tri-level classification of the overall score. Exactly one flag is true.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct StatusLevel {
    pub critical: bool,
    pub warning: bool,
    pub healthy: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct HealthScore {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
    pub player: f64,
    pub display: f64,
    pub network: f64,
    pub overall: f64,
    pub status: StatusLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthScore {
    /// Degraded score reported when the inputs could not be gathered at all.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            cpu: 0.0,
            memory: 0.0,
            disk: 0.0,
            player: 0.0,
            display: 0.0,
            network: 0.0,
            overall: 0.0,
            status: StatusLevel {
                critical: true,
                warning: false,
                healthy: false,
            },
            error: Some(error.into()),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HealthSummary {
    pub scores: HealthScore,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub needs_attention: bool,
}

/// Map one reading of metrics, player and display state to 0-100 dimension
/// scores and a weighted overall. Pure: identical inputs yield identical
/// output.
pub fn score(
    metrics: &MetricsSnapshot,
    player: &PlayerStatus,
    display: &DisplayStatus,
) -> HealthScore {
    let cpu = (100.0 - metrics.cpu.percent as f64).max(0.0);
    let memory = (100.0 - metrics.memory.percent as f64).max(0.0);
    let disk = (100.0 - metrics.disk.percent as f64).max(0.0);
    let player_score = if player.healthy { 100.0 } else { 0.0 };
    let display_score = if display.connected { 100.0 } else { 0.0 };
    let network = network_score(metrics);

    let overall = round2(
        cpu * weights::CPU
            + memory * weights::MEMORY
            + disk * weights::DISK
            + player_score * weights::PLAYER
            + display_score * weights::DISPLAY
            + network * weights::NETWORK,
    );

    HealthScore {
        cpu,
        memory,
        disk,
        player: player_score,
        display: display_score,
        network,
        overall,
        status: classify(overall),
        error: None,
    }
}

/// Human-readable rollup of raw threshold breaches with remediation hints.
pub fn summary(
    metrics: &MetricsSnapshot,
    player: &PlayerStatus,
    display: &DisplayStatus,
) -> HealthSummary {
    let scores = score(metrics, player, display);

    let mut warnings = Vec::new();
    let mut recommendations = Vec::new();

    if metrics.cpu.percent > 80.0 {
        warnings.push("High CPU usage detected".to_string());
        recommendations.push("Check for resource-intensive processes".to_string());
    }
    if metrics.memory.percent > 80.0 {
        warnings.push("High memory usage detected".to_string());
        recommendations
            .push("Consider increasing available memory or check for memory leaks".to_string());
    }
    if metrics.disk.percent > 80.0 {
        warnings.push("Low disk space".to_string());
        recommendations.push("Clean up unnecessary files or increase disk space".to_string());
    }
    if !player.healthy {
        warnings.push("Player is not running properly".to_string());
        if !player.service_active {
            recommendations.push("Check player service status".to_string());
        }
        if !player.display_connected {
            recommendations.push("Verify display connection".to_string());
        }
    }

    let needs_attention = !warnings.is_empty();
    HealthSummary {
        scores,
        warnings,
        recommendations,
        needs_attention,
    }
}

fn network_score(metrics: &MetricsSnapshot) -> f64 {
    match &metrics.network {
        Some(network) if !network.interfaces.is_empty() => {
            let total = network.interfaces.len();
            let active = network
                .interfaces
                .values()
                .filter(|interface| interface.up)
                .count();
            active as f64 / total as f64 * 100.0
        }
        _ => 0.0,
    }
}

fn classify(overall: f64) -> StatusLevel {
    StatusLevel {
        critical: overall < CRITICAL_THRESHOLD,
        warning: (CRITICAL_THRESHOLD..WARNING_THRESHOLD).contains(&overall),
        healthy: overall >= WARNING_THRESHOLD,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::probe::metrics::{
        CpuMetrics, DiskMetrics, InterfaceMetrics, MemoryMetrics, NetworkMetrics,
    };

    fn interface(up: bool) -> InterfaceMetrics {
        InterfaceMetrics {
            up,
            bytes_sent: 0,
            bytes_received: 0,
            packets_sent: 0,
            packets_received: 0,
            errors_in: 0,
            errors_out: 0,
        }
    }

    fn snapshot(
        cpu_percent: f32,
        memory_percent: f32,
        disk_percent: f32,
        interfaces_up: &[bool],
    ) -> MetricsSnapshot {
        let interfaces: HashMap<String, InterfaceMetrics> = interfaces_up
            .iter()
            .enumerate()
            .map(|(index, up)| (format!("eth{index}"), interface(*up)))
            .collect();

        MetricsSnapshot {
            cpu: CpuMetrics {
                percent: cpu_percent,
                cores: 4,
                frequency_mhz: 1800,
                per_core: vec![cpu_percent; 4],
            },
            memory: MemoryMetrics {
                total: 8 << 30,
                available: 4 << 30,
                used: 4 << 30,
                free: 4 << 30,
                percent: memory_percent,
            },
            disk: DiskMetrics {
                total: 64 << 30,
                used: 16 << 30,
                free: 48 << 30,
                percent: disk_percent,
            },
            network: Some(NetworkMetrics { interfaces }),
            boot_time: 1_700_000_000,
        }
    }

    fn player(healthy: bool) -> PlayerStatus {
        PlayerStatus {
            service_active: healthy,
            player_running: healthy,
            display_connected: healthy,
            healthy,
            process: None,
        }
    }

    fn display(connected: bool) -> DisplayStatus {
        DisplayStatus {
            connected,
            ..Default::default()
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let sum = weights::CPU
            + weights::MEMORY
            + weights::DISK
            + weights::PLAYER
            + weights::DISPLAY
            + weights::NETWORK;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_reference_score() {
        // 90*.2 + 80*.2 + 70*.2 + 100*.2 + 100*.15 + 100*.05 = 88
        let metrics = snapshot(10.0, 20.0, 30.0, &[true, true]);
        let scores = score(&metrics, &player(true), &display(true));

        assert_eq!(scores.cpu, 90.0);
        assert_eq!(scores.memory, 80.0);
        assert_eq!(scores.disk, 70.0);
        assert_eq!(scores.player, 100.0);
        assert_eq!(scores.display, 100.0);
        assert_eq!(scores.network, 100.0);
        assert_eq!(scores.overall, 88.0);
        assert!(scores.status.healthy);
        assert!(!scores.status.warning);
        assert!(!scores.status.critical);
    }

    #[test]
    fn test_scoring_is_pure() {
        let metrics = snapshot(42.5, 61.0, 12.0, &[true, false]);
        let first = score(&metrics, &player(true), &display(false));
        let second = score(&metrics, &player(true), &display(false));
        assert_eq!(first.overall, second.overall);
        assert_eq!(first.network, second.network);
    }

    #[test]
    fn test_status_levels_are_mutually_exclusive() {
        for (cpu, healthy, connected) in [
            (0.0, true, true),
            (50.0, true, false),
            (99.0, false, false),
            (100.0, false, true),
        ] {
            let metrics = snapshot(cpu, cpu, cpu, &[true]);
            let status = score(&metrics, &player(healthy), &display(connected)).status;
            let levels = [status.critical, status.warning, status.healthy];
            assert_eq!(levels.iter().filter(|level| **level).count(), 1);
        }
    }

    #[test]
    fn test_overloaded_dimensions_clamp_to_zero() {
        // Usage above 100% must not produce a negative dimension score
        let metrics = snapshot(140.0, 120.0, 100.0, &[]);
        let scores = score(&metrics, &player(false), &display(false));
        assert_eq!(scores.cpu, 0.0);
        assert_eq!(scores.memory, 0.0);
        assert_eq!(scores.disk, 0.0);
        assert_eq!(scores.overall, 0.0);
        assert!(scores.status.critical);
    }

    #[test]
    fn test_no_interfaces_scores_zero_network() {
        let metrics = snapshot(10.0, 10.0, 10.0, &[]);
        let scores = score(&metrics, &player(true), &display(true));
        assert_eq!(scores.network, 0.0);

        let mut without_network = snapshot(10.0, 10.0, 10.0, &[]);
        without_network.network = None;
        let scores = score(&without_network, &player(true), &display(true));
        assert_eq!(scores.network, 0.0);
    }

    #[test]
    fn test_partial_interfaces() {
        let metrics = snapshot(10.0, 10.0, 10.0, &[true, false, true, true]);
        let scores = score(&metrics, &player(true), &display(true));
        assert_eq!(scores.network, 75.0);
    }

    #[test]
    fn test_failed_score_is_critical() {
        let scores = HealthScore::failed("metrics probe crashed");
        assert_eq!(scores.overall, 0.0);
        assert!(scores.status.critical);
        assert!(!scores.status.warning);
        assert!(!scores.status.healthy);
        assert!(scores.error.is_some());
    }

    #[test]
    fn test_summary_reports_breaches() {
        let metrics = snapshot(92.0, 85.0, 90.0, &[true]);
        let summary = summary(&metrics, &player(false), &display(false));

        assert!(summary.needs_attention);
        assert_eq!(summary.warnings.len(), 4);
        assert!(summary
            .recommendations
            .iter()
            .any(|hint| hint.contains("display connection")));
        assert!(summary
            .recommendations
            .iter()
            .any(|hint| hint.contains("service status")));
    }

    #[test]
    fn test_summary_quiet_when_healthy() {
        let metrics = snapshot(10.0, 20.0, 30.0, &[true, true]);
        let summary = summary(&metrics, &player(true), &display(true));
        assert!(!summary.needs_attention);
        assert!(summary.warnings.is_empty());
        assert!(summary.recommendations.is_empty());
    }
}
