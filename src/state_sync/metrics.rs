//! Metric derivation from raw runtime counters.

use crate::runtime::types::RawStats;
use crate::state_sync::types::ResourceMetrics;

/// CPU usage percentage from two consecutive cumulative samples.
///
/// Scaled by the core count, so a container saturating 4 cores reads 400%.
/// Both deltas must be positive; otherwise the sample pair is unusable
/// (fresh container, clock step, missing system counter) and the result is
/// exactly 0.
pub fn cpu_percent(cpu_delta: i64, system_delta: i64, online_cpus: u32) -> f64 {
    if cpu_delta <= 0 || system_delta <= 0 {
        return 0.0;
    }
    (cpu_delta as f64 / system_delta as f64) * online_cpus as f64 * 100.0
}

/// Memory usage percentage; 0 when no limit is set.
pub fn memory_percent(used_bytes: u64, limit_bytes: u64) -> f64 {
    if limit_bytes == 0 {
        return 0.0;
    }
    (used_bytes as f64 / limit_bytes as f64) * 100.0
}

/// Derives display metrics from one raw stats sample.
pub fn derive(stats: &RawStats) -> ResourceMetrics {
    let cpu_delta = stats.cpu_total_usage as i64 - stats.precpu_total_usage as i64;
    let system_delta = stats.system_cpu_usage as i64 - stats.presystem_cpu_usage as i64;

    ResourceMetrics {
        cpu_percent: cpu_percent(cpu_delta, system_delta, stats.online_cpus),
        memory_used_bytes: stats.memory_usage_bytes,
        memory_limit_bytes: stats.memory_limit_bytes,
        memory_percent: memory_percent(stats.memory_usage_bytes, stats.memory_limit_bytes),
    }
}

/// Formats an uptime duration for the dashboard.
///
/// Shows days with hours and minutes, hours with minutes, or minutes alone:
/// 90061s is "1d 1h 1m", 3601s is "1h 0m", 45s is "0m".
pub fn format_uptime(total_seconds: u64) -> String {
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_percent_is_zero_on_nonpositive_deltas() {
        assert_eq!(cpu_percent(0, 1000, 4), 0.0);
        assert_eq!(cpu_percent(-50, 1000, 4), 0.0);
        assert_eq!(cpu_percent(200, 0, 4), 0.0);
        assert_eq!(cpu_percent(200, -1, 4), 0.0);
    }

    #[test]
    fn cpu_percent_scales_by_core_count() {
        assert_eq!(cpu_percent(200, 1000, 4), 80.0);
        assert_eq!(cpu_percent(500, 1000, 1), 50.0);
    }

    #[test]
    fn memory_percent_handles_missing_limit() {
        assert_eq!(memory_percent(512, 0), 0.0);
    }

    #[test]
    fn memory_percent_computes_ratio() {
        let mb = 1024 * 1024;
        assert_eq!(memory_percent(512 * mb, 1024 * mb), 50.0);
    }

    #[test]
    fn derive_combines_cpu_and_memory() {
        let stats = RawStats {
            cpu_total_usage: 1200,
            precpu_total_usage: 1000,
            system_cpu_usage: 11_000,
            presystem_cpu_usage: 10_000,
            online_cpus: 4,
            memory_usage_bytes: 256,
            memory_limit_bytes: 1024,
        };
        let metrics = derive(&stats);
        assert_eq!(metrics.cpu_percent, 80.0);
        assert_eq!(metrics.memory_percent, 25.0);
        assert_eq!(metrics.memory_used_bytes, 256);
        assert_eq!(metrics.memory_limit_bytes, 1024);
    }

    #[test]
    fn derive_clamps_counter_rollover() {
        // pre sample larger than current: treat as no usable delta
        let stats = RawStats {
            cpu_total_usage: 500,
            precpu_total_usage: 900,
            system_cpu_usage: 11_000,
            presystem_cpu_usage: 10_000,
            online_cpus: 2,
            ..Default::default()
        };
        assert_eq!(derive(&stats).cpu_percent, 0.0);
    }

    #[test]
    fn uptime_formatting_matches_dashboard_rules() {
        assert_eq!(format_uptime(90_061), "1d 1h 1m");
        assert_eq!(format_uptime(3_601), "1h 0m");
        assert_eq!(format_uptime(45), "0m");
        assert_eq!(format_uptime(0), "0m");
        assert_eq!(format_uptime(120), "2m");
        assert_eq!(format_uptime(86_400), "1d 0h 0m");
    }
}
