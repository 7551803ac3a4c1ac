//! Host probes and the per-tick arithmetic behind the sampler.
//!
//! The trackers take explicit `Instant`s so their behaviour can be checked
//! without waiting on real timers.

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

const MIB: u64 = 1024 * 1024;

/// Measures how late each periodic tick fires.
///
/// After every tick the next deadline is re-armed from the observed time,
/// not from the previous deadline, so one slow tick does not bias the
/// ones after it. Long-term drift from a fixed schedule is not reported.
#[derive(Debug, Clone)]
pub struct LagTracker {
    expected_next: Instant,
    interval: Duration,
}

impl LagTracker {
    #[must_use]
    pub fn new(start: Instant, interval: Duration) -> Self {
        Self {
            expected_next: start + interval,
            interval,
        }
    }

    /// Record a tick observed at `now` and return its lateness.
    pub fn tick(&mut self, now: Instant) -> Duration {
        let lag = now.saturating_duration_since(self.expected_next);
        self.expected_next = now + self.interval;
        lag
    }
}

/// Turns successive process CPU-time readings into a utilization figure.
#[derive(Debug, Clone)]
pub struct CpuTracker {
    last_cpu: Duration,
    last_wall: Instant,
}

impl CpuTracker {
    #[must_use]
    pub fn new(cpu_time: Duration, now: Instant) -> Self {
        Self {
            last_cpu: cpu_time,
            last_wall: now,
        }
    }

    /// Percentage of `cores` used since the previous reading.
    pub fn tick(&mut self, cpu_time: Duration, now: Instant, cores: usize) -> u8 {
        let used = cpu_time.saturating_sub(self.last_cpu);
        let wall = now.saturating_duration_since(self.last_wall);
        self.last_cpu = cpu_time;
        self.last_wall = now;
        cpu_percent(used, wall, cores)
    }
}

/// CPU time `used` over `wall` time across `cores`, as a rounded
/// percentage clamped to `0..=100`. An empty window reports 0.
#[must_use]
pub fn cpu_percent(used: Duration, wall: Duration, cores: usize) -> u8 {
    let capacity_us = wall.as_micros().saturating_mul(cores as u128);
    if capacity_us == 0 {
        return 0;
    }
    let pct = used.as_micros() as f64 / capacity_us as f64 * 100.0;
    pct.round().clamp(0.0, 100.0) as u8
}

/// Logical cores available to the process, 1 if undetectable.
#[must_use]
pub fn detect_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Total user + system CPU time consumed by this process.
#[cfg(unix)]
pub fn process_cpu_time() -> Result<Duration> {
    use nix::sys::resource::{UsageWho, getrusage};

    let usage =
        getrusage(UsageWho::RUSAGE_SELF).map_err(|e| MonitorError::Sampler(e.to_string()))?;
    Ok(timeval_duration(usage.user_time()) + timeval_duration(usage.system_time()))
}

#[cfg(not(unix))]
pub fn process_cpu_time() -> Result<Duration> {
    Err(MonitorError::Sampler(
        "process CPU time is not available on this platform".to_string(),
    ))
}

#[cfg(unix)]
fn timeval_duration(tv: nix::sys::time::TimeVal) -> Duration {
    use nix::sys::time::TimeValLike;

    Duration::from_micros(tv.num_microseconds().max(0) as u64)
}

/// Process memory figures in MiB.
///
/// There is no managed heap to report, so `heap_used_mb` carries the
/// resident set and `heap_total_mb` the virtual size of the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub rss_mb: u64,
    pub heap_used_mb: u64,
    pub heap_total_mb: u64,
}

/// Reads this process's memory usage through `sysinfo`.
pub struct MemoryProbe {
    system: System,
    pid: Option<Pid>,
}

impl MemoryProbe {
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }

    pub fn sample(&mut self) -> Result<MemoryUsage> {
        let pid = self
            .pid
            .ok_or_else(|| MonitorError::Sampler("current pid unavailable".to_string()))?;
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        let process = self
            .system
            .process(pid)
            .ok_or_else(|| MonitorError::Sampler(format!("process {pid} not found")))?;

        let rss_mb = bytes_to_mb(process.memory());
        Ok(MemoryUsage {
            rss_mb,
            heap_used_mb: rss_mb,
            heap_total_mb: bytes_to_mb(process.virtual_memory()),
        })
    }
}

impl Default for MemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn bytes_to_mb(bytes: u64) -> u64 {
    bytes.saturating_add(MIB / 2) / MIB
}

/// Static description of the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    /// Operating system family (`linux`, `macos`, `windows`, ...)
    pub platform: String,
    /// Kernel release, `unknown` if the host does not report one
    pub release: String,
    /// CPU architecture
    pub arch: String,
}

impl PlatformInfo {
    #[must_use]
    pub fn detect() -> Self {
        Self {
            platform: std::env::consts::OS.to_string(),
            release: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn test_lag_zero_when_on_time() {
        let start = Instant::now();
        let mut lag = LagTracker::new(start, SECOND);
        assert_eq!(lag.tick(start + SECOND), Duration::ZERO);
    }

    #[test]
    fn test_lag_zero_when_early() {
        let start = Instant::now();
        let mut lag = LagTracker::new(start, SECOND);
        assert_eq!(lag.tick(start + Duration::from_millis(900)), Duration::ZERO);
    }

    #[test]
    fn test_lag_does_not_compound() {
        let start = Instant::now();
        let mut lag = LagTracker::new(start, SECOND);

        // first tick 250ms late
        let late = start + Duration::from_millis(1_250);
        assert_eq!(lag.tick(late), Duration::from_millis(250));

        // next deadline is re-armed from the late tick
        assert_eq!(lag.tick(late + SECOND), Duration::ZERO);
        assert_eq!(
            lag.tick(late + SECOND + Duration::from_millis(1_040)),
            Duration::from_millis(40)
        );
    }

    #[test]
    fn test_cpu_percent_basic() {
        // half a core-second over one second on one core
        assert_eq!(cpu_percent(Duration::from_millis(500), SECOND, 1), 50);
        // same usage spread over four cores
        assert_eq!(cpu_percent(Duration::from_millis(500), SECOND, 4), 13);
    }

    #[test]
    fn test_cpu_percent_clamps() {
        assert_eq!(cpu_percent(Duration::from_secs(10), SECOND, 1), 100);
        assert_eq!(cpu_percent(Duration::ZERO, SECOND, 8), 0);
    }

    #[test]
    fn test_cpu_percent_zero_wall_or_cores() {
        assert_eq!(cpu_percent(Duration::from_millis(5), Duration::ZERO, 4), 0);
        assert_eq!(cpu_percent(Duration::ZERO, Duration::ZERO, 4), 0);
        assert_eq!(cpu_percent(Duration::from_millis(5), SECOND, 0), 0);
    }

    #[test]
    fn test_cpu_percent_always_in_range() {
        let durations = [0u64, 1, 999, 1_000, 1_000_000, u64::from(u32::MAX)];
        for used in durations {
            for wall in durations {
                for cores in [0, 1, 2, 64] {
                    let pct = cpu_percent(
                        Duration::from_micros(used),
                        Duration::from_micros(wall),
                        cores,
                    );
                    assert!(pct <= 100, "used={used} wall={wall} cores={cores}");
                }
            }
        }
    }

    #[test]
    fn test_cpu_tracker_uses_deltas() {
        let start = Instant::now();
        let mut cpu = CpuTracker::new(Duration::from_secs(3), start);

        let pct = cpu.tick(Duration::from_millis(3_250), start + SECOND, 1);
        assert_eq!(pct, 25);

        // counter going backwards never yields a negative figure
        let pct = cpu.tick(Duration::from_secs(1), start + 2 * SECOND, 1);
        assert_eq!(pct, 0);
    }

    #[test]
    fn test_detect_cores_positive() {
        assert!(detect_cores() >= 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_process_cpu_time_readable() {
        let first = process_cpu_time().unwrap();
        let mut acc = 0u64;
        for i in 0..200_000u64 {
            acc = acc.wrapping_add(i * i);
        }
        std::hint::black_box(acc);
        let second = process_cpu_time().unwrap();
        assert!(second >= first);
    }

    #[cfg(unix)]
    #[test]
    fn test_timeval_keeps_microseconds() {
        use nix::sys::time::TimeVal;

        assert_eq!(
            timeval_duration(TimeVal::new(2, 500_250)),
            Duration::from_micros(2_500_250)
        );
        assert_eq!(timeval_duration(TimeVal::new(-1, 0)), Duration::ZERO);
    }

    #[test]
    fn test_bytes_to_mb_rounds() {
        assert_eq!(bytes_to_mb(0), 0);
        assert_eq!(bytes_to_mb(MIB), 1);
        assert_eq!(bytes_to_mb(MIB + MIB / 2), 2);
        assert_eq!(bytes_to_mb(MIB + MIB / 2 - 1), 1);
    }

    #[test]
    fn test_platform_info_detect() {
        let info = PlatformInfo::detect();
        assert_eq!(info.platform, std::env::consts::OS);
        assert_eq!(info.arch, std::env::consts::ARCH);
        assert!(!info.release.is_empty());
    }

    #[test]
    fn test_memory_probe_samples_self() {
        let mut probe = MemoryProbe::new();
        let usage = probe.sample().unwrap();
        assert_eq!(usage.heap_used_mb, usage.rss_mb);
        assert!(usage.heap_total_mb >= usage.rss_mb);
    }
}
