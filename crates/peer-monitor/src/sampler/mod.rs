//! Periodic host resource sampling.
//!
//! Two independent tasks fire once per [`SAMPLE_INTERVAL`]:
//!
//! - the **lag task** measures how late the runtime delivered its tick,
//! - the **CPU task** derives process CPU utilization from the change in
//!   user + system time and refreshes memory figures.
//!
//! Both publish into a shared [`ResourceSnapshot`]. Readers get the latest
//! completed values and never wait for a tick. A failed host read keeps
//! the previous values and is only logged.

mod probe;

pub use probe::{
    CpuTracker, LagTracker, MemoryProbe, MemoryUsage, PlatformInfo, cpu_percent, detect_cores,
    process_cpu_time,
};

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at};
use tracing::debug;

/// Period of both sampling tasks.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Latest resource readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSnapshot {
    /// Process CPU utilization across all cores, 0..=100
    pub cpu_percent: u8,
    /// Lateness of the most recent lag tick
    pub loop_lag_millis: u64,
    /// Process memory usage
    pub memory: MemoryUsage,
    /// Cores detected on the most recent CPU tick
    pub cores: usize,
}

impl Default for ResourceSnapshot {
    fn default() -> Self {
        Self {
            cpu_percent: 0,
            loop_lag_millis: 0,
            memory: MemoryUsage::default(),
            cores: detect_cores(),
        }
    }
}

/// Owner of the sampling tasks and their published snapshot.
pub struct ResourceSampler {
    snapshot: Arc<RwLock<ResourceSnapshot>>,
    platform: PlatformInfo,
    tasks: Vec<JoinHandle<()>>,
}

impl ResourceSampler {
    /// A sampler with no running tasks. Memory is read once up front so
    /// the snapshot is populated before the first tick.
    #[must_use]
    pub fn idle() -> Self {
        let mut initial = ResourceSnapshot::default();
        match MemoryProbe::new().sample() {
            Ok(usage) => initial.memory = usage,
            Err(e) => debug!(error = %e, "Initial memory reading failed"),
        }

        Self {
            snapshot: Arc::new(RwLock::new(initial)),
            platform: PlatformInfo::detect(),
            tasks: Vec::new(),
        }
    }

    /// Spawn both sampling tasks on the current tokio runtime.
    #[must_use]
    pub fn start() -> Self {
        let mut sampler = Self::idle();
        sampler
            .tasks
            .push(tokio::spawn(run_lag_task(sampler.snapshot.clone())));
        sampler
            .tasks
            .push(tokio::spawn(run_cpu_task(sampler.snapshot.clone())));
        debug!(interval_ms = SAMPLE_INTERVAL.as_millis() as u64, "Resource sampler started");
        sampler
    }

    /// Most recent readings.
    pub async fn snapshot(&self) -> ResourceSnapshot {
        *self.snapshot.read().await
    }

    #[must_use]
    pub fn platform(&self) -> &PlatformInfo {
        &self.platform
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }

    /// Stop both tasks. The last snapshot stays readable.
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for ResourceSampler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn ticker() -> tokio::time::Interval {
    let mut ticker = interval_at(tokio::time::Instant::now() + SAMPLE_INTERVAL, SAMPLE_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn run_lag_task(snapshot: Arc<RwLock<ResourceSnapshot>>) {
    let mut ticker = ticker();
    let mut lag = LagTracker::new(Instant::now(), SAMPLE_INTERVAL);

    loop {
        ticker.tick().await;
        let late = lag.tick(Instant::now());
        snapshot.write().await.loop_lag_millis = late.as_millis() as u64;
    }
}

async fn run_cpu_task(snapshot: Arc<RwLock<ResourceSnapshot>>) {
    let mut ticker = ticker();
    let mut memory = MemoryProbe::new();
    let mut cpu = match process_cpu_time() {
        Ok(cpu_time) => Some(CpuTracker::new(cpu_time, Instant::now())),
        Err(e) => {
            debug!(error = %e, "Initial CPU reading failed");
            None
        }
    };

    loop {
        ticker.tick().await;
        let cores = detect_cores();

        let percent = match process_cpu_time() {
            Ok(cpu_time) => match cpu.as_mut() {
                Some(tracker) => Some(tracker.tick(cpu_time, Instant::now(), cores)),
                None => {
                    cpu = Some(CpuTracker::new(cpu_time, Instant::now()));
                    None
                }
            },
            Err(e) => {
                debug!(error = %e, "CPU sample failed, keeping previous value");
                None
            }
        };

        let usage = match memory.sample() {
            Ok(usage) => Some(usage),
            Err(e) => {
                debug!(error = %e, "Memory sample failed, keeping previous value");
                None
            }
        };

        let mut current = snapshot.write().await;
        current.cores = cores;
        if let Some(percent) = percent {
            current.cpu_percent = percent;
        }
        if let Some(usage) = usage {
            current.memory = usage;
        }
    }
}
