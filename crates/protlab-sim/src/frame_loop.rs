//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulation runtime helpers and scenario engines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Real-time driver for the simulators.
//!
//! Each frame measures the wall-clock time since the previous one and hands
//! it to [`Simulator::tick`] as `dt`, capped so a stalled frame cannot produce
//! a huge integration step. The loop ends when its handle is stopped or
//! dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use protlab_common::time::frame_step_secs;
use protlab_common::{FrameTimingReporter, JitterSummary};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Largest `dt` handed to a simulator by default.
pub const DEFAULT_MAX_STEP_SECS: f64 = 0.1;

/// Anything advanced by a frame clock.
pub trait Simulator: Send + 'static {
    fn name(&self) -> &'static str;

    /// Advance by `dt` seconds of simulated time.
    fn tick(&mut self, dt: f64);
}

pub type SharedSimulator<S> = Arc<Mutex<S>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameLoopOptions {
    pub period: Duration,
    pub max_step_secs: f64,
}

impl Default for FrameLoopOptions {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(16),
            max_step_secs: DEFAULT_MAX_STEP_SECS,
        }
    }
}

impl FrameLoopOptions {
    pub fn from_config(config: &protlab_common::SimulationConfig) -> Self {
        Self {
            period: config.frame_period,
            max_step_secs: config.max_step_secs,
        }
    }
}

pub struct FrameLoop;

impl FrameLoop {
    /// Spawn the frame task on the current tokio runtime.
    pub fn spawn<S: Simulator>(
        simulator: SharedSimulator<S>,
        options: FrameLoopOptions,
    ) -> FrameLoopHandle {
        let period = if options.period.is_zero() {
            FrameLoopOptions::default().period
        } else {
            options.period
        };
        let timing = Arc::new(FrameTimingReporter::new(period));
        let active = Arc::new(AtomicBool::new(true));
        let frames = Arc::new(AtomicU64::new(0));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task_timing = timing.clone();
        let task_active = active.clone();
        let task_frames = frames.clone();
        let max_step_secs = options.max_step_secs;
        let task = tokio::spawn(async move {
            let name = simulator.lock().name();
            info!(simulator = name, period_ms = period.as_millis() as u64, "frame loop started");
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        debug!(simulator = name, "frame loop shutdown");
                        break;
                    }
                    _ = interval.tick() => {
                        // The first frame only establishes the time base.
                        if let Some(elapsed) = task_timing.record_frame(Instant::now()) {
                            let dt = frame_step_secs(elapsed, max_step_secs);
                            simulator.lock().tick(dt);
                            task_frames.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            }
            task_active.store(false, Ordering::Release);
            info!(
                simulator = name,
                frames = task_frames.load(Ordering::Relaxed),
                "frame loop stopped"
            );
        });

        FrameLoopHandle {
            shutdown: Some(shutdown_tx),
            task,
            active,
            frames,
            timing,
        }
    }
}

/// Owner of a running frame loop. Dropping it ends the loop on the next
/// frame boundary.
#[derive(Debug)]
pub struct FrameLoopHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    active: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
    timing: Arc<FrameTimingReporter>,
}

impl FrameLoopHandle {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Frames that advanced the simulator so far.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn jitter(&self) -> Option<JitterSummary> {
        self.timing.histogram().summary()
    }

    /// Stop the loop and wait for the task to finish. Returns the number of
    /// frames delivered.
    pub async fn stop(mut self) -> u64 {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(err) = (&mut self.task).await {
            debug!(error = %err, "frame loop task join error");
        }
        self.active.store(false, Ordering::Release);
        self.frames()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        ticks: u32,
        elapsed: f64,
        largest_step: f64,
    }

    impl Simulator for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn tick(&mut self, dt: f64) {
            self.ticks += 1;
            self.elapsed += dt;
            self.largest_step = self.largest_step.max(dt);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn drives_ticks_until_stopped() {
        let counter = Arc::new(Mutex::new(Counter::default()));
        let handle = FrameLoop::spawn(
            counter.clone(),
            FrameLoopOptions {
                period: Duration::from_millis(5),
                max_step_secs: 0.1,
            },
        );
        assert!(handle.is_active());
        tokio::time::sleep(Duration::from_millis(120)).await;
        let frames = handle.stop().await;

        let after_stop = counter.lock().ticks;
        assert!(frames > 0);
        assert_eq!(after_stop as u64, frames);
        let state = counter.lock();
        assert!(state.elapsed > 0.0);
        assert!(state.largest_step <= 0.1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dropping_the_handle_ends_the_loop() {
        let counter = Arc::new(Mutex::new(Counter::default()));
        let handle = FrameLoop::spawn(
            counter.clone(),
            FrameLoopOptions {
                period: Duration::from_millis(5),
                max_step_secs: 0.1,
            },
        );
        tokio::time::sleep(Duration::from_millis(40)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_millis(30)).await;
        let settled = counter.lock().ticks;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(counter.lock().ticks, settled);
    }
}
