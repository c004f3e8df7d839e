use crate::consolidator::{Consolidator, PassOutcome};
use crate::{ConsolidationStats, IndexerError, Result};
use log::{debug, error, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

const TICK_REASON: &str = "tick";

/// Emitted after every pass that actually ran.
#[derive(Debug, Clone)]
pub struct ConsolidationUpdate {
    pub completed_at: SystemTime,
    pub duration_ms: u64,
    pub stats: Option<ConsolidationStats>,
    pub success: bool,
    pub reason: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsolidatorHealth {
    pub last_success: Option<SystemTime>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub last_duration_ms: Option<u64>,
    pub passes: u64,
    pub failures: u64,
    pub idle_ticks: u64,
    pub skipped_ticks: u64,
    pub last_stats: Option<ConsolidationStats>,
}

impl ConsolidatorHealth {
    fn initial() -> Self {
        Self {
            last_success: None,
            last_error: None,
            consecutive_failures: 0,
            last_duration_ms: None,
            passes: 0,
            failures: 0,
            idle_ticks: 0,
            skipped_ticks: 0,
            last_stats: None,
        }
    }
}

/// Drives a [`Consolidator`] from a periodic timer on a tokio task.
///
/// Passes run inline in the task loop, so two passes never overlap; a tick
/// that comes due while a pass is running is dropped.
#[derive(Clone)]
pub struct ConsolidationWorker {
    inner: Arc<ConsolidationWorkerInner>,
}

struct ConsolidationWorkerInner {
    command_tx: mpsc::Sender<WorkerCommand>,
    update_tx: broadcast::Sender<ConsolidationUpdate>,
    health_tx: watch::Sender<ConsolidatorHealth>,
    task: Mutex<Option<JoinHandle<()>>>,
}

enum WorkerCommand {
    Trigger { reason: String, force: bool },
    Shutdown,
}

impl ConsolidationWorker {
    /// Spawns the timer loop. Must be called from within a tokio runtime.
    pub fn start(consolidator: Arc<Consolidator>, tick_interval: Duration) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (health_tx, _) = watch::channel(ConsolidatorHealth::initial());
        let (update_tx, _) = broadcast::channel(32);

        let task = spawn_consolidation_loop(
            consolidator,
            tick_interval,
            command_rx,
            update_tx.clone(),
            health_tx.clone(),
        );

        Self {
            inner: Arc::new(ConsolidationWorkerInner {
                command_tx,
                update_tx,
                health_tx,
                task: Mutex::new(Some(task)),
            }),
        }
    }

    /// Requests a pass now. `force` bypasses the trigger threshold.
    pub async fn trigger(&self, reason: impl Into<String>, force: bool) -> Result<()> {
        self.inner
            .command_tx
            .send(WorkerCommand::Trigger {
                reason: reason.into(),
                force,
            })
            .await
            .map_err(|e| IndexerError::Other(format!("failed to send trigger: {e}")))?;
        Ok(())
    }

    /// Stops the loop and waits for it to exit. A pass already running is
    /// finished first, so the store is never left half consolidated.
    pub async fn shutdown(&self) {
        let _ = self.inner.command_tx.send(WorkerCommand::Shutdown).await;
        let task = self.inner.task.lock().await.take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!("Consolidation worker ended abnormally: {err}");
            }
        }
    }

    #[must_use]
    pub fn subscribe_updates(&self) -> broadcast::Receiver<ConsolidationUpdate> {
        self.inner.update_tx.subscribe()
    }

    #[must_use]
    pub fn health_snapshot(&self) -> ConsolidatorHealth {
        self.inner.health_tx.borrow().clone()
    }

    #[must_use]
    pub fn health_stream(&self) -> watch::Receiver<ConsolidatorHealth> {
        self.inner.health_tx.subscribe()
    }
}

impl Drop for ConsolidationWorker {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            let _ = self.inner.command_tx.try_send(WorkerCommand::Shutdown);
        }
    }
}

fn spawn_consolidation_loop(
    consolidator: Arc<Consolidator>,
    tick_interval: Duration,
    mut command_rx: mpsc::Receiver<WorkerCommand>,
    update_tx: broadcast::Sender<ConsolidationUpdate>,
    health_tx: watch::Sender<ConsolidatorHealth>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(time::Instant::now() + tick_interval, tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut health = ConsolidatorHealth::initial();

        loop {
            let (reason, force) = tokio::select! {
                _ = ticker.tick() => (TICK_REASON.to_string(), false),
                cmd = command_rx.recv() => match cmd {
                    Some(WorkerCommand::Trigger { reason, force }) => (reason, force),
                    Some(WorkerCommand::Shutdown) | None => break,
                },
            };

            let started = time::Instant::now();
            let outcome = if force {
                consolidator.run_pass().await
            } else {
                consolidator.tick().await
            };
            #[allow(clippy::cast_possible_truncation)]
            let duration = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(PassOutcome::Idle { .. }) => {
                    health.idle_ticks += 1;
                    health_tx.send_replace(health.clone());
                }
                Ok(PassOutcome::Skipped) => {
                    warn!("Consolidation pass still running; skipped {reason}");
                    health.skipped_ticks += 1;
                    health_tx.send_replace(health.clone());
                }
                Ok(PassOutcome::Completed(stats)) => {
                    health.last_success = Some(SystemTime::now());
                    health.last_error = None;
                    health.consecutive_failures = 0;
                    health.last_duration_ms = Some(duration);
                    health.passes += 1;
                    health.last_stats = Some(stats.clone());
                    health_tx.send_replace(health.clone());
                    let _ = update_tx.send(ConsolidationUpdate {
                        completed_at: SystemTime::now(),
                        duration_ms: duration,
                        stats: Some(stats),
                        success: true,
                        reason,
                        error: None,
                    });
                }
                Err(err) => {
                    // The gate is already open again; the next tick retries.
                    error!("Consolidation pass failed ({reason}): {err}");
                    let message = err.to_string();
                    health.last_error = Some(message.clone());
                    health.consecutive_failures += 1;
                    health.failures += 1;
                    health.last_duration_ms = Some(duration);
                    health_tx.send_replace(health.clone());
                    let _ = update_tx.send(ConsolidationUpdate {
                        completed_at: SystemTime::now(),
                        duration_ms: duration,
                        stats: None,
                        success: false,
                        reason,
                        error: Some(message),
                    });
                }
            }
        }
        debug!("Consolidation worker stopped");
    })
}
