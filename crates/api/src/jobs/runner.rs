//! Background job infrastructure.
//!
//! Each registered job gets its own tokio task ticking at the job's
//! interval; a shared watch channel signals shutdown. A failing run is
//! logged and the loop keeps ticking.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How often a job runs.
#[derive(Debug, Clone, Copy)]
pub enum RunInterval {
    Seconds(u64),
    Minutes(u64),
}

impl RunInterval {
    pub fn duration(&self) -> Duration {
        match self {
            RunInterval::Seconds(secs) => Duration::from_secs(*secs),
            RunInterval::Minutes(mins) => Duration::from_secs(*mins * 60),
        }
    }
}

/// A background job.
#[async_trait::async_trait]
pub trait Job: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    fn interval(&self) -> RunInterval;

    async fn run(&self) -> anyhow::Result<()>;
}

/// Owns the job tasks and their shutdown signal.
pub struct JobRunner {
    jobs: Vec<Arc<dyn Job>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl JobRunner {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            jobs: Vec::new(),
            shutdown_tx,
            shutdown_rx,
            handles: Vec::new(),
        }
    }

    pub fn register<J: Job + 'static>(&mut self, job: J) {
        self.jobs.push(Arc::new(job));
    }

    /// Spawn one looping task per registered job. The first tick fires
    /// after one full interval, not immediately.
    pub fn start(&mut self) {
        info!(jobs = self.jobs.len(), "Starting background jobs");

        for job in &self.jobs {
            let job = Arc::clone(job);
            let mut shutdown_rx = self.shutdown_rx.clone();

            let handle = tokio::spawn(async move {
                let name = job.name();
                let mut interval = tokio::time::interval(job.interval().duration());
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                interval.tick().await;

                info!(job = name, interval = ?job.interval(), "Job scheduled");

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            let started = std::time::Instant::now();
                            match job.run().await {
                                Ok(()) => {
                                    tracing::debug!(
                                        job = name,
                                        elapsed_ms = started.elapsed().as_millis() as u64,
                                        "Job run finished"
                                    );
                                }
                                Err(e) => {
                                    error!(
                                        job = name,
                                        elapsed_ms = started.elapsed().as_millis() as u64,
                                        error = %e,
                                        "Job run failed"
                                    );
                                }
                            }
                        }
                        _ = shutdown_rx.changed() => {
                            if *shutdown_rx.borrow() {
                                info!(job = name, "Job stopping");
                                break;
                            }
                        }
                    }
                }
            });

            self.handles.push(handle);
        }
    }

    /// Signal all job loops to stop. Returns immediately.
    pub fn shutdown(&self) {
        info!("Stopping background jobs");
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for all job tasks to finish, bounded by `timeout`.
    pub async fn wait_for_shutdown(self, timeout: Duration) {
        let all_done = async {
            for handle in self.handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Job task panicked");
                }
            }
        };

        match tokio::time::timeout(timeout, all_done).await {
            Ok(()) => info!("All jobs stopped"),
            Err(_) => warn!(?timeout, "Job shutdown timed out"),
        }
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}
