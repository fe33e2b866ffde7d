//! Orchestrator execution logic

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::channel::rendezvous;
use crate::config::BurnConfig;
use crate::error::{BurnError, BurnResult};
use crate::generator::WorkGenerator;
use crate::network::{NetworkProvisioner, NetworkSet};
use crate::report::StatusEvent;
use crate::shutdown::StopSignal;
use crate::traits::ContainerRuntime;
use crate::worker::{LifecycleExecutor, WorkerBuilder, WorkerStats};

use super::aggregator::{aggregate_worker_stats, RunSummary};

type WorkerResult = (usize, BurnResult<WorkerStats>);

/// Tasks spawned by a successful `start`
struct RunHandles {
    token: CancellationToken,
    workers: JoinSet<WorkerResult>,
    generator: JoinHandle<u64>,
    started_at: Instant,
}

enum RunState {
    Idle,
    Running(RunHandles),
    Finished,
}

/// Orchestrator manages the burn-in lifecycle
///
/// Owns the runtime handle and the network set. `start` pulls the image,
/// provisions networks and spawns the pool plus the generator; `stop`
/// asks them to drain; `wait` joins everything and reports.
pub struct Orchestrator {
    /// Run configuration
    pub(crate) config: Arc<BurnConfig>,

    /// Container runtime (shared across workers)
    pub(crate) runtime: Arc<dyn ContainerRuntime>,

    /// Status sender, handed to the executor on start
    status_tx: Option<mpsc::Sender<StatusEvent>>,

    /// Graceful stop latch
    stop: StopSignal,

    /// Networks provisioned by `start`
    networks: Option<NetworkSet>,

    state: RunState,
}

impl Orchestrator {
    /// Create a new orchestrator
    ///
    /// Use `OrchestratorBuilder` for a more ergonomic construction.
    pub fn new(
        config: BurnConfig,
        runtime: Arc<dyn ContainerRuntime>,
        status_tx: mpsc::Sender<StatusEvent>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            runtime,
            status_tx: Some(status_tx),
            stop: StopSignal::new(),
            networks: None,
            state: RunState::Idle,
        }
    }

    /// Get the run configuration
    pub fn config(&self) -> &BurnConfig {
        &self.config
    }

    /// Networks in use, once started
    pub fn networks(&self) -> Option<&NetworkSet> {
        self.networks.as_ref()
    }

    /// Handle that can stop the run from another task
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Pull the image, provision networks, and spawn the pool and generator
    ///
    /// `cancel` is the upstream cancellation source. The run works on a
    /// child token of it, so a fatal error inside the run never cancels the
    /// caller's token.
    ///
    /// # Errors
    ///
    /// Fails if called twice, if the pull or provisioning fails, or if
    /// `cancel` fires before setup is done.
    pub async fn start(&mut self, cancel: CancellationToken) -> BurnResult<()> {
        if !matches!(self.state, RunState::Idle) {
            return Err(BurnError::orchestration("orchestrator already started"));
        }
        // A failed start is not retried.
        self.state = RunState::Finished;

        let status_tx = self
            .status_tx
            .take()
            .ok_or_else(|| BurnError::orchestration("status channel already consumed"))?;

        let networks = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!("Run cancelled during setup");
                return Err(BurnError::Cancelled);
            }
            prepared = self.prepare() => prepared?,
        };

        let token = cancel.child_token();
        let pool_size = self.config.pool_size();
        let executor = Arc::new(LifecycleExecutor::new(
            Arc::clone(&self.runtime),
            Arc::clone(&self.config),
            networks.clone(),
            status_tx,
        ));

        tracing::info!(
            image = %self.config.image,
            workers = pool_size,
            networks = networks.len(),
            min_sleep_secs = self.config.min_sleep_secs,
            max_sleep_secs = self.config.max_sleep_secs,
            "Starting burn-in"
        );

        let (queue_tx, queue_rx) = rendezvous();

        let mut workers = JoinSet::new();
        for worker_id in 0..pool_size {
            let worker = WorkerBuilder::new(worker_id)
                .executor(Arc::clone(&executor))
                .queue(queue_rx.clone())
                .stop(self.stop.listener())
                .cancel(token.clone())
                .build()?;

            workers.spawn(async move { (worker_id, worker.run().await) });
        }
        drop(queue_rx);

        let generator = WorkGenerator::new(queue_tx, self.stop.listener(), token.clone());
        let generator = tokio::spawn(generator.run());

        self.networks = Some(networks);
        self.state = RunState::Running(RunHandles {
            token,
            workers,
            generator,
            started_at: Instant::now(),
        });

        Ok(())
    }

    /// Trigger a graceful stop
    ///
    /// The generator stops producing and workers take no new index;
    /// in-flight workloads run to completion. Returns `false` if the run was
    /// already stopping.
    pub fn stop(&self) -> bool {
        let first = self.stop.trigger();
        if first {
            tracing::info!("Stop requested, draining in-flight workloads");
        } else {
            tracing::debug!("Stop already requested");
        }
        first
    }

    /// Wait for the generator and every worker to exit
    ///
    /// Returns the first fatal error if any worker hit one. Once this
    /// returns no task of the run is alive.
    ///
    /// # Errors
    ///
    /// Fails if called before `start`, after a previous `wait`, or if the
    /// run ended with a fatal error.
    pub async fn wait(&mut self) -> BurnResult<RunSummary> {
        let mut handles = match std::mem::replace(&mut self.state, RunState::Finished) {
            RunState::Running(handles) => handles,
            RunState::Idle => {
                self.state = RunState::Idle;
                return Err(BurnError::orchestration("wait called before start"));
            }
            RunState::Finished => {
                return Err(BurnError::orchestration("orchestrator is not running"));
            }
        };

        let mut workers = Vec::new();
        let mut first_error: Option<BurnError> = None;

        while let Some(joined) = handles.workers.join_next().await {
            match joined {
                Ok((worker_id, Ok(stats))) => {
                    tracing::debug!(
                        worker_id,
                        completed = stats.completed,
                        wait_errors = stats.wait_errors,
                        "Worker completed"
                    );
                    workers.push(stats);
                }
                Ok((worker_id, Err(e))) => {
                    tracing::error!(worker_id, error = %e, "Worker returned error");
                    record_first(&mut first_error, e);
                }
                Err(e) => {
                    handles.token.cancel();
                    tracing::error!(error = %e, "Worker task panicked");
                    record_first(&mut first_error, BurnError::task(format!("worker task: {e}")));
                }
            }
        }

        let dispatched = match handles.generator.await {
            Ok(dispatched) => dispatched,
            Err(e) => {
                tracing::error!(error = %e, "Generator task panicked");
                record_first(&mut first_error, BurnError::task(format!("generator task: {e}")));
                0
            }
        };

        if let Some(e) = first_error {
            return Err(e);
        }

        let aggregate = aggregate_worker_stats(&workers);
        tracing::info!(
            elapsed_secs = handles.started_at.elapsed().as_secs_f64(),
            dispatched,
            completed = aggregate.total_completed,
            failed_exits = aggregate.total_failed_exits,
            wait_errors = aggregate.total_wait_errors,
            abandoned = aggregate.total_abandoned,
            rate = aggregate.workloads_per_second,
            "Burn-in finished"
        );

        Ok(RunSummary {
            workers,
            aggregate,
            dispatched,
        })
    }

    /// Start, then wait, stopping on Ctrl+C
    ///
    /// The first Ctrl+C stops gracefully; a second one cancels the run and
    /// abandons in-flight waits. With `run_for` set the run also stops once
    /// that much time has passed.
    pub async fn run_with_signal_handling(
        &mut self,
        cancel: CancellationToken,
        run_for: Option<Duration>,
    ) -> BurnResult<RunSummary> {
        let run_cancel = cancel.child_token();
        let stop = self.stop.clone();
        let signal_cancel = run_cancel.clone();

        // Spawn signal handler task
        let signal_handle = tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                return;
            }
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
            stop.trigger();

            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Received second Ctrl+C, abandoning in-flight workloads");
                signal_cancel.cancel();
            }
        });

        let timer_handle = run_for.map(|limit| self.spawn_timer(limit));

        let result = match self.start(run_cancel).await {
            Ok(()) => self.wait().await,
            Err(e) => Err(e),
        };

        signal_handle.abort();
        if let Some(handle) = timer_handle {
            handle.abort();
        }

        result
    }

    /// Start, then stop after `timeout` and wait
    pub async fn run_with_timeout(
        &mut self,
        cancel: CancellationToken,
        timeout: Duration,
    ) -> BurnResult<RunSummary> {
        self.start(cancel).await?;

        let timer_handle = self.spawn_timer(timeout);
        let result = self.wait().await;
        timer_handle.abort();

        result
    }

    /// Remove networks left behind by earlier runs
    pub async fn prune_networks(&self) -> BurnResult<usize> {
        NetworkProvisioner::new(Arc::clone(&self.runtime), &self.config)
            .prune()
            .await
    }

    fn spawn_timer(&self, limit: Duration) -> JoinHandle<()> {
        let stop = self.stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            tracing::info!(secs = limit.as_secs_f64(), "Run time reached, initiating shutdown...");
            stop.trigger();
        })
    }

    async fn prepare(&self) -> BurnResult<NetworkSet> {
        self.pull_image().await?;
        NetworkProvisioner::new(Arc::clone(&self.runtime), &self.config)
            .provision(self.config.network_count)
            .await
    }

    async fn pull_image(&self) -> BurnResult<()> {
        let image = &self.config.image;
        tracing::info!(
            image = %image,
            runtime = self.runtime.runtime_name(),
            "Pulling image"
        );

        let mut progress = self.runtime.pull_image(image);
        while let Some(item) = progress.next().await {
            let item = item.map_err(|source| BurnError::PullImage {
                image: image.clone(),
                source,
            })?;
            tracing::debug!(image = %image, progress = %item, "Pull progress");
        }

        Ok(())
    }
}

fn record_first(slot: &mut Option<BurnError>, err: BurnError) {
    if slot.is_none() {
        *slot = Some(err);
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            RunState::Idle => "idle",
            RunState::Running(_) => "running",
            RunState::Finished => "finished",
        };
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("runtime", &self.runtime.runtime_name())
            .field("networks", &self.networks.as_ref().map(NetworkSet::len))
            .field("stopped", &self.stop.is_triggered())
            .field("state", &state)
            .finish()
    }
}
