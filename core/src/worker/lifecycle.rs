//! Single workload lifecycle: create -> start -> wait for removal -> report

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::BurnConfig;
use crate::error::{BurnError, BurnResult, WaitError};
use crate::network::NetworkSet;
use crate::report::StatusEvent;
use crate::traits::ContainerRuntime;
use crate::workload::{RunOutcome, RunReport, SleepRange, WorkIndex, WorkloadSpec};

/// Drives one workload at a time through its lifecycle
///
/// Shared by every worker. Create and start failures are fatal for the whole
/// run; a failed removal wait only affects the workload it belongs to. No
/// step is ever retried.
pub struct LifecycleExecutor {
    runtime: Arc<dyn ContainerRuntime>,
    config: Arc<BurnConfig>,
    networks: NetworkSet,
    sleep: SleepRange,
    status_tx: mpsc::Sender<StatusEvent>,
}

impl LifecycleExecutor {
    /// Create an executor over a provisioned network set
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        config: Arc<BurnConfig>,
        networks: NetworkSet,
        status_tx: mpsc::Sender<StatusEvent>,
    ) -> Self {
        let sleep = SleepRange::from_config(&config);
        Self {
            runtime,
            config,
            networks,
            sleep,
            status_tx,
        }
    }

    /// Derive the workload for `index`
    pub fn workload(&self, index: WorkIndex) -> WorkloadSpec {
        WorkloadSpec::derive(index, &self.networks, &self.sleep, &mut rand::thread_rng())
    }

    /// Run the full lifecycle for `index`
    ///
    /// `cancel` abandons the lifecycle at whatever step it has reached; an
    /// abandoned workload is not reported. The stop signal is deliberately
    /// not consulted here, so a stopping run lets in-flight workloads finish.
    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        index: WorkIndex,
    ) -> BurnResult<RunReport> {
        let spec = self.workload(index);
        if cancel.is_cancelled() {
            return Ok(finish(spec, RunOutcome::Abandoned));
        }

        self.emit(
            cancel,
            StatusEvent::Scheduled {
                index,
                name: spec.name.clone(),
                network_id: spec.network_id.clone(),
                duration_secs: spec.duration_secs,
            },
        )
        .await;

        let container = spec.container_spec(&self.config);

        let id = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(finish(spec, RunOutcome::Abandoned)),
            created = self.runtime.create_container(&container) => {
                created.map_err(|source| BurnError::CreateContainer {
                    name: spec.name.clone(),
                    source,
                })?
            }
        };
        tracing::debug!(%index, name = %spec.name, id = %id, "Container created");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(finish(spec, RunOutcome::Abandoned)),
            started = self.runtime.start_container(&id) => {
                started.map_err(|source| BurnError::StartContainer {
                    name: spec.name.clone(),
                    source,
                })?
            }
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => RunOutcome::Abandoned,
            waited = self.runtime.wait_for_removal(&id) => match waited {
                Ok(exit) => RunOutcome::Completed(exit),
                Err(err) => {
                    tracing::warn!(%index, name = %spec.name, error = %err, "Wait for removal failed");
                    RunOutcome::WaitFailed(WaitError(err))
                }
            },
        };

        let report = finish(spec, outcome);
        if let Some(event) = StatusEvent::from_report(&report) {
            self.emit(cancel, event).await;
        }
        Ok(report)
    }

    /// Send a status line, dropping it once the run is cancelled
    ///
    /// The status channel is bounded, so a reader that stops reading must
    /// not keep a cancelled worker parked here.
    async fn emit(&self, cancel: &CancellationToken, event: StatusEvent) {
        let index = event.index();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(%index, "Run cancelled; status event dropped");
            }
            sent = self.status_tx.send(event) => {
                if sent.is_err() {
                    tracing::debug!("Status receiver dropped; event discarded");
                }
            }
        }
    }
}

fn finish(spec: WorkloadSpec, outcome: RunOutcome) -> RunReport {
    RunReport {
        spec,
        outcome,
        finished_at: chrono::Utc::now(),
    }
}

impl std::fmt::Debug for LifecycleExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleExecutor")
            .field("runtime", &self.runtime.runtime_name())
            .field("image", &self.config.image)
            .field("networks", &self.networks.len())
            .field("sleep", &self.sleep)
            .finish()
    }
}
