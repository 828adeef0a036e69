//! Background status watch

use adapter_core::{ExecutionPhase, JobId, PhaseReport, RunPolicy};
use cluster::ClusterBackend;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::JobSubmitter;

/// Shutdown signal sender
pub type ShutdownSender = broadcast::Sender<()>;

/// Shutdown signal receiver
pub type ShutdownReceiver = broadcast::Receiver<()>;

/// Create a shutdown channel; every watch gets its own receiver via `subscribe`
pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    broadcast::channel(1)
}

impl<B: ClusterBackend + 'static> JobSubmitter<B> {
    /// Poll a job in the background and stream its phase changes.
    ///
    /// The first report is emitted right away, then one per phase change.
    /// The task stops after a terminal phase, on shutdown, or once the
    /// stream is dropped.
    pub fn watch(
        &self,
        job_id: JobId,
        run_policy: RunPolicy,
        mut shutdown: ShutdownReceiver,
    ) -> ReceiverStream<PhaseReport> {
        let (tx, rx) = mpsc::channel(self.config().status.channel_capacity.max(1));
        let submitter = self.clone();
        let interval = self.config().status.poll_interval;

        tokio::spawn(async move {
            let mut last: Option<ExecutionPhase> = None;

            loop {
                let report = submitter.poll(&job_id, &run_policy).await;
                let phase = report.phase;

                if last != Some(phase) {
                    info!(
                        job_id = %job_id,
                        from = ?last,
                        to = %phase,
                        message = report.message.as_deref().unwrap_or(""),
                        "Job phase changed"
                    );
                    if tx.send(report).await.is_err() {
                        debug!(job_id = %job_id, "Watch receiver dropped");
                        break;
                    }
                    last = Some(phase);
                }

                if phase.is_terminal() {
                    break;
                }

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown.recv() => {
                        info!(job_id = %job_id, "Watch shutting down");
                        break;
                    }
                    _ = tx.closed() => {
                        debug!(job_id = %job_id, "Watch receiver dropped");
                        break;
                    }
                }
            }
        });

        ReceiverStream::new(rx)
    }
}
