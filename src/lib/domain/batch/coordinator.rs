//! Batch coordinator

use std::sync::Arc;

use tokio::{sync::mpsc, time::sleep};
use tracing::{debug, info};

use crate::domain::communication::mailer::Mailer;

use super::{
    dispatch::dispatch_one,
    errors::BatchError,
    journal::Journal,
    pool::{DispatchJob, ProcessPool, TaskPool, WorkerCommand, WorkerPool},
    report::{BatchOutcome, EmailReport},
    request::BatchRequest,
};

enum PoolStrategy {
    Tasks,
    Processes(WorkerCommand),
}

/// Runs batches of messages through a worker pool
///
/// The first message of every batch is a canary: it is dispatched
/// synchronously before any pooled work starts, so a bad server or bad
/// credentials cost one failed attempt instead of one per message.
#[derive(Debug, Clone)]
pub struct BatchCoordinator<M>
where
    M: Mailer,
{
    mailer: Arc<M>,
}

impl<M> BatchCoordinator<M>
where
    M: Mailer,
{
    /// Create a coordinator dispatching through `mailer`
    pub fn new(mailer: M) -> Self {
        Self {
            mailer: Arc::new(mailer),
        }
    }

    /// Run a batch on a bounded pool of in-process tasks
    ///
    /// # Arguments
    /// * `request` - The batch to run; `request.pool_limit` caps concurrency.
    ///
    /// # Returns
    /// A [`Result`] with the [`BatchOutcome`] once every message has been
    /// attempted, or a [`BatchError`] if the batch failed before any pooled
    /// work started.
    pub async fn run_tasks(&self, request: BatchRequest) -> Result<BatchOutcome, BatchError> {
        self.execute(request, PoolStrategy::Tasks).await
    }

    /// Run a batch with one isolated worker process per message
    ///
    /// # Arguments
    /// * `request` - The batch to run; `request.pool_limit` is ignored, the
    ///   process strategy is unbounded.
    /// * `worker` - How to launch the per-message worker binary.
    ///
    /// # Returns
    /// A [`Result`] with the [`BatchOutcome`] once every worker has exited,
    /// or a [`BatchError`] if the batch failed before any pooled work
    /// started.
    pub async fn run_processes(
        &self,
        request: BatchRequest,
        worker: WorkerCommand,
    ) -> Result<BatchOutcome, BatchError> {
        self.execute(request, PoolStrategy::Processes(worker)).await
    }

    async fn execute(
        &self,
        request: BatchRequest,
        strategy: PoolStrategy,
    ) -> Result<BatchOutcome, BatchError> {
        request.validate(matches!(strategy, PoolStrategy::Tasks))?;

        // Admit the journal before the canary so a bad path never costs
        // network traffic.
        let journal = Arc::new(Journal::open(&request.journal_path)?);
        let server = Arc::new(request.server.clone());

        let (results, mut collected) = mpsc::unbounded_channel();

        info!(
            messages = request.messages.len(),
            host = %server.host,
            "starting batch"
        );

        let canary = dispatch_one(
            self.mailer.as_ref(),
            &request.messages[0],
            &server,
            &journal,
        )
        .await
        .map_err(BatchError::Canary)?;
        let _ = results.send(canary);

        debug!("canary send succeeded");

        let mut failures = Vec::new();

        if request.messages.len() > 1 {
            let mut pool: Box<dyn WorkerPool> = match strategy {
                PoolStrategy::Tasks => Box::new(TaskPool::new(
                    Arc::clone(&self.mailer),
                    Arc::clone(&server),
                    Arc::clone(&journal),
                    results.clone(),
                    request.pool_limit,
                )),
                PoolStrategy::Processes(worker) => Box::new(ProcessPool::new(
                    worker,
                    Arc::clone(&server),
                    request.journal_path.clone(),
                    results.clone(),
                )),
            };

            for (offset, spec) in request.messages[1..].iter().enumerate() {
                pool.submit(DispatchJob {
                    index: offset + 1,
                    spec: spec.clone(),
                });
                sleep(request.wait_time).await;
            }

            failures = pool.join_all().await;
        }

        // Every worker has joined, so the queue is complete and stable.
        let mut report = EmailReport::default();
        while let Ok(result) = collected.try_recv() {
            report.push(result);
        }

        info!(
            sent = report.len(),
            failed = failures.len(),
            "batch finished"
        );

        Ok(BatchOutcome { report, failures })
    }
}
