//! Worker pools
//!
//! Two interchangeable ways to fan a batch out: a bounded pool of in-process
//! tasks gated by a semaphore, and an unbounded pool of isolated worker
//! processes. Both produce the same report content for the same input.

use std::{path::PathBuf, process::Stdio, sync::Arc};

use async_trait::async_trait;
use tokio::{
    io::AsyncWriteExt,
    process::Command,
    sync::{mpsc, Semaphore},
    task::JoinHandle,
};
use tracing::warn;

use crate::domain::communication::mailer::{Mailer, MessageSpec, ServerConfig};

use super::{
    dispatch::dispatch_one,
    errors::DispatchError,
    journal::Journal,
    report::{DispatchFailure, DispatchResult},
    worker::WorkerJob,
};

/// One message awaiting dispatch, tagged with its position in the batch
#[derive(Clone, Debug)]
pub struct DispatchJob {
    /// The message's position in the original batch
    pub index: usize,

    /// The message to send
    pub spec: MessageSpec,
}

/// A pool of workers dispatching messages
///
/// The coordinator drives either implementation through this one capability:
/// hand over units of work, then wait for all of them. A worker's failure
/// never cancels its siblings; `join_all` surfaces every failure so none is
/// silently dropped.
#[async_trait]
pub trait WorkerPool: Send {
    /// Hand one message to the pool; returns as soon as the work is scheduled
    fn submit(&mut self, job: DispatchJob);

    /// Wait for every submitted unit to complete, collecting failures
    async fn join_all(&mut self) -> Vec<DispatchFailure>;
}

type Worker = (usize, String, JoinHandle<Option<DispatchFailure>>);

async fn join_workers(active: &mut Vec<Worker>) -> Vec<DispatchFailure> {
    let mut failures = Vec::new();

    for (index, subject, handle) in active.drain(..) {
        let outcome = handle.await.unwrap_or_else(|err| {
            Some(DispatchFailure {
                index,
                subject,
                error: DispatchError::Worker {
                    detail: err.to_string(),
                },
            })
        });

        if let Some(failure) = outcome {
            warn!(index = failure.index, error = %failure.error, "dispatch failed");
            failures.push(failure);
        }
    }

    failures
}

/// Bounded pool of in-process tasks
///
/// An admission gate caps how many dispatches are active at once: a worker
/// takes a permit before touching the mailer and gives it back when it
/// finishes, success or not.
#[derive(Debug)]
pub struct TaskPool<M: Mailer> {
    mailer: Arc<M>,
    server: Arc<ServerConfig>,
    journal: Arc<Journal>,
    results: mpsc::UnboundedSender<DispatchResult>,
    gate: Arc<Semaphore>,
    active: Vec<Worker>,
}

impl<M: Mailer> TaskPool<M> {
    /// A pool allowing at most `limit` concurrently active dispatches
    pub fn new(
        mailer: Arc<M>,
        server: Arc<ServerConfig>,
        journal: Arc<Journal>,
        results: mpsc::UnboundedSender<DispatchResult>,
        limit: usize,
    ) -> Self {
        Self {
            mailer,
            server,
            journal,
            results,
            gate: Arc::new(Semaphore::new(limit)),
            active: Vec::new(),
        }
    }
}

#[async_trait]
impl<M: Mailer> WorkerPool for TaskPool<M> {
    fn submit(&mut self, job: DispatchJob) {
        let mailer = Arc::clone(&self.mailer);
        let server = Arc::clone(&self.server);
        let journal = Arc::clone(&self.journal);
        let results = self.results.clone();
        let gate = Arc::clone(&self.gate);

        let index = job.index;
        let subject = job.spec.subject.clone();

        let handle = tokio::spawn(async move {
            let _permit = gate.acquire_owned().await.expect("admission gate closed");

            match dispatch_one(mailer.as_ref(), &job.spec, &server, &journal).await {
                Ok(result) => {
                    let _ = results.send(result);
                    None
                }
                Err(error) => Some(DispatchFailure {
                    index: job.index,
                    subject: job.spec.subject,
                    error,
                }),
            }
        });

        self.active.push((index, subject, handle));
    }

    async fn join_all(&mut self) -> Vec<DispatchFailure> {
        join_workers(&mut self.active).await
    }
}

/// How to launch the per-message worker binary
#[derive(Clone, Debug)]
pub struct WorkerCommand {
    program: PathBuf,
    dry_run: bool,
}

impl WorkerCommand {
    /// Launch `program` for each message
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            dry_run: false,
        }
    }

    /// Have workers validate and build messages without transmitting them
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Unbounded pool of isolated worker processes
///
/// One OS process per message; concurrency is limited only by what the system
/// can schedule. Each child receives its job as JSON on stdin, appends to the
/// journal itself, and answers with its result on stdout, which stands in for
/// the in-process result queue.
#[derive(Debug)]
pub struct ProcessPool {
    command: WorkerCommand,
    server: Arc<ServerConfig>,
    journal_path: PathBuf,
    results: mpsc::UnboundedSender<DispatchResult>,
    active: Vec<Worker>,
}

impl ProcessPool {
    /// A pool launching `command` once per message
    pub fn new(
        command: WorkerCommand,
        server: Arc<ServerConfig>,
        journal_path: PathBuf,
        results: mpsc::UnboundedSender<DispatchResult>,
    ) -> Self {
        Self {
            command,
            server,
            journal_path,
            results,
            active: Vec::new(),
        }
    }
}

#[async_trait]
impl WorkerPool for ProcessPool {
    fn submit(&mut self, job: DispatchJob) {
        let command = self.command.clone();
        let payload = WorkerJob {
            spec: job.spec,
            server: (*self.server).clone(),
            journal_path: self.journal_path.clone(),
        };
        let results = self.results.clone();

        let index = job.index;
        let subject = payload.spec.subject.clone();
        let failure_subject = subject.clone();

        let handle = tokio::spawn(async move {
            match run_worker(&command, &payload).await {
                Ok(result) => {
                    let _ = results.send(result);
                    None
                }
                Err(error) => Some(DispatchFailure {
                    index,
                    subject: failure_subject,
                    error,
                }),
            }
        });

        self.active.push((index, subject, handle));
    }

    async fn join_all(&mut self) -> Vec<DispatchFailure> {
        join_workers(&mut self.active).await
    }
}

/// Run one worker process to completion and parse its result
async fn run_worker(
    command: &WorkerCommand,
    job: &WorkerJob,
) -> Result<DispatchResult, DispatchError> {
    let worker_error = |detail: String| DispatchError::Worker { detail };

    let payload = serde_json::to_vec(job).map_err(|err| worker_error(err.to_string()))?;

    let mut launch = Command::new(&command.program);
    if command.dry_run {
        launch.arg("--dry-run");
    }
    launch
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = launch.spawn().map_err(|err| {
        worker_error(format!(
            "could not launch {}: {err}",
            command.program.display()
        ))
    })?;

    let Some(mut stdin) = child.stdin.take() else {
        return Err(worker_error("worker stdin unavailable".to_string()));
    };
    stdin
        .write_all(&payload)
        .await
        .map_err(|err| worker_error(format!("could not hand job to worker: {err}")))?;
    drop(stdin);

    let output = child
        .wait_with_output()
        .await
        .map_err(|err| worker_error(format!("could not collect worker: {err}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.trim();
        return Err(worker_error(if detail.is_empty() {
            output.status.to_string()
        } else {
            detail.to_string()
        }));
    }

    serde_json::from_slice(&output.stdout)
        .map_err(|err| worker_error(format!("unreadable worker result: {err}")))
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::domain::communication::mailer::{tests::MockMailer, MailerError};

    use super::*;

    fn job(index: usize, subject: &str) -> DispatchJob {
        DispatchJob {
            index,
            spec: MessageSpec {
                sender: "a@x.com".to_string(),
                subject: subject.to_string(),
                to: vec!["b@x.com".to_string()],
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_task_pool_reports_successes_on_the_queue() -> TestResult {
        let dir = tempfile::tempdir()?;
        let journal = Arc::new(Journal::open(dir.path().join("journal.txt"))?);
        let (results, mut collected) = mpsc::unbounded_channel();

        let mut mailer = MockMailer::new();
        mailer.expect_send().times(2).returning(|_, _| Ok(()));

        let mut pool = TaskPool::new(
            Arc::new(mailer),
            Arc::new(ServerConfig::new("smtp.example.com")),
            journal,
            results,
            4,
        );

        pool.submit(job(1, "one"));
        pool.submit(job(2, "two"));
        let failures = pool.join_all().await;

        assert!(failures.is_empty());

        let mut sent = Vec::new();
        while let Ok(result) = collected.try_recv() {
            sent.push(result.subject);
        }
        sent.sort();
        assert_eq!(sent, vec!["one".to_string(), "two".to_string()]);

        Ok(())
    }

    #[tokio::test]
    async fn test_task_pool_failure_keeps_its_batch_index() -> TestResult {
        let dir = tempfile::tempdir()?;
        let journal = Arc::new(Journal::open(dir.path().join("journal.txt"))?);
        let (results, mut collected) = mpsc::unbounded_channel();

        let mut mailer = MockMailer::new();
        mailer.expect_send().returning(|spec, _| {
            if spec.subject == "bad" {
                Err(MailerError::NoRecipients)
            } else {
                Ok(())
            }
        });

        let mut pool = TaskPool::new(
            Arc::new(mailer),
            Arc::new(ServerConfig::new("smtp.example.com")),
            journal,
            results,
            4,
        );

        pool.submit(job(1, "good"));
        pool.submit(job(2, "bad"));
        let failures = pool.join_all().await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 2);
        assert_eq!(failures[0].subject, "bad");

        let mut sent = Vec::new();
        while let Ok(result) = collected.try_recv() {
            sent.push(result.subject);
        }
        assert_eq!(sent, vec!["good".to_string()]);

        Ok(())
    }
}
