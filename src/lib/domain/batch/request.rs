//! Batch request

use std::{path::PathBuf, time::Duration};

use crate::domain::communication::mailer::{MessageSpec, ServerConfig};

use super::errors::BatchError;

/// The default cap on concurrently active dispatches in the task strategy
pub const DEFAULT_POOL_LIMIT: usize = 10;

/// Everything needed to run one batch
#[derive(Clone, Debug)]
pub struct BatchRequest {
    /// The messages to send, in submission order
    pub messages: Vec<MessageSpec>,

    /// The server every message is sent through
    pub server: ServerConfig,

    /// Where the crash-recovery journal is written
    pub journal_path: PathBuf,

    /// How long the coordinator sleeps between successive submissions
    pub wait_time: Duration,

    /// Cap on concurrently active dispatches (task strategy only)
    pub pool_limit: usize,
}

impl BatchRequest {
    /// A request with no throttling delay and the default pool limit
    pub fn new(
        messages: Vec<MessageSpec>,
        server: ServerConfig,
        journal_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            messages,
            server,
            journal_path: journal_path.into(),
            wait_time: Duration::ZERO,
            pool_limit: DEFAULT_POOL_LIMIT,
        }
    }

    /// Sleep `wait_time` between successive submissions
    pub fn with_wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = wait_time;
        self
    }

    /// Cap concurrently active dispatches at `pool_limit` (task strategy)
    pub fn with_pool_limit(mut self, pool_limit: usize) -> Self {
        self.pool_limit = pool_limit;
        self
    }

    /// Admission checks, run before any filesystem or network side effect
    ///
    /// `bounded` is set for the task strategy, whose pool limit must be
    /// positive; the process strategy carries no limit.
    pub(crate) fn validate(&self, bounded: bool) -> Result<(), BatchError> {
        if self.messages.is_empty() {
            return Err(BatchError::InvalidArgument {
                param: "messages",
                reason: "batch contains no messages",
            });
        }

        if self.server.host.trim().is_empty() {
            return Err(BatchError::InvalidArgument {
                param: "server.host",
                reason: "SMTP server host is required",
            });
        }

        if self.server.timeout.is_zero() {
            return Err(BatchError::InvalidArgument {
                param: "server.timeout",
                reason: "timeout must be greater than zero",
            });
        }

        if bounded && self.pool_limit == 0 {
            return Err(BatchError::InvalidArgument {
                param: "pool_limit",
                reason: "pool limit must be greater than zero",
            });
        }

        Ok(())
    }
}
