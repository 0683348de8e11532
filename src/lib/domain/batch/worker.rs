//! Parent-to-worker handoff

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::communication::mailer::{MessageSpec, ServerConfig};

/// One message's worth of work, as handed to a worker process
///
/// The pool writes this as JSON on the child's stdin; the child answers with
/// a JSON [`DispatchResult`](super::DispatchResult) on stdout. Keeping the
/// payload on stdin keeps server credentials off the command line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerJob {
    /// The message to send
    pub spec: MessageSpec,

    /// The server to send through
    pub server: ServerConfig,

    /// The journal the worker appends to on success
    pub journal_path: PathBuf,
}
