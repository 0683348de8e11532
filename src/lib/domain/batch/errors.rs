//! Batch errors

use thiserror::Error;

use crate::domain::communication::mailer::MailerError;

use super::journal::JournalError;

/// Errors that fail a whole batch before any pooled work starts
#[derive(Debug, Error)]
pub enum BatchError {
    /// A batch parameter is out of range or malformed
    #[error("invalid value for `{param}`: {reason}")]
    InvalidArgument {
        /// The offending parameter
        param: &'static str,

        /// Why the value was rejected
        reason: &'static str,
    },

    /// The journal precondition failed
    #[error(transparent)]
    Journal(#[from] JournalError),

    /// The canary send of the first message failed
    #[error("canary send of the first message failed")]
    Canary(#[source] DispatchError),
}

/// Errors from dispatching one message
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The mailer rejected or could not transmit the message
    #[error(transparent)]
    Mailer(#[from] MailerError),

    /// The send succeeded but could not be recorded in the journal
    #[error("could not record the send in the journal")]
    Journal(#[source] std::io::Error),

    /// A pooled worker died without reporting a result
    #[error("worker terminated abnormally: {detail}")]
    Worker {
        /// What the worker left behind on the way out
        detail: String,
    },
}
