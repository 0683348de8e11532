//! Batch results and reporting

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::communication::mailer::MessageSpec;

use super::errors::DispatchError;

/// The recorded metadata of one successfully sent message
///
/// Recipient lists are the caller's original lists, before any
/// `ignore_address_errors` filtering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    /// The sender address
    pub sender: String,

    /// The reply-to address, empty for none
    pub reply_to: String,

    /// The subject line
    pub subject: String,

    /// Primary recipient addresses
    pub to: Vec<String>,

    /// Carbon-copy recipient addresses
    pub cc: Vec<String>,

    /// Blind-carbon-copy recipient addresses
    pub bcc: Vec<String>,
}

impl DispatchResult {
    /// The result record for a sent `spec`
    pub fn from_spec(spec: &MessageSpec) -> Self {
        Self {
            sender: spec.sender.clone(),
            reply_to: spec.reply_to.clone(),
            subject: spec.subject.clone(),
            to: spec.to.clone(),
            cc: spec.cc.clone(),
            bcc: spec.bcc.clone(),
        }
    }
}

impl fmt::Display for DispatchResult {
    /// The informal journal-line form, field=value pairs for operator
    /// inspection rather than machine round-trips
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sender={} reply_to={} subject={:?} to={} cc={} bcc={}",
            self.sender,
            self.reply_to,
            self.subject,
            self.to.join(","),
            self.cc.join(","),
            self.bcc.join(","),
        )
    }
}

/// Everything that was successfully sent in one batch run
///
/// Populated by draining the result queue after every worker has finished;
/// entry order carries no meaning.
#[derive(Debug, Default)]
pub struct EmailReport {
    results: Vec<DispatchResult>,
}

impl EmailReport {
    /// The number of successful sends
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether nothing was sent
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Consume the report, yielding the recorded results
    pub fn into_results(self) -> Vec<DispatchResult> {
        self.results
    }

    pub(crate) fn push(&mut self, result: DispatchResult) {
        self.results.push(result);
    }
}

/// One pooled message that failed to send
#[derive(Debug)]
pub struct DispatchFailure {
    /// The message's position in the original batch
    pub index: usize,

    /// The message's subject line
    pub subject: String,

    /// What went wrong
    pub error: DispatchError,
}

/// The outcome of a batch run: what was sent, and what failed
#[derive(Debug)]
pub struct BatchOutcome {
    /// Metadata of every successful send
    pub report: EmailReport,

    /// Pooled messages that failed, one entry per message
    pub failures: Vec<DispatchFailure>,
}
