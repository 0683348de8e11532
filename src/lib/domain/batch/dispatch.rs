//! Per-message dispatch unit

use tracing::debug;

use crate::domain::communication::mailer::{Mailer, MessageSpec, ServerConfig};

use super::{errors::DispatchError, journal::Journal, report::DispatchResult};

/// Send one message and record it in the journal
///
/// This is the unit of work every worker runs, and the canary path runs it
/// directly. Any mailer or journal failure propagates to the caller; a failed
/// message is never recorded anywhere.
///
/// # Arguments
/// * `mailer` - The [`Mailer`] that builds and transmits the message.
/// * `spec` - The message to send.
/// * `server` - The server to send through.
/// * `journal` - The journal recording successful sends.
///
/// # Returns
/// A [`Result`] with the [`DispatchResult`] of a successful send, for the
/// caller to enqueue on its result channel.
pub async fn dispatch_one<M: Mailer>(
    mailer: &M,
    spec: &MessageSpec,
    server: &ServerConfig,
    journal: &Journal,
) -> Result<DispatchResult, DispatchError> {
    mailer.send(spec, server).await?;

    let result = DispatchResult::from_spec(spec);
    journal.append(&result).map_err(DispatchError::Journal)?;

    debug!(subject = %spec.subject, "message dispatched");

    Ok(result)
}
