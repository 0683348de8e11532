//! Mailer module

use async_trait::async_trait;

#[cfg(test)]
use mockall::mock;

mod errors;
mod message;
mod server;

pub use errors::MailerError;
pub use message::{MessageSpec, MAX_SUBJECT_LENGTH};
pub use server::{Encryption, ServerConfig};

/// Builds and transmits one email message
#[async_trait]
pub trait Mailer: Clone + Send + Sync + 'static {
    /// Check a message spec for problems without touching the network
    ///
    /// # Arguments
    /// * `spec` - The [`MessageSpec`] to check.
    ///
    /// # Returns
    /// A [`Result`] which is [`Ok`] when the spec would be accepted by
    /// [`Mailer::send`], or an [`Err`] containing the [`MailerError`] that
    /// `send` would report.
    fn validate(&self, spec: &MessageSpec) -> Result<(), MailerError>;

    /// Build the message described by `spec` and transmit it through `server`
    ///
    /// # Arguments
    /// * `spec` - The [`MessageSpec`] to build and send.
    /// * `server` - The [`ServerConfig`] to transmit through.
    ///
    /// # Returns
    /// A [`Result`] indicating success or failure.
    async fn send(&self, spec: &MessageSpec, server: &ServerConfig) -> Result<(), MailerError>;
}

#[cfg(test)]
mock! {
    pub Mailer {}

    impl Clone for Mailer {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl Mailer for Mailer {
        fn validate(&self, spec: &MessageSpec) -> Result<(), MailerError>;
        async fn send(&self, spec: &MessageSpec, server: &ServerConfig) -> Result<(), MailerError>;
    }
}
