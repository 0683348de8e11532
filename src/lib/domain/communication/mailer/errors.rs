//! Mailer errors

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::communication::email_addresses::AddressError;

/// Mailer errors
#[derive(Debug, Error)]
pub enum MailerError {
    /// A malformed or missing address
    #[error(transparent)]
    Address(#[from] AddressError),

    /// The subject line exceeds [`MAX_SUBJECT_LENGTH`](super::MAX_SUBJECT_LENGTH)
    #[error("subject is longer than 255 characters")]
    SubjectTooLong,

    /// No valid recipient address remained across to, cc, and bcc
    #[error("no valid recipient addresses in to, cc, or bcc")]
    NoRecipients,

    /// An attachment path does not point at a readable file
    #[error("attachment is not a readable file: {}", .0.display())]
    AttachmentMissing(PathBuf),

    /// The SMTP server could not be reached
    #[error("could not reach SMTP server {host}")]
    ServerUnreachable {
        /// The configured host
        host: String,

        /// The underlying transport error
        #[source]
        source: lettre::transport::smtp::Error,
    },

    /// The SMTP server rejected the credentials
    #[error("SMTP authentication failed for {username}")]
    AuthenticationFailed {
        /// The username presented to the server
        username: String,

        /// The underlying transport error
        #[source]
        source: lettre::transport::smtp::Error,
    },

    /// The SMTP server refused the message
    #[error("message was refused by the SMTP server")]
    Transport(#[source] lettre::transport::smtp::Error),

    /// Unknown error
    #[error(transparent)]
    UnknownError(#[from] anyhow::Error),
}

impl From<lettre::error::Error> for MailerError {
    fn from(err: lettre::error::Error) -> Self {
        MailerError::UnknownError(err.into())
    }
}
