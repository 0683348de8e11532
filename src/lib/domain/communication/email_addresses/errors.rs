use std::fmt;

use thiserror::Error;

/// The header an address was destined for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressKind {
    /// The message sender
    Sender,

    /// The reply-to address
    ReplyTo,

    /// A primary recipient
    To,

    /// A carbon-copy recipient
    Cc,

    /// A blind-carbon-copy recipient
    Bcc,
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            AddressKind::Sender => "sender",
            AddressKind::ReplyTo => "reply-to",
            AddressKind::To => "to",
            AddressKind::Cc => "cc",
            AddressKind::Bcc => "bcc",
        };

        write!(f, "{}", kind)
    }
}

/// An error describing a malformed address and where it appeared
#[derive(Debug, Error)]
pub enum AddressError {
    /// The address is empty
    #[error("{kind} address is empty")]
    Empty {
        /// The header the address was destined for
        kind: AddressKind,
    },

    /// The address does not parse as an email address
    #[error("invalid {kind} address: {address}")]
    Invalid {
        /// The header the address was destined for
        kind: AddressKind,

        /// The offending address
        address: String,
    },
}
