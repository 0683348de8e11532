//! Message specification

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The longest subject line a message may carry
pub const MAX_SUBJECT_LENGTH: usize = 255;

/// A sparse description of one email message
///
/// Every field has a usable default, so a caller only fills in what it needs;
/// deserialization fills the rest the same way. A spec is never mutated once
/// it has been handed to a dispatcher.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageSpec {
    /// The sender address
    pub sender: String,

    /// The reply-to address, empty for none
    pub reply_to: String,

    /// The subject line
    pub subject: String,

    /// The plain text body
    pub text_body: String,

    /// The HTML body
    pub html_body: String,

    /// Primary recipient addresses
    pub to: Vec<String>,

    /// Carbon-copy recipient addresses
    pub cc: Vec<String>,

    /// Blind-carbon-copy recipient addresses
    pub bcc: Vec<String>,

    /// Drop malformed recipient addresses instead of failing the send
    pub ignore_address_errors: bool,

    /// Paths of files to attach
    pub attachments: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn test_defaults_are_empty() {
        let spec = MessageSpec::default();

        assert_eq!(spec.sender, "");
        assert_eq!(spec.reply_to, "");
        assert_eq!(spec.subject, "");
        assert!(spec.to.is_empty());
        assert!(spec.cc.is_empty());
        assert!(spec.bcc.is_empty());
        assert!(!spec.ignore_address_errors);
        assert!(spec.attachments.is_empty());
    }

    #[test]
    fn test_sparse_json_fills_defaults() -> TestResult {
        let spec: MessageSpec =
            serde_json::from_str(r#"{"sender": "a@x.com", "to": ["b@x.com"]}"#)?;

        assert_eq!(spec.sender, "a@x.com");
        assert_eq!(spec.to, vec!["b@x.com".to_string()]);
        assert_eq!(spec.subject, "");
        assert!(spec.cc.is_empty());

        Ok(())
    }

    #[test]
    fn test_each_spec_gets_fresh_containers() {
        let mut first = MessageSpec::default();
        first.to.push("a@x.com".to_string());

        let second = MessageSpec::default();

        assert!(second.to.is_empty());
    }
}
