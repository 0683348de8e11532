//! SMTP server configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Connection encryption mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encryption {
    /// Plain connection, no encryption
    #[default]
    None,

    /// Implicit TLS from the first byte (SMTPS)
    Ssl,

    /// STARTTLS upgrade after the initial handshake
    Tls,
}

/// Connection details for one SMTP server, shared read-only by every dispatch
/// in a batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The SMTP host
    pub host: String,

    /// The SMTP port; 0 picks the conventional port for the encryption mode
    #[serde(default)]
    pub port: u16,

    /// The encryption mode; [`Encryption::None`] is inferred as TLS or SSL
    /// when `port` is one of the well-known submission ports
    #[serde(default)]
    pub encryption: Encryption,

    /// The authentication username; when empty but a password is set, the
    /// sender address is used instead
    #[serde(default)]
    pub username: String,

    /// The authentication password; empty disables authentication
    #[serde(default)]
    pub password: String,

    /// Connection timeout, must be non-zero
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
}

impl ServerConfig {
    /// Create a config for `host` with every other field at its default
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 0,
            encryption: Encryption::None,
            username: String::new(),
            password: String::new(),
            timeout: default_timeout(),
        }
    }

    /// The port to connect to, deriving the conventional port for the
    /// declared encryption mode when none was given
    pub fn resolved_port(&self) -> u16 {
        if self.port != 0 {
            return self.port;
        }

        match self.encryption {
            Encryption::Tls => 587,
            Encryption::Ssl => 465,
            Encryption::None => 25,
        }
    }

    /// The encryption mode to use, inferring TLS or SSL from the well-known
    /// submission ports when no mode was declared
    pub fn resolved_encryption(&self) -> Encryption {
        match self.encryption {
            Encryption::None => match self.port {
                587 => Encryption::Tls,
                465 => Encryption::Ssl,
                _ => Encryption::None,
            },
            declared => declared,
        }
    }

    /// The credentials to authenticate with, if any
    ///
    /// A password without a username authenticates as the sender address; a
    /// username without a password authenticates as nobody.
    pub fn credentials(&self, sender: &str) -> Option<(String, String)> {
        if self.password.is_empty() {
            return None;
        }

        let username = if self.username.is_empty() {
            sender.to_string()
        } else {
            self.username.clone()
        };

        Some((username, self.password.clone()))
    }
}
