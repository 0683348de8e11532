//! SMTP mailer implementation

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use lettre::{
    address::Envelope,
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        response::{Category, Severity},
    },
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info};

use crate::domain::communication::{
    email_addresses::{
        validate_address, validate_addresses, AddressKind, EmailAddress,
    },
    mailer::{Encryption, Mailer, MailerError, MessageSpec, ServerConfig, MAX_SUBJECT_LENGTH},
};

/// The validated address set of one message
struct Recipients {
    sender: EmailAddress,
    reply_to: Option<EmailAddress>,
    to: Vec<EmailAddress>,
    cc: Vec<EmailAddress>,
    bcc: Vec<EmailAddress>,
}

impl Recipients {
    fn envelope(&self) -> Result<Envelope, MailerError> {
        let from = parse_address(&self.sender)?;

        let rcpts = self
            .to
            .iter()
            .chain(self.cc.iter())
            .chain(self.bcc.iter())
            .map(parse_address)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Envelope::new(Some(from), rcpts)?)
    }
}

fn parse_address(address: &EmailAddress) -> Result<Address, MailerError> {
    address
        .as_str()
        .parse()
        .map_err(|err| MailerError::UnknownError(anyhow!("unusable address {address}: {err}")))
}

fn mailbox(address: &EmailAddress) -> Result<Mailbox, MailerError> {
    Ok(Mailbox::new(None, parse_address(address)?))
}

/// SMTP mailer
///
/// Validates a [`MessageSpec`], assembles the MIME document, and transmits it
/// through the server described by a [`ServerConfig`].
#[derive(Debug, Default, Clone)]
pub struct SmtpMailer {
    skip_transmit: bool,
}

impl SmtpMailer {
    /// Create a mailer that transmits over the network
    pub fn new() -> Self {
        Self {
            skip_transmit: false,
        }
    }

    /// Create a mailer that validates and builds messages but never connects
    pub fn dry_run() -> Self {
        Self {
            skip_transmit: true,
        }
    }

    /// Validate the addresses and shape of `spec`
    fn recipients(&self, spec: &MessageSpec) -> Result<Recipients, MailerError> {
        let sender = validate_address(&spec.sender, AddressKind::Sender)?;

        let reply_to = if spec.reply_to.is_empty() {
            None
        } else {
            Some(validate_address(&spec.reply_to, AddressKind::ReplyTo)?)
        };

        if spec.subject.chars().count() > MAX_SUBJECT_LENGTH {
            return Err(MailerError::SubjectTooLong);
        }

        if spec.to.is_empty() && spec.cc.is_empty() && spec.bcc.is_empty() {
            return Err(MailerError::NoRecipients);
        }

        let ignore = spec.ignore_address_errors;
        let to = validate_addresses(&spec.to, AddressKind::To, ignore)?;
        let cc = validate_addresses(&spec.cc, AddressKind::Cc, ignore)?;
        let bcc = validate_addresses(&spec.bcc, AddressKind::Bcc, ignore)?;

        // Filtering may have emptied every list; a message nobody would
        // receive fails rather than silently going nowhere.
        if to.is_empty() && cc.is_empty() && bcc.is_empty() {
            return Err(MailerError::NoRecipients);
        }

        Ok(Recipients {
            sender,
            reply_to,
            to,
            cc,
            bcc,
        })
    }

    fn check_attachments(spec: &MessageSpec) -> Result<(), MailerError> {
        for path in &spec.attachments {
            if !path.is_file() {
                return Err(MailerError::AttachmentMissing(path.clone()));
            }
        }

        Ok(())
    }

    /// Assemble the MIME document
    ///
    /// The document is a `multipart/mixed` carrying a `multipart/related`
    /// with the `multipart/alternative` bodies, followed by one part per
    /// attachment. Blind-carbon-copy recipients appear only in the envelope,
    /// never in a header.
    async fn document(
        &self,
        spec: &MessageSpec,
        recipients: &Recipients,
    ) -> Result<Message, MailerError> {
        let mut builder = Message::builder()
            .from(mailbox(&recipients.sender)?)
            .subject(spec.subject.clone());

        if let Some(reply_to) = &recipients.reply_to {
            builder = builder.reply_to(mailbox(reply_to)?);
        }

        for to in &recipients.to {
            builder = builder.to(mailbox(to)?);
        }

        for cc in &recipients.cc {
            builder = builder.cc(mailbox(cc)?);
        }

        let bodies = match (!spec.text_body.is_empty(), !spec.html_body.is_empty()) {
            (true, true) => {
                MultiPart::alternative_plain_html(spec.text_body.clone(), spec.html_body.clone())
            }
            (true, false) => {
                MultiPart::alternative().singlepart(SinglePart::plain(spec.text_body.clone()))
            }
            (false, true) => {
                MultiPart::alternative().singlepart(SinglePart::html(spec.html_body.clone()))
            }
            (false, false) => MultiPart::alternative().singlepart(SinglePart::plain(String::new())),
        };

        let mut mixed = MultiPart::mixed().multipart(MultiPart::related().multipart(bodies));

        for path in &spec.attachments {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("could not read attachment {}", path.display()))?;

            let mime = mime_guess::from_path(path).first_or_octet_stream();
            let content_type = ContentType::parse(mime.as_ref())
                .map_err(|err| anyhow!("unusable attachment type {mime}: {err}"))?;

            let filename = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment".to_string());

            mixed = mixed.singlepart(Attachment::new(filename).body(bytes, content_type));
        }

        Ok(builder.multipart(mixed)?)
    }

    /// Build the transport for `server`, authenticating as `sender` when only
    /// a password was configured
    fn transport(
        &self,
        server: &ServerConfig,
        sender: &str,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailerError> {
        let unreachable = |source| MailerError::ServerUnreachable {
            host: server.host.clone(),
            source,
        };

        let mut builder = match server.resolved_encryption() {
            Encryption::Ssl => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&server.host).map_err(unreachable)?
            }
            Encryption::Tls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&server.host)
                .map_err(unreachable)?,
            Encryption::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&server.host)
            }
        };

        builder = builder
            .port(server.resolved_port())
            .timeout(Some(server.timeout));

        if let Some((username, password)) = server.credentials(sender) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(builder.build())
    }
}

/// Sort a transport failure into the mailer taxonomy
///
/// Permanent 53x replies are authentication rejections; anything else that
/// carries an SMTP code, or failed client-side mid-session, is a transport
/// refusal; failures with no SMTP code never got a usable connection.
fn classify_send_error(
    server: &ServerConfig,
    username: Option<&str>,
    err: lettre::transport::smtp::Error,
) -> MailerError {
    match err.status() {
        Some(code)
            if matches!(code.severity, Severity::PermanentNegativeCompletion)
                && matches!(code.category, Category::Unspecified3) =>
        {
            MailerError::AuthenticationFailed {
                username: username.unwrap_or_default().to_string(),
                source: err,
            }
        }
        Some(_) => MailerError::Transport(err),
        None if err.is_client() => MailerError::Transport(err),
        None => MailerError::ServerUnreachable {
            host: server.host.clone(),
            source: err,
        },
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn validate(&self, spec: &MessageSpec) -> Result<(), MailerError> {
        self.recipients(spec)?;
        Self::check_attachments(spec)?;

        Ok(())
    }

    async fn send(&self, spec: &MessageSpec, server: &ServerConfig) -> Result<(), MailerError> {
        let recipients = self.recipients(spec)?;
        Self::check_attachments(spec)?;

        let document = self.document(spec, &recipients).await?;
        let envelope = recipients.envelope()?;

        if self.skip_transmit {
            debug!(subject = %spec.subject, "dry run, skipping transmission");
            return Ok(());
        }

        let credentials = server.credentials(recipients.sender.as_str());
        let username = credentials.as_ref().map(|(username, _)| username.as_str());

        let transport = self.transport(server, recipients.sender.as_str())?;

        transport
            .send_raw(&envelope, &document.formatted())
            .await
            .map_err(|err| classify_send_error(server, username, err))?;

        info!(
            subject = %spec.subject,
            recipients = recipients.to.len() + recipients.cc.len() + recipients.bcc.len(),
            "email sent"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use testresult::TestResult;

    use crate::domain::communication::email_addresses::AddressError;

    use super::*;

    fn spec() -> MessageSpec {
        MessageSpec {
            sender: "a@x.com".to_string(),
            subject: "hello".to_string(),
            text_body: "plain text".to_string(),
            to: vec!["b@x.com".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_sender_is_rejected() {
        let mut spec = spec();
        spec.sender = String::new();

        let result = SmtpMailer::new().validate(&spec);

        assert!(matches!(
            result,
            Err(MailerError::Address(AddressError::Empty {
                kind: AddressKind::Sender
            }))
        ));
    }

    #[test]
    fn test_no_recipients_is_rejected() {
        let mut spec = spec();
        spec.to.clear();

        let result = SmtpMailer::new().validate(&spec);

        assert!(matches!(result, Err(MailerError::NoRecipients)));
    }

    #[test]
    fn test_filtering_away_every_recipient_is_rejected() {
        let mut spec = spec();
        spec.to = vec!["broken@".to_string(), "also-broken".to_string()];
        spec.ignore_address_errors = true;

        let result = SmtpMailer::new().validate(&spec);

        assert!(matches!(result, Err(MailerError::NoRecipients)));
    }

    #[test]
    fn test_invalid_recipient_is_rejected_without_ignore() {
        let mut spec = spec();
        spec.cc = vec!["broken@".to_string()];

        let result = SmtpMailer::new().validate(&spec);

        assert!(matches!(
            result,
            Err(MailerError::Address(AddressError::Invalid {
                kind: AddressKind::Cc,
                ..
            }))
        ));
    }

    #[test]
    fn test_overlong_subject_is_rejected() {
        let mut spec = spec();
        spec.subject = "s".repeat(MAX_SUBJECT_LENGTH + 1);

        let result = SmtpMailer::new().validate(&spec);

        assert!(matches!(result, Err(MailerError::SubjectTooLong)));
    }

    #[test]
    fn test_subject_at_the_cap_is_accepted() {
        let mut spec = spec();
        spec.subject = "s".repeat(MAX_SUBJECT_LENGTH);

        assert!(SmtpMailer::new().validate(&spec).is_ok());
    }

    #[test]
    fn test_missing_attachment_is_rejected() {
        let mut spec = spec();
        spec.attachments = vec!["/no/such/file.pdf".into()];

        let result = SmtpMailer::new().validate(&spec);

        assert!(matches!(result, Err(MailerError::AttachmentMissing(_))));
    }

    #[tokio::test]
    async fn test_dry_run_sends_without_a_server() -> TestResult {
        let mailer = SmtpMailer::dry_run();

        mailer
            .send(&spec(), &ServerConfig::new("smtp.example.com"))
            .await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_bcc_stays_out_of_the_headers() -> TestResult {
        let mailer = SmtpMailer::new();
        let mut spec = spec();
        spec.bcc = vec!["hidden@x.com".to_string()];

        let recipients = mailer.recipients(&spec)?;
        let document = mailer.document(&spec, &recipients).await?;
        let rendered = String::from_utf8(document.formatted())?;

        assert!(!rendered.contains("hidden@x.com"));

        let envelope = recipients.envelope()?;
        assert_eq!(envelope.to().len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_document_carries_attachments() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("notes.txt");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "attached contents")?;

        let mailer = SmtpMailer::new();
        let mut spec = spec();
        spec.attachments = vec![path];

        let recipients = mailer.recipients(&spec)?;
        let document = mailer.document(&spec, &recipients).await?;
        let rendered = String::from_utf8(document.formatted())?;

        assert!(rendered.contains("multipart/mixed"));
        assert!(rendered.contains("attachment"));
        assert!(rendered.contains("notes"));

        Ok(())
    }

    #[tokio::test]
    async fn test_document_offers_plain_and_html_alternatives() -> TestResult {
        let mailer = SmtpMailer::new();
        let mut spec = spec();
        spec.html_body = "<p>rich text</p>".to_string();

        let recipients = mailer.recipients(&spec)?;
        let document = mailer.document(&spec, &recipients).await?;
        let rendered = String::from_utf8(document.formatted())?;

        assert!(rendered.contains("multipart/alternative"));
        assert!(rendered.contains("plain text"));
        assert!(rendered.contains("<p>rich text</p>"));

        Ok(())
    }
}
