// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Mail dispatch.
//!
//! The handler only sees the [`Mailer`] trait. [`SmtpMailer`] hands messages
//! to an SMTP relay through lettre: a single attempt, no queue and no retry.

use crate::composer::{ComposedMessage, ReplyTo};
use crate::config::SmtpConfig;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    Address,
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::debug;

/// Mail dispatch failures.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid {field} address {value:?}: {source}")]
    Address {
        field: &'static str,
        value: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Something that can deliver a composed message.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &ComposedMessage) -> Result<(), MailError>;
}

/// SMTP relay transport.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the transport. No connection is opened until the first send.
    ///
    /// Port 465 wraps the connection in TLS from the start; other ports
    /// upgrade with STARTTLS when the relay offers it.
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let tls_parameters = TlsParameters::new(config.host.clone())?;
        let tls = if config.implicit_tls() {
            Tls::Wrapper(tls_parameters)
        } else {
            Tls::Opportunistic(tls_parameters)
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .tls(tls)
            .credentials(Credentials::new(config.user.clone(), config.pass.clone()))
            .build();

        Ok(Self { transport })
    }

    /// Verify the relay accepts a connection.
    pub async fn test_connection(&self) -> Result<bool, MailError> {
        Ok(self.transport.test_connection().await?)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &ComposedMessage) -> Result<(), MailError> {
        let email = build_message(message)?;
        let response = self.transport.send(email).await?;
        debug!(code = %response.code(), "SMTP relay accepted message");
        Ok(())
    }
}

/// Convert a composed message into a multipart/alternative lettre message.
pub fn build_message(message: &ComposedMessage) -> Result<Message, MailError> {
    Ok(Message::builder()
        .from(parse_mailbox("from", &message.from)?)
        .to(parse_mailbox("to", &message.to)?)
        .reply_to(reply_to_mailbox(&message.reply_to)?)
        .subject(message.subject.as_str())
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(message.text.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(message.html.clone()),
                ),
        )?)
}

fn parse_mailbox(field: &'static str, value: &str) -> Result<Mailbox, MailError> {
    value.parse().map_err(|source| MailError::Address {
        field,
        value: value.to_string(),
        source,
    })
}

/// The display name goes in as data; lettre quotes or encodes it as needed.
fn reply_to_mailbox(reply_to: &ReplyTo) -> Result<Mailbox, MailError> {
    let email: Address = reply_to.email.parse().map_err(|source| MailError::Address {
        field: "reply-to",
        value: reply_to.email.clone(),
        source,
    })?;
    Ok(Mailbox::new(Some(reply_to.name.clone()), email))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::compose;
    use crate::config::MailConfig;
    use crate::validator::validate;
    use serde_json::json;

    fn composed() -> ComposedMessage {
        ComposedMessage {
            from: "website@example.org".to_string(),
            to: "office@example.org".to_string(),
            reply_to: ReplyTo {
                name: "Jane Doe".to_string(),
                email: "jane@example.com".to_string(),
            },
            subject: "Kidz Montessori Academy - Contact Form: Jane Doe".to_string(),
            text: "Name: Jane Doe".to_string(),
            html: "<p>Jane Doe</p>".to_string(),
        }
    }

    #[test]
    fn test_build_message_headers() {
        let email = build_message(&composed()).unwrap();
        let formatted = String::from_utf8(email.formatted()).unwrap();

        assert!(formatted.contains("website@example.org"));
        assert!(formatted.contains("office@example.org"));
        assert!(formatted.contains("Reply-To: "));
        assert!(formatted.contains("<jane@example.com>"));
        assert!(formatted.contains("multipart/alternative"));
    }

    #[test]
    fn test_invalid_sender_reported() {
        let mut message = composed();
        message.from = "not an address".to_string();

        let err = build_message(&message).unwrap_err();
        assert!(matches!(err, MailError::Address { field: "from", .. }));
    }

    #[test]
    fn test_validated_hostile_names_still_build() {
        let mail = MailConfig {
            inbox_to: "office@example.org".to_string(),
            inbox_from: "website@example.org".to_string(),
            subject_prefix: "Kidz Montessori Academy".to_string(),
        };

        for name in [
            "<a href=\"https://evil.example\">Click</a>",
            "<img src=x onerror=alert(1)>",
            "O'Brien, \"Jim\" \\ Jr.",
            "Zoë <Ünïcode> Ø",
        ] {
            let fields = json!({
                "email": "x@evil.example",
                "name": name,
                "contact": "555-0100",
                "message": "hello",
            });
            let submission = validate(fields.as_object().unwrap()).unwrap();
            let composed = compose(&submission, &mail);

            let email = build_message(&composed)
                .unwrap_or_else(|e| panic!("{name:?} failed to build: {e}"));
            let formatted = String::from_utf8(email.formatted()).unwrap();
            assert!(formatted.contains("<x@evil.example>"), "{name:?}");
        }
    }

    #[test]
    fn test_invalid_reply_to_address_reported() {
        let mut message = composed();
        message.reply_to.email = "jane,x@example.com".to_string();

        let err = build_message(&message).unwrap_err();
        assert!(matches!(err, MailError::Address { field: "reply-to", .. }));
    }

    #[test]
    fn test_smtp_mailer_builds_for_both_tls_modes() {
        for port in [465, 587] {
            let config = SmtpConfig {
                host: "smtp.example.org".to_string(),
                port,
                user: "mailer".to_string(),
                pass: "secret".to_string(),
            };
            assert!(SmtpMailer::new(&config).is_ok());
        }
    }
}
