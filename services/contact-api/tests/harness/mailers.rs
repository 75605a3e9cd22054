// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! In-memory `Mailer` doubles.

use async_trait::async_trait;
use contact_api::{
    composer::ComposedMessage,
    mailer::{build_message, MailError},
    Mailer,
};
use std::sync::Mutex;

/// Records every message instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<ComposedMessage>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<ComposedMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &ComposedMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Fails every send the way an unreachable relay would.
#[derive(Default)]
pub struct FailingMailer {
    attempts: Mutex<usize>,
}

impl FailingMailer {
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _message: &ComposedMessage) -> Result<(), MailError> {
        *self.attempts.lock().unwrap() += 1;
        let value = "unroutable inbox".to_string();
        Err(MailError::Address {
            field: "to",
            source: value.parse::<lettre::Address>().unwrap_err(),
            value,
        })
    }
}

/// Builds the real MIME message for every send and keeps the formatted
/// output, so lettre's header handling is exercised without a relay.
#[derive(Default)]
pub struct RenderingMailer {
    rendered: Mutex<Vec<String>>,
}

impl RenderingMailer {
    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RenderingMailer {
    async fn send(&self, message: &ComposedMessage) -> Result<(), MailError> {
        let built = build_message(message)?;
        let formatted = String::from_utf8_lossy(&built.formatted()).into_owned();
        self.rendered.lock().unwrap().push(formatted);
        Ok(())
    }
}
