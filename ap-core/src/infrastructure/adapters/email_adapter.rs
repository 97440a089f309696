// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `EmailPort` implementations. `LoggingEmailAdapter` is the default — it
//! records the notification via `tracing` instead of sending it, so tests
//! and `dry_run` runs never reach an SMTP server. `SmtpEmailAdapter` sends
//! for real via `lettre`.

use ap_domain::services::EmailPort;
use ap_domain::ApError;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

pub struct LoggingEmailAdapter;

impl LoggingEmailAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LoggingEmailAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailPort for LoggingEmailAdapter {
    async fn send_approval_request(&self, to: &str, invoice_number: &str, approve_url: &str, reject_url: &str) -> Result<(), ApError> {
        info!(
            to,
            invoice_number, approve_url, reject_url, "approval request email (logged, not sent)"
        );
        Ok(())
    }
}

pub struct SmtpEmailAdapter {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpEmailAdapter {
    pub fn new(relay: &str, username: String, password: String, from: impl Into<String>) -> Result<Self, ApError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(relay)
            .map_err(|e| ApError::Configuration(format!("invalid SMTP relay: {e}")))?
            .credentials(Credentials::new(username, password))
            .build();
        Ok(Self { transport, from: from.into() })
    }
}

#[async_trait]
impl EmailPort for SmtpEmailAdapter {
    async fn send_approval_request(&self, to: &str, invoice_number: &str, approve_url: &str, reject_url: &str) -> Result<(), ApError> {
        let body = format!(
            "Invoice {invoice_number} needs your approval.\n\nApprove: {approve_url}\nReject: {reject_url}\n"
        );
        let message = Message::builder()
            .from(self.from.parse().map_err(|e| ApError::Configuration(format!("invalid from address: {e}")))?)
            .to(to.parse().map_err(|e| ApError::Validation(format!("invalid recipient address: {e}")))?)
            .subject(format!("Approval needed: invoice {invoice_number}"))
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| ApError::Internal(format!("failed to build email: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| ApError::Internal(format!("smtp send failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logging_adapter_never_fails() {
        let adapter = LoggingEmailAdapter::new();
        adapter
            .send_approval_request("approver@example.com", "INV-001", "https://x/approve", "https://x/reject")
            .await
            .unwrap();
    }
}
