// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Concrete implementations of `ap-domain`'s outbound ports, plus the
//! approval-token and mailbox-scanning helpers the application services use.

pub mod blob_store;
pub mod email_adapter;
pub mod fx_adapter;
pub mod hmac_token_service;
pub mod llm_client;
pub mod mailbox_poller;

pub use blob_store::FilesystemBlobStore;
pub use email_adapter::{LoggingEmailAdapter, SmtpEmailAdapter};
pub use fx_adapter::StaticFxAdapter;
pub use hmac_token_service::HmacTokenService;
pub use llm_client::{HttpLlmClient, StubLlmClient};
pub use mailbox_poller::{IngestCandidate, MailboxPoller};
