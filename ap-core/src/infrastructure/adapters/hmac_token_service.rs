// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Email-approval token issuance and verification (spec.md §6). The raw
//! token `<task_uuid>:<approve|reject>:<opaque_uuid>` is carried in the
//! notification email's URL and never stored; only its HMAC-SHA256 digest
//! (hex-encoded) lives in `ApprovalToken::token_hash`. Verifying a presented
//! token recomputes the digest under the same secret and compares.

use ap_domain::value_objects::{ApprovalAction, ApprovalTaskId};
use ap_domain::ApError;
use ring::hmac;
use uuid::Uuid;

pub struct HmacTokenService {
    key: hmac::Key,
}

impl HmacTokenService {
    pub fn new(secret: &[u8]) -> Self {
        Self { key: hmac::Key::new(hmac::HMAC_SHA256, secret) }
    }

    /// Builds a fresh raw token for `task_id`/`action` and its hex digest.
    /// Returns `(raw_token, token_hash)` — only `token_hash` is persisted.
    pub fn issue(&self, task_id: ApprovalTaskId, action: ApprovalAction) -> (String, String) {
        let opaque = Uuid::new_v4();
        let raw = format!("{task_id}:{}:{opaque}", action.as_str());
        let hash = self.digest(&raw);
        (raw, hash)
    }

    pub fn digest(&self, raw_token: &str) -> String {
        let tag = hmac::sign(&self.key, raw_token.as_bytes());
        hex::encode(tag.as_ref())
    }

    /// Parses `<task_uuid>:<approve|reject>:<opaque_uuid>`, returning
    /// `(task_id, action)` on a well-formed token.
    pub fn parse(raw_token: &str) -> Result<(ApprovalTaskId, ApprovalAction), ApError> {
        let mut parts = raw_token.splitn(3, ':');
        let task_id = parts.next().ok_or(ApError::TokenInvalid)?;
        let action = parts.next().ok_or(ApError::TokenInvalid)?;
        if parts.next().is_none() {
            return Err(ApError::TokenInvalid);
        }

        let task_uuid = Uuid::parse_str(task_id).map_err(|_| ApError::TokenInvalid)?;
        let action = ApprovalAction::parse(action).ok_or(ApError::TokenInvalid)?;
        Ok((ApprovalTaskId::from_uuid(task_uuid), action))
    }
}
