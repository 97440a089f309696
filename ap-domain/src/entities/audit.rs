// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `AuditLog` (spec.md §3, §4.1) and `OverrideLog` (SPEC_FULL.md §2
//! supplement): the platform's append-only trail of who did what.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value_objects::{AuditLogId, RuleVersionId, UserId};

/// Append-only. Nothing in this crate exposes a mutation path for an
/// existing row — only construction and repository insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: AuditLogId,
    pub actor_id: Option<UserId>,
    pub actor_email: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub before_state: Option<Value>,
    pub after_state: Option<Value>,
    pub rule_version_id: Option<RuleVersionId>,
    pub ip_address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        actor_id: Option<UserId>,
        actor_email: Option<String>,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        before_state: Option<Value>,
        after_state: Option<Value>,
    ) -> Self {
        Self {
            id: AuditLogId::new(),
            actor_id,
            actor_email,
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            before_state,
            after_state,
            rule_version_id: None,
            ip_address: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_rule_version(mut self, rule_version_id: RuleVersionId) -> Self {
        self.rule_version_id = Some(rule_version_id);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Justification trail for a manual status override performed outside the
/// normal matching/approval flow (an admin forcing an invoice to `approved`
/// or `paid`). Supplements `AuditLog` with a mandatory reason, mirroring how
/// the source system distinguishes routine transitions from overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideLog {
    pub id: AuditLogId,
    pub invoice_id: crate::value_objects::InvoiceId,
    pub actor_id: UserId,
    pub from_status: String,
    pub to_status: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl OverrideLog {
    pub fn new(
        invoice_id: crate::value_objects::InvoiceId,
        actor_id: UserId,
        from_status: impl Into<String>,
        to_status: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: AuditLogId::new(),
            invoice_id,
            actor_id,
            from_status: from_status.into(),
            to_status: to_status.into(),
            reason: reason.into(),
            created_at: Utc::now(),
        }
    }
}
