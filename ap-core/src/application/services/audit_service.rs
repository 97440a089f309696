// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Thin convenience layer over `AuditRepository` (spec.md §4.1): every other
//! application service calls through here instead of touching the
//! repository directly, so the action-naming convention stays in one place.

use std::sync::Arc;

use ap_domain::value_objects::{InvoiceId, UserId};
use ap_domain::{ApError, AuditLog, OverrideLog};
use serde_json::Value;

use crate::infrastructure::repositories::AuditRepository;

pub struct AuditService {
    audit: Arc<AuditRepository>,
}

impl AuditService {
    pub fn new(audit: Arc<AuditRepository>) -> Self {
        Self { audit }
    }

    pub async fn record(
        &self,
        actor_id: Option<UserId>,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        before_state: Option<Value>,
        after_state: Option<Value>,
    ) -> Result<(), ApError> {
        let log = AuditLog::record(actor_id, None, action, entity_type, entity_id, before_state, after_state);
        self.audit.record(&log).await
    }

    /// Records an invoice status transition for the trail (spec.md §4.1).
    pub async fn record_invoice_transition(
        &self,
        invoice_id: InvoiceId,
        actor_id: Option<UserId>,
        from: &str,
        to: &str,
    ) -> Result<(), ApError> {
        self.record(
            actor_id,
            "invoice.status_changed",
            "invoice",
            &invoice_id.to_string(),
            Some(Value::String(from.to_string())),
            Some(Value::String(to.to_string())),
        )
        .await
    }

    /// Records a manual status override, distinct from a routine transition
    /// because it carries a mandatory reason (SPEC_FULL.md §2 supplement).
    pub async fn record_override(
        &self,
        invoice_id: InvoiceId,
        actor_id: UserId,
        from_status: &str,
        to_status: &str,
        reason: &str,
    ) -> Result<(), ApError> {
        let log = OverrideLog::new(invoice_id, actor_id, from_status, to_status, reason);
        self.audit.save_override(&log).await
    }

    pub async fn trail_for(&self, entity_type: &str, entity_id: &str) -> Result<Vec<AuditLog>, ApError> {
        self.audit.find_by_entity(entity_type, entity_id).await
    }
}
