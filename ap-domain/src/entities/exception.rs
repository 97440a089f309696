// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{
    ExceptionCode, ExceptionCommentId, ExceptionRecordId, ExceptionSeverity, ExceptionStatus,
    InvoiceId, UserId,
};

/// Open issues needing human resolution (spec.md §3). Invariant: at most one
/// `open` exception per `(invoice, code)` — enforced by the repository's
/// upsert, not by this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionRecord {
    pub id: ExceptionRecordId,
    pub invoice_id: InvoiceId,
    pub code: ExceptionCode,
    pub description: String,
    pub severity: ExceptionSeverity,
    pub status: ExceptionStatus,
    pub assignee_id: Option<UserId>,
    pub resolver_id: Option<UserId>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
    pub ai_root_cause: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExceptionRecord {
    pub fn open(invoice_id: InvoiceId, code: ExceptionCode, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ExceptionRecordId::new(),
            invoice_id,
            code,
            description: description.into(),
            severity: code.default_severity(),
            status: ExceptionStatus::Open,
            assignee_id: None,
            resolver_id: None,
            resolved_at: None,
            resolution_notes: None,
            ai_root_cause: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_severity(mut self, severity: ExceptionSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Append-only comments on an `ExceptionRecord` (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionComment {
    pub id: ExceptionCommentId,
    pub exception_record_id: ExceptionRecordId,
    pub author_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
