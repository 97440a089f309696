// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Support entities: LLM call accounting (spec.md §4.4), reviewer feedback on
//! AI output (SPEC_FULL.md §2 supplement), recurring-invoice pattern
//! detection and SLA alerting (spec.md §4.11).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value_objects::{
    AiCallLogId, AiFeedbackId, InvoiceId, RecurringInvoicePatternId, RuleRecommendationId, SlaAlertId, UserId,
    VendorComplianceDocId, VendorId,
};

/// One row per LLM invocation, for cost and latency accounting (spec.md
/// §4.4). `error` is set instead of a response on a failed call; the caller
/// still gets billed for prompt tokens already sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiCallLog {
    pub id: AiCallLogId,
    pub invoice_id: Option<InvoiceId>,
    pub purpose: String,
    pub model_id: String,
    pub prompt: String,
    pub response: Option<String>,
    pub prompt_tokens: i32,
    pub completion_tokens: i32,
    pub latency_ms: i64,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AiCallLog {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Reviewer correction of an AI extraction or fraud/root-cause suggestion,
/// supplementing `AiCallLog` with a feedback loop the distilled spec omits
/// but `original_source/` records per LLM call. Feeds the periodic "feedback
/// analysis" scheduler job (SPEC_FULL.md §1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiFeedback {
    pub id: AiFeedbackId,
    pub ai_call_log_id: AiCallLogId,
    pub reviewer_id: UserId,
    pub was_correct: bool,
    /// Classifies the correction for the feedback-analysis job's grouping
    /// (spec.md §4.11), e.g. `"amount_field"`, `"gl_override"`,
    /// `"exception_status_change"`.
    pub feedback_type: String,
    /// The specific field corrected, when `feedback_type` names a field-level
    /// correction (e.g. `"total"`, `"vendor_id"`).
    pub field: Option<String>,
    pub corrected_value: Option<Value>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A vendor/amount/frequency cluster detected by the recurring-invoice job
/// (spec.md §4.11), used to flag invoices that break from an established
/// cadence as exceptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringInvoicePattern {
    pub id: RecurringInvoicePatternId,
    pub vendor_id: VendorId,
    pub frequency_days: i32,
    pub avg_amount: f64,
    pub sample_count: i32,
    pub last_seen_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaAlertSeverity {
    Warning,
    Critical,
}

/// Raised by the SLA sweep job when an invoice sits in a pending status past
/// its warning/critical threshold (spec.md §4.11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaAlert {
    pub id: SlaAlertId,
    pub invoice_id: InvoiceId,
    pub alert_type: String,
    pub severity: SlaAlertSeverity,
    pub message: String,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SlaAlert {
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleRecommendationStatus {
    Pending,
    Accepted,
    Dismissed,
}

/// A suggested rule-config change surfaced by the weekly feedback-analysis
/// job (spec.md §4.11) for admin review. Never applied automatically — see
/// SPEC_FULL.md §1's "LLM as opaque port" design note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRecommendation {
    pub id: RuleRecommendationId,
    pub rule_type: String,
    pub field: String,
    pub feedback_type: String,
    pub occurrence_count: i32,
    pub rationale: String,
    pub status: RuleRecommendationStatus,
    pub created_at: DateTime<Utc>,
}

impl RuleRecommendation {
    pub fn new_pending(
        rule_type: impl Into<String>,
        field: impl Into<String>,
        feedback_type: impl Into<String>,
        occurrence_count: i32,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            id: RuleRecommendationId::new(),
            rule_type: rule_type.into(),
            field: field.into(),
            feedback_type: feedback_type.into(),
            occurrence_count,
            rationale: rationale.into(),
            status: RuleRecommendationStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorComplianceDocStatus {
    Approved,
    Active,
    Expired,
}

impl VendorComplianceDocStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VendorComplianceDocStatus::Approved => "approved",
            VendorComplianceDocStatus::Active => "active",
            VendorComplianceDocStatus::Expired => "expired",
        }
    }
}

/// Minimal record of a vendor's compliance document (e.g. a W-9 or COI) past
/// its expiry date, for the weekly expiry sweep (spec.md §4.11). CRUD over
/// these rows is out of scope; only the status-flip the sweep performs lives
/// here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorComplianceDoc {
    pub id: VendorComplianceDocId,
    pub vendor_id: VendorId,
    pub doc_type: String,
    pub status: VendorComplianceDocStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl VendorComplianceDoc {
    pub fn is_expired_as_of(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, VendorComplianceDocStatus::Approved | VendorComplianceDocStatus::Active) && self.expires_at < now
    }
}
