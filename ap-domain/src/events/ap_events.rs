// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Invoice lifecycle events.
//!
//! Each variant carries the data a subscriber needs without re-fetching the
//! invoice: the audit writer turns these directly into `AuditLog` rows, and
//! the scheduler jobs use them to decide whether an SLA timer should start
//! or clear.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::{ApprovalAction, InvoiceStatus, MatchStatus, RuleVersionStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceIngested(InvoiceIngestedEvent),
    InvoiceStatusChanged(InvoiceStatusChangedEvent),
    MatchCompleted(MatchCompletedEvent),
    ExceptionOpened(ExceptionOpenedEvent),
    ExceptionResolved(ExceptionResolvedEvent),
    ApprovalRequested(ApprovalRequestedEvent),
    ApprovalDecided(ApprovalDecidedEvent),
    RulePublished(RulePublishedEvent),
    RuleArchived(RuleArchivedEvent),
}

pub trait DomainEvent {
    fn event_id(&self) -> Uuid;
    fn aggregate_id(&self) -> Uuid;
    fn event_type(&self) -> &'static str;
    fn occurred_at(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceIngestedEvent {
    pub event_id: Uuid,
    pub invoice_id: Uuid,
    pub vendor_id: Uuid,
    pub source: String,
    pub occurred_at: DateTime<Utc>,
}

impl InvoiceIngestedEvent {
    pub fn new(invoice_id: Uuid, vendor_id: Uuid, source: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            invoice_id,
            vendor_id,
            source: source.into(),
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceStatusChangedEvent {
    pub event_id: Uuid,
    pub invoice_id: Uuid,
    pub from_status: InvoiceStatus,
    pub to_status: InvoiceStatus,
    pub actor_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

impl InvoiceStatusChangedEvent {
    pub fn new(
        invoice_id: Uuid,
        from_status: InvoiceStatus,
        to_status: InvoiceStatus,
        actor_id: Option<Uuid>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            invoice_id,
            from_status,
            to_status,
            actor_id,
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCompletedEvent {
    pub event_id: Uuid,
    pub invoice_id: Uuid,
    pub match_result_id: Uuid,
    pub match_status: MatchStatus,
    pub header_variance_pct: f64,
    pub occurred_at: DateTime<Utc>,
}

impl MatchCompletedEvent {
    pub fn new(invoice_id: Uuid, match_result_id: Uuid, match_status: MatchStatus, header_variance_pct: f64) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            invoice_id,
            match_result_id,
            match_status,
            header_variance_pct,
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionOpenedEvent {
    pub event_id: Uuid,
    pub invoice_id: Uuid,
    pub exception_record_id: Uuid,
    pub code: String,
    pub occurred_at: DateTime<Utc>,
}

impl ExceptionOpenedEvent {
    pub fn new(invoice_id: Uuid, exception_record_id: Uuid, code: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            invoice_id,
            exception_record_id,
            code: code.into(),
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionResolvedEvent {
    pub event_id: Uuid,
    pub invoice_id: Uuid,
    pub exception_record_id: Uuid,
    pub resolver_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

impl ExceptionResolvedEvent {
    pub fn new(invoice_id: Uuid, exception_record_id: Uuid, resolver_id: Uuid) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            invoice_id,
            exception_record_id,
            resolver_id,
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequestedEvent {
    pub event_id: Uuid,
    pub invoice_id: Uuid,
    pub approval_task_id: Uuid,
    pub approver_id: Uuid,
    pub step_order: i32,
    pub occurred_at: DateTime<Utc>,
}

impl ApprovalRequestedEvent {
    pub fn new(invoice_id: Uuid, approval_task_id: Uuid, approver_id: Uuid, step_order: i32) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            invoice_id,
            approval_task_id,
            approver_id,
            step_order,
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalDecidedEvent {
    pub event_id: Uuid,
    pub invoice_id: Uuid,
    pub approval_task_id: Uuid,
    pub action: ApprovalAction,
    pub actor_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

impl ApprovalDecidedEvent {
    pub fn new(invoice_id: Uuid, approval_task_id: Uuid, action: ApprovalAction, actor_id: Uuid) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            invoice_id,
            approval_task_id,
            action,
            actor_id,
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulePublishedEvent {
    pub event_id: Uuid,
    pub rule_id: Uuid,
    pub rule_version_id: Uuid,
    pub version_number: i32,
    pub status: RuleVersionStatus,
    pub published_by: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

impl RulePublishedEvent {
    pub fn new(rule_id: Uuid, rule_version_id: Uuid, version_number: i32, published_by: Option<Uuid>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            rule_id,
            rule_version_id,
            version_number,
            status: RuleVersionStatus::Published,
            published_by,
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleArchivedEvent {
    pub event_id: Uuid,
    pub rule_id: Uuid,
    pub rule_version_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

impl RuleArchivedEvent {
    pub fn new(rule_id: Uuid, rule_version_id: Uuid) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            rule_id,
            rule_version_id,
            occurred_at: Utc::now(),
        }
    }
}

impl DomainEvent for InvoiceIngestedEvent {
    fn event_id(&self) -> Uuid {
        self.event_id
    }
    fn aggregate_id(&self) -> Uuid {
        self.invoice_id
    }
    fn event_type(&self) -> &'static str {
        "invoice.ingested"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl DomainEvent for InvoiceStatusChangedEvent {
    fn event_id(&self) -> Uuid {
        self.event_id
    }
    fn aggregate_id(&self) -> Uuid {
        self.invoice_id
    }
    fn event_type(&self) -> &'static str {
        "invoice.status_changed"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl DomainEvent for MatchCompletedEvent {
    fn event_id(&self) -> Uuid {
        self.event_id
    }
    fn aggregate_id(&self) -> Uuid {
        self.invoice_id
    }
    fn event_type(&self) -> &'static str {
        "invoice.match_completed"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl DomainEvent for ApprovalDecidedEvent {
    fn event_id(&self) -> Uuid {
        self.event_id
    }
    fn aggregate_id(&self) -> Uuid {
        self.invoice_id
    }
    fn event_type(&self) -> &'static str {
        "approval.decided"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl DomainEvent for RulePublishedEvent {
    fn event_id(&self) -> Uuid {
        self.event_id
    }
    fn aggregate_id(&self) -> Uuid {
        self.rule_id
    }
    fn event_type(&self) -> &'static str {
        "rule.published"
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
