// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Approval workflow orchestration (spec.md §4.9): builds the chain of
//! tasks a matched invoice routes through, issues the email action tokens,
//! and processes approve/reject decisions under the repository's row lock.

use std::collections::HashMap;
use std::sync::Arc;

use ap_domain::services::approval::{apply_decision, build_approval_chain, required_approval_count};
use ap_domain::services::fraud_scoring::RiskBand;
use ap_domain::services::EmailPort;
use ap_domain::value_objects::{ApprovalAction, ApprovalChannel, ApprovalTaskId, ApprovalTaskStatus, InvoiceId, UserId};
use ap_domain::{ApError, ApprovalMatrixRule, ApprovalTask, Invoice};
use chrono::{DateTime, Duration, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::infrastructure::adapters::HmacTokenService;
use crate::infrastructure::config::app_settings::ApproverAssignment;
use crate::infrastructure::repositories::ApprovalRepository;

/// Resolved effect of an approve/reject decision, for the orchestrator to
/// apply onto the invoice's status.
pub enum InvoiceApprovalEffect {
    None,
    Approved,
    Rejected,
}

pub struct ApprovalService {
    approvals: Arc<ApprovalRepository>,
    tokens: Arc<HmacTokenService>,
    email: Arc<dyn EmailPort>,
    role_directory: HashMap<String, ApproverAssignment>,
    base_url: String,
    token_expire_hours: i64,
}

impl ApprovalService {
    pub fn new(
        approvals: Arc<ApprovalRepository>,
        tokens: Arc<HmacTokenService>,
        email: Arc<dyn EmailPort>,
        role_directory: HashMap<String, ApproverAssignment>,
        base_url: String,
        token_expire_hours: i64,
    ) -> Self {
        Self { approvals, tokens, email, role_directory, base_url, token_expire_hours }
    }

    /// Builds the approval chain for `invoice` against the active matrix
    /// (spec.md §4.9), creates one task per matching step, and emails each
    /// approver a one-time approve/reject link.
    pub async fn create_chain(
        &self,
        invoice: &Invoice,
        matrix_rules: &[ApprovalMatrixRule],
        fraud_band: RiskBand,
        department: Option<&str>,
        category: Option<&str>,
        due_at: DateTime<Utc>,
    ) -> Result<Vec<ApprovalTask>, ApError> {
        let amount = invoice.total_amount.unwrap_or(0.0);
        let chain = build_approval_chain(matrix_rules, amount, department, category);
        let required_count = required_approval_count(fraud_band);

        let mut tasks = Vec::with_capacity(chain.len());
        for rule in chain {
            let Some(assignment) = self.role_directory.get(&rule.approver_role) else {
                warn!(role = %rule.approver_role, "no approver assigned for role, skipping approval step");
                continue;
            };
            let approver_uuid = Uuid::parse_str(&assignment.user_id)
                .map_err(|e| ApError::Configuration(format!("invalid approver user id for role {}: {e}", rule.approver_role)))?;
            let approver_id = UserId::from_uuid(approver_uuid);

            let now = Utc::now();
            let delegate_id = self
                .approvals
                .find_active_delegations_for(approver_id)
                .await?
                .into_iter()
                .find(|d| d.covers(now))
                .map(|d| d.delegate_id);

            let task = match delegate_id {
                Some(delegate_id) => ApprovalTask::new(invoice.id, delegate_id, rule.step_order, required_count, due_at, Some(approver_id)),
                None => ApprovalTask::new(invoice.id, approver_id, rule.step_order, required_count, due_at, None),
            };
            self.approvals.save_task(&task).await?;
            self.issue_and_notify(&task, &assignment.email, invoice).await?;
            tasks.push(task);
        }

        Ok(tasks)
    }

    /// Same as `create_chain`, but loads the active matrix rules from the
    /// repository instead of taking them as an argument — the path the
    /// pipeline orchestrator uses.
    pub async fn create_chain_from_active_matrix(
        &self,
        invoice: &Invoice,
        fraud_band: RiskBand,
        department: Option<&str>,
        category: Option<&str>,
        due_at: DateTime<Utc>,
    ) -> Result<Vec<ApprovalTask>, ApError> {
        let matrix_rules = self.approvals.list_active_matrix_rules().await?;
        self.create_chain(invoice, &matrix_rules, fraud_band, department, category, due_at).await
    }

    async fn issue_and_notify(&self, task: &ApprovalTask, approver_email: &str, invoice: &Invoice) -> Result<(), ApError> {
        let (approve_raw, approve_hash) = self.tokens.issue(task.id, ApprovalAction::Approve);
        let (reject_raw, reject_hash) = self.tokens.issue(task.id, ApprovalAction::Reject);
        let expires_at = Utc::now() + Duration::hours(self.token_expire_hours);

        for (raw, hash, action) in [
            (&approve_raw, approve_hash, ApprovalAction::Approve),
            (&reject_raw, reject_hash, ApprovalAction::Reject),
        ] {
            self.approvals
                .save_token(&ap_domain::ApprovalToken {
                    id: ap_domain::value_objects::ApprovalTokenId::new(),
                    task_id: task.id,
                    token_hash: hash,
                    action,
                    expires_at,
                    used_at: None,
                    is_used: false,
                    created_at: Utc::now(),
                })
                .await?;
            let _ = raw;
        }

        let invoice_number = invoice.invoice_number.as_deref().unwrap_or("(unassigned)");
        let approve_url = format!("{}/approvals/{}/decide?token={}", self.base_url, task.id, approve_raw);
        let reject_url = format!("{}/approvals/{}/decide?token={}", self.base_url, task.id, reject_raw);
        self.email.send_approval_request(approver_email, invoice_number, &approve_url, &reject_url).await
    }

    /// Verifies a raw token from an email link, applies the decision it
    /// carries, and marks the token used (spec.md §4.9, §6). Returns the
    /// invoice the decided task belongs to alongside the effect, so a
    /// caller can drive the invoice's own status transition (spec.md §7:
    /// "the approval service drives `approved`/`rejected`").
    pub async fn decide_by_token(&self, raw_token: &str) -> Result<(InvoiceId, InvoiceApprovalEffect), ApError> {
        let (task_id, action) = HmacTokenService::parse(raw_token)?;
        let hash = self.tokens.digest(raw_token);

        let token = self.approvals.find_token_by_hash(&hash).await?.ok_or(ApError::TokenInvalid)?;
        if token.is_used {
            return Err(ApError::TokenUsed);
        }
        if token.is_expired(Utc::now()) {
            return Err(ApError::TokenExpired);
        }

        let mut token = token;
        token.is_used = true;
        token.used_at = Some(Utc::now());
        self.approvals.save_token(&token).await?;

        self.decide(task_id, action, ApprovalChannel::Email).await
    }

    /// Applies an approve/reject decision to a task under the repository's
    /// row lock, delegating the state-machine rules to the pure domain
    /// function (spec.md §4.9).
    pub async fn decide(
        &self,
        task_id: ApprovalTaskId,
        action: ApprovalAction,
        channel: ApprovalChannel,
    ) -> Result<(InvoiceId, InvoiceApprovalEffect), ApError> {
        let task = self
            .approvals
            .apply_decision(task_id, |task| {
                let outcome = apply_decision(task.status, task.approved_count, task.required_count, action)?;
                task.status = outcome.new_task_status;
                task.approved_count = outcome.new_approved_count;
                task.decided_at = Some(Utc::now());
                task.decision_channel = Some(channel);
                Ok(())
            })
            .await?;

        let effect = match task.status {
            ApprovalTaskStatus::Approved => InvoiceApprovalEffect::Approved,
            ApprovalTaskStatus::Rejected => InvoiceApprovalEffect::Rejected,
            _ => InvoiceApprovalEffect::None,
        };
        Ok((task.invoice_id, effect))
    }
}
