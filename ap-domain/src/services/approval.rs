// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Approval-chain construction and decision state transitions (spec.md
//! §4.9). HMAC token generation/verification lives in ap-core, which owns
//! the signing secret; this module decides what the *task* and *invoice*
//! should become once a decision has already been authenticated.

use crate::entities::ApprovalMatrixRule;
use crate::error::ApError;
use crate::value_objects::{ApprovalAction, ApprovalTaskStatus};

use super::fraud_scoring::RiskBand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalChainStep {
    pub step_order: i32,
    pub approver_role: &'static str,
}

/// Selects and orders the matrix rules covering this invoice (spec.md
/// §4.9). `approver_role` is borrowed from the matching rule row's storage,
/// so callers that need owned data should map over the rules directly;
/// this helper exists for the common case of picking the covering subset.
pub fn build_approval_chain<'a>(
    rules: &'a [ApprovalMatrixRule],
    amount: f64,
    department: Option<&str>,
    category: Option<&str>,
) -> Vec<&'a ApprovalMatrixRule> {
    let mut covering: Vec<&ApprovalMatrixRule> = rules
        .iter()
        .filter(|r| r.covers(amount, department, category))
        .collect();
    covering.sort_by_key(|r| r.step_order);
    covering
}

/// Required approval count for the first task in the chain (spec.md §4.9):
/// 2 when the fraud band is `critical`, else 1.
pub fn required_approval_count(fraud_band: RiskBand) -> i32 {
    if fraud_band == RiskBand::Critical {
        2
    } else {
        1
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DecisionOutcome {
    pub new_task_status: ApprovalTaskStatus,
    pub new_approved_count: i32,
    pub advances_invoice: Option<InvoiceDecisionEffect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceDecisionEffect {
    Approved,
    Rejected,
}

/// Applies an already-authenticated decision to a task's current state
/// (spec.md §4.9). Authentication (token hash/expiry or actor-role check) is
/// the caller's job; this function only knows the task is allowed to
/// receive a decision.
pub fn apply_decision(
    current_status: ApprovalTaskStatus,
    current_approved_count: i32,
    required_count: i32,
    action: ApprovalAction,
) -> Result<DecisionOutcome, ApError> {
    if !current_status.accepts_decision() {
        return Err(ApError::AlreadyDecided(format!(
            "task is {}",
            current_status.as_str()
        )));
    }

    match action {
        ApprovalAction::Reject => Ok(DecisionOutcome {
            new_task_status: ApprovalTaskStatus::Rejected,
            new_approved_count: current_approved_count,
            advances_invoice: Some(InvoiceDecisionEffect::Rejected),
        }),
        ApprovalAction::Approve => {
            let base = if current_status == ApprovalTaskStatus::PartiallyApproved {
                current_approved_count
            } else {
                0
            };
            let approved_count = base + 1;
            if approved_count < required_count {
                Ok(DecisionOutcome {
                    new_task_status: ApprovalTaskStatus::PartiallyApproved,
                    new_approved_count: approved_count,
                    advances_invoice: None,
                })
            } else {
                Ok(DecisionOutcome {
                    new_task_status: ApprovalTaskStatus::Approved,
                    new_approved_count: approved_count,
                    advances_invoice: Some(InvoiceDecisionEffect::Approved),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::ApprovalMatrixRuleId;

    fn matrix_rule(step_order: i32, min: Option<f64>, max: Option<f64>) -> ApprovalMatrixRule {
        ApprovalMatrixRule {
            id: ApprovalMatrixRuleId::new(),
            step_order,
            approver_role: "MANAGER".into(),
            min_amount: min,
            max_amount: max,
            department: None,
            category: None,
            is_active: true,
        }
    }

    #[test]
    fn chain_is_ordered_by_step() {
        let rules = vec![matrix_rule(2, None, None), matrix_rule(1, None, None)];
        let chain = build_approval_chain(&rules, 100.0, None, None);
        assert_eq!(chain[0].step_order, 1);
        assert_eq!(chain[1].step_order, 2);
    }

    #[test]
    fn required_count_is_two_only_at_critical_band() {
        assert_eq!(required_approval_count(RiskBand::Critical), 2);
        assert_eq!(required_approval_count(RiskBand::High), 1);
        assert_eq!(required_approval_count(RiskBand::Low), 1);
    }

    #[test]
    fn reject_always_allowed_from_pending_or_partial() {
        let outcome = apply_decision(ApprovalTaskStatus::Pending, 0, 1, ApprovalAction::Reject).unwrap();
        assert_eq!(outcome.new_task_status, ApprovalTaskStatus::Rejected);
        assert_eq!(outcome.advances_invoice, Some(InvoiceDecisionEffect::Rejected));

        let outcome =
            apply_decision(ApprovalTaskStatus::PartiallyApproved, 1, 2, ApprovalAction::Reject).unwrap();
        assert_eq!(outcome.new_task_status, ApprovalTaskStatus::Rejected);
    }

    #[test]
    fn decision_on_terminal_task_fails_already_decided() {
        let result = apply_decision(ApprovalTaskStatus::Approved, 1, 1, ApprovalAction::Approve);
        assert!(matches!(result, Err(ApError::AlreadyDecided(_))));
    }

    #[test]
    fn scenario_dual_authorization_needs_two_approvals() {
        // spec.md §8 scenario 3.
        let first = apply_decision(ApprovalTaskStatus::Pending, 0, 2, ApprovalAction::Approve).unwrap();
        assert_eq!(first.new_task_status, ApprovalTaskStatus::PartiallyApproved);
        assert_eq!(first.new_approved_count, 1);
        assert!(first.advances_invoice.is_none());

        let second = apply_decision(
            ApprovalTaskStatus::PartiallyApproved,
            first.new_approved_count,
            2,
            ApprovalAction::Approve,
        )
        .unwrap();
        assert_eq!(second.new_task_status, ApprovalTaskStatus::Approved);
        assert_eq!(second.advances_invoice, Some(InvoiceDecisionEffect::Approved));
    }

    #[test]
    fn single_required_approval_advances_immediately() {
        let outcome = apply_decision(ApprovalTaskStatus::Pending, 0, 1, ApprovalAction::Approve).unwrap();
        assert_eq!(outcome.new_task_status, ApprovalTaskStatus::Approved);
        assert_eq!(outcome.advances_invoice, Some(InvoiceDecisionEffect::Approved));
    }
}
