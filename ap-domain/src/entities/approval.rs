// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Approval workflow entities (spec.md §3, §4.9).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{
    ApprovalAction, ApprovalChannel, ApprovalMatrixRuleId, ApprovalTaskId, ApprovalTaskStatus,
    ApprovalTokenId, InvoiceId, UserDelegationId, UserId,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalTask {
    pub id: ApprovalTaskId,
    pub invoice_id: InvoiceId,
    pub approver_id: UserId,
    pub step_order: i32,
    pub required_count: i32,
    pub approved_count: i32,
    pub status: ApprovalTaskStatus,
    pub due_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decision_channel: Option<ApprovalChannel>,
    pub notes: Option<String>,
    pub delegated_to: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalTask {
    pub fn new(
        invoice_id: InvoiceId,
        approver_id: UserId,
        step_order: i32,
        required_count: i32,
        due_at: DateTime<Utc>,
        delegated_to: Option<UserId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ApprovalTaskId::new(),
            invoice_id,
            approver_id,
            step_order,
            required_count,
            approved_count: 0,
            status: ApprovalTaskStatus::Pending,
            due_at,
            decided_at: None,
            decision_channel: None,
            notes: None,
            delegated_to,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One-time-use HMAC token bound to a task and an action (spec.md §3, §4.9,
/// §6). Only `token_hash` is stored — the raw token exists only in the
/// notification email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalToken {
    pub id: ApprovalTokenId,
    pub task_id: ApprovalTaskId,
    pub token_hash: String,
    pub action: ApprovalAction,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

impl ApprovalToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDelegation {
    pub id: UserDelegationId,
    pub delegator_id: UserId,
    pub delegate_id: UserId,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
}

impl UserDelegation {
    pub fn covers(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now >= self.valid_from && now <= self.valid_until
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalMatrixRule {
    pub id: ApprovalMatrixRuleId,
    pub step_order: i32,
    pub approver_role: String,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub department: Option<String>,
    pub category: Option<String>,
    pub is_active: bool,
}

impl ApprovalMatrixRule {
    /// Whether this matrix row covers an invoice with the given total,
    /// department, and category (spec.md §4.9 `build_approval_chain`).
    /// Null bounds/department/category mean "matches any".
    pub fn covers(&self, amount: f64, department: Option<&str>, category: Option<&str>) -> bool {
        if !self.is_active {
            return false;
        }
        if let Some(min) = self.min_amount {
            if amount < min {
                return false;
            }
        }
        if let Some(max) = self.max_amount {
            if amount > max {
                return false;
            }
        }
        if let Some(ref dep) = self.department {
            if department != Some(dep.as_str()) {
                return false;
            }
        }
        if let Some(ref cat) = self.category {
            if category != Some(cat.as_str()) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(min: Option<f64>, max: Option<f64>, dept: Option<&str>, cat: Option<&str>) -> ApprovalMatrixRule {
        ApprovalMatrixRule {
            id: ApprovalMatrixRuleId::new(),
            step_order: 1,
            approver_role: "MANAGER".into(),
            min_amount: min,
            max_amount: max,
            department: dept.map(|s| s.to_string()),
            category: cat.map(|s| s.to_string()),
            is_active: true,
        }
    }

    #[test]
    fn null_bounds_match_any_amount() {
        let r = rule(None, None, None, None);
        assert!(r.covers(1_000_000.0, Some("ops"), Some("supplies")));
    }

    #[test]
    fn amount_range_is_inclusive_boundaries() {
        let r = rule(Some(100.0), Some(200.0), None, None);
        assert!(r.covers(100.0, None, None));
        assert!(r.covers(200.0, None, None));
        assert!(!r.covers(99.99, None, None));
        assert!(!r.covers(200.01, None, None));
    }

    #[test]
    fn specific_department_must_match_exactly() {
        let r = rule(None, None, Some("finance"), None);
        assert!(r.covers(10.0, Some("finance"), None));
        assert!(!r.covers(10.0, Some("ops"), None));
        assert!(!r.covers(10.0, None, None));
    }

    #[test]
    fn inactive_rule_never_covers() {
        let mut r = rule(None, None, None, None);
        r.is_active = false;
        assert!(!r.covers(1.0, None, None));
    }

    #[test]
    fn delegation_covers_only_within_validity_window() {
        use chrono::Duration;
        let now = Utc::now();
        let delegation = UserDelegation {
            id: UserDelegationId::new(),
            delegator_id: UserId::new(),
            delegate_id: UserId::new(),
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            is_active: true,
        };
        assert!(delegation.covers(now));
        assert!(!delegation.covers(now + Duration::days(2)));
    }
}
