// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalTaskStatus {
    Pending,
    PartiallyApproved,
    Approved,
    Rejected,
    Delegated,
    Expired,
}

impl ApprovalTaskStatus {
    /// Only these two states may receive a decision (spec.md §4.9).
    pub fn accepts_decision(&self) -> bool {
        matches!(
            self,
            ApprovalTaskStatus::Pending | ApprovalTaskStatus::PartiallyApproved
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalTaskStatus::Pending => "pending",
            ApprovalTaskStatus::PartiallyApproved => "partially_approved",
            ApprovalTaskStatus::Approved => "approved",
            ApprovalTaskStatus::Rejected => "rejected",
            ApprovalTaskStatus::Delegated => "delegated",
            ApprovalTaskStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

impl ApprovalAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(ApprovalAction::Approve),
            "reject" => Some(ApprovalAction::Reject),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalAction::Approve => "approve",
            ApprovalAction::Reject => "reject",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalChannel {
    Web,
    Email,
}

impl ApprovalChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalChannel::Web => "web",
            ApprovalChannel::Email => "email",
        }
    }
}
