// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Invoice state machine (spec.md §4.8).
//!
//! The transition graph below is the single source of truth: both the
//! pipeline orchestrator and the admin manual-override endpoint validate
//! against `InvoiceStatus::can_transition_to`.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Ingested,
    Extracting,
    Extracted,
    Matching,
    Matched,
    Exception,
    Approved,
    Paid,
    Rejected,
    Cancelled,
}

impl InvoiceStatus {
    /// Legal successor states. Anything not in this list fails with
    /// "invalid transition" (spec.md §4.8, §7).
    pub fn legal_next(&self) -> &'static [InvoiceStatus] {
        use InvoiceStatus::*;
        match self {
            Ingested => &[Extracting, Cancelled],
            Extracting => &[Extracted, Cancelled],
            Extracted => &[Matching, Cancelled],
            Matching => &[Matched, Exception, Cancelled],
            Matched => &[Approved, Rejected, Cancelled],
            Exception => &[Matched, Approved, Rejected, Cancelled],
            Approved => &[Paid, Cancelled],
            Paid => &[],
            Rejected => &[Cancelled],
            Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        self.legal_next().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    /// Statuses the SLA sweep (spec.md §4.11) considers "pending".
    pub fn is_pending_for_sla(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Ingested
                | InvoiceStatus::Extracting
                | InvoiceStatus::Extracted
                | InvoiceStatus::Matching
                | InvoiceStatus::Matched
                | InvoiceStatus::Exception
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Ingested => "ingested",
            InvoiceStatus::Extracting => "extracting",
            InvoiceStatus::Extracted => "extracted",
            InvoiceStatus::Matching => "matching",
            InvoiceStatus::Matched => "matched",
            InvoiceStatus::Exception => "exception",
            InvoiceStatus::Approved => "approved",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Rejected => "rejected",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Accepts the legacy `pending` spelling noted as an open question in
    /// spec.md §9 as an alias for `Ingested` during migration.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ingested" | "pending" => Some(InvoiceStatus::Ingested),
            "extracting" => Some(InvoiceStatus::Extracting),
            "extracted" => Some(InvoiceStatus::Extracted),
            "matching" => Some(InvoiceStatus::Matching),
            "matched" => Some(InvoiceStatus::Matched),
            "exception" => Some(InvoiceStatus::Exception),
            "approved" => Some(InvoiceStatus::Approved),
            "paid" => Some(InvoiceStatus::Paid),
            "rejected" => Some(InvoiceStatus::Rejected),
            "cancelled" | "canceled" => Some(InvoiceStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingested_can_only_move_to_extracting_or_cancelled() {
        assert!(InvoiceStatus::Ingested.can_transition_to(InvoiceStatus::Extracting));
        assert!(InvoiceStatus::Ingested.can_transition_to(InvoiceStatus::Cancelled));
        assert!(!InvoiceStatus::Ingested.can_transition_to(InvoiceStatus::Matched));
    }

    #[test]
    fn exception_can_recover_to_matched_approved_or_rejected() {
        for next in [
            InvoiceStatus::Matched,
            InvoiceStatus::Approved,
            InvoiceStatus::Rejected,
            InvoiceStatus::Cancelled,
        ] {
            assert!(InvoiceStatus::Exception.can_transition_to(next));
        }
        assert!(!InvoiceStatus::Exception.can_transition_to(InvoiceStatus::Extracting));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        assert!(InvoiceStatus::Paid.legal_next().is_empty());
        assert!(InvoiceStatus::Cancelled.legal_next().is_empty());
        assert!(InvoiceStatus::Paid.is_terminal());
    }

    #[test]
    fn legacy_pending_alias_parses_to_ingested() {
        assert_eq!(InvoiceStatus::parse("pending"), Some(InvoiceStatus::Ingested));
    }
}
