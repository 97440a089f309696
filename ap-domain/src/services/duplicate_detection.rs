// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Duplicate detection (spec.md §4.5): two ordered checks against
//! pre-fetched candidate sets. Both checks are pure predicates; the
//! application layer runs the repository queries and passes in the
//! candidates.

use chrono::{DateTime, Utc};

use crate::value_objects::{ExceptionSeverity, InvoiceId, VendorId};

#[derive(Debug, Clone)]
pub struct ExactDuplicateCandidate {
    pub invoice_id: InvoiceId,
    pub vendor_id: VendorId,
    pub invoice_number: String,
}

#[derive(Debug, Clone)]
pub struct FuzzyDuplicateCandidate {
    pub invoice_id: InvoiceId,
    pub vendor_id: VendorId,
    pub normalized_amount_usd: f64,
    pub reference_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateHit {
    Exact,
    Fuzzy,
}

impl DuplicateHit {
    pub fn severity(&self) -> ExceptionSeverity {
        match self {
            DuplicateHit::Exact => ExceptionSeverity::High,
            DuplicateHit::Fuzzy => ExceptionSeverity::Medium,
        }
    }
}

/// Exact check: same `(vendor_id, invoice_number)` pair on a non-self,
/// non-deleted candidate. The application layer is responsible for excluding
/// the target itself and soft-deleted rows from `candidates`.
pub fn check_exact(
    target_vendor_id: Option<VendorId>,
    target_invoice_number: Option<&str>,
    candidates: &[ExactDuplicateCandidate],
) -> Option<InvoiceId> {
    let (vendor_id, invoice_number) = match (target_vendor_id, target_invoice_number) {
        (Some(v), Some(n)) => (v, n),
        _ => return None,
    };
    candidates
        .iter()
        .find(|c| c.vendor_id == vendor_id && c.invoice_number == invoice_number)
        .map(|c| c.invoice_id)
}

/// Fuzzy check: same vendor, normalized amount within `±amount_tolerance_pct`,
/// invoice/creation date within `±date_window_days` (spec.md §4.5). Skipped
/// by the caller when the exact check already hit.
pub fn check_fuzzy(
    target_vendor_id: Option<VendorId>,
    target_normalized_amount: Option<f64>,
    target_reference_date: DateTime<Utc>,
    amount_tolerance_pct: f64,
    date_window_days: i64,
    candidates: &[FuzzyDuplicateCandidate],
) -> Option<InvoiceId> {
    let (vendor_id, amount) = match (target_vendor_id, target_normalized_amount) {
        (Some(v), Some(a)) => (v, a),
        _ => return None,
    };

    candidates
        .iter()
        .find(|c| {
            if c.vendor_id != vendor_id {
                return false;
            }
            let amount_ok = if amount == 0.0 {
                c.normalized_amount_usd == 0.0
            } else {
                ((c.normalized_amount_usd - amount).abs() / amount) <= amount_tolerance_pct
            };
            if !amount_ok {
                return false;
            }
            let days_apart = (c.reference_date - target_reference_date).num_days().abs();
            days_apart <= date_window_days
        })
        .map(|c| c.invoice_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn exact_check_requires_both_vendor_and_number() {
        let candidates = vec![ExactDuplicateCandidate {
            invoice_id: InvoiceId::from_uuid(Uuid::new_v4()),
            vendor_id: VendorId::from_uuid(Uuid::nil()),
            invoice_number: "INV-1".into(),
        }];
        assert!(check_exact(None, Some("INV-1"), &candidates).is_none());
        assert!(check_exact(Some(VendorId::from_uuid(Uuid::nil())), None, &candidates).is_none());
        assert!(check_exact(Some(VendorId::from_uuid(Uuid::nil())), Some("INV-1"), &candidates).is_some());
    }

    #[test]
    fn fuzzy_check_respects_amount_and_date_window() {
        let vendor = VendorId::from_uuid(Uuid::nil());
        let now = Utc::now();
        let candidates = vec![FuzzyDuplicateCandidate {
            invoice_id: InvoiceId::from_uuid(Uuid::new_v4()),
            vendor_id: vendor,
            normalized_amount_usd: 1015.0,
            reference_date: now,
        }];

        // within 2% of 1000 and within 7 days
        assert!(check_fuzzy(Some(vendor), Some(1000.0), now, 0.02, 7, &candidates).is_some());
        // amount too far off
        assert!(check_fuzzy(Some(vendor), Some(900.0), now, 0.02, 7, &candidates).is_none());
    }

    #[test]
    fn fuzzy_check_zero_amount_only_matches_zero() {
        let vendor = VendorId::from_uuid(Uuid::nil());
        let now = Utc::now();
        let candidates = vec![FuzzyDuplicateCandidate {
            invoice_id: InvoiceId::from_uuid(Uuid::new_v4()),
            vendor_id: vendor,
            normalized_amount_usd: 0.0,
            reference_date: now,
        }];
        assert!(check_fuzzy(Some(vendor), Some(0.0), now, 0.02, 7, &candidates).is_some());
    }
}
