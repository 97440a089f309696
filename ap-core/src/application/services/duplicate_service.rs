// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Duplicate detection (spec.md §4.9): exact invoice-number match first,
//! then a fuzzy amount/date check across the vendor's other invoices.

use std::sync::Arc;

use ap_domain::services::duplicate_detection::{check_exact, check_fuzzy, DuplicateHit, ExactDuplicateCandidate, FuzzyDuplicateCandidate};
use ap_domain::value_objects::{ExceptionCode, InvoiceId};
use ap_domain::{ApError, Invoice};

use crate::infrastructure::repositories::{ExceptionRepository, InvoiceRepository};

const FUZZY_AMOUNT_TOLERANCE_PCT: f64 = 0.01;
const FUZZY_DATE_WINDOW_DAYS: i64 = 3;

pub struct DuplicateOutcome {
    pub hit: Option<DuplicateHit>,
    pub duplicate_of: Option<InvoiceId>,
}

pub struct DuplicateService {
    invoices: Arc<InvoiceRepository>,
    exceptions: Arc<ExceptionRepository>,
}

impl DuplicateService {
    pub fn new(invoices: Arc<InvoiceRepository>, exceptions: Arc<ExceptionRepository>) -> Self {
        Self { invoices, exceptions }
    }

    /// Checks `invoice` against its vendor's other invoices for an exact or
    /// fuzzy duplicate, opening the matching exception when one is found.
    pub async fn check(&self, invoice: &Invoice) -> Result<DuplicateOutcome, ApError> {
        let Some(vendor_id) = invoice.vendor_id else {
            return Ok(DuplicateOutcome { hit: None, duplicate_of: None });
        };

        if let Some(invoice_number) = invoice.invoice_number.as_deref() {
            let siblings = self.invoices.find_by_vendor_and_invoice_number(vendor_id, invoice_number, invoice.id).await?;
            let candidates: Vec<ExactDuplicateCandidate> = siblings
                .iter()
                .filter_map(|r| {
                    r.invoice.invoice_number.as_deref().map(|number| ExactDuplicateCandidate {
                        invoice_id: r.invoice.id,
                        vendor_id: r.invoice.vendor_id.unwrap_or(vendor_id),
                        invoice_number: number.to_string(),
                    })
                })
                .collect();

            if let Some(hit_id) = check_exact(Some(vendor_id), Some(invoice_number), &candidates) {
                self.exceptions.upsert_open(invoice.id, ExceptionCode::DuplicateInvoice, format!("exact duplicate of invoice {hit_id}")).await?;
                return Ok(DuplicateOutcome { hit: Some(DuplicateHit::Exact), duplicate_of: Some(hit_id) });
            }
        }

        let siblings = self.invoices.find_by_vendor(vendor_id, invoice.id).await?;
        let candidates: Vec<FuzzyDuplicateCandidate> = siblings
            .iter()
            .map(|r| FuzzyDuplicateCandidate {
                invoice_id: r.invoice.id,
                vendor_id: r.invoice.vendor_id.unwrap_or(vendor_id),
                normalized_amount_usd: r.invoice.total_amount.unwrap_or(0.0),
                reference_date: r.invoice.dedup_reference_date(),
            })
            .collect();

        let hit_id = check_fuzzy(
            Some(vendor_id),
            invoice.total_amount,
            invoice.dedup_reference_date(),
            FUZZY_AMOUNT_TOLERANCE_PCT,
            FUZZY_DATE_WINDOW_DAYS,
            &candidates,
        );

        if let Some(hit_id) = hit_id {
            self.exceptions.upsert_open(invoice.id, ExceptionCode::DuplicateInvoice, format!("likely duplicate of invoice {hit_id}")).await?;
            return Ok(DuplicateOutcome { hit: Some(DuplicateHit::Fuzzy), duplicate_of: Some(hit_id) });
        }

        Ok(DuplicateOutcome { hit: None, duplicate_of: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_domain::entities::InvoiceSource;

    async fn pool() -> sqlx::SqlitePool {
        crate::infrastructure::db::connect(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn no_vendor_means_no_check() {
        let pool = pool().await;
        let svc = DuplicateService::new(Arc::new(InvoiceRepository::new(pool.clone())), Arc::new(ExceptionRepository::new(pool)));
        let inv = Invoice::new_ingested("invoices/1/a.pdf".into(), "a.pdf".into(), 10, "application/pdf".into(), InvoiceSource::Upload, None);
        let outcome = svc.check(&inv).await.unwrap();
        assert!(outcome.hit.is_none());
    }

    #[tokio::test]
    async fn exact_invoice_number_match_flags_duplicate() {
        use crate::infrastructure::repositories::InvoiceRecord;

        let pool = pool().await;
        let invoice_repo = InvoiceRepository::new(pool.clone());
        let svc = DuplicateService::new(Arc::new(InvoiceRepository::new(pool.clone())), Arc::new(ExceptionRepository::new(pool.clone())));

        let vendor_id = ap_domain::value_objects::VendorId::new();
        let mut first = Invoice::new_ingested("invoices/1/a.pdf".into(), "a.pdf".into(), 10, "application/pdf".into(), InvoiceSource::Upload, None);
        first.vendor_id = Some(vendor_id);
        first.invoice_number = Some("INV-100".into());
        invoice_repo.save(&InvoiceRecord { invoice: first, line_items: Vec::new() }).await.unwrap();

        let mut second = Invoice::new_ingested("invoices/2/b.pdf".into(), "b.pdf".into(), 10, "application/pdf".into(), InvoiceSource::Upload, None);
        second.vendor_id = Some(vendor_id);
        second.invoice_number = Some("INV-100".into());

        let outcome = svc.check(&second).await.unwrap();
        assert_eq!(outcome.hit, Some(DuplicateHit::Exact));
    }
}
