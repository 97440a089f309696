// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Fraud scoring (spec.md §4.8): pulls the vendor's approved-invoice history
//! and scores the candidate invoice against it.

use std::sync::Arc;

use ap_domain::services::fraud_scoring::{score_invoice, FraudScoreResult, FraudScoringInput, FraudThresholds, RiskBand};
use ap_domain::value_objects::ExceptionCode;
use ap_domain::{ApError, Invoice};
use chrono::{Duration, Utc};

use crate::infrastructure::repositories::{ExceptionRepository, InvoiceRepository};

const DUPLICATE_WINDOW_DAYS: i64 = 14;

pub struct FraudService {
    invoices: Arc<InvoiceRepository>,
    exceptions: Arc<ExceptionRepository>,
    thresholds: FraudThresholds,
}

impl FraudService {
    pub fn new(invoices: Arc<InvoiceRepository>, exceptions: Arc<ExceptionRepository>, thresholds: FraudThresholds) -> Self {
        Self { invoices, exceptions, thresholds }
    }

    /// Scores `invoice` against its vendor's approved history and, at the
    /// critical band, opens a `FRAUD_FLAG` exception.
    pub async fn score(&self, invoice: &Invoice) -> Result<FraudScoreResult, ApError> {
        let Some(vendor_id) = invoice.vendor_id else {
            return Ok(FraudScoreResult { score: 0, signals: Vec::new(), band: RiskBand::Low });
        };

        let now = Utc::now();
        let since = now - Duration::days(365);
        let history = self.invoices.find_approved_by_vendor_since(vendor_id, since).await?;

        let total_amount = invoice.total_amount.unwrap_or(0.0);
        let vendor_approved_invoice_count = history.len() as i64;
        let vendor_approved_mean_amount = if history.is_empty() {
            None
        } else {
            let sum: f64 = history.iter().filter_map(|r| r.invoice.total_amount).sum();
            Some(sum / history.len() as f64)
        };

        let duplicate_window_start = invoice.dedup_reference_date() - Duration::days(DUPLICATE_WINDOW_DAYS);
        let vendor_has_same_total_within_window = history.iter().any(|r| {
            r.invoice.total_amount == invoice.total_amount
                && r.invoice.dedup_reference_date() >= duplicate_window_start
        });

        let input = FraudScoringInput {
            total_amount,
            invoice_date: invoice.invoice_date,
            now,
            vendor_approved_invoice_count,
            vendor_approved_mean_amount,
            duplicate_window_days: DUPLICATE_WINDOW_DAYS,
            vendor_has_same_total_within_window,
        };

        let result = score_invoice(&input, &self.thresholds);

        if result.band == RiskBand::Critical {
            self.exceptions
                .upsert_open(invoice.id, ExceptionCode::FraudFlag, format!("fraud score {} crossed the critical threshold", result.score))
                .await?;
        }

        Ok(result)
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
    async fn no_vendor_scores_low_with_no_signals() {
        let pool = pool().await;
        let svc = FraudService::new(
            Arc::new(InvoiceRepository::new(pool.clone())),
            Arc::new(ExceptionRepository::new(pool)),
            FraudThresholds::default(),
        );
        let inv = Invoice::new_ingested("invoices/1/a.pdf".into(), "a.pdf".into(), 10, "application/pdf".into(), InvoiceSource::Upload, None);
        let result = svc.score(&inv).await.unwrap();
        assert_eq!(result.band, RiskBand::Low);
        assert!(result.signals.is_empty());
    }

    #[tokio::test]
    async fn new_vendor_round_amount_raises_score() {
        let pool = pool().await;
        let svc = FraudService::new(
            Arc::new(InvoiceRepository::new(pool.clone())),
            Arc::new(ExceptionRepository::new(pool)),
            FraudThresholds::default(),
        );
        let mut inv = Invoice::new_ingested("invoices/1/a.pdf".into(), "a.pdf".into(), 10, "application/pdf".into(), InvoiceSource::Upload, None);
        inv.vendor_id = Some(ap_domain::value_objects::VendorId::new());
        inv.total_amount = Some(5000.0);
        let result = svc.score(&inv).await.unwrap();
        assert!(result.score >= 15);
    }
}
