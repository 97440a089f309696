// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Invoice persistence. An invoice and its line items are stored as one JSON
//! blob row (`InvoiceRecord`) — the teacher stores whole pipelines the same
//! way — with selective finders built on SQLite's bundled `json_extract`
//! rather than normalized columns.

use ap_domain::value_objects::{InvoiceId, InvoiceStatus, VendorId};
use ap_domain::{ApError, Invoice, InvoiceLineItem};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use super::sql_repository::{SqlEntity, SqlRepository};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub invoice: Invoice,
    pub line_items: Vec<InvoiceLineItem>,
}

impl SqlEntity for InvoiceRecord {
    fn id_string(&self) -> String {
        self.invoice.id.to_string()
    }
    fn table_name() -> &'static str {
        "invoices"
    }
}

pub struct InvoiceRepository {
    inner: SqlRepository<InvoiceRecord>,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { inner: SqlRepository::new(pool) }
    }

    pub async fn save(&self, record: &InvoiceRecord) -> Result<(), ApError> {
        self.inner.save(record).await
    }

    pub async fn find_by_id(&self, id: InvoiceId) -> Result<Option<InvoiceRecord>, ApError> {
        self.inner.find_by_id(&id.to_string()).await
    }

    /// Invoices in any of `statuses`, excluding soft-deleted rows (SLA sweep,
    /// spec.md §4.11).
    pub async fn find_by_statuses(&self, statuses: &[InvoiceStatus]) -> Result<Vec<InvoiceRecord>, ApError> {
        let all = self.inner.list_all().await?;
        let wanted: Vec<&'static str> = statuses.iter().map(InvoiceStatus::as_str).collect();
        Ok(all
            .into_iter()
            .filter(|r| !r.invoice.is_deleted() && wanted.contains(&r.invoice.status.as_str()))
            .collect())
    }

    /// Exact-duplicate candidates sharing `(vendor_id, invoice_number)`
    /// (spec.md §4.5), excluding `self_id`.
    pub async fn find_by_vendor_and_invoice_number(
        &self,
        vendor_id: VendorId,
        invoice_number: &str,
        self_id: InvoiceId,
    ) -> Result<Vec<InvoiceRecord>, ApError> {
        let rows = sqlx::query(
            "SELECT data FROM invoices
             WHERE json_extract(data, '$.invoice.vendor_id') = ?
               AND json_extract(data, '$.invoice.invoice_number') = ?
               AND json_extract(data, '$.invoice.id') != ?",
        )
        .bind(vendor_id.to_string())
        .bind(invoice_number)
        .bind(self_id.to_string())
        .fetch_all(self.inner.pool())
        .await
        .map_err(|e| ApError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|r| {
                let data: String = r.get("data");
                serde_json::from_str(&data).map_err(ApError::from)
            })
            .collect()
    }

    /// Fuzzy-duplicate candidates for the same vendor (spec.md §4.5); the
    /// amount/date-window filtering happens in `ap_domain::duplicate_detection`.
    pub async fn find_by_vendor(&self, vendor_id: VendorId, self_id: InvoiceId) -> Result<Vec<InvoiceRecord>, ApError> {
        let rows = sqlx::query(
            "SELECT data FROM invoices
             WHERE json_extract(data, '$.invoice.vendor_id') = ?
               AND json_extract(data, '$.invoice.id') != ?",
        )
        .bind(vendor_id.to_string())
        .bind(self_id.to_string())
        .fetch_all(self.inner.pool())
        .await
        .map_err(|e| ApError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|r| {
                let data: String = r.get("data");
                serde_json::from_str(&data).map_err(ApError::from)
            })
            .collect()
    }

    /// Approved invoices for a vendor within the last `days` (recurring-
    /// pattern detection, spec.md §4.11).
    pub async fn find_approved_by_vendor_since(
        &self,
        vendor_id: VendorId,
        since: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<InvoiceRecord>, ApError> {
        let all = self.find_by_statuses(&[InvoiceStatus::Approved]).await?;
        Ok(all
            .into_iter()
            .filter(|r| r.invoice.vendor_id == Some(vendor_id) && r.invoice.dedup_reference_date() >= since)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_domain::entities::InvoiceSource;

    async fn repo() -> InvoiceRepository {
        let pool = crate::infrastructure::db::connect(":memory:").await.unwrap();
        InvoiceRepository::new(pool)
    }

    fn record() -> InvoiceRecord {
        let invoice = Invoice::new_ingested(
            "invoices/1/a.pdf".into(),
            "a.pdf".into(),
            10,
            "application/pdf".into(),
            InvoiceSource::Upload,
            None,
        );
        InvoiceRecord { invoice, line_items: vec![] }
    }

    #[tokio::test]
    async fn save_then_find_round_trips() {
        let repo = repo().await;
        let rec = record();
        let id = rec.invoice.id;
        repo.save(&rec).await.unwrap();
        let found = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.invoice.id, id);
    }

    #[tokio::test]
    async fn find_by_statuses_excludes_deleted() {
        let repo = repo().await;
        let mut rec = record();
        rec.invoice.deleted_at = Some(chrono::Utc::now());
        repo.save(&rec).await.unwrap();
        let found = repo.find_by_statuses(&[InvoiceStatus::Ingested]).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn find_by_vendor_and_invoice_number_matches_exact_pair() {
        let repo = repo().await;
        let vendor = VendorId::new();
        let mut rec = record();
        rec.invoice.vendor_id = Some(vendor);
        rec.invoice.invoice_number = Some("INV-001".into());
        repo.save(&rec).await.unwrap();

        let other_id = InvoiceId::new();
        let hits = repo.find_by_vendor_and_invoice_number(vendor, "INV-001", other_id).await.unwrap();
        assert_eq!(hits.len(), 1);

        let self_hits = repo.find_by_vendor_and_invoice_number(vendor, "INV-001", rec.invoice.id).await.unwrap();
        assert!(self_hits.is_empty());
    }
}
