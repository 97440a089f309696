// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Exception persistence. At most one `open` exception per `(invoice, code)`
//! (spec.md §3) — `upsert_open` enforces the invariant at the repository
//! boundary by looking for an existing open row before inserting a new one.

use ap_domain::value_objects::{ExceptionCode, ExceptionRecordId, ExceptionStatus, InvoiceId};
use ap_domain::{ApError, ExceptionComment, ExceptionRecord};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use super::sql_repository::{SqlEntity, SqlRepository};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionRecordRow {
    pub record: ExceptionRecord,
    pub comments: Vec<ExceptionComment>,
}

impl SqlEntity for ExceptionRecordRow {
    fn id_string(&self) -> String {
        self.record.id.to_string()
    }
    fn table_name() -> &'static str {
        "exception_records"
    }
}

pub struct ExceptionRepository {
    inner: SqlRepository<ExceptionRecordRow>,
}

impl ExceptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { inner: SqlRepository::new(pool) }
    }

    pub async fn save(&self, row: &ExceptionRecordRow) -> Result<(), ApError> {
        self.inner.save(row).await
    }

    pub async fn find_by_id(&self, id: ExceptionRecordId) -> Result<Option<ExceptionRecordRow>, ApError> {
        self.inner.find_by_id(&id.to_string()).await
    }

    /// The open exception for `(invoice_id, code)`, if any.
    pub async fn find_open(
        &self,
        invoice_id: InvoiceId,
        code: ExceptionCode,
    ) -> Result<Option<ExceptionRecordRow>, ApError> {
        let rows = sqlx::query(
            "SELECT data FROM exception_records
             WHERE json_extract(data, '$.record.invoice_id') = ?
               AND json_extract(data, '$.record.code') = ?
               AND json_extract(data, '$.record.status') = 'open'",
        )
        .bind(invoice_id.to_string())
        .bind(code.as_str())
        .fetch_all(self.inner.pool())
        .await
        .map_err(|e| ApError::Database(e.to_string()))?;

        match rows.into_iter().next() {
            Some(r) => {
                let data: String = r.get("data");
                Ok(Some(serde_json::from_str(&data).map_err(ApError::from)?))
            }
            None => Ok(None),
        }
    }

    /// Opens a new exception for `(invoice_id, code)`, or returns the
    /// existing open one untouched — re-detection during re-match must not
    /// spawn duplicate rows for the same problem.
    pub async fn upsert_open(
        &self,
        invoice_id: InvoiceId,
        code: ExceptionCode,
        description: impl Into<String>,
    ) -> Result<ExceptionRecordRow, ApError> {
        if let Some(existing) = self.find_open(invoice_id, code).await? {
            return Ok(existing);
        }
        let row = ExceptionRecordRow { record: ExceptionRecord::open(invoice_id, code, description), comments: vec![] };
        self.save(&row).await?;
        Ok(row)
    }

    /// All exceptions in any of `statuses`, for a worklist view.
    pub async fn find_by_statuses(&self, statuses: &[ExceptionStatus]) -> Result<Vec<ExceptionRecordRow>, ApError> {
        let all = self.inner.list_all().await?;
        let wanted: Vec<&'static str> = statuses.iter().map(ExceptionStatus::as_str).collect();
        Ok(all.into_iter().filter(|r| wanted.contains(&r.record.status.as_str())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> ExceptionRepository {
        let pool = crate::infrastructure::db::connect(":memory:").await.unwrap();
        ExceptionRepository::new(pool)
    }

    #[tokio::test]
    async fn upsert_open_creates_then_reuses() {
        let repo = repo().await;
        let invoice_id = InvoiceId::new();
        let first = repo.upsert_open(invoice_id, ExceptionCode::MissingPo, "no PO found").await.unwrap();
        let second = repo.upsert_open(invoice_id, ExceptionCode::MissingPo, "no PO found (again)").await.unwrap();
        assert_eq!(first.record.id, second.record.id);
    }

    #[tokio::test]
    async fn upsert_open_distinguishes_by_code() {
        let repo = repo().await;
        let invoice_id = InvoiceId::new();
        let missing_po = repo.upsert_open(invoice_id, ExceptionCode::MissingPo, "no PO found").await.unwrap();
        let price_var = repo.upsert_open(invoice_id, ExceptionCode::PriceVariance, "price off").await.unwrap();
        assert_ne!(missing_po.record.id, price_var.record.id);
    }

    #[tokio::test]
    async fn find_by_statuses_filters() {
        let repo = repo().await;
        let invoice_id = InvoiceId::new();
        repo.upsert_open(invoice_id, ExceptionCode::MissingPo, "no PO found").await.unwrap();
        let open = repo.find_by_statuses(&[ExceptionStatus::Open]).await.unwrap();
        assert_eq!(open.len(), 1);
        let resolved = repo.find_by_statuses(&[ExceptionStatus::Resolved]).await.unwrap();
        assert!(resolved.is_empty());
    }
}
