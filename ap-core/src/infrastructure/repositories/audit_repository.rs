// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Audit-trail persistence. `audit_logs` has no `updated_at` column and
//! carries `BEFORE UPDATE`/`BEFORE DELETE` triggers (`infrastructure::db`) so
//! it can't go through the generic upsert-capable `SqlRepository` — this
//! repository only ever inserts. `OverrideLog` has no such restriction and
//! uses the generic repository normally.

use ap_domain::value_objects::AuditLogId;
use ap_domain::{ApError, AuditLog, OverrideLog};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use super::sql_repository::{SqlEntity, SqlRepository};

impl SqlEntity for OverrideLog {
    fn id_string(&self) -> String {
        self.id.to_string()
    }
    fn table_name() -> &'static str {
        "override_logs"
    }
}

pub struct AuditRepository {
    pool: SqlitePool,
    overrides: SqlRepository<OverrideLog>,
}

impl AuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { overrides: SqlRepository::new(pool.clone()), pool }
    }

    pub async fn record(&self, log: &AuditLog) -> Result<(), ApError> {
        let data = serde_json::to_string(log)?;
        sqlx::query("INSERT INTO audit_logs (id, data, created_at) VALUES (?, ?, ?)")
            .bind(log.id.to_string())
            .bind(&data)
            .bind(log.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| ApError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: AuditLogId) -> Result<Option<AuditLog>, ApError> {
        let row = sqlx::query("SELECT data FROM audit_logs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApError::Database(e.to_string()))?;
        row.map(|r| {
            let data: String = r.get("data");
            serde_json::from_str(&data).map_err(ApError::from)
        })
        .transpose()
    }

    /// The full trail for one entity, oldest first — spec.md §4.1's review
    /// view for "what happened to this invoice".
    pub async fn find_by_entity(&self, entity_type: &str, entity_id: &str) -> Result<Vec<AuditLog>, ApError> {
        let rows = sqlx::query(
            "SELECT data FROM audit_logs
             WHERE json_extract(data, '$.entity_type') = ? AND json_extract(data, '$.entity_id') = ?
             ORDER BY created_at",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ApError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|r| {
                let data: String = r.get("data");
                serde_json::from_str(&data).map_err(ApError::from)
            })
            .collect()
    }

    pub async fn save_override(&self, log: &OverrideLog) -> Result<(), ApError> {
        self.overrides.save(log).await
    }

    pub async fn find_overrides_by_invoice(
        &self,
        invoice_id: ap_domain::value_objects::InvoiceId,
    ) -> Result<Vec<OverrideLog>, ApError> {
        Ok(self
            .overrides
            .list_all()
            .await?
            .into_iter()
            .filter(|o| o.invoice_id == invoice_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_domain::value_objects::{InvoiceId, UserId};

    async fn repo() -> AuditRepository {
        let pool = crate::infrastructure::db::connect(":memory:").await.unwrap();
        AuditRepository::new(pool)
    }

    #[tokio::test]
    async fn record_then_find_round_trips() {
        let repo = repo().await;
        let log = AuditLog::record(Some(UserId::new()), None, "invoice.ingested", "invoice", "inv-1", None, None);
        repo.record(&log).await.unwrap();
        let found = repo.find_by_id(log.id).await.unwrap().unwrap();
        assert_eq!(found.action, "invoice.ingested");
    }

    #[tokio::test]
    async fn find_by_entity_filters_and_orders() {
        let repo = repo().await;
        let log1 = AuditLog::record(None, None, "invoice.ingested", "invoice", "inv-1", None, None);
        let log2 = AuditLog::record(None, None, "invoice.matched", "invoice", "inv-1", None, None);
        let other = AuditLog::record(None, None, "rule.published", "rule_version", "rv-1", None, None);
        repo.record(&log1).await.unwrap();
        repo.record(&log2).await.unwrap();
        repo.record(&other).await.unwrap();

        let trail = repo.find_by_entity("invoice", "inv-1").await.unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].action, "invoice.ingested");
    }

    #[tokio::test]
    async fn save_override_then_find_by_invoice() {
        let repo = repo().await;
        let invoice_id = InvoiceId::new();
        let ov = OverrideLog::new(invoice_id, UserId::new(), "exception", "approved", "vendor called, confirmed legitimate");
        repo.save_override(&ov).await.unwrap();
        let found = repo.find_overrides_by_invoice(invoice_id).await.unwrap();
        assert_eq!(found.len(), 1);
    }
}
