// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Purchase-order persistence. Read-only from the core's perspective (CSV
//! import is out of scope) but stored the same way as every other aggregate:
//! one JSON blob row per PO plus its line items.

use ap_domain::value_objects::PurchaseOrderId;
use ap_domain::{ApError, POLineItem, PurchaseOrder};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use super::sql_repository::{SqlEntity, SqlRepository};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderRecord {
    pub po: PurchaseOrder,
    pub lines: Vec<POLineItem>,
}

impl SqlEntity for PurchaseOrderRecord {
    fn id_string(&self) -> String {
        self.po.id.to_string()
    }
    fn table_name() -> &'static str {
        "purchase_orders"
    }
}

pub struct PurchaseOrderRepository {
    inner: SqlRepository<PurchaseOrderRecord>,
}

impl PurchaseOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { inner: SqlRepository::new(pool) }
    }

    pub async fn save(&self, record: &PurchaseOrderRecord) -> Result<(), ApError> {
        self.inner.save(record).await
    }

    pub async fn find_by_id(&self, id: PurchaseOrderId) -> Result<Option<PurchaseOrderRecord>, ApError> {
        self.inner.find_by_id(&id.to_string()).await
    }

    /// Resolves the PO named on an invoice (spec.md §4.7's two-way/three-way
    /// match lookup), excluding soft-deleted rows.
    pub async fn find_by_po_number(&self, po_number: &str) -> Result<Option<PurchaseOrderRecord>, ApError> {
        let rows = sqlx::query("SELECT data FROM purchase_orders WHERE json_extract(data, '$.po.po_number') = ?")
            .bind(po_number)
            .fetch_all(self.inner.pool())
            .await
            .map_err(|e| ApError::Database(e.to_string()))?;

        for row in rows {
            let data: String = row.get("data");
            let record: PurchaseOrderRecord = serde_json::from_str(&data).map_err(ApError::from)?;
            if !record.po.is_deleted() {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}
