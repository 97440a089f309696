// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Goods-receipt persistence, one JSON blob row per receipt plus its line
//! items, mirroring `purchase_order_repository`.

use ap_domain::value_objects::{GoodsReceiptId, PurchaseOrderId};
use ap_domain::{ApError, GRLineItem, GoodsReceipt};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use super::sql_repository::{SqlEntity, SqlRepository};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodsReceiptRecord {
    pub receipt: GoodsReceipt,
    pub lines: Vec<GRLineItem>,
}

impl SqlEntity for GoodsReceiptRecord {
    fn id_string(&self) -> String {
        self.receipt.id.to_string()
    }
    fn table_name() -> &'static str {
        "goods_receipts"
    }
}

pub struct GoodsReceiptRepository {
    inner: SqlRepository<GoodsReceiptRecord>,
}

impl GoodsReceiptRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { inner: SqlRepository::new(pool) }
    }

    pub async fn save(&self, record: &GoodsReceiptRecord) -> Result<(), ApError> {
        self.inner.save(record).await
    }

    pub async fn find_by_id(&self, id: GoodsReceiptId) -> Result<Option<GoodsReceiptRecord>, ApError> {
        self.inner.find_by_id(&id.to_string()).await
    }

    /// All receipts against a PO, feeding three-way match's received-quantity
    /// aggregation (spec.md §4.7), excluding soft-deleted rows.
    pub async fn find_by_purchase_order_id(
        &self,
        purchase_order_id: PurchaseOrderId,
    ) -> Result<Vec<GoodsReceiptRecord>, ApError> {
        let rows = sqlx::query(
            "SELECT data FROM goods_receipts WHERE json_extract(data, '$.receipt.purchase_order_id') = ?",
        )
        .bind(purchase_order_id.to_string())
        .fetch_all(self.inner.pool())
        .await
        .map_err(|e| ApError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|r| {
                let data: String = r.get("data");
                serde_json::from_str(&data).map_err(ApError::from)
            })
            .collect::<Result<Vec<GoodsReceiptRecord>, ApError>>()
            .map(|recs| recs.into_iter().filter(|r| !r.receipt.is_deleted()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_domain::value_objects::VendorId;
    use chrono::Utc;

    async fn repo() -> GoodsReceiptRepository {
        let pool = crate::infrastructure::db::connect(":memory:").await.unwrap();
        GoodsReceiptRepository::new(pool)
    }

    fn record(po_id: PurchaseOrderId) -> GoodsReceiptRecord {
        let receipt = GoodsReceipt {
            id: GoodsReceiptId::new(),
            grn_number: "GRN-1".into(),
            purchase_order_id: po_id,
            vendor_id: VendorId::new(),
            received_at: Utc::now(),
            deleted_at: None,
            created_at: Utc::now(),
        };
        GoodsReceiptRecord { receipt, lines: vec![] }
    }

    #[tokio::test]
    async fn save_then_find_round_trips() {
        let repo = repo().await;
        let rec = record(PurchaseOrderId::new());
        let id = rec.receipt.id;
        repo.save(&rec).await.unwrap();
        let found = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.receipt.id, id);
    }

    #[tokio::test]
    async fn find_by_purchase_order_id_excludes_deleted() {
        let repo = repo().await;
        let po_id = PurchaseOrderId::new();
        let mut rec = record(po_id);
        rec.receipt.deleted_at = Some(Utc::now());
        repo.save(&rec).await.unwrap();
        let found = repo.find_by_purchase_order_id(po_id).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn find_by_purchase_order_id_matches() {
        let repo = repo().await;
        let po_id = PurchaseOrderId::new();
        let rec = record(po_id);
        repo.save(&rec).await.unwrap();
        let found = repo.find_by_purchase_order_id(po_id).await.unwrap();
        assert_eq!(found.len(), 1);
    }
}
