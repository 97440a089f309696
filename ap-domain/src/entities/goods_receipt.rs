// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Goods receipts (spec.md §3): records of physical receipt against a PO.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{GRLineItemId, GoodsReceiptId, POLineItemId, PurchaseOrderId, VendorId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodsReceipt {
    pub id: GoodsReceiptId,
    pub grn_number: String,
    pub purchase_order_id: PurchaseOrderId,
    pub vendor_id: VendorId,
    pub received_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl GoodsReceipt {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GRLineItem {
    pub id: GRLineItemId,
    pub goods_receipt_id: GoodsReceiptId,
    pub po_line_item_id: Option<POLineItemId>,
    pub line_number: i32,
    pub description: String,
    pub quantity: f64,
    pub unit: Option<String>,
}
