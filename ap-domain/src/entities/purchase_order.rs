// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Purchase orders (spec.md §3). Read-only in the core's view: imported via
//! CSV, an out-of-scope collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{POLineItemId, PurchaseOrderId, VendorId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    Open,
    Partial,
    Closed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub po_number: String,
    pub vendor_id: VendorId,
    pub status: PurchaseOrderStatus,
    pub currency: String,
    pub total: f64,
    pub order_date: Option<DateTime<Utc>>,
    pub expected_date: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct POLineItem {
    pub id: POLineItemId,
    pub purchase_order_id: PurchaseOrderId,
    pub line_number: i32,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub gl_account: Option<String>,
    pub received_qty: f64,
    pub invoiced_qty: f64,
}
