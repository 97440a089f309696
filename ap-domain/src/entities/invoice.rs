// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Invoice, the pipeline's primary entity (spec.md §3), and its line items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{InvoiceId, InvoiceLineItemId, POLineItemId, PurchaseOrderId, VendorId};
use crate::InvoiceStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceSource {
    Upload,
    Email,
    Api,
}

impl InvoiceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceSource::Upload => "upload",
            InvoiceSource::Email => "email",
            InvoiceSource::Api => "api",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub status: InvoiceStatus,

    // File metadata
    pub storage_path: String,
    pub original_filename: String,
    pub file_size_bytes: i64,
    pub mime_type: String,
    pub source: InvoiceSource,
    pub source_email: Option<String>,

    // Extracted fields
    pub invoice_number: Option<String>,
    pub vendor_id: Option<VendorId>,
    pub purchase_order_id: Option<PurchaseOrderId>,
    pub currency: Option<String>,
    pub subtotal: Option<f64>,
    pub tax_amount: Option<f64>,
    pub total_amount: Option<f64>,
    pub invoice_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub payment_terms: Option<String>,
    pub raw_vendor_name: Option<String>,
    pub raw_vendor_address: Option<String>,
    pub remit_to: Option<String>,
    pub notes: Option<String>,

    /// Total converted to the reference currency via the FX port (spec.md §4.10 step 5).
    pub normalized_amount_usd: Option<f64>,

    pub ocr_confidence: Option<f64>,
    pub extraction_model: Option<String>,

    pub fraud_score: i32,
    pub fraud_signals: Vec<String>,
    pub is_duplicate: bool,
    pub recurring_pattern_id: Option<crate::value_objects::RecurringInvoicePatternId>,

    pub payment_status: Option<PaymentStatus>,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,

    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn new_ingested(
        storage_path: String,
        original_filename: String,
        file_size_bytes: i64,
        mime_type: String,
        source: InvoiceSource,
        source_email: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: InvoiceId::new(),
            status: InvoiceStatus::Ingested,
            storage_path,
            original_filename,
            file_size_bytes,
            mime_type,
            source,
            source_email,
            invoice_number: None,
            vendor_id: None,
            purchase_order_id: None,
            currency: None,
            subtotal: None,
            tax_amount: None,
            total_amount: None,
            invoice_date: None,
            due_date: None,
            payment_terms: None,
            raw_vendor_name: None,
            raw_vendor_address: None,
            remit_to: None,
            notes: None,
            normalized_amount_usd: None,
            ocr_confidence: None,
            extraction_model: None,
            fraud_score: 0,
            fraud_signals: Vec::new(),
            is_duplicate: false,
            recurring_pattern_id: None,
            payment_status: None,
            payment_date: None,
            payment_method: None,
            payment_reference: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// The day used by §4.5's fuzzy-duplicate date window: invoice date when
    /// present, otherwise creation timestamp (spec.md §9 open question,
    /// resolved as intentional).
    pub fn dedup_reference_date(&self) -> DateTime<Utc> {
        self.invoice_date.unwrap_or(self.created_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub id: InvoiceLineItemId,
    pub invoice_id: InvoiceId,
    pub line_number: i32,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub unit: Option<String>,
    pub line_total: f64,
    pub category: Option<String>,
    pub gl_account: Option<String>,
    pub suggested_gl_account: Option<String>,
    pub cost_center: Option<String>,
    pub po_line_item_id: Option<POLineItemId>,
}
