// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `MatchResult`, `LineItemMatch` (spec.md §3, §4.7) and `ExtractionResult`
//! (spec.md §3, §4.4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value_objects::{
    GRLineItemId, GoodsReceiptId, InvoiceId, InvoiceLineItemId, LineItemMatchId, LineMatchStatus,
    MatchResultId, MatchStatus, MatchType, POLineItemId, PurchaseOrderId, RuleVersionId,
};

/// At most one per invoice (spec.md §3). Overwritten atomically on re-match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: MatchResultId,
    pub invoice_id: InvoiceId,
    pub purchase_order_id: Option<PurchaseOrderId>,
    pub goods_receipt_id: Option<GoodsReceiptId>,
    pub match_type: MatchType,
    pub match_status: MatchStatus,
    pub rule_version_id: Option<RuleVersionId>,
    pub header_variance_abs: f64,
    pub header_variance_pct: f64,
    pub notes: Option<String>,
    pub matched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemMatch {
    pub id: LineItemMatchId,
    pub match_result_id: MatchResultId,
    pub invoice_line_item_id: InvoiceLineItemId,
    pub po_line_item_id: Option<POLineItemId>,
    pub gr_line_item_id: Option<GRLineItemId>,
    pub status: LineMatchStatus,
    pub qty_variance: f64,
    pub price_variance: f64,
    pub price_variance_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPass {
    First,
    Second,
}

impl ExtractionPass {
    pub fn number(&self) -> i32 {
        match self {
            ExtractionPass::First => 1,
            ExtractionPass::Second => 2,
        }
    }
}

/// One record per extraction pass per invoice (spec.md §3). Immutable after
/// write; pass 1's row carries the discrepancy list computed once pass 2
/// lands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub id: crate::value_objects::ExtractionResultId,
    pub invoice_id: InvoiceId,
    pub pass_number: i32,
    pub model_id: String,
    pub raw_payload: Value,
    pub prompt_tokens: i32,
    pub completion_tokens: i32,
    pub latency_ms: i64,
    pub discrepancies: Vec<String>,
    pub created_at: DateTime<Utc>,
}
