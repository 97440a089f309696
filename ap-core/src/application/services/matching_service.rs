// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! PO/GRN resolution and the matching run (spec.md §4.7). This service owns
//! the repository lookups the pure `ap_domain::services::matching` functions
//! need as input, and persists the resulting `MatchResult` row.

use std::collections::HashMap;
use std::sync::Arc;

use ap_domain::entities::{GRLineItem, InvoiceLineItem, POLineItem, PurchaseOrder};
use ap_domain::services::matching::{
    aggregate_received_quantities, auto_approval_gate, evaluate_two_way_line, extract_po_reference,
    header_within_tolerance, overall_match_status, pair_invoice_lines_to_po, resolve_strategy, AutoApprovalOutcome,
    MatchStrategyRequest,
};
use ap_domain::value_objects::{ExceptionCode, LineMatchStatus, MatchStatus, MatchType, MatchingToleranceConfig, RuleVersionId};
use ap_domain::{ApError, Invoice, LineItemMatch, MatchResult};
use chrono::Utc;
use uuid::Uuid;

use crate::infrastructure::repositories::{
    ExceptionRepository, GoodsReceiptRepository, MatchResultRecord, MatchingRepository, PurchaseOrderRepository,
};

/// Outcome of one matching run: the persisted result plus the auto-approval
/// verdict the pipeline orchestrator acts on next.
pub struct MatchOutcome {
    pub result: MatchResult,
    pub line_matches: Vec<LineItemMatch>,
    pub auto_approval: AutoApprovalOutcome,
}

pub struct MatchingService {
    purchase_orders: Arc<PurchaseOrderRepository>,
    goods_receipts: Arc<GoodsReceiptRepository>,
    matching: Arc<MatchingRepository>,
    exceptions: Arc<ExceptionRepository>,
}

impl MatchingService {
    pub fn new(
        purchase_orders: Arc<PurchaseOrderRepository>,
        goods_receipts: Arc<GoodsReceiptRepository>,
        matching: Arc<MatchingRepository>,
        exceptions: Arc<ExceptionRepository>,
    ) -> Self {
        Self { purchase_orders, goods_receipts, matching, exceptions }
    }

    /// Resolves the PO a direct link (`invoice.purchase_order_id`) names, or
    /// else a `PO-...` token pulled from the invoice's notes or invoice
    /// number (spec.md §4.7).
    async fn resolve_po(&self, invoice: &Invoice) -> Result<Option<(PurchaseOrder, Vec<POLineItem>)>, ApError> {
        if let Some(po_id) = invoice.purchase_order_id {
            if let Some(record) = self.purchase_orders.find_by_id(po_id).await? {
                return Ok(Some((record.po, record.lines)));
            }
        }

        let candidate_text = [invoice.notes.as_deref(), invoice.invoice_number.as_deref()]
            .into_iter()
            .flatten()
            .find_map(extract_po_reference);

        let Some(po_number) = candidate_text else { return Ok(None) };
        match self.purchase_orders.find_by_po_number(&po_number).await? {
            Some(record) => Ok(Some((record.po, record.lines))),
            None => Ok(None),
        }
    }

    /// Runs a full match (spec.md §4.7), persisting the result and any
    /// exceptions it raises, and returns the auto-approval verdict.
    pub async fn run_match(
        &self,
        invoice: &Invoice,
        invoice_lines: &[InvoiceLineItem],
        strategy: MatchStrategyRequest,
        config: &MatchingToleranceConfig,
        rule_version_id: Option<RuleVersionId>,
    ) -> Result<MatchOutcome, ApError> {
        let invoice_total = invoice.total_amount.unwrap_or(0.0);

        let Some((po, po_lines)) = self.resolve_po(invoice).await? else {
            self.exceptions
                .upsert_open(invoice.id, ExceptionCode::MissingPo, "no purchase order could be resolved for this invoice")
                .await?;
            let result = self
                .persist_result(invoice, None, None, MatchType::NonPo, MatchStatus::Exception, 0.0, 0.0, rule_version_id)
                .await?;
            return Ok(MatchOutcome {
                result,
                line_matches: Vec::new(),
                auto_approval: AutoApprovalOutcome::Exception,
            });
        };

        let receipts = self.goods_receipts.find_by_purchase_order_id(po.id).await?;
        let match_type = resolve_strategy(strategy, !receipts.is_empty());

        let header_ok = header_within_tolerance(invoice_total, po.total, config);
        let header_variance_abs = (invoice_total - po.total).abs();
        let header_variance_pct = if po.total != 0.0 { header_variance_abs / po.total } else { 0.0 };

        let pairing = pair_invoice_lines_to_po(invoice_lines, &po_lines);

        let received_by_po_line: HashMap<_, f64> = if match_type == MatchType::ThreeWay {
            let gr_lines: Vec<GRLineItem> = receipts.iter().flat_map(|r| r.lines.clone()).collect();
            aggregate_received_quantities(&gr_lines, &po_lines)
        } else {
            HashMap::new()
        };

        if match_type == MatchType::ThreeWay && receipts.is_empty() {
            self.exceptions.upsert_open(invoice.id, ExceptionCode::GrnNotFound, "three-way match requested but no goods receipt exists").await?;
        }

        let mut line_matches = Vec::with_capacity(invoice_lines.len());
        let mut line_statuses = Vec::with_capacity(invoice_lines.len());
        let mut saw_price_variance = false;
        let mut saw_qty_over_receipt = false;
        let mut saw_qty_variance = false;

        for inv_line in invoice_lines {
            let po_line = pairing.get(&inv_line.id).copied().flatten();

            let (status, qty_variance, price_variance, price_variance_pct, po_line_id) = match po_line {
                Some(po_line) => {
                    let two_way = evaluate_two_way_line(inv_line.quantity, inv_line.unit_price, po_line.quantity, po_line.unit_price, config);
                    let status = if match_type == MatchType::ThreeWay && !receipts.is_empty() {
                        let received = received_by_po_line.get(&po_line.id).copied().unwrap_or(0.0);
                        let qty_ok = ap_domain::services::matching::three_way_qty_ok(inv_line.quantity, received, config);
                        if !qty_ok {
                            saw_qty_over_receipt = true;
                        }
                        let price_ok = matches!(two_way.status, LineMatchStatus::Matched | LineMatchStatus::QtyVariance);
                        match (qty_ok, price_ok) {
                            (true, true) => LineMatchStatus::Matched,
                            (true, false) => LineMatchStatus::PriceVariance,
                            (false, _) => LineMatchStatus::QtyVariance,
                        }
                    } else {
                        two_way.status
                    };
                    (status, two_way.qty_variance, two_way.price_variance, two_way.price_variance_pct, Some(po_line.id))
                }
                None => (LineMatchStatus::Unmatched, inv_line.quantity, 0.0, 0.0, None),
            };

            match status {
                LineMatchStatus::PriceVariance => saw_price_variance = true,
                LineMatchStatus::QtyVariance => saw_qty_variance = true,
                _ => {}
            }

            line_statuses.push(status);
            line_matches.push(LineItemMatch {
                id: Uuid::new_v4().into(),
                match_result_id: Uuid::nil().into(),
                invoice_line_item_id: inv_line.id,
                po_line_item_id: po_line_id,
                gr_line_item_id: None,
                status,
                qty_variance,
                price_variance,
                price_variance_pct,
            });
        }

        let match_status = overall_match_status(header_ok, &line_statuses);

        if saw_price_variance {
            self.exceptions.upsert_open(invoice.id, ExceptionCode::PriceVariance, "one or more lines exceed the price tolerance").await?;
        }
        if saw_qty_variance {
            self.exceptions.upsert_open(invoice.id, ExceptionCode::QtyVariance, "one or more lines exceed the quantity tolerance").await?;
        }
        if saw_qty_over_receipt {
            self.exceptions.upsert_open(invoice.id, ExceptionCode::QtyOverReceipt, "invoice quantity exceeds goods received").await?;
        }

        let result = self
            .persist_result(invoice, Some(po.id), None, match_type, match_status, header_variance_abs, header_variance_pct, rule_version_id)
            .await?;

        for line_match in &mut line_matches {
            line_match.match_result_id = result.id;
        }
        self.matching.save(&MatchResultRecord { result: result.clone(), line_matches: line_matches.clone() }).await?;

        let auto_approval = auto_approval_gate(match_status, invoice_total, config);
        Ok(MatchOutcome { result, line_matches, auto_approval })
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist_result(
        &self,
        invoice: &Invoice,
        purchase_order_id: Option<ap_domain::value_objects::PurchaseOrderId>,
        goods_receipt_id: Option<ap_domain::value_objects::GoodsReceiptId>,
        match_type: MatchType,
        match_status: MatchStatus,
        header_variance_abs: f64,
        header_variance_pct: f64,
        rule_version_id: Option<RuleVersionId>,
    ) -> Result<MatchResult, ApError> {
        let result = MatchResult {
            id: Uuid::new_v4().into(),
            invoice_id: invoice.id,
            purchase_order_id,
            goods_receipt_id,
            match_type,
            match_status,
            rule_version_id,
            header_variance_abs,
            header_variance_pct,
            notes: None,
            matched_at: Utc::now(),
        };
        self.matching.save(&MatchResultRecord { result: result.clone(), line_matches: Vec::new() }).await?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_domain::entities::{InvoiceSource, PurchaseOrderStatus};
    use ap_domain::value_objects::{POLineItemId, VendorId};

    async fn pool() -> sqlx::SqlitePool {
        crate::infrastructure::db::connect(":memory:").await.unwrap()
    }

    fn service(pool: sqlx::SqlitePool) -> MatchingService {
        MatchingService::new(
            Arc::new(PurchaseOrderRepository::new(pool.clone())),
            Arc::new(GoodsReceiptRepository::new(pool.clone())),
            Arc::new(MatchingRepository::new(pool.clone())),
            Arc::new(ExceptionRepository::new(pool)),
        )
    }

    fn invoice(total: f64) -> Invoice {
        let mut inv = Invoice::new_ingested("invoices/1/a.pdf".into(), "a.pdf".into(), 10, "application/pdf".into(), InvoiceSource::Upload, None);
        inv.total_amount = Some(total);
        inv
    }

    #[tokio::test]
    async fn missing_po_raises_exception_and_non_po_match_type() {
        let pool = pool().await;
        let exceptions = Arc::new(ExceptionRepository::new(pool.clone()));
        let svc = MatchingService::new(
            Arc::new(PurchaseOrderRepository::new(pool.clone())),
            Arc::new(GoodsReceiptRepository::new(pool.clone())),
            Arc::new(MatchingRepository::new(pool.clone())),
            exceptions.clone(),
        );

        let inv = invoice(100.0);
        let outcome = svc
            .run_match(&inv, &[], MatchStrategyRequest::Auto, &MatchingToleranceConfig::default(), None)
            .await
            .unwrap();

        assert_eq!(outcome.result.match_type, MatchType::NonPo);
        assert_eq!(outcome.result.match_status, MatchStatus::Exception);
        assert!(exceptions.find_open(inv.id, ExceptionCode::MissingPo).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn scenario_clean_two_way_auto_approves() {
        let pool = pool().await;
        let svc = service(pool.clone());
        let po_repo = PurchaseOrderRepository::new(pool.clone());

        let vendor = VendorId::new();
        let po = PurchaseOrder {
            id: ap_domain::value_objects::PurchaseOrderId::new(),
            po_number: "PO-1001".into(),
            vendor_id: vendor,
            status: PurchaseOrderStatus::Open,
            currency: "USD".into(),
            total: 4800.0,
            order_date: None,
            expected_date: None,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let po_line = POLineItem {
            id: POLineItemId::new(),
            purchase_order_id: po.id,
            line_number: 1,
            description: "widgets".into(),
            quantity: 100.0,
            unit_price: 30.0,
            unit: None,
            category: None,
            gl_account: None,
            received_qty: 0.0,
            invoiced_qty: 0.0,
        };
        po_repo
            .save(&crate::infrastructure::repositories::PurchaseOrderRecord { po: po.clone(), lines: vec![po_line.clone()] })
            .await
            .unwrap();

        let mut inv = invoice(4800.0);
        inv.purchase_order_id = Some(po.id);
        let inv_line = InvoiceLineItem {
            id: ap_domain::value_objects::InvoiceLineItemId::new(),
            invoice_id: inv.id,
            line_number: 1,
            description: "widgets".into(),
            quantity: 100.0,
            unit_price: 30.0,
            unit: None,
            line_total: 3000.0,
            category: None,
            gl_account: None,
            suggested_gl_account: None,
            cost_center: None,
            po_line_item_id: None,
        };

        let outcome = svc
            .run_match(&inv, &[inv_line], MatchStrategyRequest::Auto, &MatchingToleranceConfig::default(), None)
            .await
            .unwrap();

        assert_eq!(outcome.result.match_status, MatchStatus::Matched);
        assert_eq!(outcome.auto_approval, AutoApprovalOutcome::Approved);
    }

    #[tokio::test]
    async fn three_way_with_no_receipts_raises_grn_not_found_and_skips_line_check() {
        let pool = pool().await;
        let svc = service(pool.clone());
        let exceptions = Arc::new(ExceptionRepository::new(pool.clone()));
        let po_repo = PurchaseOrderRepository::new(pool.clone());

        let vendor = VendorId::new();
        let po = PurchaseOrder {
            id: ap_domain::value_objects::PurchaseOrderId::new(),
            po_number: "PO-2002".into(),
            vendor_id: vendor,
            status: PurchaseOrderStatus::Open,
            currency: "USD".into(),
            total: 3000.0,
            order_date: None,
            expected_date: None,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let po_line = POLineItem {
            id: POLineItemId::new(),
            purchase_order_id: po.id,
            line_number: 1,
            description: "widgets".into(),
            quantity: 100.0,
            unit_price: 30.0,
            unit: None,
            category: None,
            gl_account: None,
            received_qty: 0.0,
            invoiced_qty: 0.0,
        };
        po_repo
            .save(&crate::infrastructure::repositories::PurchaseOrderRecord { po: po.clone(), lines: vec![po_line.clone()] })
            .await
            .unwrap();

        let mut inv = invoice(3000.0);
        inv.purchase_order_id = Some(po.id);
        let inv_line = InvoiceLineItem {
            id: ap_domain::value_objects::InvoiceLineItemId::new(),
            invoice_id: inv.id,
            line_number: 1,
            description: "widgets".into(),
            quantity: 100.0,
            unit_price: 30.0,
            unit: None,
            line_total: 3000.0,
            category: None,
            gl_account: None,
            suggested_gl_account: None,
            cost_center: None,
            po_line_item_id: None,
        };

        let outcome = svc
            .run_match(&inv, &[inv_line], MatchStrategyRequest::ThreeWay, &MatchingToleranceConfig::default(), None)
            .await
            .unwrap();

        assert_eq!(outcome.result.match_type, MatchType::ThreeWay);
        assert_eq!(outcome.line_matches.len(), 1);
        assert_eq!(outcome.line_matches[0].status, LineMatchStatus::Matched);
        assert!(exceptions.find_open(inv.id, ExceptionCode::GrnNotFound).await.unwrap().is_some());
        assert!(exceptions.find_open(inv.id, ExceptionCode::QtyOverReceipt).await.unwrap().is_none());
    }
}
