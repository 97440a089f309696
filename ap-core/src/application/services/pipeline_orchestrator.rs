// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The per-invoice pipeline (spec.md §4.10): extract → normalize → duplicate
//! check → fraud score → match → approve/route-to-exception. Implements
//! `PipelineEnqueuer` so the scheduler's mailbox-poll job (and any other
//! ingestion path) can hand a freshly-stored invoice off to it.
//!
//! No OCR library sits anywhere in this stack's dependency tree, so the
//! downloaded document bytes are decoded as UTF-8 (lossy) text before being
//! handed to `LlmPort::extract` — the stub and HTTP clients both treat that
//! parameter as an opaque string already, so this matches their contract
//! rather than inventing a text layer the corpus doesn't have.

use std::sync::Arc;

use ap_domain::services::matching::MatchStrategyRequest;
use ap_domain::services::ports::{BlobStore, FxPort};
use ap_domain::value_objects::{InvoiceLineItemId, InvoiceStatus, MatchingToleranceConfig};
use ap_domain::{ApError, InvoiceAggregate};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::infrastructure::repositories::InvoiceRepository;
use crate::infrastructure::scheduler::PipelineEnqueuer;

use super::{ApprovalService, AuditService, DuplicateService, ExtractionService, FraudService, MatchingService, RuleService};
use super::matching_service::MatchOutcome;

const MATCHING_TOLERANCE_RULE_TYPE: &str = "matching_tolerance";
const INVOICE_BUCKET: &str = "invoices";

pub struct PipelineOrchestrator {
    invoices: Arc<InvoiceRepository>,
    blob: Arc<dyn BlobStore>,
    fx: Arc<dyn FxPort>,
    extraction: Arc<ExtractionService>,
    matching: Arc<MatchingService>,
    fraud: Arc<FraudService>,
    duplicate: Arc<DuplicateService>,
    approval: Arc<ApprovalService>,
    rules: Arc<RuleService>,
    audit: Arc<AuditService>,
}

impl PipelineOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        invoices: Arc<InvoiceRepository>,
        blob: Arc<dyn BlobStore>,
        fx: Arc<dyn FxPort>,
        extraction: Arc<ExtractionService>,
        matching: Arc<MatchingService>,
        fraud: Arc<FraudService>,
        duplicate: Arc<DuplicateService>,
        approval: Arc<ApprovalService>,
        rules: Arc<RuleService>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self { invoices, blob, fx, extraction, matching, fraud, duplicate, approval, rules, audit }
    }

    /// Runs every pipeline stage for one invoice, in the order spec.md
    /// §4.10 lays out. Idempotent per stage is not guaranteed across
    /// partial failures; a failed run leaves the invoice at whatever status
    /// its last successful transition reached, and a re-`enqueue` (e.g. via
    /// the `rematch` CLI command) resumes from there.
    pub async fn run(&self, invoice_id: ap_domain::value_objects::InvoiceId) -> Result<(), ApError> {
        let record = self
            .invoices
            .find_by_id(invoice_id)
            .await?
            .ok_or_else(|| ApError::not_found(format!("invoice {invoice_id} not found")))?;
        let mut invoice = record.invoice;
        let mut line_items = record.line_items;

        if invoice.status == InvoiceStatus::Ingested {
            self.transition(&mut invoice, InvoiceStatus::Extracting).await?;

            let document_text = self.load_document_text(&invoice).await?;
            let outcome = self.extraction.run_dual_pass(&invoice, &document_text).await?;
            super::extraction_service::apply_extracted_fields(&mut invoice, &outcome.merged);
            line_items = build_line_items(invoice_id, &outcome.merged);

            if let Some(currency) = invoice.currency.clone() {
                if let Some(total) = invoice.total_amount {
                    match self.fx.convert(total, &currency).await {
                        Ok(normalized) => invoice.normalized_amount_usd = Some(normalized),
                        Err(e) => warn!(error = %e, "fx normalization failed, leaving normalized_amount_usd unset"),
                    }
                }
            }

            self.save(&invoice, &line_items).await?;
            self.transition(&mut invoice, InvoiceStatus::Extracted).await?;
        }

        if invoice.status == InvoiceStatus::Extracted {
            self.transition(&mut invoice, InvoiceStatus::Matching).await?;
            self.save(&invoice, &line_items).await?;
        }

        if invoice.status != InvoiceStatus::Matching {
            info!(invoice_id = %invoice_id, status = invoice.status.as_str(), "invoice not in a matching-eligible status, stopping pipeline run");
            return Ok(());
        }

        let duplicate_outcome = self.duplicate.check(&invoice).await?;
        invoice.is_duplicate = duplicate_outcome.hit.is_some();

        let fraud_result = self.fraud.score(&invoice).await?;
        invoice.fraud_score = fraud_result.score;
        invoice.fraud_signals = fraud_result.signals.iter().map(|s| s.as_str().to_string()).collect();
        self.save(&invoice, &line_items).await?;

        let active_rule = self.rules.active_config(MATCHING_TOLERANCE_RULE_TYPE).await?;
        let tolerance = MatchingToleranceConfig::from_payload(&active_rule.config);

        let MatchOutcome { result, auto_approval, .. } = self
            .matching
            .run_match(&invoice, &line_items, MatchStrategyRequest::Auto, &tolerance, active_rule.version_id)
            .await?;

        let next_status = if result.match_status == ap_domain::value_objects::MatchStatus::Exception {
            InvoiceStatus::Exception
        } else {
            InvoiceStatus::Matched
        };
        self.transition(&mut invoice, next_status).await?;
        self.save(&invoice, &line_items).await?;

        if next_status == InvoiceStatus::Matched {
            use ap_domain::services::matching::AutoApprovalOutcome;
            match auto_approval {
                AutoApprovalOutcome::Approved => {
                    self.transition(&mut invoice, InvoiceStatus::Approved).await?;
                    self.save(&invoice, &line_items).await?;
                }
                AutoApprovalOutcome::NeedsApprovalTask => {
                    let due_at = chrono::Utc::now() + chrono::Duration::days(5);
                    self.approval.create_chain_from_active_matrix(&invoice, fraud_result.band, None, None, due_at).await?;
                }
                AutoApprovalOutcome::Exception => {
                    self.transition(&mut invoice, InvoiceStatus::Exception).await?;
                    self.save(&invoice, &line_items).await?;
                }
            }
        }

        Ok(())
    }

    /// Applies the outcome of an approve/reject decision onto the invoice's
    /// status (spec.md §7: "the approval service drives `approved`/
    /// `rejected`"). A no-op when the chain is still partway through
    /// (`InvoiceApprovalEffect::None`), e.g. a two-approver step that only
    /// just got its first signature.
    pub async fn apply_approval_effect(
        &self,
        invoice_id: ap_domain::value_objects::InvoiceId,
        effect: super::approval_service::InvoiceApprovalEffect,
    ) -> Result<(), ApError> {
        use super::approval_service::InvoiceApprovalEffect;
        let next_status = match effect {
            InvoiceApprovalEffect::None => return Ok(()),
            InvoiceApprovalEffect::Approved => InvoiceStatus::Approved,
            InvoiceApprovalEffect::Rejected => InvoiceStatus::Rejected,
        };

        let record = self
            .invoices
            .find_by_id(invoice_id)
            .await?
            .ok_or_else(|| ApError::not_found(format!("invoice {invoice_id} not found")))?;
        let mut invoice = record.invoice;
        self.transition(&mut invoice, next_status).await?;
        self.save(&invoice, &record.line_items).await
    }

    async fn load_document_text(&self, invoice: &ap_domain::Invoice) -> Result<String, ApError> {
        let bytes = self.blob.download(INVOICE_BUCKET, &invoice.storage_path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn transition(&self, invoice: &mut ap_domain::Invoice, next: InvoiceStatus) -> Result<(), ApError> {
        let mut aggregate = InvoiceAggregate::load(invoice.clone());
        let from = aggregate.status();
        aggregate.transition_to(next, None)?;
        *invoice = aggregate.into_invoice();
        self.audit.record_invoice_transition(invoice.id, None, from.as_str(), next.as_str()).await
    }

    async fn save(&self, invoice: &ap_domain::Invoice, line_items: &[ap_domain::InvoiceLineItem]) -> Result<(), ApError> {
        self.invoices
            .save(&crate::infrastructure::repositories::InvoiceRecord { invoice: invoice.clone(), line_items: line_items.to_vec() })
            .await
    }
}

#[async_trait]
impl PipelineEnqueuer for PipelineOrchestrator {
    async fn enqueue(&self, invoice_id: ap_domain::value_objects::InvoiceId) -> Result<(), ApError> {
        self.run(invoice_id).await
    }
}

/// Builds line items from the merged extraction payload's `line_items`
/// array, tolerating missing/malformed entries by skipping them rather than
/// failing the whole pipeline run.
fn build_line_items(invoice_id: ap_domain::value_objects::InvoiceId, merged: &Value) -> Vec<ap_domain::InvoiceLineItem> {
    let Some(items) = merged.get("line_items").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| ap_domain::InvoiceLineItem {
            id: InvoiceLineItemId::new(),
            invoice_id,
            line_number: item.get("line_number").and_then(Value::as_i64).unwrap_or(idx as i64 + 1) as i32,
            description: item.get("description").and_then(Value::as_str).unwrap_or_default().to_string(),
            quantity: item.get("quantity").and_then(Value::as_f64).unwrap_or(0.0),
            unit_price: item.get("unit_price").and_then(Value::as_f64).unwrap_or(0.0),
            unit: item.get("unit").and_then(Value::as_str).map(str::to_string),
            line_total: item.get("line_total").and_then(Value::as_f64).unwrap_or(0.0),
            category: item.get("category").and_then(Value::as_str).map(str::to_string),
            gl_account: None,
            suggested_gl_account: item.get("suggested_gl_account").and_then(Value::as_str).map(str::to_string),
            cost_center: None,
            po_line_item_id: None,
        })
        .collect()
}

