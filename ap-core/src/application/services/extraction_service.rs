// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Dual-pass LLM extraction (spec.md §4.4): two independent calls against
//! the same document, compared for discrepancies and merged into the
//! invoice's extracted fields.

use std::sync::Arc;

use ap_domain::services::extraction::{compare_passes, merge_passes};
use ap_domain::services::ports::LlmPort;
use ap_domain::value_objects::{AiCallLogId, ExtractionResultId};
use ap_domain::{AiCallLog, ApError, ExtractionResult, Invoice};
use chrono::Utc;
use serde_json::Value;

use crate::infrastructure::repositories::{ExtractionRepository, SupportRepository};

const EXTRACTION_SYSTEM_PROMPT: &str = "Extract invoice header fields and line items as JSON.";

pub struct ExtractionOutcome {
    pub merged: Value,
    pub discrepancies: Vec<String>,
    pub pass_one: ExtractionResult,
    pub pass_two: ExtractionResult,
}

pub struct ExtractionService {
    llm: Arc<dyn LlmPort>,
    extraction_results: Arc<ExtractionRepository>,
    support: Arc<SupportRepository>,
}

impl ExtractionService {
    pub fn new(llm: Arc<dyn LlmPort>, extraction_results: Arc<ExtractionRepository>, support: Arc<SupportRepository>) -> Self {
        Self { llm, extraction_results, support }
    }

    /// Runs both extraction passes over `document_text`, logs each LLM call,
    /// persists both `ExtractionResult` rows, and returns the merged payload
    /// the pipeline applies onto the invoice.
    pub async fn run_dual_pass(&self, invoice: &Invoice, document_text: &str) -> Result<ExtractionOutcome, ApError> {
        let first = self.run_pass(invoice, document_text, 1).await?;
        let second = self.run_pass(invoice, document_text, 2).await?;

        let discrepancies = compare_passes(&first.raw_payload, &second.raw_payload);
        let merged = merge_passes(&first.raw_payload, &second.raw_payload);

        let mut pass_one = first;
        pass_one.discrepancies = discrepancies.clone();
        self.extraction_results.save(&pass_one).await?;
        self.extraction_results.save(&second).await?;

        Ok(ExtractionOutcome { merged, discrepancies, pass_one, pass_two: second })
    }

    async fn run_pass(&self, invoice: &Invoice, document_text: &str, pass_number: i32) -> Result<ExtractionResult, ApError> {
        const MODEL_ID: &str = "ap-extraction";
        let call = self.llm.extract(document_text, EXTRACTION_SYSTEM_PROMPT).await;

        let log = AiCallLog {
            id: AiCallLogId::new(),
            invoice_id: Some(invoice.id),
            purpose: format!("extraction_pass_{pass_number}"),
            model_id: MODEL_ID.to_string(),
            prompt: document_text.to_string(),
            response: call.as_ref().ok().map(|r| r.json_payload.clone()),
            prompt_tokens: call.as_ref().map(|r| r.prompt_tokens).unwrap_or(0),
            completion_tokens: call.as_ref().map(|r| r.completion_tokens).unwrap_or(0),
            latency_ms: call.as_ref().map(|r| r.latency_ms).unwrap_or(0),
            error: call.as_ref().err().map(|e| e.to_string()),
            created_at: Utc::now(),
        };
        self.support.save_ai_call_log(&log).await?;

        let call = call?;
        let raw_payload: Value = serde_json::from_str(&call.json_payload).unwrap_or(Value::Null);

        Ok(ExtractionResult {
            id: ExtractionResultId::new(),
            invoice_id: invoice.id,
            pass_number,
            model_id: MODEL_ID.to_string(),
            raw_payload,
            prompt_tokens: call.prompt_tokens,
            completion_tokens: call.completion_tokens,
            latency_ms: call.latency_ms,
            discrepancies: Vec::new(),
            created_at: Utc::now(),
        })
    }
}

/// Applies the merged extraction payload's scalar fields onto `invoice`,
/// leaving any field the payload doesn't name untouched.
pub fn apply_extracted_fields(invoice: &mut Invoice, merged: &Value) {
    if let Some(v) = merged.get("invoice_number").and_then(Value::as_str) {
        invoice.invoice_number = Some(v.to_string());
    }
    if let Some(v) = merged.get("vendor_name").and_then(Value::as_str) {
        invoice.raw_vendor_name = Some(v.to_string());
    }
    if let Some(v) = merged.get("vendor_address").and_then(Value::as_str) {
        invoice.raw_vendor_address = Some(v.to_string());
    }
    if let Some(v) = merged.get("currency").and_then(Value::as_str) {
        invoice.currency = Some(v.to_string());
    }
    if let Some(v) = merged.get("payment_terms").and_then(Value::as_str) {
        invoice.payment_terms = Some(v.to_string());
    }
    if let Some(v) = merged.get("subtotal").and_then(Value::as_f64) {
        invoice.subtotal = Some(v);
    }
    if let Some(v) = merged.get("tax_amount").and_then(Value::as_f64) {
        invoice.tax_amount = Some(v);
    }
    if let Some(v) = merged.get("total_amount").and_then(Value::as_f64) {
        invoice.total_amount = Some(v);
    }
    if let Some(v) = merged.get("invoice_date").and_then(Value::as_str) {
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(v) {
            invoice.invoice_date = Some(dt.with_timezone(&Utc));
        }
    }
    if let Some(v) = merged.get("due_date").and_then(Value::as_str) {
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(v) {
            invoice.due_date = Some(dt.with_timezone(&Utc));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_domain::entities::InvoiceSource;
    use ap_domain::services::ports::LlmResult;
    use async_trait::async_trait;

    struct FixedLlm;

    #[async_trait]
    impl LlmPort for FixedLlm {
        async fn extract(&self, _text: &str, _system_prompt: &str) -> Result<LlmResult, ApError> {
            Ok(LlmResult {
                json_payload: r#"{"total_amount": 100.0, "invoice_number": "INV-1"}"#.into(),
                prompt_tokens: 5,
                completion_tokens: 2,
                latency_ms: 1,
            })
        }

        async fn narrate(&self, _prompt: &str) -> Result<LlmResult, ApError> {
            unimplemented!()
        }
    }

    async fn pool() -> sqlx::SqlitePool {
        crate::infrastructure::db::connect(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn dual_pass_merges_and_persists_both_results() {
        let pool = pool().await;
        let svc = ExtractionService::new(
            Arc::new(FixedLlm),
            Arc::new(ExtractionRepository::new(pool.clone())),
            Arc::new(SupportRepository::new(pool.clone())),
        );
        let inv = Invoice::new_ingested("invoices/1/a.pdf".into(), "a.pdf".into(), 10, "application/pdf".into(), InvoiceSource::Upload, None);

        let outcome = svc.run_dual_pass(&inv, "document text").await.unwrap();
        assert!(outcome.discrepancies.is_empty());
        assert_eq!(outcome.merged.get("invoice_number").and_then(Value::as_str), Some("INV-1"));

        let extraction_results = ExtractionRepository::new(pool);
        let rows = extraction_results.find_by_invoice(inv.id).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn apply_extracted_fields_sets_scalars() {
        let mut inv = Invoice::new_ingested("invoices/1/a.pdf".into(), "a.pdf".into(), 10, "application/pdf".into(), InvoiceSource::Upload, None);
        apply_extracted_fields(&mut inv, &serde_json::json!({"total_amount": 42.5, "invoice_number": "INV-9"}));
        assert_eq!(inv.total_amount, Some(42.5));
        assert_eq!(inv.invoice_number.as_deref(), Some("INV-9"));
    }
}
