// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Outbound ports (spec.md §6): the domain defines the contract, ap-core
//! provides the adapter. Every method is async because every implementation
//! is a network call; the pure matching/fraud/duplicate logic below stays
//! synchronous by design.

use async_trait::async_trait;

use crate::error::ApError;

/// Object storage for invoice PDFs/images, compliance documents, and
/// policy uploads. Object-naming convention (spec.md §6):
/// `invoices/<invoice_id>/<filename>`, `compliance/<vendor_id>/<doc_type>/<filename>`,
/// `policies/<version_id>/<filename>`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        object_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ApError>;

    async fn download(&self, bucket: &str, object_name: &str) -> Result<Vec<u8>, ApError>;

    async fn presigned_url(&self, bucket: &str, object_name: &str, ttl_seconds: u64) -> Result<String, ApError>;

    async fn delete(&self, bucket: &str, object_name: &str) -> Result<(), ApError>;

    async fn ensure_bucket(&self, bucket: &str) -> Result<(), ApError>;
}

/// Result of one LLM invocation (spec.md §4.4, §6). `json_payload` is the raw
/// text returned by the model; the caller is responsible for stripping
/// Markdown code fences and tolerating decode failures.
#[derive(Debug, Clone)]
pub struct LlmResult {
    pub json_payload: String,
    pub prompt_tokens: i32,
    pub completion_tokens: i32,
    pub latency_ms: i64,
}

#[async_trait]
pub trait LlmPort: Send + Sync {
    /// Structured field extraction, capped at 2048 tokens (spec.md §5).
    async fn extract(&self, text: &str, system_prompt: &str) -> Result<LlmResult, ApError>;

    /// Free-form narrative generation (root-cause summaries, feedback
    /// digests), capped at 1500 tokens (spec.md §5).
    async fn narrate(&self, prompt: &str) -> Result<LlmResult, ApError>;
}

/// Currency normalization to the configured reference currency (spec.md
/// §6). A static table is an acceptable implementation.
#[async_trait]
pub trait FxPort: Send + Sync {
    async fn convert(&self, amount: f64, currency: &str) -> Result<f64, ApError>;
}

/// Outbound notification for the approval workflow (spec.md §6). Delivered
/// or logged depending on configuration — the domain doesn't care which.
#[async_trait]
pub trait EmailPort: Send + Sync {
    async fn send_approval_request(
        &self,
        to: &str,
        invoice_number: &str,
        approve_url: &str,
        reject_url: &str,
    ) -> Result<(), ApError>;
}
