// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # AP Domain
//!
//! The core business logic of the accounts-payable platform: invoice
//! ingestion, extraction reconciliation, PO/GRN matching, fraud scoring,
//! duplicate detection, the approval workflow, and the rule engine that
//! configures all of them. This crate is completely independent of
//! databases, blob stores, LLM providers, and schedulers — those are ports
//! that `ap-core` implements.
//!
//! ## Module structure
//!
//! - `entities` — objects with a surrogate identity that persists through
//!   state changes: `Invoice`, `PurchaseOrder`, `GoodsReceipt`,
//!   `MatchResult`, `ExceptionRecord`, `Rule`/`RuleVersion`, `ApprovalTask`,
//!   `AuditLog`, and their supporting rows.
//! - `value_objects` — immutable, identity-free types: typed IDs, the
//!   invoice/rule/approval state enums, and the matching-tolerance config.
//! - `events` — what happened: `InvoiceIngested`, `InvoiceStatusChanged`,
//!   `MatchCompleted`, `ApprovalDecided`, `RulePublished`, and friends.
//! - `aggregates` — `InvoiceAggregate`, the consistency boundary that
//!   validates every status transition against the state machine and
//!   buffers the resulting events for the application layer to persist.
//! - `services` — the stateless business logic: the matching engine, fraud
//!   scorer, duplicate checks, extraction-pass comparison, and
//!   approval-chain/decision rules, plus the `ports` module's async traits
//!   for blob storage, the LLM, FX rates, and email.
//! - `error` — `ApError`, the single error type every component returns.

pub mod aggregates;
pub mod entities;
pub mod error;
pub mod events;
pub mod services;
pub mod value_objects;

pub use aggregates::InvoiceAggregate;
pub use entities::{
    AiCallLog, AiFeedback, ApprovalMatrixRule, ApprovalTask, ApprovalToken, AuditLog, ExceptionComment,
    ExceptionRecord, ExtractionResult, GRLineItem, GoodsReceipt, Invoice, InvoiceLineItem, LineItemMatch,
    MatchResult, OverrideLog, POLineItem, PurchaseOrder, PurchaseOrderStatus, RecurringInvoicePattern, Rule,
    RuleRecommendation, RuleRecommendationStatus, RuleVersion, RuleVersionSource, SlaAlert, SlaAlertSeverity,
    UserDelegation,
};
pub use error::ApError;
pub use events::{DomainEvent, InvoiceEvent};
pub use value_objects::{
    ApprovalAction, ApprovalChannel, ApprovalTaskStatus, ExceptionCode, ExceptionSeverity, ExceptionStatus,
    InvoiceStatus, LineMatchStatus, MatchStatus, MatchType, MatchingToleranceConfig, RuleVersionStatus,
};
