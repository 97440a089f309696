// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Entities: objects with a surrogate identity that persists through state
//! changes (spec.md §3).

mod invoice;
mod purchase_order;
mod goods_receipt;
mod matching;
mod exception;
mod rule;
mod approval;
mod audit;
mod support;

pub use invoice::{Invoice, InvoiceLineItem, InvoiceSource, PaymentStatus};
pub use purchase_order::{POLineItem, PurchaseOrder, PurchaseOrderStatus};
pub use goods_receipt::{GRLineItem, GoodsReceipt};
pub use matching::{ExtractionResult, LineItemMatch, MatchResult};
pub use exception::{ExceptionComment, ExceptionRecord};
pub use rule::{Rule, RuleVersion, RuleVersionSource};
pub use approval::{ApprovalMatrixRule, ApprovalTask, ApprovalToken, UserDelegation};
pub use audit::{AuditLog, OverrideLog};
pub use support::{
    AiCallLog, AiFeedback, RecurringInvoicePattern, RuleRecommendation, RuleRecommendationStatus, SlaAlert,
    SlaAlertSeverity, VendorComplianceDoc, VendorComplianceDocStatus,
};
