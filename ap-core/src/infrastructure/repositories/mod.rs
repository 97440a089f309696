// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! SQLite-backed repositories, one per aggregate, all built on the generic
//! JSON-blob `SqlRepository<T>`.

mod sql_repository;

pub mod approval_repository;
pub mod audit_repository;
pub mod exception_repository;
pub mod extraction_repository;
pub mod goods_receipt_repository;
pub mod invoice_repository;
pub mod matching_repository;
pub mod purchase_order_repository;
pub mod rule_repository;
pub mod support_repository;

pub use approval_repository::ApprovalRepository;
pub use audit_repository::AuditRepository;
pub use exception_repository::{ExceptionRecordRow, ExceptionRepository};
pub use extraction_repository::ExtractionRepository;
pub use goods_receipt_repository::{GoodsReceiptRecord, GoodsReceiptRepository};
pub use invoice_repository::{InvoiceRecord, InvoiceRepository};
pub use matching_repository::{MatchResultRecord, MatchingRepository};
pub use purchase_order_repository::{PurchaseOrderRecord, PurchaseOrderRepository};
pub use rule_repository::RuleRepository;
pub use support_repository::SupportRepository;
