// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Exception codes and severity mapping (spec.md §4.3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionCode {
    PriceVariance,
    QtyVariance,
    QtyOverReceipt,
    GrnNotFound,
    MissingPo,
    VendorMismatch,
    DuplicateInvoice,
    FraudFlag,
    ExtractionLowConfidence,
    ExtractionDiscrepancy,
    ComplianceMissing,
    AmountOverThreshold,
    VendorDispute,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ExceptionCode {
    /// Default severity per spec.md §4.3's mapping table. Callers may
    /// override for codes that fall back to "default medium".
    pub fn default_severity(&self) -> ExceptionSeverity {
        use ExceptionCode::*;
        match self {
            FraudFlag => ExceptionSeverity::Critical,
            MissingPo | DuplicateInvoice | GrnNotFound | QtyOverReceipt => ExceptionSeverity::High,
            PriceVariance | QtyVariance | VendorDispute => ExceptionSeverity::Medium,
            _ => ExceptionSeverity::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        use ExceptionCode::*;
        match self {
            PriceVariance => "PRICE_VARIANCE",
            QtyVariance => "QTY_VARIANCE",
            QtyOverReceipt => "QTY_OVER_RECEIPT",
            GrnNotFound => "GRN_NOT_FOUND",
            MissingPo => "MISSING_PO",
            VendorMismatch => "VENDOR_MISMATCH",
            DuplicateInvoice => "DUPLICATE_INVOICE",
            FraudFlag => "FRAUD_FLAG",
            ExtractionLowConfidence => "EXTRACTION_LOW_CONFIDENCE",
            ExtractionDiscrepancy => "EXTRACTION_DISCREPANCY",
            ComplianceMissing => "COMPLIANCE_MISSING",
            AmountOverThreshold => "AMOUNT_OVER_THRESHOLD",
            VendorDispute => "VENDOR_DISPUTE",
            Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionStatus {
    Open,
    InProgress,
    Resolved,
    Escalated,
    Waived,
}

impl ExceptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionStatus::Open => "open",
            ExceptionStatus::InProgress => "in_progress",
            ExceptionStatus::Resolved => "resolved",
            ExceptionStatus::Escalated => "escalated",
            ExceptionStatus::Waived => "waived",
        }
    }
}
