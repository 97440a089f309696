// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Type-safe surrogate identifiers.
//!
//! Each entity gets its own newtype wrapping a `Uuid` so that e.g. an
//! `InvoiceId` can never be passed where a `RuleVersionId` is expected, the
//! same discipline the teacher applies with `PipelineId`/`StageId`.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

typed_id!(InvoiceId);
typed_id!(InvoiceLineItemId);
typed_id!(VendorId);
typed_id!(PurchaseOrderId);
typed_id!(POLineItemId);
typed_id!(GoodsReceiptId);
typed_id!(GRLineItemId);
typed_id!(MatchResultId);
typed_id!(LineItemMatchId);
typed_id!(ExceptionRecordId);
typed_id!(ExceptionCommentId);
typed_id!(RuleId);
typed_id!(RuleVersionId);
typed_id!(ApprovalTaskId);
typed_id!(ApprovalTokenId);
typed_id!(AuditLogId);
typed_id!(ExtractionResultId);
typed_id!(UserId);
typed_id!(UserDelegationId);
typed_id!(ApprovalMatrixRuleId);
typed_id!(RecurringInvoicePatternId);
typed_id!(AiCallLogId);
typed_id!(AiFeedbackId);
typed_id!(SlaAlertId);
typed_id!(RuleRecommendationId);
typed_id!(VendorComplianceDocId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_ids_round_trip_through_uuid() {
        let raw = Uuid::new_v4();
        let id = InvoiceId::from_uuid(raw);
        assert_eq!(id.as_uuid(), raw);
        assert_eq!(id.to_string(), raw.to_string());
    }

    #[test]
    fn distinct_new_ids_are_not_equal() {
        assert_ne!(InvoiceId::new(), InvoiceId::new());
    }
}
