// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Value objects: immutable, identity-free types defined entirely by their
//! attributes, following the teacher's `PipelineId`/`ChunkSize` pattern.

mod ids;
mod invoice_status;
mod match_status;
mod approval_status;
mod rule_status;
mod exception_code;
mod rule_config;

pub use ids::*;
pub use invoice_status::InvoiceStatus;
pub use match_status::{LineMatchStatus, MatchStatus, MatchType};
pub use approval_status::{ApprovalAction, ApprovalChannel, ApprovalTaskStatus};
pub use rule_status::RuleVersionStatus;
pub use exception_code::{ExceptionCode, ExceptionSeverity, ExceptionStatus};
pub use rule_config::MatchingToleranceConfig;
