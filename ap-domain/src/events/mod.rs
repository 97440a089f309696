// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain events (spec.md §3, §4.1): the occurrences an `InvoiceAggregate`
//! emits as it moves through ingestion, matching, exception handling, and
//! approval. Consumed by the audit trail and by the scheduler jobs that
//! react to state changes.

mod ap_events;

pub use ap_events::{
    ApprovalDecidedEvent, ApprovalRequestedEvent, DomainEvent, ExceptionOpenedEvent,
    ExceptionResolvedEvent, InvoiceEvent, InvoiceIngestedEvent, InvoiceStatusChangedEvent,
    MatchCompletedEvent, RuleArchivedEvent, RulePublishedEvent,
};
