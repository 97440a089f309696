// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use crate::entities::Invoice;
use crate::error::ApError;
use crate::events::{InvoiceEvent, InvoiceIngestedEvent, InvoiceStatusChangedEvent};
use crate::value_objects::{InvoiceId, InvoiceStatus, UserId};

/// Wraps an `Invoice` with its buffered, not-yet-persisted events.
///
/// The application layer loads an `Invoice` row, wraps it here, calls
/// `transition_to`, then persists both the updated row and
/// `uncommitted_events()` in the same transaction before calling
/// `mark_events_as_committed`.
#[derive(Debug, Clone)]
pub struct InvoiceAggregate {
    invoice: Invoice,
    uncommitted_events: Vec<InvoiceEvent>,
}

impl InvoiceAggregate {
    /// Wraps a freshly ingested invoice and raises its `InvoiceIngested`
    /// event.
    pub fn new(invoice: Invoice) -> Self {
        let event = InvoiceIngestedEvent::new(
            invoice.id.as_uuid(),
            invoice.vendor_id.map(|v| v.as_uuid()).unwrap_or_default(),
            invoice.source.as_str(),
        );
        Self {
            invoice,
            uncommitted_events: vec![InvoiceEvent::InvoiceIngested(event)],
        }
    }

    /// Wraps an invoice loaded from storage with no pending events.
    pub fn load(invoice: Invoice) -> Self {
        Self {
            invoice,
            uncommitted_events: Vec::new(),
        }
    }

    pub fn invoice(&self) -> &Invoice {
        &self.invoice
    }

    pub fn into_invoice(self) -> Invoice {
        self.invoice
    }

    pub fn id(&self) -> InvoiceId {
        self.invoice.id
    }

    pub fn status(&self) -> InvoiceStatus {
        self.invoice.status
    }

    pub fn uncommitted_events(&self) -> &[InvoiceEvent] {
        &self.uncommitted_events
    }

    pub fn mark_events_as_committed(&mut self) {
        self.uncommitted_events.clear();
    }

    /// Moves the invoice to `next`, rejecting anything `InvoiceStatus`
    /// doesn't list as legal (spec.md §4.8).
    pub fn transition_to(&mut self, next: InvoiceStatus, actor_id: Option<UserId>) -> Result<(), ApError> {
        let current = self.invoice.status;
        if !current.can_transition_to(next) {
            return Err(ApError::invalid_transition(format!(
                "{} -> {}",
                current.as_str(),
                next.as_str()
            )));
        }

        self.invoice.status = next;
        self.invoice.updated_at = chrono::Utc::now();

        let event = InvoiceStatusChangedEvent::new(
            self.invoice.id.as_uuid(),
            current,
            next,
            actor_id.map(|id| id.as_uuid()),
        );
        self.uncommitted_events
            .push(InvoiceEvent::InvoiceStatusChanged(event));

        Ok(())
    }
}
