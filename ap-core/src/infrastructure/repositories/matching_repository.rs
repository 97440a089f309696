// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Match-result persistence. At most one `MatchResult` per invoice
//! (spec.md §3) — `save` keys the row by `invoice_id`, not the match's own
//! id, so a re-match overwrites the prior result atomically instead of
//! appending a second row.

use ap_domain::value_objects::InvoiceId;
use ap_domain::{ApError, LineItemMatch, MatchResult};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::sql_repository::{SqlEntity, SqlRepository};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResultRecord {
    pub result: MatchResult,
    pub line_matches: Vec<LineItemMatch>,
}

impl SqlEntity for MatchResultRecord {
    fn id_string(&self) -> String {
        self.result.invoice_id.to_string()
    }
    fn table_name() -> &'static str {
        "match_results"
    }
}

pub struct MatchingRepository {
    inner: SqlRepository<MatchResultRecord>,
}

impl MatchingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { inner: SqlRepository::new(pool) }
    }

    /// Upserts keyed by `invoice_id`, so re-matching replaces the prior
    /// result rather than creating a second row.
    pub async fn save(&self, record: &MatchResultRecord) -> Result<(), ApError> {
        self.inner.save(record).await
    }

    pub async fn find_by_invoice_id(&self, invoice_id: InvoiceId) -> Result<Option<MatchResultRecord>, ApError> {
        self.inner.find_by_id(&invoice_id.to_string()).await
    }
}
