// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Extraction-result persistence (spec.md §4.4). Rows are append-only: both
//! passes for an invoice are written once and never updated.

use ap_domain::value_objects::InvoiceId;
use ap_domain::{ApError, ExtractionResult};
use sqlx::{Row, SqlitePool};

use super::sql_repository::{SqlEntity, SqlRepository};

impl SqlEntity for ExtractionResult {
    fn id_string(&self) -> String {
        self.id.to_string()
    }
    fn table_name() -> &'static str {
        "extraction_results"
    }
}

pub struct ExtractionRepository {
    inner: SqlRepository<ExtractionResult>,
}

impl ExtractionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { inner: SqlRepository::new(pool) }
    }

    pub async fn save(&self, result: &ExtractionResult) -> Result<(), ApError> {
        self.inner.save(result).await
    }

    /// Both passes for an invoice, ordered by pass number.
    pub async fn find_by_invoice(&self, invoice_id: InvoiceId) -> Result<Vec<ExtractionResult>, ApError> {
        let rows = sqlx::query(
            "SELECT data FROM extraction_results
             WHERE json_extract(data, '$.invoice_id') = ?
             ORDER BY json_extract(data, '$.pass_number')",
        )
        .bind(invoice_id.to_string())
        .fetch_all(self.inner.pool())
        .await
        .map_err(|e| ApError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|r| {
                let data: String = r.get("data");
                serde_json::from_str(&data).map_err(ApError::from)
            })
            .collect()
    }
}
