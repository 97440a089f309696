// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Database connection pool and schema migrations.
//!
//! Every persisted entity is a JSON blob in its own table (`id`, `data`,
//! `created_at`, `updated_at`), the same storage shape the teacher's
//! `SqliteRepository<T>` uses. The audit table is the one exception: a
//! `BEFORE UPDATE`/`BEFORE DELETE` trigger makes it append-only at the
//! schema level (spec.md §4.1), since SQLite has no per-table GRANT system.

use ap_domain::ApError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

const BLOB_TABLES: &[&str] = &[
    "invoices",
    "extraction_results",
    "purchase_orders",
    "goods_receipts",
    "match_results",
    "exception_records",
    "rules",
    "rule_versions",
    "approval_tasks",
    "approval_tokens",
    "user_delegations",
    "approval_matrix_rules",
    "override_logs",
    "ai_call_logs",
    "ai_feedback",
    "sla_alerts",
    "recurring_invoice_patterns",
    "rule_recommendations",
    "vendor_compliance_docs",
];

/// Opens (creating if absent) the SQLite database at `database_url` and runs
/// schema migrations.
pub async fn connect(database_url: &str) -> Result<SqlitePool, ApError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| ApError::Configuration(format!("invalid database_url: {e}")))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
        .map_err(|e| ApError::Database(e.to_string()))?;

    migrate(&pool).await?;
    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> Result<(), ApError> {
    for table in BLOB_TABLES {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )"
        );
        sqlx::query(&ddl).execute(pool).await.map_err(|e| ApError::Database(e.to_string()))?;
    }

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS audit_logs (
            id TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| ApError::Database(e.to_string()))?;

    // spec.md §4.1: "the underlying store MUST refuse updates and deletes".
    sqlx::query(
        "CREATE TRIGGER IF NOT EXISTS audit_logs_no_update
         BEFORE UPDATE ON audit_logs
         BEGIN
             SELECT RAISE(ABORT, 'audit_logs is append-only: update forbidden');
         END",
    )
    .execute(pool)
    .await
    .map_err(|e| ApError::Database(e.to_string()))?;

    sqlx::query(
        "CREATE TRIGGER IF NOT EXISTS audit_logs_no_delete
         BEFORE DELETE ON audit_logs
         BEGIN
             SELECT RAISE(ABORT, 'audit_logs is append-only: delete forbidden');
         END",
    )
    .execute(pool)
    .await
    .map_err(|e| ApError::Database(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_creates_all_tables() {
        let pool = connect(":memory:").await.unwrap();
        for table in BLOB_TABLES.iter().chain(["audit_logs"].iter()) {
            let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(row.0, 0);
        }
    }

    #[tokio::test]
    async fn audit_log_rejects_update_and_delete() {
        let pool = connect(":memory:").await.unwrap();
        sqlx::query("INSERT INTO audit_logs (id, data, created_at) VALUES ('a1', '{}', '2025-01-01T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap();

        let update = sqlx::query("UPDATE audit_logs SET data = '{\"x\":1}' WHERE id = 'a1'")
            .execute(&pool)
            .await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM audit_logs WHERE id = 'a1'").execute(&pool).await;
        assert!(delete.is_err());
    }
}
