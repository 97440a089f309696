// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Generic SQLite-backed repository: JSON-blob storage keyed by a string id,
//! the same pattern the teacher's `SqliteRepository<T>` uses. Per-entity
//! repositories wrap this with their own indexed-column queries (e.g.
//! `find_published_by_rule_type`) built directly against `pool()` when a
//! JSON-blob scan isn't selective enough.

use std::marker::PhantomData;

use ap_domain::ApError;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Trait for entities persisted as a JSON blob in a dedicated table.
pub trait SqlEntity: Clone + Send + Sync + Serialize + for<'de> Deserialize<'de> {
    fn id_string(&self) -> String;
    fn table_name() -> &'static str;
}

pub struct SqlRepository<T> {
    pool: SqlitePool,
    table_name: &'static str,
    _marker: PhantomData<T>,
}

impl<T: SqlEntity> SqlRepository<T> {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, table_name: T::table_name(), _marker: PhantomData }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn save(&self, entity: &T) -> Result<(), ApError> {
        let id = entity.id_string();
        let data = serde_json::to_string(entity)?;
        let now = chrono::Utc::now().to_rfc3339();
        let query = format!(
            "INSERT INTO {} (id, data, created_at, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            self.table_name
        );
        sqlx::query(&query)
            .bind(&id)
            .bind(&data)
            .bind(&now)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| ApError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<T>, ApError> {
        let query = format!("SELECT data FROM {} WHERE id = ?", self.table_name);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApError::Database(e.to_string()))?;
        row.map(|r| Self::decode(r)).transpose()
    }

    pub async fn list_all(&self) -> Result<Vec<T>, ApError> {
        let query = format!("SELECT data FROM {} ORDER BY created_at", self.table_name);
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ApError::Database(e.to_string()))?;
        rows.into_iter().map(Self::decode).collect()
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApError> {
        let query = format!("DELETE FROM {} WHERE id = ?", self.table_name);
        sqlx::query(&query)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| ApError::Database(e.to_string()))?;
        Ok(())
    }

    fn decode(row: sqlx::sqlite::SqliteRow) -> Result<T, ApError> {
        let data: String = row.get("data");
        serde_json::from_str(&data).map_err(ApError::from)
    }
}
