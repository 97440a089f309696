// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Approval-workflow persistence: tasks, one-time tokens, delegations, and
//! the approval matrix. `apply_decision` takes SQLite's write lock with
//! `BEGIN IMMEDIATE` before reading a task, so two approvers racing the same
//! token (or the same task via two channels) can't both push
//! `approved_count` past `required_count` (spec.md §4.9, §5).

use ap_domain::value_objects::{ApprovalMatrixRuleId, ApprovalTaskId, ApprovalTaskStatus, ApprovalTokenId, UserDelegationId, UserId};
use ap_domain::{ApError, ApprovalMatrixRule, ApprovalTask, ApprovalToken, UserDelegation};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use super::sql_repository::{SqlEntity, SqlRepository};

impl SqlEntity for ApprovalTask {
    fn id_string(&self) -> String {
        self.id.to_string()
    }
    fn table_name() -> &'static str {
        "approval_tasks"
    }
}

impl SqlEntity for ApprovalToken {
    fn id_string(&self) -> String {
        self.id.to_string()
    }
    fn table_name() -> &'static str {
        "approval_tokens"
    }
}

impl SqlEntity for UserDelegation {
    fn id_string(&self) -> String {
        self.id.to_string()
    }
    fn table_name() -> &'static str {
        "user_delegations"
    }
}

impl SqlEntity for ApprovalMatrixRule {
    fn id_string(&self) -> String {
        self.id.to_string()
    }
    fn table_name() -> &'static str {
        "approval_matrix_rules"
    }
}

pub struct ApprovalRepository {
    pool: SqlitePool,
    tasks: SqlRepository<ApprovalTask>,
    tokens: SqlRepository<ApprovalToken>,
    delegations: SqlRepository<UserDelegation>,
    matrix: SqlRepository<ApprovalMatrixRule>,
}

impl ApprovalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            tasks: SqlRepository::new(pool.clone()),
            tokens: SqlRepository::new(pool.clone()),
            delegations: SqlRepository::new(pool.clone()),
            matrix: SqlRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn save_task(&self, task: &ApprovalTask) -> Result<(), ApError> {
        self.tasks.save(task).await
    }

    pub async fn find_task_by_id(&self, id: ApprovalTaskId) -> Result<Option<ApprovalTask>, ApError> {
        self.tasks.find_by_id(&id.to_string()).await
    }

    pub async fn find_tasks_by_invoice_id(&self, invoice_id: ap_domain::value_objects::InvoiceId) -> Result<Vec<ApprovalTask>, ApError> {
        Ok(self
            .tasks
            .list_all()
            .await?
            .into_iter()
            .filter(|t| t.invoice_id == invoice_id)
            .collect())
    }

    pub async fn find_pending_tasks_for_approver(&self, approver_id: UserId) -> Result<Vec<ApprovalTask>, ApError> {
        Ok(self
            .tasks
            .list_all()
            .await?
            .into_iter()
            .filter(|t| {
                t.status == ApprovalTaskStatus::Pending
                    && (t.approver_id == approver_id || t.delegated_to == Some(approver_id))
            })
            .collect())
    }

    pub async fn save_token(&self, token: &ApprovalToken) -> Result<(), ApError> {
        self.tokens.save(token).await
    }

    pub async fn find_token_by_id(&self, id: ApprovalTokenId) -> Result<Option<ApprovalToken>, ApError> {
        self.tokens.find_by_id(&id.to_string()).await
    }

    pub async fn find_token_by_hash(&self, token_hash: &str) -> Result<Option<ApprovalToken>, ApError> {
        let rows = sqlx::query("SELECT data FROM approval_tokens WHERE json_extract(data, '$.token_hash') = ?")
            .bind(token_hash)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ApError::Database(e.to_string()))?;
        match rows.into_iter().next() {
            Some(r) => {
                let data: String = r.get("data");
                Ok(Some(serde_json::from_str(&data).map_err(ApError::from)?))
            }
            None => Ok(None),
        }
    }

    pub async fn save_delegation(&self, delegation: &UserDelegation) -> Result<(), ApError> {
        self.delegations.save(delegation).await
    }

    pub async fn find_delegation_by_id(&self, id: UserDelegationId) -> Result<Option<UserDelegation>, ApError> {
        self.delegations.find_by_id(&id.to_string()).await
    }

    pub async fn find_active_delegations_for(&self, delegator_id: UserId) -> Result<Vec<UserDelegation>, ApError> {
        Ok(self
            .delegations
            .list_all()
            .await?
            .into_iter()
            .filter(|d| d.delegator_id == delegator_id && d.is_active)
            .collect())
    }

    pub async fn save_matrix_rule(&self, rule: &ApprovalMatrixRule) -> Result<(), ApError> {
        self.matrix.save(rule).await
    }

    pub async fn find_matrix_rule_by_id(&self, id: ApprovalMatrixRuleId) -> Result<Option<ApprovalMatrixRule>, ApError> {
        self.matrix.find_by_id(&id.to_string()).await
    }

    pub async fn list_active_matrix_rules(&self) -> Result<Vec<ApprovalMatrixRule>, ApError> {
        Ok(self.matrix.list_all().await?.into_iter().filter(|r| r.is_active).collect())
    }

    /// Locks the task row, applies `mutate`, and writes it back inside one
    /// SQLite write transaction — the only path that should ever change
    /// `approved_count`/`status` on a task.
    pub async fn apply_decision<F>(&self, task_id: ApprovalTaskId, mutate: F) -> Result<ApprovalTask, ApError>
    where
        F: FnOnce(&mut ApprovalTask) -> Result<(), ApError>,
    {
        let mut conn = self.pool.acquire().await.map_err(|e| ApError::Database(e.to_string()))?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await.map_err(|e| ApError::Database(e.to_string()))?;

        let row = sqlx::query("SELECT data FROM approval_tasks WHERE id = ?")
            .bind(task_id.to_string())
            .fetch_optional(&mut *conn)
            .await;
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(ApError::Database(e.to_string()));
            }
        };
        let Some(row) = row else {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            return Err(ApError::not_found(format!("approval task {task_id} not found")));
        };

        let data: String = row.get("data");
        let mut task: ApprovalTask = match serde_json::from_str(&data) {
            Ok(t) => t,
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(ApError::from(e));
            }
        };

        if let Err(e) = mutate(&mut task) {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            return Err(e);
        }

        let now = chrono::Utc::now().to_rfc3339();
        let updated = match serde_json::to_string(&task) {
            Ok(s) => s,
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(ApError::from(e));
            }
        };
        if let Err(e) = sqlx::query("UPDATE approval_tasks SET data = ?, updated_at = ? WHERE id = ?")
            .bind(&updated)
            .bind(&now)
            .bind(task_id.to_string())
            .execute(&mut *conn)
            .await
        {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            return Err(ApError::Database(e.to_string()));
        }

        sqlx::query("COMMIT").execute(&mut *conn).await.map_err(|e| ApError::Database(e.to_string()))?;
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_domain::value_objects::InvoiceId;
    use chrono::{Duration, Utc};

    async fn repo() -> ApprovalRepository {
        let pool = crate::infrastructure::db::connect(":memory:").await.unwrap();
        ApprovalRepository::new(pool)
    }

    fn task() -> ApprovalTask {
        ApprovalTask::new(InvoiceId::new(), UserId::new(), 1, 1, Utc::now() + Duration::days(2), None)
    }

    #[tokio::test]
    async fn apply_decision_persists_mutation() {
        let repo = repo().await;
        let t = task();
        repo.save_task(&t).await.unwrap();

        let updated = repo
            .apply_decision(t.id, |task| {
                task.approved_count += 1;
                task.status = ApprovalTaskStatus::Approved;
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(updated.approved_count, 1);

        let reloaded = repo.find_task_by_id(t.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, ApprovalTaskStatus::Approved);
    }

    #[tokio::test]
    async fn apply_decision_propagates_mutate_error_without_writing() {
        let repo = repo().await;
        let t = task();
        repo.save_task(&t).await.unwrap();

        let result = repo
            .apply_decision(t.id, |_task| Err(ApError::AlreadyDecided("already decided".into())))
            .await;
        assert!(result.is_err());

        let reloaded = repo.find_task_by_id(t.id).await.unwrap().unwrap();
        assert_eq!(reloaded.approved_count, 0);
    }

    #[tokio::test]
    async fn find_token_by_hash_matches() {
        let repo = repo().await;
        let t = task();
        repo.save_task(&t).await.unwrap();
        let token = ApprovalToken {
            id: ApprovalTokenId::new(),
            task_id: t.id,
            token_hash: "deadbeef".into(),
            action: ap_domain::value_objects::ApprovalAction::Approve,
            expires_at: Utc::now() + Duration::days(1),
            used_at: None,
            is_used: false,
            created_at: Utc::now(),
        };
        repo.save_token(&token).await.unwrap();
        let found = repo.find_token_by_hash("deadbeef").await.unwrap().unwrap();
        assert_eq!(found.id, token.id);
    }
}
