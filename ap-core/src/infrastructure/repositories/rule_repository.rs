// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Rule and rule-version persistence. `Rule` and `RuleVersion` are stored in
//! separate tables, not as one composite row — a rule accumulates many
//! versions over its lifetime and the matching engine only ever needs the
//! currently-published one, so there is no parent+children cluster to keep
//! together the way there is for an invoice and its line items.

use ap_domain::value_objects::{RuleId, RuleVersionId, RuleVersionStatus};
use ap_domain::{ApError, Rule, RuleVersion};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use super::sql_repository::{SqlEntity, SqlRepository};

impl SqlEntity for Rule {
    fn id_string(&self) -> String {
        self.id.to_string()
    }
    fn table_name() -> &'static str {
        "rules"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RuleVersionRow(RuleVersion);

impl SqlEntity for RuleVersionRow {
    fn id_string(&self) -> String {
        self.0.id.to_string()
    }
    fn table_name() -> &'static str {
        "rule_versions"
    }
}

pub struct RuleRepository {
    rules: SqlRepository<Rule>,
    versions: SqlRepository<RuleVersionRow>,
}

impl RuleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { rules: SqlRepository::new(pool.clone()), versions: SqlRepository::new(pool) }
    }

    pub async fn save_rule(&self, rule: &Rule) -> Result<(), ApError> {
        self.rules.save(rule).await
    }

    pub async fn find_rule_by_id(&self, id: RuleId) -> Result<Option<Rule>, ApError> {
        self.rules.find_by_id(&id.to_string()).await
    }

    pub async fn find_rule_by_type(&self, rule_type: &str) -> Result<Option<Rule>, ApError> {
        Ok(self.rules.list_all().await?.into_iter().find(|r| r.rule_type == rule_type))
    }

    pub async fn save_version(&self, version: &RuleVersion) -> Result<(), ApError> {
        self.versions.save(&RuleVersionRow(version.clone())).await
    }

    pub async fn find_version_by_id(&self, id: RuleVersionId) -> Result<Option<RuleVersion>, ApError> {
        Ok(self.versions.find_by_id(&id.to_string()).await?.map(|r| r.0))
    }

    pub async fn find_versions_by_rule_id(&self, rule_id: RuleId) -> Result<Vec<RuleVersion>, ApError> {
        Ok(self
            .versions
            .list_all()
            .await?
            .into_iter()
            .map(|r| r.0)
            .filter(|v| v.rule_id == rule_id)
            .collect())
    }

    /// All published versions for a rule type, for
    /// `ap_domain::services::rule_engine::resolve_active_rule`.
    pub async fn find_published_by_rule_type(&self, rule_type: &str) -> Result<Vec<RuleVersion>, ApError> {
        let Some(rule) = self.find_rule_by_type(rule_type).await? else {
            return Ok(vec![]);
        };
        Ok(self
            .find_versions_by_rule_id(rule.id)
            .await?
            .into_iter()
            .filter(|v| v.status == RuleVersionStatus::Published)
            .collect())
    }

    /// Publishes `version_id` and supersedes whatever was previously
    /// published for the same rule, so at most one published version exists
    /// per rule at a time (spec.md §4.2).
    pub async fn publish_version(&self, version_id: RuleVersionId, published_at: chrono::DateTime<chrono::Utc>) -> Result<RuleVersion, ApError> {
        let mut target = self
            .find_version_by_id(version_id)
            .await?
            .ok_or_else(|| ApError::not_found(format!("rule version {version_id} not found")))?;

        let siblings = self.find_versions_by_rule_id(target.rule_id).await?;
        for mut sibling in siblings {
            if sibling.id != target.id && sibling.status == RuleVersionStatus::Published {
                sibling.status = RuleVersionStatus::Superseded;
                self.save_version(&sibling).await?;
            }
        }

        target.status = RuleVersionStatus::Published;
        target.published_at = Some(published_at);
        self.save_version(&target).await?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_domain::entities::RuleVersionSource;
    use chrono::Utc;
    use serde_json::json;

    async fn repo() -> RuleRepository {
        let pool = crate::infrastructure::db::connect(":memory:").await.unwrap();
        RuleRepository::new(pool)
    }

    async fn seed_rule(repo: &RuleRepository, rule_type: &str) -> Rule {
        let rule = Rule { id: RuleId::new(), rule_type: rule_type.into(), name: rule_type.into(), created_at: Utc::now() };
        repo.save_rule(&rule).await.unwrap();
        rule
    }

    #[tokio::test]
    async fn publish_supersedes_previous_published_version() {
        let repo = repo().await;
        let rule = seed_rule(&repo, "matching_tolerance").await;

        let v1 = RuleVersion::new_draft(rule.id, 1, json!({}), RuleVersionSource::Manual);
        repo.save_version(&v1).await.unwrap();
        let v1 = repo.publish_version(v1.id, Utc::now()).await.unwrap();
        assert_eq!(v1.status, RuleVersionStatus::Published);

        let v2 = RuleVersion::new_draft(rule.id, 2, json!({}), RuleVersionSource::Manual);
        repo.save_version(&v2).await.unwrap();
        repo.publish_version(v2.id, Utc::now()).await.unwrap();

        let reloaded_v1 = repo.find_version_by_id(v1.id).await.unwrap().unwrap();
        assert_eq!(reloaded_v1.status, RuleVersionStatus::Superseded);

        let published = repo.find_published_by_rule_type("matching_tolerance").await.unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].version_number, 2);
    }

    #[tokio::test]
    async fn unknown_rule_type_has_no_published_versions() {
        let repo = repo().await;
        let published = repo.find_published_by_rule_type("nonexistent").await.unwrap();
        assert!(published.is_empty());
    }

    proptest::proptest! {
        /// Publishing any number of successive draft versions leaves at most
        /// one published version behind, whichever was published last.
        #[test]
        fn at_most_one_published_version_survives_any_publish_count(publish_count in 1usize..8) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async {
                let repo = repo().await;
                let rule = seed_rule(&repo, "matching_tolerance").await;

                let mut last_published_number = 0;
                for n in 1..=publish_count {
                    let version = RuleVersion::new_draft(rule.id, n as i32, json!({}), RuleVersionSource::Manual);
                    repo.save_version(&version).await.unwrap();
                    repo.publish_version(version.id, Utc::now()).await.unwrap();
                    last_published_number = n as i32;
                }

                let published = repo.find_published_by_rule_type("matching_tolerance").await.unwrap();
                prop_assert_eq!(published.len(), 1);
                prop_assert_eq!(published[0].version_number, last_published_number);
                Ok(())
            })?;
        }
    }
}
