// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Rule/rule-version lifecycle (spec.md §4.2): resolving the active config
//! for a rule type, and the draft → published/rejected → superseded/archived
//! transitions an admin drives.

use std::sync::Arc;

use ap_domain::services::rule_engine::{resolve_active_rule, validate_publish, validate_reject, ActiveRule};
use ap_domain::value_objects::{RuleId, RuleVersionId, RuleVersionStatus};
use ap_domain::{ApError, Rule, RuleVersion};
use chrono::Utc;

use crate::infrastructure::repositories::RuleRepository;

pub struct RuleService {
    rules: Arc<RuleRepository>,
}

impl RuleService {
    pub fn new(rules: Arc<RuleRepository>) -> Self {
        Self { rules }
    }

    /// The config currently in force for a rule type, falling back to the
    /// built-in default when nothing has ever been published (spec.md
    /// §4.2).
    pub async fn active_config(&self, rule_type: &str) -> Result<ActiveRule, ApError> {
        let candidates = self.rules.find_published_by_rule_type(rule_type).await?;
        Ok(resolve_active_rule(&candidates))
    }

    pub async fn create_draft(&self, rule_id: RuleId, version_number: i32, config: serde_json::Value, source: ap_domain::entities::RuleVersionSource) -> Result<RuleVersion, ApError> {
        let version = RuleVersion::new_draft(rule_id, version_number, config, source);
        self.rules.save_version(&version).await?;
        Ok(version)
    }

    /// Publishes a draft/in-review version, superseding whatever else was
    /// published for the same rule (spec.md §4.2).
    pub async fn publish(&self, version_id: RuleVersionId) -> Result<RuleVersion, ApError> {
        let current = self
            .rules
            .find_version_by_id(version_id)
            .await?
            .ok_or_else(|| ApError::not_found(format!("rule version {version_id} not found")))?;
        validate_publish(current.status)?;
        self.rules.publish_version(version_id, Utc::now()).await
    }

    pub async fn reject(&self, version_id: RuleVersionId) -> Result<RuleVersion, ApError> {
        let mut version = self
            .rules
            .find_version_by_id(version_id)
            .await?
            .ok_or_else(|| ApError::not_found(format!("rule version {version_id} not found")))?;
        validate_reject(version.status)?;
        version.status = RuleVersionStatus::Rejected;
        self.rules.save_version(&version).await?;
        Ok(version)
    }

    pub async fn ensure_rule(&self, rule_type: &str, name: &str) -> Result<Rule, ApError> {
        if let Some(rule) = self.rules.find_rule_by_type(rule_type).await? {
            return Ok(rule);
        }
        let rule = Rule { id: RuleId::new(), rule_type: rule_type.to_string(), name: name.to_string(), created_at: Utc::now() };
        self.rules.save_rule(&rule).await?;
        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_domain::entities::RuleVersionSource;
    use serde_json::json;

    async fn service() -> (RuleService, Rule) {
        let pool = crate::infrastructure::db::connect(":memory:").await.unwrap();
        let repo = Arc::new(RuleRepository::new(pool));
        let svc = RuleService::new(repo);
        let rule = svc.ensure_rule("matching_tolerance", "Matching Tolerance").await.unwrap();
        (svc, rule)
    }

    #[tokio::test]
    async fn active_config_falls_back_to_default_when_nothing_published() {
        let (svc, _rule) = service().await;
        let active = svc.active_config("matching_tolerance").await.unwrap();
        assert!(active.version_id.is_none());
    }

    #[tokio::test]
    async fn publish_then_active_config_uses_published_version() {
        let (svc, rule) = service().await;
        let draft = svc.create_draft(rule.id, 1, json!({"amount_tolerance_pct": 0.05}), RuleVersionSource::Manual).await.unwrap();
        let published = svc.publish(draft.id).await.unwrap();
        assert_eq!(published.status, RuleVersionStatus::Published);

        let active = svc.active_config("matching_tolerance").await.unwrap();
        assert_eq!(active.version_id, Some(draft.id));
    }

    #[tokio::test]
    async fn reject_rejects_draft() {
        let (svc, rule) = service().await;
        let draft = svc.create_draft(rule.id, 1, json!({}), RuleVersionSource::Manual).await.unwrap();
        let rejected = svc.reject(draft.id).await.unwrap();
        assert_eq!(rejected.status, RuleVersionStatus::Rejected);
    }
}
