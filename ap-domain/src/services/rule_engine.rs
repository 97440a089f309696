// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Pure rule-engine logic (spec.md §4.2): picking the active version of a
//! rule type out of a candidate list, and validating publish/reject/archive
//! transitions. The repository fetch (`WHERE rule_type = ? AND status =
//! 'published'`) and the persistence of the supersede/publish pair live in
//! `ap-core`'s `rule_service`; this module only knows about already-loaded
//! rows.

use serde_json::Value;

use crate::entities::RuleVersion;
use crate::error::ApError;
use crate::value_objects::{MatchingToleranceConfig, RuleVersionId, RuleVersionStatus};

/// The resolved config for a rule type: either a published version's config
/// plus its id, or the hardcoded default with no id to record.
#[derive(Debug, Clone)]
pub struct ActiveRule {
    pub config: Value,
    pub version_id: Option<RuleVersionId>,
}

/// Picks the latest (by `published_at`, ties broken by `published_at`
/// descending then `version_number` descending) published version among
/// candidates already filtered to one `rule_type` (spec.md §4.2
/// `get_active_rules`). Falls back to the `matching_tolerance` default
/// config — serialized so callers get a uniform `Value` regardless of
/// whether a version was found — when no published version exists.
pub fn resolve_active_rule(candidates: &[RuleVersion]) -> ActiveRule {
    let chosen = candidates
        .iter()
        .filter(|v| v.status == RuleVersionStatus::Published)
        .max_by_key(|v| (v.published_at, v.version_number));

    match chosen {
        Some(version) => ActiveRule {
            config: version.config.clone(),
            version_id: Some(version.id),
        },
        None => ActiveRule {
            config: serde_json::to_value(MatchingToleranceConfig::default())
                .unwrap_or_else(|_| Value::Object(Default::default())),
            version_id: None,
        },
    }
}

/// Validates a publish request (spec.md §4.2): the version must be `draft`
/// or `in_review`. The caller is responsible for atomically superseding
/// whichever version was previously published for the same `rule_id`.
pub fn validate_publish(current_status: RuleVersionStatus) -> Result<(), ApError> {
    if current_status.can_transition_to(RuleVersionStatus::Published) {
        Ok(())
    } else {
        Err(ApError::invalid_transition(format!(
            "{} -> published",
            current_status.as_str()
        )))
    }
}

/// Validates a reject request (spec.md §4.2).
pub fn validate_reject(current_status: RuleVersionStatus) -> Result<(), ApError> {
    if current_status.can_transition_to(RuleVersionStatus::Rejected) {
        Ok(())
    } else {
        Err(ApError::invalid_transition(format!(
            "{} -> rejected",
            current_status.as_str()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::RuleVersionSource;
    use crate::value_objects::RuleId;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn draft_version(rule_id: RuleId, version_number: i32) -> RuleVersion {
        RuleVersion::new_draft(rule_id, version_number, json!({}), RuleVersionSource::Manual)
    }

    #[test]
    fn no_published_version_returns_hardcoded_default_with_no_id() {
        let rule_id = RuleId::new();
        let candidates = vec![draft_version(rule_id, 1)];
        let active = resolve_active_rule(&candidates);
        assert!(active.version_id.is_none());
        let cfg: MatchingToleranceConfig = serde_json::from_value(active.config).unwrap();
        assert_eq!(cfg, MatchingToleranceConfig::default());
    }

    #[test]
    fn latest_published_by_timestamp_wins() {
        let rule_id = RuleId::new();
        let mut older = draft_version(rule_id, 1);
        older.status = RuleVersionStatus::Published;
        older.published_at = Some(Utc::now() - Duration::days(1));
        older.config = json!({ "amount_tolerance_abs": 10.0 });

        let mut newer = draft_version(rule_id, 2);
        newer.status = RuleVersionStatus::Published;
        newer.published_at = Some(Utc::now());
        newer.config = json!({ "amount_tolerance_abs": 99.0 });

        let active = resolve_active_rule(&[older, newer.clone()]);
        assert_eq!(active.version_id, Some(newer.id));
        assert_eq!(active.config, newer.config);
    }

    #[test]
    fn publish_legal_only_from_draft_or_in_review() {
        assert!(validate_publish(RuleVersionStatus::Draft).is_ok());
        assert!(validate_publish(RuleVersionStatus::InReview).is_ok());
        assert!(validate_publish(RuleVersionStatus::Published).is_err());
        assert!(validate_publish(RuleVersionStatus::Archived).is_err());
    }

    #[test]
    fn reject_legal_only_from_draft_or_in_review() {
        assert!(validate_reject(RuleVersionStatus::InReview).is_ok());
        assert!(validate_reject(RuleVersionStatus::Superseded).is_err());
    }
}
