// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `Rule` and `RuleVersion` (spec.md §3, §4.2): a named, typed policy
//! container and its immutable versioned snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value_objects::{RuleId, RuleVersionId, RuleVersionStatus, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub rule_type: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleVersionSource {
    PolicyUpload,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleVersion {
    pub id: RuleVersionId,
    pub rule_id: RuleId,
    pub version_number: i32,
    pub status: RuleVersionStatus,
    pub source: RuleVersionSource,
    pub config: Value,
    pub ai_extracted: bool,
    pub shadow_mode: bool,
    pub change_summary: Option<String>,
    pub creator_id: Option<UserId>,
    pub reviewer_id: Option<UserId>,
    pub published_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RuleVersion {
    pub fn new_draft(rule_id: RuleId, version_number: i32, config: Value, source: RuleVersionSource) -> Self {
        Self {
            id: RuleVersionId::new(),
            rule_id,
            version_number,
            status: RuleVersionStatus::Draft,
            source,
            config,
            ai_extracted: false,
            shadow_mode: false,
            change_summary: None,
            creator_id: None,
            reviewer_id: None,
            published_at: None,
            archived_at: None,
            created_at: Utc::now(),
        }
    }
}
