// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The `matching_tolerance` rule type's config (spec.md §4.2). Missing keys
//! in a stored config payload fall back to these defaults field-by-field,
//! rather than the whole config falling back to defaults on any one missing
//! key.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchingToleranceConfig {
    pub amount_tolerance_pct: f64,
    pub amount_tolerance_abs: f64,
    pub qty_tolerance_pct: f64,
    pub auto_approve_threshold: f64,
    pub auto_approve_requires_match: bool,
}

impl Default for MatchingToleranceConfig {
    fn default() -> Self {
        Self {
            amount_tolerance_pct: 0.02,
            amount_tolerance_abs: 50.00,
            qty_tolerance_pct: 0.00,
            auto_approve_threshold: 5000.00,
            auto_approve_requires_match: true,
        }
    }
}

impl MatchingToleranceConfig {
    /// Parses a stored opaque JSON config payload, applying per-key defaults
    /// for anything absent or malformed (spec.md §4.2, §7 "Rule config parse
    /// failure").
    pub fn from_payload(payload: &Value) -> Self {
        let defaults = Self::default();
        Self {
            amount_tolerance_pct: payload
                .get("amount_tolerance_pct")
                .and_then(Value::as_f64)
                .unwrap_or(defaults.amount_tolerance_pct),
            amount_tolerance_abs: payload
                .get("amount_tolerance_abs")
                .and_then(Value::as_f64)
                .unwrap_or(defaults.amount_tolerance_abs),
            qty_tolerance_pct: payload
                .get("qty_tolerance_pct")
                .and_then(Value::as_f64)
                .unwrap_or(defaults.qty_tolerance_pct),
            auto_approve_threshold: payload
                .get("auto_approve_threshold")
                .and_then(Value::as_f64)
                .unwrap_or(defaults.auto_approve_threshold),
            auto_approve_requires_match: payload
                .get("auto_approve_requires_match")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.auto_approve_requires_match),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_keys_fall_back_individually() {
        let payload = json!({ "amount_tolerance_abs": 100.0 });
        let cfg = MatchingToleranceConfig::from_payload(&payload);
        assert_eq!(cfg.amount_tolerance_abs, 100.0);
        assert_eq!(cfg.amount_tolerance_pct, 0.02);
        assert_eq!(cfg.auto_approve_threshold, 5000.00);
    }

    #[test]
    fn empty_payload_is_all_defaults() {
        let cfg = MatchingToleranceConfig::from_payload(&json!({}));
        assert_eq!(cfg, MatchingToleranceConfig::default());
    }
}
