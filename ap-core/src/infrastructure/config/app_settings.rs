// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Application settings (spec.md §6's exhaustive configuration list), layered
//! as defaults → an optional `config/default.toml` file → `AP_`-prefixed
//! environment variables, the last source winning.

use std::collections::HashMap;
use std::path::Path;

use ap_domain::ApError;
use serde::{Deserialize, Serialize};

/// Duplicate-detection window and tolerances (spec.md §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateSettings {
    pub window_days: i64,
    pub amount_tolerance_pct: f64,
    pub date_window_days: i64,
}

impl Default for DuplicateSettings {
    fn default() -> Self {
        Self { window_days: 7, amount_tolerance_pct: 0.02, date_window_days: 7 }
    }
}

/// Fraud-scoring band thresholds (spec.md §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudThresholdSettings {
    pub medium: i32,
    pub high: i32,
    pub critical: i32,
}

impl Default for FraudThresholdSettings {
    fn default() -> Self {
        Self { medium: 20, high: 40, critical: 60 }
    }
}

/// OCR / extraction dual-pass settings (spec.md §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSettings {
    pub ocr_min_confidence: f64,
    pub dual_pass_max_mismatches: i32,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self { ocr_min_confidence: 0.75, dual_pass_max_mismatches: 1 }
    }
}

/// A role's assigned approver: the user id that lands on `ApprovalTask`
/// records and the address `EmailPort` notifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproverAssignment {
    pub user_id: String,
    pub email: String,
}

/// Approval-token issuance settings (spec.md §6's token format).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalSettings {
    pub token_secret: String,
    pub token_expire_hours: i64,
    pub auto_approve_threshold: f64,
    /// Maps an `ApprovalMatrixRule::approver_role` (e.g. `"MANAGER"`) to the
    /// user responsible for that role. The approval matrix names roles, not
    /// users, so something has to resolve the indirection; a real deployment
    /// would back this with an org directory, but a static map is enough for
    /// the matrix sizes spec.md §4.9 describes.
    #[serde(default)]
    pub role_directory: HashMap<String, ApproverAssignment>,
    /// Base URL the approve/reject links in notification emails are built
    /// against, e.g. `https://ap.internal`.
    #[serde(default = "default_approval_base_url")]
    pub base_url: String,
}

fn default_approval_base_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for ApprovalSettings {
    fn default() -> Self {
        Self {
            token_secret: "change-me-in-production".to_string(),
            token_expire_hours: 48,
            auto_approve_threshold: 5000.00,
            role_directory: HashMap::new(),
            base_url: default_approval_base_url(),
        }
    }
}

/// Outbound email settings. Defaults to disabled (`LoggingEmailAdapter`
/// records notifications via `tracing` instead of sending them) so tests
/// and a bare `cargo run` never need a reachable SMTP relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    pub enabled: bool,
    pub smtp_relay: Option<String>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from_address: String,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_relay: None,
            smtp_username: None,
            smtp_password: None,
            from_address: "ap-platform@example.com".to_string(),
        }
    }
}

/// `LlmPort` backend selection. Defaults to disabled (`StubLlmClient`, a
/// deterministic no-network stand-in), matching spec.md §9's "LLM as opaque
/// port" design note — the full test suite and a bare `cargo run` must never
/// depend on a reachable LLM endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_extract_model")]
    pub extract_model: String,
    #[serde(default = "default_narrate_model")]
    pub narrate_model: String,
}

fn default_extract_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_narrate_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            api_key: None,
            extract_model: default_extract_model(),
            narrate_model: default_narrate_model(),
        }
    }
}

/// Blob store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobSettings {
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub bucket: String,
    /// Filesystem root backing `FilesystemBlobStore` when no remote endpoint is set.
    pub root: String,
}

impl Default for BlobSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            access_key: None,
            secret_key: None,
            bucket: "ap-documents".to_string(),
            root: "./blobs".to_string(),
        }
    }
}

/// Cron expressions for the five scheduler jobs (spec.md §4.11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    pub enabled: bool,
    pub mailbox_poll_cron: String,
    pub sla_sweep_cron: String,
    pub compliance_expiry_cron: String,
    pub recurring_pattern_cron: String,
    pub feedback_analysis_cron: String,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mailbox_poll_cron: "0 */5 * * * *".to_string(),
            sla_sweep_cron: "0 0 9 * * *".to_string(),
            compliance_expiry_cron: "0 0 1 * * Mon".to_string(),
            recurring_pattern_cron: "0 0 2 * * Mon".to_string(),
            feedback_analysis_cron: "0 0 0 * * Sun".to_string(),
        }
    }
}

/// All application-level settings, assembled once at startup and shared
/// read-only (behind an `Arc`) across the application services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_reference_currency")]
    pub reference_currency: String,
    #[serde(default)]
    pub currency_rates: HashMap<String, f64>,
    #[serde(default)]
    pub duplicate: DuplicateSettings,
    #[serde(default)]
    pub fraud_thresholds: FraudThresholdSettings,
    #[serde(default)]
    pub extraction: ExtractionSettings,
    #[serde(default)]
    pub approval: ApprovalSettings,
    #[serde(default)]
    pub sla_warning_days_before: i64,
    #[serde(default)]
    pub blob: BlobSettings,
    #[serde(default)]
    pub task_broker_url: Option<String>,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub email: EmailSettings,
    #[serde(default)]
    pub llm: LlmSettings,

    // Ambient, process-level additions not named in spec.md §6 but needed to
    // run the process at all.
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,
    #[serde(default)]
    pub mailbox_inbox_dir: Option<String>,
}

fn default_reference_currency() -> String {
    "USD".to_string()
}

fn default_database_url() -> String {
    "sqlite://ap.db".to_string()
}

fn default_worker_concurrency() -> usize {
    4
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            reference_currency: default_reference_currency(),
            currency_rates: HashMap::new(),
            duplicate: DuplicateSettings::default(),
            fraud_thresholds: FraudThresholdSettings::default(),
            extraction: ExtractionSettings::default(),
            approval: ApprovalSettings::default(),
            sla_warning_days_before: 3,
            blob: BlobSettings::default(),
            task_broker_url: None,
            scheduler: SchedulerSettings::default(),
            email: EmailSettings::default(),
            llm: LlmSettings::default(),
            database_url: default_database_url(),
            worker_concurrency: default_worker_concurrency(),
            mailbox_inbox_dir: None,
        }
    }
}

impl AppSettings {
    /// Loads settings by layering compiled-in defaults, an optional TOML
    /// file at `config_path`, and `AP_`-prefixed environment variables
    /// (`AP_DATABASE_URL`, `AP_APPROVAL__TOKEN_SECRET`, etc, `__` as the
    /// nested-key separator), the last source taking precedence.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ApError> {
        let defaults = AppSettings::default();
        let defaults_json = serde_json::to_value(&defaults)
            .map_err(|e| ApError::Configuration(format!("failed to serialize settings defaults: {e}")))?;

        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&defaults_json).map_err(|e| ApError::Configuration(e.to_string()))?);

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("AP")
                .separator("__")
                .try_parsing(true),
        );

        let assembled = builder
            .build()
            .map_err(|e| ApError::Configuration(format!("failed to assemble settings: {e}")))?;

        assembled
            .try_deserialize()
            .map_err(|e| ApError::Configuration(format!("failed to deserialize settings: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let settings = AppSettings::default();
        assert_eq!(settings.reference_currency, "USD");
        assert_eq!(settings.duplicate.window_days, 7);
        assert_eq!(settings.duplicate.amount_tolerance_pct, 0.02);
        assert_eq!(settings.fraud_thresholds.medium, 20);
        assert_eq!(settings.fraud_thresholds.high, 40);
        assert_eq!(settings.fraud_thresholds.critical, 60);
        assert_eq!(settings.extraction.ocr_min_confidence, 0.75);
        assert_eq!(settings.extraction.dual_pass_max_mismatches, 1);
        assert_eq!(settings.approval.token_expire_hours, 48);
        assert!(settings.scheduler.enabled);
    }

    #[test]
    fn load_with_no_file_returns_defaults() {
        let settings = AppSettings::load(None).unwrap();
        assert_eq!(settings.reference_currency, "USD");
        assert_eq!(settings.database_url, "sqlite://ap.db");
    }

    #[test]
    fn load_layers_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "reference_currency = \"EUR\"\ndatabase_url = \"sqlite://test.db\"\n").unwrap();

        let settings = AppSettings::load(Some(&path)).unwrap();
        assert_eq!(settings.reference_currency, "EUR");
        assert_eq!(settings.database_url, "sqlite://test.db");
        // Untouched defaults still apply.
        assert_eq!(settings.fraud_thresholds.critical, 60);
    }

    #[test]
    fn load_missing_file_path_falls_back_to_defaults() {
        let settings = AppSettings::load(Some(Path::new("/nonexistent/settings.toml"))).unwrap();
        assert_eq!(settings.reference_currency, "USD");
    }
}
