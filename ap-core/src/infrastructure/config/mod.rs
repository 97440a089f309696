// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Application-level settings, distinct from `ap_bootstrap::config::AppConfig`
//! (the pre-load bootstrap settings): this is everything spec.md §6 names.

pub mod app_settings;

pub use app_settings::{
    AppSettings, ApprovalSettings, ApproverAssignment, BlobSettings, DuplicateSettings, EmailSettings,
    ExtractionSettings, FraudThresholdSettings, LlmSettings, SchedulerSettings,
};
