// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Logging Initialization
//!
//! Sets up the global `tracing` subscriber. Kept in bootstrap rather than
//! ap-core so that the logger is live before any application or
//! infrastructure code runs — including config-loading errors.
//!
//! ## Output
//!
//! - Human-readable, ANSI-colored output to stderr in development
//! - Compact single-line-per-event output when `AppConfig::is_verbose()` is
//!   false, full span context when true
//! - Honors `RUN_LOG` / `RUST_LOG` env filters over the configured level

use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;

/// Initializes the global tracing subscriber. Idempotent per process: a
/// second call is a no-op (returns `Err` from `try_init`, which we ignore).
pub fn init(level: LogLevel, verbose: bool) {
    let default_directive = level.to_tracing_level().to_string();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_thread_ids(verbose)
        .with_ansi(true);

    if verbose {
        let _ = subscriber.with_file(true).with_line_number(true).try_init();
    } else {
        let _ = subscriber.compact().try_init();
    }
}
