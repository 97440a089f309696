// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use thiserror::Error;

/// Domain-wide error type.
///
/// Every component returns this (or wraps it) so that the CLI and the job
/// worker can map failures to a retry/fail/record-exception decision without
/// parsing strings.
#[derive(Debug, Error)]
pub enum ApError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("already decided: {0}")]
    AlreadyDecided(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("token expired")]
    TokenExpired,

    #[error("token already used")]
    TokenUsed,

    #[error("token invalid")]
    TokenInvalid,

    #[error("not assigned: {0}")]
    NotAssigned(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApError {
    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller's retry-with-backoff loop (spec.md §7) applies.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApError::Io(_) | ApError::Database(_))
    }
}

impl From<serde_json::Error> for ApError {
    fn from(e: serde_json::Error) -> Self {
        ApError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ApError::Io("disk full".into()).is_transient());
        assert!(ApError::Database("timeout".into()).is_transient());
        assert!(!ApError::TokenExpired.is_transient());
        assert!(!ApError::InvalidTransition("x".into()).is_transient());
    }

    #[test]
    fn display_messages_are_informative() {
        assert_eq!(ApError::TokenUsed.to_string(), "token already used");
        assert_eq!(
            ApError::NotAssigned("approver-1".into()).to_string(),
            "not assigned: approver-1"
        );
    }
}
