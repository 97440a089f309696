// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain error types.
//!
//! One enum for every failure category the core can produce, categorized the
//! way spec.md §7 describes them so that callers can match on category
//! rather than string content.

mod ap_error;

pub use ap_error::ApError;
