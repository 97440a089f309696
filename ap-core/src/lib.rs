// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Application and infrastructure layers for the accounts-payable
//! operations platform, split into a library so the `ap-core` binary and
//! the `tests/` integration suite share one compiled copy of the services,
//! repositories and adapters instead of the tests re-declaring them.

pub mod application;
pub mod infrastructure;
pub mod presentation;
