// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    TwoWay,
    ThreeWay,
    NonPo,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::TwoWay => "2way",
            MatchType::ThreeWay => "3way",
            MatchType::NonPo => "non_po",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    Partial,
    Exception,
    Pending,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Matched => "matched",
            MatchStatus::Partial => "partial",
            MatchStatus::Exception => "exception",
            MatchStatus::Pending => "pending",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineMatchStatus {
    Matched,
    QtyVariance,
    PriceVariance,
    Unmatched,
}

impl LineMatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineMatchStatus::Matched => "matched",
            LineMatchStatus::QtyVariance => "qty_variance",
            LineMatchStatus::PriceVariance => "price_variance",
            LineMatchStatus::Unmatched => "unmatched",
        }
    }
}
