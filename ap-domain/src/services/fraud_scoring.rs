// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Deterministic fraud scoring (spec.md §4.6). No LLM call, no I/O: every
//! input is a scalar or count the application layer has already fetched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy)]
pub struct FraudThresholds {
    pub medium: i32,
    pub high: i32,
    pub critical: i32,
}

impl Default for FraudThresholds {
    fn default() -> Self {
        Self {
            medium: 20,
            high: 40,
            critical: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Medium,
    High,
    Critical,
}

impl FraudThresholds {
    pub fn band_for(&self, score: i32) -> RiskBand {
        if score >= self.critical {
            RiskBand::Critical
        } else if score >= self.high {
            RiskBand::High
        } else if score >= self.medium {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }
}

/// The facts the scorer needs about the target invoice and its vendor's
/// history; all pre-fetched by the application layer.
#[derive(Debug, Clone)]
pub struct FraudScoringInput {
    pub total_amount: f64,
    pub invoice_date: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
    pub vendor_approved_invoice_count: i64,
    pub vendor_approved_mean_amount: Option<f64>,
    pub duplicate_window_days: i64,
    pub vendor_has_same_total_within_window: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FraudSignal {
    RoundAmount,
    AmountSpike,
    PotentialDuplicate,
    StaleInvoiceDate,
    NewVendor,
}

impl FraudSignal {
    pub fn weight(&self) -> i32 {
        match self {
            FraudSignal::RoundAmount => 10,
            FraudSignal::AmountSpike => 20,
            FraudSignal::PotentialDuplicate => 30,
            FraudSignal::StaleInvoiceDate => 10,
            FraudSignal::NewVendor => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FraudSignal::RoundAmount => "round_amount",
            FraudSignal::AmountSpike => "amount_spike",
            FraudSignal::PotentialDuplicate => "potential_duplicate",
            FraudSignal::StaleInvoiceDate => "stale_invoice_date",
            FraudSignal::NewVendor => "new_vendor",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FraudScoreResult {
    pub score: i32,
    pub signals: Vec<FraudSignal>,
    pub band: RiskBand,
}

const STALE_INVOICE_DAYS: i64 = 90;
const AMOUNT_SPIKE_MIN_HISTORY: i64 = 3;
const AMOUNT_SPIKE_MULTIPLIER: f64 = 2.0;
const NEW_VENDOR_MAX_HISTORY: i64 = 3;

/// Sums the triggered signal weights and classifies the result (spec.md
/// §4.6).
pub fn score_invoice(input: &FraudScoringInput, thresholds: &FraudThresholds) -> FraudScoreResult {
    let mut signals = Vec::new();

    let is_whole_number = input.total_amount.fract() == 0.0;
    if input.total_amount > 1000.0 && is_whole_number {
        signals.push(FraudSignal::RoundAmount);
    }

    if input.vendor_approved_invoice_count >= AMOUNT_SPIKE_MIN_HISTORY {
        if let Some(mean) = input.vendor_approved_mean_amount {
            if input.total_amount > mean * AMOUNT_SPIKE_MULTIPLIER {
                signals.push(FraudSignal::AmountSpike);
            }
        }
    }

    if input.vendor_has_same_total_within_window {
        signals.push(FraudSignal::PotentialDuplicate);
    }

    if let Some(invoice_date) = input.invoice_date {
        if (input.now - invoice_date).num_days() > STALE_INVOICE_DAYS {
            signals.push(FraudSignal::StaleInvoiceDate);
        }
    }

    if input.vendor_approved_invoice_count < NEW_VENDOR_MAX_HISTORY {
        signals.push(FraudSignal::NewVendor);
    }

    let score: i32 = signals.iter().map(FraudSignal::weight).sum();
    let band = thresholds.band_for(score);

    FraudScoreResult { score, signals, band }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base_input() -> FraudScoringInput {
        FraudScoringInput {
            total_amount: 500.0,
            invoice_date: Some(Utc::now()),
            now: Utc::now(),
            vendor_approved_invoice_count: 10,
            vendor_approved_mean_amount: Some(500.0),
            duplicate_window_days: 7,
            vendor_has_same_total_within_window: false,
        }
    }

    #[test]
    fn round_amount_signal_requires_whole_number_over_1000() {
        let mut input = base_input();
        input.total_amount = 1500.0;
        let result = score_invoice(&input, &FraudThresholds::default());
        assert!(result.signals.contains(&FraudSignal::RoundAmount));

        input.total_amount = 1500.50;
        let result = score_invoice(&input, &FraudThresholds::default());
        assert!(!result.signals.contains(&FraudSignal::RoundAmount));
    }

    #[test]
    fn new_vendor_and_amount_spike_need_history() {
        let mut input = base_input();
        input.vendor_approved_invoice_count = 1;
        let result = score_invoice(&input, &FraudThresholds::default());
        assert!(result.signals.contains(&FraudSignal::NewVendor));
        assert!(!result.signals.contains(&FraudSignal::AmountSpike));
    }

    #[test]
    fn amount_spike_triggers_above_double_the_mean() {
        let mut input = base_input();
        input.total_amount = 1200.0;
        input.vendor_approved_mean_amount = Some(500.0);
        let result = score_invoice(&input, &FraudThresholds::default());
        assert!(result.signals.contains(&FraudSignal::AmountSpike));
    }

    #[test]
    fn stale_invoice_date_checks_90_day_window() {
        let mut input = base_input();
        input.invoice_date = Some(Utc::now() - Duration::days(91));
        let result = score_invoice(&input, &FraudThresholds::default());
        assert!(result.signals.contains(&FraudSignal::StaleInvoiceDate));

        input.invoice_date = Some(Utc::now() - Duration::days(89));
        let result = score_invoice(&input, &FraudThresholds::default());
        assert!(!result.signals.contains(&FraudSignal::StaleInvoiceDate));
    }

    #[test]
    fn scenario_dual_authorization_thresholds() {
        // spec.md §8 scenario 3: amount_spike (20) + potential_duplicate (30) = 50.
        let mut input = base_input();
        input.total_amount = 41_666.67;
        input.vendor_approved_mean_amount = Some(10_000.0);
        input.vendor_has_same_total_within_window = true;
        let result = score_invoice(&input, &FraudThresholds::default());
        assert_eq!(result.score, 50);
        assert_eq!(result.band, RiskBand::High);
        assert!(result.score < FraudThresholds::default().critical);
    }
}
