// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Static-table `FxPort` (spec.md §6: "a static table is an acceptable
//! implementation"). Rates are fixed at construction; there is no live feed.

use std::collections::HashMap;

use ap_domain::services::FxPort;
use ap_domain::ApError;
use async_trait::async_trait;

pub struct StaticFxAdapter {
    reference_currency: String,
    rates: HashMap<String, f64>,
}

impl StaticFxAdapter {
    /// `rates` maps a currency code to the amount of `reference_currency`
    /// one unit of it buys.
    pub fn new(reference_currency: impl Into<String>, rates: HashMap<String, f64>) -> Self {
        Self { reference_currency: reference_currency.into(), rates }
    }

    pub fn default_usd() -> Self {
        let mut rates = HashMap::new();
        rates.insert("USD".to_string(), 1.0);
        rates.insert("EUR".to_string(), 1.08);
        rates.insert("GBP".to_string(), 1.27);
        rates.insert("CAD".to_string(), 0.73);
        rates.insert("MXN".to_string(), 0.059);
        Self::new("USD", rates)
    }
}

#[async_trait]
impl FxPort for StaticFxAdapter {
    async fn convert(&self, amount: f64, currency: &str) -> Result<f64, ApError> {
        if currency.eq_ignore_ascii_case(&self.reference_currency) {
            return Ok(amount);
        }
        let rate = self
            .rates
            .get(&currency.to_ascii_uppercase())
            .ok_or_else(|| ApError::Configuration(format!("no FX rate configured for {currency}")))?;
        Ok(amount * rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reference_currency_passes_through_unchanged() {
        let fx = StaticFxAdapter::default_usd();
        assert_eq!(fx.convert(100.0, "USD").await.unwrap(), 100.0);
    }

    #[tokio::test]
    async fn converts_known_currency() {
        let fx = StaticFxAdapter::default_usd();
        assert_eq!(fx.convert(100.0, "EUR").await.unwrap(), 108.0);
    }

    #[tokio::test]
    async fn unknown_currency_errors() {
        let fx = StaticFxAdapter::default_usd();
        assert!(fx.convert(100.0, "XYZ").await.is_err());
    }
}
