use super::{normalize_key, StrikeBits};
use crate::chain::types::OptionSide;
use crate::errors::{EngineError, EngineResult};
use crate::strategies::Strategy;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

// ── Per-strike overrides ──

/// User premiums for one side, keyed by strike.
#[derive(Debug, Clone, Default)]
pub struct SideOverrides {
    by_key: HashMap<StrikeBits, f64>,
    /// (strike, premium) as supplied, for echoing back
    entries: Vec<(f64, f64)>,
}

impl SideOverrides {
    /// Stores the premium under the raw strike and under its cent-rounded form.
    pub fn insert(&mut self, strike: f64, premium: f64) {
        let key = normalize_key(strike);
        self.by_key.insert(key.raw.into(), premium);
        self.by_key.insert(key.rounded.into(), premium);
        self.entries.push((strike, premium));
    }

    /// Matches `strike` as given or rounded to cents.
    #[inline]
    pub fn get(&self, strike: f64) -> Option<f64> {
        let key = normalize_key(strike);
        self.by_key
            .get(&key.raw.into())
            .or_else(|| self.by_key.get(&key.rounded.into()))
            .copied()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn entries(&self) -> &[(f64, f64)] {
        &self.entries
    }

    /// Build from a JSON object like `{"100": 5.2, "$102.5": "3.1"}`.
    /// Entries whose key or value is not numeric are skipped.
    pub fn from_json(side: OptionSide, value: &Value) -> Self {
        let mut out = Self::default();
        let Some(map) = value.as_object() else {
            tracing::debug!(%side, "premium overrides are not an object, ignoring");
            return out;
        };

        for (key, raw) in map {
            match (parse_strike_key(key), parse_premium(raw)) {
                (Some(strike), Some(premium)) => out.insert(strike, premium),
                _ => tracing::debug!(%side, key = %key, value = %raw, "skipping unparsable premium override"),
            }
        }
        out
    }
}

/// `"100"`, `"100.5"`, `"$100.5"` -> strike.
pub fn parse_strike_key(key: &str) -> Option<f64> {
    key.trim()
        .trim_start_matches('$')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite())
}

/// A JSON number or numeric string -> premium.
pub fn parse_premium(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|p| p.is_finite())
}

/// Per-strike premium overrides for both sides.
#[derive(Debug, Clone, Default)]
pub struct PremiumOverrides {
    pub calls: SideOverrides,
    pub puts: SideOverrides,
}

impl PremiumOverrides {
    #[inline]
    pub fn side(&self, side: OptionSide) -> &SideOverrides {
        match side {
            OptionSide::Call => &self.calls,
            OptionSide::Put => &self.puts,
        }
    }

    #[inline]
    pub fn get(&self, side: OptionSide, strike: f64) -> Option<f64> {
        self.side(side).get(strike)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }
}

// ── Per-strategy overrides ──
//
// One struct per leg shape. A missing or null field falls back to the
// resolver; a field of the wrong type rejects the whole strategy entry.

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct CallPremiumOverride {
    #[serde(default)]
    pub call_premium: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct PutPremiumOverride {
    #[serde(default)]
    pub put_premium: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct CallPutPremiumOverride {
    #[serde(default)]
    pub call_premium: Option<f64>,
    #[serde(default)]
    pub put_premium: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct SpreadPremiumOverride {
    #[serde(default)]
    pub buy_premium: Option<f64>,
    #[serde(default)]
    pub sell_premium: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct IronCondorPremiumOverride {
    #[serde(default)]
    pub put_sell_premium: Option<f64>,
    #[serde(default)]
    pub put_buy_premium: Option<f64>,
    #[serde(default)]
    pub call_sell_premium: Option<f64>,
    #[serde(default)]
    pub call_buy_premium: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct ButterflyPremiumOverride {
    #[serde(default)]
    pub buy_lower_premium: Option<f64>,
    #[serde(default)]
    pub sell_center_premium: Option<f64>,
    #[serde(default)]
    pub buy_upper_premium: Option<f64>,
}

/// Leg premiums pinned per strategy. Takes precedence over `PremiumOverrides`.
#[derive(Debug, Clone, Default)]
pub struct StrategyPremiumOverrides {
    pub long_call: CallPremiumOverride,
    pub long_put: PutPremiumOverride,
    pub covered_call: CallPremiumOverride,
    pub protective_put: PutPremiumOverride,
    pub straddle: CallPutPremiumOverride,
    pub strangle: CallPutPremiumOverride,
    pub bull_call_spread: SpreadPremiumOverride,
    pub bear_put_spread: SpreadPremiumOverride,
    pub bear_call_spread: SpreadPremiumOverride,
    pub bull_put_spread: SpreadPremiumOverride,
    pub iron_condor: IronCondorPremiumOverride,
    pub butterfly_spread: ButterflyPremiumOverride,
    rejected: HashMap<Strategy, String>,
}

impl StrategyPremiumOverrides {
    /// Parse and store the entry for `strategy`. A malformed entry marks the
    /// strategy as rejected instead of failing the request.
    pub fn insert_json(&mut self, strategy: Strategy, value: &Value) {
        let outcome = match strategy {
            Strategy::LongCall => parse_entry(value).map(|o| self.long_call = o),
            Strategy::LongPut => parse_entry(value).map(|o| self.long_put = o),
            Strategy::CoveredCall => parse_entry(value).map(|o| self.covered_call = o),
            Strategy::ProtectivePut => parse_entry(value).map(|o| self.protective_put = o),
            Strategy::Straddle => parse_entry(value).map(|o| self.straddle = o),
            Strategy::Strangle => parse_entry(value).map(|o| self.strangle = o),
            Strategy::BullCallSpread => parse_entry(value).map(|o| self.bull_call_spread = o),
            Strategy::BearPutSpread => parse_entry(value).map(|o| self.bear_put_spread = o),
            Strategy::BearCallSpread => parse_entry(value).map(|o| self.bear_call_spread = o),
            Strategy::BullPutSpread => parse_entry(value).map(|o| self.bull_put_spread = o),
            Strategy::IronCondor => parse_entry(value).map(|o| self.iron_condor = o),
            Strategy::ButterflySpread => parse_entry(value).map(|o| self.butterfly_spread = o),
        };

        match outcome {
            Ok(()) => {
                self.rejected.remove(&strategy);
            }
            Err(reason) => {
                tracing::debug!(%strategy, reason = %reason, "rejecting strategy premium override");
                self.rejected.insert(strategy, reason);
            }
        }
    }

    /// Why the entry for `strategy` was rejected, if it was.
    #[inline]
    pub fn rejection(&self, strategy: Strategy) -> Option<&str> {
        self.rejected.get(&strategy).map(String::as_str)
    }
}

fn parse_entry<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, String> {
    T::deserialize(value).map_err(|e| e.to_string())
}

// ── Request payload ──

/// Everything a custom-premium request can pin.
#[derive(Debug, Clone, Default)]
pub struct OverridePayload {
    pub strikes: PremiumOverrides,
    pub strategies: StrategyPremiumOverrides,
}

impl OverridePayload {
    /// `calls` / `puts` keys carry per-strike premiums; any key naming a
    /// strategy carries that strategy's leg premiums. Other keys are ignored.
    pub fn from_json(body: &Value) -> EngineResult<Self> {
        let map = body
            .as_object()
            .ok_or_else(|| EngineError::InvalidInput("premium payload must be a JSON object".into()))?;

        let mut payload = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "calls" => payload.strikes.calls = SideOverrides::from_json(OptionSide::Call, value),
                "puts" => payload.strikes.puts = SideOverrides::from_json(OptionSide::Put, value),
                name => match name.parse::<Strategy>() {
                    Ok(strategy) => payload.strategies.insert_json(strategy, value),
                    Err(_) => tracing::debug!(key = %name, "ignoring unknown override key"),
                },
            }
        }
        Ok(payload)
    }
}
