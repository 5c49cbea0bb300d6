use super::overrides::PremiumOverrides;
use super::{round_to, PREMIUM_DECIMALS};
use crate::chain::types::{OptionChain, OptionChainRow, OptionSide};

/// Resolves the premium of one leg from user overrides and the market.
///
/// Precedence for a (side, strike) pair:
///   1. per-strike override (raw or cent-rounded strike)
///   2. mid of a positive two-sided quote
///   3. last traded price
///   4. 0.0 when the side has no strikes
///
/// Steps 2 and 3 use the exact strike when listed, otherwise the nearest
/// listed strike on that side. Strategy-level overrides sit above all of
/// this and are applied by the engine, which then never calls the resolver.
///
/// Pure: borrows the chain and overrides, holds no state of its own.
#[derive(Debug, Clone, Copy)]
pub struct PremiumResolver<'a> {
    chain: &'a OptionChain,
    overrides: &'a PremiumOverrides,
}

impl<'a> PremiumResolver<'a> {
    pub fn new(chain: &'a OptionChain, overrides: &'a PremiumOverrides) -> Self {
        Self { chain, overrides }
    }

    pub fn resolve(&self, side: OptionSide, strike: f64) -> f64 {
        if let Some(premium) = self.overrides.get(side, strike) {
            return round_to(premium, PREMIUM_DECIMALS);
        }

        let rows = self.chain.side(side);
        if rows.is_empty() {
            return 0.0;
        }
        rows.find(strike)
            .or_else(|| rows.nearest(strike))
            .map_or(0.0, market_premium)
    }

    /// Closest listed strike on `side`; `target` itself when the side is empty.
    #[inline]
    pub fn nearest_strike(&self, side: OptionSide, target: f64) -> f64 {
        self.chain
            .side(side)
            .nearest(target)
            .map_or(target, |row| row.strike)
    }
}

/// Market premium of a listed contract: mid when two-sided, else last, to 3 dp.
#[inline]
pub fn market_premium(row: &OptionChainRow) -> f64 {
    round_to(row.quoted_mid().unwrap_or(row.last_price), PREMIUM_DECIMALS)
}
