use super::legs::{
    call_payoff, put_payoff, ButterflyLegs, CallLeg, CallPutLegs, IronCondorLegs, PutLeg, SpreadLegs,
};
use super::{Strategy, StrategyError, StrategyResult};
use crate::chain::types::{OptionChain, OptionSide};
use crate::pricing::overrides::{PremiumOverrides, StrategyPremiumOverrides};
use crate::pricing::resolver::PremiumResolver;
use crate::pricing::{round_to, LOT_SIZE};
use serde::Serialize;

/// Offset to the "one step out" strike (strangle wings, covered call, protective put, condor).
const NEAR_OFFSET: f64 = 5.0;
/// Offset to the far leg of verticals and butterfly wings.
const FAR_OFFSET: f64 = 10.0;

/// Prices the twelve strategies at one hypothetical expiry price.
///
/// Built per price point and dropped after the row is assembled. Holds only
/// borrowed, read-only inputs, so strategies cannot affect each other.
pub struct StrategyEngine<'a> {
    /// Hypothetical underlying price at expiry
    price: f64,
    /// Reference strike the legs are built around
    selected_strike: f64,
    /// Spot today (cost basis of the stock leg)
    current_price: f64,
    resolver: PremiumResolver<'a>,
    overrides: &'a StrategyPremiumOverrides,
}

/// Strikes and premiums behind every strategy. `None` where the legs
/// could not be derived (the strategy's cell is "N/A" in that case).
#[derive(Debug, Clone, Serialize)]
pub struct PremiumBreakdown {
    pub long_call: Option<CallLeg>,
    pub covered_call: Option<CallLeg>,
    pub long_put: Option<PutLeg>,
    pub protective_put: Option<PutLeg>,
    pub straddle: Option<CallPutLegs>,
    pub strangle: Option<CallPutLegs>,
    pub bull_call_spread: Option<SpreadLegs>,
    pub bear_put_spread: Option<SpreadLegs>,
    pub bear_call_spread: Option<SpreadLegs>,
    pub bull_put_spread: Option<SpreadLegs>,
    pub iron_condor: Option<IronCondorLegs>,
    pub butterfly_spread: Option<ButterflyLegs>,
}

impl<'a> StrategyEngine<'a> {
    pub fn new(
        price: f64,
        selected_strike: f64,
        current_price: f64,
        chain: &'a OptionChain,
        strike_overrides: &'a PremiumOverrides,
        strategy_overrides: &'a StrategyPremiumOverrides,
    ) -> Self {
        Self {
            price,
            selected_strike,
            current_price,
            resolver: PremiumResolver::new(chain, strike_overrides),
            overrides: strategy_overrides,
        }
    }

    /// P&L of one strategy, dispatched in the enum's fixed order.
    pub fn evaluate(&self, strategy: Strategy) -> StrategyResult<f64> {
        match strategy {
            Strategy::LongCall => self.long_call(),
            Strategy::LongPut => self.long_put(),
            Strategy::CoveredCall => self.covered_call(),
            Strategy::ProtectivePut => self.protective_put(),
            Strategy::Straddle => self.straddle(),
            Strategy::Strangle => self.strangle(),
            Strategy::BullCallSpread => self.bull_call_spread(),
            Strategy::BearPutSpread => self.bear_put_spread(),
            Strategy::BearCallSpread => self.bear_call_spread(),
            Strategy::BullPutSpread => self.bull_put_spread(),
            Strategy::IronCondor => self.iron_condor(),
            Strategy::ButterflySpread => self.butterfly_spread(),
        }
    }

    // ── Payoffs ──

    pub fn long_call(&self) -> StrategyResult<f64> {
        let leg = self.long_call_legs()?;
        let per_unit = call_payoff(self.price, leg.call_strike) - leg.call_premium;
        self.position_pnl(Strategy::LongCall, per_unit)
    }

    pub fn long_put(&self) -> StrategyResult<f64> {
        let leg = self.long_put_legs()?;
        let per_unit = put_payoff(self.price, leg.put_strike) - leg.put_premium;
        self.position_pnl(Strategy::LongPut, per_unit)
    }

    /// Long stock at spot plus a short call one step above the reference strike.
    pub fn covered_call(&self) -> StrategyResult<f64> {
        let leg = self.covered_call_legs()?;
        let per_unit = (self.price - self.current_price) + leg.call_premium
            - call_payoff(self.price, leg.call_strike);
        self.position_pnl(Strategy::CoveredCall, per_unit)
    }

    /// Long stock at spot plus a long put one step below the reference strike.
    pub fn protective_put(&self) -> StrategyResult<f64> {
        let leg = self.protective_put_legs()?;
        let per_unit = (self.price - self.current_price) - leg.put_premium
            + put_payoff(self.price, leg.put_strike);
        self.position_pnl(Strategy::ProtectivePut, per_unit)
    }

    pub fn straddle(&self) -> StrategyResult<f64> {
        let legs = self.straddle_legs()?;
        self.position_pnl(Strategy::Straddle, self.long_call_put_payoff(&legs))
    }

    pub fn strangle(&self) -> StrategyResult<f64> {
        let legs = self.strangle_legs()?;
        self.position_pnl(Strategy::Strangle, self.long_call_put_payoff(&legs))
    }

    /// Debit spread: long call at the reference strike, short call above.
    pub fn bull_call_spread(&self) -> StrategyResult<f64> {
        let legs = self.bull_call_spread_legs()?;
        let payoff = call_payoff(self.price, legs.buy_strike) - call_payoff(self.price, legs.sell_strike);
        self.position_pnl(Strategy::BullCallSpread, payoff - legs.net_debit())
    }

    /// Debit spread: long put above the reference strike, short put at it.
    pub fn bear_put_spread(&self) -> StrategyResult<f64> {
        let legs = self.bear_put_spread_legs()?;
        let payoff = put_payoff(self.price, legs.buy_strike) - put_payoff(self.price, legs.sell_strike);
        self.position_pnl(Strategy::BearPutSpread, payoff - legs.net_debit())
    }

    /// Credit spread: short call below the reference strike, long call at it.
    pub fn bear_call_spread(&self) -> StrategyResult<f64> {
        let legs = self.bear_call_spread_legs()?;
        let owed = call_payoff(self.price, legs.sell_strike) - call_payoff(self.price, legs.buy_strike);
        self.position_pnl(Strategy::BearCallSpread, -legs.net_debit() - owed)
    }

    /// Credit spread: short put at the reference strike, long put above it.
    pub fn bull_put_spread(&self) -> StrategyResult<f64> {
        let legs = self.bull_put_spread_legs()?;
        let owed = put_payoff(self.price, legs.sell_strike) - put_payoff(self.price, legs.buy_strike);
        self.position_pnl(Strategy::BullPutSpread, -legs.net_debit() - owed)
    }

    pub fn iron_condor(&self) -> StrategyResult<f64> {
        let legs = self.iron_condor_legs()?;
        self.position_pnl(Strategy::IronCondor, legs.payoff(self.price))
    }

    pub fn butterfly_spread(&self) -> StrategyResult<f64> {
        let legs = self.butterfly_spread_legs()?;
        self.position_pnl(Strategy::ButterflySpread, legs.payoff(self.price) - legs.net_debit())
    }

    // ── Breakdown ──

    /// Legs of every strategy. Independent of the hypothetical price.
    pub fn premium_breakdown(&self) -> PremiumBreakdown {
        PremiumBreakdown {
            long_call: self.long_call_legs().ok(),
            covered_call: self.covered_call_legs().ok(),
            long_put: self.long_put_legs().ok(),
            protective_put: self.protective_put_legs().ok(),
            straddle: self.straddle_legs().ok(),
            strangle: self.strangle_legs().ok(),
            bull_call_spread: self.bull_call_spread_legs().ok(),
            bear_put_spread: self.bear_put_spread_legs().ok(),
            bear_call_spread: self.bear_call_spread_legs().ok(),
            bull_put_spread: self.bull_put_spread_legs().ok(),
            iron_condor: self.iron_condor_legs().ok(),
            butterfly_spread: self.butterfly_spread_legs().ok(),
        }
    }

    // ── Leg derivation ──

    pub fn long_call_legs(&self) -> StrategyResult<CallLeg> {
        let s = Strategy::LongCall;
        self.check_overrides(s)?;
        let strike = self.selected_strike;
        Ok(CallLeg {
            call_strike: strike,
            call_premium: self.premium(s, self.overrides.long_call.call_premium, OptionSide::Call, strike)?,
        })
    }

    pub fn long_put_legs(&self) -> StrategyResult<PutLeg> {
        let s = Strategy::LongPut;
        self.check_overrides(s)?;
        let strike = self.selected_strike;
        Ok(PutLeg {
            put_strike: strike,
            put_premium: self.premium(s, self.overrides.long_put.put_premium, OptionSide::Put, strike)?,
        })
    }

    pub fn covered_call_legs(&self) -> StrategyResult<CallLeg> {
        let s = Strategy::CoveredCall;
        self.check_overrides(s)?;
        let strike = self.nearest(OptionSide::Call, self.selected_strike + NEAR_OFFSET);
        Ok(CallLeg {
            call_strike: strike,
            call_premium: self.premium(s, self.overrides.covered_call.call_premium, OptionSide::Call, strike)?,
        })
    }

    pub fn protective_put_legs(&self) -> StrategyResult<PutLeg> {
        let s = Strategy::ProtectivePut;
        self.check_overrides(s)?;
        let strike = self.nearest(OptionSide::Put, self.selected_strike - NEAR_OFFSET);
        Ok(PutLeg {
            put_strike: strike,
            put_premium: self.premium(s, self.overrides.protective_put.put_premium, OptionSide::Put, strike)?,
        })
    }

    pub fn straddle_legs(&self) -> StrategyResult<CallPutLegs> {
        let s = Strategy::Straddle;
        self.check_overrides(s)?;
        let o = self.overrides.straddle;
        let strike = self.selected_strike;
        Ok(CallPutLegs {
            call_strike: strike,
            call_premium: self.premium(s, o.call_premium, OptionSide::Call, strike)?,
            put_strike: strike,
            put_premium: self.premium(s, o.put_premium, OptionSide::Put, strike)?,
        })
    }

    pub fn strangle_legs(&self) -> StrategyResult<CallPutLegs> {
        let s = Strategy::Strangle;
        self.check_overrides(s)?;
        let o = self.overrides.strangle;
        let call_strike = self.nearest(OptionSide::Call, self.selected_strike + NEAR_OFFSET);
        let put_strike = self.nearest(OptionSide::Put, self.selected_strike - NEAR_OFFSET);
        Ok(CallPutLegs {
            call_strike,
            call_premium: self.premium(s, o.call_premium, OptionSide::Call, call_strike)?,
            put_strike,
            put_premium: self.premium(s, o.put_premium, OptionSide::Put, put_strike)?,
        })
    }

    pub fn bull_call_spread_legs(&self) -> StrategyResult<SpreadLegs> {
        let s = Strategy::BullCallSpread;
        self.check_overrides(s)?;
        let o = self.overrides.bull_call_spread;
        let lower = self.selected_strike;
        let upper = self.nearest(OptionSide::Call, lower + FAR_OFFSET);
        Ok(SpreadLegs {
            buy_strike: lower,
            buy_premium: self.premium(s, o.buy_premium, OptionSide::Call, lower)?,
            sell_strike: upper,
            sell_premium: self.premium(s, o.sell_premium, OptionSide::Call, upper)?,
        })
    }

    pub fn bear_put_spread_legs(&self) -> StrategyResult<SpreadLegs> {
        let s = Strategy::BearPutSpread;
        self.check_overrides(s)?;
        let o = self.overrides.bear_put_spread;
        let lower = self.selected_strike;
        let higher = self.nearest(OptionSide::Put, lower + FAR_OFFSET);
        Ok(SpreadLegs {
            buy_strike: higher,
            buy_premium: self.premium(s, o.buy_premium, OptionSide::Put, higher)?,
            sell_strike: lower,
            sell_premium: self.premium(s, o.sell_premium, OptionSide::Put, lower)?,
        })
    }

    /// The short strike is a plain offset and is not snapped to a listed
    /// strike; only its premium goes through nearest-strike resolution.
    pub fn bear_call_spread_legs(&self) -> StrategyResult<SpreadLegs> {
        let s = Strategy::BearCallSpread;
        self.check_overrides(s)?;
        let o = self.overrides.bear_call_spread;
        let upper = self.selected_strike;
        let lower = upper - FAR_OFFSET;
        Ok(SpreadLegs {
            buy_strike: upper,
            buy_premium: self.premium(s, o.buy_premium, OptionSide::Call, upper)?,
            sell_strike: lower,
            sell_premium: self.premium(s, o.sell_premium, OptionSide::Call, lower)?,
        })
    }

    /// Same unsnapped offset as `bear_call_spread_legs`, on the long put.
    pub fn bull_put_spread_legs(&self) -> StrategyResult<SpreadLegs> {
        let s = Strategy::BullPutSpread;
        self.check_overrides(s)?;
        let o = self.overrides.bull_put_spread;
        let lower = self.selected_strike;
        let higher = lower + FAR_OFFSET;
        Ok(SpreadLegs {
            buy_strike: higher,
            buy_premium: self.premium(s, o.buy_premium, OptionSide::Put, higher)?,
            sell_strike: lower,
            sell_premium: self.premium(s, o.sell_premium, OptionSide::Put, lower)?,
        })
    }

    pub fn iron_condor_legs(&self) -> StrategyResult<IronCondorLegs> {
        let s = Strategy::IronCondor;
        self.check_overrides(s)?;
        let o = self.overrides.iron_condor;
        let put_sell = self.nearest(OptionSide::Put, round_to(self.selected_strike - NEAR_OFFSET, 2));
        let put_buy = self.nearest(OptionSide::Put, round_to(put_sell - NEAR_OFFSET, 2));
        let call_sell = self.nearest(OptionSide::Call, round_to(self.selected_strike + NEAR_OFFSET, 2));
        let call_buy = self.nearest(OptionSide::Call, round_to(call_sell + NEAR_OFFSET, 2));
        Ok(IronCondorLegs {
            put_buy_strike: put_buy,
            put_buy_premium: self.premium(s, o.put_buy_premium, OptionSide::Put, put_buy)?,
            put_sell_strike: put_sell,
            put_sell_premium: self.premium(s, o.put_sell_premium, OptionSide::Put, put_sell)?,
            call_sell_strike: call_sell,
            call_sell_premium: self.premium(s, o.call_sell_premium, OptionSide::Call, call_sell)?,
            call_buy_strike: call_buy,
            call_buy_premium: self.premium(s, o.call_buy_premium, OptionSide::Call, call_buy)?,
        })
    }

    pub fn butterfly_spread_legs(&self) -> StrategyResult<ButterflyLegs> {
        let s = Strategy::ButterflySpread;
        self.check_overrides(s)?;
        let o = self.overrides.butterfly_spread;
        let center = self.selected_strike;
        let lower = self.nearest(OptionSide::Call, center - FAR_OFFSET);
        let upper = self.nearest(OptionSide::Call, center + FAR_OFFSET);
        Ok(ButterflyLegs {
            buy_lower_strike: lower,
            buy_lower_premium: self.premium(s, o.buy_lower_premium, OptionSide::Call, lower)?,
            sell_center_strike: center,
            sell_center_premium: self.premium(s, o.sell_center_premium, OptionSide::Call, center)?,
            buy_upper_strike: upper,
            buy_upper_premium: self.premium(s, o.buy_upper_premium, OptionSide::Call, upper)?,
        })
    }

    // ── Helpers ──

    #[inline]
    fn nearest(&self, side: OptionSide, target: f64) -> f64 {
        self.resolver.nearest_strike(side, target)
    }

    fn check_overrides(&self, strategy: Strategy) -> StrategyResult<()> {
        match self.overrides.rejection(strategy) {
            Some(reason) => Err(StrategyError::RejectedOverride {
                strategy,
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Strategy override if pinned, otherwise the resolver's premium.
    fn premium(
        &self,
        strategy: Strategy,
        pinned: Option<f64>,
        side: OptionSide,
        strike: f64,
    ) -> StrategyResult<f64> {
        let premium = pinned.unwrap_or_else(|| self.resolver.resolve(side, strike));
        if !premium.is_finite() {
            return Err(StrategyError::NonFinite { strategy, what: "premium" });
        }
        Ok(premium)
    }

    #[inline]
    fn long_call_put_payoff(&self, legs: &CallPutLegs) -> f64 {
        call_payoff(self.price, legs.call_strike) + put_payoff(self.price, legs.put_strike)
            - (legs.call_premium + legs.put_premium)
    }

    /// Per-unit P&L to position P&L, rounded per strategy.
    fn position_pnl(&self, strategy: Strategy, per_unit: f64) -> StrategyResult<f64> {
        let pnl = per_unit * LOT_SIZE;
        if !pnl.is_finite() {
            return Err(StrategyError::NonFinite { strategy, what: "pnl" });
        }
        Ok(round_to(pnl, strategy.decimals()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::types::OptionChainRow;
    use serde_json::json;

    /// Calls and puts listed every 5 from 85 to 115, all quoted 1.0 / 1.0.
    fn flat_chain() -> OptionChain {
        let rows: Vec<OptionChainRow> = (0..7)
            .map(|i| OptionChainRow::new(85.0 + 5.0 * i as f64, Some(1.0), Some(1.0), 1.0))
            .collect();
        OptionChain::new(rows.clone(), rows)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
    }

    #[test]
    fn test_long_call_with_strategy_override() {
        let chain = flat_chain();
        let strikes = PremiumOverrides::default();
        let mut strategies = StrategyPremiumOverrides::default();
        strategies.long_call.call_premium = Some(5.0);

        let engine = StrategyEngine::new(110.0, 100.0, 100.0, &chain, &strikes, &strategies);
        assert_close(engine.long_call().unwrap(), 500.0);
    }

    #[test]
    fn test_strategy_override_ignores_chain_content() {
        let strikes = PremiumOverrides::default();
        let mut strategies = StrategyPremiumOverrides::default();
        strategies.long_call.call_premium = Some(5.0);

        let cheap = flat_chain();
        let pricey = OptionChain::new(
            vec![OptionChainRow::new(100.0, Some(40.0), Some(44.0), 41.0)],
            vec![],
        );
        let a = StrategyEngine::new(110.0, 100.0, 100.0, &cheap, &strikes, &strategies);
        let b = StrategyEngine::new(110.0, 100.0, 100.0, &pricey, &strikes, &strategies);
        assert_eq!(a.long_call(), b.long_call());
    }

    #[test]
    fn test_strategy_override_beats_strike_override() {
        let chain = flat_chain();
        let mut strikes = PremiumOverrides::default();
        strikes.calls.insert(100.0, 9.0);
        let mut strategies = StrategyPremiumOverrides::default();
        strategies.long_call.call_premium = Some(5.0);

        let engine = StrategyEngine::new(110.0, 100.0, 100.0, &chain, &strikes, &strategies);
        assert_close(engine.long_call().unwrap(), 500.0);
        // straddle has no strategy override, so the strike override applies
        let legs = engine.straddle_legs().unwrap();
        assert_eq!(legs.call_premium, 9.0);
    }

    #[test]
    fn test_straddle_at_the_money() {
        let chain = flat_chain();
        let strikes = PremiumOverrides::default();
        let mut strategies = StrategyPremiumOverrides::default();
        strategies.straddle.call_premium = Some(5.0);
        strategies.straddle.put_premium = Some(4.0);

        let engine = StrategyEngine::new(100.0, 100.0, 100.0, &chain, &strikes, &strategies);
        assert_close(engine.straddle().unwrap(), -900.0);
    }

    #[test]
    fn test_bull_call_spread_example() {
        let chain = flat_chain();
        let strikes = PremiumOverrides::default();
        let mut strategies = StrategyPremiumOverrides::default();
        strategies.bull_call_spread.buy_premium = Some(6.0);
        strategies.bull_call_spread.sell_premium = Some(2.0);

        let engine = StrategyEngine::new(105.0, 100.0, 100.0, &chain, &strikes, &strategies);
        let legs = engine.bull_call_spread_legs().unwrap();
        assert_eq!((legs.buy_strike, legs.sell_strike), (100.0, 110.0));
        assert_close(engine.bull_call_spread().unwrap(), 100.0);
    }

    #[test]
    fn test_market_premiums_flow_into_every_strategy() {
        // All premiums are 1.0, spot = ref = 100, P = 100.
        let chain = flat_chain();
        let strikes = PremiumOverrides::default();
        let strategies = StrategyPremiumOverrides::default();
        let engine = StrategyEngine::new(100.0, 100.0, 100.0, &chain, &strikes, &strategies);

        assert_close(engine.long_call().unwrap(), -100.0);
        assert_close(engine.long_put().unwrap(), -100.0);
        assert_close(engine.covered_call().unwrap(), 100.0);
        assert_close(engine.protective_put().unwrap(), -100.0);
        assert_close(engine.straddle().unwrap(), -200.0);
        assert_close(engine.strangle().unwrap(), -200.0);
        assert_close(engine.bull_call_spread().unwrap(), 0.0);
        // long put 110 is worth 10 at expiry
        assert_close(engine.bear_put_spread().unwrap(), 1000.0);
        // short call 90 is 10 in the money
        assert_close(engine.bear_call_spread().unwrap(), -1000.0);
        // long put 110 offsets the short put entirely
        assert_close(engine.bull_put_spread().unwrap(), 1000.0);
        assert_close(engine.iron_condor().unwrap(), 0.0);
        // 10 intrinsic on the lower wing, debit 0
        assert_close(engine.butterfly_spread().unwrap(), 1000.0);
    }

    #[test]
    fn test_iron_condor_strikes_and_regions() {
        let chain = flat_chain();
        let strikes = PremiumOverrides::default();
        let mut strategies = StrategyPremiumOverrides::default();
        strategies.iron_condor.put_sell_premium = Some(1.5);
        strategies.iron_condor.put_buy_premium = Some(0.5);
        strategies.iron_condor.call_sell_premium = Some(1.5);
        strategies.iron_condor.call_buy_premium = Some(0.5);

        let at = |p: f64| {
            StrategyEngine::new(p, 100.0, 100.0, &chain, &strikes, &strategies)
                .iron_condor()
                .unwrap()
        };

        let legs = StrategyEngine::new(100.0, 100.0, 100.0, &chain, &strikes, &strategies)
            .iron_condor_legs()
            .unwrap();
        assert_eq!(
            (legs.put_buy_strike, legs.put_sell_strike, legs.call_sell_strike, legs.call_buy_strike),
            (90.0, 95.0, 105.0, 110.0)
        );

        assert_close(at(85.0), -300.0);
        assert_close(at(92.0), -100.0);
        assert_close(at(95.0), 200.0);
        assert_close(at(100.0), 200.0);
        assert_close(at(107.0), 0.0);
        assert_close(at(115.0), -300.0);
    }

    #[test]
    fn test_offset_spreads_do_not_snap() {
        // Only 100 and 105 listed: snapping would pick 105 for 110 and 100 for 90.
        let rows = vec![
            OptionChainRow::new(100.0, Some(2.0), Some(2.0), 2.0),
            OptionChainRow::new(105.0, Some(1.0), Some(1.0), 1.0),
        ];
        let chain = OptionChain::new(rows.clone(), rows);
        let strikes = PremiumOverrides::default();
        let strategies = StrategyPremiumOverrides::default();
        let engine = StrategyEngine::new(100.0, 100.0, 100.0, &chain, &strikes, &strategies);

        let bear_call = engine.bear_call_spread_legs().unwrap();
        assert_eq!(bear_call.sell_strike, 90.0);
        // premium for the unlisted 90 comes from the nearest listed call (100)
        assert_eq!(bear_call.sell_premium, 2.0);

        let bull_put = engine.bull_put_spread_legs().unwrap();
        assert_eq!(bull_put.buy_strike, 110.0);
        assert_eq!(bull_put.buy_premium, 1.0);

        let bear_put = engine.bear_put_spread_legs().unwrap();
        assert_eq!(bear_put.buy_strike, 105.0, "bear put spread does snap");
    }

    #[test]
    fn test_rejected_override_isolated() {
        let chain = flat_chain();
        let strikes = PremiumOverrides::default();
        let mut strategies = StrategyPremiumOverrides::default();
        strategies.insert_json(Strategy::Straddle, &json!({"call_premium": "abc"}));

        let engine = StrategyEngine::new(100.0, 100.0, 100.0, &chain, &strikes, &strategies);
        assert!(matches!(
            engine.evaluate(Strategy::Straddle),
            Err(StrategyError::RejectedOverride { strategy: Strategy::Straddle, .. })
        ));
        for s in Strategy::ALL.into_iter().filter(|s| *s != Strategy::Straddle) {
            assert!(engine.evaluate(s).is_ok(), "{s} should still price");
        }
        assert!(engine.premium_breakdown().straddle.is_none());
    }

    #[test]
    fn test_non_finite_market_data_is_isolated() {
        let calls = vec![OptionChainRow::new(100.0, None, None, f64::NAN)];
        let puts = vec![OptionChainRow::new(100.0, None, None, 2.0)];
        let chain = OptionChain::new(calls, puts);
        let strikes = PremiumOverrides::default();
        let strategies = StrategyPremiumOverrides::default();
        let engine = StrategyEngine::new(100.0, 100.0, 100.0, &chain, &strikes, &strategies);

        assert!(matches!(engine.long_call(), Err(StrategyError::NonFinite { .. })));
        assert_close(engine.long_put().unwrap(), -200.0);
    }

    #[test]
    fn test_breakdown_matches_priced_legs() {
        let chain = flat_chain();
        let mut strikes = PremiumOverrides::default();
        strikes.puts.insert(95.0, 2.5);
        let mut strategies = StrategyPremiumOverrides::default();
        strategies.butterfly_spread.sell_center_premium = Some(3.0);

        let engine = StrategyEngine::new(103.0, 100.0, 100.0, &chain, &strikes, &strategies);
        let breakdown = engine.premium_breakdown();

        let fly = breakdown.butterfly_spread.unwrap();
        assert_eq!(fly, engine.butterfly_spread_legs().unwrap());
        assert_eq!(fly.sell_center_premium, 3.0);
        let expected = round_to((fly.payoff(103.0) - fly.net_debit()) * LOT_SIZE, 2);
        assert_close(engine.butterfly_spread().unwrap(), expected);

        let pp = breakdown.protective_put.unwrap();
        assert_eq!((pp.put_strike, pp.put_premium), (95.0, 2.5));
        assert_eq!(breakdown.strangle.unwrap().put_premium, 2.5);
    }

    #[test]
    fn test_breakdown_matches_legs_for_every_strategy() {
        let chain = flat_chain();
        let mut strikes = PremiumOverrides::default();
        strikes.calls.insert(105.0, 2.0);
        strikes.puts.insert(90.0, 1.5);
        let mut strategies = StrategyPremiumOverrides::default();
        strategies.straddle.put_premium = Some(1.25);
        strategies.bear_call_spread.sell_premium = Some(2.25);
        strategies.iron_condor.call_sell_premium = Some(0.75);

        let engine = StrategyEngine::new(97.0, 100.0, 100.0, &chain, &strikes, &strategies);
        let breakdown = serde_json::to_value(engine.premium_breakdown()).unwrap();

        for strategy in Strategy::ALL {
            let legs = match strategy {
                Strategy::LongCall => serde_json::to_value(engine.long_call_legs().unwrap()),
                Strategy::LongPut => serde_json::to_value(engine.long_put_legs().unwrap()),
                Strategy::CoveredCall => serde_json::to_value(engine.covered_call_legs().unwrap()),
                Strategy::ProtectivePut => serde_json::to_value(engine.protective_put_legs().unwrap()),
                Strategy::Straddle => serde_json::to_value(engine.straddle_legs().unwrap()),
                Strategy::Strangle => serde_json::to_value(engine.strangle_legs().unwrap()),
                Strategy::BullCallSpread => serde_json::to_value(engine.bull_call_spread_legs().unwrap()),
                Strategy::BearPutSpread => serde_json::to_value(engine.bear_put_spread_legs().unwrap()),
                Strategy::BearCallSpread => serde_json::to_value(engine.bear_call_spread_legs().unwrap()),
                Strategy::BullPutSpread => serde_json::to_value(engine.bull_put_spread_legs().unwrap()),
                Strategy::IronCondor => serde_json::to_value(engine.iron_condor_legs().unwrap()),
                Strategy::ButterflySpread => serde_json::to_value(engine.butterfly_spread_legs().unwrap()),
            }
            .unwrap();
            assert_eq!(breakdown[strategy.name()], legs, "{}", strategy.name());
        }

        assert_eq!(breakdown["straddle"]["put_premium"], json!(1.25));
        assert_eq!(breakdown["covered_call"]["call_premium"], json!(2.0));
        assert_eq!(breakdown["bear_call_spread"]["sell_premium"], json!(2.25));
        assert_eq!(breakdown["iron_condor"]["call_sell_premium"], json!(0.75));
        assert_eq!(breakdown["iron_condor"]["put_buy_premium"], json!(1.5));
    }

    #[test]
    fn test_breakdown_independent_of_price() {
        let chain = flat_chain();
        let strikes = PremiumOverrides::default();
        let strategies = StrategyPremiumOverrides::default();
        let a = StrategyEngine::new(90.0, 100.0, 100.0, &chain, &strikes, &strategies).premium_breakdown();
        let b = StrategyEngine::new(110.0, 100.0, 100.0, &chain, &strikes, &strategies).premium_breakdown();
        assert_eq!(
            serde_json::to_value(&a).unwrap(),
            serde_json::to_value(&b).unwrap()
        );
    }
}
