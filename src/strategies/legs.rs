//! Leg sets: the strikes and premiums a strategy is built from.
//!
//! The same structs feed the payoff math and the premium breakdown, so the
//! breakdown can never disagree with what was priced. Field names are the
//! breakdown's wire names.

use serde::Serialize;

/// Intrinsic value of a call at expiry.
#[inline]
pub fn call_payoff(price: f64, strike: f64) -> f64 {
    (price - strike).max(0.0)
}

/// Intrinsic value of a put at expiry.
#[inline]
pub fn put_payoff(price: f64, strike: f64) -> f64 {
    (strike - price).max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CallLeg {
    pub call_strike: f64,
    pub call_premium: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PutLeg {
    pub put_strike: f64,
    pub put_premium: f64,
}

/// One call and one put (straddle, strangle).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CallPutLegs {
    pub call_strike: f64,
    pub call_premium: f64,
    pub put_strike: f64,
    pub put_premium: f64,
}

/// Two-leg vertical spread. `buy_*` is the long leg, `sell_*` the short one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpreadLegs {
    pub buy_strike: f64,
    pub buy_premium: f64,
    pub sell_strike: f64,
    pub sell_premium: f64,
}

impl SpreadLegs {
    /// Premium paid minus premium received.
    #[inline]
    pub fn net_debit(&self) -> f64 {
        self.buy_premium - self.sell_premium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IronCondorLegs {
    pub put_buy_strike: f64,
    pub put_buy_premium: f64,
    pub put_sell_strike: f64,
    pub put_sell_premium: f64,
    pub call_sell_strike: f64,
    pub call_sell_premium: f64,
    pub call_buy_strike: f64,
    pub call_buy_premium: f64,
}

impl IronCondorLegs {
    #[inline]
    pub fn net_credit(&self) -> f64 {
        self.put_sell_premium - self.put_buy_premium + self.call_sell_premium - self.call_buy_premium
    }

    /// Per-unit P&L at expiry price `p`, by region:
    ///
    /// ```text
    /// p <= put_buy              credit - (put_sell - put_buy)
    /// put_buy  < p <= put_sell  credit - (put_sell - p)
    /// put_sell < p <= call_sell credit
    /// call_sell < p <= call_buy credit - (p - call_sell)
    /// call_buy < p              credit - (call_buy - call_sell)
    /// ```
    pub fn payoff(&self, p: f64) -> f64 {
        let credit = self.net_credit();
        if p <= self.put_buy_strike {
            credit - (self.put_sell_strike - self.put_buy_strike)
        } else if p <= self.put_sell_strike {
            credit - (self.put_sell_strike - p)
        } else if p <= self.call_sell_strike {
            credit
        } else if p <= self.call_buy_strike {
            credit - (p - self.call_sell_strike)
        } else {
            credit - (self.call_buy_strike - self.call_sell_strike)
        }
    }
}

/// Long call butterfly: one lower, two short at center, one upper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ButterflyLegs {
    pub buy_lower_strike: f64,
    pub buy_lower_premium: f64,
    pub sell_center_strike: f64,
    pub sell_center_premium: f64,
    pub buy_upper_strike: f64,
    pub buy_upper_premium: f64,
}

impl ButterflyLegs {
    #[inline]
    pub fn net_debit(&self) -> f64 {
        self.buy_lower_premium + self.buy_upper_premium - 2.0 * self.sell_center_premium
    }

    #[inline]
    pub fn payoff(&self, p: f64) -> f64 {
        call_payoff(p, self.buy_lower_strike) + call_payoff(p, self.buy_upper_strike)
            - 2.0 * call_payoff(p, self.sell_center_strike)
    }
}
