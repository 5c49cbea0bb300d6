use serde::{Deserialize, Serialize};

// ── Side ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionSide {
    Call,
    Put,
}

impl std::fmt::Display for OptionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

// ── Chain rows ──

/// One quoted contract on one side of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionChainRow {
    pub strike: f64,
    #[serde(default)]
    pub bid: Option<f64>,
    #[serde(default)]
    pub ask: Option<f64>,
    #[serde(alias = "lastPrice", default)]
    pub last_price: f64,
}

impl OptionChainRow {
    #[inline]
    pub fn new(strike: f64, bid: Option<f64>, ask: Option<f64>, last_price: f64) -> Self {
        Self { strike, bid, ask, last_price }
    }

    /// Mid of a two-sided quote. None unless bid and ask are both present,
    /// finite and positive.
    #[inline]
    pub fn quoted_mid(&self) -> Option<f64> {
        let quoted = |v: Option<f64>| v.filter(|x| x.is_finite() && *x > 0.0);
        match (quoted(self.bid), quoted(self.ask)) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            _ => None,
        }
    }
}

/// All rows of one side, ascending by strike.
///
/// The sort is stable, so when a provider repeats a strike the first row it
/// sent is the one lookups return.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "Vec<OptionChainRow>")]
pub struct ChainSide {
    rows: Vec<OptionChainRow>,
}

impl From<Vec<OptionChainRow>> for ChainSide {
    fn from(rows: Vec<OptionChainRow>) -> Self {
        Self::new(rows)
    }
}

impl ChainSide {
    pub fn new(rows: Vec<OptionChainRow>) -> Self {
        let mut rows: Vec<OptionChainRow> = rows
            .into_iter()
            .filter(|r| r.strike.is_finite())
            .collect();
        rows.sort_by(|a, b| a.strike.total_cmp(&b.strike));
        Self { rows }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn rows(&self) -> &[OptionChainRow] {
        &self.rows
    }

    pub fn strikes(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|r| r.strike)
    }

    /// Exact-match lookup.
    #[inline]
    pub fn find(&self, strike: f64) -> Option<&OptionChainRow> {
        self.rows.iter().find(|r| r.strike == strike)
    }

    /// Row whose strike is closest to `target`. Ties resolve to the lower strike.
    pub fn nearest(&self, target: f64) -> Option<&OptionChainRow> {
        self.rows
            .iter()
            .min_by(|a, b| (a.strike - target).abs().total_cmp(&(b.strike - target).abs()))
    }
}

/// Calls and puts for a single expiry. Immutable for the duration of a request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptionChain {
    #[serde(default)]
    pub calls: ChainSide,
    #[serde(default)]
    pub puts: ChainSide,
}

impl OptionChain {
    pub fn new(calls: Vec<OptionChainRow>, puts: Vec<OptionChainRow>) -> Self {
        Self {
            calls: ChainSide::new(calls),
            puts: ChainSide::new(puts),
        }
    }

    #[inline]
    pub fn side(&self, side: OptionSide) -> &ChainSide {
        match side {
            OptionSide::Call => &self.calls,
            OptionSide::Put => &self.puts,
        }
    }

    /// Sorted, de-duplicated union of call and put strikes.
    pub fn strike_union(&self) -> Vec<f64> {
        let mut strikes: Vec<f64> = self.calls.strikes().chain(self.puts.strikes()).collect();
        strikes.sort_by(f64::total_cmp);
        strikes.dedup();
        strikes
    }
}

// ── Underlying ──

/// Spot and listed expiries for one ticker, as reported by a provider.
/// Nothing here is validated yet; `report::validate_underlying` does that.
#[derive(Debug, Clone)]
pub struct UnderlyingQuote {
    pub ticker: String,
    pub spot: Option<f64>,
    /// `YYYY-MM-DD`, provider order
    pub expiries: Vec<String>,
}
