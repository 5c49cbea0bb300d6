pub mod overrides;
pub mod resolver;

/// Contract multiplier: per-unit P&L times this is position P&L.
pub const LOT_SIZE: f64 = 100.0;

/// Decimal places for resolved premiums.
pub const PREMIUM_DECIMALS: u32 = 3;

/// Round to `places` decimals, deciding on the exact stored value rather
/// than on `value * 10^places`. `1.0005` is stored just below the midpoint,
/// so it rounds to `1.0`, not `1.001`.
///
/// Goes through the formatter, which rounds the exact binary expansion.
/// Non-finite values pass through unchanged.
#[inline]
pub fn round_to(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.*}", places as usize, value)
        .parse::<f64>()
        .unwrap_or(value)
}

/// Both lookup forms of a strike: as given, and rounded to cents.
///
/// Overrides are stored under both and chain strikes are looked up under
/// both, so `101.2500001` from a float parse and `101.25` typed by a user
/// land on the same entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedStrike {
    pub raw: f64,
    pub rounded: f64,
}

#[inline]
pub fn normalize_key(strike: f64) -> NormalizedStrike {
    NormalizedStrike {
        raw: strike,
        rounded: round_to(strike, 2),
    }
}

/// Hashable identity of an f64 strike. `-0.0` folds onto `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrikeBits(u64);

impl From<f64> for StrikeBits {
    #[inline]
    fn from(strike: f64) -> Self {
        let strike = if strike == 0.0 { 0.0 } else { strike };
        Self(strike.to_bits())
    }
}
