pub mod engine;
pub mod legs;

use crate::pricing::round_to;
use serde::{Serialize, Serializer};

/// The twelve strategies priced per row, in evaluation and display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    LongCall,
    LongPut,
    CoveredCall,
    ProtectivePut,
    Straddle,
    Strangle,
    BullCallSpread,
    BearPutSpread,
    BearCallSpread,
    BullPutSpread,
    IronCondor,
    ButterflySpread,
}

impl Strategy {
    pub const ALL: [Strategy; 12] = [
        Strategy::LongCall,
        Strategy::LongPut,
        Strategy::CoveredCall,
        Strategy::ProtectivePut,
        Strategy::Straddle,
        Strategy::Strangle,
        Strategy::BullCallSpread,
        Strategy::BearPutSpread,
        Strategy::BearCallSpread,
        Strategy::BullPutSpread,
        Strategy::IronCondor,
        Strategy::ButterflySpread,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::LongCall => "long_call",
            Self::LongPut => "long_put",
            Self::CoveredCall => "covered_call",
            Self::ProtectivePut => "protective_put",
            Self::Straddle => "straddle",
            Self::Strangle => "strangle",
            Self::BullCallSpread => "bull_call_spread",
            Self::BearPutSpread => "bear_put_spread",
            Self::BearCallSpread => "bear_call_spread",
            Self::BullPutSpread => "bull_put_spread",
            Self::IronCondor => "iron_condor",
            Self::ButterflySpread => "butterfly_spread",
        }
    }

    /// Decimal places the position P&L is rounded to.
    pub fn decimals(self) -> u32 {
        match self {
            Self::Strangle
            | Self::BearPutSpread
            | Self::BearCallSpread
            | Self::BullPutSpread
            | Self::ButterflySpread => 2,
            _ => 3,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|st| st.name() == s)
            .ok_or_else(|| format!("unknown strategy: {s}"))
    }
}

/// Why one strategy could not be priced. Never escapes its row cell.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StrategyError {
    #[error("{strategy}: rejected premium override: {reason}")]
    RejectedOverride { strategy: Strategy, reason: String },

    #[error("{strategy}: non-finite {what}")]
    NonFinite { strategy: Strategy, what: &'static str },
}

pub type StrategyResult<T> = Result<T, StrategyError>;

/// One strategy's P&L in a row: a number, or `"N/A"` if it failed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PnlCell {
    Value(f64),
    NotAvailable,
}

impl PnlCell {
    /// Row cells carry two decimals regardless of the strategy's own rounding.
    pub fn from_result(result: &StrategyResult<f64>) -> Self {
        match result {
            Ok(pnl) => Self::Value(round_to(*pnl, 2)),
            Err(_) => Self::NotAvailable,
        }
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}

impl Serialize for PnlCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => serializer.serialize_f64(*v),
            Self::NotAvailable => serializer.serialize_str("N/A"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_in_order() {
        let names: Vec<&str> = Strategy::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names[0], "long_call");
        assert_eq!(names[11], "butterfly_spread");
        for s in Strategy::ALL {
            assert_eq!(s.name().parse::<Strategy>(), Ok(s));
            assert_eq!(serde_json::to_value(s).unwrap(), serde_json::json!(s.name()));
        }
        assert!("collar".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_decimals_table() {
        let two: Vec<Strategy> = Strategy::ALL.into_iter().filter(|s| s.decimals() == 2).collect();
        assert_eq!(
            two,
            vec![
                Strategy::Strangle,
                Strategy::BearPutSpread,
                Strategy::BearCallSpread,
                Strategy::BullPutSpread,
                Strategy::ButterflySpread,
            ]
        );
    }

    #[test]
    fn test_cell_serialization() {
        let ok = PnlCell::from_result(&Ok(123.456));
        assert_eq!(ok, PnlCell::Value(123.46));
        assert_eq!(serde_json::to_string(&ok).unwrap(), "123.46");

        let na = PnlCell::from_result(&Err(StrategyError::NonFinite {
            strategy: Strategy::Straddle,
            what: "premium",
        }));
        assert!(!na.is_available());
        assert_eq!(serde_json::to_string(&na).unwrap(), "\"N/A\"");
    }
}
