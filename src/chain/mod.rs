pub mod snapshot;
pub mod types;
pub mod yahoo;

use crate::errors::EngineResult;
use types::{OptionChain, UnderlyingQuote};

/// Source of option chains. Implementations do IO and decoding only; rounding
/// and strike substitution happen in `pricing`.
#[async_trait::async_trait]
pub trait ChainProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Spot price and listed expiries for `ticker`.
    async fn underlying(&self, ticker: &str) -> EngineResult<UnderlyingQuote>;

    /// Calls and puts for one listed expiry (`YYYY-MM-DD`).
    async fn option_chain(&self, ticker: &str, expiry: &str) -> EngineResult<OptionChain>;
}
