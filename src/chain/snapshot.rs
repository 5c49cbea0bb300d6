use super::types::{OptionChain, UnderlyingQuote};
use super::ChainProvider;
use crate::errors::{EngineError, EngineResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// A frozen chain for one ticker, as stored on disk.
///
/// ```json
/// {
///   "ticker": "AAPL",
///   "spot": 201.5,
///   "expiries": ["2025-06-27"],
///   "chains": { "2025-06-27": { "calls": [...], "puts": [...] } }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ChainSnapshot {
    pub ticker: String,
    #[serde(default)]
    pub spot: Option<f64>,
    #[serde(default)]
    pub expiries: Vec<String>,
    #[serde(default)]
    pub chains: HashMap<String, OptionChain>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotDocument {
    Many(Vec<ChainSnapshot>),
    One(ChainSnapshot),
}

/// Serves chains from snapshots held in memory. Used for offline runs and tests.
pub struct SnapshotChainProvider {
    by_ticker: HashMap<String, ChainSnapshot>,
}

impl SnapshotChainProvider {
    pub fn new(snapshots: Vec<ChainSnapshot>) -> Self {
        let by_ticker = snapshots
            .into_iter()
            .map(|s| (s.ticker.to_uppercase(), s))
            .collect();
        Self { by_ticker }
    }

    /// Load a file holding either one snapshot or an array of them.
    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Snapshot(format!("read {}: {e}", path.display())))?;
        let doc: SnapshotDocument = serde_json::from_str(&raw)
            .map_err(|e| EngineError::Snapshot(format!("parse {}: {e}", path.display())))?;

        let snapshots = match doc {
            SnapshotDocument::Many(v) => v,
            SnapshotDocument::One(s) => vec![s],
        };
        tracing::info!(path = %path.display(), tickers = snapshots.len(), "chain snapshots loaded");
        Ok(Self::new(snapshots))
    }

    fn lookup(&self, ticker: &str) -> EngineResult<&ChainSnapshot> {
        self.by_ticker
            .get(&ticker.to_uppercase())
            .ok_or_else(|| EngineError::Provider {
                status: 404,
                body: format!("no snapshot for {ticker}"),
            })
    }
}

#[async_trait::async_trait]
impl ChainProvider for SnapshotChainProvider {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    async fn underlying(&self, ticker: &str) -> EngineResult<UnderlyingQuote> {
        let snap = self.lookup(ticker)?;
        Ok(UnderlyingQuote {
            ticker: snap.ticker.clone(),
            spot: snap.spot,
            expiries: snap.expiries.clone(),
        })
    }

    async fn option_chain(&self, ticker: &str, expiry: &str) -> EngineResult<OptionChain> {
        let snap = self.lookup(ticker)?;
        snap.chains
            .get(expiry)
            .cloned()
            .ok_or_else(|| EngineError::Provider {
                status: 404,
                body: format!("no chain for {ticker} {expiry}"),
            })
    }
}
