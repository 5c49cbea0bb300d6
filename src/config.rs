use crate::errors::{EngineError, EngineResult};
use std::path::PathBuf;

/// Where option chains come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainSource {
    Yahoo,
    Snapshot,
}

impl std::str::FromStr for ChainSource {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(Self::Yahoo),
            "snapshot" | "file" => Ok(Self::Snapshot),
            other => Err(EngineError::Config(format!("CHAIN_SOURCE: unknown source {other:?}"))),
        }
    }
}

impl std::fmt::Display for ChainSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yahoo => write!(f, "yahoo"),
            Self::Snapshot => write!(f, "snapshot"),
        }
    }
}

/// Knobs for turning a chain into a report. Copy, passed by value into the core.
#[derive(Debug, Clone, Copy)]
pub struct ReportSettings {
    /// How many expiries to list back to the caller
    pub max_listed_expiries: usize,
    /// Strikes listed on each side of ATM
    pub strike_window: usize,
    /// Half-width of the hypothetical price band, as a fraction of the reference strike
    pub price_range_pct: f64,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            max_listed_expiries: 4,
            strike_window: 7,
            price_range_pct: 0.10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub chain_source: ChainSource,
    pub yahoo_base_url: String,
    pub snapshot_path: Option<PathBuf>,
    /// None allows any origin
    pub cors_origin: Option<String>,
    pub http_timeout_secs: u64,
    pub report: ReportSettings,
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let server_port = env_var_or("SERVER_PORT", "8000")
            .parse::<u16>()
            .map_err(|e| EngineError::Config(format!("SERVER_PORT: {e}")))?;

        let chain_source = env_var_or("CHAIN_SOURCE", "yahoo").parse::<ChainSource>()?;

        let snapshot_path = std::env::var("CHAIN_SNAPSHOT_PATH").ok().map(PathBuf::from);
        if chain_source == ChainSource::Snapshot && snapshot_path.is_none() {
            return Err(EngineError::Config(
                "CHAIN_SNAPSHOT_PATH is required when CHAIN_SOURCE=snapshot".into(),
            ));
        }

        let http_timeout_secs = env_var_or("HTTP_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map_err(|e| EngineError::Config(format!("HTTP_TIMEOUT_SECS: {e}")))?;

        let max_listed_expiries = env_var_or("MAX_LISTED_EXPIRIES", "4")
            .parse::<usize>()
            .map_err(|e| EngineError::Config(format!("MAX_LISTED_EXPIRIES: {e}")))?;

        let strike_window = env_var_or("STRIKE_WINDOW", "7")
            .parse::<usize>()
            .map_err(|e| EngineError::Config(format!("STRIKE_WINDOW: {e}")))?;

        let price_range_pct = env_var_or("PRICE_RANGE_PCT", "0.10")
            .parse::<f64>()
            .map_err(|e| EngineError::Config(format!("PRICE_RANGE_PCT: {e}")))?;
        if !(0.0..1.0).contains(&price_range_pct) {
            return Err(EngineError::Config(format!(
                "PRICE_RANGE_PCT: {price_range_pct} must be in [0, 1)"
            )));
        }

        let cors_origin = match env_var_or("CORS_ORIGIN", "http://localhost:5173").as_str() {
            "*" => None,
            origin => Some(origin.to_string()),
        };

        Ok(Self {
            server_port,
            chain_source,
            yahoo_base_url: env_var_or("YAHOO_BASE_URL", "https://query2.finance.yahoo.com"),
            snapshot_path,
            cors_origin,
            http_timeout_secs,
            report: ReportSettings {
                max_listed_expiries,
                strike_window,
                price_range_pct,
            },
        })
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
