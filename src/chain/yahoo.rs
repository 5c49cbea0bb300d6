use super::types::{OptionChain, OptionChainRow, UnderlyingQuote};
use super::ChainProvider;
use crate::errors::{EngineError, EngineResult};
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;

/// Yahoo Finance options REST client. All methods return Result, never panic.
#[derive(Clone)]
pub struct YahooChainClient {
    client: Client,
    base_url: String,
}

impl YahooChainClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .user_agent("Mozilla/5.0 (compatible; strategy_pnl/0.1)")
                .pool_max_idle_per_host(4)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> EngineResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>().await.map_err(|e| EngineError::Parse(format!("GET {path}: {e}")))
    }

    async fn options(&self, ticker: &str, date: Option<i64>) -> EngineResult<OptionsResult> {
        let query = date.map(|d| format!("?date={d}")).unwrap_or_default();
        let resp: OptionsResponse = self
            .get(&format!("/v7/finance/options/{ticker}{query}"))
            .await?;

        if let Some(err) = resp.option_chain.error.filter(|e| !e.is_null()) {
            return Err(EngineError::Provider { status: 200, body: err.to_string() });
        }

        resp.option_chain
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.swap_remove(0)) })
            .ok_or_else(|| EngineError::Parse(format!("no option data for {ticker}")))
    }
}

#[async_trait::async_trait]
impl ChainProvider for YahooChainClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn underlying(&self, ticker: &str) -> EngineResult<UnderlyingQuote> {
        let result = self.options(ticker, None).await?;

        let expiries = result
            .expiration_dates
            .unwrap_or_default()
            .into_iter()
            .filter_map(epoch_to_expiry)
            .collect();

        Ok(UnderlyingQuote {
            ticker: result.underlying_symbol.unwrap_or_else(|| ticker.to_string()),
            spot: result.quote.and_then(|q| q.regular_market_price),
            expiries,
        })
    }

    async fn option_chain(&self, ticker: &str, expiry: &str) -> EngineResult<OptionChain> {
        let epoch = expiry_to_epoch(expiry)?;
        let result = self.options(ticker, Some(epoch)).await?;

        let by_date = result
            .options
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Parse(format!("no contracts for {ticker} {expiry}")))?;

        let calls = by_date.calls.unwrap_or_default().into_iter().filter_map(YahooContract::into_row).collect();
        let puts = by_date.puts.unwrap_or_default().into_iter().filter_map(YahooContract::into_row).collect();

        tracing::debug!(ticker, expiry, "option chain fetched");
        Ok(OptionChain::new(calls, puts))
    }
}

/// Unix seconds (UTC midnight) to `YYYY-MM-DD`.
pub fn epoch_to_expiry(epoch: i64) -> Option<String> {
    DateTime::from_timestamp(epoch, 0).map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
}

/// `YYYY-MM-DD` to Unix seconds at UTC midnight, the form Yahoo expects in `?date=`.
pub fn expiry_to_epoch(expiry: &str) -> EngineResult<i64> {
    NaiveDate::parse_from_str(expiry, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| EngineError::InvalidInput(format!("invalid expiry date: {expiry}")))
}

// Response shape of /v7/finance/options/{ticker}:
// {
//   "optionChain": {
//     "result": [{
//       "underlyingSymbol": "AAPL",
//       "expirationDates": [1750982400, ...],
//       "quote": { "regularMarketPrice": 201.5, ... },
//       "options": [{ "expirationDate": 1750982400, "calls": [...], "puts": [...] }]
//     }],
//     "error": null
//   }
// }

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionsResponse {
    option_chain: OptionChainEnvelope,
}

#[derive(Deserialize)]
struct OptionChainEnvelope {
    result: Option<Vec<OptionsResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionsResult {
    underlying_symbol: Option<String>,
    expiration_dates: Option<Vec<i64>>,
    quote: Option<YahooQuote>,
    options: Option<Vec<OptionsByDate>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooQuote {
    regular_market_price: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionsByDate {
    #[allow(dead_code)]
    expiration_date: Option<i64>,
    calls: Option<Vec<YahooContract>>,
    puts: Option<Vec<YahooContract>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooContract {
    strike: Option<f64>,
    bid: Option<f64>,
    ask: Option<f64>,
    last_price: Option<f64>,
}

impl YahooContract {
    fn into_row(self) -> Option<OptionChainRow> {
        let strike = self.strike?;
        Some(OptionChainRow::new(strike, self.bid, self.ask, self.last_price.unwrap_or(0.0)))
    }
}
