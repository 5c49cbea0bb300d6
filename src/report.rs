//! Turns a provider's chain into a P&L report: expiry and strike selection,
//! one row of twelve strategy cells per hypothetical price, and the premium
//! summary across the whole chain.

use crate::chain::types::{ChainSide, OptionChain, UnderlyingQuote};
use crate::chain::ChainProvider;
use crate::config::ReportSettings;
use crate::errors::{EngineError, EngineResult};
use crate::pricing::overrides::{OverridePayload, PremiumOverrides, SideOverrides, StrategyPremiumOverrides};
use crate::pricing::resolver::market_premium;
use crate::pricing::{round_to, PREMIUM_DECIMALS};
use crate::strategies::engine::{PremiumBreakdown, StrategyEngine};
use crate::strategies::{PnlCell, Strategy};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// What the caller asked for. Doubles as the HTTP query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportRequest {
    pub ticker: String,
    #[serde(default)]
    pub expiry: Option<String>,
    #[serde(default)]
    pub strike: Option<f64>,
}

// ── Output ──

/// One hypothetical expiry price and every strategy's P&L at it.
#[derive(Debug, Clone)]
pub struct StrategyRow {
    pub price: f64,
    pub cells: SmallVec<[(Strategy, PnlCell); 12]>,
    pub premium_breakdown: PremiumBreakdown,
}

impl StrategyRow {
    pub fn unavailable_count(&self) -> usize {
        self.cells.iter().filter(|(_, c)| !c.is_available()).count()
    }
}

/// `$` plus the price rounded to cents, always with a fractional digit:
/// `$100.0`, `$102.5`, `$97.25`.
pub fn price_label(price: f64) -> String {
    format!("${:?}", round_to(price, 2))
}

/// Flat object: the label, one key per strategy, then the breakdown.
/// Consumers treat every other key as a strategy column.
impl Serialize for StrategyRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len() + 2))?;
        map.serialize_entry("Price at Expiry", &price_label(self.price))?;
        for (strategy, cell) in &self.cells {
            map.serialize_entry(strategy.name(), cell)?;
        }
        map.serialize_entry("premium_breakdown", &self.premium_breakdown)?;
        map.end()
    }
}

/// Ascending strike -> premium pairs, serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrikePremiums(Vec<(f64, f64)>);

impl StrikePremiums {
    /// Insert or replace, keeping strikes ascending.
    fn upsert(&mut self, strike: f64, premium: f64) {
        match self.0.binary_search_by(|(k, _)| k.total_cmp(&strike)) {
            Ok(i) => self.0[i].1 = premium,
            Err(i) => self.0.insert(i, (strike, premium)),
        }
    }
}

impl Serialize for StrikePremiums {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(strike, premium)| (strike.to_string(), premium)))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PremiumSummary {
    pub calls: StrikePremiums,
    pub puts: StrikePremiums,
}

#[derive(Debug, Clone, Serialize)]
pub struct PnlReport {
    pub ticker: String,
    pub current_price: f64,
    pub atm_strike: f64,
    pub selected_strike: f64,
    pub expiry: String,
    pub available_expiries: SmallVec<[String; 4]>,
    pub available_strikes: Vec<f64>,
    pub strategies: Vec<StrategyRow>,
    pub premiums: PremiumSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_provided_premiums: Option<PremiumSummary>,
}

impl PnlReport {
    pub fn unavailable_count(&self) -> usize {
        self.strategies.iter().map(StrategyRow::unavailable_count).sum()
    }
}

// ── Selection ──

/// Spot must be a positive number and at least one expiry must be listed.
pub fn validate_underlying(ticker: &str, quote: &UnderlyingQuote) -> EngineResult<f64> {
    let spot = quote
        .spot
        .filter(|s| s.is_finite() && *s > 0.0)
        .ok_or_else(|| EngineError::InvalidInput(format!("Invalid price data for {ticker}.")))?;
    if quote.expiries.is_empty() {
        return Err(EngineError::InvalidInput("No options data available.".into()));
    }
    Ok(spot)
}

/// The requested expiry if listed, else the first listed one.
pub fn select_expiry<'a>(expiries: &'a [String], requested: Option<&str>) -> Option<&'a str> {
    requested
        .and_then(|want| expiries.iter().find(|e| e.as_str() == want))
        .or_else(|| expiries.first())
        .map(String::as_str)
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrikeSelection {
    pub atm: f64,
    /// Reference strike every strategy is built around
    pub selected: f64,
    /// ATM plus up to `strike_window` listed strikes either side
    pub available: Vec<f64>,
    /// Hypothetical expiry prices, one row each
    pub price_points: Vec<f64>,
}

/// `union` must be sorted ascending. None when it is empty.
pub fn select_strikes(
    union: &[f64],
    spot: f64,
    requested: Option<f64>,
    settings: &ReportSettings,
) -> Option<StrikeSelection> {
    // min_by keeps the first of equal candidates, so ties go to the lower strike
    let (atm_index, &atm) = union
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - spot).abs().total_cmp(&(*b - spot).abs()))?;

    let selected = requested
        .filter(|r| r.is_finite())
        .and_then(|r| {
            union
                .iter()
                .copied()
                .find(|s| *s == r || round_to(*s, 2) == round_to(r, 2))
        })
        .unwrap_or(atm);

    let start = atm_index.saturating_sub(settings.strike_window);
    let end = atm_index
        .saturating_add(settings.strike_window)
        .saturating_add(1)
        .min(union.len());
    let available = union[start..end].to_vec();

    let lower = selected * (1.0 - settings.price_range_pct);
    let upper = selected * (1.0 + settings.price_range_pct);
    let price_points = union
        .iter()
        .copied()
        .filter(|s| (lower..=upper).contains(s))
        .collect();

    Some(StrikeSelection {
        atm,
        selected,
        available,
        price_points,
    })
}

// ── Rows ──

/// One row per price point. Strategy failures become "N/A" cells.
pub fn compute_rows(
    chain: &OptionChain,
    selection: &StrikeSelection,
    spot: f64,
    strike_overrides: &PremiumOverrides,
    strategy_overrides: &StrategyPremiumOverrides,
) -> Vec<StrategyRow> {
    selection
        .price_points
        .iter()
        .map(|&price| {
            let engine = StrategyEngine::new(
                price,
                selection.selected,
                spot,
                chain,
                strike_overrides,
                strategy_overrides,
            );
            let cells = Strategy::ALL
                .into_iter()
                .map(|strategy| {
                    let result = engine.evaluate(strategy);
                    if let Err(e) = &result {
                        tracing::debug!(price, %strategy, error = %e, "strategy not available");
                    }
                    (strategy, PnlCell::from_result(&result))
                })
                .collect();
            StrategyRow {
                price,
                cells,
                premium_breakdown: engine.premium_breakdown(),
            }
        })
        .collect()
}

// ── Premium summary ──

/// Market premium of every listed strike, first row per strike.
fn side_summary(side: &ChainSide) -> StrikePremiums {
    let mut out = StrikePremiums::default();
    let mut last_strike = None;
    for row in side.rows() {
        if last_strike == Some(row.strike) {
            continue;
        }
        last_strike = Some(row.strike);
        out.upsert(round_to(row.strike, 2), market_premium(row));
    }
    out
}

fn apply_overrides(summary: &mut StrikePremiums, overrides: &SideOverrides) {
    for &(strike, premium) in overrides.entries() {
        summary.upsert(round_to(strike, 2), round_to(premium, PREMIUM_DECIMALS));
    }
}

pub fn premium_summary(chain: &OptionChain, overrides: &PremiumOverrides) -> PremiumSummary {
    let mut summary = PremiumSummary {
        calls: side_summary(&chain.calls),
        puts: side_summary(&chain.puts),
    };
    apply_overrides(&mut summary.calls, &overrides.calls);
    apply_overrides(&mut summary.puts, &overrides.puts);
    summary
}

/// Per-strike premiums exactly as the caller supplied them.
pub fn user_premiums(overrides: &PremiumOverrides) -> PremiumSummary {
    let echo = |side: &SideOverrides| {
        let mut out = StrikePremiums::default();
        for &(strike, premium) in side.entries() {
            out.upsert(strike, premium);
        }
        out
    };
    PremiumSummary {
        calls: echo(&overrides.calls),
        puts: echo(&overrides.puts),
    }
}

// ── Assembly ──

/// Build the report from data already fetched. Pure.
pub fn build_report(
    request: &ReportRequest,
    quote: &UnderlyingQuote,
    expiry: &str,
    chain: &OptionChain,
    overrides: Option<&OverridePayload>,
    settings: &ReportSettings,
) -> EngineResult<PnlReport> {
    let ticker = request.ticker.to_uppercase();
    let spot = validate_underlying(&ticker, quote)?;

    let union = chain.strike_union();
    let selection = select_strikes(&union, spot, request.strike, settings)
        .ok_or_else(|| EngineError::InvalidInput(format!("No strikes listed for {ticker} {expiry}.")))?;

    let default_payload = OverridePayload::default();
    let payload = overrides.unwrap_or(&default_payload);
    let strategies = compute_rows(chain, &selection, spot, &payload.strikes, &payload.strategies);

    Ok(PnlReport {
        ticker,
        current_price: round_to(spot, 2),
        atm_strike: round_to(selection.atm, 2),
        selected_strike: round_to(selection.selected, 2),
        expiry: expiry.to_string(),
        available_expiries: quote
            .expiries
            .iter()
            .take(settings.max_listed_expiries)
            .cloned()
            .collect(),
        available_strikes: selection.available.iter().map(|s| round_to(*s, 2)).collect(),
        strategies,
        premiums: premium_summary(chain, &payload.strikes),
        user_provided_premiums: overrides.map(|o| user_premiums(&o.strikes)),
    })
}

/// Fetch from `provider` and build the report.
pub async fn run(
    provider: &dyn ChainProvider,
    request: &ReportRequest,
    overrides: Option<&OverridePayload>,
    settings: &ReportSettings,
) -> EngineResult<PnlReport> {
    let ticker = request.ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(EngineError::InvalidInput("ticker is required".into()));
    }

    let quote = provider.underlying(&ticker).await?;
    validate_underlying(&ticker, &quote)?;

    let expiry = select_expiry(&quote.expiries, request.expiry.as_deref())
        .ok_or_else(|| EngineError::InvalidInput("No options data available.".into()))?
        .to_string();
    let chain = provider.option_chain(&ticker, &expiry).await?;

    tracing::debug!(
        provider = provider.name(),
        %ticker,
        symbol = %quote.ticker,
        %expiry,
        calls = chain.calls.len(),
        puts = chain.puts.len(),
        "chain fetched"
    );

    let request = ReportRequest {
        ticker,
        ..request.clone()
    };
    build_report(&request, &quote, &expiry, &chain, overrides, settings)
}
