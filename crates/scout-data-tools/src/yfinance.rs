//! Yahoo Finance market data
//!
//! Built on the public chart, search and fundamentals time-series endpoints,
//! none of which need a session cookie.

use chrono::DateTime;
use schemars::JsonSchema;
use scout_core::http::{decode_json, ensure_success};
use scout_core::{AdapterContext, Error, HttpClient, Result, Tool, ToolCapabilities, ToolKind, ToolResponse};
use scout_tool::{generate_schema, parse_params, require_non_empty, FunctionTool};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

pub const VALID_PERIODS: &[&str] = &[
    "1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max",
];
pub const VALID_INTERVALS: &[&str] = &[
    "1m", "2m", "5m", "15m", "30m", "60m", "90m", "1h", "1d", "5d", "1wk", "1mo", "3mo",
];

const SERVICE: &str = "yfinance";

const INCOME_STATEMENT: &[&str] = &[
    "TotalRevenue",
    "CostOfRevenue",
    "GrossProfit",
    "OperatingExpense",
    "OperatingIncome",
    "PretaxIncome",
    "TaxProvision",
    "NetIncome",
    "EBITDA",
    "BasicEPS",
    "DilutedEPS",
];
const BALANCE_SHEET: &[&str] = &[
    "TotalAssets",
    "CurrentAssets",
    "CashAndCashEquivalents",
    "TotalLiabilitiesNetMinorityInterest",
    "CurrentLiabilities",
    "TotalDebt",
    "StockholdersEquity",
];
const CASH_FLOW: &[&str] = &[
    "OperatingCashFlow",
    "InvestingCashFlow",
    "FinancingCashFlow",
    "CapitalExpenditure",
    "FreeCashFlow",
    "RepurchaseOfCapitalStock",
    "CashDividendsPaid",
];

// Earliest statement date requested from the time-series endpoint (2015-08-22)
const FUNDAMENTALS_START: i64 = 1_440_201_600;

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: String,
    currency: Option<String>,
    exchange_name: Option<String>,
    full_exchange_name: Option<String>,
    instrument_type: Option<String>,
    timezone: Option<String>,
    #[serde(rename = "gmtoffset", default)]
    gmt_offset: i64,
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
    regular_market_volume: Option<u64>,
    fifty_two_week_high: Option<f64>,
    fifty_two_week_low: Option<f64>,
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<QuoteHit>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteHit {
    symbol: Option<String>,
    #[serde(rename = "shortname")]
    short_name: Option<String>,
    #[serde(rename = "longname")]
    long_name: Option<String>,
    exchange: Option<String>,
    exch_disp: Option<String>,
    quote_type: Option<String>,
    industry: Option<String>,
    sector: Option<String>,
}

/// Quote summary for one symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerInfo {
    pub symbol: String,
    pub name: Option<String>,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub instrument_type: Option<String>,
    pub timezone: Option<String>,
    pub regular_market_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub volume: Option<u64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub industry: Option<String>,
    pub sector: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRow {
    pub date: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalData {
    pub ticker: String,
    pub period: String,
    pub interval: String,
    pub data: Vec<PriceRow>,
}

/// One statement line with its value per fiscal year end
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub line_item: String,
    pub values: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Financials {
    pub ticker: String,
    pub income_statement: Vec<LineItem>,
    pub balance_sheet: Vec<LineItem>,
    pub cash_flow: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickerMatch {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    pub industry: String,
}

#[derive(Debug, Clone)]
pub struct YahooFinanceClient {
    http: HttpClient,
    base_url: String,
}

impl YahooFinanceClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_context(ctx: &AdapterContext) -> Self {
        Self::new(ctx.http().clone(), ctx.endpoint(SERVICE, DEFAULT_BASE_URL))
    }

    pub async fn ticker_info(&self, ticker: &str) -> Result<TickerInfo> {
        let ticker = normalize_ticker(ticker)?;
        let chart = self.chart(&ticker, "1d", "1d").await?;

        // Industry and sector only come from search; missing them is not fatal
        let quote = match self.search_quotes(&ticker, 5).await {
            Ok(quotes) => quotes.into_iter().find(|q| {
                q.symbol
                    .as_deref()
                    .is_some_and(|symbol| symbol.eq_ignore_ascii_case(&ticker))
            }),
            Err(e) => {
                tracing::debug!(ticker = %ticker, error = %e, "Ticker search unavailable");
                None
            }
        };

        let meta = chart.meta;
        let quote = quote.as_ref();
        Ok(TickerInfo {
            name: meta
                .long_name
                .or(meta.short_name)
                .or_else(|| quote.and_then(|q| q.long_name.clone().or_else(|| q.short_name.clone()))),
            exchange: meta.full_exchange_name.or(meta.exchange_name),
            currency: meta.currency,
            instrument_type: meta
                .instrument_type
                .or_else(|| quote.and_then(|q| q.quote_type.clone())),
            timezone: meta.timezone,
            regular_market_price: meta.regular_market_price,
            previous_close: meta.previous_close.or(meta.chart_previous_close),
            day_high: meta.regular_market_day_high,
            day_low: meta.regular_market_day_low,
            volume: meta.regular_market_volume,
            fifty_two_week_high: meta.fifty_two_week_high,
            fifty_two_week_low: meta.fifty_two_week_low,
            industry: quote.and_then(|q| q.industry.clone()),
            sector: quote.and_then(|q| q.sector.clone()),
            symbol: meta.symbol,
        })
    }

    pub async fn historical(&self, ticker: &str, period: &str, interval: &str) -> Result<HistoricalData> {
        let ticker = normalize_ticker(ticker)?;
        if !VALID_PERIODS.contains(&period) {
            return Err(Error::invalid_params(format!(
                "Invalid period '{}'. Valid periods: {}",
                period,
                VALID_PERIODS.join(", ")
            )));
        }
        if !VALID_INTERVALS.contains(&interval) {
            return Err(Error::invalid_params(format!(
                "Invalid interval '{}'. Valid intervals: {}",
                interval,
                VALID_INTERVALS.join(", ")
            )));
        }

        let chart = self.chart(&ticker, period, interval).await?;
        let intraday = interval.ends_with('m') || interval.ends_with('h');
        let data = price_rows(&chart, intraday);
        tracing::debug!(ticker = %ticker, period, interval, rows = data.len(), "Fetched price history");

        Ok(HistoricalData {
            ticker,
            period: period.to_string(),
            interval: interval.to_string(),
            data,
        })
    }

    pub async fn financials(&self, ticker: &str) -> Result<Financials> {
        let ticker = normalize_ticker(ticker)?;
        let types = [INCOME_STATEMENT, BALANCE_SHEET, CASH_FLOW]
            .concat()
            .iter()
            .map(|item| format!("annual{}", item))
            .collect::<Vec<_>>()
            .join(",");
        let period2 = chrono::Utc::now().timestamp().to_string();
        let period1 = FUNDAMENTALS_START.to_string();
        let url = format!(
            "{}/ws/fundamentals-timeseries/v1/finance/timeseries/{}",
            self.base_url, ticker
        );

        let response: Value = self
            .http
            .json(SERVICE, |c| {
                c.get(&url).query(&[
                    ("symbol", ticker.as_str()),
                    ("type", types.as_str()),
                    ("period1", period1.as_str()),
                    ("period2", period2.as_str()),
                ])
            })
            .await?;

        let series = parse_timeseries(&response)?;
        let statement = |items: &[&str]| -> Vec<LineItem> {
            items
                .iter()
                .filter_map(|item| {
                    let values = series.get(&format!("annual{}", item))?;
                    (!values.is_empty()).then(|| LineItem {
                        line_item: (*item).to_string(),
                        values: values.clone(),
                    })
                })
                .collect()
        };

        Ok(Financials {
            income_statement: statement(INCOME_STATEMENT),
            balance_sheet: statement(BALANCE_SHEET),
            cash_flow: statement(CASH_FLOW),
            ticker,
        })
    }

    /// Symbol lookup by company name or ticker. Any failure yields an empty list.
    pub async fn search_tickers(&self, query: &str, limit: usize) -> Vec<TickerMatch> {
        match self.search_quotes(query, limit).await {
            Ok(quotes) => quotes
                .into_iter()
                .filter_map(|quote| {
                    let symbol = quote.symbol?;
                    Some(TickerMatch {
                        symbol,
                        name: quote
                            .short_name
                            .or(quote.long_name)
                            .unwrap_or_else(|| "Unknown".to_string()),
                        exchange: quote
                            .exch_disp
                            .or(quote.exchange)
                            .unwrap_or_else(|| "Unknown".to_string()),
                        industry: quote.industry.unwrap_or_else(|| "Unknown".to_string()),
                    })
                })
                .take(limit)
                .collect(),
            Err(e) => {
                tracing::warn!(query, error = %e, "Ticker search failed");
                Vec::new()
            }
        }
    }

    async fn chart(&self, ticker: &str, range: &str, interval: &str) -> Result<ChartResult> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        let response = self
            .http
            .send(|c| c.get(&url).query(&[("range", range), ("interval", interval)]))
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("No market data for ticker '{}'", ticker)));
        }

        let envelope: ChartEnvelope = decode_json(SERVICE, ensure_success(SERVICE, response).await?).await?;
        if let Some(error) = envelope.chart.error {
            return Err(Error::protocol(
                SERVICE,
                format!("{}: {}", error.code, error.description),
            ));
        }

        envelope
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| Error::NotFound(format!("No market data for ticker '{}'", ticker)))
    }

    async fn search_quotes(&self, query: &str, limit: usize) -> Result<Vec<QuoteHit>> {
        let url = format!("{}/v1/finance/search", self.base_url);
        let count = limit.to_string();
        let response: SearchResponse = self
            .http
            .json(SERVICE, |c| {
                c.get(&url).query(&[
                    ("q", query),
                    ("quotesCount", count.as_str()),
                    ("newsCount", "0"),
                ])
            })
            .await?;
        Ok(response.quotes)
    }
}

fn normalize_ticker(ticker: &str) -> Result<String> {
    require_non_empty("ticker", ticker)?;
    Ok(ticker.trim().to_uppercase())
}

fn price_rows(chart: &ChartResult, intraday: bool) -> Vec<PriceRow> {
    let Some(quote) = chart.indicators.quote.first() else {
        return Vec::new();
    };
    let format = if intraday { "%Y-%m-%d %H:%M:%S" } else { "%Y-%m-%d" };
    let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

    chart
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let close = at(&quote.close, i)?;
            let date = DateTime::from_timestamp(ts + chart.meta.gmt_offset, 0)?;
            Some(PriceRow {
                date: date.format(format).to_string(),
                open: at(&quote.open, i),
                high: at(&quote.high, i),
                low: at(&quote.low, i),
                close,
                volume: quote.volume.get(i).copied().flatten(),
            })
        })
        .collect()
}

/// `annualX` series name → (as-of date → reported value)
fn parse_timeseries(response: &Value) -> Result<HashMap<String, BTreeMap<String, f64>>> {
    let results = response["timeseries"]["result"]
        .as_array()
        .ok_or_else(|| Error::protocol(SERVICE, "timeseries response has no result list"))?;

    let mut series = HashMap::new();
    for result in results {
        let Some(kind) = result["meta"]["type"][0].as_str() else {
            continue;
        };
        let values: BTreeMap<String, f64> = result[kind]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|point| {
                let date = point["asOfDate"].as_str()?;
                let value = point["reportedValue"]["raw"].as_f64()?;
                Some((date.to_string(), value))
            })
            .collect();
        series.insert(kind.to_string(), values);
    }

    Ok(series)
}

#[derive(Debug, Deserialize, JsonSchema)]
struct TickerParams {
    /// The ticker symbol (e.g. 'AAPL' for Apple)
    ticker: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct HistoryParams {
    /// The ticker symbol (e.g. 'AAPL' for Apple)
    ticker: String,
    /// Period to fetch: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max
    #[serde(default = "default_period")]
    period: String,
    /// Interval between data points: 1m, 2m, 5m, 15m, 30m, 60m, 90m, 1h, 1d, 5d, 1wk, 1mo, 3mo
    #[serde(default = "default_interval")]
    interval: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchParams {
    /// Company name or partial symbol (e.g. 'Apple')
    query: String,
    /// Maximum number of matches
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_period() -> String {
    "1mo".to_string()
}

fn default_interval() -> String {
    "1d".to_string()
}

fn default_limit() -> usize {
    10
}

/// `yfinance_ticker_info`, `yfinance_historical_data`, `yfinance_financials`
/// and `yfinance_search_tickers`
pub fn create_yfinance_tools(ctx: &AdapterContext) -> Result<Vec<Arc<dyn Tool>>> {
    let client = YahooFinanceClient::from_context(ctx);
    let capabilities = ToolCapabilities::new(ToolKind::Data);

    let info = {
        let client = client.clone();
        FunctionTool::builder()
            .name("yfinance_ticker_info")
            .description("Get quote information for a ticker: name, exchange, currency, prices, 52-week range, industry and sector")
            .schema(generate_schema::<TickerParams>())
            .capabilities(capabilities.clone())
            .execute(move |_ctx, params| {
                let client = client.clone();
                async move {
                    let params: TickerParams = parse_params(params)?;
                    ToolResponse::from_serializable(&client.ticker_info(&params.ticker).await?)
                }
            })
            .build()?
    };

    let history = {
        let client = client.clone();
        FunctionTool::builder()
            .name("yfinance_historical_data")
            .description("Get historical OHLCV prices for a ticker over a period at a given interval")
            .schema(generate_schema::<HistoryParams>())
            .capabilities(capabilities.clone())
            .execute(move |_ctx, params| {
                let client = client.clone();
                async move {
                    let params: HistoryParams = parse_params(params)?;
                    let data = client
                        .historical(&params.ticker, &params.period, &params.interval)
                        .await?;
                    ToolResponse::from_serializable(&data)
                }
            })
            .build()?
    };

    let financials = {
        let client = client.clone();
        FunctionTool::builder()
            .name("yfinance_financials")
            .description("Get annual income statement, balance sheet and cash flow figures for a ticker")
            .schema(generate_schema::<TickerParams>())
            .capabilities(capabilities.clone())
            .execute(move |_ctx, params| {
                let client = client.clone();
                async move {
                    let params: TickerParams = parse_params(params)?;
                    ToolResponse::from_serializable(&client.financials(&params.ticker).await?)
                }
            })
            .build()?
    };

    let search = FunctionTool::builder()
        .name("yfinance_search_tickers")
        .description("Search ticker symbols by company name")
        .schema(generate_schema::<SearchParams>())
        .capabilities(capabilities)
        .execute(move |_ctx, params| {
            let client = client.clone();
            async move {
                let params: SearchParams = parse_params(params)?;
                require_non_empty("query", &params.query)?;
                let matches = client.search_tickers(&params.query, params.limit).await;
                Ok(ToolResponse::new(json!(matches)))
            }
        })
        .build()?;

    Ok(vec![
        Arc::new(info),
        Arc::new(history),
        Arc::new(financials),
        Arc::new(search),
    ])
}
