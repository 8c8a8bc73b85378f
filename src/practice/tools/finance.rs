//! Market data from Yahoo Finance and the stock analysis tool

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use url::Url;

use crate::adk::error::{PracticeError, Result};
use crate::adk::tool::Tool;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const TIMESERIES_URL: &str =
    "https://query2.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) agent-practice";

/// Line items requested from the fundamentals endpoint, without frequency prefix
const LINE_ITEMS: [&str; 5] = [
    "TotalRevenue",
    "OperatingIncome",
    "NetIncome",
    "EBITDA",
    "DilutedEPS",
];

/// `base` with the ticker appended as an escaped path segment
fn endpoint(base: &str, ticker: &str) -> Result<Url> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| PracticeError::other(format!("{} cannot take a path", base)))?
        .push(ticker);
    Ok(url)
}

/// One daily OHLCV bar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriceSeries {
    pub ticker: String,
    /// Oldest first
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    /// The last `n` closing prices keyed by date
    pub fn last_closes(&self, n: usize) -> Vec<(NaiveDate, f64)> {
        let skip = self.points.len().saturating_sub(n);
        self.points
            .iter()
            .skip(skip)
            .map(|p| (p.date, p.close))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Annual,
    Quarterly,
}

impl Frequency {
    fn prefix(self) -> &'static str {
        match self {
            Frequency::Annual => "annual",
            Frequency::Quarterly => "quarterly",
        }
    }

    /// How far back to ask for reports
    fn lookback(self) -> Duration {
        match self {
            Frequency::Annual => Duration::days(5 * 365),
            Frequency::Quarterly => Duration::days(2 * 365),
        }
    }
}

/// Reported figures for one fiscal period
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FinancialPeriod {
    pub total_revenue: Option<f64>,
    pub operating_income: Option<f64>,
    pub net_income: Option<f64>,
    pub ebitda: Option<f64>,
    pub diluted_eps: Option<f64>,
}

impl FinancialPeriod {
    fn set(&mut self, item: &str, value: f64) {
        match item {
            "TotalRevenue" => self.total_revenue = Some(value),
            "OperatingIncome" => self.operating_income = Some(value),
            "NetIncome" => self.net_income = Some(value),
            "EBITDA" => self.ebitda = Some(value),
            "DilutedEPS" => self.diluted_eps = Some(value),
            _ => {}
        }
    }

    /// Display form used in analysis output
    pub fn formatted(&self) -> Value {
        json!({
            "total_revenue": format_number(self.total_revenue),
            "operating_income": format_number(self.operating_income),
            "net_income": format_number(self.net_income),
            "ebitda": format_number(self.ebitda),
            "diluted_eps": format_eps(self.diluted_eps),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialSummary {
    pub frequency: Frequency,
    pub periods: BTreeMap<NaiveDate, FinancialPeriod>,
}

impl FinancialSummary {
    /// Periods keyed by ISO date with display-formatted figures
    pub fn formatted(&self) -> Value {
        let map: Map<String, Value> = self
            .periods
            .iter()
            .map(|(date, period)| (date.to_string(), period.formatted()))
            .collect();
        Value::Object(map)
    }
}

/// Rounded to whole units with thousands separators; missing values read "N/A"
pub fn format_number(value: Option<f64>) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return "N/A".to_string();
    };

    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

pub fn format_eps(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(eps) => format!("${:.2}", eps),
        None => "N/A".to_string(),
    }
}

/// Source of prices and reported financials
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Daily bars covering the last `days` calendar days
    async fn price_history(&self, ticker: &str, days: u32) -> Result<PriceSeries>;

    async fn financials(&self, ticker: &str, frequency: Frequency) -> Result<FinancialSummary>;
}

#[async_trait]
impl<T: MarketData + ?Sized> MarketData for std::sync::Arc<T> {
    async fn price_history(&self, ticker: &str, days: u32) -> Result<PriceSeries> {
        (**self).price_history(ticker, days).await
    }

    async fn financials(&self, ticker: &str, frequency: Frequency) -> Result<FinancialSummary> {
        (**self).financials(ticker, frequency).await
    }
}

/// Yahoo Finance public endpoints
pub struct YahooFinanceClient {
    client: Client,
}

impl YahooFinanceClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    async fn get_json(&self, url: Url, query: &[(&str, String)]) -> Result<Value> {
        let resp = self
            .client
            .get(url.as_str())
            .header("User-Agent", USER_AGENT)
            .query(query)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(PracticeError::api("Yahoo Finance", format!("{}: {}", status, text)));
        }

        Ok(resp.json().await?)
    }
}

impl Default for YahooFinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketData for YahooFinanceClient {
    async fn price_history(&self, ticker: &str, days: u32) -> Result<PriceSeries> {
        let end = Utc::now();
        let start = end - Duration::days(i64::from(days));
        let url = endpoint(CHART_URL, ticker)?;

        log::info!("Fetching {} days of prices for {}", days, ticker);

        let body = self
            .get_json(
                url,
                &[
                    ("period1", start.timestamp().to_string()),
                    ("period2", end.timestamp().to_string()),
                    ("interval", "1d".to_string()),
                ],
            )
            .await?;

        parse_chart(ticker, &body)
    }

    async fn financials(&self, ticker: &str, frequency: Frequency) -> Result<FinancialSummary> {
        let end = Utc::now();
        let start = end - frequency.lookback();
        let types = LINE_ITEMS
            .iter()
            .map(|item| format!("{}{}", frequency.prefix(), item))
            .collect::<Vec<_>>()
            .join(",");
        let url = endpoint(TIMESERIES_URL, ticker)?;

        log::info!("Fetching {:?} financials for {}", frequency, ticker);

        let body = self
            .get_json(
                url,
                &[
                    ("type", types),
                    ("period1", start.timestamp().to_string()),
                    ("period2", end.timestamp().to_string()),
                ],
            )
            .await?;

        parse_timeseries(&body, frequency)
    }
}

/// Decode a v8 chart response; bars with missing values are skipped
pub fn parse_chart(ticker: &str, body: &Value) -> Result<PriceSeries> {
    let result = body
        .pointer("/chart/result/0")
        .filter(|r| !r.is_null())
        .ok_or_else(|| {
            let reason = body
                .pointer("/chart/error/description")
                .and_then(Value::as_str)
                .unwrap_or("missing chart.result");
            PracticeError::api("Yahoo Finance", format!("{}: {}", ticker, reason))
        })?;

    let timestamps = result
        .get("timestamp")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let quote = result
        .pointer("/indicators/quote/0")
        .cloned()
        .unwrap_or(Value::Null);
    let column = |name: &str, i: usize| quote.get(name).and_then(|c| c.get(i)).and_then(Value::as_f64);

    let mut points = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let Some(date) = ts
            .as_i64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .map(|dt| dt.date_naive())
        else {
            continue;
        };
        let (Some(open), Some(high), Some(low), Some(close)) = (
            column("open", i),
            column("high", i),
            column("low", i),
            column("close", i),
        ) else {
            continue;
        };
        points.push(PricePoint {
            date,
            open,
            high,
            low,
            close,
            volume: column("volume", i).map_or(0, |v| v as u64),
        });
    }

    Ok(PriceSeries {
        ticker: ticker.to_string(),
        points,
    })
}

/// Decode a fundamentals-timeseries response into periods keyed by report date
pub fn parse_timeseries(body: &Value, frequency: Frequency) -> Result<FinancialSummary> {
    let series = body
        .pointer("/timeseries/result")
        .and_then(Value::as_array)
        .ok_or_else(|| PracticeError::api("Yahoo Finance", "missing timeseries.result"))?;

    let mut periods: BTreeMap<NaiveDate, FinancialPeriod> = BTreeMap::new();

    for entry in series {
        let Some(kind) = entry.pointer("/meta/type/0").and_then(Value::as_str) else {
            continue;
        };
        let Some(item) = kind.strip_prefix(frequency.prefix()) else {
            continue;
        };
        let Some(reports) = entry.get(kind).and_then(Value::as_array) else {
            continue;
        };

        for report in reports {
            let date = report
                .get("asOfDate")
                .and_then(Value::as_str)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
            let value = report.pointer("/reportedValue/raw").and_then(Value::as_f64);
            if let (Some(date), Some(value)) = (date, value) {
                periods.entry(date).or_default().set(item, value);
            }
        }
    }

    Ok(FinancialSummary { frequency, periods })
}

static ANALYZE_STOCK_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "ticker": {
                "type": "string",
                "description": "Stock ticker symbol, e.g. AAPL"
            }
        },
        "required": ["ticker"]
    })
});

#[derive(Debug, Deserialize)]
struct AnalyzeArgs {
    ticker: String,
}

/// Recent closes plus annual and quarterly financial summaries for a ticker
pub struct StockAnalysisTool<M> {
    market: M,
}

impl<M: MarketData> StockAnalysisTool<M> {
    pub fn new(market: M) -> Self {
        Self { market }
    }

    pub async fn analyze(&self, ticker: &str) -> Result<Value> {
        // Calendar window wide enough to cover five trading days
        let prices = self.market.price_history(ticker, 10).await?;
        let annual = self.market.financials(ticker, Frequency::Annual).await?;
        let quarterly = self.market.financials(ticker, Frequency::Quarterly).await?;

        let closes: Map<String, Value> = prices
            .last_closes(5)
            .into_iter()
            .map(|(date, close)| (date.to_string(), json!(close)))
            .collect();

        Ok(json!({
            "ticker": ticker,
            "last_5_days_close": closes,
            "annual_financial_summary": annual.formatted(),
            "quarterly_financial_summary": quarterly.formatted(),
        }))
    }
}

#[async_trait]
impl<M: MarketData> Tool for StockAnalysisTool<M> {
    fn name(&self) -> &str {
        "analyze_stock_ticker"
    }

    fn description(&self) -> &str {
        "Analyzes a stock ticker. Returns the last 5 closing prices and annual and quarterly financial statement summaries."
    }

    fn schema(&self) -> &Value {
        &ANALYZE_STOCK_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: AnalyzeArgs = serde_json::from_value(input)?;
        self.analyze(args.ticker.trim()).await
    }
}
