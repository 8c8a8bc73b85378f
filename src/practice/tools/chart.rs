//! Candlestick chart descriptions in Plotly figure JSON

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{json, Value};

use super::finance::{MarketData, PriceSeries};
use crate::adk::error::Result;
use crate::adk::tool::Tool;

const CHART_MARKER: &str = "![Chart]";
const DEFAULT_CHART_DAYS: u32 = 30;

/// Plotly candlestick figure for a price series
pub fn candlestick_figure(series: &PriceSeries) -> Value {
    let dates: Vec<String> = series.points.iter().map(|p| p.date.to_string()).collect();
    let open: Vec<f64> = series.points.iter().map(|p| p.open).collect();
    let high: Vec<f64> = series.points.iter().map(|p| p.high).collect();
    let low: Vec<f64> = series.points.iter().map(|p| p.low).collect();
    let close: Vec<f64> = series.points.iter().map(|p| p.close).collect();

    json!({
        "data": [{
            "type": "candlestick",
            "x": dates,
            "open": open,
            "high": high,
            "low": low,
            "close": close,
        }],
        "layout": {
            "title": {"text": format!("{} Stock Price", series.ticker)},
            "yaxis": {"title": {"text": "Stock Price (USD)"}},
            "xaxis": {"title": {"text": "Date"}},
        }
    })
}

/// Wrap a figure in the chart block that message renderers look for
pub fn chart_markdown(figure: &Value) -> String {
    format!("{}\n```json\n{}\n```", CHART_MARKER, figure)
}

/// Recover the figure from a message containing a chart block
pub fn extract_chart(content: &str) -> Option<Value> {
    let after_marker = &content[content.find(CHART_MARKER)? + CHART_MARKER.len()..];
    let body_start = after_marker.find("```json")? + "```json".len();
    let body = &after_marker[body_start..];
    let body = &body[..body.find("```")?];

    let figure: Value = serde_json::from_str(body.trim()).ok()?;
    figure.get("data").is_some().then_some(figure)
}

static CREATE_CHART_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "ticker": {
                "type": "string",
                "description": "Stock ticker symbol, e.g. AAPL"
            },
            "days": {
                "type": "integer",
                "description": "Number of calendar days to chart (default 30)"
            }
        },
        "required": ["ticker"]
    })
});

#[derive(Debug, Deserialize)]
struct ChartArgs {
    ticker: String,
    #[serde(default)]
    days: Option<u32>,
}

pub struct StockChartTool<M> {
    market: M,
}

impl<M: MarketData> StockChartTool<M> {
    pub fn new(market: M) -> Self {
        Self { market }
    }
}

#[async_trait]
impl<M: MarketData> Tool for StockChartTool<M> {
    fn name(&self) -> &str {
        "create_stock_chart"
    }

    fn description(&self) -> &str {
        "Creates a candlestick chart of recent stock prices. Returns the chart as a markdown block that must be included verbatim in the answer."
    }

    fn schema(&self) -> &Value {
        &CREATE_CHART_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: ChartArgs = serde_json::from_value(input)?;
        let days = args.days.unwrap_or(DEFAULT_CHART_DAYS);
        let series = self.market.price_history(args.ticker.trim(), days).await?;

        log::info!(
            "Charting {} bars for {}",
            series.points.len(),
            series.ticker
        );

        Ok(Value::String(chart_markdown(&candlestick_figure(&series))))
    }
}
