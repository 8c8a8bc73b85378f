// SPDX-License-Identifier: MIT

//! External data sources and the agent tools built on them

pub mod chart;
pub mod finance;
pub mod registry;
pub mod search;

pub use chart::{candlestick_figure, chart_markdown, extract_chart, StockChartTool};
pub use finance::{
    FinancialPeriod, FinancialSummary, Frequency, MarketData, PricePoint, PriceSeries,
    StockAnalysisTool, YahooFinanceClient,
};
pub use registry::ToolRegistry;
pub use search::{
    Article, NewsSearch, SearchHit, SearchImage, SearchRequest, SearchResponse, TavilyClient,
    TavilySearchTool,
};
