//! Integration tests for both pipelines
//!
//! These tests drive the newsletter and stock graphs end to end using mock
//! model, search and market components.

use agent_practice::adk::error::{PracticeError, Result, WorkflowError};
use agent_practice::adk::model::{Content, GenerationConfig, Model, Part};
use agent_practice::adk::tool::Tool;
use agent_practice::practice::config::{Services, Settings};
use agent_practice::practice::newsletter::{NewsletterPipeline, NewsletterRequest};
use agent_practice::practice::stock::{StockPipeline, StockRequest};
use agent_practice::practice::tools::{
    FinancialPeriod, FinancialSummary, Frequency, MarketData, NewsSearch, PricePoint, PriceSeries,
    SearchHit, SearchImage, SearchRequest, SearchResponse,
};
use agent_practice::practice::types::Language;
use agent_practice::practice::workflow::graph::RunEvent;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// ============================================================================
// Mock Components
// ============================================================================

/// Mock model that answers by looking at what it was asked
///
/// Structured requests get the configured theme or route; tool-calling
/// requests call the first tool once and then echo its result; plain
/// prompts get a short generated paragraph.
struct MockModel {
    sub_themes: Vec<String>,
    route: String,
    prompts: Mutex<Vec<String>>,
}

impl MockModel {
    fn new(sub_themes: &[&str], route: &str) -> Arc<Self> {
        Arc::new(Self {
            sub_themes: sub_themes.iter().map(|s| s.to_string()).collect(),
            route: route.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn reply(text: impl Into<String>) -> Content {
        Content {
            role: "model".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    fn tool_args(tool: &str) -> Value {
        match tool {
            "tavily_search" => json!({"query": "Apple stock news"}),
            _ => json!({"ticker": "AAPL"}),
        }
    }
}

#[async_trait]
impl Model for MockModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Content> {
        let prompt = history.last().map(Content::text).unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt.clone());

        if let Some(schema) = config.and_then(|c| c.response_schema.as_ref()) {
            let body = if schema.name == "newsletter_theme" {
                json!({
                    "theme": "Is renewable energy finally cheaper than fossil fuels?",
                    "sub_themes": self.sub_themes,
                })
            } else {
                json!({ "next": self.route })
            };
            return Ok(Self::reply(body.to_string()));
        }

        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            let last = history.last().map(|c| c.parts.as_slice()).unwrap_or(&[]);
            if let Some(Part::FunctionResponse { response, .. }) = last.first() {
                let observed = response
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| response.to_string());
                return Ok(Self::reply(format!("Here is what I found:\n{}", observed)));
            }
            let tool = tools[0].name().to_string();
            return Ok(Content {
                role: "model".to_string(),
                parts: vec![Part::FunctionCall {
                    id: format!("call_{}", tool),
                    args: Self::tool_args(&tool),
                    name: tool,
                }],
            });
        }

        if prompt.starts_with("Write a newsletter section for the sub-theme:") {
            let sub_theme = prompt.split('"').nth(1).unwrap_or_default();
            return Ok(Self::reply(format!("Section about {}.", sub_theme)));
        }
        if prompt.starts_with("As an expert editor") {
            return Ok(Self::reply(format!("EDITED\n{}", prompt)));
        }
        Ok(Self::reply("ok"))
    }
}

/// Mock search with a fixed number of hits per query, except for `empty` queries
struct MockSearch {
    hits: usize,
    empty: Vec<String>,
    queries: Mutex<Vec<String>>,
}

impl MockSearch {
    fn new(hits: usize) -> Arc<Self> {
        Self::with_empty(hits, &[])
    }

    fn with_empty(hits: usize, empty: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            hits,
            empty: empty.iter().map(|q| q.to_string()).collect(),
            queries: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl NewsSearch for MockSearch {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.queries.lock().unwrap().push(request.query.clone());
        let hits = if self.empty.contains(&request.query) {
            0
        } else {
            self.hits
        };
        Ok(SearchResponse {
            query: request.query.clone(),
            results: (0..hits)
                .map(|i| SearchHit {
                    title: format!("{} headline {}", request.query, i),
                    url: format!("https://news.example/{}", i),
                    content: "snippet".to_string(),
                    raw_content: Some("full article text".to_string()),
                })
                .collect(),
            images: vec![SearchImage::Url("https://img.example/1.png".to_string())],
        })
    }
}

/// Mock market with a rising price series and one reported year
struct MockMarket;

#[async_trait]
impl MarketData for MockMarket {
    async fn price_history(&self, ticker: &str, days: u32) -> Result<PriceSeries> {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let points = (0..days.min(7))
            .map(|i| {
                let base = 180.0 + i as f64;
                PricePoint {
                    date: start + chrono::Duration::days(i as i64),
                    open: base,
                    high: base + 2.0,
                    low: base - 1.0,
                    close: base + 1.0,
                    volume: 1_000_000,
                }
            })
            .collect();
        Ok(PriceSeries {
            ticker: ticker.to_string(),
            points,
        })
    }

    async fn financials(&self, _ticker: &str, frequency: Frequency) -> Result<FinancialSummary> {
        let mut periods = BTreeMap::new();
        periods.insert(
            NaiveDate::from_ymd_opt(2023, 9, 30).unwrap(),
            FinancialPeriod {
                total_revenue: Some(383_285_000_000.0),
                net_income: Some(96_995_000_000.0),
                diluted_eps: Some(6.13),
                ..Default::default()
            },
        );
        Ok(FinancialSummary { frequency, periods })
    }
}

async fn services(model: Arc<MockModel>, search: Arc<MockSearch>) -> Services {
    Services::new(model, search, Arc::new(MockMarket)).await
}

// ============================================================================
// Newsletter
// ============================================================================

#[tokio::test]
async fn test_newsletter_end_to_end() {
    let model = MockModel::new(
        &[
            "Solar module prices",
            "Offshore wind auctions",
            "Grid-scale batteries",
            "Green hydrogen costs",
            "Heat pump adoption",
            "Geothermal drilling",
            "Nuclear restarts",
        ],
        "FINISH",
    );
    let search = MockSearch::new(3);
    let services = services(model.clone(), search.clone()).await;

    let pipeline = NewsletterPipeline::new(&services, &Settings::default()).unwrap();
    let newsletter = pipeline
        .run(NewsletterRequest {
            keyword: "renewable energy".to_string(),
            language: Language::English,
        })
        .await
        .unwrap();

    // Seven proposed sub-themes truncated to five sections
    assert_eq!(newsletter.theme.sub_themes.len(), 5);
    assert_eq!(newsletter.sections.len(), 5);
    assert!(!newsletter.sections.contains_key("Geothermal drilling"));

    let expected_trace = vec![
        "search_news",
        "generate_themes",
        "search_sub_theme_articles",
        "write_section_0",
        "write_section_1",
        "write_section_2",
        "write_section_3",
        "write_section_4",
        "aggregate",
        "edit_newsletter",
    ];
    assert_eq!(newsletter.trace, expected_trace);

    // Keyword search plus one search per kept sub-theme
    let queries = search.queries.lock().unwrap().clone();
    assert_eq!(queries.len(), 6);
    assert_eq!(queries[0], "renewable energy");

    assert!(newsletter.content.starts_with("EDITED"));
    assert!(newsletter
        .content
        .contains("# Is renewable energy finally cheaper than fossil fuels?"));
    let solar = newsletter.content.find("## Solar module prices").unwrap();
    let pumps = newsletter.content.find("## Heat pump adoption").unwrap();
    assert!(solar < pumps);
    assert!(newsletter.content.contains("Section about Grid-scale batteries."));

    // Section prompts carry article references
    let prompts = model.prompts.lock().unwrap();
    assert!(prompts
        .iter()
        .any(|p| p.contains("![Article Image](https://img.example/1.png)")));
}

#[tokio::test]
async fn test_newsletter_stream_reports_every_step() {
    let model = MockModel::new(&["Solar", "Wind"], "FINISH");
    let services = services(model, MockSearch::new(1)).await;
    let pipeline = NewsletterPipeline::new(&services, &Settings::default()).unwrap();

    let (tx, mut rx) = mpsc::channel(256);
    let newsletter = pipeline
        .stream(
            NewsletterRequest {
                keyword: "wind power".to_string(),
                language: Language::Korean,
            },
            tx,
        )
        .await
        .unwrap();

    let mut completed = Vec::new();
    let mut finished = false;
    while let Some(event) = rx.recv().await {
        match event {
            RunEvent::StepCompleted { step, .. } => completed.push(step),
            RunEvent::Finished { .. } => finished = true,
            _ => {}
        }
    }

    assert!(finished);
    assert_eq!(completed, newsletter.trace);
    // Write steps beyond the generated sub-themes still run, as no-ops
    assert_eq!(newsletter.sections.len(), 2);
    assert!(completed.contains(&"write_section_4".to_string()));
}

#[tokio::test]
async fn test_newsletter_without_any_articles_fails_before_writing() {
    let model = MockModel::new(&["Solar", "Wind"], "FINISH");
    let services = services(model, MockSearch::new(0)).await;
    let pipeline = NewsletterPipeline::new(&services, &Settings::default()).unwrap();

    let (tx, mut rx) = mpsc::channel(256);
    let err = pipeline
        .stream(
            NewsletterRequest {
                keyword: "obscure topic".to_string(),
                language: Language::English,
            },
            tx,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        &err,
        PracticeError::Workflow(WorkflowError::StepFailed { step, .. })
            if step == "search_sub_theme_articles"
    ));
    assert!(matches!(err.root(), PracticeError::NoContent(_)));

    let mut started = Vec::new();
    let mut failed_step = None;
    while let Some(event) = rx.recv().await {
        match event {
            RunEvent::StepStarted { step, .. } => started.push(step),
            RunEvent::Failed { step, .. } => failed_step = step,
            _ => {}
        }
    }
    assert_eq!(
        started,
        ["search_news", "generate_themes", "search_sub_theme_articles"]
    );
    assert!(!started.iter().any(|s| s.starts_with("write_section")));
    assert_eq!(failed_step.as_deref(), Some("search_sub_theme_articles"));
}

#[tokio::test]
async fn test_newsletter_proceeds_when_some_sub_themes_have_articles() {
    let model = MockModel::new(&["Solar", "Wind", "Hydro"], "FINISH");
    let search = MockSearch::with_empty(2, &["Wind", "Hydro"]);
    let services = services(model.clone(), search).await;
    let pipeline = NewsletterPipeline::new(&services, &Settings::default()).unwrap();

    let newsletter = pipeline
        .run(NewsletterRequest {
            keyword: "clean power".to_string(),
            language: Language::English,
        })
        .await
        .unwrap();

    assert_eq!(newsletter.sections.len(), 3);
    assert!(newsletter.content.contains("## Wind\nSection about Wind."));

    // Only the sub-theme with results gets article references
    let prompts = model.prompts.lock().unwrap();
    let section_prompt = |sub: &str| {
        prompts
            .iter()
            .find(|p| p.contains(&format!("sub-theme: \"{}\"", sub)))
            .cloned()
            .unwrap()
    };
    assert!(section_prompt("Solar").contains("Title: Solar headline 0"));
    assert!(!section_prompt("Wind").contains("Title:"));
}

#[tokio::test]
async fn test_newsletter_repeated_sub_themes_are_written_once() {
    let model = MockModel::new(&["Solar", "Solar", "Wind", "Hydro", "Nuclear"], "FINISH");
    let search = MockSearch::new(1);
    let services = services(model, search.clone()).await;
    let pipeline = NewsletterPipeline::new(&services, &Settings::default()).unwrap();

    let newsletter = pipeline
        .run(NewsletterRequest {
            keyword: "energy".to_string(),
            language: Language::English,
        })
        .await
        .unwrap();

    assert_eq!(
        newsletter.theme.sub_themes,
        ["Solar", "Wind", "Hydro", "Nuclear"]
    );
    assert_eq!(newsletter.sections.len(), 4);
    assert_eq!(newsletter.content.matches("## Solar").count(), 1);
    // Keyword search plus one per distinct sub-theme
    assert_eq!(search.queries.lock().unwrap().len(), 5);
}

#[tokio::test]
async fn test_newsletter_rejects_empty_keyword() {
    let model = MockModel::new(&["Solar"], "FINISH");
    let services = services(model, MockSearch::new(1)).await;
    let pipeline = NewsletterPipeline::new(&services, &Settings::default()).unwrap();

    let err = pipeline
        .run(NewsletterRequest {
            keyword: "   ".to_string(),
            language: Language::English,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PracticeError::InvalidInput(_)));
}

// ============================================================================
// Stock analysis
// ============================================================================

#[tokio::test]
async fn test_stock_team_visits_each_member_once() {
    // The supervisor keeps asking for the researcher; the trial ceiling moves it along
    let model = MockModel::new(&[], "Researcher");
    let search = MockSearch::new(2);
    let services = services(model.clone(), search.clone()).await;

    let pipeline = StockPipeline::new(&services, &Settings::default())
        .await
        .unwrap();
    let report = pipeline
        .run(StockRequest {
            question: "Should I buy Apple stock? Please analyze AAPL.".to_string(),
            language: Language::English,
        })
        .await
        .unwrap();

    assert_eq!(
        report.trace,
        vec![
            "supervisor",
            "Researcher",
            "supervisor",
            "Stock_Analyzer",
            "supervisor",
            "Chart_Generator",
            "supervisor",
        ]
    );

    assert_eq!(report.messages.len(), 4);
    assert_eq!(report.messages[0].role, "user");
    let authors: HashSet<_> = report
        .messages
        .iter()
        .filter_map(|m| m.name.as_deref())
        .collect();
    assert_eq!(
        authors,
        HashSet::from(["Researcher", "Stock_Analyzer", "Chart_Generator"])
    );

    let research = report.contribution("Researcher").unwrap();
    assert!(research.contains("Apple stock news headline 0"));

    let analysis = report.contribution("Stock_Analyzer").unwrap();
    assert!(analysis.contains("383,285,000,000"));
    assert!(analysis.contains("$6.13"));

    let chart = report.chart.expect("chart generator output should carry a chart");
    assert_eq!(chart["data"][0]["type"], "candlestick");
    assert_eq!(chart["layout"]["title"]["text"], "AAPL Stock Price");

    assert_eq!(
        search.queries.lock().unwrap().as_slice(),
        ["Apple stock news"]
    );
}

#[tokio::test]
async fn test_stock_supervisor_cannot_finish_early() {
    let model = MockModel::new(&[], "FINISH");
    let services = services(model, MockSearch::new(1)).await;

    let pipeline = StockPipeline::new(&services, &Settings::default())
        .await
        .unwrap();
    let report = pipeline
        .run(StockRequest {
            question: "How is AAPL doing?".to_string(),
            language: Language::Korean,
        })
        .await
        .unwrap();

    let members: Vec<&str> = report
        .trace
        .iter()
        .map(String::as_str)
        .filter(|s| *s != "supervisor")
        .collect();
    assert_eq!(members, ["Researcher", "Stock_Analyzer", "Chart_Generator"]);
}

#[tokio::test]
async fn test_stock_supervisor_insisting_on_last_member_still_visits_all() {
    let model = MockModel::new(&[], "Chart_Generator");
    let services = services(model, MockSearch::new(1)).await;

    let pipeline = StockPipeline::new(&services, &Settings::default())
        .await
        .unwrap();
    let report = pipeline
        .run(StockRequest {
            question: "Chart AAPL for me".to_string(),
            language: Language::English,
        })
        .await
        .unwrap();

    assert_eq!(
        report.trace,
        vec![
            "supervisor",
            "Chart_Generator",
            "supervisor",
            "Researcher",
            "supervisor",
            "Stock_Analyzer",
            "supervisor",
        ]
    );
    assert!(report.chart.is_some());
}

#[tokio::test]
async fn test_stock_unknown_member_is_rejected() {
    let model = MockModel::new(&[], "Astrologer");
    let services = services(model, MockSearch::new(1)).await;

    let pipeline = StockPipeline::new(&services, &Settings::default())
        .await
        .unwrap();
    let err = pipeline
        .run(StockRequest {
            question: "How is AAPL doing?".to_string(),
            language: Language::English,
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PracticeError::Workflow(WorkflowError::StepFailed { ref step, .. }) if step == "supervisor"
    ));
}
