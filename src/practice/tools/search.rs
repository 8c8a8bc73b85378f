// SPDX-License-Identifier: MIT

//! Tavily news search

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::env;

use crate::adk::error::{PracticeError, Result};
use crate::adk::tool::Tool;

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

/// Parameters of one search call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: u32,
    /// `general` or `news`
    pub topic: String,
    /// Look-back window for `news` searches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    #[serde(default)]
    pub include_images: bool,
    #[serde(default)]
    pub include_raw_content: bool,
}

impl SearchRequest {
    /// A `news` search over the last `days` days
    pub fn news(query: impl Into<String>, max_results: u32, days: u32) -> Self {
        Self {
            query: query.into(),
            max_results,
            topic: "news".to_string(),
            days: Some(days),
            include_images: false,
            include_raw_content: false,
        }
    }

    pub fn with_images(mut self) -> Self {
        self.include_images = true;
        self
    }

    pub fn with_raw_content(mut self) -> Self {
        self.include_raw_content = true;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub raw_content: Option<String>,
}

/// Images come back as bare URLs, or as objects when descriptions are requested
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SearchImage {
    Url(String),
    Described {
        url: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl SearchImage {
    pub fn url(&self) -> &str {
        match self {
            SearchImage::Url(url) | SearchImage::Described { url, .. } => url,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub results: Vec<SearchHit>,
    #[serde(default)]
    pub images: Vec<SearchImage>,
}

/// A news article prepared for section writing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub title: String,
    pub image_url: Option<String>,
    pub raw_content: String,
}

impl SearchResponse {
    pub fn titles(&self) -> Vec<String> {
        self.results.iter().map(|r| r.title.clone()).collect()
    }

    /// Pair the i-th image with the i-th result
    pub fn into_articles(self) -> Vec<Article> {
        let mut images = self.images.into_iter();
        self.results
            .into_iter()
            .map(|hit| Article {
                title: hit.title,
                image_url: images
                    .next()
                    .map(|img| img.url().to_string())
                    .filter(|url| !url.is_empty()),
                raw_content: hit.raw_content.unwrap_or_default(),
            })
            .collect()
    }
}

/// A news search backend
#[async_trait]
pub trait NewsSearch: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;
}

/// Tavily search API client
pub struct TavilyClient {
    client: Client,
    api_key: String,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Build from `TAVILY_API_KEY`
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("TAVILY_API_KEY")
            .map_err(|_| PracticeError::config("TAVILY_API_KEY must be set"))?;
        Ok(Self::new(api_key))
    }
}

#[async_trait]
impl NewsSearch for TavilyClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let mut body = serde_json::to_value(request)?;
        body["api_key"] = json!(self.api_key);

        log::debug!("Tavily search: {:?}", request);

        let resp = self
            .client
            .post(TAVILY_SEARCH_URL)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(PracticeError::api("Tavily", format!("{}: {}", status, text)));
        }

        let response: SearchResponse = resp.json().await?;
        log::info!(
            "Tavily returned {} results for '{}'",
            response.results.len(),
            request.query
        );
        Ok(response)
    }
}

static TAVILY_SEARCH_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "The search query"
            },
            "max_results": {
                "type": "integer",
                "description": "Number of results to return (default 5)"
            }
        },
        "required": ["query"]
    })
});

#[derive(Debug, Deserialize)]
struct TavilySearchArgs {
    query: String,
    #[serde(default)]
    max_results: Option<u32>,
}

/// Web search exposed to agents
pub struct TavilySearchTool<S> {
    search: S,
}

impl<S: NewsSearch> TavilySearchTool<S> {
    pub fn new(search: S) -> Self {
        Self { search }
    }
}

#[async_trait]
impl<S: NewsSearch> Tool for TavilySearchTool<S> {
    fn name(&self) -> &str {
        "tavily_search"
    }

    fn description(&self) -> &str {
        "Searches the web with Tavily. Returns relevant results with titles, URLs, and content snippets."
    }

    fn schema(&self) -> &Value {
        &TAVILY_SEARCH_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: TavilySearchArgs = serde_json::from_value(input)?;
        let request = SearchRequest {
            query: args.query,
            max_results: args.max_results.unwrap_or(5).min(20),
            topic: "general".to_string(),
            days: None,
            include_images: false,
            include_raw_content: false,
        };

        let response = self.search.search(&request).await?;
        let results: Vec<Value> = response
            .results
            .iter()
            .map(|r| json!({"title": r.title, "url": r.url, "content": r.content}))
            .collect();

        Ok(json!({ "query": request.query, "results": results }))
    }
}

#[async_trait]
impl<T: NewsSearch + ?Sized> NewsSearch for std::sync::Arc<T> {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        (**self).search(request).await
    }
}
