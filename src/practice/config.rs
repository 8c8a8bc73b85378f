//! Runtime settings and the external services built from them
//!
//! Settings come from an optional YAML file; every key has a default so an
//! empty or missing file is valid. `MODEL_NAME` and `MODEL_PROVIDER` override
//! the model section. API keys are read from the environment by the clients.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::adk::error::{PracticeError, Result};
use crate::adk::model::{self, Model};
use crate::practice::stock::{TeamRouter, MEMBERS};
use crate::practice::tools::{
    MarketData, NewsSearch, StockAnalysisTool, StockChartTool, TavilyClient, TavilySearchTool,
    ToolRegistry, YahooFinanceClient,
};
use crate::practice::workflow::graph::DEFAULT_RECURSION_LIMIT;

/// Settings file picked up from the working directory when no path is given
pub const DEFAULT_SETTINGS_FILE: &str = "agent-practice.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: ModelSettings,
    pub newsletter: NewsletterSettings,
    pub stock: StockSettings,
    pub executor: ExecutorSettings,
    pub agent: AgentSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub name: String,
    /// `openai` or `anthropic`; inferred from the model name when unset
    pub provider: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: "gpt-4o-mini".to_string(),
            provider: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsletterSettings {
    pub keyword_results: u32,
    pub keyword_days: u32,
    pub sub_theme_results: u32,
    pub sub_theme_days: u32,
    /// Number of sub-themes kept and sections written
    pub sections: usize,
    /// Run the final editing pass
    pub edit: bool,
}

impl Default for NewsletterSettings {
    fn default() -> Self {
        Self {
            keyword_results: 5,
            keyword_days: 5,
            sub_theme_results: 3,
            sub_theme_days: 7,
            sections: 5,
            edit: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockSettings {
    /// Visits allowed per team member before the supervisor moves on
    pub max_trials: u32,
}

impl Default for StockSettings {
    fn default() -> Self {
        Self { max_trials: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    pub recursion_limit: u32,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Tool-calling turns per worker agent
    pub max_turns: u32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self { max_turns: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

impl Settings {
    /// Load from `path`, or from [`DEFAULT_SETTINGS_FILE`] if present, then
    /// apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_SETTINGS_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_SETTINGS_FILE))?
            }
            None => Self::default(),
        };
        settings.apply_env_overrides(
            env::var("MODEL_NAME").ok(),
            env::var("MODEL_PROVIDER").ok(),
        );
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        log::info!("Loading settings from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| {
            PracticeError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse_yaml(&content)
    }

    pub fn parse_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    fn apply_env_overrides(&mut self, model_name: Option<String>, provider: Option<String>) {
        if let Some(name) = model_name.filter(|n| !n.is_empty()) {
            self.model.name = name;
        }
        if let Some(provider) = provider.filter(|p| !p.is_empty()) {
            self.model.provider = Some(provider);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.newsletter.sections == 0 {
            return Err(PracticeError::config("newsletter.sections must be at least 1"));
        }
        if self.stock.max_trials == 0 {
            return Err(PracticeError::config("stock.max_trials must be at least 1"));
        }
        if self.executor.recursion_limit == 0 {
            return Err(PracticeError::config(
                "executor.recursion_limit must be at least 1",
            ));
        }
        let bound = TeamRouter::new(
            MEMBERS.iter().map(|m| m.to_string()).collect(),
            self.stock.max_trials,
        )
        .superstep_bound();
        if self.executor.recursion_limit < bound {
            return Err(PracticeError::config(format!(
                "executor.recursion_limit {} is below the {} supersteps stock.max_trials {} can need",
                self.executor.recursion_limit, bound, self.stock.max_trials
            )));
        }
        Ok(())
    }
}

/// External services shared by both pipelines
#[derive(Clone)]
pub struct Services {
    pub model: Arc<dyn Model>,
    pub search: Arc<dyn NewsSearch>,
    pub market: Arc<dyn MarketData>,
    pub registry: ToolRegistry,
}

impl Services {
    /// Assemble services and register the agent tools built on them
    pub async fn new(
        model: Arc<dyn Model>,
        search: Arc<dyn NewsSearch>,
        market: Arc<dyn MarketData>,
    ) -> Self {
        let registry = ToolRegistry::new();
        registry
            .register(Arc::new(TavilySearchTool::new(search.clone())))
            .await;
        registry
            .register(Arc::new(StockAnalysisTool::new(market.clone())))
            .await;
        registry
            .register(Arc::new(StockChartTool::new(market.clone())))
            .await;

        Self {
            model,
            search,
            market,
            registry,
        }
    }

    /// Live clients configured from settings and environment
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let model = model::from_name(&settings.model.name, settings.model.provider.as_deref())?;
        let search: Arc<dyn NewsSearch> = Arc::new(TavilyClient::from_env()?);
        let market: Arc<dyn MarketData> = Arc::new(YahooFinanceClient::new());
        Ok(Self::new(model, search, market).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.model.name, "gpt-4o-mini");
        assert_eq!(settings.newsletter.sections, 5);
        assert_eq!(settings.newsletter.sub_theme_results, 3);
        assert!(settings.newsletter.edit);
        assert_eq!(settings.stock.max_trials, 1);
        assert_eq!(settings.executor.recursion_limit, 25);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
model:
  name: claude-3-5-sonnet-latest
newsletter:
  edit: false
stock:
  max_trials: 2
"#;
        let settings = Settings::parse_yaml(yaml).unwrap();
        assert_eq!(settings.model.name, "claude-3-5-sonnet-latest");
        assert_eq!(settings.model.provider, None);
        assert!(!settings.newsletter.edit);
        assert_eq!(settings.newsletter.keyword_days, 5);
        assert_eq!(settings.stock.max_trials, 2);
        assert_eq!(settings.server.port, 3000);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Settings::parse_yaml("  \n").unwrap(), Settings::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Settings::parse_yaml("newsletter:\n  sections: 0\n").unwrap_err();
        assert!(matches!(err, PracticeError::Config(_)));
    }

    #[test]
    fn test_trial_ceiling_must_fit_recursion_limit() {
        let ok = Settings::parse_yaml("stock:\n  max_trials: 5\n").unwrap();
        assert_eq!(ok.stock.max_trials, 5);

        let err = Settings::parse_yaml("stock:\n  max_trials: 6\n").unwrap_err();
        assert!(matches!(err, PracticeError::Config(ref m) if m.contains("recursion_limit")));

        let raised =
            Settings::parse_yaml("stock:\n  max_trials: 6\nexecutor:\n  recursion_limit: 27\n")
                .unwrap();
        assert_eq!(raised.executor.recursion_limit, 27);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.apply_env_overrides(Some("gpt-4o".to_string()), Some(String::new()));
        assert_eq!(settings.model.name, "gpt-4o");
        assert_eq!(settings.model.provider, None);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Settings::from_file(Path::new("/nonexistent/agent-practice.yaml")).unwrap_err();
        assert!(matches!(err, PracticeError::Config(_)));
    }
}
