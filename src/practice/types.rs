//! Types shared by both pipelines

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output language requested by the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    #[serde(alias = "English")]
    English,
    #[serde(alias = "Korean", alias = "한글")]
    Korean,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::English => write!(f, "English"),
            Language::Korean => write!(f, "Korean"),
        }
    }
}

/// One entry of a run's message history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    /// Team member that produced the message, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            name: None,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            name: None,
            content: content.into(),
        }
    }

    pub fn named(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            name: Some(name.into()),
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_accepts_display_names() {
        let korean: Language = serde_json::from_str("\"한글\"").unwrap();
        assert_eq!(korean, Language::Korean);

        let english: Language = serde_json::from_str("\"english\"").unwrap();
        assert_eq!(english.to_string(), "English");
    }

    #[test]
    fn test_named_message_serialization() {
        let msg = ChatMessage::named("Researcher", "AAPL beat earnings");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["name"], "Researcher");

        let plain = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert!(plain.get("name").is_none());
    }
}
