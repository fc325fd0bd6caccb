//! Per-request caller preferences (§3 RuntimeContext).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguagePreference {
    Auto,
    En,
    Ru,
    Uz,
}

impl Default for LanguagePreference {
    fn default() -> Self {
        LanguagePreference::Auto
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertiseLevel {
    Beginner,
    Intermediate,
    Expert,
    General,
}

impl Default for ExpertiseLevel {
    fn default() -> Self {
        ExpertiseLevel::General
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStyle {
    Concise,
    Balanced,
    Detailed,
}

impl Default for ResponseStyle {
    fn default() -> Self {
        ResponseStyle::Balanced
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeContext {
    pub language_preference: LanguagePreference,
    pub expertise_level: ExpertiseLevel,
    pub response_style: ResponseStyle,
    pub enable_citations: bool,
    pub max_response_length: Option<usize>,
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self {
            language_preference: LanguagePreference::default(),
            expertise_level: ExpertiseLevel::default(),
            response_style: ResponseStyle::default(),
            enable_citations: true,
            max_response_length: None,
        }
    }
}
