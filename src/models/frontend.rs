//! Front-end configuration object read by the external chat script.

use serde::{Deserialize, Serialize};

/// Where the widget posts chat messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    pub route: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingConfig {
    pub logo: String,
    pub name: String,
    pub welcome_text: String,
    pub response_time_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleConfig {
    pub primary_color: String,
    pub secondary_color: String,
    /// "left" or "right" when set through the editor; passed through as stored
    pub position: String,
    pub background_color: String,
    pub font_color: String,
}

/// The object assigned to `window.ChatWidgetConfig`.
///
/// Built fresh on every render and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedFrontendConfig {
    pub webhook: WebhookConfig,
    pub branding: BrandingConfig,
    pub style: StyleConfig,
    pub suggested_questions: Vec<String>,
}
