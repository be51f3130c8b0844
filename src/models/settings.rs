//! The persisted widget settings record and its field table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Input widget used to edit a field on the settings page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    Url,
    Text,
    /// Plain text input upgraded to a color picker client-side
    Color,
    Select,
    Textarea,
}

/// A settings field, in the order the form shows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    WebhookUrl,
    WebhookRoute,
    BrandingLogo,
    BrandingName,
    BrandingWelcome,
    BrandingResponse,
    PrimaryColor,
    SecondaryColor,
    BackgroundColor,
    FontColor,
    Position,
    SuggestedQuestions,
}

impl Field {
    /// Key used in storage and in form submissions.
    pub fn key(self) -> &'static str {
        match self {
            Field::WebhookUrl => "webhook_url",
            Field::WebhookRoute => "webhook_route",
            Field::BrandingLogo => "branding_logo",
            Field::BrandingName => "branding_name",
            Field::BrandingWelcome => "branding_welcome",
            Field::BrandingResponse => "branding_response",
            Field::PrimaryColor => "primary_color",
            Field::SecondaryColor => "secondary_color",
            Field::BackgroundColor => "background_color",
            Field::FontColor => "font_color",
            Field::Position => "position",
            Field::SuggestedQuestions => "suggested_questions",
        }
    }

    pub fn default_value(self) -> &'static str {
        match self {
            Field::WebhookUrl => "",
            Field::WebhookRoute => "general",
            Field::BrandingLogo => "",
            Field::BrandingName => "Automate Ai",
            Field::BrandingWelcome => "Get instant answers to your questions!",
            Field::BrandingResponse => "Click the button below to start chatting",
            Field::PrimaryColor => "#c48c4f",
            Field::SecondaryColor => "#059669",
            Field::BackgroundColor => "#ffffff",
            Field::FontColor => "#1f2937",
            Field::Position => "right",
            Field::SuggestedQuestions => "",
        }
    }
}

/// Static description of one form field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: Field,
    pub label: &'static str,
    pub widget: WidgetKind,
    /// (value, label) pairs; empty unless the widget is a select
    pub options: &'static [(&'static str, &'static str)],
}

impl FieldSpec {
    const fn new(field: Field, label: &'static str, widget: WidgetKind) -> Self {
        Self {
            field,
            label,
            widget,
            options: &[],
        }
    }
}

/// Launcher positions offered by the editor.
pub const POSITION_OPTIONS: &[(&str, &str)] = &[("left", "Left"), ("right", "Right")];

/// Every settings field with its label and widget.
pub const FIELDS: [FieldSpec; 12] = [
    FieldSpec::new(Field::WebhookUrl, "Webhook URL", WidgetKind::Url),
    FieldSpec::new(Field::WebhookRoute, "Webhook Route", WidgetKind::Text),
    FieldSpec::new(Field::BrandingLogo, "Logo URL", WidgetKind::Url),
    FieldSpec::new(Field::BrandingName, "Brand Name", WidgetKind::Text),
    FieldSpec::new(Field::BrandingWelcome, "Welcome Text", WidgetKind::Text),
    FieldSpec::new(Field::BrandingResponse, "Response Time Text", WidgetKind::Text),
    FieldSpec::new(Field::PrimaryColor, "Primary Color", WidgetKind::Color),
    FieldSpec::new(Field::SecondaryColor, "Secondary Color", WidgetKind::Color),
    FieldSpec::new(Field::BackgroundColor, "Background Color", WidgetKind::Color),
    FieldSpec::new(Field::FontColor, "Font Color", WidgetKind::Color),
    FieldSpec {
        field: Field::Position,
        label: "Launcher Position (left/right)",
        widget: WidgetKind::Select,
        options: POSITION_OPTIONS,
    },
    FieldSpec::new(
        Field::SuggestedQuestions,
        "Suggested Questions (comma separated)",
        WidgetKind::Textarea,
    ),
];

/// The single persisted settings record.
///
/// Values are stored as given. `position` in particular is not checked
/// against [`POSITION_OPTIONS`]; consumers receive whatever was saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationRecord {
    pub webhook_url: String,
    pub webhook_route: String,
    pub branding_logo: String,
    pub branding_name: String,
    pub branding_welcome: String,
    pub branding_response: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub position: String,
    pub background_color: String,
    pub font_color: String,
    /// Comma-separated list
    pub suggested_questions: String,
}

impl Default for ConfigurationRecord {
    fn default() -> Self {
        Self::defaults()
    }
}

impl ConfigurationRecord {
    /// The record every deployment starts from.
    pub fn defaults() -> Self {
        Self {
            webhook_url: Field::WebhookUrl.default_value().to_string(),
            webhook_route: Field::WebhookRoute.default_value().to_string(),
            branding_logo: Field::BrandingLogo.default_value().to_string(),
            branding_name: Field::BrandingName.default_value().to_string(),
            branding_welcome: Field::BrandingWelcome.default_value().to_string(),
            branding_response: Field::BrandingResponse.default_value().to_string(),
            primary_color: Field::PrimaryColor.default_value().to_string(),
            secondary_color: Field::SecondaryColor.default_value().to_string(),
            position: Field::Position.default_value().to_string(),
            background_color: Field::BackgroundColor.default_value().to_string(),
            font_color: Field::FontColor.default_value().to_string(),
            suggested_questions: Field::SuggestedQuestions.default_value().to_string(),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::WebhookUrl => &self.webhook_url,
            Field::WebhookRoute => &self.webhook_route,
            Field::BrandingLogo => &self.branding_logo,
            Field::BrandingName => &self.branding_name,
            Field::BrandingWelcome => &self.branding_welcome,
            Field::BrandingResponse => &self.branding_response,
            Field::PrimaryColor => &self.primary_color,
            Field::SecondaryColor => &self.secondary_color,
            Field::BackgroundColor => &self.background_color,
            Field::FontColor => &self.font_color,
            Field::Position => &self.position,
            Field::SuggestedQuestions => &self.suggested_questions,
        }
    }

    fn get_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::WebhookUrl => &mut self.webhook_url,
            Field::WebhookRoute => &mut self.webhook_route,
            Field::BrandingLogo => &mut self.branding_logo,
            Field::BrandingName => &mut self.branding_name,
            Field::BrandingWelcome => &mut self.branding_welcome,
            Field::BrandingResponse => &mut self.branding_response,
            Field::PrimaryColor => &mut self.primary_color,
            Field::SecondaryColor => &mut self.secondary_color,
            Field::BackgroundColor => &mut self.background_color,
            Field::FontColor => &mut self.font_color,
            Field::Position => &mut self.position,
            Field::SuggestedQuestions => &mut self.suggested_questions,
        }
    }

    /// Start from the defaults and overwrite every field `lookup` has a value for.
    fn merged_over_defaults(mut lookup: impl FnMut(Field) -> Option<String>) -> Self {
        let mut record = Self::defaults();
        for spec in FIELDS.iter() {
            if let Some(value) = lookup(spec.field) {
                *record.get_mut(spec.field) = value;
            }
        }
        record
    }

    /// Merge submitted form values over the defaults.
    ///
    /// Omitted fields revert to their default; unknown keys are ignored.
    pub fn from_submission(values: &HashMap<String, String>) -> Self {
        Self::merged_over_defaults(|field| values.get(field.key()).cloned())
    }

    /// Merge a stored JSON object over the defaults.
    ///
    /// A value that is not an object yields the defaults; a field holding
    /// anything but a string falls back to its own default.
    pub fn from_stored(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            tracing::warn!("Stored settings are not a JSON object, using defaults");
            return Self::defaults();
        };

        Self::merged_over_defaults(|field| match object.get(field.key()) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                tracing::warn!(
                    "Stored setting {} is not a string ({}), using default",
                    field.key(),
                    other
                );
                None
            }
            None => None,
        })
    }
}
