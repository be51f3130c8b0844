//! Settings editor.
//!
//! Describes the settings form from the static field table, renders it as
//! HTML, and persists submissions through the configuration store.

use std::collections::HashMap;

use crate::auth::{constant_time_compare, Authorizer, Credentials, ACCESS_DENIED};
use crate::errors::AppError;
use crate::models::{ConfigurationRecord, WidgetKind, FIELDS};
use crate::store::ConfigurationStore;

/// Form field carrying the settings-page nonce.
pub const NONCE_FIELD: &str = "_nonce";

/// CSS class of inputs upgraded to a color picker.
pub const COLOR_PICKER_CLASS: &str = "chat-widget-color-picker";

/// One entry of a select widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// One input on the settings form, pre-filled from the current record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub id: &'static str,
    pub label: &'static str,
    pub widget: WidgetKind,
    pub value: String,
    pub options: Vec<SelectOption>,
}

/// The whole settings form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDescription {
    pub fields: Vec<FormField>,
}

/// Describe the form for `record`, one field per schema entry in table order.
pub fn render_form(record: &ConfigurationRecord) -> FormDescription {
    let fields = FIELDS
        .iter()
        .map(|spec| {
            let value = record.get(spec.field).to_string();
            let options = spec
                .options
                .iter()
                .map(|&(option_value, label)| SelectOption {
                    value: option_value,
                    label,
                    selected: option_value == value,
                })
                .collect();

            FormField {
                id: spec.field.key(),
                label: spec.label,
                widget: spec.widget,
                value,
                options,
            }
        })
        .collect();

    FormDescription { fields }
}

impl FormField {
    fn to_html(&self) -> String {
        let name = escape_html(self.id);
        let value = escape_html(&self.value);

        match self.widget {
            WidgetKind::Textarea => format!(
                r#"<textarea id="{name}" name="{name}" rows="3" class="large-text">{value}</textarea>"#
            ),
            WidgetKind::Color => format!(
                r#"<input type="text" id="{name}" class="{COLOR_PICKER_CLASS}" name="{name}" value="{value}" />"#
            ),
            WidgetKind::Select => {
                let options: String = self
                    .options
                    .iter()
                    .map(|option| {
                        format!(
                            r#"<option value="{}"{}>{}</option>"#,
                            escape_html(option.value),
                            if option.selected { r#" selected="selected""# } else { "" },
                            escape_html(option.label)
                        )
                    })
                    .collect();
                format!(r#"<select id="{name}" name="{name}">{options}</select>"#)
            }
            WidgetKind::Url | WidgetKind::Text => {
                let input_type = if self.widget == WidgetKind::Url { "url" } else { "text" };
                format!(
                    r#"<input type="{input_type}" id="{name}" class="regular-text" name="{name}" value="{value}" />"#
                )
            }
        }
    }
}

impl FormDescription {
    /// Render the settings page posting back to `action`.
    pub fn to_html(&self, action: &str, nonce: &str, saved: bool) -> String {
        let rows: String = self
            .fields
            .iter()
            .map(|field| {
                format!(
                    "<tr><th scope=\"row\"><label for=\"{}\">{}</label></th><td>{}</td></tr>\n",
                    escape_html(field.id),
                    escape_html(field.label),
                    field.to_html()
                )
            })
            .collect();

        let notice = if saved {
            "<div class=\"notice notice-success\"><p>Settings saved.</p></div>\n"
        } else {
            ""
        };

        format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Chat Widget</title></head>
<body>
<div class="wrap"><h1>Automate Ai – Chat Widget</h1>
{notice}<form method="post" action="{action}">
<input type="hidden" name="{NONCE_FIELD}" value="{nonce}" />
<h2>Widget Configuration</h2>
<table class="form-table" role="presentation"><tbody>
{rows}</tbody></table>
<p class="submit"><input type="submit" name="submit" id="submit" class="button button-primary" value="Save Changes" /></p>
</form></div>
</body>
</html>
"#,
            action = escape_html(action),
            nonce = escape_html(nonce),
        )
    }
}

/// Token tying form submissions to a page this process rendered.
#[derive(Debug, Clone)]
pub struct FormNonce(String);

impl FormNonce {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn verify(&self, provided: Option<&str>) -> bool {
        provided.is_some_and(|provided| constant_time_compare(provided, &self.0))
    }
}

/// Check edit rights, merge `values` over the defaults and save the result.
///
/// Nothing is written when the caller may not edit.
pub async fn handle_submit(
    store: &dyn ConfigurationStore,
    authorizer: &dyn Authorizer,
    credentials: &Credentials,
    values: &HashMap<String, String>,
) -> Result<ConfigurationRecord, AppError> {
    if !authorizer.current_user_may_edit(credentials) {
        return Err(AppError::Forbidden(ACCESS_DENIED.to_string()));
    }

    let record = ConfigurationRecord::from_submission(values);
    store.save(&record).await?;

    Ok(record)
}

/// Escape text for use in HTML content and quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PskAuthorizer;
    use crate::store::MemoryStore;

    fn admin() -> (PskAuthorizer, Credentials) {
        (
            PskAuthorizer::new(Some("secret".to_string())),
            Credentials {
                key: Some("secret".to_string()),
            },
        )
    }

    #[test]
    fn test_form_has_one_field_per_schema_entry() {
        let form = render_form(&ConfigurationRecord::defaults());

        assert_eq!(form.fields.len(), FIELDS.len());
        for (field, spec) in form.fields.iter().zip(FIELDS.iter()) {
            assert_eq!(field.id, spec.field.key());
            assert_eq!(field.widget, spec.widget);
            assert_eq!(field.value, spec.field.default_value());
        }
    }

    #[test]
    fn test_select_marks_current_position() {
        let mut record = ConfigurationRecord::defaults();
        record.position = "left".to_string();
        let form = render_form(&record);

        let position = form.fields.iter().find(|f| f.id == "position").unwrap();
        assert_eq!(position.widget, WidgetKind::Select);
        assert_eq!(
            position.options,
            vec![
                SelectOption { value: "left", label: "Left", selected: true },
                SelectOption { value: "right", label: "Right", selected: false },
            ]
        );
    }

    #[test]
    fn test_non_select_fields_have_no_options() {
        let form = render_form(&ConfigurationRecord::defaults());

        assert!(form
            .fields
            .iter()
            .filter(|f| f.widget != WidgetKind::Select)
            .all(|f| f.options.is_empty()));
    }

    #[test]
    fn test_html_widgets() {
        let html = render_form(&ConfigurationRecord::defaults()).to_html(
            "/admin/settings",
            "abc",
            false,
        );

        assert!(html.contains(r#"<input type="url" id="webhook_url" class="regular-text" name="webhook_url" value="" />"#));
        assert!(html.contains(r##"<input type="text" id="primary_color" class="chat-widget-color-picker" name="primary_color" value="#c48c4f" />"##));
        assert!(html.contains(r#"<option value="right" selected="selected">Right</option>"#));
        assert!(html.contains(r#"<textarea id="suggested_questions" name="suggested_questions" rows="3" class="large-text"></textarea>"#));
        assert!(html.contains(r#"<input type="hidden" name="_nonce" value="abc" />"#));
        assert!(html.contains(r#"action="/admin/settings""#));
        assert!(!html.contains("Settings saved."));
    }

    #[test]
    fn test_html_escapes_values() {
        let mut record = ConfigurationRecord::defaults();
        record.branding_name = r#""><script>alert(1)</script>"#.to_string();
        let html = render_form(&record).to_html("/admin/settings", "abc", true);

        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&quot;&gt;&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("Settings saved."));
    }

    #[test]
    fn test_nonce_verification() {
        let nonce = FormNonce::generate();
        let value = nonce.as_str().to_string();

        assert!(nonce.verify(Some(&value)));
        assert!(!nonce.verify(Some("forged")));
        assert!(!nonce.verify(None));
        assert_ne!(FormNonce::generate().as_str(), nonce.as_str());
    }

    #[tokio::test]
    async fn test_submit_merges_over_defaults_and_saves() {
        let store = MemoryStore::new();
        let (authorizer, credentials) = admin();
        let values = HashMap::from([
            ("webhook_url".to_string(), "https://hooks.example.com".to_string()),
            ("position".to_string(), "left".to_string()),
        ]);

        let saved = handle_submit(&store, &authorizer, &credentials, &values)
            .await
            .unwrap();

        assert_eq!(saved.webhook_url, "https://hooks.example.com");
        assert_eq!(saved.position, "left");
        assert_eq!(saved.branding_name, "Automate Ai");
        assert_eq!(store.load().await, saved);
    }

    #[tokio::test]
    async fn test_omitted_field_reverts_to_default() {
        let store = MemoryStore::new();
        let (authorizer, credentials) = admin();

        let first = HashMap::from([("branding_name".to_string(), "Acme".to_string())]);
        handle_submit(&store, &authorizer, &credentials, &first)
            .await
            .unwrap();

        let second = HashMap::from([("webhook_route".to_string(), "sales".to_string())]);
        let saved = handle_submit(&store, &authorizer, &credentials, &second)
            .await
            .unwrap();

        assert_eq!(saved.branding_name, "Automate Ai");
        assert_eq!(saved.webhook_route, "sales");
    }

    #[tokio::test]
    async fn test_resubmission_is_idempotent() {
        let store = MemoryStore::new();
        let (authorizer, credentials) = admin();
        let values = HashMap::from([
            ("branding_name".to_string(), "Acme".to_string()),
            ("suggested_questions".to_string(), "a, b".to_string()),
        ]);

        let once = handle_submit(&store, &authorizer, &credentials, &values)
            .await
            .unwrap();
        let resubmitted: HashMap<String, String> = serde_json::from_value(
            serde_json::to_value(&once).unwrap(),
        )
        .unwrap();
        let twice = handle_submit(&store, &authorizer, &credentials, &resubmitted)
            .await
            .unwrap();

        assert_eq!(once, twice);
        assert_eq!(store.load().await, once);
    }

    #[tokio::test]
    async fn test_unauthorized_submit_writes_nothing() {
        let mut previous = ConfigurationRecord::defaults();
        previous.branding_name = "Kept".to_string();
        let store = MemoryStore::with_value(serde_json::to_value(&previous).unwrap());
        let authorizer = PskAuthorizer::new(Some("secret".to_string()));
        let values = HashMap::from([("branding_name".to_string(), "Hijacked".to_string())]);

        let result = handle_submit(
            &store,
            &authorizer,
            &Credentials { key: Some("wrong".to_string()) },
            &values,
        )
        .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert_eq!(store.load().await, previous);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#039;&amp;&#039;&lt;/a&gt;");
        assert_eq!(escape_html("plain"), "plain");
    }
}
