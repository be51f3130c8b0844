//! Public page injector.
//!
//! Every non-admin HTML response gets the widget configuration assigned to
//! `window.ChatWidgetConfig`, followed by the tag loading the widget script.

use axum::{
    body::{Body, HttpBody},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::ASSET_MOUNT;
use crate::errors::AppError;
use crate::models::{
    BrandingConfig, ConfigurationRecord, RenderedFrontendConfig, StyleConfig, WebhookConfig,
};
use crate::AppState;

/// Global the external script reads its configuration from.
pub const CONFIG_GLOBAL: &str = "ChatWidgetConfig";

/// Largest page body the injector will buffer.
const MAX_PAGE_BYTES: usize = 8 * 1024 * 1024;

/// Split a comma-separated list, trimming items and dropping empty ones.
pub fn split_questions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reshape the stored record into the object the widget script expects.
pub fn build_frontend_config(record: &ConfigurationRecord) -> RenderedFrontendConfig {
    RenderedFrontendConfig {
        webhook: WebhookConfig {
            url: record.webhook_url.clone(),
            route: record.webhook_route.clone(),
        },
        branding: BrandingConfig {
            logo: record.branding_logo.clone(),
            name: record.branding_name.clone(),
            welcome_text: record.branding_welcome.clone(),
            response_time_text: record.branding_response.clone(),
        },
        style: StyleConfig {
            primary_color: record.primary_color.clone(),
            secondary_color: record.secondary_color.clone(),
            position: record.position.clone(),
            background_color: record.background_color.clone(),
            font_color: record.font_color.clone(),
        },
        suggested_questions: split_questions(&record.suggested_questions),
    }
}

/// Serialize for embedding in an inline script.
///
/// `<`, `>`, `&` and `/` only occur inside JSON strings, so escaping them
/// keeps the text valid JSON while no value can open a comment or close
/// the script block.
pub fn config_json(config: &RenderedFrontendConfig) -> Result<String, AppError> {
    let json = serde_json::to_string(config).map_err(AppError::serialization)?;
    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            '/' => escaped.push_str("\\/"),
            _ => escaped.push(c),
        }
    }
    Ok(escaped)
}

/// Markup placed in a page, in load order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetInjection {
    /// Inline script assigning the configuration global
    pub config_script: String,
    /// Tag loading the external widget script
    pub widget_script: String,
}

impl WidgetInjection {
    pub fn to_html(&self) -> String {
        format!("{}\n{}\n", self.config_script, self.widget_script)
    }
}

/// Produce the configuration assignment and, after it, the widget script tag.
pub fn emit(
    config: &RenderedFrontendConfig,
    script_url: &str,
) -> Result<WidgetInjection, AppError> {
    let json = config_json(config)?;

    Ok(WidgetInjection {
        config_script: format!("<script>window.{} = {};</script>", CONFIG_GLOBAL, json),
        widget_script: format!(
            "<script src=\"{}\"></script>",
            crate::admin::escape_html(script_url)
        ),
    })
}

/// Insert `fragment` before the last `</body>`, or append it.
pub fn insert_before_body_end(html: &str, fragment: &str) -> String {
    let lower = html.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(at) => {
            let mut page = String::with_capacity(html.len() + fragment.len());
            page.push_str(&html[..at]);
            page.push_str(fragment);
            page.push_str(&html[at..]);
            page
        }
        None => format!("{}{}", html, fragment),
    }
}

/// Drop validators and ranges so the page is rebuilt with current settings.
fn strip_conditional_headers(headers: &mut HeaderMap) {
    for name in [
        header::IF_MODIFIED_SINCE,
        header::IF_NONE_MATCH,
        header::IF_RANGE,
        header::RANGE,
    ] {
        headers.remove(name);
    }
}

/// Whether a response is a complete HTML page small enough to rewrite.
///
/// Bodies of unknown length stream through untouched.
fn is_injectable(status: StatusCode, headers: &HeaderMap, exact_len: Option<u64>) -> bool {
    if status != StatusCode::OK || headers.contains_key(header::CONTENT_ENCODING) {
        return false;
    }

    let is_html = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().to_ascii_lowercase().starts_with("text/html"));

    let len = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .or(exact_len);

    is_html && len.is_some_and(|len| len <= MAX_PAGE_BYTES as u64)
}

/// Middleware adding the widget to public HTML pages.
///
/// Requests under the admin prefix pass through untouched.
pub async fn inject_widget(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if state.config.is_admin_path(path) {
        return next.run(request).await;
    }

    if !path.starts_with(ASSET_MOUNT) {
        strip_conditional_headers(request.headers_mut());
    }

    let response = next.run(request).await;
    let exact_len = response.body().size_hint().exact();
    if !is_injectable(response.status(), response.headers(), exact_len) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_PAGE_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to buffer page for widget injection: {}", e);
            return AppError::Internal("Failed to render page".to_string()).into_response();
        }
    };

    let html = match String::from_utf8(bytes.to_vec()) {
        Ok(html) => html,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };

    let record = state.store.load().await;
    let injection = match emit(&build_frontend_config(&record), &state.config.script_url()) {
        Ok(injection) => injection,
        Err(e) => {
            tracing::warn!("Skipping widget injection: {}", e);
            return Response::from_parts(parts, Body::from(html));
        }
    };

    let page = insert_before_body_end(&html, &injection.to_html());
    for name in [
        header::CONTENT_LENGTH,
        header::LAST_MODIFIED,
        header::ETAG,
        header::ACCEPT_RANGES,
    ] {
        parts.headers.remove(name);
    }
    parts
        .headers
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Response::from_parts(parts, Body::from(page))
}
