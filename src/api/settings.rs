//! Settings editor endpoints.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{Html, Redirect},
    Form, Json,
};
use serde::Serialize;

use super::{success, ApiResult};
use crate::admin::{self, NONCE_FIELD};
use crate::auth::Credentials;
use crate::errors::AppError;
use crate::models::{ConfigurationRecord, WidgetKind, FIELDS};
use crate::AppState;

/// Query flag set after a successful form save.
pub const SAVED_FLAG: &str = "settings-updated";

fn settings_path(state: &AppState) -> String {
    format!("{}/settings", state.config.admin_prefix)
}

/// GET /admin/settings - Render the settings form.
pub async fn settings_page(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Html<String> {
    let record = state.store.load().await;
    let saved = query.get(SAVED_FLAG).is_some_and(|v| v == "true");

    Html(admin::render_form(&record).to_html(
        &settings_path(&state),
        state.nonce.as_str(),
        saved,
    ))
}

/// POST /admin/settings - Save the submitted form and redirect back to it.
pub async fn submit_settings_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(values): Form<HashMap<String, String>>,
) -> Result<Redirect, AppError> {
    if !state.nonce.verify(values.get(NONCE_FIELD).map(String::as_str)) {
        tracing::warn!("Rejected settings form with a missing or stale nonce");
        return Err(AppError::Forbidden(
            "The link you followed has expired.".to_string(),
        ));
    }

    let credentials = Credentials::from_headers(&headers);
    admin::handle_submit(
        state.store.as_ref(),
        state.authorizer.as_ref(),
        &credentials,
        &values,
    )
    .await?;

    Ok(Redirect::to(&format!(
        "{}?{}=true",
        settings_path(&state),
        SAVED_FLAG
    )))
}

/// GET /api/settings - Get the current settings record.
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<ConfigurationRecord> {
    success(state.store.load().await)
}

/// PUT /api/settings - Replace the settings record.
pub async fn put_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(values): Json<HashMap<String, String>>,
) -> ApiResult<ConfigurationRecord> {
    let credentials = Credentials::from_headers(&headers);
    let record = admin::handle_submit(
        state.store.as_ref(),
        state.authorizer.as_ref(),
        &credentials,
        &values,
    )
    .await?;

    success(record)
}

/// A select option in the schema listing.
#[derive(Debug, Serialize)]
pub struct SchemaOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// One settings field as exposed by the schema endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    pub id: &'static str,
    pub label: &'static str,
    pub widget: WidgetKind,
    pub options: Vec<SchemaOption>,
    pub default_value: &'static str,
}

/// GET /api/settings/schema - List the settings fields.
pub async fn get_schema() -> ApiResult<Vec<FieldSchema>> {
    let fields = FIELDS
        .iter()
        .map(|spec| FieldSchema {
            id: spec.field.key(),
            label: spec.label,
            widget: spec.widget,
            options: spec
                .options
                .iter()
                .map(|&(value, label)| SchemaOption { value, label })
                .collect(),
            default_value: spec.field.default_value(),
        })
        .collect();

    success(fields)
}
