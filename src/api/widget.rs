//! Front-end configuration endpoint.

use axum::{extract::State, Json};

use crate::injector::build_frontend_config;
use crate::models::RenderedFrontendConfig;
use crate::AppState;

/// GET /widget/config.json - The object otherwise injected as `window.ChatWidgetConfig`.
pub async fn widget_config(State(state): State<AppState>) -> Json<RenderedFrontendConfig> {
    let record = state.store.load().await;
    Json(build_frontend_config(&record))
}
