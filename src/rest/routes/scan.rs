// rest/routes/scan.rs — Scan REST routes.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::ScanError;
use crate::model::{Browser, Engine, ScanOptions, ScanTarget};
use crate::{target, AppContext};

type RouteError = (StatusCode, Json<Value>);

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct ScanUrlRequest {
    pub url: String,
    pub browser: Option<String>,
    #[serde(default = "default_true")]
    pub headless: bool,
    pub engine: Option<String>,
}

#[derive(Deserialize)]
pub struct ScanHtmlRequest {
    pub html: String,
    pub browser: Option<String>,
    #[serde(default = "default_true")]
    pub headless: bool,
}

/// Validate the browser choice before any backend is touched.
fn parse_browser(ctx: &AppContext, requested: Option<&str>) -> Result<Browser, RouteError> {
    let name = requested.unwrap_or(&ctx.config.scan.browser);
    name.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Unsupported browser" })),
        )
    })
}

fn scan_failure(e: ScanError) -> RouteError {
    let status = match e {
        ScanError::UnsupportedBrowser(_) | ScanError::UnsupportedEngine(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(json!({ "error": e.to_string(), "code": e.code() })),
    )
}

pub async fn scan_url(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<ScanUrlRequest>,
) -> Result<Json<Value>, RouteError> {
    let browser = parse_browser(&ctx, body.browser.as_deref())?;
    let engine: Engine = body
        .engine
        .as_deref()
        .unwrap_or("selenium")
        .parse()
        .map_err(scan_failure)?;
    let opts = ScanOptions {
        browser,
        headless: body.headless,
    };

    let result = ctx
        .scanner(engine)
        .scan(&ScanTarget::RemoteUrl(body.url), &opts)
        .await
        .map_err(scan_failure)?;
    Ok(Json(serde_json::to_value(result).unwrap_or_default()))
}

pub async fn scan_html(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<ScanHtmlRequest>,
) -> Result<Json<Value>, RouteError> {
    let browser = parse_browser(&ctx, body.browser.as_deref())?;
    let opts = ScanOptions {
        browser,
        headless: body.headless,
    };

    let materialized = target::materialize(&body.html).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    // HTML targets go through the scripted-page backend, which navigates
    // file:// URLs uniformly.
    let result = ctx
        .scanner(Engine::Playwright)
        .scan(&ScanTarget::LocalHtml(materialized), &opts)
        .await
        .map_err(scan_failure)?;
    Ok(Json(serde_json::to_value(result).unwrap_or_default()))
}
