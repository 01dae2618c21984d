// SPDX-License-Identifier: MIT
//! MCP tool server — JSON-RPC 2.0 over stdio.
//!
//! Implements the Model Context Protocol (specification version 2024-11-05)
//! lifecycle and exposes a single tool, `scan-url`, returning the same
//! result shape as the CLI and REST adapters.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::model::{Browser, Engine, ScanOptions, ScanTarget};
use crate::AppContext;

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

// ─── JSON-RPC 2.0 wire types ─────────────────────────────────────────────────

/// An incoming MCP JSON-RPC 2.0 request or notification.
///
/// Notifications (no `id`) use the same wire format but expect no response.
#[derive(Debug, Clone, Deserialize)]
pub struct McpMessage {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// A MCP JSON-RPC 2.0 response (success or error).
#[derive(Debug, Clone, Serialize)]
pub struct McpResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

impl McpResponse {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: Value, error: McpError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// A MCP JSON-RPC error object.
#[derive(Debug, Clone, Serialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
}

impl McpError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

pub const MCP_PARSE_ERROR: i32 = -32700;
pub const MCP_METHOD_NOT_FOUND: i32 = -32601;
pub const MCP_INVALID_PARAMS: i32 = -32602;
pub const MCP_INTERNAL_ERROR: i32 = -32603;

// ─── Server loop ─────────────────────────────────────────────────────────────

/// Serve MCP over stdin/stdout until EOF.
pub async fn serve_stdio(ctx: Arc<AppContext>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let Some(response) = handle_line(&line, &ctx).await else {
            continue;
        };
        let payload = serde_json::to_string(&response)?;
        stdout.write_all(payload.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    Ok(())
}

async fn handle_line(line: &str, ctx: &AppContext) -> Option<McpResponse> {
    let message: McpMessage = match serde_json::from_str(line) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "unparseable MCP message");
            return Some(McpResponse::err(
                Value::Null,
                McpError::new(MCP_PARSE_ERROR, e.to_string()),
            ));
        }
    };
    handle_message(message, ctx).await
}

/// Dispatch one message. Notifications yield no response.
pub async fn handle_message(message: McpMessage, ctx: &AppContext) -> Option<McpResponse> {
    let id = message.id.clone();
    debug!(method = %message.method, "mcp request");
    match message.method.as_str() {
        "initialize" => Some(McpResponse::ok(
            id.unwrap_or(Value::Null),
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "serverInfo": {
                    "name": "axescan",
                    "version": env!("CARGO_PKG_VERSION"),
                },
                "capabilities": { "tools": {} },
            }),
        )),
        "notifications/initialized" => None,
        "ping" => Some(McpResponse::ok(id.unwrap_or(Value::Null), json!({}))),
        "tools/list" => Some(McpResponse::ok(
            id.unwrap_or(Value::Null),
            json!({ "tools": [scan_url_tool()] }),
        )),
        "tools/call" => {
            let id = id.unwrap_or(Value::Null);
            Some(handle_tool_call(id, message.params.unwrap_or(Value::Null), ctx).await)
        }
        _ => {
            // Unknown notifications are dropped; unknown requests get an error.
            id.map(|id| {
                McpResponse::err(
                    id,
                    McpError::new(
                        MCP_METHOD_NOT_FOUND,
                        format!("method '{}' not found", message.method),
                    ),
                )
            })
        }
    }
}

fn scan_url_tool() -> Value {
    json!({
        "name": "scan-url",
        "description": "Audit a URL for accessibility violations using axe-core",
        "inputSchema": {
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "URL to audit" },
                "engine": {
                    "type": "string",
                    "enum": ["selenium", "playwright"],
                    "default": "selenium"
                },
                "browser": {
                    "type": "string",
                    "enum": ["chrome", "firefox"],
                    "default": "chrome"
                },
                "headless": { "type": "boolean", "default": true }
            },
            "required": ["url"]
        }
    })
}

#[derive(Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

async fn handle_tool_call(id: Value, params: Value, ctx: &AppContext) -> McpResponse {
    let call: ToolCallParams = match serde_json::from_value(params) {
        Ok(c) => c,
        Err(e) => return McpResponse::err(id, McpError::new(MCP_INVALID_PARAMS, e.to_string())),
    };
    if call.name != "scan-url" {
        return McpResponse::err(
            id,
            McpError::new(MCP_METHOD_NOT_FOUND, format!("unknown tool '{}'", call.name)),
        );
    }

    let Some(url) = call.arguments.get("url").and_then(Value::as_str) else {
        return McpResponse::err(id, McpError::new(MCP_INVALID_PARAMS, "url required"));
    };
    let engine = match call
        .arguments
        .get("engine")
        .and_then(Value::as_str)
        .map_or(Ok(Engine::Selenium), Engine::from_str)
    {
        Ok(e) => e,
        Err(e) => return McpResponse::err(id, McpError::new(MCP_INVALID_PARAMS, e.to_string())),
    };
    let browser = match call
        .arguments
        .get("browser")
        .and_then(Value::as_str)
        .map_or(Ok(Browser::Chrome), Browser::from_str)
    {
        Ok(b) => b,
        Err(e) => return McpResponse::err(id, McpError::new(MCP_INVALID_PARAMS, e.to_string())),
    };
    let opts = ScanOptions {
        browser,
        headless: call
            .arguments
            .get("headless")
            .and_then(Value::as_bool)
            .unwrap_or(true),
    };

    match ctx
        .scanner(engine)
        .scan(&ScanTarget::RemoteUrl(url.to_string()), &opts)
        .await
    {
        Ok(result) => {
            let text = serde_json::to_string_pretty(&result).unwrap_or_default();
            McpResponse::ok(
                id,
                json!({ "content": [{ "type": "text", "text": text }] }),
            )
        }
        Err(e) => McpResponse::err(id, McpError::new(MCP_INTERNAL_ERROR, e.to_string())),
    }
}
