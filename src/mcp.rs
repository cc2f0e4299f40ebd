use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::error::{HistoryError, Result};
use crate::search::SearchEngine;

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const TOOL_FAILED: i32 = -32002;

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i32,
    message: String,
}

impl RpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError { code, message }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamArgs {
    team_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectArgs {
    query: Option<String>,
}

pub async fn run_stdio(engine: Arc<SearchEngine>) -> Result<()> {
    info!(root = %engine.paths().root.display(), "serving on stdio");
    serve(
        &engine,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}

/// Newline-delimited JSON-RPC loop. Ends when `input` closes.
pub async fn serve<R, W>(engine: &SearchEngine, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.map_err(stdio_error)? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(resp) = handle_message(engine, &line).await {
            let mut out = serde_json::to_vec(&resp)?;
            out.push(b'\n');
            output.write_all(&out).await.map_err(stdio_error)?;
            output.flush().await.map_err(stdio_error)?;
        }
    }
    Ok(())
}

/// Handle one raw message. Notifications produce no response.
pub async fn handle_message(engine: &SearchEngine, line: &str) -> Option<Value> {
    let req: RpcRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            let resp = RpcResponse::err(Value::Null, PARSE_ERROR, format!("parse error: {e}"));
            return serde_json::to_value(resp).ok();
        }
    };
    if req.id.is_null() && req.method.starts_with("notifications/") {
        debug!(method = %req.method, "notification");
        return None;
    }

    let resp = match req.method.as_str() {
        "initialize" => RpcResponse::ok(
            req.id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }),
        ),
        "ping" => RpcResponse::ok(req.id, json!({})),
        "tools/list" => RpcResponse::ok(req.id, json!({ "tools": tool_definitions() })),
        "tools/call" => handle_call(engine, req.id, req.params).await,
        other => RpcResponse::err(
            req.id,
            METHOD_NOT_FOUND,
            format!("method not found: {other}"),
        ),
    };
    serde_json::to_value(resp).ok()
}

async fn handle_call(engine: &SearchEngine, id: Value, params: Value) -> RpcResponse {
    let call: CallParams = match serde_json::from_value(params) {
        Ok(c) => c,
        Err(e) => return RpcResponse::err(id, INVALID_PARAMS, format!("invalid params: {e}")),
    };
    if !TOOL_NAMES.contains(&call.name.as_str()) {
        return RpcResponse::err(id, METHOD_NOT_FOUND, format!("unknown tool: {}", call.name));
    }
    debug!(tool = %call.name, "tools/call");

    match call_tool(engine, &call.name, call.arguments).await {
        Ok(value) => {
            let text = serde_json::to_string_pretty(&value).unwrap_or_default();
            RpcResponse::ok(id, json!({ "content": [{ "type": "text", "text": text }] }))
        }
        Err(e @ HistoryError::InvalidRequest(_)) => {
            RpcResponse::err(id, INVALID_PARAMS, e.to_string())
        }
        Err(e) => RpcResponse::err(id, TOOL_FAILED, e.to_string()),
    }
}

/// Invoke one engine operation by tool name and return its result as JSON.
pub async fn call_tool(engine: &SearchEngine, name: &str, args: Value) -> Result<Value> {
    let value = match name {
        "search_history" => serde_json::to_value(engine.search_history(&args_as(args)?).await?)?,
        "search_plans" => serde_json::to_value(engine.search_plans(&args_as(args)?).await?)?,
        "search_todos" => serde_json::to_value(engine.search_todos(&args_as(args)?).await?)?,
        "search_tasks" => serde_json::to_value(engine.search_tasks(&args_as(args)?).await?)?,
        "list_teams" => {
            let a: TeamArgs = args_as(args)?;
            serde_json::to_value(engine.list_teams(a.team_name.as_deref()).await?)?
        }
        "search_debug_logs" => {
            serde_json::to_value(engine.search_debug_logs(&args_as(args)?).await?)?
        }
        "get_activity_stats" => {
            serde_json::to_value(engine.activity_stats(&args_as(args)?).await?)?
        }
        "list_projects" => {
            let a: ProjectArgs = args_as(args)?;
            serde_json::to_value(engine.list_projects(a.query.as_deref()).await?)?
        }
        "get_project_sessions" => {
            serde_json::to_value(engine.project_sessions(&args_as(args)?).await?)?
        }
        "get_settings" => serde_json::to_value(engine.settings().await?)?,
        "search_all" => serde_json::to_value(engine.search_all(&args_as(args)?).await?)?,
        other => return Err(HistoryError::InvalidRequest(format!("unknown tool: {other}"))),
    };
    Ok(value)
}

fn args_as<T: DeserializeOwned>(args: Value) -> Result<T> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args)
        .map_err(|e| HistoryError::InvalidRequest(format!("invalid arguments: {e}")))
}

fn stdio_error(source: std::io::Error) -> HistoryError {
    HistoryError::Io {
        path: PathBuf::from("<stdio>"),
        source,
    }
}

pub const TOOL_NAMES: [&str; 11] = [
    "search_history",
    "search_plans",
    "search_todos",
    "search_tasks",
    "list_teams",
    "search_debug_logs",
    "get_activity_stats",
    "list_projects",
    "get_project_sessions",
    "get_settings",
    "search_all",
];

fn tool_definitions() -> Vec<Value> {
    let string = json!({ "type": "string" });
    let integer = |default: u64| json!({ "type": "integer", "minimum": 0, "default": default });

    vec![
        json!({
            "name": "search_history",
            "description": "Search conversation history, newest first.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": string, "project": string,
                    "startDate": string, "endDate": string,
                    "limit": integer(50), "offset": integer(0)
                }
            }
        }),
        json!({
            "name": "search_plans",
            "description": "Search plan documents by content or filename.",
            "inputSchema": {
                "type": "object",
                "properties": { "query": string, "limit": integer(20) }
            }
        }),
        json!({
            "name": "search_todos",
            "description": "Search todo items across all todo files.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": string,
                    "status": { "type": "string", "enum": ["pending", "in_progress", "completed"] },
                    "limit": integer(50), "offset": integer(0)
                }
            }
        }),
        json!({
            "name": "search_tasks",
            "description": "Search team tasks.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": string, "status": string, "teamName": string,
                    "limit": integer(50)
                }
            }
        }),
        json!({
            "name": "list_teams",
            "description": "List team configurations.",
            "inputSchema": {
                "type": "object",
                "properties": { "teamName": string }
            }
        }),
        json!({
            "name": "search_debug_logs",
            "description": "Search or tail debug logs. Without a session id the latest log is used.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "sessionId": string, "query": string,
                    "tailLines": { "type": "integer", "minimum": 0 },
                    "limit": integer(100)
                }
            }
        }),
        json!({
            "name": "get_activity_stats",
            "description": "Daily activity and token usage between two dates (YYYY-MM-DD).",
            "inputSchema": {
                "type": "object",
                "properties": { "startDate": string, "endDate": string }
            }
        }),
        json!({
            "name": "list_projects",
            "description": "List projects with session counts.",
            "inputSchema": {
                "type": "object",
                "properties": { "query": string }
            }
        }),
        json!({
            "name": "get_project_sessions",
            "description": "Sessions of one project, most recently modified first.",
            "inputSchema": {
                "type": "object",
                "required": ["project"],
                "properties": { "project": string, "limit": integer(20) }
            }
        }),
        json!({
            "name": "get_settings",
            "description": "Current settings.",
            "inputSchema": { "type": "object", "properties": {} }
        }),
        json!({
            "name": "search_all",
            "description": "Search every source at once.",
            "inputSchema": {
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": string,
                    "sources": {
                        "type": "array",
                        "items": {
                            "type": "string",
                            "enum": ["history", "plans", "todos", "tasks", "debug", "projects"]
                        }
                    },
                    "limit": integer(30)
                }
            }
        }),
    ]
}
