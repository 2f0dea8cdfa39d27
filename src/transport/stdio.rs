//! MCP over stdio: one JSON-RPC message per line in, one per line out.

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use super::codec::{decode_line, encode_line, RpcError, RpcResponse, METHOD_NOT_FOUND};
use crate::dispatch::Dispatcher;
use crate::tools::ToolArgs;
use crate::types::{Error, Result};

pub const SERVER_NAME: &str = "healthcare-mcp";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Serve requests from `reader` until EOF, writing replies to `writer`.
pub async fn serve<R, W>(dispatcher: Arc<Dispatcher>, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    tracing::info!(session = %dispatcher.session_id(), "stdio_server_started");
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(response) = handle_line(&dispatcher, &line).await {
            writer.write_all(encode_line(&response)?.as_bytes()).await?;
            writer.flush().await?;
        }
    }

    tracing::info!("stdio_server_stopped");
    Ok(())
}

/// Handle one raw line. Notifications produce no reply.
pub async fn handle_line(dispatcher: &Dispatcher, line: &str) -> Option<RpcResponse> {
    let request = match decode_line(line) {
        Ok(request) => request,
        Err(response) => {
            tracing::warn!(error = ?response.error, "stdio_bad_message");
            return Some(response);
        }
    };
    tracing::debug!(method = %request.method, "stdio_request");

    if request.is_notification() {
        if let Err(error) = handle_method(dispatcher, &request.method, request.params).await {
            tracing::debug!(method = %request.method, error = ?error, "stdio_notification_ignored");
        }
        return None;
    }

    let result = handle_method(dispatcher, &request.method, request.params).await;
    let id = request.id?;
    Some(match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(error) => RpcResponse::failure(id, error),
    })
}

async fn handle_method(
    dispatcher: &Dispatcher,
    method: &str,
    params: Option<Value>,
) -> std::result::Result<Value, RpcError> {
    match method {
        "initialize" => {
            let requested = params
                .as_ref()
                .and_then(|p| p.get("protocolVersion"))
                .and_then(Value::as_str)
                .unwrap_or(PROTOCOL_VERSION);
            Ok(json!({
                "protocolVersion": requested,
                "capabilities": {"tools": {}},
                "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")},
            }))
        }
        "notifications/initialized" | "notifications/cancelled" => Ok(Value::Null),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({"tools": dispatcher.list_tools()})),
        "tools/call" => call_tool(dispatcher, params).await,
        other => Err(RpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
        )),
    }
}

async fn call_tool(
    dispatcher: &Dispatcher,
    params: Option<Value>,
) -> std::result::Result<Value, RpcError> {
    let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| Error::validation(format!("invalid tools/call params: {e}")))?;
    let args = match params.arguments {
        Some(Value::Object(map)) => map,
        _ => ToolArgs::new(),
    };

    let outcome = dispatcher.call_tool(&params.name, &args).await;
    let mut result = json!({
        "content": [{"type": "text", "text": outcome.envelope.to_pretty_json()}],
    });
    if outcome.is_error {
        result["isError"] = Value::Bool(true);
    }
    Ok(result)
}
