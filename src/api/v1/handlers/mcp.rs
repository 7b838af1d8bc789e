/*
 * Responsibility
 * - POST /mcp: MCP JSON-RPC over HTTP (initialize, ping, tools/list, tools/call)
 * - Protocol faults are JSON-RPC errors in a 200; authorization, exchange and
 *   downstream failures are HTTP error responses (AppError)
 *
 * Notes
 * - Runs behind the access middleware, so Auth and Exchange are always present
 */
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::api::v1::dto::mcp::{
    CallToolParams, Implementation, InitializeResult, JSONRPC_VERSION, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, PROTOCOL_VERSION, RequestId,
    ServerCapabilities, ToolsCapability, error_codes,
};
use crate::api::v1::extractors::{Auth, AuthContext, Exchange};
use crate::error::AppError;
use crate::services::exchange::BoundExchange;
use crate::state::AppState;
use crate::tools::ToolContext;

pub async fn mcp(
    State(state): State<AppState>,
    Auth(auth): Auth,
    Exchange(exchange): Exchange,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            return Ok(rpc_error(
                None,
                JsonRpcError::new(error_codes::PARSE_ERROR, format!("Parse error: {}", err)),
            ));
        }
    };

    if request.jsonrpc != JSONRPC_VERSION {
        return Ok(rpc_error(
            request.id,
            JsonRpcError::new(error_codes::INVALID_REQUEST, "jsonrpc must be \"2.0\""),
        ));
    }

    let Some(id) = request.id.clone() else {
        tracing::debug!(method = %request.method, "notification");
        return Ok(StatusCode::ACCEPTED.into_response());
    };

    let result = match request.method.as_str() {
        "initialize" => to_value(initialize(request.params.as_ref()))?,
        "ping" => json!({}),
        "tools/list" => to_value(ListToolsResult {
            tools: state.tools.visible_to(&auth),
        })?,
        "tools/call" => match call_tool(&state, &auth, &exchange, request.params).await? {
            Ok(value) => value,
            Err(err) => return Ok(rpc_error(Some(id), err)),
        },
        other => return Ok(rpc_error(Some(id), JsonRpcError::method_not_found(other))),
    };

    Ok(Json(JsonRpcResponse::result(Some(id), result)).into_response())
}

fn initialize(params: Option<&Value>) -> InitializeResult {
    let requested = params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str);

    InitializeResult {
        protocol_version: requested.unwrap_or(PROTOCOL_VERSION).to_string(),
        capabilities: ServerCapabilities {
            tools: ToolsCapability {
                list_changed: false,
            },
        },
        server_info: Implementation {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        },
    }
}

/// Outer `Err` becomes an HTTP error, inner `Err` a JSON-RPC error.
async fn call_tool(
    state: &AppState,
    auth: &AuthContext,
    exchange: &BoundExchange,
    params: Option<Value>,
) -> Result<Result<Value, JsonRpcError>, AppError> {
    let params: CallToolParams = match params.map(serde_json::from_value) {
        Some(Ok(params)) => params,
        Some(Err(err)) => return Ok(Err(JsonRpcError::invalid_params(err.to_string()))),
        None => return Ok(Err(JsonRpcError::invalid_params("missing params"))),
    };

    let Some(tool) = state.tools.get(&params.name) else {
        return Ok(Err(JsonRpcError::invalid_params(format!(
            "Unknown tool: {}",
            params.name
        ))));
    };

    let ctx = ToolContext {
        auth,
        exchange,
        vault: state.vault.as_ref(),
        downstream: &state.downstream,
    };

    let arguments = params.arguments.unwrap_or(Value::Null);
    match state.tools.call(tool.as_ref(), &ctx, arguments).await {
        Ok(result) => Ok(Ok(to_value(result)?)),
        Err(AppError::BadRequest(message)) => Ok(Err(JsonRpcError::invalid_params(message))),
        Err(err) => {
            tracing::info!(tool = %params.name, error = %err, "tool call failed");
            Err(err)
        }
    }
}

fn rpc_error(id: Option<RequestId>, error: JsonRpcError) -> Response {
    Json(JsonRpcResponse::error(id, error)).into_response()
}

fn to_value<T: Serialize>(value: T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|err| {
        tracing::error!(error = %err, "failed to serialize MCP result");
        AppError::Internal
    })
}
