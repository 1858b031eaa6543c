//! Per-agent JSON-RPC endpoint: tools, resources and prompts.
//!
//! Uses MCP method names and `rmcp::model` payloads. It is not a full MCP
//! server: no sessions, no notifications, no streaming.

use super::protocol::{McpRequest, McpResponse, PROTOCOL_VERSION};
use crate::agents::{Agent, AgentRole, ToolError, schema_of};
use crate::state::AppState;
use rmcp::model::{
    AnnotateAble, CallToolRequestParams, CallToolResult, Content, ErrorCode, GetPromptRequestParams,
    GetPromptResult, Implementation, Prompt, PromptMessage, PromptMessageRole, RawResource,
    ReadResourceRequestParams, ReadResourceResult, RequestId, Resource, ResourceContents,
    ServerCapabilities, ServerInfo, Tool,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Arguments of the standard `get_status` and `get_metrics` tools.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoArgs {}

/// Arguments of the standard `switch_model` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SwitchModelArgs {
    /// Registry name of the model, e.g. `gpt-4o-mini`.
    pub model: String,
}

fn error_code(error: &ToolError) -> ErrorCode {
    match error {
        ToolError::NotFound { .. } => ErrorCode::METHOD_NOT_FOUND,
        ToolError::InvalidArguments { .. } => ErrorCode::INVALID_PARAMS,
        ToolError::Failed { .. } => ErrorCode::INTERNAL_ERROR,
    }
}

fn params<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ToolError> {
    serde_json::from_value(value).map_err(|e| ToolError::InvalidArguments { message: e.to_string() })
}

const JSON_MIME: &str = "application/json";

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::Failed { message: e.to_string() })
}

/// Tools every agent carries.
pub fn standard_tools() -> Vec<Tool> {
    vec![
        Tool::new(
            "get_status",
            "Agent id, model, availability and registry sizes",
            schema_of::<NoArgs>(),
        ),
        Tool::new(
            "get_metrics",
            "Request counts, latency, tokens and fallbacks",
            schema_of::<NoArgs>(),
        ),
        Tool::new(
            "switch_model",
            "Hot-swap the agent's model by registry name",
            schema_of::<SwitchModelArgs>(),
        ),
    ]
}

/// Standard plus agent-specific tools.
pub fn all_tools(agent: &dyn Agent) -> Vec<Tool> {
    let mut tools = standard_tools();
    tools.extend(agent.tools());
    tools
}

/// Prompt listing for `agent`.
pub fn prompts(agent: &dyn Agent) -> Vec<Prompt> {
    agent.prompts().iter().map(|p| p.to_prompt()).collect()
}

/// Resources exposed on `role`'s endpoint.
pub fn resources(role: AgentRole) -> Vec<Resource> {
    let entry = |uri: String, name: &str, description: &str| {
        let mut raw = RawResource::new(uri, name);
        raw.description = Some(description.to_string());
        raw.mime_type = Some(JSON_MIME.to_string());
        raw.no_annotation()
    };
    vec![
        entry(format!("{}://status", role.id()), "status", "Agent status"),
        entry(format!("{}://metrics", role.id()), "metrics", "Agent metrics"),
        entry("game://state".to_string(), "game state", "Board, turn and history"),
        entry("game://protocol-log".to_string(), "protocol log", "Recent agent interactions"),
    ]
}

/// `initialize` result for one agent endpoint.
pub fn server_info(role: AgentRole) -> ServerInfo {
    ServerInfo::new(
        ServerCapabilities::builder()
            .enable_tools()
            .enable_resources()
            .enable_prompts()
            .build(),
    )
    .with_protocol_version(PROTOCOL_VERSION)
    .with_server_info(
        Implementation::new(format!("tictactoe-{}", role.id()), env!("CARGO_PKG_VERSION"))
            .with_title(role.display_name())
            .with_description(role.description()),
    )
    .with_instructions(format!(
        "Tools, resources and prompts of the {} agent. Agent tools take an optional board; the live game is used otherwise.",
        role.display_name()
    ))
}

async fn status_value(state: &AppState, role: AgentRole, agent: &dyn Agent) -> Result<Value, ToolError> {
    let mut value = to_value(&agent.core().status().await)?;
    if let Value::Object(map) = &mut value {
        map.insert("role".into(), json!(role));
        map.insert("tools".into(), json!(all_tools(agent).len()));
        map.insert("resources".into(), json!(resources(role).len()));
        map.insert("prompts".into(), json!(agent.prompts().len()));
        map.insert("metrics_enabled".into(), json!(state.config().performance().enable_metrics()));
    }
    Ok(value)
}

/// Handles a raw request body.
///
/// Malformed JSON yields `-32700`; valid JSON that is not a 2.0 request
/// yields `-32600`.
#[instrument(skip(state, body), fields(agent = %role))]
pub async fn handle_raw(state: &AppState, role: AgentRole, body: &str) -> McpResponse {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Unparseable JSON-RPC body");
            return McpResponse::error(None, ErrorCode::PARSE_ERROR, format!("Parse error: {e}"));
        }
    };
    let id: Option<RequestId> = value.get("id").cloned().and_then(|id| serde_json::from_value(id).ok());
    let request: McpRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => return McpResponse::error(id, ErrorCode::INVALID_REQUEST, format!("Invalid request: {e}")),
    };
    if request.jsonrpc != "2.0" {
        return McpResponse::error(id, ErrorCode::INVALID_REQUEST, "jsonrpc must be \"2.0\"");
    }
    handle(state, role, request).await
}

/// Handles a parsed request.
#[instrument(skip(state, request), fields(agent = %role, method = %request.method))]
pub async fn handle(state: &AppState, role: AgentRole, request: McpRequest) -> McpResponse {
    let id = request.id.clone();
    match route(state, role, &request.method, request.params).await {
        Ok(result) => McpResponse::success(id, result),
        Err(error) => {
            debug!(%error, "Request failed");
            McpResponse::error(id, error_code(&error), error.to_string())
        }
    }
}

async fn route(state: &AppState, role: AgentRole, method: &str, params_value: Value) -> Result<Value, ToolError> {
    let agent: Arc<dyn Agent> = state.agents().get(role);
    let params_value = if params_value.is_null() { json!({}) } else { params_value };

    match method {
        "initialize" => to_value(&server_info(role)),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": all_tools(agent.as_ref()) })),
        "tools/call" => {
            let call: CallToolRequestParams = params(params_value)?;
            state
                .log()
                .record(role.id(), "tools/call", json!({ "tool": call.name }))
                .await;
            let arguments = call.arguments.map(Value::Object).unwrap_or(Value::Null);
            let result = call_tool(state, role, agent.as_ref(), &call.name, arguments).await?;
            to_value(&result)
        }
        "resources/list" => Ok(json!({ "resources": resources(role) })),
        "resources/read" => {
            let read: ReadResourceRequestParams = params(params_value)?;
            let body = read_resource(state, role, agent.as_ref(), &read.uri).await?;
            let text = serde_json::to_string_pretty(&body).map_err(|e| ToolError::Failed { message: e.to_string() })?;
            let mut contents = ResourceContents::text(text, read.uri);
            if let ResourceContents::TextResourceContents { mime_type, .. } = &mut contents {
                *mime_type = Some(JSON_MIME.to_string());
            }
            to_value(&ReadResourceResult::new(vec![contents]))
        }
        "prompts/list" => Ok(json!({ "prompts": prompts(agent.as_ref()) })),
        "prompts/get" => {
            let get: GetPromptRequestParams = params(params_value)?;
            let prompt = agent.prompt(&get.name).ok_or_else(|| ToolError::NotFound {
                kind: "prompt",
                name: get.name.to_string(),
            })?;
            let args: BTreeMap<String, String> = get
                .arguments
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| match v {
                    Value::String(s) => (k, s),
                    other => (k, other.to_string()),
                })
                .collect();
            let text = prompt.render(&args)?;
            to_value(
                &GetPromptResult::new(vec![PromptMessage::new_text(PromptMessageRole::User, text)])
                    .with_description(prompt.description.to_string()),
            )
        }
        other => Err(ToolError::NotFound {
            kind: "method",
            name: other.to_string(),
        }),
    }
}

async fn call_tool(
    state: &AppState,
    role: AgentRole,
    agent: &dyn Agent,
    name: &str,
    arguments: Value,
) -> Result<CallToolResult, ToolError> {
    let value = match name {
        "get_status" => status_value(state, role, agent).await?,
        "get_metrics" => to_value(&agent.core().metrics().await)?,
        "switch_model" => {
            let args: SwitchModelArgs = params(arguments)?;
            match state.switch_model(role, &args.model).await {
                Ok(switch) => to_value(&switch)?,
                Err(e) => return Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
            }
        }
        _ => {
            let board = state.session().board().await;
            agent.call_tool(name, arguments, &board).await?
        }
    };
    let text = serde_json::to_string_pretty(&value).map_err(|e| ToolError::Failed { message: e.to_string() })?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

async fn read_resource(state: &AppState, role: AgentRole, agent: &dyn Agent, uri: &str) -> Result<Value, ToolError> {
    let (scheme, path) = uri.split_once("://").ok_or_else(|| ToolError::InvalidArguments {
        message: format!("resource uri must look like scheme://name, got {uri:?}"),
    })?;
    match (scheme, path) {
        (s, "status") if s == role.id() => status_value(state, role, agent).await,
        (s, "metrics") if s == role.id() => to_value(&agent.core().metrics().await),
        ("game", "state") => to_value(&state.session().snapshot().await),
        ("game", "protocol-log") => to_value(&state.log().entries().await),
        _ => Err(ToolError::NotFound {
            kind: "resource",
            name: uri.to_string(),
        }),
    }
}

/// `GET /mcp/{agent}` body: what the endpoint offers.
pub async fn discovery(state: &AppState, role: AgentRole) -> Value {
    let agent = state.agents().get(role);
    json!({
        "agent": role.id(),
        "name": role.display_name(),
        "model": agent.core().model().await,
        "protocol": "jsonrpc-2.0",
        "protocolVersion": PROTOCOL_VERSION,
        "endpoint": format!("/mcp/{}", role.id()),
        "methods": [
            "initialize", "ping", "tools/list", "tools/call",
            "resources/list", "resources/read", "prompts/list", "prompts/get"
        ],
        "tools": all_tools(agent.as_ref()),
        "resources": resources(role),
        "prompts": prompts(agent.as_ref()),
    })
}
