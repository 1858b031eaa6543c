//! Per-agent JSON-RPC endpoints, driven without HTTP.

mod common;

use common::{app_state, heuristic_agents};
use serde_json::{Value, json};
use rmcp::model::{ErrorCode, RequestId};
use tictactoe_agents::{AgentRole, AppState, McpResponse, handle_rpc_raw};

async fn rpc(state: &AppState, role: AgentRole, body: Value) -> McpResponse {
    handle_rpc_raw(state, role, &body.to_string()).await
}

fn tool_payload(response: &McpResponse) -> Value {
    let result = response.result.as_ref().expect("tool result");
    assert_eq!(result["isError"], false, "{result}");
    assert_eq!(result["content"][0]["type"], "text");
    serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap()
}

fn error_code(response: &McpResponse) -> ErrorCode {
    response.error_code().expect("error response")
}

#[tokio::test]
async fn test_initialize_names_the_agent() {
    let state = app_state(heuristic_agents());
    let response = rpc(&state, AgentRole::Scout, json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"})).await;

    let result = response.result.unwrap();
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["serverInfo"]["name"], "tictactoe-scout");
    assert!(result["capabilities"]["tools"].is_object());
    assert!(result["capabilities"]["prompts"].is_object());
    assert_eq!(response.id, Some(RequestId::Number(1)));
}

#[tokio::test]
async fn test_tools_list_merges_standard_and_agent_tools() {
    let state = app_state(heuristic_agents());
    let response = rpc(&state, AgentRole::Executor, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;

    let result = response.result.unwrap();
    let names: Vec<_> = result["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    for expected in ["get_status", "get_metrics", "switch_model", "execute_move", "validate_move"] {
        assert!(names.iter().any(|n| n == expected), "missing {expected} in {names:?}");
    }
    assert!(result["tools"][0]["inputSchema"].is_object());
}

#[tokio::test]
async fn test_detect_threats_on_supplied_board() {
    let state = app_state(heuristic_agents());
    let response = rpc(
        &state,
        AgentRole::Scout,
        json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {
                "name": "detect_threats",
                "arguments": {
                    "board": [["X", "X", null], [null, "O", null], [null, null, null]],
                    "player": "O"
                }
            }
        }),
    )
    .await;

    let payload = tool_payload(&response);
    assert_eq!(payload["threats"], json!([{"row": 0, "col": 2}]));
    assert_eq!(payload["must_block"], true);

    let logged = state.log().entries().await;
    assert_eq!(logged.last().unwrap().message_type, "tools/call");
}

#[tokio::test]
async fn test_validate_move_uses_live_game() {
    let state = app_state(heuristic_agents());
    state.human_move(1, 1).await.unwrap();

    let response = rpc(
        &state,
        AgentRole::Executor,
        json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": { "name": "validate_move", "arguments": { "row": 1, "col": 1 } }
        }),
    )
    .await;

    let payload = tool_payload(&response);
    assert_eq!(payload["valid"], false);
    assert_eq!(payload["reason"], "square is already occupied");
}

#[tokio::test]
async fn test_status_tool_and_resources() {
    let state = app_state(heuristic_agents());

    let status = rpc(
        &state,
        AgentRole::Strategist,
        json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call", "params": {"name": "get_status"}}),
    )
    .await;
    assert_eq!(tool_payload(&status)["agent_id"], "strategist");

    let listed = rpc(&state, AgentRole::Strategist, json!({"jsonrpc": "2.0", "id": 6, "method": "resources/list"})).await;
    let uris: Vec<_> = listed.result.unwrap()["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["uri"].as_str().unwrap().to_string())
        .collect();
    assert!(uris.contains(&"strategist://metrics".to_string()));
    assert!(uris.contains(&"game://state".to_string()));

    let read = rpc(
        &state,
        AgentRole::Strategist,
        json!({"jsonrpc": "2.0", "id": 7, "method": "resources/read", "params": {"uri": "game://state"}}),
    )
    .await;
    let contents = &read.result.unwrap()["contents"][0];
    assert_eq!(contents["mimeType"], "application/json");
    let game: Value = serde_json::from_str(contents["text"].as_str().unwrap()).unwrap();
    assert_eq!(game["status"], "in_progress");

    // Another agent's resource is not served here.
    let foreign = rpc(
        &state,
        AgentRole::Strategist,
        json!({"jsonrpc": "2.0", "id": 8, "method": "resources/read", "params": {"uri": "scout://status"}}),
    )
    .await;
    assert_eq!(error_code(&foreign), ErrorCode::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn test_switch_model_failure_is_a_tool_error() {
    let state = app_state(heuristic_agents());
    let response = rpc(
        &state,
        AgentRole::Scout,
        json!({
            "jsonrpc": "2.0",
            "id": 9,
            "method": "tools/call",
            "params": {"name": "switch_model", "arguments": {"model": "gpt-4"}}
        }),
    )
    .await;

    let result = response.result.unwrap();
    assert_eq!(result["isError"], true);
    assert!(result["content"][0]["text"].as_str().unwrap().contains("OPENAI_API_KEY"));
}

#[tokio::test]
async fn test_prompts() {
    let state = app_state(heuristic_agents());

    let rendered = rpc(
        &state,
        AgentRole::Strategist,
        json!({
            "jsonrpc": "2.0",
            "id": 10,
            "method": "prompts/get",
            "params": {
                "name": "move_recommendation",
                "arguments": {"board": ". . .\n. X .\n. . .", "player": "O", "available_moves": "(0, 0)"}
            }
        }),
    )
    .await;
    let result = rendered.result.unwrap();
    assert_eq!(result["messages"][0]["role"], "user");
    let text = result["messages"][0]["content"]["text"].as_str().unwrap().to_string();
    assert!(text.contains(". X ."));

    let listed = rpc(&state, AgentRole::Strategist, json!({"jsonrpc": "2.0", "id": 12, "method": "prompts/list"})).await;
    let prompts = listed.result.unwrap()["prompts"].clone();
    let recommendation = prompts
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "move_recommendation")
        .unwrap()
        .clone();
    let board = recommendation["arguments"].as_array().unwrap().iter().find(|a| a["name"] == "board").unwrap();
    assert_eq!(board["required"], true);

    let missing = rpc(
        &state,
        AgentRole::Strategist,
        json!({
            "jsonrpc": "2.0",
            "id": 11,
            "method": "prompts/get",
            "params": {"name": "move_recommendation", "arguments": {"player": "O"}}
        }),
    )
    .await;
    assert_eq!(error_code(&missing), ErrorCode::INVALID_PARAMS);
}

#[tokio::test]
async fn test_error_codes() {
    let state = app_state(heuristic_agents());
    let role = AgentRole::Scout;

    let parse = handle_rpc_raw(&state, role, "{not json").await;
    assert_eq!(error_code(&parse), ErrorCode::PARSE_ERROR);
    assert_eq!(parse.id, None);

    let version = rpc(&state, role, json!({"jsonrpc": "1.0", "id": 1, "method": "ping"})).await;
    assert_eq!(error_code(&version), ErrorCode::INVALID_REQUEST);
    assert_eq!(version.id, Some(RequestId::Number(1)));

    let method = rpc(&state, role, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/run"})).await;
    assert_eq!(error_code(&method), ErrorCode::METHOD_NOT_FOUND);

    let tool = rpc(
        &state,
        role,
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "launch_missiles"}}),
    )
    .await;
    assert_eq!(error_code(&tool), ErrorCode::METHOD_NOT_FOUND);

    let args = rpc(
        &state,
        role,
        json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {"name": "detect_threats", "arguments": {"board": 42}}
        }),
    )
    .await;
    assert_eq!(error_code(&args), ErrorCode::INVALID_PARAMS);
}
