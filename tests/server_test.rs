//! HTTP routes exercised in-process.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{ScriptedBackend, agents, app_state, backend, heuristic_agents};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tictactoe_agents::router;
use tower::ServiceExt;

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health_reports_agent_models() {
    let app = router(app_state(heuristic_agents()));
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["agents"]["scout"], "scripted-model");
}

#[tokio::test]
async fn test_human_then_ai_blocks() {
    let app = router(app_state(heuristic_agents()));

    let (status, _) = send(&app, "POST", "/game/move", Some(json!({"row": 0, "col": 0}))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, first) = send(&app, "POST", "/game/ai-move", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["decision"]["cell"], json!({"row": 1, "col": 1}));

    send(&app, "POST", "/game/move", Some(json!({"row": 0, "col": 1}))).await;
    let (status, block) = send(&app, "POST", "/game/ai-move", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(block["decision"]["cell"], json!({"row": 0, "col": 2}));
    assert_eq!(block["decision"]["path"], "immediate_block");
    assert_eq!(block["game"]["board"][0][2], "O");
    assert_eq!(block["game"]["move_count"], 4);
}

#[tokio::test]
async fn test_move_errors_map_to_status_codes() {
    let app = router(app_state(heuristic_agents()));

    let (status, body) = send(&app, "POST", "/game/move", Some(json!({"row": 3, "col": 0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("out of bounds"));

    // The AI cannot move first.
    let (status, _) = send(&app, "POST", "/game/ai-move", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    send(&app, "POST", "/game/move", Some(json!({"row": 1, "col": 1}))).await;
    let (status, _) = send(&app, "POST", "/game/move", Some(json!({"row": 0, "col": 0}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    send(&app, "POST", "/game/ai-move", None).await;
    let (status, body) = send(&app, "POST", "/game/move", Some(json!({"row": 1, "col": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Square (1, 1) is already occupied");

    let (_, state) = send(&app, "GET", "/game/state", None).await;
    assert_eq!(state["move_count"], 2);
}

#[tokio::test]
async fn test_malformed_move_bodies_get_json_errors() {
    let app = router(app_state(heuristic_agents()));

    for body in [json!({"row": -1, "col": 0}), json!({"row": "top", "col": 0}), json!({"col": 1})] {
        let (status, error) = send(&app, "POST", "/game/move", Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(error["code"], "BAD_REQUEST");
        assert!(!error["error"].as_str().unwrap().is_empty());
    }

    let (status, error) = send(&app, "POST", "/agents/scout/model", Some(json!({"name": "gpt-4"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "BAD_REQUEST");

    let (_, state) = send(&app, "GET", "/game/state", None).await;
    assert_eq!(state["move_count"], 0);
}

#[tokio::test]
async fn test_reset_clears_game_and_log() {
    let app = router(app_state(heuristic_agents()));
    send(&app, "POST", "/game/move", Some(json!({"row": 0, "col": 0}))).await;
    send(&app, "POST", "/game/ai-move", None).await;

    let (_, logs) = send(&app, "GET", "/mcp/logs", None).await;
    assert!(logs["count"].as_u64().unwrap() > 0);

    let (status, body) = send(&app, "POST", "/game/new", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["game"]["move_count"], 0);
    assert_eq!(body["game"]["current_player"], "X");
    assert!(body["game"]["history"].as_array().unwrap().is_empty());

    let (_, logs) = send(&app, "GET", "/mcp-logs", None).await;
    assert_eq!(logs["count"], 0);
}

#[tokio::test]
async fn test_game_over_rejects_ai_move() {
    let app = router(app_state(heuristic_agents()));
    // Heuristic O answers (1,1), blocks (0,2), then completes the anti-diagonal at (2,0).
    for (row, col) in [(0, 0), (0, 1), (1, 0)] {
        send(&app, "POST", "/game/move", Some(json!({"row": row, "col": col}))).await;
        let (status, _) = send(&app, "POST", "/game/ai-move", None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, state) = send(&app, "GET", "/game/state", None).await;
    assert_eq!(state["status"], "won");
    assert_eq!(state["winner"], "O");

    let (status, _) = send(&app, "POST", "/game/ai-move", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_agent_routes() {
    let scout = ScriptedBackend::replying(["Quiet board."]);
    let app = router(app_state(agents(backend(scout), None, None)));

    let (status, body) = send(&app, "GET", "/agents/status", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = body["agents"].as_array().unwrap().iter().map(|a| a["agent_id"].clone()).collect();
    assert_eq!(ids, vec![json!("scout"), json!("strategist"), json!("executor")]);

    send(&app, "POST", "/game/move", Some(json!({"row": 2, "col": 2}))).await;
    send(&app, "POST", "/game/ai-move", None).await;
    let (status, metrics) = send(&app, "GET", "/agents/scout/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["request_count"], 1);

    let (status, _) = send(&app, "POST", "/agents/scout/metrics/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, metrics) = send(&app, "GET", "/agents/scout/metrics", None).await;
    assert_eq!(metrics["request_count"], 0);

    let (status, _) = send(&app, "GET", "/agents/overmind/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_model_routes() {
    let app = router(app_state(heuristic_agents()));

    let (status, body) = send(&app, "GET", "/models", None).await;
    assert_eq!(status, StatusCode::OK);
    let models = body["models"].as_array().unwrap();
    let llama = models.iter().find(|m| m["name"] == "llama3.2-1b").unwrap();
    assert_eq!(llama["available"], false);
    assert_eq!(llama["requires_api_key"], false);
    assert_eq!(llama["lifecycle_status"], "unavailable");
    assert!(llama["unavailable_reason"].as_str().unwrap().starts_with("Ollama is not accessible"));
    let gpt = models.iter().find(|m| m["name"] == "gpt-4o-mini").unwrap();
    assert_eq!(gpt["available"], false);
    assert_eq!(gpt["requires_api_key"], true);

    let (status, body) = send(&app, "POST", "/agents/executor/model", Some(json!({"model": "mistral-7b"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_model"], "mistral-7b");

    let (status, _) = send(&app, "POST", "/agents/executor/model", Some(json!({"model": "nope"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "POST", "/agents/executor/model", Some(json!({"model": "claude-3-sonnet"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mcp_routes() {
    let app = router(app_state(heuristic_agents()));

    let (status, discovery) = send(&app, "GET", "/mcp/strategist", None).await;
    assert_eq!(status, StatusCode::OK);
    let tools: Vec<_> = discovery["tools"].as_array().unwrap().iter().map(|t| t["name"].clone()).collect();
    assert!(tools.contains(&json!("recommend_move")));
    assert!(tools.contains(&json!("switch_model")));

    let (status, body) = send(
        &app,
        "POST",
        "/mcp/scout",
        Some(json!({"jsonrpc": "2.0", "id": 3, "method": "ping"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 3);
    assert_eq!(body["result"], json!({}));

    let (status, _) = send(&app, "POST", "/mcp/overmind", Some(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_serves_on_a_hostname() {
    let listener = tictactoe_agents::bind("localhost", 0).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(tictactoe_agents::serve_on(listener, app_state(heuristic_agents()), async {
        let _ = stopped.await;
    }));

    let body: Value = reqwest::get(format!("http://{addr}/health")).await.unwrap().json().await.unwrap();
    assert_eq!(body["status"], "healthy");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}
