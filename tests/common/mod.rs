//! Scripted model backends and state builders shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tictactoe_agents::{
    AgentCore, AgentRole, AgentSet, AppConfig, AppState, Completion, CompletionBackend,
    Credentials, Executor, LlmError, ModelRegistry, Scout, Strategist,
};

/// Replies from a queue; fails once the queue is empty.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn replying<'a>(replies: impl IntoIterator<Item = &'a str>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, _system_prompt: &str, _user_message: &str) -> Result<Completion, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(reply) => Ok(Completion::new(reply, 12)),
            None => Err(LlmError::new("scripted backend exhausted".to_string())),
        }
    }
}

/// Never answers within any reasonable timeout.
#[derive(Debug, Default)]
pub struct StalledBackend;

#[async_trait]
impl CompletionBackend for StalledBackend {
    async fn complete(&self, _system_prompt: &str, _user_message: &str) -> Result<Completion, LlmError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Completion::new("too late".to_string(), 1))
    }
}

pub type Backend = Option<Arc<dyn CompletionBackend>>;

pub fn backend(b: Arc<impl CompletionBackend + 'static>) -> Backend {
    Some(b as Arc<dyn CompletionBackend>)
}

pub fn core(role: AgentRole, backend: Backend) -> AgentCore {
    AgentCore::new(role, "scripted-model", backend, Duration::from_millis(200))
}

/// Agents backed by the given backends; `None` runs that agent on heuristics.
pub fn agents(scout: Backend, strategist: Backend, executor: Backend) -> AgentSet {
    AgentSet::new(
        Scout::new(core(AgentRole::Scout, scout)),
        Strategist::new(core(AgentRole::Strategist, strategist)),
        Executor::new(core(AgentRole::Executor, executor)),
    )
}

/// Agents with no model at all.
pub fn heuristic_agents() -> AgentSet {
    agents(None, None, None)
}

/// Credentials pointing at an Ollama address nothing listens on.
pub fn credentials() -> Credentials {
    Credentials::new(None, None, closed_port_url())
}

/// A loopback URL whose port was just released.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

/// Serves canned `/api/tags` and `/api/ps` bodies; returns the base URL.
pub async fn ollama_stub(installed: &[&str], running: &[&str]) -> String {
    use axum::{Json, Router, routing::get};
    use serde_json::json;

    let list = |names: &[&str]| {
        let models: Vec<_> = names.iter().map(|n| json!({ "name": n, "model": n })).collect();
        json!({ "models": models })
    };
    let tags = list(installed);
    let ps = list(running);
    let app = Router::new()
        .route("/api/tags", get(move || async move { Json(tags) }))
        .route("/api/ps", get(move || async move { Json(ps) }));

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

pub fn app_state(agents: AgentSet) -> Arc<AppState> {
    Arc::new(AppState::new(
        AppConfig::default(),
        credentials(),
        ModelRegistry::with_defaults(),
        agents,
    ))
}
