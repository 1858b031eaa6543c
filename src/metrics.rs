//! Per-agent request metrics.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

/// How many individual request records an agent keeps.
pub const RECENT_REQUESTS: usize = 20;

/// One LLM call as seen by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Model that served (or failed) the call.
    pub model: String,
    /// Wall-clock latency.
    pub latency_ms: u64,
    /// Tokens used; zero on failure.
    pub tokens: u64,
    /// Whether the call produced a completion.
    pub success: bool,
    /// When the call finished.
    pub at: DateTime<Utc>,
}

/// Counters and averages for one agent. Monotonic until [`AgentMetrics::reset`].
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct AgentMetrics {
    /// Agent id.
    agent_id: String,
    /// Model new records are attributed to.
    current_model: String,
    /// LLM calls attempted.
    request_count: u64,
    /// Calls that errored or timed out.
    failure_count: u64,
    /// Decisions where a heuristic replaced the LLM answer.
    fallback_count: u64,
    /// Mean latency over all calls.
    avg_response_time_ms: f64,
    /// Fastest call.
    min_response_time_ms: Option<u64>,
    /// Slowest call.
    max_response_time_ms: Option<u64>,
    /// Estimated tokens across all calls.
    total_tokens: u64,
    /// Calls per model name.
    requests_by_model: BTreeMap<String, u64>,
    /// Times the model was switched.
    model_switches: u64,
    /// Time of the last call.
    last_request_at: Option<DateTime<Utc>>,
    /// Most recent calls, oldest first.
    recent_requests: VecDeque<RequestRecord>,
}

impl AgentMetrics {
    /// Fresh metrics for `agent_id` running `model`.
    pub fn new(agent_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            current_model: model.into(),
            request_count: 0,
            failure_count: 0,
            fallback_count: 0,
            avg_response_time_ms: 0.0,
            min_response_time_ms: None,
            max_response_time_ms: None,
            total_tokens: 0,
            requests_by_model: BTreeMap::new(),
            model_switches: 0,
            last_request_at: None,
            recent_requests: VecDeque::new(),
        }
    }

    /// Records a completed call.
    pub fn record_success(&mut self, latency: Duration, tokens: u64) {
        self.record(latency, tokens, true);
    }

    /// Records a failed or timed-out call.
    pub fn record_failure(&mut self, latency: Duration) {
        self.failure_count += 1;
        self.record(latency, 0, false);
    }

    /// Records that a heuristic answer replaced the model's.
    pub fn record_fallback(&mut self) {
        self.fallback_count += 1;
    }

    fn record(&mut self, latency: Duration, tokens: u64, success: bool) {
        let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        let previous = self.request_count as f64;
        self.request_count += 1;
        self.avg_response_time_ms =
            (self.avg_response_time_ms * previous + latency_ms as f64) / self.request_count as f64;
        self.min_response_time_ms = Some(self.min_response_time_ms.map_or(latency_ms, |m| m.min(latency_ms)));
        self.max_response_time_ms = Some(self.max_response_time_ms.map_or(latency_ms, |m| m.max(latency_ms)));
        self.total_tokens += tokens;
        *self.requests_by_model.entry(self.current_model.clone()).or_default() += 1;

        let at = Utc::now();
        self.last_request_at = Some(at);
        if self.recent_requests.len() == RECENT_REQUESTS {
            self.recent_requests.pop_front();
        }
        self.recent_requests.push_back(RequestRecord {
            model: self.current_model.clone(),
            latency_ms,
            tokens,
            success,
            at,
        });
    }

    /// Attributes subsequent records to `model`. Counters are kept.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.current_model = model.into();
        self.model_switches += 1;
    }

    /// Zeroes every counter; the agent id and current model survive.
    pub fn reset(&mut self) {
        *self = Self::new(self.agent_id.clone(), self.current_model.clone());
    }
}
