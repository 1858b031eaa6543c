//! One-shot JSON-RPC client for poking at an agent endpoint.

use crate::agents::AgentRole;
use crate::mcp::{McpRequest, McpResponse};
use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Value, json};
use tracing::{debug, instrument};

/// Sends JSON-RPC requests to `/mcp/{agent}`.
#[derive(Debug, Clone)]
pub struct QueryClient {
    base_url: String,
    client: reqwest::Client,
}

impl QueryClient {
    /// Client for the backend at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Posts one request.
    #[instrument(skip(self, params))]
    pub async fn call(&self, agent: AgentRole, method: &str, params: Value) -> Result<McpResponse> {
        let url = format!("{}/mcp/{}", self.base_url, agent.id());
        let request = McpRequest::new(method, params);
        debug!(%url, "Sending JSON-RPC request");
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?;
        if !response.status().is_success() {
            bail!("{} returned HTTP {}", url, response.status());
        }
        Ok(response.json().await?)
    }

    /// The `result` of a request, or its error as `Err`.
    pub async fn result(&self, agent: AgentRole, method: &str, params: Value) -> Result<Value> {
        let response = self.call(agent, method, params).await?;
        match (response.result, response.error) {
            (_, Some(error)) => Err(anyhow!("JSON-RPC error {}: {}", error.code.0, error.message)),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }

    /// Names of the agent's tools, resources and prompts.
    pub async fn summary(&self, agent: AgentRole) -> Result<Value> {
        let names = |value: Value, list: &str, key: &str| -> Vec<Value> {
            value[list]
                .as_array()
                .map(|items| items.iter().map(|item| item[key].clone()).collect())
                .unwrap_or_default()
        };
        let tools = self.result(agent, "tools/list", json!({})).await?;
        let resources = self.result(agent, "resources/list", json!({})).await?;
        let prompts = self.result(agent, "prompts/list", json!({})).await?;
        Ok(json!({
            "agent": agent.id(),
            "tools": names(tools, "tools", "name"),
            "resources": names(resources, "resources", "uri"),
            "prompts": names(prompts, "prompts", "name"),
        }))
    }
}

/// Parses `--params`; absent means `{}`.
pub fn parse_params(raw: Option<&str>) -> Result<Value> {
    match raw {
        None => Ok(json!({})),
        Some(raw) => {
            let value: Value = serde_json::from_str(raw).context("--params must be valid JSON")?;
            if !value.is_object() {
                bail!("--params must be a JSON object");
            }
            Ok(value)
        }
    }
}

/// Runs the `query` command and prints the outcome.
pub async fn run_query(server_url: &str, agent: &str, method: &str, params: Option<&str>) -> Result<()> {
    let role = AgentRole::from_id(agent).ok_or_else(|| anyhow!("unknown agent {agent:?}; expected scout, strategist or executor"))?;
    let client = QueryClient::new(server_url);

    let output = if method == "summary" {
        client.summary(role).await?
    } else {
        serde_json::to_value(client.call(role, method, parse_params(params)?).await?)?
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_params() {
        assert_eq!(parse_params(None).unwrap(), json!({}));
        assert_eq!(
            parse_params(Some(r#"{"name": "detect_threats"}"#)).unwrap()["name"],
            "detect_threats"
        );
        assert!(parse_params(Some("[1, 2]")).is_err());
        assert!(parse_params(Some("{oops")).is_err());
    }
}
