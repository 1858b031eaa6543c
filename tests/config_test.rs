//! Config files, environment overrides and credentials.

use std::io::Write;
use tempfile::NamedTempFile;
use tictactoe_agents::{AgentRole, AppConfig, Credentials, DEFAULT_OLLAMA_URL};

fn file_with(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
    move |key| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
}

#[test]
fn test_defaults() {
    let config = AppConfig::default();
    assert_eq!(config.api().port(), &8000);
    assert_eq!(config.models().default_model(), "gpt-4o-mini");
    assert_eq!(config.models().for_role(AgentRole::Executor), "gpt-4o-mini");
    assert_eq!(config.performance().mcp_coordination_timeout(), &15);
    assert!(*config.performance().enable_metrics());
}

#[test]
fn test_json_file_with_partial_sections() {
    let file = file_with(
        ".json",
        r#"{
            "api": {"port": 9100},
            "models": {"default": "llama3.2-1b", "strategist": "claude-3-5-haiku"},
            "unknown_section": {"ignored": true}
        }"#,
    );

    let config = AppConfig::from_file(file.path()).unwrap();

    assert_eq!(config.api().host(), "0.0.0.0");
    assert_eq!(config.api().port(), &9100);
    assert_eq!(config.models().for_role(AgentRole::Scout), "llama3.2-1b");
    assert_eq!(config.models().for_role(AgentRole::Strategist), "claude-3-5-haiku");
    assert_eq!(config.models().fallback().len(), 2);
}

#[test]
fn test_toml_file() {
    let file = file_with(
        ".toml",
        r#"
[performance]
agent_execution_timeout = 3
enable_metrics = false

[dashboard]
server_url = "http://backend:8000"
"#,
    );

    let config = AppConfig::from_file(file.path()).unwrap();

    assert_eq!(config.performance().agent_execution_timeout(), &3);
    assert!(!*config.performance().enable_metrics());
    assert_eq!(config.dashboard().server_url(), "http://backend:8000");
    assert_eq!(config.dashboard().poll_interval_ms(), &500);
}

#[test]
fn test_bad_files_are_errors() {
    let broken = file_with(".json", "{ not json");
    let err = AppConfig::from_file(broken.path()).unwrap_err();
    assert!(err.message.contains("Failed to parse config"));

    let dir = tempfile::tempdir().unwrap();
    let err = AppConfig::load(Some(dir.path().join("missing.json").as_path())).unwrap_err();
    assert!(err.message.contains("Failed to read config file"));
}

#[test]
fn test_env_overrides() {
    let mut config = AppConfig::default();
    config
        .apply_env_overrides(env(&[("HOST", "127.0.0.1"), ("PORT", " 8080 ")]))
        .unwrap();
    assert_eq!(config.api().host(), "127.0.0.1");
    assert_eq!(config.api().port(), &8080);

    // Blank HOST keeps the file value.
    config.apply_env_overrides(env(&[("HOST", "  ")])).unwrap();
    assert_eq!(config.api().host(), "127.0.0.1");
}

#[test]
fn test_invalid_port_is_rejected() {
    let mut config = AppConfig::default();
    let err = config.apply_env_overrides(env(&[("PORT", "eighty")])).unwrap_err();
    assert!(err.message.contains("Invalid PORT"));
    assert_eq!(config.api().port(), &8000);
}

#[test]
fn test_credentials_ignore_blank_values() {
    let creds = Credentials::from_lookup(env(&[("OPENAI_API_KEY", "sk-test"), ("ANTHROPIC_API_KEY", "")]));
    assert_eq!(creds.openai_api_key().as_deref(), Some("sk-test"));
    assert_eq!(creds.anthropic_api_key(), &None);
    assert_eq!(creds.ollama_base_url(), DEFAULT_OLLAMA_URL);

    let local = Credentials::from_lookup(env(&[("OLLAMA_BASE_URL", "http://gpu-box:11434")]));
    assert_eq!(local.ollama_base_url(), "http://gpu-box:11434");
}
