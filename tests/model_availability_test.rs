//! Model lifecycle status against a live (stubbed) Ollama server.

mod common;

use common::{closed_port_url, ollama_stub};
use tictactoe_agents::{Credentials, LifecycleStatus, ModelRegistry, OllamaInventory};

#[tokio::test]
async fn test_inventory_from_tags_and_ps() {
    let base_url = ollama_stub(&["llama3.2:1b", "mistral:7b"], &["llama3.2:1b"]).await;
    let client = reqwest::Client::new();

    let inventory = OllamaInventory::fetch(&client, &base_url).await;

    assert!(inventory.is_reachable());
    assert_eq!(inventory.status("llama3.2:1b"), LifecycleStatus::Available);
    assert_eq!(inventory.status("mistral:7b"), LifecycleStatus::Downloaded);
    assert_eq!(inventory.status("llama3"), LifecycleStatus::NeedDownload);
}

#[tokio::test]
async fn test_registry_availability_with_stubbed_ollama() {
    let base_url = ollama_stub(&["llama3.2:1b", "mistral:7b"], &["llama3.2:1b"]).await;
    let credentials = Credentials::new(None, Some("sk-ant".to_string()), format!("{base_url}/"));

    let models = ModelRegistry::with_defaults()
        .check_availability(&reqwest::Client::new(), &credentials)
        .await;
    let find = |name: &str| models.iter().find(|m| m.entry.name() == name).unwrap();

    assert!(find("llama3.2-1b").available);
    assert_eq!(
        find("mistral-7b").unavailable_reason.as_deref(),
        Some("Start with: ollama run mistral:7b")
    );
    assert_eq!(
        find("llama3-latest").unavailable_reason.as_deref(),
        Some("Download with: ollama pull llama3:latest")
    );
    assert!(find("claude-3-5-haiku").available);
    assert!(!find("gpt-4").available);
}

#[tokio::test]
async fn test_registry_availability_with_ollama_down() {
    let base_url = closed_port_url();
    let credentials = Credentials::new(Some("sk-test".to_string()), None, base_url.clone());

    let models = ModelRegistry::with_defaults()
        .check_availability(&reqwest::Client::new(), &credentials)
        .await;

    let local: Vec<_> = models.iter().filter(|m| !m.requires_api_key).collect();
    assert_eq!(local.len(), 3);
    for model in local {
        assert!(!model.available);
        assert_eq!(model.lifecycle_status, LifecycleStatus::Unavailable);
        assert_eq!(
            model.unavailable_reason.as_deref(),
            Some(format!("Ollama is not accessible at {base_url}").as_str())
        );
    }
    assert!(models.iter().any(|m| m.entry.name() == "gpt-4o-mini" && m.available));
}
