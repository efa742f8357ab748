//! Configuration loading from TOML files and the environment

use agent_router::config::{ConfigError, EmbeddingProvider, RouterConfig, RoutingStrategy};
use agent_router::llm::AgentRoutingSpecListType;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_minimal_llm_config() {
    let file = write_config(
        r#"
[registry]
path = "agents.json"

[llm]
provider = "ollama"
model = "llama3"
"#,
    );

    let config = RouterConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.routing.strategy, RoutingStrategy::Llm);

    let llm = config.llm.as_ref().unwrap();
    assert_eq!(llm.max_tokens, 2000);
    assert_eq!(llm.temperature, 0.0);
    assert_eq!(llm.agents_list, AgentRoutingSpecListType::Xml);
    assert!(config.embedding.is_none());

    let properties = config.model_client_properties().unwrap();
    assert_eq!(properties.provider, "ollama");
    assert!(properties.api_key.is_none());
}

#[test]
fn test_load_vector_config_with_defaults() {
    let file = write_config(
        r#"
[registry]
path = "agents.json"

[routing]
strategy = "vector"

[embedding]

[vector]
seed_file = "seed.json"
"#,
    );

    let config = RouterConfig::load_from_file(file.path()).unwrap();
    let embedding = config.embedding.unwrap();
    assert_eq!(embedding.provider, EmbeddingProvider::Ollama);
    assert_eq!(embedding.batch_size, 300);
    assert_eq!(config.vector.unwrap().limit, 5);
}

#[test]
fn test_hybrid_requires_llm_and_vector_sections() {
    let file = write_config(
        r#"
[registry]
path = "agents.json"

[routing]
strategy = "hybrid"

[llm]
provider = "ollama"
model = "llama3"
"#,
    );

    let error = RouterConfig::load_from_file(file.path()).unwrap_err();
    assert!(matches!(error, ConfigError::InvalidConfig(ref message) if message.contains("[embedding]")));
}

#[test]
fn test_api_key_resolved_from_environment() {
    let file = write_config(
        r#"
[registry]
path = "agents.json"

[llm]
provider = "openai"
model = "gpt-4o-mini"
api_key_env = "AGENT_ROUTER_TEST_OPENAI_KEY"
"#,
    );
    let config = RouterConfig::load_from_file(file.path()).unwrap();

    std::env::remove_var("AGENT_ROUTER_TEST_OPENAI_KEY");
    assert!(matches!(
        config.model_client_properties(),
        Err(ConfigError::EnvVarNotFound(ref name)) if name == "AGENT_ROUTER_TEST_OPENAI_KEY"
    ));

    std::env::set_var("AGENT_ROUTER_TEST_OPENAI_KEY", "sk-test");
    let properties = config.model_client_properties().unwrap();
    assert_eq!(properties.api_key.as_deref(), Some("sk-test"));
    std::env::remove_var("AGENT_ROUTER_TEST_OPENAI_KEY");
}

#[test]
fn test_missing_file_and_bad_toml() {
    let missing = RouterConfig::load_from_file(std::path::Path::new("/nonexistent/router.toml"));
    assert!(matches!(missing, Err(ConfigError::FileRead(_))));

    let file = write_config("[registry\npath = ");
    assert!(matches!(
        RouterConfig::load_from_file(file.path()),
        Err(ConfigError::TomlParse(_))
    ));
}

#[test]
fn test_unknown_strategy_is_rejected() {
    let result = RouterConfig::from_toml_str(
        r#"
[registry]
path = "agents.json"

[routing]
strategy = "random"
"#,
    );
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}
