//! Agent spec providers
//!
//! Providers own the full candidate set and hand out filtered copies of it.
//! [`JsonAgentRoutingSpecsProvider`] loads a registry file once at construction;
//! [`SimpleAgentRoutingSpecsProvider`] is an in-memory registry that can grow at
//! runtime.

use crate::registry::filter::{apply_filters, FilterError, SpecFilter};
use crate::registry::model::{AgentRoutingSpec, AgentSpecSet, SpecValidationError};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use tracing::{debug, info};

/// Registry load and filter failures
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Failed to read agent registry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse agent registry {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid agent spec in registry: {0}")]
    InvalidSpec(#[from] SpecValidationError),

    #[error("Failed to provide agent specs: {0}")]
    Filter(#[from] FilterError),
}

/// Supplies the candidate agent set to resolvers
pub trait AgentRoutingSpecsProvider: Send + Sync {
    /// Full candidate set narrowed by `filters`, folded in order
    fn provide(&self, filters: &[Box<dyn SpecFilter>]) -> Result<AgentSpecSet, ProviderError>;

    /// Full, unfiltered candidate set
    fn provide_all(&self) -> Result<AgentSpecSet, ProviderError> {
        self.provide(&[])
    }
}

/// Provider backed by a JSON registry file
///
/// The file is a JSON array of
/// `{name, description, version, capabilities: [...], addresses: [...]}` objects.
#[derive(Debug, Clone)]
pub struct JsonAgentRoutingSpecsProvider {
    specs: AgentSpecSet,
}

impl JsonAgentRoutingSpecsProvider {
    /// Load and validate the registry at `path`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ProviderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let provider = Self::parse(&json, path.display().to_string())?;
        info!(
            path = %path.display(),
            agents = provider.specs.len(),
            "Loaded agent registry"
        );
        Ok(provider)
    }

    /// Parse and validate an in-memory registry document
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        Self::parse(json, "<inline>".to_string())
    }

    fn parse(json: &str, origin: String) -> Result<Self, ProviderError> {
        let specs: Vec<AgentRoutingSpec> =
            serde_json::from_str(json).map_err(|source| ProviderError::Parse { origin, source })?;

        for spec in &specs {
            spec.validate()?;
        }

        Ok(Self {
            specs: specs.into_iter().collect(),
        })
    }
}

impl AgentRoutingSpecsProvider for JsonAgentRoutingSpecsProvider {
    fn provide(&self, filters: &[Box<dyn SpecFilter>]) -> Result<AgentSpecSet, ProviderError> {
        debug!(filters = filters.len(), "Providing agent specs from registry file");
        Ok(apply_filters(self.specs.clone(), filters)?)
    }
}

/// In-memory provider for programmatic registries
#[derive(Debug, Default)]
pub struct SimpleAgentRoutingSpecsProvider {
    specs: RwLock<AgentSpecSet>,
}

impl SimpleAgentRoutingSpecsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_specs(specs: impl IntoIterator<Item = AgentRoutingSpec>) -> Self {
        Self {
            specs: RwLock::new(specs.into_iter().collect()),
        }
    }

    /// Register another agent; an identical spec is stored once
    pub fn add(&self, spec: AgentRoutingSpec) -> &Self {
        self.specs
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(spec);
        self
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn snapshot(&self) -> AgentSpecSet {
        self.specs
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl AgentRoutingSpecsProvider for SimpleAgentRoutingSpecsProvider {
    fn provide(&self, filters: &[Box<dyn SpecFilter>]) -> Result<AgentSpecSet, ProviderError> {
        Ok(apply_filters(self.snapshot(), filters)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::filter::{NameSpecFilter, VersionSpecFilter};
    use crate::registry::model::Address;
    use std::io::Write;

    const REGISTRY: &str = r#"[
        {
            "name": "offer-agent",
            "description": "Finds offers for new phones",
            "version": "1.0.0",
            "capabilities": [
                {"name": "offers", "description": "List phone offers", "version": "1.0.0"}
            ],
            "addresses": [{"protocol": "http", "uri": "http://offer-agent"}]
        },
        {
            "name": "order-agent",
            "description": "Tracks order status",
            "version": "2.0.0",
            "capabilities": [],
            "addresses": [{"uri": "http://order-agent"}]
        }
    ]"#;

    struct ExplodingFilter;

    impl SpecFilter for ExplodingFilter {
        fn filter(&self, _specs: AgentSpecSet) -> Result<AgentSpecSet, FilterError> {
            Err(FilterError::new("lookup table unavailable"))
        }
    }

    #[test]
    fn test_json_provider_returns_all_specs() {
        let provider = JsonAgentRoutingSpecsProvider::from_json(REGISTRY).unwrap();
        assert_eq!(provider.provide_all().unwrap().len(), 2);
    }

    #[test]
    fn test_json_provider_applies_name_filter() {
        let provider = JsonAgentRoutingSpecsProvider::from_json(REGISTRY).unwrap();
        let filters: Vec<Box<dyn SpecFilter>> = vec![Box::new(NameSpecFilter::new("order-agent"))];

        let specs = provider.provide(&filters).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs.iter().next().unwrap().name, "order-agent");
    }

    #[test]
    fn test_json_provider_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(REGISTRY.as_bytes()).unwrap();

        let provider = JsonAgentRoutingSpecsProvider::from_file(file.path()).unwrap();
        let specs = provider.provide_all().unwrap();
        let order = specs.iter().find(|s| s.name == "order-agent").unwrap();
        assert_eq!(order.addresses.iter().next().unwrap().protocol, "http");
    }

    #[test]
    fn test_missing_file_is_provider_failure() {
        let error = JsonAgentRoutingSpecsProvider::from_file("/definitely/not/here.json")
            .unwrap_err();
        assert!(matches!(error, ProviderError::Io { .. }));
    }

    #[test]
    fn test_missing_required_field_is_provider_failure() {
        let error = JsonAgentRoutingSpecsProvider::from_json(
            r#"[{"name": "a", "description": "d", "addresses": [{"uri": "x"}]}]"#,
        )
        .unwrap_err();
        assert!(matches!(error, ProviderError::Parse { .. }));
    }

    #[test]
    fn test_invalid_spec_in_file_is_rejected() {
        let error = JsonAgentRoutingSpecsProvider::from_json(
            r#"[{"name": "a", "description": "d", "version": "1", "addresses": []}]"#,
        )
        .unwrap_err();
        assert!(matches!(
            error,
            ProviderError::InvalidSpec(SpecValidationError::NoAddresses(_))
        ));
    }

    #[test]
    fn test_failing_filter_becomes_provider_error() {
        let provider = JsonAgentRoutingSpecsProvider::from_json(REGISTRY).unwrap();
        let filters: Vec<Box<dyn SpecFilter>> = vec![Box::new(ExplodingFilter)];

        let error = provider.provide(&filters).unwrap_err();
        assert!(matches!(error, ProviderError::Filter(_)));
        assert!(error.to_string().contains("lookup table unavailable"));
    }

    #[test]
    fn test_simple_provider_add_and_filter() {
        let provider = SimpleAgentRoutingSpecsProvider::new();
        for (name, version) in [("agent1", "1.0.0"), ("agent2", "2.0.0")] {
            provider.add(
                AgentRoutingSpec::builder()
                    .name(name)
                    .version(version)
                    .address(Address::new(format!("http://{name}")))
                    .build()
                    .unwrap(),
            );
        }

        assert_eq!(provider.len(), 2);
        let filters: Vec<Box<dyn SpecFilter>> = vec![Box::new(VersionSpecFilter::new("2.0.0"))];
        let specs = provider.provide(&filters).unwrap();
        assert_eq!(specs.iter().next().unwrap().name, "agent2");
    }

    #[test]
    fn test_registry_round_trip_is_lossless() {
        let provider = JsonAgentRoutingSpecsProvider::from_json(REGISTRY).unwrap();
        let specs = provider.provide_all().unwrap();

        let json = serde_json::to_string(&specs).unwrap();
        let reloaded = JsonAgentRoutingSpecsProvider::from_json(&json)
            .unwrap()
            .provide_all()
            .unwrap();

        assert_eq!(reloaded, specs);
    }
}
