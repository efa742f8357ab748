//! Agent routing spec data model
//!
//! Specs are immutable values. Construction goes through
//! [`AgentRoutingSpecBuilder::build`] or [`AgentRoutingSpec::validate`], which
//! enforce the invariants in one place: non-blank name and version and at least
//! one address.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Candidate set of agents; ordered by name so iteration is deterministic
pub type AgentSpecSet = BTreeSet<AgentRoutingSpec>;

/// A routable agent and what it can do
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentRoutingSpec {
    /// Unique key within a candidate set
    pub name: String,
    pub description: String,
    pub version: String,
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
    pub addresses: BTreeSet<Address>,
}

/// A declared capability of an agent
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub version: String,
}

/// How to reach an agent once it is chosen
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address {
    #[serde(default = "default_protocol")]
    pub protocol: String,
    pub uri: String,
}

fn default_protocol() -> String {
    "http".to_string()
}

impl Address {
    /// Address using the default `http` protocol
    pub fn new<S: Into<String>>(uri: S) -> Self {
        Self {
            protocol: default_protocol(),
            uri: uri.into(),
        }
    }

    pub fn with_protocol<P: Into<String>, S: Into<String>>(protocol: P, uri: S) -> Self {
        Self {
            protocol: protocol.into(),
            uri: uri.into(),
        }
    }
}

impl Capability {
    pub fn new<N, D, V>(name: N, description: D, version: V) -> Self
    where
        N: Into<String>,
        D: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            description: description.into(),
            version: version.into(),
        }
    }
}

/// Invariant violations when building or loading a spec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecValidationError {
    #[error("name cannot be blank")]
    BlankName,
    #[error("version cannot be blank (agent '{0}')")]
    BlankVersion(String),
    #[error("address cannot be empty (agent '{0}')")]
    NoAddresses(String),
}

impl AgentRoutingSpec {
    pub fn builder() -> AgentRoutingSpecBuilder {
        AgentRoutingSpecBuilder::default()
    }

    /// Check the construction invariants
    pub fn validate(&self) -> Result<(), SpecValidationError> {
        if self.name.trim().is_empty() {
            return Err(SpecValidationError::BlankName);
        }
        if self.version.trim().is_empty() {
            return Err(SpecValidationError::BlankVersion(self.name.clone()));
        }
        if self.addresses.is_empty() {
            return Err(SpecValidationError::NoAddresses(self.name.clone()));
        }
        Ok(())
    }
}

/// Fluent builder for [`Capability`]
#[derive(Debug, Clone, Default)]
pub struct CapabilityBuilder {
    name: String,
    description: String,
    version: String,
}

impl CapabilityBuilder {
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = version.into();
        self
    }

    pub fn build(self) -> Capability {
        Capability {
            name: self.name,
            description: self.description,
            version: self.version,
        }
    }
}

/// Fluent builder for [`AgentRoutingSpec`] that fails fast on invalid input
#[derive(Debug, Clone, Default)]
pub struct AgentRoutingSpecBuilder {
    name: String,
    description: String,
    version: String,
    capabilities: BTreeSet<Capability>,
    addresses: BTreeSet<Address>,
}

impl AgentRoutingSpecBuilder {
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = version.into();
        self
    }

    pub fn address(mut self, address: Address) -> Self {
        self.addresses.insert(address);
        self
    }

    pub fn add_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn build(self) -> Result<AgentRoutingSpec, SpecValidationError> {
        let spec = AgentRoutingSpec {
            name: self.name,
            description: self.description,
            version: self.version,
            capabilities: self.capabilities,
            addresses: self.addresses,
        };
        spec.validate()?;
        Ok(spec)
    }
}
