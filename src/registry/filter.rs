//! Candidate set filters
//!
//! A [`SpecFilter`] maps a candidate set to a (usually smaller) candidate set.
//! Several filters fold left-to-right with [`apply_filters`].

use crate::registry::model::{AgentRoutingSpec, AgentSpecSet};
use thiserror::Error;

/// Raised by a filter that cannot evaluate its input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FilterError {
    pub message: String,
}

impl FilterError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Narrows a candidate set of agent specs
pub trait SpecFilter: Send + Sync {
    fn filter(&self, specs: AgentSpecSet) -> Result<AgentSpecSet, FilterError>;
}

/// Keeps specs whose predicate holds; the building block for field filters
fn retain(specs: AgentSpecSet, keep: impl Fn(&AgentRoutingSpec) -> bool) -> AgentSpecSet {
    specs.into_iter().filter(|spec| keep(spec)).collect()
}

/// Keeps the spec with exactly this name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameSpecFilter {
    value: String,
}

impl NameSpecFilter {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl SpecFilter for NameSpecFilter {
    fn filter(&self, specs: AgentSpecSet) -> Result<AgentSpecSet, FilterError> {
        Ok(retain(specs, |spec| spec.name == self.value))
    }
}

/// Keeps specs with exactly this version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpecFilter {
    value: String,
}

impl VersionSpecFilter {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl SpecFilter for VersionSpecFilter {
    fn filter(&self, specs: AgentSpecSet) -> Result<AgentSpecSet, FilterError> {
        Ok(retain(specs, |spec| spec.version == self.value))
    }
}

/// Fold `filters` over `specs` in order, stopping at the first failure
pub fn apply_filters(
    specs: AgentSpecSet,
    filters: &[Box<dyn SpecFilter>],
) -> Result<AgentSpecSet, FilterError> {
    filters
        .iter()
        .try_fold(specs, |acc, spec_filter| spec_filter.filter(acc))
}
