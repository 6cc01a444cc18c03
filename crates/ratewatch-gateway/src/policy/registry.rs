use std::sync::Arc;

use dashmap::DashMap;

use ratewatch_core::error::{RateWatchError, Result};

use super::NamedPolicy;

/// Registry of named policies, keyed by name.
/// Construct once at startup, then share via Arc.
#[derive(Default)]
pub struct PolicyRegistry {
    policies: DashMap<String, Arc<dyn NamedPolicy>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self {
            policies: DashMap::new(),
        }
    }

    /// Fails with `BadRequest` for names that cannot appear in a URL path
    /// segment or an SSE `id` field.
    pub fn register(&self, policy: Arc<dyn NamedPolicy>) -> Result<()> {
        check_name(policy.name())?;
        let name = policy.name().to_string();
        if self.policies.insert(name.clone(), policy).is_some() {
            tracing::warn!(policy = %name, "policy registered twice; previous instance replaced");
        }
        Ok(())
    }

    pub fn find(&self, name: &str) -> Result<Arc<dyn NamedPolicy>> {
        self.policies
            .get(name)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| RateWatchError::NotFound(name.to_string()))
    }

    pub fn all(&self) -> Vec<Arc<dyn NamedPolicy>> {
        self.policies.iter().map(|e| Arc::clone(e.value())).collect()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.policies.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

/// Policy names are non-empty, contain no `/`, and no control characters.
pub fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(|c| c == '/' || c.is_control()) {
        return Err(RateWatchError::BadRequest(format!(
            "invalid rate limiter name: {name:?}"
        )));
    }
    Ok(())
}
