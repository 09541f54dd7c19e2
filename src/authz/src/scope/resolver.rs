//! Scope resolver over the immutable per-resource rule table

use std::collections::HashMap;
use tracing::debug;

use super::types::{RowFilter, ScopeRule};
use crate::error::{AuthzError, Result};
use crate::types::{Principal, ResourceType};

/// Resolves the row filter for a principal on a resource type
///
/// Only resources that declare scoped visibility carry a rule; every other
/// resource resolves to [`RowFilter::Unrestricted`]. The table is built once
/// and read concurrently without locking.
#[derive(Debug, Clone, Default)]
pub struct ScopeResolver {
    rules: HashMap<ResourceType, ScopeRule>,
}

impl ScopeResolver {
    pub fn builder() -> ScopeResolverBuilder {
        ScopeResolverBuilder::default()
    }

    /// Health records and diaries: staff see all rows, exercisers their own
    pub fn standard() -> Self {
        let mut rules = HashMap::new();
        rules.insert(ResourceType::HealthRecord, ScopeRule::staff_sees_all());
        rules.insert(ResourceType::HealthDiary, ScopeRule::staff_sees_all());
        Self { rules }
    }

    /// Resolve the row filter
    ///
    /// Unauthenticated principals on a scoped resource always get
    /// `OwnedOnly`, which admits no row.
    pub fn resolve(&self, principal: &Principal, resource: ResourceType) -> RowFilter {
        let Some(rule) = self.rules.get(&resource) else {
            return RowFilter::Unrestricted;
        };

        let filter = if principal.authenticated {
            rule.filter_for(principal.role)
        } else {
            RowFilter::OwnedOnly
        };

        debug!(
            "Scope for principal={} role={} on {}: {}",
            principal.id, principal.role, resource, filter
        );

        filter
    }

    /// Whether the resource declares scoped visibility
    pub fn is_scoped(&self, resource: ResourceType) -> bool {
        self.rules.contains_key(&resource)
    }

    pub fn rule(&self, resource: ResourceType) -> Option<&ScopeRule> {
        self.rules.get(&resource)
    }

    /// Scoped resource types, in declaration order
    pub fn scoped_resources(&self) -> Vec<ResourceType> {
        ResourceType::ALL
            .into_iter()
            .filter(|resource| self.rules.contains_key(resource))
            .collect()
    }
}

/// Builder rejecting duplicate declarations
#[derive(Debug, Default)]
pub struct ScopeResolverBuilder {
    rules: HashMap<ResourceType, ScopeRule>,
}

impl ScopeResolverBuilder {
    pub fn declare(&mut self, resource: ResourceType, rule: ScopeRule) -> Result<()> {
        if self.rules.contains_key(&resource) {
            return Err(AuthzError::MisconfiguredPolicy(format!(
                "duplicate scope rule for {}",
                resource
            )));
        }

        self.rules.insert(resource, rule);
        Ok(())
    }

    pub fn build(self) -> ScopeResolver {
        ScopeResolver { rules: self.rules }
    }
}
