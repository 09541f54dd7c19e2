//! Request authorizer
//!
//! Combines the action policy with the row scope resolver. Evaluation is
//! synchronous and pure: both tables are immutable after startup and every
//! input is request-local, so concurrent callers share one `Authorizer`
//! behind an `Arc` without locking.

pub mod decision;

pub use decision::{Decision, DenyReason, FailedCheck};

use crate::error::{AuthzError, Result};
use crate::policy::{PolicyTable, RuleKind};
use crate::predicate::Predicate;
use crate::scope::{RowFilter, ScopeResolver};
use crate::types::{Action, Owned, Principal, ResourceType};

use tracing::debug;

/// Orchestrates policy lookup, predicate evaluation and scope resolution
///
/// # Pipeline
///
/// ```text
/// (resource, action) → PolicyTable → predicates → ScopeResolver → Decision
///                         ↓ miss
///                    {authenticated}
/// ```
#[derive(Debug, Clone)]
pub struct Authorizer {
    policy: PolicyTable,
    scopes: ScopeResolver,
}

impl Authorizer {
    /// Pair a policy table with a scope table
    ///
    /// Public rules skip scope resolution, so a public action on a scoped
    /// resource is rejected as [`AuthzError::MisconfiguredPolicy`].
    pub fn new(policy: PolicyTable, scopes: ScopeResolver) -> Result<Self> {
        for (resource, action, rule) in policy.entries() {
            if rule.is_public() && scopes.is_scoped(resource) {
                return Err(AuthzError::MisconfiguredPolicy(format!(
                    "{}.{} is public but {} has scoped visibility",
                    resource, action, resource
                )));
            }
        }

        Ok(Self { policy, scopes })
    }

    /// Authorizer over the platform's built-in tables
    pub fn standard() -> Result<Self> {
        Self::new(PolicyTable::standard()?, ScopeResolver::standard())
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    pub fn scopes(&self) -> &ScopeResolver {
        &self.scopes
    }

    /// Decide whether `principal` may perform `action` on `resource`
    ///
    /// # Steps
    ///
    /// 1. Look up the rule, defaulting to `{authenticated}`
    /// 2. Public rules allow immediately with no row restriction
    /// 3. Evaluate predicates in order, stopping at the first failure;
    ///    object-level predicates without a target deny
    /// 4. Resolve the row filter; a supplied target must satisfy it
    pub fn authorize(
        &self,
        principal: &Principal,
        resource: ResourceType,
        action: &str,
        target: Option<&dyn Owned>,
    ) -> Decision {
        debug!(
            "Authorization request: principal={} role={} authenticated={}, resource={}, action={}",
            principal.id, principal.role, principal.authenticated, resource, action
        );

        let predicates = match self.policy.lookup(resource, action) {
            RuleKind::Public => {
                debug!("{}.{} is public", resource, action);
                return Decision::allow(RowFilter::Unrestricted);
            }
            RuleKind::Predicates(predicates) => predicates,
        };

        if let Some(reason) = first_failure(predicates, principal, target) {
            debug!("Denied {}.{}: {}", resource, action, reason);
            return Decision::deny(reason);
        }

        let row_filter = self.scopes.resolve(principal, resource);

        if let Some(target) = target {
            if !row_filter.permits(principal, target) {
                debug!("Denied {}.{}: target outside row scope", resource, action);
                return Decision::deny(DenyReason::Forbidden {
                    check: FailedCheck::RowScope,
                });
            }
        }

        Decision::allow(row_filter)
    }

    /// [`Authorizer::authorize`] taking an [`Action`]
    pub fn authorize_action(
        &self,
        principal: &Principal,
        resource: ResourceType,
        action: &Action,
        target: Option<&dyn Owned>,
    ) -> Decision {
        self.authorize(principal, resource, action.as_str(), target)
    }

    /// Row filter for listing `resource`, independent of any action rule
    pub fn resolve_scope(&self, principal: &Principal, resource: ResourceType) -> RowFilter {
        self.scopes.resolve(principal, resource)
    }
}

fn first_failure(
    predicates: &[Predicate],
    principal: &Principal,
    target: Option<&dyn Owned>,
) -> Option<DenyReason> {
    let failed = predicates
        .iter()
        .find(|predicate| !predicate.evaluate(principal, target))?;

    let check = FailedCheck::Predicate(*failed);
    let reason = if !principal.authenticated {
        DenyReason::Unauthenticated { check }
    } else if failed.is_object_level() && target.is_none() {
        DenyReason::MissingTarget { check }
    } else {
        DenyReason::Forbidden { check }
    };

    Some(reason)
}
