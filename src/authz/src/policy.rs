//! Action permission policy
//!
//! Static `(resource, action) → rule` table. Built and validated once at
//! startup, then shared read-only by every request. Any pair that is not
//! declared falls back to the default rule `{authenticated}`.

use crate::error::{AuthzError, Result};
use crate::predicate::Predicate;
use crate::types::{actions, ResourceType};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// What a declared action requires
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "predicates", rename_all = "snake_case")]
pub enum RuleKind {
    /// No checks, no principal required
    Public,
    /// Every predicate must pass, in order
    Predicates(Vec<Predicate>),
}

impl RuleKind {
    /// Predicate list for a non-public rule
    pub fn require(predicates: &[Predicate]) -> Self {
        RuleKind::Predicates(predicates.to_vec())
    }

    /// Rule applied to every undeclared action
    pub fn default_rule() -> Self {
        RuleKind::Predicates(vec![Predicate::IsAuthenticated])
    }

    pub fn is_public(&self) -> bool {
        matches!(self, RuleKind::Public)
    }

    fn validate(&self, resource: ResourceType, action: &str) -> Result<()> {
        match self {
            RuleKind::Predicates(predicates) if predicates.is_empty() => {
                Err(AuthzError::MisconfiguredPolicy(format!(
                    "rule for {}.{} has no predicates and is not marked public",
                    resource, action
                )))
            }
            RuleKind::Predicates(predicates)
                if !predicates.contains(&Predicate::IsAuthenticated) =>
            {
                Err(AuthzError::MisconfiguredPolicy(format!(
                    "rule for {}.{} does not require authentication",
                    resource, action
                )))
            }
            RuleKind::Predicates(predicates) => {
                for predicate in predicates {
                    if let Predicate::HasRole(roles) = predicate {
                        if roles.is_empty() {
                            return Err(AuthzError::MisconfiguredPolicy(format!(
                                "rule for {}.{} requires an empty role set",
                                resource, action
                            )));
                        }
                    }
                }
                Ok(())
            }
            RuleKind::Public => Ok(()),
        }
    }
}

/// Immutable policy table
#[derive(Debug, Clone)]
pub struct PolicyTable {
    rules: HashMap<ResourceType, HashMap<String, RuleKind>>,
    default_rule: RuleKind,
}

impl PolicyTable {
    pub fn builder() -> PolicyTableBuilder {
        PolicyTableBuilder::new()
    }

    /// The platform's declared rules
    pub fn standard() -> Result<Self> {
        use actions::*;

        let authenticated = [Predicate::IsAuthenticated];
        let staff = [Predicate::IsAuthenticated, Predicate::ADMIN_OR_COACH];
        let owner = [Predicate::IsAuthenticated, Predicate::IsOwner];

        let mut builder = Self::builder();

        builder.public(ResourceType::User, &[CREATE])?;
        builder.require(
            ResourceType::User,
            &[CHANGE_PASSWORD, UPDATE_INFO, GET_CURRENT_USER],
            &owner,
        )?;
        builder.require(ResourceType::User, &[GET_ALL_USERS], &authenticated)?;

        builder.public(ResourceType::Activity, &[LIST, RETRIEVE])?;
        builder.require(ResourceType::Activity, &WRITES, &staff)?;
        builder.require(ResourceType::Activity, &[WEEKLY_STATISTICS], &authenticated)?;

        builder.require(
            ResourceType::WorkoutPlan,
            &[CREATE_PLAN, MY_PLANS, WEEKLY_SUMMARY],
            &authenticated,
        )?;
        builder.require(ResourceType::WorkoutPlan, &[PLANS_BY_USER], &staff)?;

        builder.require(
            ResourceType::MealPlan,
            &[CREATE_MEAL_PLAN, MEALPLANS_BY_GOAL],
            &authenticated,
        )?;

        // Visibility of these reads is narrowed by the scope table.
        builder.require(ResourceType::HealthRecord, &[LIST, RETRIEVE], &authenticated)?;
        builder.require(
            ResourceType::HealthDiary,
            &[LIST, RETRIEVE, MY_DIARIES],
            &authenticated,
        )?;
        builder.require(ResourceType::HealthDiary, &WRITES, &owner)?;

        builder.require(ResourceType::ChatMessage, &[SEND_MESSAGE], &authenticated)?;

        builder.build()
    }

    /// Rule for `(resource, action)`, falling back to the default rule
    pub fn lookup(&self, resource: ResourceType, action: &str) -> &RuleKind {
        match self.declared(resource, action) {
            Some(rule) => rule,
            None => {
                debug!("No rule declared for {}.{}, applying default", resource, action);
                &self.default_rule
            }
        }
    }

    /// Rule for `(resource, action)` only if explicitly declared
    pub fn declared(&self, resource: ResourceType, action: &str) -> Option<&RuleKind> {
        self.rules.get(&resource).and_then(|actions| actions.get(action))
    }

    pub fn default_rule(&self) -> &RuleKind {
        &self.default_rule
    }

    /// Number of declared `(resource, action)` pairs
    pub fn len(&self) -> usize {
        self.rules.values().map(|actions| actions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Declared entries, sorted by resource then action
    pub fn entries(&self) -> Vec<(ResourceType, &str, &RuleKind)> {
        let mut entries: Vec<_> = self
            .rules
            .iter()
            .flat_map(|(resource, actions)| {
                actions
                    .iter()
                    .map(move |(action, rule)| (*resource, action.as_str(), rule))
            })
            .collect();
        entries.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()).then(a.1.cmp(b.1)));
        entries
    }
}

/// Builder that validates every declaration
#[derive(Debug, Default)]
pub struct PolicyTableBuilder {
    rules: HashMap<ResourceType, HashMap<String, RuleKind>>,
}

impl PolicyTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a single rule
    ///
    /// Fails on empty predicate lists, empty role sets and duplicate
    /// declarations of the same pair.
    pub fn declare(
        &mut self,
        resource: ResourceType,
        action: impl Into<String>,
        rule: RuleKind,
    ) -> Result<()> {
        let action = action.into();
        if action.is_empty() {
            return Err(AuthzError::MisconfiguredPolicy(format!(
                "empty action name declared for {}",
                resource
            )));
        }

        rule.validate(resource, &action)?;

        let actions = self.rules.entry(resource).or_default();
        if actions.contains_key(&action) {
            return Err(AuthzError::MisconfiguredPolicy(format!(
                "duplicate rule for {}.{}",
                resource, action
            )));
        }

        actions.insert(action, rule);
        Ok(())
    }

    /// Declare actions as public
    pub fn public(&mut self, resource: ResourceType, actions: &[&str]) -> Result<()> {
        for action in actions {
            self.declare(resource, *action, RuleKind::Public)?;
        }
        Ok(())
    }

    /// Declare actions requiring all `predicates`
    pub fn require(
        &mut self,
        resource: ResourceType,
        actions: &[&str],
        predicates: &[Predicate],
    ) -> Result<()> {
        for action in actions {
            self.declare(resource, *action, RuleKind::require(predicates))?;
        }
        Ok(())
    }

    pub fn build(self) -> Result<PolicyTable> {
        Ok(PolicyTable {
            rules: self.rules,
            default_rule: RuleKind::default_rule(),
        })
    }
}
