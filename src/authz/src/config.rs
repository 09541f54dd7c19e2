//! Runtime configuration
//!
//! Server settings come from the environment; the policy and scope tables
//! come from the built-in declarations or from a JSON policy document. Any
//! malformed declaration is fatal so the process never starts with a
//! silently permissive table.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::engine::Authorizer;
use crate::error::{AuthzError, Result};
use crate::policy::{PolicyTable, RuleKind};
use crate::predicate::Predicate;
use crate::scope::{ScopeResolver, ScopeRule};
use crate::types::{ResourceType, Role, RoleSet};

/// Declarative policy document
///
/// ```json
/// {
///   "rules": [
///     {"resource": "Activity", "action": "list", "public": true},
///     {"resource": "User", "action": "changePassword", "predicates": ["authenticated", "owner"]}
///   ],
///   "scopes": [
///     {"resource": "HealthRecord", "unrestricted_roles": ["Admin", "Coach"]}
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyDocument {
    #[serde(default)]
    pub rules: Vec<RuleEntry>,

    #[serde(default)]
    pub scopes: Vec<ScopeEntry>,
}

/// One `(resource, action)` declaration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleEntry {
    pub resource: String,
    pub action: String,

    /// Marks the action public; must not be combined with predicates
    #[serde(default)]
    pub public: bool,

    #[serde(default)]
    pub predicates: Vec<String>,
}

/// Scoped visibility declaration for one resource
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeEntry {
    pub resource: String,
    pub unrestricted_roles: Vec<String>,
}

impl PolicyDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    /// Validate and compile into an [`Authorizer`]
    pub fn compile(&self) -> Result<Authorizer> {
        let mut policy = PolicyTable::builder();
        for entry in &self.rules {
            let resource: ResourceType = entry.resource.parse()?;
            policy.declare(resource, entry.action.clone(), entry.rule_kind()?)?;
        }

        let mut scopes = ScopeResolver::builder();
        for entry in &self.scopes {
            let resource: ResourceType = entry.resource.parse()?;
            let roles = entry
                .unrestricted_roles
                .iter()
                .map(|name| name.parse::<Role>())
                .collect::<Result<Vec<_>>>()?;
            scopes.declare(resource, ScopeRule::new(RoleSet::of(&roles)))?;
        }

        for resource in self.unscoped_resources()? {
            warn!(
                "Policy document declares rules for {} without a scope entry; all rows will be visible",
                resource
            );
        }

        Authorizer::new(policy.build()?, scopes.build())
    }

    /// Resources the built-in scope table restricts that this document
    /// declares rules for but leaves without a scope entry
    pub fn unscoped_resources(&self) -> Result<Vec<ResourceType>> {
        let builtin = ScopeResolver::standard();

        let mut scoped = Vec::with_capacity(self.scopes.len());
        for entry in &self.scopes {
            scoped.push(entry.resource.parse::<ResourceType>()?);
        }

        let mut unscoped = Vec::new();
        for entry in &self.rules {
            let resource: ResourceType = entry.resource.parse()?;
            if builtin.is_scoped(resource)
                && !scoped.contains(&resource)
                && !unscoped.contains(&resource)
            {
                unscoped.push(resource);
            }
        }

        Ok(unscoped)
    }
}

impl RuleEntry {
    fn rule_kind(&self) -> Result<RuleKind> {
        if self.public {
            if !self.predicates.is_empty() {
                return Err(AuthzError::MisconfiguredPolicy(format!(
                    "rule for {}.{} is public but also lists predicates",
                    self.resource, self.action
                )));
            }
            return Ok(RuleKind::Public);
        }

        let predicates = self
            .predicates
            .iter()
            .map(|name| name.parse::<Predicate>())
            .collect::<Result<Vec<_>>>()?;

        // Empty lists are rejected when the rule is declared.
        Ok(RuleKind::Predicates(predicates))
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// HTTP port for the decision API
    pub port: u16,

    /// Port serving `/metrics`
    pub metrics_port: u16,

    /// Optional policy document replacing the built-in tables
    pub policy_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            metrics_port: 9090,
            policy_file: None,
        }
    }
}

impl ServerConfig {
    /// Load from `PORT`, `METRICS_PORT` and `POLICY_FILE`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let port = parse_port(lookup("PORT"), "PORT")?.unwrap_or(defaults.port);
        let metrics_port =
            parse_port(lookup("METRICS_PORT"), "METRICS_PORT")?.unwrap_or(defaults.metrics_port);
        let policy_file = lookup("POLICY_FILE")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        if port == metrics_port {
            return Err(AuthzError::Config(format!(
                "PORT and METRICS_PORT must differ (both {})",
                port
            )));
        }

        Ok(Self {
            port,
            metrics_port,
            policy_file,
        })
    }

    /// Build the authorizer this configuration asks for
    pub fn load_authorizer(&self) -> Result<Authorizer> {
        match &self.policy_file {
            Some(path) => {
                info!("Loading policy document from {}", path.display());
                PolicyDocument::from_file(path)?.compile()
            }
            None => {
                info!("Using built-in policy table");
                Authorizer::standard()
            }
        }
    }
}

fn parse_port(value: Option<String>, key: &str) -> Result<Option<u16>> {
    value
        .map(|raw| {
            raw.parse::<u16>()
                .map_err(|e| AuthzError::Config(format!("{} must be a port number: {}", key, e)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{actions, Principal};
    use std::collections::HashMap;

    const DOCUMENT: &str = r#"{
        "rules": [
            {"resource": "Activity", "action": "list", "public": true},
            {"resource": "Activity", "action": "create", "predicates": ["authenticated", "admin_or_coach"]},
            {"resource": "HealthDiary", "action": "update", "predicates": ["authenticated", "owner"]}
        ],
        "scopes": [
            {"resource": "HealthDiary", "unrestricted_roles": ["Admin", "Coach"]}
        ]
    }"#;

    #[test]
    fn test_compile_document() {
        let authorizer = PolicyDocument::from_json(DOCUMENT).unwrap().compile().unwrap();

        assert_eq!(authorizer.policy().len(), 3);
        assert!(authorizer
            .authorize(&Principal::anonymous(), ResourceType::Activity, actions::LIST, None)
            .is_allowed());
        assert!(!authorizer
            .authorize(&Principal::exerciser(1), ResourceType::Activity, actions::CREATE, None)
            .is_allowed());
        assert!(authorizer.scopes().is_scoped(ResourceType::HealthDiary));
    }

    #[test]
    fn test_undefined_predicate_is_fatal() {
        let doc = r#"{"rules": [{"resource": "User", "action": "list", "predicates": ["superuser"]}]}"#;
        let result = PolicyDocument::from_json(doc).unwrap().compile();
        assert!(matches!(result, Err(AuthzError::MisconfiguredPolicy(_))));
    }

    #[test]
    fn test_empty_non_public_rule_is_fatal() {
        let doc = r#"{"rules": [{"resource": "User", "action": "list"}]}"#;
        let result = PolicyDocument::from_json(doc).unwrap().compile();
        assert!(matches!(result, Err(AuthzError::MisconfiguredPolicy(_))));
    }

    #[test]
    fn test_rule_without_authenticated_is_fatal() {
        let doc = r#"{"rules": [{"resource": "Activity", "action": "create", "predicates": ["admin_or_coach"]}]}"#;
        let result = PolicyDocument::from_json(doc).unwrap().compile();
        assert!(matches!(result, Err(AuthzError::MisconfiguredPolicy(_))));
    }

    #[test]
    fn test_public_with_predicates_is_fatal() {
        let doc = r#"{"rules": [{"resource": "User", "action": "create", "public": true, "predicates": ["owner"]}]}"#;
        let result = PolicyDocument::from_json(doc).unwrap().compile();
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_resource_and_role_are_fatal() {
        let doc = r#"{"rules": [{"resource": "Invoice", "action": "list", "predicates": ["authenticated"]}]}"#;
        assert!(PolicyDocument::from_json(doc).unwrap().compile().is_err());

        let doc = r#"{"scopes": [{"resource": "HealthRecord", "unrestricted_roles": ["Trainer"]}]}"#;
        assert!(PolicyDocument::from_json(doc).unwrap().compile().is_err());
    }

    #[test]
    fn test_public_action_on_scoped_resource_is_fatal() {
        let doc = r#"{
            "rules": [{"resource": "HealthDiary", "action": "list", "public": true}],
            "scopes": [{"resource": "HealthDiary", "unrestricted_roles": ["Admin", "Coach"]}]
        }"#;
        let result = PolicyDocument::from_json(doc).unwrap().compile();
        assert!(matches!(result, Err(AuthzError::MisconfiguredPolicy(_))));
    }

    #[test]
    fn test_unscoped_resources_reported() {
        let doc = r#"{"rules": [
            {"resource": "HealthRecord", "action": "list", "predicates": ["authenticated"]},
            {"resource": "HealthRecord", "action": "retrieve", "predicates": ["authenticated"]},
            {"resource": "Activity", "action": "list", "public": true}
        ]}"#;
        let document = PolicyDocument::from_json(doc).unwrap();
        assert_eq!(document.unscoped_resources().unwrap(), vec![ResourceType::HealthRecord]);

        let scoped = PolicyDocument::from_json(DOCUMENT).unwrap();
        assert!(scoped.unscoped_resources().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let doc = r#"{"rules": [], "default": "allow"}"#;
        assert!(matches!(PolicyDocument::from_json(doc), Err(AuthzError::Json(_))));
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_server_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "3000"),
            ("METRICS_PORT", "3001"),
            ("POLICY_FILE", "/etc/fitcoach/policy.json"),
        ]
        .into_iter()
        .collect();

        let config = ServerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.metrics_port, 3001);
        assert_eq!(config.policy_file, Some(PathBuf::from("/etc/fitcoach/policy.json")));
    }

    #[test]
    fn test_server_config_rejects_bad_ports() {
        assert!(ServerConfig::from_lookup(|key| (key == "PORT").then(|| "http".to_string())).is_err());
        assert!(ServerConfig::from_lookup(|_| Some("8080".to_string())).is_err());
    }

    #[test]
    fn test_missing_policy_file() {
        let config = ServerConfig {
            policy_file: Some(PathBuf::from("/nonexistent/fitcoach-policy.json")),
            ..ServerConfig::default()
        };
        assert!(matches!(config.load_authorizer(), Err(AuthzError::Io(_))));
    }
}
