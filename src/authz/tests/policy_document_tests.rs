//! Policy document loading tests
//!
//! The shipped document must reproduce the built-in tables exactly.

use fitcoach_authz::{
    types::actions, Authorizer, AuthzError, PolicyDocument, Principal, ResourceType, Role,
    ServerConfig, TargetRef,
};
use std::io::Write;
use std::path::PathBuf;

fn shipped_document() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("policies/standard.json")
}

#[test]
fn test_shipped_document_matches_builtin_table() {
    let builtin = Authorizer::standard().unwrap();
    let loaded = PolicyDocument::from_file(shipped_document()).unwrap().compile().unwrap();

    assert_eq!(builtin.policy().len(), loaded.policy().len());
    for (resource, action, rule) in builtin.policy().entries() {
        assert_eq!(
            loaded.policy().declared(resource, action),
            Some(rule),
            "{}.{} differs",
            resource,
            action
        );
    }

    assert_eq!(builtin.scopes().scoped_resources(), loaded.scopes().scoped_resources());
}

#[test]
fn test_shipped_document_decisions_match() {
    let builtin = Authorizer::standard().unwrap();
    let loaded = PolicyDocument::from_file(shipped_document()).unwrap().compile().unwrap();

    let principals = [
        Principal::anonymous(),
        Principal::new(1, Role::Admin),
        Principal::new(2, Role::Coach),
        Principal::new(3, Role::Exerciser),
    ];
    let target = TargetRef::owned_by(3);

    for principal in &principals {
        for resource in ResourceType::ALL {
            for action in [actions::LIST, actions::RETRIEVE, actions::UPDATE, actions::DESTROY, actions::SEND_MESSAGE] {
                assert_eq!(
                    builtin.authorize(principal, resource, action, Some(&target)),
                    loaded.authorize(principal, resource, action, Some(&target)),
                );
            }
        }
    }
}

#[test]
fn test_server_config_loads_policy_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"rules": [{{"resource": "MealPlan", "action": "list", "predicates": ["authenticated", "coach_only"]}}]}}"#
    )
    .unwrap();

    let config = ServerConfig {
        policy_file: Some(file.path().to_path_buf()),
        ..ServerConfig::default()
    };
    let authorizer = config.load_authorizer().unwrap();

    assert!(authorizer
        .authorize(&Principal::coach(2), ResourceType::MealPlan, actions::LIST, None)
        .is_allowed());
    assert!(!authorizer
        .authorize(&Principal::admin(1), ResourceType::MealPlan, actions::LIST, None)
        .is_allowed());
}

#[test]
fn test_malformed_policy_refuses_to_load() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"rules": [{{"resource": "HealthDiary", "action": "destroy", "predicates": []}}]}}"#
    )
    .unwrap();

    let config = ServerConfig {
        policy_file: Some(file.path().to_path_buf()),
        ..ServerConfig::default()
    };

    assert!(matches!(
        config.load_authorizer(),
        Err(AuthzError::MisconfiguredPolicy(_))
    ));
}
