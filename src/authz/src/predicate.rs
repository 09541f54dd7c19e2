//! Permission predicates
//!
//! Each predicate is a pure function of the principal and an optional target.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::AuthzError;
use crate::types::{Owned, Principal, RoleSet};

/// A single capability check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// Caller presented a valid credential
    IsAuthenticated,
    /// Caller is authenticated and holds one of the roles
    HasRole(RoleSet),
    /// Caller is authenticated and owns the target object
    IsOwner,
}

impl Predicate {
    pub const ADMIN_ONLY: Predicate = Predicate::HasRole(RoleSet::ADMIN);
    pub const COACH_ONLY: Predicate = Predicate::HasRole(RoleSet::COACH);
    pub const ADMIN_OR_COACH: Predicate = Predicate::HasRole(RoleSet::ADMIN_OR_COACH);
    pub const EXERCISER_ONLY: Predicate = Predicate::HasRole(RoleSet::EXERCISER);

    /// Whether the predicate needs a target object to be meaningful
    pub fn is_object_level(&self) -> bool {
        matches!(self, Predicate::IsOwner)
    }

    /// Evaluate against a principal and optional target
    pub fn evaluate(&self, principal: &Principal, target: Option<&dyn Owned>) -> bool {
        match self {
            Predicate::IsAuthenticated => is_authenticated(principal),
            Predicate::HasRole(roles) => has_role(principal, *roles),
            Predicate::IsOwner => is_owner(principal, target),
        }
    }

    /// Configuration name, if the predicate has one
    pub fn name(&self) -> &'static str {
        match *self {
            Predicate::IsAuthenticated => "authenticated",
            Predicate::IsOwner => "owner",
            Predicate::ADMIN_ONLY => "admin_only",
            Predicate::COACH_ONLY => "coach_only",
            Predicate::ADMIN_OR_COACH => "admin_or_coach",
            Predicate::EXERCISER_ONLY => "exerciser_only",
            Predicate::HasRole(_) => "has_role",
        }
    }
}

pub fn is_authenticated(principal: &Principal) -> bool {
    principal.authenticated
}

pub fn has_role(principal: &Principal, roles: RoleSet) -> bool {
    principal.authenticated && roles.contains(principal.role)
}

/// Absent target fails closed.
pub fn is_owner(principal: &Principal, target: Option<&dyn Owned>) -> bool {
    if !principal.authenticated {
        return false;
    }

    match target.and_then(|t| t.owner_id()) {
        Some(owner_id) => owner_id == principal.id,
        None => false,
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::HasRole(roles) if self.name() == "has_role" => {
                let names: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
                write!(f, "has_role({})", names.join("|"))
            }
            _ => f.write_str(self.name()),
        }
    }
}

impl FromStr for Predicate {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authenticated" => Ok(Predicate::IsAuthenticated),
            "owner" => Ok(Predicate::IsOwner),
            "admin_only" => Ok(Predicate::ADMIN_ONLY),
            "coach_only" => Ok(Predicate::COACH_ONLY),
            "admin_or_coach" => Ok(Predicate::ADMIN_OR_COACH),
            "exerciser_only" => Ok(Predicate::EXERCISER_ONLY),
            other => Err(AuthzError::MisconfiguredPolicy(format!(
                "undefined predicate '{}'",
                other
            ))),
        }
    }
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Role, TargetRef};

    #[test]
    fn test_authenticated() {
        assert!(Predicate::IsAuthenticated.evaluate(&Principal::exerciser(1), None));
        assert!(!Predicate::IsAuthenticated.evaluate(&Principal::anonymous(), None));
    }

    #[test]
    fn test_role_specializations() {
        let admin = Principal::admin(1);
        let coach = Principal::coach(2);
        let exerciser = Principal::exerciser(3);

        assert!(Predicate::ADMIN_ONLY.evaluate(&admin, None));
        assert!(!Predicate::ADMIN_ONLY.evaluate(&coach, None));

        assert!(Predicate::COACH_ONLY.evaluate(&coach, None));
        assert!(!Predicate::COACH_ONLY.evaluate(&exerciser, None));

        assert!(Predicate::ADMIN_OR_COACH.evaluate(&admin, None));
        assert!(Predicate::ADMIN_OR_COACH.evaluate(&coach, None));
        assert!(!Predicate::ADMIN_OR_COACH.evaluate(&exerciser, None));

        assert!(Predicate::EXERCISER_ONLY.evaluate(&exerciser, None));
        assert!(!Predicate::EXERCISER_ONLY.evaluate(&admin, None));
    }

    #[test]
    fn test_role_requires_authentication() {
        let mut admin = Principal::admin(1);
        admin.authenticated = false;
        assert!(!Predicate::ADMIN_ONLY.evaluate(&admin, None));
    }

    #[test]
    fn test_owner() {
        let principal = Principal::exerciser(7);
        let own = TargetRef::owned_by(7);
        let other = TargetRef::owned_by(9);

        assert!(Predicate::IsOwner.evaluate(&principal, Some(&own)));
        assert!(!Predicate::IsOwner.evaluate(&principal, Some(&other)));
        assert!(!Predicate::IsOwner.evaluate(&principal, Some(&TargetRef::unowned())));
        assert!(!Predicate::IsOwner.evaluate(&principal, None));
    }

    #[test]
    fn test_owner_compares_principal_identity() {
        let principal = Principal::coach(5);
        assert!(Predicate::IsOwner.evaluate(&principal, Some(&Principal::exerciser(5))));
        assert!(!Predicate::IsOwner.evaluate(&principal, Some(&Principal::admin(6))));
    }

    #[test]
    fn test_owner_never_satisfied_when_anonymous() {
        let anonymous = Principal::anonymous();
        let target = TargetRef::owned_by(anonymous.id);
        assert!(!Predicate::IsOwner.evaluate(&anonymous, Some(&target)));
    }

    #[test]
    fn test_parse_names() {
        for name in ["authenticated", "owner", "admin_only", "coach_only", "admin_or_coach", "exerciser_only"] {
            let predicate: Predicate = name.parse().unwrap();
            assert_eq!(predicate.name(), name);
        }

        assert!(matches!(
            "superuser".parse::<Predicate>(),
            Err(AuthzError::MisconfiguredPolicy(_))
        ));
    }

    #[test]
    fn test_custom_role_set_display() {
        let predicate = Predicate::HasRole(RoleSet::of(&[Role::Exerciser, Role::Coach]));
        assert_eq!(predicate.to_string(), "has_role(Exerciser|Coach)");
        assert_eq!(Predicate::ADMIN_OR_COACH.to_string(), "admin_or_coach");
    }
}
