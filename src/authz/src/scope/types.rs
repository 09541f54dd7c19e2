//! Row filter and per-resource scope rule definitions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Owned, Principal, Role, RoleSet};

/// Row restriction produced for a principal
///
/// The core never runs the query; storage applies the filter on top of
/// whatever base condition (e.g. `active = true`) it already uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowFilter {
    /// Every row is visible
    Unrestricted,
    /// Only rows whose owner id equals the principal's id
    OwnedOnly,
}

impl RowFilter {
    /// Check a single row against the filter
    ///
    /// `OwnedOnly` never admits a row for an unauthenticated principal,
    /// nor a row without an owner.
    pub fn permits(&self, principal: &Principal, row: &dyn Owned) -> bool {
        match self {
            RowFilter::Unrestricted => true,
            RowFilter::OwnedOnly => {
                principal.authenticated && row.owner_id() == Some(principal.id)
            }
        }
    }

    /// Keep only the rows the principal may see
    pub fn apply<T: Owned>(&self, principal: &Principal, rows: Vec<T>) -> Vec<T> {
        match self {
            RowFilter::Unrestricted => rows,
            RowFilter::OwnedOnly => rows
                .into_iter()
                .filter(|row| self.permits(principal, row))
                .collect(),
        }
    }

    pub fn is_restricted(&self) -> bool {
        matches!(self, RowFilter::OwnedOnly)
    }
}

impl fmt::Display for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowFilter::Unrestricted => write!(f, "unrestricted"),
            RowFilter::OwnedOnly => write!(f, "owned_only"),
        }
    }
}

/// Scoped-visibility rule for one resource type
///
/// Roles in `unrestricted_roles` see every row, every other role sees only
/// its own rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeRule {
    unrestricted_roles: RoleSet,
}

impl ScopeRule {
    pub fn new(unrestricted_roles: RoleSet) -> Self {
        Self { unrestricted_roles }
    }

    /// Staff (Admin, Coach) see everything, exercisers see their own rows
    pub fn staff_sees_all() -> Self {
        Self::new(RoleSet::ADMIN_OR_COACH)
    }

    pub fn unrestricted_roles(&self) -> RoleSet {
        self.unrestricted_roles
    }

    /// Map a role to its row filter
    pub fn filter_for(&self, role: Role) -> RowFilter {
        if self.unrestricted_roles.contains(role) {
            RowFilter::Unrestricted
        } else {
            RowFilter::OwnedOnly
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TargetRef;

    #[test]
    fn test_filter_for_role() {
        let rule = ScopeRule::staff_sees_all();
        assert_eq!(rule.filter_for(Role::Admin), RowFilter::Unrestricted);
        assert_eq!(rule.filter_for(Role::Coach), RowFilter::Unrestricted);
        assert_eq!(rule.filter_for(Role::Exerciser), RowFilter::OwnedOnly);
    }

    #[test]
    fn test_permits() {
        let principal = Principal::exerciser(7);
        assert!(RowFilter::OwnedOnly.permits(&principal, &TargetRef::owned_by(7)));
        assert!(!RowFilter::OwnedOnly.permits(&principal, &TargetRef::owned_by(9)));
        assert!(!RowFilter::OwnedOnly.permits(&principal, &TargetRef::unowned()));
        assert!(RowFilter::Unrestricted.permits(&principal, &TargetRef::owned_by(9)));
    }

    #[test]
    fn test_display() {
        assert_eq!(RowFilter::OwnedOnly.to_string(), "owned_only");
        assert_eq!(
            serde_json::to_string(&RowFilter::Unrestricted).unwrap(),
            "\"unrestricted\""
        );
    }
}
