//! Authorization decision types

use serde::Serialize;
use std::fmt;

use crate::predicate::Predicate;
use crate::scope::RowFilter;

/// The check that rejected a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "predicate", rename_all = "snake_case")]
pub enum FailedCheck {
    /// A predicate of the action's rule
    Predicate(Predicate),
    /// The target row lies outside the principal's row scope
    RowScope,
}

impl fmt::Display for FailedCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailedCheck::Predicate(predicate) => write!(f, "{}", predicate),
            FailedCheck::RowScope => write!(f, "row_scope"),
        }
    }
}

/// Why a request was denied
///
/// For diagnostics and logging only; the HTTP boundary never echoes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DenyReason {
    /// The principal is not authenticated
    Unauthenticated { check: FailedCheck },
    /// Authenticated, but a role, ownership or scope check failed
    Forbidden { check: FailedCheck },
    /// An object-level check ran without a target object
    MissingTarget { check: FailedCheck },
}

impl DenyReason {
    /// The first failing check
    pub fn check(&self) -> FailedCheck {
        match self {
            DenyReason::Unauthenticated { check }
            | DenyReason::Forbidden { check }
            | DenyReason::MissingTarget { check } => *check,
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, DenyReason::Unauthenticated { .. })
    }

    /// HTTP status the boundary responds with (401 or 403)
    pub fn status_code(&self) -> u16 {
        if self.is_unauthenticated() {
            401
        } else {
            403
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Unauthenticated { check } => write!(f, "unauthenticated ({})", check),
            DenyReason::Forbidden { check } => write!(f, "forbidden ({})", check),
            DenyReason::MissingTarget { check } => write!(f, "missing target ({})", check),
        }
    }
}

/// Outcome of authorizing one request
///
/// `Allow` carries the row filter storage must apply for the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow { row_filter: RowFilter },
    Deny { reason: DenyReason },
}

impl Decision {
    pub fn allow(row_filter: RowFilter) -> Self {
        Decision::Allow { row_filter }
    }

    pub fn deny(reason: DenyReason) -> Self {
        Decision::Deny { reason }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }

    pub fn row_filter(&self) -> Option<RowFilter> {
        match self {
            Decision::Allow { row_filter } => Some(*row_filter),
            Decision::Deny { .. } => None,
        }
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Decision::Allow { .. } => None,
            Decision::Deny { reason } => Some(*reason),
        }
    }

    /// Row filter on allow, the deny reason otherwise
    pub fn into_result(self) -> std::result::Result<RowFilter, DenyReason> {
        match self {
            Decision::Allow { row_filter } => Ok(row_filter),
            Decision::Deny { reason } => Err(reason),
        }
    }
}
