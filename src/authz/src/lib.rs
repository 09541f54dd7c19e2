//! # Fitcoach Authorization Engine
//!
//! Access control for the fitness coaching platform: decides, per request,
//! whether a caller (Admin, Coach or Exerciser) may perform an action on a
//! resource, and which rows of that resource the caller may see.
//!
//! ## Features
//!
//! - **Declarative policy table** mapping `(resource, action)` to predicates,
//!   with an explicit default-deny-unauthenticated fallback
//! - **Pure predicates** for authentication, role membership and ownership
//! - **Row scoping** producing `Unrestricted` / `OwnedOnly` filters for storage
//! - **Fatal startup validation** of policy documents
//! - **HTTP boundary** (axum) mapping denials to 401/403 without leaking detail
//!
//! ## Example
//!
//! ```rust
//! use fitcoach_authz::{Authorizer, Principal, ResourceType, TargetRef};
//! use fitcoach_authz::types::actions;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let authorizer = Authorizer::standard()?;
//!
//! let principal = Principal::exerciser(7);
//! let diary = TargetRef::owned_by(7);
//!
//! let decision = authorizer.authorize(
//!     &principal,
//!     ResourceType::HealthDiary,
//!     actions::UPDATE,
//!     Some(&diary),
//! );
//!
//! assert!(decision.is_allowed());
//! # Ok(())
//! # }
//! ```

pub mod types;
pub mod predicate;
pub mod policy;
pub mod scope;
pub mod engine;
pub mod config;
pub mod error;
pub mod http;

// Re-export commonly used types
pub use types::{Action, Owned, Principal, ResourceType, Role, RoleSet, TargetRef, UserId};
pub use predicate::Predicate;
pub use policy::{PolicyTable, RuleKind};
pub use scope::{RowFilter, ScopeResolver, ScopeRule};
pub use engine::{Authorizer, Decision, DenyReason, FailedCheck};
pub use config::{PolicyDocument, ServerConfig};
pub use error::{AuthzError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
