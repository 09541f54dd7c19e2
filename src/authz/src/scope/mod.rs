//! Row-level visibility scoping
//!
//! For resources whose visibility depends on the caller's role ("my rows" vs.
//! "all rows"), the resolver turns a principal into a [`RowFilter`] that the
//! data-access layer appends to its own base filters.
//!
//! # Examples
//!
//! ```
//! use fitcoach_authz::scope::{RowFilter, ScopeResolver};
//! use fitcoach_authz::{Principal, ResourceType};
//!
//! let resolver = ScopeResolver::standard();
//!
//! assert_eq!(
//!     resolver.resolve(&Principal::exerciser(7), ResourceType::HealthRecord),
//!     RowFilter::OwnedOnly
//! );
//! assert_eq!(
//!     resolver.resolve(&Principal::coach(3), ResourceType::HealthRecord),
//!     RowFilter::Unrestricted
//! );
//! ```

mod types;
mod resolver;


pub use types::{RowFilter, ScopeRule};
pub use resolver::{ScopeResolver, ScopeResolverBuilder};
