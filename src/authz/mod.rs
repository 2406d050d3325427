//! Authorization: capability table and row visibility.
//!
//! Every decision is keyed by the session's active role, never by the full
//! set of roles a user holds.
//! - unauthorized actions are rejected with 403
//! - records outside the active role's scope are reported as 404

mod policy;
mod principal;

pub use policy::{capabilities, Action, Capabilities, ContractScope, ScopeRule};
pub use principal::Principal;
