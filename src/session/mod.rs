//! Session context and role grants.
//!
//! A user may hold several roles; each login session acts as exactly one of
//! them at a time. The context is recomputed from the grant store on every
//! request, so revocations are visible immediately.

mod catalog;
mod context;
pub mod grants;
pub mod manager;

pub use catalog::RoleKind;
pub use context::{derive_context, plan_switch, AvailableRole, SessionContext, SwitchOutcome};
pub use manager::{establish_context, load_context, switch_role};
