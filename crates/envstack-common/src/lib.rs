//! envstack Common - Shared domain primitives
//!
//! Every other envstack crate speaks in terms of these types:
//! - **Region roles**: primary vs. disaster-recovery partitions
//! - **Stack identifiers**: stable names derived from environment, role and stage
//! - **Placement**: the (account, region) pair a stack is deployed into
//! - **Output kinds**: the typed handles a stack can hand to its consumers
//!
//! ```text
//!   environment ──┬── primary ──► <env>-shared-network ─► <env>-shared-data ─► <env>-app-<svc>
//!                 │
//!                 └── dr ───────► <env>-dr-shared-network ─► <env>-dr-shared-data ─► ...
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;

pub use domain::*;
