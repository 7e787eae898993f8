//! Caravel cloud provisioning core
//!
//! Provider-agnostic building blocks for provisioning a fixed stack of
//! cloud resources: resource records with dependency ordering, an
//! idempotent check-then-create orchestrator, a teardown pass in reverse
//! order, and a state file that records provider-assigned identifiers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  Caravel CLI                     │
//! │              (caravel up/down/plan)              │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               caravel-cloud                      │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   Orchestrator (order, check-then-create) │   │
//! │  │   trait CloudProvider { ... }             │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐             │
//! │  │    Waiter    │  │  State Mgmt  │             │
//! │  └──────────────┘  └──────────────┘             │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │  aws provider  │
//!           │  (aws CLI)     │
//!           └───────────────┘
//! ```

pub mod action;
pub mod error;
pub mod orchestrate;
pub mod provider;
pub mod resource;
pub mod state;
pub mod waiter;

// Re-exports
pub use action::{Action, ActionResult, ActionType, ApplyResult, Plan, PlanSummary};
pub use error::{CloudError, Result};
pub use orchestrate::{Orchestrator, StatusEntry};
pub use provider::{AuthStatus, CloudProvider};
pub use resource::{ResourceKind, ResourceRecord, ResourceStack};
pub use state::{ResourceState, StackState, StateLock, StateManager};
pub use waiter::{wait_until, WaitConfig};
