//! ODRL Policy Engine
//!
//! A deterministic evaluator for ODRL 2.2 policies that compiles to native
//! code (with a C ABI for host-language bindings) and, with the `wasm`
//! feature, to WebAssembly.
//!
//! An engine loads one policy document, keeps a mutable world of string
//! facts, and answers "may *assignee* perform *action* on *target* under
//! *assigner*'s policy?" with allow, deny, indeterminate or conflict.

pub mod config;
pub mod constraint;
pub mod context;
pub mod decision;
pub mod digest;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod ffi;
pub mod logging;
pub mod membership;
pub mod parser;
pub mod policy;
pub mod registry;
pub mod types;
pub mod value;
pub mod world;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::EngineConfig;
pub use context::QueryContext;
pub use decision::{Decision, PolicyDecision};
pub use engine::PolicyEngine;
pub use error::{OdrlError, Result};
pub use evaluator::{ConstraintEvaluator, Tri};
pub use policy::Policy;
pub use registry::EngineRegistry;
pub use world::WorldStore;

/// Version of the engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::constraint::{Constraint, ConstraintNode, LogicalConstraint, RightOperand};
    pub use crate::context::QueryContext;
    pub use crate::decision::{Decision, PolicyDecision};
    pub use crate::engine::PolicyEngine;
    pub use crate::error::{OdrlError, Result};
    pub use crate::evaluator::{ConstraintEvaluator, Tri};
    pub use crate::membership::{MembershipOracle, NoMembership, StaticMembership};
    pub use crate::policy::{Action, Party, Policy, Rule};
    pub use crate::types::*;
    pub use crate::world::{FactSource, WorldStore};
}
