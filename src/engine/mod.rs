// src/engine/mod.rs

//! Watch session engine.
//!
//! This module ties together:
//! - the [`orchestrator`], which plans and supervises a session
//! - one [`service_loop`] per watched service, classifying raw changes and
//!   feeding them through the debouncer
//! - the [`dispatcher`], which turns each debounced batch into a sync or a
//!   rebuild
//!
//! Container-side work is delegated to the [`crate::exec`] collaborators.

pub mod dispatcher;
pub mod orchestrator;
pub mod service_loop;

pub use dispatcher::{rebuild_message, sync_message, BatchDispatcher, MAX_PATHS_TO_SHOW};
pub use orchestrator::{bind_mount_covering, ServicePlan, WatchOrchestrator, NOTHING_TO_WATCH};
pub use service_loop::ServiceWatch;
