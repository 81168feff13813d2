//! # dk-protocol
//!
//! Core protocol definitions and data models for deploy-kit.
//!
//! This crate defines all shared data structures used for:
//! - Persisted agent configuration (`config.json`)
//! - Status snapshots reported to presentation surfaces
//! - The process event stream emitted by the supervisor
//!
//! ## Modules
//!
//! - [`config_models`]: Persisted agent configuration
//! - [`process_events`]: Supervisor-to-observer event stream
//! - [`status_models`]: Status snapshot structures
//!
//! ## Design Principles
//!
//! - Minimal dependencies: only serde and chrono
//! - Independent compilation: no dependencies on other deploy-kit crates

pub mod config_models;
pub mod process_events;
pub mod status_models;

// Re-export all public types for convenience
pub use config_models::*;
pub use process_events::*;
pub use status_models::*;
