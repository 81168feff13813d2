//! Application process supervision.
//!
//! This module owns the single child process that runs the current
//! deployment: starting it under a resolved shell, streaming its output to
//! observers, and guaranteeing termination through an escalating stop
//! sequence.

pub mod error;
pub mod process;
pub mod shell;

pub use error::SupervisorError;
pub use error::SupervisorResult;
pub use process::ProcessSupervisor;
pub use process::StopTimeouts;
