//! Supervisor-to-observer event stream.
//!
//! The process supervisor broadcasts these events to zero or more observers
//! (log streaming, the CLI, tests). Child output is forwarded verbatim as
//! raw bytes; supervisor-origin messages travel as separate variants so the
//! output stream is never polluted.
//!
//! Delivery is fire-and-forget per observer: a slow observer misses events
//! rather than blocking the child's I/O.

use serde::Deserialize;
use serde::Serialize;

/// Events emitted by the process supervisor.
///
/// Uses tagged enum serialization so transports can forward events as JSON:
/// ```json
/// {
///   "type": "exited",
///   "payload": { "code": 0 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ProcessEvent {
    /// A chunk of raw bytes from the child's stdout or stderr.
    ///
    /// Chunk boundaries are arbitrary; observers must not assume the bytes
    /// are line-oriented or valid UTF-8.
    Output { bytes: Vec<u8> },

    /// A diagnostic line produced by the supervisor itself, e.g. the
    /// liveness watchdog warning or the stuck-process notice.
    Diagnostic { message: String },

    /// The child process has exited.
    ///
    /// `code` is `None` when the process was terminated by a signal.
    Exited { code: Option<i32> },
}
