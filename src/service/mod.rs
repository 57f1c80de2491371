//! Runtime layer: the tokio actor, its scheduler, and the outbound queue.

pub mod actor;
pub mod scheduler;
pub mod transport;

/// Returns the service module name for smoke checks.
pub fn module_name() -> &'static str {
    "service"
}
