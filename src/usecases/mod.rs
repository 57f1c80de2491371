//! Use case layer: coordinator registry, contracts, and driver workflows.

pub mod bootstrap;
pub mod context;
pub mod contracts;
pub mod script;
pub mod typing_registry;

/// Returns the usecases module name for smoke checks.
pub fn module_name() -> &'static str {
    "usecases"
}
