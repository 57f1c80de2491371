//! Domain layer: identities, presence vocabulary, and typing state machines.

pub mod events;
pub mod ids;
pub mod incoming_typing;
pub mod outgoing_typing;
pub mod presence;
pub mod timer;
pub mod timings;

/// Returns the domain module name for smoke checks.
pub fn module_name() -> &'static str {
    "domain"
}
