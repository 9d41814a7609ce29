// Call lifecycle: voice SDK events in, state transitions and the end-of-call handoff out.

pub mod controller;
pub mod events;
pub mod handlers;
pub mod registry;
pub mod voice;

pub use registry::CallRegistry;
