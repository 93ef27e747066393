//! Synchronous fine-grained reactivity.
//!
//! The mount/patch engine consumes this as an opaque capability: signals
//! to read and write, and `effect(fn) -> cleanup`.

pub mod effect;
pub mod runtime;
pub mod signal;

pub use effect::{Effect, effect};
pub use runtime::{Graph, ReactiveId, untrack, with_graph};
pub use signal::Signal;
