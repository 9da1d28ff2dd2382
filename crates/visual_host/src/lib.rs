//! Thread-Separated Visual Hosting
//!
//! Runs a visual element on a dedicated thread with its own event loop and composes its
//! output into a visual tree owned by another thread.
//!
//! # Architecture
//!
//! ```text
//! parent thread                               hosted thread
//! ─────────────                               ─────────────
//! ThreadSeparatedHost ── load ──► spawn ──►   ElementFactory::create_element
//!   │ HostVisual (anchor) ◄── CompositionHandle ── VisualTarget(root = element)
//!   │                                         DispatcherLoop::run
//!   ├─ measure_override ── invoke_async ──►     element.measure   (bounded wait)
//!   ├─ arrange_override ── begin_invoke ──►     element.arrange   (no wait)
//!   └─ PropertyProxy::get / set ──────────►     property accessors
//! ```

mod bridge;
mod config;
mod dispatcher;
mod element;
mod error;
mod gate;
mod host;
mod layout;
mod parent;
mod property;

#[cfg(test)]
mod test_support;

pub use bridge::{
    Composition, CompositionAnchor, CompositionHandle, CompositionTarget, HostVisual, VisualTarget,
};
pub use config::{HostConfig, DEFAULT_MEASURE_TIMEOUT};
pub use dispatcher::{DispatchOperation, Dispatcher, DispatcherLoop, DispatcherState};
pub use element::{ElementFactory, HostedElement};
pub use error::{DispatchError, HostError, Result};
pub use gate::{ready_gate, ReadyGate, ReadySignal};
pub use host::{HostedDispatcher, HostedState, HostedThreadState, ThreadSeparatedHost};
pub use layout::Size;
pub use parent::{DesignModeParent, ParentJob, ParentThread};
pub use property::{Property, PropertyProxy};
