//! Marshalled access to properties of the hosted element.
//!
//! Reads block until the hosted thread answers and fall back to `T::default()` when nothing
//! is hosted. Writes are fire-and-forget and are dropped, not queued, when nothing is
//! hosted. Each proxy keeps a shadow of the last value it sent so repeated writes of the
//! same value skip the thread hop.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{trace, warn};

use crate::element::HostedElement;
use crate::host::{HostLink, HostedState};

/// Accessor pair identifying one property of `E`.
pub struct Property<E, T> {
    name: &'static str,
    get: fn(&E) -> T,
    set: fn(&mut E, T),
}

impl<E, T> Property<E, T> {
    pub const fn new(name: &'static str, get: fn(&E) -> T, set: fn(&mut E, T)) -> Self {
        Self { name, get, set }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<E, T> Clone for Property<E, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, T> Copy for Property<E, T> {}

pub struct PropertyProxy<E: HostedElement, T> {
    property: Property<E, T>,
    link: Arc<HostLink<E>>,
    // (load generation, last value sent)
    shadow: Mutex<Option<(u64, T)>>,
}

impl<E, T> PropertyProxy<E, T>
where
    E: HostedElement,
    T: Clone + PartialEq + Default + Send + 'static,
{
    pub(crate) fn new(property: Property<E, T>, link: Arc<HostLink<E>>) -> Self {
        Self {
            property,
            link,
            shadow: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.property.name
    }

    /// Read the property on the hosted thread.
    pub fn get(&self) -> T {
        let Some(dispatcher) = self.link.dispatcher() else {
            return T::default();
        };

        let property = self.property;
        let read = dispatcher.invoke(move |state: &mut HostedState<E>| {
            state.element().map(|element| (property.get)(element))
        });
        match read {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                warn!(property = self.property.name, error = %e, "property read failed");
                T::default()
            }
        }
    }

    /// Write the property on the hosted thread without waiting.
    pub fn set(&self, value: T) {
        let Some((generation, dispatcher)) = self.link.connection() else {
            trace!(property = self.property.name, "no hosted element; write dropped");
            return;
        };

        {
            let mut shadow = self.shadow.lock();
            if let Some((seen, current)) = shadow.as_ref() {
                if *seen == generation && *current == value {
                    return;
                }
            }
            *shadow = Some((generation, value.clone()));
        }

        let property = self.property;
        let queued = dispatcher.begin_invoke(move |state: &mut HostedState<E>| {
            if let Some(element) = state.element_mut() {
                (property.set)(element, value);
            }
        });
        if let Err(e) = queued {
            warn!(property = self.property.name, error = %e, "property write failed");
        }
    }
}
