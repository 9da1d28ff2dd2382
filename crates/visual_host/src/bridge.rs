//! Cross-thread composition link.
//!
//! A [`HostVisual`] is the inert placeholder inserted into the parent thread's tree. A
//! [`VisualTarget`] lives on the hosted thread, owns the hosted root, and publishes what it
//! composed into the anchor through a single [`CompositionHandle`] handed over at load time.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::element::HostedElement;
use crate::layout::Size;

static NEXT_ANCHOR_ID: AtomicU64 = AtomicU64::new(1);

/// Latest content the hosted thread composed into an anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Composition {
    pub revision: u64,
    pub desired_size: Size,
    pub render_size: Size,
}

struct AnchorShared {
    id: u64,
    connected: AtomicBool,
    composition: Mutex<Option<Composition>>,
}

/// Parent-thread placeholder for content rendered on another thread.
#[derive(Clone)]
pub struct HostVisual {
    shared: Arc<AnchorShared>,
}

impl HostVisual {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(AnchorShared {
                id: NEXT_ANCHOR_ID.fetch_add(1, Ordering::Relaxed),
                connected: AtomicBool::new(false),
                composition: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// True while a live [`VisualTarget`] is bound to this anchor.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    pub fn composition(&self) -> Option<Composition> {
        *self.shared.composition.lock()
    }

    /// The handle a [`VisualTarget`] binds to. Keeps the anchor's shared state alive for as
    /// long as the target may still publish into it.
    pub fn composition_handle(&self) -> CompositionHandle {
        CompositionHandle(self.shared.clone())
    }
}

impl Default for HostVisual {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HostVisual {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostVisual")
            .field("id", &self.shared.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

pub struct CompositionHandle(Arc<AnchorShared>);

impl CompositionHandle {
    pub fn anchor_id(&self) -> u64 {
        self.0.id
    }
}

/// Parent-side half of the bridge: a tree node that holds a single anchor child.
pub trait CompositionAnchor {
    fn attach_anchor(&mut self, anchor: HostVisual);

    fn detach_anchor(&mut self) -> Option<HostVisual>;

    fn visual_children_count(&self) -> usize;

    fn visual_child(&self, index: usize) -> Option<&HostVisual>;
}

/// Hosted-side half of the bridge.
pub trait CompositionTarget {
    type Root;

    fn set_root(&mut self, root: Option<Self::Root>) -> Option<Self::Root>;

    fn dispose(&mut self);
}

/// Hosted-thread render surface bound to one anchor.
pub struct VisualTarget<E> {
    anchor: Option<Arc<AnchorShared>>,
    root: Option<E>,
}

impl<E: HostedElement> VisualTarget<E> {
    pub fn new(handle: CompositionHandle) -> Self {
        handle.0.connected.store(true, Ordering::Release);
        Self {
            anchor: Some(handle.0),
            root: None,
        }
    }

    pub fn root(&self) -> Option<&E> {
        self.root.as_ref()
    }

    pub fn root_mut(&mut self) -> Option<&mut E> {
        self.root.as_mut()
    }

    pub fn is_disposed(&self) -> bool {
        self.anchor.is_none()
    }

    /// Compose the root into the anchor. `None` when there is nothing to compose or the
    /// target has been disposed; teardown races land here and are not errors.
    pub fn render(&mut self) -> Option<Composition> {
        let anchor = self.anchor.as_ref()?;
        let root = self.root.as_mut()?;
        let revision = root.render();
        let composition = Composition {
            revision,
            desired_size: root.desired_size(),
            render_size: root.render_size(),
        };
        *anchor.composition.lock() = Some(composition);
        Some(composition)
    }
}

impl<E: HostedElement> CompositionTarget for VisualTarget<E> {
    type Root = E;

    /// Swap the root. The new root is measured against infinite space and arranged to its
    /// desired size right away.
    fn set_root(&mut self, root: Option<E>) -> Option<E> {
        let previous = std::mem::replace(&mut self.root, root);
        if let Some(root) = self.root.as_mut() {
            let desired = root.measure(Size::INFINITE);
            root.arrange(desired);
        }
        previous
    }

    fn dispose(&mut self) {
        if let Some(anchor) = self.anchor.take() {
            anchor.connected.store(false, Ordering::Release);
        }
    }
}

impl<E> Drop for VisualTarget<E> {
    fn drop(&mut self) {
        if let Some(anchor) = self.anchor.take() {
            anchor.connected.store(false, Ordering::Release);
        }
    }
}
