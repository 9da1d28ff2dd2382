//! Routes producer frames into the renderer and renders them on the hosted thread.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use frame_renderer::{FrameBlock, FrameBufferRenderer, NoPresentSync, PresentSync, RendererStats};
use visual_host::{Composition, HostConfig, HostedDispatcher, HostedState, ParentThread, Size};

use crate::image_element::ImageElement;
use crate::image_host::ImageHost;

/// What happened to a presented frame after it was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// A render was queued on the hosted thread.
    Queued,
    /// A render was already queued and will pick up this frame.
    Coalesced,
    /// Nothing is hosted; the frame sits in the buffer unrendered.
    Dropped,
}

type DispatcherSlot = Arc<RwLock<Option<HostedDispatcher<ImageElement>>>>;

/// Producer-side handle. Cheap to clone and safe to move to the decoding thread.
#[derive(Clone)]
pub struct FramePresenter {
    renderer: Arc<FrameBufferRenderer>,
    dispatcher: DispatcherSlot,
    render_pending: Arc<AtomicBool>,
    present_sync: Arc<dyn PresentSync>,
}

impl FramePresenter {
    /// Copy `block` into the renderer and schedule a render on the hosted thread.
    ///
    /// Write errors, including allocation failure, are returned. At most one render is
    /// queued at a time; frames written while one is pending are shown by that render.
    pub fn present(&self, block: &FrameBlock<'_>) -> frame_renderer::Result<PresentOutcome> {
        self.renderer.write(block)?;

        let Some(dispatcher) = self.dispatcher.read().clone() else {
            debug!("no hosted element; frame not rendered");
            return Ok(PresentOutcome::Dropped);
        };

        if self.render_pending.swap(true, Ordering::AcqRel) {
            trace!("render already pending");
            return Ok(PresentOutcome::Coalesced);
        }

        self.present_sync.wait_for_present();

        let renderer = self.renderer.clone();
        let pending = self.render_pending.clone();
        let queued = dispatcher.begin_invoke(move |state: &mut HostedState<ImageElement>| {
            pending.store(false, Ordering::Release);
            if let Some(element) = state.element_mut() {
                renderer.render(element);
            }
        });

        match queued {
            Ok(()) => Ok(PresentOutcome::Queued),
            Err(e) => {
                self.render_pending.store(false, Ordering::Release);
                debug!(error = %e, "hosted thread gone; frame not rendered");
                Ok(PresentOutcome::Dropped)
            }
        }
    }
}

/// Video surface: an [`ImageHost`] fed by a [`FrameBufferRenderer`].
pub struct VideoSurfaceHost {
    host: ImageHost,
    presenter: FramePresenter,
}

impl VideoSurfaceHost {
    pub fn new(parent: Arc<dyn ParentThread>, config: HostConfig) -> Self {
        Self {
            host: ImageHost::new(parent, config),
            presenter: FramePresenter {
                renderer: Arc::new(FrameBufferRenderer::new()),
                dispatcher: Arc::new(RwLock::new(None)),
                render_pending: Arc::new(AtomicBool::new(false)),
                present_sync: Arc::new(NoPresentSync),
            },
        }
    }

    pub fn with_present_sync(mut self, present_sync: Arc<dyn PresentSync>) -> Self {
        self.presenter.present_sync = present_sync;
        self
    }

    /// Cap the bytes a single frame may occupy. Larger frames fail to present.
    pub fn with_max_frame_bytes(mut self, len: usize) -> Self {
        self.presenter.renderer = Arc::new(FrameBufferRenderer::with_max_region_len(len));
        self
    }

    pub fn presenter(&self) -> FramePresenter {
        self.presenter.clone()
    }

    pub fn present(&self, block: &FrameBlock<'_>) -> frame_renderer::Result<PresentOutcome> {
        self.presenter.present(block)
    }

    pub fn image_host(&self) -> &ImageHost {
        &self.host
    }

    pub fn renderer(&self) -> &Arc<FrameBufferRenderer> {
        &self.presenter.renderer
    }

    pub fn renderer_stats(&self) -> RendererStats {
        self.presenter.renderer.stats()
    }

    /// Latest content composed into the anchor, if any.
    pub fn composition(&self) -> Option<Composition> {
        self.host.anchor().and_then(|anchor| anchor.composition())
    }

    pub fn is_connected(&self) -> bool {
        self.presenter.dispatcher.read().is_some()
    }

    pub fn take_measure_request(&self) -> bool {
        self.host.host().take_measure_request()
    }

    pub fn load(&mut self) -> visual_host::Result<()> {
        self.host.load()?;
        *self.presenter.dispatcher.write() = self.host.hosted_dispatcher();
        Ok(())
    }

    pub fn unload(&mut self) {
        self.presenter.dispatcher.write().take();
        self.presenter.render_pending.store(false, Ordering::Release);
        self.host.unload();
    }

    pub fn measure(&self, constraint: Size) -> Size {
        self.host.measure(constraint)
    }

    pub fn arrange(&self, final_size: Size) -> Size {
        self.host.arrange(final_size)
    }
}

impl Drop for VideoSurfaceHost {
    fn drop(&mut self) {
        self.unload();
        self.presenter.renderer.dispose();
    }
}
