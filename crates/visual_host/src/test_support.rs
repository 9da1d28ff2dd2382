use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::dispatcher::{Dispatcher, DispatcherLoop};
use crate::element::HostedElement;
use crate::layout::Size;
use crate::parent::ParentThread;

/// Element with a fixed natural size that shrinks to the space offered.
pub(crate) struct TestElement {
    natural: Size,
    desired: Size,
    render_size: Size,
    dirty: bool,
    revision: u64,
    pub label: String,
    pub label_writes: u32,
    pub last_available: Option<Size>,
}

impl TestElement {
    pub fn new(natural: Size) -> Self {
        Self {
            natural,
            desired: Size::ZERO,
            render_size: Size::ZERO,
            dirty: true,
            revision: 0,
            label: String::new(),
            label_writes: 0,
            last_available: None,
        }
    }

    pub fn invalidate(&mut self) {
        self.dirty = true;
    }
}

impl HostedElement for TestElement {
    fn measure(&mut self, available: Size) -> Size {
        self.last_available = Some(available);
        self.desired = Size::new(
            self.natural.width.min(available.width),
            self.natural.height.min(available.height),
        );
        self.desired
    }

    fn desired_size(&self) -> Size {
        self.desired
    }

    fn arrange(&mut self, final_size: Size) -> Size {
        self.render_size = final_size;
        final_size
    }

    fn render_size(&self) -> Size {
        self.render_size
    }

    fn is_visual_dirty(&self) -> bool {
        self.dirty
    }

    fn render(&mut self) -> u64 {
        self.dirty = false;
        self.revision += 1;
        self.revision
    }
}

/// A parent dispatcher loop on its own thread, shut down and joined on drop.
pub(crate) struct ParentLoop {
    dispatcher: Dispatcher<()>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for ParentLoop {
    fn drop(&mut self) {
        self.dispatcher.begin_invoke_shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub(crate) fn spawn_parent() -> (Arc<dyn ParentThread>, ParentLoop) {
    let (dispatcher, event_loop) = DispatcherLoop::<()>::new("parent");
    let handle = thread::spawn(move || event_loop.run(&mut ()));
    let parent: Arc<dyn ParentThread> = Arc::new(dispatcher.clone());
    (
        parent,
        ParentLoop {
            dispatcher,
            handle: Some(handle),
        },
    )
}
