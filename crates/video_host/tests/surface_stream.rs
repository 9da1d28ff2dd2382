use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use frame_renderer::FrameBlock;
use video_host::{ImageElement, PresentOutcome, Stretch, StretchDirection, VideoSurfaceHost};
use visual_host::{DesignModeParent, Dispatcher, DispatcherLoop, HostConfig, Size};

struct UiThread {
    dispatcher: Dispatcher<()>,
    handle: Option<JoinHandle<()>>,
}

impl UiThread {
    fn spawn() -> Self {
        let (dispatcher, event_loop) = DispatcherLoop::<()>::new("ui");
        let handle = thread::spawn(move || event_loop.run(&mut ()));
        Self {
            dispatcher,
            handle: Some(handle),
        }
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        self.dispatcher.begin_invoke_shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn frame(width: u32, height: u32, fill: u8) -> Vec<u8> {
    vec![fill; width as usize * height as usize * 4]
}

fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

fn shown_size(surface: &VideoSurfaceHost) -> Option<(u32, u32, usize)> {
    surface
        .image_host()
        .host()
        .invoke_on_element(|e: &mut ImageElement| {
            e.source().map(|image| (image.width(), image.height(), image.stride()))
        })
        .unwrap()
        .flatten()
}

#[test]
fn test_producer_stream_with_resize() {
    let ui = UiThread::spawn();
    let mut surface = VideoSurfaceHost::new(Arc::new(ui.dispatcher.clone()), HostConfig::default());
    surface.load().unwrap();

    let presenter = surface.presenter();
    let producer = thread::spawn(move || {
        for fill in 0..30u8 {
            let bytes = frame(640, 480, fill);
            presenter
                .present(&FrameBlock::new(640, 480, 2560, &bytes).unwrap())
                .unwrap();
        }
    });
    producer.join().unwrap();

    assert!(wait_until(|| shown_size(&surface) == Some((640, 480, 2560))));
    let stats = surface.renderer_stats();
    assert_eq!(stats.allocations, 1);
    assert_eq!(stats.rebuilds, 1);

    let presenter = surface.presenter();
    let producer = thread::spawn(move || {
        let bytes = frame(1280, 720, 0xaa);
        presenter
            .present(&FrameBlock::new(1280, 720, 5120, &bytes).unwrap())
            .unwrap()
    });
    assert_ne!(producer.join().unwrap(), PresentOutcome::Dropped);

    assert!(wait_until(|| shown_size(&surface) == Some((1280, 720, 5120))));
    let stats = surface.renderer_stats();
    assert_eq!(stats.allocations, 2);
    assert_eq!(stats.rebuilds, 2);
    assert_eq!(stats.peak_live_regions, 1);

    assert!(wait_until(|| {
        surface
            .composition()
            .is_some_and(|c| c.desired_size == Size::new(1280.0, 720.0))
    }));
    surface.unload();
}

#[test]
fn test_layout_and_properties_cross_threads() {
    let ui = UiThread::spawn();
    let mut surface = VideoSurfaceHost::new(
        Arc::new(ui.dispatcher.clone()),
        HostConfig::default().with_measure_timeout(Duration::from_secs(5)),
    );

    // Nothing hosted yet: defaults, no blocking.
    assert_eq!(surface.image_host().stretch().get(), Stretch::Uniform);
    assert_eq!(surface.measure(Size::new(100.0, 100.0)), Size::ZERO);

    surface.load().unwrap();
    let bytes = frame(200, 100, 1);
    surface
        .present(&FrameBlock::new(200, 100, 800, &bytes).unwrap())
        .unwrap();
    assert!(wait_until(|| shown_size(&surface).is_some()));

    assert_eq!(surface.measure(Size::new(100.0, 100.0)), Size::new(100.0, 50.0));

    let host = surface.image_host();
    host.stretch().set(Stretch::Fill);
    assert_eq!(host.stretch().get(), Stretch::Fill);
    assert_eq!(surface.measure(Size::new(100.0, 100.0)), Size::new(100.0, 100.0));

    host.stretch().set(Stretch::Uniform);
    host.stretch_direction().set(StretchDirection::DownOnly);
    assert_eq!(host.stretch_direction().get(), StretchDirection::DownOnly);
    assert_eq!(surface.measure(Size::new(400.0, 400.0)), Size::new(200.0, 100.0));

    let final_size = Size::new(400.0, 400.0);
    assert_eq!(surface.arrange(final_size), final_size);
    surface.unload();
}

#[test]
fn test_design_mode_surface_never_renders() {
    let mut surface = VideoSurfaceHost::new(Arc::new(DesignModeParent), HostConfig::default());
    surface.load().unwrap();
    assert!(!surface.is_connected());
    assert!(surface.image_host().anchor().is_some());

    let bytes = frame(2, 2, 0);
    let outcome = surface.present(&FrameBlock::new(2, 2, 8, &bytes).unwrap());
    assert_eq!(outcome, Ok(PresentOutcome::Dropped));
    assert!(surface.composition().is_none());
}
