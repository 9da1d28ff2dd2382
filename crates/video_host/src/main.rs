use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

use frame_renderer::FrameBlock;
use video_host::{logging, HostSettings, VideoSettings, VideoSurfaceHost};
use visual_host::{Dispatcher, DispatcherLoop, DispatcherState, Size};

const CONFIG_ENV: &str = "FRAME_HOST_CONFIG";

/// Parent-thread state: the surface plus the viewport it is laid out into.
struct DemoWindow {
    surface: VideoSurfaceHost,
    viewport: Size,
}

impl DemoWindow {
    fn layout(&mut self) {
        let desired = self.surface.measure(self.viewport);
        self.surface.arrange(desired);
        info!(width = desired.width, height = desired.height, "surface laid out");
    }
}

impl DispatcherState for DemoWindow {
    fn after_dispatch(&mut self) {
        if self.surface.take_measure_request() {
            self.layout();
        }
    }
}

fn settings_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .or_else(HostSettings::default_path)
}

/// BGRA gradient that drifts with `index`.
fn synthetic_frame(width: u32, height: u32, index: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let shift = index.wrapping_mul(3);
            bytes.extend_from_slice(&[
                (x.wrapping_add(shift) & 0xff) as u8,
                (y.wrapping_add(shift) & 0xff) as u8,
                (index & 0xff) as u8,
                0xff,
            ]);
        }
    }
    bytes
}

/// Stops the ui loop when dropped, so the producer releases it on every exit path.
struct ShutdownOnDrop<'a>(&'a Dispatcher<DemoWindow>);

impl Drop for ShutdownOnDrop<'_> {
    fn drop(&mut self) {
        self.0.begin_invoke_shutdown();
    }
}

fn stream_frames(
    video: VideoSettings,
    presenter: video_host::FramePresenter,
    ui: Dispatcher<DemoWindow>,
) -> Result<()> {
    let _shutdown = ShutdownOnDrop(&ui);
    for index in 0..video.demo_frames {
        let (width, height) = if index >= video.demo_resize_at {
            (video.demo_width * 2, video.demo_height * 2)
        } else {
            (video.demo_width, video.demo_height)
        };

        let bytes = synthetic_frame(width, height, index);
        let block = FrameBlock::new(width, height, width as usize * 4, &bytes)
            .context("synthetic frame rejected")?;
        presenter
            .present(&block)
            .with_context(|| format!("failed to present frame {index}"))?;

        if index == video.demo_resize_at {
            let resized = Size::new(f64::from(width), f64::from(height));
            let relayout = ui.begin_invoke(move |window: &mut DemoWindow| {
                window.viewport = resized;
                window.layout();
            });
            if let Err(e) = relayout {
                warn!(error = %e, "ui thread gone; stopping stream");
                break;
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let path = settings_path();
    let settings = match &path {
        Some(path) => HostSettings::load(path)?,
        None => HostSettings::default(),
    };
    logging::init(&settings).context("failed to initialize logging")?;
    logging::log_settings(&settings);
    if let Some(path) = &path {
        info!(path = %path.display(), "settings path");
    }

    let (ui, ui_loop) = DispatcherLoop::<DemoWindow>::new("ui");
    let mut surface = VideoSurfaceHost::new(Arc::new(ui.clone()), settings.host.clone())
        .with_present_sync(settings.video.present_sync())
        .with_max_frame_bytes(settings.video.max_frame_bytes);
    surface.load().context("failed to load video surface")?;

    let presenter = surface.presenter();
    let video = settings.video.clone();
    let producer_ui = ui.clone();
    let producer = thread::Builder::new()
        .name("frame-producer".to_string())
        .spawn(move || stream_frames(video, presenter, producer_ui))
        .context("failed to spawn frame producer")?;

    let mut window = DemoWindow {
        surface,
        viewport: Size::new(
            f64::from(settings.video.demo_width),
            f64::from(settings.video.demo_height),
        ),
    };
    ui_loop.run(&mut window);

    let streamed = match producer.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("frame producer panicked")),
    };

    let stats = window.surface.renderer_stats();
    info!(
        revision = window.surface.composition().map(|c| c.revision),
        allocations = stats.allocations,
        rebuilds = stats.rebuilds,
        "stream finished"
    );
    window.surface.unload();
    streamed
}
