//! Video presentation through a thread-separated image host.
//!
//! A producer thread hands BGRA frames to a [`FramePresenter`]. Each frame is copied into
//! the surface's [`FrameBufferRenderer`](frame_renderer::FrameBufferRenderer) and a render
//! is dispatched onto the thread that hosts the [`ImageElement`]. The parent thread only
//! sees the host's anchor and negotiates layout through `measure`/`arrange`.

pub mod image_element;
pub mod image_host;
pub mod logging;
pub mod settings;
pub mod surface;

pub use image_element::{scale_factor, ImageElement, Stretch, StretchDirection};
pub use image_host::{ImageElementFactory, ImageHost, STRETCH, STRETCH_DIRECTION};
pub use settings::{HostSettings, PresentSyncMode, VideoSettings};
pub use surface::{FramePresenter, PresentOutcome, VideoSurfaceHost};
