//! Zero-copy frame buffer renderer.
//!
//! A producer thread copies BGRA frames into a [`SharedRegion`] through
//! [`FrameBufferRenderer::write`]. The hosting thread publishes a [`DisplayImage`] bound
//! to that region to an [`ImageSink`] through [`FrameBufferRenderer::render`]. Frames of
//! unchanged size reuse both the region and the image, so the only per-frame copy is the
//! producer's write.

mod block;
mod error;
mod image;
mod region;
mod renderer;
mod sink;
mod vsync;

pub use block::{FrameBlock, BYTES_PER_PIXEL};
pub use error::{FrameError, Result};
pub use image::{DisplayImage, PixelFormat};
pub use region::SharedRegion;
pub use renderer::{FrameBufferRenderer, RendererStats};
pub use sink::ImageSink;
pub use vsync::{IntervalPresentSync, NoPresentSync, PresentSync};
