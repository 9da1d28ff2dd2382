//! Double-buffered presentation of producer frames.
//!
//! The producer thread calls [`FrameBufferRenderer::write`]; the hosting thread calls
//! [`FrameBufferRenderer::render`]. A single lock serializes writes against each other and
//! against image rebuilds. The display image is rebuilt only when the region was reallocated,
//! which happens only when the incoming frame's byte length changes.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::block::FrameBlock;
use crate::error::{FrameError, Result};
use crate::image::DisplayImage;
use crate::region::SharedRegion;
use crate::sink::ImageSink;

/// Allocation and rebuild counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RendererStats {
    pub allocations: u64,
    pub rebuilds: u64,
    pub live_regions: usize,
    pub peak_live_regions: usize,
}

#[derive(Default)]
struct FrameBuffer {
    width: u32,
    height: u32,
    stride: usize,
    capacity: usize,
    region: Option<Arc<SharedRegion>>,
    image: Option<DisplayImage>,
    needs_rebuild: bool,
    disposed: bool,
    max_region_len: Option<usize>,
    stats: RendererStats,
}

impl FrameBuffer {
    fn release_region(&mut self) {
        self.image = None;
        if let Some(region) = self.region.take() {
            region.release();
            self.stats.live_regions -= 1;
        }
        self.capacity = 0;
        self.needs_rebuild = false;
    }

    fn reallocate(&mut self, len: usize) -> Result<&Arc<SharedRegion>> {
        self.release_region();
        if self.max_region_len.is_some_and(|max| len > max) {
            warn!(len, max = ?self.max_region_len, "frame exceeds region size limit");
            return Err(FrameError::RegionAllocation { len });
        }
        let region = Arc::new(SharedRegion::allocate(len)?);

        self.capacity = len;
        self.needs_rebuild = true;
        self.stats.allocations += 1;
        self.stats.live_regions += 1;
        self.stats.peak_live_regions = self.stats.peak_live_regions.max(self.stats.live_regions);
        debug!(region = region.id(), len, "frame region reallocated");
        Ok(&*self.region.insert(region))
    }
}

#[derive(Default)]
pub struct FrameBufferRenderer {
    buffer: Mutex<FrameBuffer>,
}

impl FrameBufferRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderer that refuses to allocate regions larger than `len` bytes.
    pub fn with_max_region_len(len: usize) -> Self {
        let renderer = Self::default();
        renderer.buffer.lock().max_region_len = Some(len);
        renderer
    }

    /// Copy a producer frame into the shared region.
    ///
    /// The copy completes before this returns, so the producer may reuse its buffer right
    /// away. A change in byte length releases the old region before allocating the new one.
    /// Allocation failure is returned and leaves the renderer without a region.
    pub fn write(&self, block: &FrameBlock<'_>) -> Result<()> {
        let mut buffer = self.buffer.lock();
        if buffer.disposed {
            return Err(FrameError::Disposed);
        }

        let region = match buffer.region.clone() {
            Some(region) if buffer.capacity == block.len() => region,
            _ => buffer.reallocate(block.len())?.clone(),
        };

        buffer.width = block.pixel_width();
        buffer.height = block.pixel_height();
        buffer.stride = block.stride();

        let copied = region.copy_from(block.buffer())?;
        trace!(region = region.id(), copied, "frame written");
        Ok(())
    }

    /// Publish the current frame to `sink`.
    ///
    /// Returns `false` when there is nothing to show yet or the renderer is disposed.
    pub fn render<S: ImageSink + ?Sized>(&self, sink: &mut S) -> bool {
        let image = {
            let mut buffer = self.buffer.lock();
            if buffer.disposed {
                return false;
            }
            if buffer.needs_rebuild && buffer.stride > 0 {
                if let Some(region) = buffer.region.clone() {
                    let image =
                        DisplayImage::new(region, buffer.width, buffer.height, buffer.stride);
                    debug!(
                        width = buffer.width,
                        height = buffer.height,
                        stride = buffer.stride,
                        "display image rebuilt"
                    );
                    buffer.image = Some(image);
                    buffer.needs_rebuild = false;
                    buffer.stats.rebuilds += 1;
                }
            }
            buffer.image.clone()
        };

        let Some(image) = image else {
            return false;
        };
        sink.set_source(image);
        sink.invalidate_visual();
        true
    }

    /// The image the next render would publish, if one has been built.
    pub fn image(&self) -> Option<DisplayImage> {
        self.buffer.lock().image.clone()
    }

    pub fn needs_rebuild(&self) -> bool {
        self.buffer.lock().needs_rebuild
    }

    pub fn capacity(&self) -> usize {
        self.buffer.lock().capacity
    }

    pub fn stats(&self) -> RendererStats {
        self.buffer.lock().stats
    }

    pub fn is_disposed(&self) -> bool {
        self.buffer.lock().disposed
    }

    /// Release the region and image. Later writes fail with [`FrameError::Disposed`].
    pub fn dispose(&self) {
        let mut buffer = self.buffer.lock();
        if !buffer.disposed {
            buffer.release_region();
            buffer.disposed = true;
            debug!("frame buffer renderer disposed");
        }
    }
}

impl Drop for FrameBufferRenderer {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[derive(Default)]
    struct RecordingSink {
        source: Option<DisplayImage>,
        invalidations: u32,
    }

    impl ImageSink for RecordingSink {
        fn set_source(&mut self, image: DisplayImage) {
            self.source = Some(image);
        }

        fn invalidate_visual(&mut self) {
            self.invalidations += 1;
        }
    }

    fn frame(width: u32, height: u32, fill: u8) -> (Vec<u8>, usize) {
        let stride = width as usize * 4;
        (vec![fill; stride * height as usize], stride)
    }

    #[test]
    fn test_render_before_write_shows_nothing() {
        let renderer = FrameBufferRenderer::new();
        let mut sink = RecordingSink::default();
        assert!(!renderer.render(&mut sink));
        assert!(sink.source.is_none());
        assert_eq!(sink.invalidations, 0);
    }

    #[test]
    fn test_resize_rebuilds_and_releases_previous_region() {
        let renderer = FrameBufferRenderer::new();
        let mut sink = RecordingSink::default();

        let (small, stride) = frame(640, 480, 0x11);
        assert_eq!((stride, small.len()), (2560, 1_228_800));
        renderer
            .write(&FrameBlock::new(640, 480, stride, &small).unwrap())
            .unwrap();
        assert!(renderer.render(&mut sink));

        let first = sink.source.clone().unwrap();
        assert_eq!((first.width(), first.height(), first.stride()), (640, 480, 2560));
        assert_eq!(first.pixel(639, 479), Some([0x11; 4]));

        let (large, stride) = frame(1280, 720, 0x22);
        assert_eq!((stride, large.len()), (5120, 3_686_400));
        renderer
            .write(&FrameBlock::new(1280, 720, stride, &large).unwrap())
            .unwrap();
        assert!(renderer.needs_rebuild());
        // The old image can no longer read its region.
        assert_eq!(first.pixel(0, 0), None);

        assert!(renderer.render(&mut sink));
        let second = sink.source.clone().unwrap();
        assert_eq!((second.width(), second.height(), second.stride()), (1280, 720, 5120));
        assert_eq!(second.pixel(1279, 719), Some([0x22; 4]));
        assert!(!second.shares_region(&first));

        let stats = renderer.stats();
        assert_eq!(stats.allocations, 2);
        assert_eq!(stats.rebuilds, 2);
        assert_eq!(stats.live_regions, 1);
        assert_eq!(stats.peak_live_regions, 1);
    }

    #[test]
    fn test_unchanged_length_reuses_region_and_image() {
        let renderer = FrameBufferRenderer::new();
        let mut sink = RecordingSink::default();

        let mut first = None;
        for fill in 0..10u8 {
            let (bytes, stride) = frame(8, 8, fill);
            renderer
                .write(&FrameBlock::new(8, 8, stride, &bytes).unwrap())
                .unwrap();
            assert!(renderer.render(&mut sink));
            let shown = sink.source.clone().unwrap();
            assert_eq!(shown.pixel(3, 3), Some([fill; 4]));
            let first = first.get_or_insert_with(|| shown.clone());
            assert!(shown.shares_region(first));
        }

        let stats = renderer.stats();
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.rebuilds, 1);
        assert_eq!(sink.invalidations, 10);
    }

    #[test]
    fn test_length_change_without_render_rebuilds_once() {
        let renderer = FrameBufferRenderer::new();
        let mut sink = RecordingSink::default();

        let (a, stride_a) = frame(4, 4, 1);
        let (b, stride_b) = frame(8, 8, 2);
        let (c, stride_c) = frame(8, 8, 3);
        renderer.write(&FrameBlock::new(4, 4, stride_a, &a).unwrap()).unwrap();
        renderer.write(&FrameBlock::new(8, 8, stride_b, &b).unwrap()).unwrap();
        renderer.write(&FrameBlock::new(8, 8, stride_c, &c).unwrap()).unwrap();
        assert_eq!(renderer.capacity(), c.len());

        renderer.render(&mut sink);
        renderer.render(&mut sink);

        let stats = renderer.stats();
        assert_eq!(stats.allocations, 2);
        assert_eq!(stats.rebuilds, 1);
        assert_eq!(sink.source.unwrap().pixel(7, 7), Some([3; 4]));
    }

    #[test]
    fn test_same_dimensions_new_stride_reallocates() {
        let renderer = FrameBufferRenderer::new();
        let mut sink = RecordingSink::default();

        let packed = vec![5u8; 16 * 2];
        renderer.write(&FrameBlock::new(4, 2, 16, &packed).unwrap()).unwrap();
        renderer.render(&mut sink);

        let padded = vec![6u8; 32 * 2];
        renderer.write(&FrameBlock::new(4, 2, 32, &padded).unwrap()).unwrap();
        renderer.render(&mut sink);

        assert_eq!(renderer.stats().allocations, 2);
        assert_eq!(sink.source.unwrap().stride(), 32);
    }

    #[test]
    fn test_failed_reallocation_leaves_no_region_and_next_write_retries() {
        let (small, small_stride) = frame(4, 4, 1);
        let renderer = FrameBufferRenderer::with_max_region_len(small.len());
        let mut sink = RecordingSink::default();

        renderer
            .write(&FrameBlock::new(4, 4, small_stride, &small).unwrap())
            .unwrap();
        assert!(renderer.render(&mut sink));
        let shown = sink.source.clone().unwrap();

        let (large, large_stride) = frame(8, 8, 2);
        assert_eq!(
            renderer.write(&FrameBlock::new(8, 8, large_stride, &large).unwrap()),
            Err(FrameError::RegionAllocation { len: large.len() })
        );
        assert_eq!(renderer.capacity(), 0);
        assert!(renderer.image().is_none());
        assert!(!renderer.needs_rebuild());
        assert_eq!(renderer.stats().live_regions, 0);
        assert_eq!(shown.pixel(0, 0), None);
        assert!(!renderer.render(&mut sink));

        let (retry, retry_stride) = frame(4, 4, 3);
        renderer
            .write(&FrameBlock::new(4, 4, retry_stride, &retry).unwrap())
            .unwrap();
        assert!(renderer.render(&mut sink));
        assert_eq!(sink.source.unwrap().pixel(3, 3), Some([3; 4]));

        let stats = renderer.stats();
        assert_eq!(stats.allocations, 2);
        assert_eq!(stats.rebuilds, 2);
        assert_eq!(stats.live_regions, 1);
    }

    #[test]
    fn test_dispose_releases_and_rejects_writes() {
        let renderer = FrameBufferRenderer::new();
        let mut sink = RecordingSink::default();
        let (bytes, stride) = frame(2, 2, 9);
        let block = FrameBlock::new(2, 2, stride, &bytes).unwrap();
        renderer.write(&block).unwrap();
        renderer.render(&mut sink);

        renderer.dispose();
        assert!(renderer.is_disposed());
        assert_eq!(renderer.write(&block), Err(FrameError::Disposed));
        assert!(!renderer.render(&mut sink));
        assert_eq!(sink.source.unwrap().pixel(0, 0), None);
        assert_eq!(renderer.stats().live_regions, 0);
    }

    #[test]
    fn test_concurrent_render_never_sees_torn_frame() {
        let renderer = Arc::new(FrameBufferRenderer::new());
        let done = Arc::new(AtomicBool::new(false));

        let producer = {
            let renderer = renderer.clone();
            let done = done.clone();
            thread::spawn(move || {
                for fill in 0..=255u8 {
                    let (bytes, stride) = frame(64, 64, fill);
                    renderer
                        .write(&FrameBlock::new(64, 64, stride, &bytes).unwrap())
                        .unwrap();
                }
                done.store(true, Ordering::Release);
            })
        };

        let mut sink = RecordingSink::default();
        let mut last_seen = 0u8;
        loop {
            let finished = done.load(Ordering::Acquire);
            if renderer.render(&mut sink) {
                let image = sink.source.as_ref().unwrap();
                let (first, uniform) = image
                    .with_pixels(|bytes| (bytes[0], bytes.iter().all(|&b| b == bytes[0])))
                    .unwrap();
                assert!(uniform, "frame {first} was torn");
                assert!(first >= last_seen, "older frame shown after a newer one");
                last_seen = first;
            }
            if finished {
                break;
            }
        }
        producer.join().unwrap();

        // Producer finished before the last render began.
        assert_eq!(last_seen, 255);
    }
}
