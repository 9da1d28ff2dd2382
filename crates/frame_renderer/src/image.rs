use std::sync::Arc;

use crate::block::BYTES_PER_PIXEL;
use crate::error::Result;
use crate::region::SharedRegion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    #[default]
    Bgra8,
}

/// Display image that reads its pixels straight out of a [`SharedRegion`].
///
/// Cloning shares the region. Pixels reflect whatever the writer last copied in.
#[derive(Debug, Clone)]
pub struct DisplayImage {
    region: Arc<SharedRegion>,
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
}

impl DisplayImage {
    pub(crate) fn new(region: Arc<SharedRegion>, width: u32, height: u32, stride: usize) -> Self {
        Self {
            region,
            width,
            height,
            stride,
            format: PixelFormat::Bgra8,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// True when both images present the same region.
    pub fn shares_region(&self, other: &DisplayImage) -> bool {
        Arc::ptr_eq(&self.region, &other.region)
    }

    /// Borrow the raw BGRA bytes for the duration of `f`.
    pub fn with_pixels<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        self.region.read(f)
    }

    /// BGRA value at `(x, y)`, `None` outside the image or once the region is gone.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.stride + x as usize * BYTES_PER_PIXEL;
        self.region
            .read(|bytes| {
                bytes
                    .get(offset..offset + BYTES_PER_PIXEL)
                    .map(|px| [px[0], px[1], px[2], px[3]])
            })
            .ok()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_addresses_rows_by_stride() {
        let region = Arc::new(SharedRegion::allocate(2 * 12).unwrap());
        let mut bytes = vec![0u8; 24];
        // Row 1, pixel 1 at 12 + 4.
        bytes[16..20].copy_from_slice(&[1, 2, 3, 4]);
        region.copy_from(&bytes).unwrap();

        let image = DisplayImage::new(region, 2, 2, 12);
        assert_eq!(image.pixel(1, 1), Some([1, 2, 3, 4]));
        assert_eq!(image.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(image.pixel(2, 0), None);
        assert_eq!(image.format(), PixelFormat::Bgra8);
    }

    #[test]
    fn test_pixel_after_release_is_none() {
        let region = Arc::new(SharedRegion::allocate(4).unwrap());
        let image = DisplayImage::new(region.clone(), 1, 1, 4);
        region.release();
        assert_eq!(image.pixel(0, 0), None);
    }
}
