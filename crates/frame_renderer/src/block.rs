use crate::error::{FrameError, Result};

/// Bytes per BGRA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// One producer frame: 32-bit BGRA rows of `stride` bytes.
///
/// Borrows the producer's buffer for the duration of a write only.
#[derive(Debug, Clone, Copy)]
pub struct FrameBlock<'a> {
    pixel_width: u32,
    pixel_height: u32,
    stride: usize,
    buffer: &'a [u8],
}

impl<'a> FrameBlock<'a> {
    /// Validates that every row fits in the buffer. The last row may omit its padding.
    pub fn new(pixel_width: u32, pixel_height: u32, stride: usize, buffer: &'a [u8]) -> Result<Self> {
        let row_bytes = pixel_width as usize * BYTES_PER_PIXEL;
        if stride == 0 || stride < row_bytes {
            return Err(FrameError::InvalidStride {
                width: pixel_width,
                stride,
            });
        }

        let invalid_length = |required| FrameError::InvalidLength {
            len: buffer.len(),
            height: pixel_height,
            stride,
            required,
        };
        let required = match pixel_height as usize {
            0 => Some(0),
            rows => stride
                .checked_mul(rows - 1)
                .and_then(|padded| padded.checked_add(row_bytes)),
        };
        let Some(required) = required else {
            return Err(invalid_length(usize::MAX));
        };
        if buffer.len() < required {
            return Err(invalid_length(required));
        }

        Ok(Self {
            pixel_width,
            pixel_height,
            stride,
            buffer,
        })
    }

    pub fn pixel_width(&self) -> u32 {
        self.pixel_width
    }

    pub fn pixel_height(&self) -> u32 {
        self.pixel_height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tightly_packed_frame() {
        let bytes = vec![0u8; 640 * 480 * 4];
        let block = FrameBlock::new(640, 480, 2560, &bytes).unwrap();
        assert_eq!(block.len(), 1_228_800);
        assert_eq!(block.stride(), 2560);
    }

    #[test]
    fn test_zero_stride_rejected() {
        let bytes = [0u8; 16];
        assert_eq!(
            FrameBlock::new(2, 2, 0, &bytes).unwrap_err(),
            FrameError::InvalidStride { width: 2, stride: 0 }
        );
    }

    #[test]
    fn test_stride_narrower_than_row_rejected() {
        let bytes = [0u8; 64];
        assert!(matches!(
            FrameBlock::new(4, 2, 12, &bytes),
            Err(FrameError::InvalidStride { .. })
        ));
    }

    #[test]
    fn test_short_buffer_rejected() {
        let bytes = [0u8; 20];
        let err = FrameBlock::new(2, 3, 8, &bytes).unwrap_err();
        assert_eq!(
            err,
            FrameError::InvalidLength {
                len: 20,
                height: 3,
                stride: 8,
                required: 24,
            }
        );
    }

    #[test]
    fn test_overflowing_row_span_rejected() {
        let bytes = [0u8; 64];
        let err = FrameBlock::new(1, 3, usize::MAX / 2 + 1, &bytes).unwrap_err();
        assert_eq!(
            err,
            FrameError::InvalidLength {
                len: 64,
                height: 3,
                stride: usize::MAX / 2 + 1,
                required: usize::MAX,
            }
        );
    }

    #[test]
    fn test_padded_rows_allow_short_last_row() {
        // 2 pixels wide, stride 16: last row needs only 8 bytes.
        let bytes = [0u8; 16 + 8];
        assert!(FrameBlock::new(2, 2, 16, &bytes).is_ok());
    }
}
