use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("failed to allocate a shared region of {len} bytes")]
    RegionAllocation { len: usize },

    #[error("stride of {stride} bytes cannot hold a {width} pixel BGRA row")]
    InvalidStride { width: u32, stride: usize },

    #[error("buffer of {len} bytes is too short for {height} rows of stride {stride} (need {required})")]
    InvalidLength {
        len: usize,
        height: u32,
        stride: usize,
        required: usize,
    },

    #[error("frame buffer renderer has been disposed")]
    Disposed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
