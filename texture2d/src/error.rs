//! Error type used across the crate.

use thiserror::Error;

use crate::pixel_format::PixelFormat;

/// Convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, TextureError>;

/// Error returned by texture creation and device operations.
#[derive(Debug, Error)]
pub enum TextureError {
    /// Texture dimensions are zero, not a power of two, or above the device limit.
    #[error("invalid texture dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width in texels.
        width: u32,
        /// Requested height in texels.
        height: u32,
    },

    /// The content region does not fit into the allocated texture.
    #[error("content size {content_width}x{content_height} exceeds texture {width}x{height}")]
    ContentExceedsTexture {
        /// Content width in pixels.
        content_width: f32,
        /// Content height in pixels.
        content_height: f32,
        /// Allocated width in texels.
        width: u32,
        /// Allocated height in texels.
        height: u32,
    },

    /// Pixel buffer length does not match the declared format and size.
    #[error("pixel buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes.
        actual: usize,
    },

    /// The padded image is bigger than the largest texture the device supports.
    #[error("image of {width}x{height} is bigger than the supported {max}x{max}")]
    ImageTooLarge {
        /// Padded width.
        width: u32,
        /// Padded height.
        height: u32,
        /// Device limit.
        max: u32,
    },

    /// Malformed compressed-texture container.
    #[error("invalid PVR container: {0}")]
    InvalidPvr(String),

    /// The pixel format cannot be used for this operation or on this device.
    #[error("unsupported pixel format: {0:?}")]
    UnsupportedFormat(PixelFormat),

    /// The requested configuration is not valid for this texture.
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(&'static str),

    /// The device could not allocate the resource.
    #[error("graphics device is out of memory")]
    OutOfMemory,

    /// The texture has no GPU resource.
    #[error("texture is not initialized")]
    NotInitialized,

    /// Text could not be rendered.
    #[error("text rendering failed: {0}")]
    Text(String),

    /// Image could not be decoded.
    #[error("image decoding failed: {0}")]
    ImageDecode(String),

    /// Error reported by the GPU backend.
    #[error("gpu error: {0}")]
    Gpu(String),

    /// IO error while reading a file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TextureError {
    pub(crate) fn invalid_pvr(message: impl Into<String>) -> Self {
        Self::InvalidPvr(message.into())
    }
}
