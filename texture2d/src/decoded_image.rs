//! Decoded raster images used as texture sources.

use crate::error::{Result, TextureError};

/// An image decoded into RGBA8888 rows, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    has_alpha: bool,
    bits_per_component: u8,
    premultiplied: bool,
}

impl DecodedImage {
    /// Creates an image from RGBA8888 bytes.
    ///
    /// `has_alpha` is detected from the data: the image has alpha if any texel is not opaque.
    pub fn new(bytes: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 {
            return Err(TextureError::InvalidDimensions { width, height });
        }
        if bytes.len() != expected {
            return Err(TextureError::BufferSizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        let has_alpha = bytes.chunks_exact(4).any(|texel| texel[3] != 255);
        Ok(Self {
            bytes,
            width,
            height,
            has_alpha,
            bits_per_component: 8,
            premultiplied: false,
        })
    }

    /// Marks the color channels as already multiplied by alpha.
    pub fn with_premultiplied_alpha(mut self, premultiplied: bool) -> Self {
        self.premultiplied = premultiplied;
        self
    }

    /// Overrides the alpha detection, e.g. when the source format declares an alpha channel.
    pub fn with_alpha(mut self, has_alpha: bool) -> Self {
        self.has_alpha = has_alpha;
        self
    }

    /// Sets the bit depth of the source color components.
    pub fn with_bits_per_component(mut self, bits: u8) -> Self {
        self.bits_per_component = bits;
        self
    }

    /// Decodes a PNG or JPEG image.
    #[cfg(feature = "image")]
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|err| TextureError::ImageDecode(err.to_string()))?;
        let declares_alpha = decoded.color().has_alpha();
        let color = decoded.color();
        let bits_per_component = (color.bits_per_pixel() / color.channel_count() as u16) as u8;
        let rgba = decoded.into_rgba8();
        let (width, height) = rgba.dimensions();

        let image = Self::new(rgba.into_raw(), width, height)?;
        let has_alpha = declares_alpha && image.has_alpha;

        log::trace!("Decoded image {width}x{height}, alpha: {has_alpha}");
        Ok(image
            .with_alpha(has_alpha)
            .with_bits_per_component(bits_per_component.min(8)))
    }

    /// Decodes an image file.
    #[cfg(feature = "image")]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes)
    }

    /// RGBA8888 texels.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the image has meaningful alpha.
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Bit depth of one color component of the source.
    pub fn bits_per_component(&self) -> u8 {
        self.bits_per_component
    }

    /// Whether the color channels are already premultiplied.
    pub fn is_premultiplied(&self) -> bool {
        self.premultiplied
    }
}
