//! Texel formats a texture can be stored in.

/// Storage format of the texels of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PixelFormat {
    /// Pick the format automatically. Resolves to [`PixelFormat::DEFAULT`].
    #[default]
    Automatic,
    /// 32-bit texture: RGBA8888.
    Rgba8888,
    /// 24-bit texture: RGB888.
    Rgb888,
    /// 16-bit texture without alpha channel.
    Rgb565,
    /// 8-bit texture used as a mask.
    A8,
    /// 8-bit intensity texture.
    I8,
    /// 16-bit intensity + alpha texture.
    Ai88,
    /// 16-bit texture: RGBA4444.
    Rgba4444,
    /// 16-bit texture: RGB5A1.
    Rgb5a1,
    /// 4-bit PVRTC-compressed texture.
    Pvrtc4,
    /// 2-bit PVRTC-compressed texture.
    Pvrtc2,
}

impl PixelFormat {
    /// Format used when nothing else is requested.
    pub const DEFAULT: PixelFormat = PixelFormat::Rgba8888;

    /// Maps [`PixelFormat::Automatic`] to the default format.
    pub fn resolve(self) -> PixelFormat {
        match self {
            PixelFormat::Automatic => Self::DEFAULT,
            other => other,
        }
    }

    /// Bits used by one texel in GPU memory.
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Automatic | PixelFormat::Rgba8888 => 32,
            PixelFormat::Rgb888 => 24,
            PixelFormat::Rgb565 | PixelFormat::Rgba4444 | PixelFormat::Rgb5a1 => 16,
            PixelFormat::Ai88 => 16,
            PixelFormat::A8 | PixelFormat::I8 => 8,
            PixelFormat::Pvrtc4 => 4,
            PixelFormat::Pvrtc2 => 2,
        }
    }

    /// Whether texels carry an alpha channel.
    pub fn has_alpha(self) -> bool {
        matches!(
            self.resolve(),
            PixelFormat::Rgba8888
                | PixelFormat::A8
                | PixelFormat::Ai88
                | PixelFormat::Rgba4444
                | PixelFormat::Rgb5a1
                | PixelFormat::Pvrtc4
                | PixelFormat::Pvrtc2
        )
    }

    /// Whether the format is block-compressed.
    pub fn is_compressed(self) -> bool {
        matches!(self, PixelFormat::Pvrtc4 | PixelFormat::Pvrtc2)
    }

    /// Byte length of one uncompressed level of the given size.
    ///
    /// Returns `None` for compressed formats, whose size depends on the block layout, and
    /// when the size does not fit into `usize`.
    pub fn buffer_len(self, width: u32, height: u32) -> Option<usize> {
        if self.is_compressed() {
            return None;
        }

        let bytes_per_pixel = (self.bits_per_pixel() / 8) as usize;
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(bytes_per_pixel)
    }
}
