//! Rendering text into alpha bitmaps.

#[cfg(feature = "font-kit")]
mod font_kit_rasterizer;
pub mod layout;

#[cfg(feature = "font-kit")]
pub use font_kit_rasterizer::FontKitRasterizer;

use crate::error::Result;
use crate::geometry::Size;

/// Horizontal alignment of text lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextAlignment {
    /// Lines start at the left edge.
    Left,
    /// Lines are centered.
    #[default]
    Center,
    /// Lines end at the right edge.
    Right,
}

/// What to render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextRequest<'a> {
    /// Text, `\n` separates lines.
    pub text: &'a str,
    /// Font family name, or a path to a font file.
    pub font_name: &'a str,
    /// Font size in pixels.
    pub font_size: f32,
    /// Box to lay the text out in. `None` sizes the bitmap to fit the text.
    pub dimensions: Option<Size>,
    /// Horizontal alignment inside the bitmap.
    pub alignment: TextAlignment,
}

/// 8-bit coverage bitmap, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBitmap {
    /// One coverage byte per pixel.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Renders text into an A8 bitmap.
pub trait TextRasterizer {
    /// Renders the request.
    ///
    /// With `dimensions` set, the bitmap has the box size (rounded up) and the text block is
    /// centered vertically. Without, it tightly fits all lines.
    fn rasterize(&self, request: &TextRequest<'_>) -> Result<TextBitmap>;
}
