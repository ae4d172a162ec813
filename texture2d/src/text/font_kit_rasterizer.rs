use std::path::Path;

use font_kit::canvas::{Canvas, Format, RasterizationOptions};
use font_kit::family_name::FamilyName;
use font_kit::font::Font;
use font_kit::hinting::HintingOptions;
use font_kit::properties::Properties;
use font_kit::source::{Source, SystemSource};
use pathfinder_geometry::transform2d::Transform2F;
use pathfinder_geometry::vector::{Vector2F, Vector2I};

use super::layout::{layout_lines, line_offset};
use super::{TextBitmap, TextRasterizer, TextRequest};
use crate::error::{Result, TextureError};

const FONT_FILE_EXTENSIONS: [&str; 3] = ["ttf", "otf", "ttc"];

/// [`TextRasterizer`] that renders with system fonts or font files through `font-kit`.
pub struct FontKitRasterizer {
    source: SystemSource,
}

impl FontKitRasterizer {
    /// Creates a rasterizer using the system font source.
    pub fn new() -> Self {
        Self {
            source: SystemSource::new(),
        }
    }

    fn load_font(&self, font_name: &str) -> Result<Font> {
        let path = Path::new(font_name);
        let is_file = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| FONT_FILE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));

        if is_file {
            return Font::from_path(path, 0).map_err(|err| {
                TextureError::Text(format!("failed to load font file {font_name}: {err}"))
            });
        }

        let family = match font_name {
            "" | "sans-serif" => FamilyName::SansSerif,
            "serif" => FamilyName::Serif,
            "monospace" => FamilyName::Monospace,
            name => FamilyName::Title(name.to_owned()),
        };

        self.source
            .select_best_match(&[family, FamilyName::SansSerif], &Properties::new())
            .map_err(|err| TextureError::Text(format!("font {font_name} not found: {err}")))?
            .load()
            .map_err(|err| TextureError::Text(format!("failed to load font {font_name}: {err}")))
    }
}

impl Default for FontKitRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRasterizer for FontKitRasterizer {
    fn rasterize(&self, request: &TextRequest<'_>) -> Result<TextBitmap> {
        if request.font_size <= 0.0 {
            return Err(TextureError::Text(format!("invalid font size {}", request.font_size)));
        }

        let font = self.load_font(request.font_name)?;
        let metrics = font.metrics();
        let scale = request.font_size / metrics.units_per_em as f32;
        let ascent = metrics.ascent * scale;
        let line_height = (metrics.ascent - metrics.descent + metrics.line_gap) * scale;

        let advance = |c: char| {
            font.glyph_for_char(c)
                .and_then(|glyph| font.advance(glyph).ok())
                .map(|advance| advance.x() * scale)
                .unwrap_or(0.0)
        };

        let lines = layout_lines(request.text, request.dimensions.map(|d| d.width), &advance);
        let text_width = lines.iter().fold(0.0f32, |width, line| width.max(line.width));
        let text_height = lines.len() as f32 * line_height;

        let (width, height, top) = match request.dimensions {
            Some(size) => (
                size.width.ceil() as u32,
                size.height.ceil() as u32,
                ((size.height - text_height) / 2.0).max(0.0),
            ),
            None => (text_width.ceil() as u32, text_height.ceil() as u32, 0.0),
        };

        if width == 0 || height == 0 {
            return Err(TextureError::Text("text produced an empty bitmap".into()));
        }

        let mut canvas = Canvas::new(Vector2I::new(width as i32, height as i32), Format::A8);
        for (index, line) in lines.iter().enumerate() {
            let mut x = line_offset(request.alignment, line.width, width as f32);
            let baseline = top + index as f32 * line_height + ascent;

            for c in line.text.chars() {
                if let Some(glyph) = font.glyph_for_char(c) {
                    font.rasterize_glyph(
                        &mut canvas,
                        glyph,
                        request.font_size,
                        Transform2F::from_translation(Vector2F::new(x, baseline)),
                        HintingOptions::None,
                        RasterizationOptions::GrayscaleAa,
                    )
                    .map_err(|err| {
                        TextureError::Text(format!("failed to rasterize {c:?}: {err}"))
                    })?;
                }
                x += advance(c);
            }
        }

        let mut data = Vec::with_capacity(width as usize * height as usize);
        for row in canvas.pixels.chunks(canvas.stride).take(height as usize) {
            data.extend_from_slice(&row[..width as usize]);
        }

        log::trace!(
            "Rasterized {} lines of text into {width}x{height} bitmap",
            lines.len()
        );

        Ok(TextBitmap { data, width, height })
    }
}
