//! GPU-resident 2D texture with its sampler state.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

use crate::config::TextureConfig;
use crate::decoded_image::DecodedImage;
use crate::device::{
    BlendMode, GpuResource, GraphicsDevice, MagFilter, MinFilter, MipLevel, QuadVertex, SamplerId,
    TexParams, TextureDescriptor, TextureId, TexturedQuad, WrapMode,
};
use crate::error::{Result, TextureError};
use crate::geometry::{is_power_of_two, next_power_of_two, Point, Rect, Size};
use crate::pixel_convert::{pack_rgba8, pad_a8, pad_rgba8, premultiply_rgba8};
use crate::pixel_format::PixelFormat;
use crate::pvr::PvrContainer;
use crate::text::{TextAlignment, TextRasterizer, TextRequest};

const MIN_PVRTC_LEVEL_SIZE: usize = 32;

/// Asset resolution variant a texture was loaded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResolutionType {
    /// Not known.
    #[default]
    Unknown,
    /// Standard density phone assets.
    Standard,
    /// Double density phone assets.
    HighDensity,
    /// Standard density tablet assets.
    Tablet,
    /// Double density tablet assets.
    TabletHighDensity,
}

impl ResolutionType {
    /// Number of pixels per point for assets of this resolution.
    pub fn scale_factor(self) -> f32 {
        match self {
            ResolutionType::HighDensity | ResolutionType::TabletHighDensity => 2.0,
            ResolutionType::Unknown | ResolutionType::Standard | ResolutionType::Tablet => 1.0,
        }
    }
}

struct Upload<'a> {
    format: PixelFormat,
    has_alpha: bool,
    width: u32,
    height: u32,
    content_size: Size,
    levels: Vec<MipLevel<'a>>,
    premultiplied: bool,
}

/// A 2D texture on a [`GraphicsDevice`].
///
/// Textures created from data, images and text always have power-of-two dimensions. The used
/// part of the texture may be smaller than the allocation, i.e. `content_size_in_pixels` may
/// differ from `(pixels_wide, pixels_high)` and `(max_s, max_t)` from `(1.0, 1.0)`.
///
/// Texel rows are stored top row first, so the image appears upside-down in a y-up space;
/// [`Texture2D::draw_at_point`] and [`Texture2D::draw_in_rect`] compensate for that.
pub struct Texture2D {
    device: Arc<dyn GraphicsDevice>,
    resource: Option<GpuResource>,
    pixel_format: PixelFormat,
    pixels_wide: u32,
    pixels_high: u32,
    content_size: Size,
    max_s: f32,
    max_t: f32,
    has_premultiplied_alpha: bool,
    has_mipmaps: bool,
    resolution_type: ResolutionType,
}

impl Texture2D {
    /// Creates an uninitialized texture on the device.
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self {
            device,
            resource: None,
            pixel_format: PixelFormat::Automatic,
            pixels_wide: 0,
            pixels_high: 0,
            content_size: Size::ZERO,
            max_s: 0.0,
            max_t: 0.0,
            has_premultiplied_alpha: false,
            has_mipmaps: false,
            resolution_type: ResolutionType::Unknown,
        }
    }

    /// Initializes the texture from texels already stored in `pixel_format`.
    ///
    /// Dimensions must be powers of two and `content_size` must fit into them.
    pub fn init_with_data(
        &mut self,
        data: &[u8],
        pixel_format: PixelFormat,
        pixels_wide: u32,
        pixels_high: u32,
        content_size: Size,
    ) -> Result<()> {
        self.release();

        let format = pixel_format.resolve();
        if format.is_compressed() {
            return Err(TextureError::UnsupportedFormat(format));
        }
        self.check_pot_dimensions(pixels_wide, pixels_high)?;
        check_content_size(content_size, pixels_wide, pixels_high)?;
        check_buffer_len(data, format, pixels_wide, pixels_high)?;

        self.install(Upload {
            format,
            has_alpha: format.has_alpha(),
            width: pixels_wide,
            height: pixels_high,
            content_size,
            levels: vec![MipLevel {
                width: pixels_wide,
                height: pixels_high,
                data,
            }],
            premultiplied: false,
        })
    }

    /// Initializes the texture from a decoded image using the process-wide [`TextureConfig`].
    ///
    /// Alpha textures have their color premultiplied; blend them with `(ONE, ONE_MINUS_SRC_ALPHA)`.
    pub fn init_with_image(&mut self, image: &DecodedImage) -> Result<()> {
        self.init_with_image_config(image, ResolutionType::Unknown, &TextureConfig::global())
    }

    /// Same as [`Texture2D::init_with_image`], tagging the texture with a resolution type.
    pub fn init_with_image_and_resolution(
        &mut self,
        image: &DecodedImage,
        resolution_type: ResolutionType,
    ) -> Result<()> {
        self.init_with_image_config(image, resolution_type, &TextureConfig::global())
    }

    /// Initializes the texture from a decoded image with explicit settings.
    ///
    /// Images with alpha use `config.default_alpha_pixel_format`, images without alpha use
    /// RGB888 (RGB565 for sources with less than 8 bits per component). The image is padded
    /// to power-of-two dimensions.
    pub fn init_with_image_config(
        &mut self,
        image: &DecodedImage,
        resolution_type: ResolutionType,
        config: &TextureConfig,
    ) -> Result<()> {
        self.release();

        let format = if image.has_alpha() {
            config.default_alpha_pixel_format.resolve()
        } else if image.bits_per_component() >= 8 {
            PixelFormat::Rgb888
        } else {
            PixelFormat::Rgb565
        };
        if format.is_compressed() {
            return Err(TextureError::UnsupportedFormat(format));
        }

        let (width, height) = self.padded_size(image.width(), image.height())?;
        let mut rgba = pad_rgba8(image.bytes(), image.width(), image.height(), width, height);
        let premultiplied = format.has_alpha();
        if premultiplied && !image.is_premultiplied() {
            premultiply_rgba8(&mut rgba);
        }
        let data = pack_rgba8(&rgba, format)?;

        self.install(Upload {
            format,
            has_alpha: format.has_alpha(),
            width,
            height,
            content_size: Size::new(image.width() as f32, image.height() as f32),
            levels: vec![MipLevel {
                width,
                height,
                data: &data,
            }],
            premultiplied,
        })?;
        self.resolution_type = resolution_type;

        Ok(())
    }

    /// Initializes an A8 texture with text sized to fit.
    ///
    /// Blend text textures with `(SRC_ALPHA, ONE_MINUS_SRC_ALPHA)`.
    pub fn init_with_string(
        &mut self,
        text: &str,
        font_name: &str,
        font_size: f32,
        rasterizer: &dyn TextRasterizer,
    ) -> Result<()> {
        self.init_with_text_request(
            &TextRequest {
                text,
                font_name,
                font_size,
                dimensions: None,
                alignment: TextAlignment::Center,
            },
            rasterizer,
        )
    }

    /// Initializes an A8 texture with text laid out inside a box.
    pub fn init_with_string_in_box(
        &mut self,
        text: &str,
        dimensions: Size,
        alignment: TextAlignment,
        font_name: &str,
        font_size: f32,
        rasterizer: &dyn TextRasterizer,
    ) -> Result<()> {
        self.init_with_text_request(
            &TextRequest {
                text,
                font_name,
                font_size,
                dimensions: Some(dimensions),
                alignment,
            },
            rasterizer,
        )
    }

    fn init_with_text_request(
        &mut self,
        request: &TextRequest<'_>,
        rasterizer: &dyn TextRasterizer,
    ) -> Result<()> {
        self.release();

        let bitmap = rasterizer.rasterize(request)?;
        if bitmap.width == 0 || bitmap.height == 0 {
            return Err(TextureError::Text("text produced an empty bitmap".into()));
        }
        check_buffer_len(&bitmap.data, PixelFormat::A8, bitmap.width, bitmap.height)?;

        let (width, height) = self.padded_size(bitmap.width, bitmap.height)?;
        let data = pad_a8(&bitmap.data, bitmap.width, bitmap.height, width, height);

        self.install(Upload {
            format: PixelFormat::A8,
            has_alpha: true,
            width,
            height,
            content_size: Size::new(bitmap.width as f32, bitmap.height as f32),
            levels: vec![MipLevel {
                width,
                height,
                data: &data,
            }],
            premultiplied: false,
        })
    }

    /// Initializes a square PVRTC texture from raw compressed data using the process-wide config.
    pub fn init_with_pvrtc_data(
        &mut self,
        data: &[u8],
        level: u32,
        bpp: u32,
        has_alpha: bool,
        length: u32,
        pixel_format: PixelFormat,
    ) -> Result<()> {
        self.init_with_pvrtc_data_config(
            data,
            level,
            bpp,
            has_alpha,
            length,
            pixel_format,
            &TextureConfig::global(),
        )
    }

    /// Initializes a square `length x length` PVRTC texture from raw compressed data.
    ///
    /// Only base levels (`level == 0`) can be uploaded into a standalone texture.
    #[allow(clippy::too_many_arguments)]
    pub fn init_with_pvrtc_data_config(
        &mut self,
        data: &[u8],
        level: u32,
        bpp: u32,
        has_alpha: bool,
        length: u32,
        pixel_format: PixelFormat,
        config: &TextureConfig,
    ) -> Result<()> {
        self.release();

        let format = pixel_format.resolve();
        if !format.is_compressed() || !self.device.supports_format(format) {
            return Err(TextureError::UnsupportedFormat(format));
        }
        if bpp != format.bits_per_pixel() {
            return Err(TextureError::UnsupportedConfiguration(
                "bits per pixel do not match the PVRTC format",
            ));
        }
        if level != 0 {
            return Err(TextureError::UnsupportedConfiguration(
                "only the base level of a PVRTC texture can be uploaded",
            ));
        }
        self.check_pot_dimensions(length, length)?;

        let size = (length as usize * length as usize * bpp as usize / 8).max(MIN_PVRTC_LEVEL_SIZE);
        if data.len() < size {
            return Err(TextureError::BufferSizeMismatch {
                expected: size,
                actual: data.len(),
            });
        }

        self.install(Upload {
            format,
            has_alpha,
            width: length,
            height: length,
            content_size: Size::new(length as f32, length as f32),
            levels: vec![MipLevel {
                width: length,
                height: length,
                data: &data[..size],
            }],
            premultiplied: config.pvr_images_have_premultiplied_alpha,
        })
    }

    /// Initializes the texture from a PVR container file using the process-wide config.
    pub fn init_with_pvr_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.init_with_pvr_file_config(path, &TextureConfig::global())
    }

    /// Initializes the texture from a PVR container file.
    pub fn init_with_pvr_file_config(
        &mut self,
        path: impl AsRef<Path>,
        config: &TextureConfig,
    ) -> Result<()> {
        self.release();

        let bytes = std::fs::read(path.as_ref()).map_err(|err| {
            log::error!("Failed to read PVR file {}: {err}", path.as_ref().display());
            TextureError::Io(err)
        })?;
        self.init_with_pvr_bytes_config(Bytes::from(bytes), config)
    }

    /// Initializes the texture from an in-memory PVR container using the process-wide config.
    pub fn init_with_pvr_bytes(&mut self, bytes: Bytes) -> Result<()> {
        self.init_with_pvr_bytes_config(bytes, &TextureConfig::global())
    }

    /// Initializes the texture from an in-memory PVR container.
    ///
    /// All mip levels of the container are uploaded without decompression. Whether alpha is
    /// premultiplied is taken from `config`, not from the file.
    pub fn init_with_pvr_bytes_config(
        &mut self,
        bytes: Bytes,
        config: &TextureConfig,
    ) -> Result<()> {
        self.release();

        let container = PvrContainer::parse(bytes)?;
        if !self.device.supports_format(container.format) {
            return Err(TextureError::UnsupportedFormat(container.format));
        }
        self.check_dimensions(container.width, container.height)?;

        let levels = container
            .levels
            .iter()
            .map(|level| MipLevel {
                width: level.width,
                height: level.height,
                data: &level.data,
            })
            .collect();

        self.install(Upload {
            format: container.format,
            has_alpha: container.has_alpha,
            width: container.width,
            height: container.height,
            content_size: Size::new(container.width as f32, container.height as f32),
            levels,
            premultiplied: config.pvr_images_have_premultiplied_alpha,
        })
    }

    fn install(&mut self, upload: Upload<'_>) -> Result<()> {
        let has_mipmaps = upload.levels.len() > 1;
        let params = default_params(upload.width, upload.height, upload.content_size, has_mipmaps);
        let descriptor = TextureDescriptor {
            width: upload.width,
            height: upload.height,
            format: upload.format,
            has_alpha: upload.has_alpha,
        };

        let resource = GpuResource::create(self.device.clone(), &descriptor, &upload.levels, params)
            .inspect_err(|err| {
                log::error!(
                    "Failed to create {}x{} {:?} texture: {err}",
                    upload.width,
                    upload.height,
                    upload.format
                )
            })?;

        self.pixel_format = upload.format;
        self.pixels_wide = upload.width;
        self.pixels_high = upload.height;
        self.content_size = upload.content_size;
        self.max_s = upload.content_size.width / upload.width as f32;
        self.max_t = upload.content_size.height / upload.height as f32;
        self.has_premultiplied_alpha = upload.premultiplied;
        self.has_mipmaps = has_mipmaps;
        self.resource = Some(resource);

        log::debug!("Created {self}");
        Ok(())
    }

    /// Frees the GPU resource and returns the texture to the uninitialized state.
    pub fn release(&mut self) {
        self.resource = None;
        self.pixel_format = PixelFormat::Automatic;
        self.pixels_wide = 0;
        self.pixels_high = 0;
        self.content_size = Size::ZERO;
        self.max_s = 0.0;
        self.max_t = 0.0;
        self.has_premultiplied_alpha = false;
        self.has_mipmaps = false;
    }

    fn check_dimensions(&self, width: u32, height: u32) -> Result<()> {
        let max = self.device.max_texture_size();
        if width == 0 || height == 0 || width > max || height > max {
            return Err(TextureError::InvalidDimensions { width, height });
        }

        Ok(())
    }

    fn check_pot_dimensions(&self, width: u32, height: u32) -> Result<()> {
        if !is_power_of_two(width) || !is_power_of_two(height) {
            return Err(TextureError::InvalidDimensions { width, height });
        }

        self.check_dimensions(width, height)
    }

    fn padded_size(&self, width: u32, height: u32) -> Result<(u32, u32)> {
        let padded_width = next_power_of_two(width);
        let padded_height = next_power_of_two(height);
        let max = self.device.max_texture_size();
        if padded_width > max || padded_height > max {
            return Err(TextureError::ImageTooLarge {
                width: padded_width,
                height: padded_height,
                max,
            });
        }

        Ok((padded_width, padded_height))
    }

    /// Whether wrap modes are restricted to clamp-to-edge.
    ///
    /// This is the case when the allocation is not a power of two or the content does not
    /// fill it, since repeating would sample the padding.
    pub fn requires_edge_clamp(&self) -> bool {
        requires_edge_clamp(self.pixels_wide, self.pixels_high, self.content_size)
    }

    /// Sets filters and wrap modes.
    ///
    /// Wrap modes other than clamp-to-edge are replaced with clamp-to-edge when
    /// [`Texture2D::requires_edge_clamp`] is true. Mipmap filters on a texture without mipmaps
    /// are replaced with their base-level counterparts. Both replacements log a warning.
    pub fn set_tex_parameters(&mut self, params: TexParams) -> Result<()> {
        let requires_clamp = self.requires_edge_clamp();
        let resource = self.resource.as_mut().ok_or(TextureError::NotInitialized)?;

        let mut params = params;
        let repeats =
            params.wrap_s != WrapMode::ClampToEdge || params.wrap_t != WrapMode::ClampToEdge;
        if requires_clamp && repeats {
            log::warn!(
                "Texture {} is {}x{} with {}x{} content and can only use clamp-to-edge wrapping, requested {:?}/{:?}",
                resource.texture().raw(),
                self.pixels_wide,
                self.pixels_high,
                self.content_size.width,
                self.content_size.height,
                params.wrap_s,
                params.wrap_t
            );
            params = params.with_wrap(WrapMode::ClampToEdge);
        }

        if params.min_filter.uses_mipmaps() && !self.has_mipmaps {
            log::warn!(
                "Texture {} has no mipmaps, using {:?} instead of {:?}",
                resource.texture().raw(),
                params.min_filter.without_mipmaps(),
                params.min_filter
            );
            params.min_filter = params.min_filter.without_mipmaps();
        }

        resource.replace_sampler(params)
    }

    /// Sets linear filtering, keeping the wrap modes.
    pub fn set_anti_alias_tex_parameters(&mut self) -> Result<()> {
        let current = self.tex_params().ok_or(TextureError::NotInitialized)?;
        let min_filter = if self.has_mipmaps {
            MinFilter::LinearMipmapNearest
        } else {
            MinFilter::Linear
        };

        self.set_tex_parameters(TexParams {
            min_filter,
            mag_filter: MagFilter::Linear,
            ..current
        })
    }

    /// Sets nearest filtering, keeping the wrap modes.
    pub fn set_alias_tex_parameters(&mut self) -> Result<()> {
        let current = self.tex_params().ok_or(TextureError::NotInitialized)?;
        let min_filter = if self.has_mipmaps {
            MinFilter::NearestMipmapNearest
        } else {
            MinFilter::Nearest
        };

        self.set_tex_parameters(TexParams {
            min_filter,
            mag_filter: MagFilter::Nearest,
            ..current
        })
    }

    /// Builds the mip chain on the device.
    ///
    /// Fails for uninitialized textures, non-power-of-two allocations and compressed formats.
    pub fn generate_mipmap(&mut self) -> Result<()> {
        let resource = self.resource.as_ref().ok_or(TextureError::NotInitialized)?;
        if !is_power_of_two(self.pixels_wide) || !is_power_of_two(self.pixels_high) {
            return Err(TextureError::UnsupportedConfiguration(
                "mipmaps require power-of-two dimensions",
            ));
        }
        if self.pixel_format.is_compressed() {
            return Err(TextureError::UnsupportedConfiguration(
                "mipmaps cannot be generated for compressed textures",
            ));
        }

        let levels = resource.device().generate_mipmaps(resource.texture())?;
        log::debug!("Texture {} now has {levels} mip levels", resource.texture().raw());
        self.has_mipmaps = true;

        Ok(())
    }

    /// Bits per texel of the texture's pixel format.
    pub fn bits_per_pixel_for_format(&self) -> u32 {
        self.pixel_format.bits_per_pixel()
    }

    /// Draws the used region of the texture with its bottom-left corner at `point`.
    pub fn draw_at_point(&self, point: Point) {
        let width = self.pixels_wide as f32 * self.max_s;
        let height = self.pixels_high as f32 * self.max_t;
        self.draw_in_rect(Rect::new(point.x, point.y, width, height));
    }

    /// Draws the used region of the texture stretched over `rect`.
    pub fn draw_in_rect(&self, rect: Rect) {
        let Some(resource) = &self.resource else {
            log::debug!("Ignoring draw of an uninitialized texture");
            return;
        };

        let vertex = |x: f32, y: f32, s: f32, t: f32| QuadVertex {
            position: Point::new(x, y),
            uv: Point::new(s, t),
        };
        let (max_s, max_t) = (self.max_s, self.max_t);

        resource.device().draw_quad(&TexturedQuad {
            texture: resource.texture(),
            sampler: resource.sampler(),
            blend: if self.has_premultiplied_alpha {
                BlendMode::Premultiplied
            } else {
                BlendMode::Alpha
            },
            vertices: [
                vertex(rect.min_x(), rect.min_y(), 0.0, max_t),
                vertex(rect.max_x(), rect.min_y(), max_s, max_t),
                vertex(rect.min_x(), rect.max_y(), 0.0, 0.0),
                vertex(rect.max_x(), rect.max_y(), max_s, 0.0),
            ],
        });
    }

    /// Whether the texture holds a GPU resource.
    pub fn is_initialized(&self) -> bool {
        self.resource.is_some()
    }

    /// Pixel format. [`PixelFormat::Automatic`] when uninitialized.
    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// Allocated width in texels.
    pub fn pixels_wide(&self) -> u32 {
        self.pixels_wide
    }

    /// Allocated height in texels.
    pub fn pixels_high(&self) -> u32 {
        self.pixels_high
    }

    /// Raw handle of the GPU texture, `0` when uninitialized.
    pub fn name(&self) -> u32 {
        self.resource.as_ref().map_or(0, |r| r.texture().raw())
    }

    /// GPU texture handle.
    pub fn texture_id(&self) -> Option<TextureId> {
        self.resource.as_ref().map(GpuResource::texture)
    }

    /// GPU sampler handle.
    pub fn sampler_id(&self) -> Option<SamplerId> {
        self.resource.as_ref().map(GpuResource::sampler)
    }

    /// Current sampler parameters.
    pub fn tex_params(&self) -> Option<TexParams> {
        self.resource.as_ref().map(GpuResource::params)
    }

    /// Size of the used region in pixels.
    pub fn content_size_in_pixels(&self) -> Size {
        self.content_size
    }

    /// Size of the used region in points.
    pub fn content_size(&self) -> Size {
        let scale = self.resolution_type.scale_factor();
        Size::new(self.content_size.width / scale, self.content_size.height / scale)
    }

    /// Horizontal texture coordinate of the right edge of the content.
    pub fn max_s(&self) -> f32 {
        self.max_s
    }

    /// Vertical texture coordinate of the bottom edge of the content.
    pub fn max_t(&self) -> f32 {
        self.max_t
    }

    /// Sets the horizontal content extent. Values outside `(0, 1]` are clamped.
    pub fn set_max_s(&mut self, max_s: f32) {
        self.max_s = clamp_extent(max_s, "max_s");
    }

    /// Sets the vertical content extent. Values outside `(0, 1]` are clamped.
    pub fn set_max_t(&mut self, max_t: f32) {
        self.max_t = clamp_extent(max_t, "max_t");
    }

    /// Whether color channels are premultiplied by alpha.
    pub fn has_premultiplied_alpha(&self) -> bool {
        self.has_premultiplied_alpha
    }

    /// Whether the texture has more than one mip level.
    pub fn has_mipmaps(&self) -> bool {
        self.has_mipmaps
    }

    /// Asset resolution the texture was loaded for.
    pub fn resolution_type(&self) -> ResolutionType {
        self.resolution_type
    }

    /// Sets the asset resolution.
    pub fn set_resolution_type(&mut self, resolution_type: ResolutionType) {
        self.resolution_type = resolution_type;
    }
}

fn clamp_extent(value: f32, name: &str) -> f32 {
    if value > 0.0 && value <= 1.0 {
        return value;
    }

    let clamped = if value > 1.0 || value.is_nan() { 1.0 } else { f32::EPSILON };
    log::warn!("{name} of {value} is outside (0, 1], using {clamped}");
    clamped
}

fn requires_edge_clamp(width: u32, height: u32, content_size: Size) -> bool {
    !is_power_of_two(width)
        || !is_power_of_two(height)
        || content_size.width != width as f32
        || content_size.height != height as f32
}

fn default_params(width: u32, height: u32, content_size: Size, has_mipmaps: bool) -> TexParams {
    let wrap = if requires_edge_clamp(width, height, content_size) {
        WrapMode::ClampToEdge
    } else {
        WrapMode::Repeat
    };
    let min_filter = if has_mipmaps {
        MinFilter::LinearMipmapNearest
    } else {
        MinFilter::Linear
    };

    TexParams::new(min_filter, MagFilter::Linear, wrap, wrap)
}

fn check_content_size(content_size: Size, width: u32, height: u32) -> Result<()> {
    let fits = content_size.width > 0.0
        && content_size.height > 0.0
        && content_size.width <= width as f32
        && content_size.height <= height as f32;
    if !fits {
        return Err(TextureError::ContentExceedsTexture {
            content_width: content_size.width,
            content_height: content_size.height,
            width,
            height,
        });
    }

    Ok(())
}

fn check_buffer_len(data: &[u8], format: PixelFormat, width: u32, height: u32) -> Result<()> {
    if format.is_compressed() {
        return Err(TextureError::UnsupportedFormat(format));
    }
    let expected = format
        .buffer_len(width, height)
        .ok_or(TextureError::InvalidDimensions { width, height })?;
    if data.len() != expected {
        return Err(TextureError::BufferSizeMismatch {
            expected,
            actual: data.len(),
        });
    }

    Ok(())
}

impl std::fmt::Display for Texture2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<Texture2D | Name = {} | Dimensions = {} x {} | Coordinates = ({:.2}, {:.2})>",
            self.name(),
            self.pixels_wide,
            self.pixels_high,
            self.max_s,
            self.max_t
        )
    }
}

impl std::fmt::Debug for Texture2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture2D")
            .field("resource", &self.resource)
            .field("pixel_format", &self.pixel_format)
            .field("pixels_wide", &self.pixels_wide)
            .field("pixels_high", &self.pixels_high)
            .field("content_size", &self.content_size)
            .field("max_s", &self.max_s)
            .field("max_t", &self.max_t)
            .field("has_premultiplied_alpha", &self.has_premultiplied_alpha)
            .field("has_mipmaps", &self.has_mipmaps)
            .field("resolution_type", &self.resolution_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::config::test_support::lock_global_config;
    use crate::config::{
        reset_global_config, set_default_alpha_pixel_format,
        set_pvr_images_have_premultiplied_alpha,
    };
    use crate::device::TrackingDevice;
    use crate::pvr::test_data::container;
    use crate::text::TextBitmap;

    fn setup() -> (Arc<TrackingDevice>, Texture2D) {
        let device = Arc::new(TrackingDevice::new());
        let texture = Texture2D::new(device.clone());
        (device, texture)
    }

    fn rgba_image(width: u32, height: u32, alpha: u8) -> DecodedImage {
        let bytes = [200, 100, 50, alpha].repeat((width * height) as usize);
        DecodedImage::new(bytes, width, height).expect("valid image")
    }

    struct BlockRasterizer;

    impl TextRasterizer for BlockRasterizer {
        fn rasterize(&self, request: &TextRequest<'_>) -> Result<TextBitmap> {
            let (width, height) = match request.dimensions {
                Some(size) => (size.width.ceil() as u32, size.height.ceil() as u32),
                None => (request.text.chars().count() as u32 * 6, request.font_size.ceil() as u32),
            };
            Ok(TextBitmap {
                data: vec![255; (width * height) as usize],
                width,
                height,
            })
        }
    }

    #[test]
    fn init_with_data_sets_extents() {
        let (device, mut texture) = setup();
        let data = vec![0u8; 64 * 32 * 2];
        texture
            .init_with_data(&data, PixelFormat::Rgb565, 64, 32, Size::new(48.0, 20.0))
            .expect("created");

        assert_eq!(texture.pixel_format(), PixelFormat::Rgb565);
        assert_eq!((texture.pixels_wide(), texture.pixels_high()), (64, 32));
        assert_relative_eq!(texture.max_s(), 0.75);
        assert_relative_eq!(texture.max_t(), 0.625);
        assert!(!texture.has_premultiplied_alpha());
        assert_eq!(device.live_textures(), 1);
        assert_eq!(texture.tex_params(), Some(TexParams::ANTI_ALIAS));
    }

    #[test]
    fn full_pot_content_repeats_by_default() {
        let (_, mut texture) = setup();
        texture
            .init_with_data(&[0; 16], PixelFormat::A8, 4, 4, Size::new(4.0, 4.0))
            .expect("created");

        let params = texture.tex_params().expect("initialized");
        assert_eq!((params.wrap_s, params.wrap_t), (WrapMode::Repeat, WrapMode::Repeat));
        assert!(!texture.requires_edge_clamp());
    }

    #[test]
    fn init_with_data_rejects_invalid_input() {
        let (device, mut texture) = setup();

        assert!(matches!(
            texture.init_with_data(&[0; 12 * 4], PixelFormat::Rgba8888, 3, 4, Size::new(3.0, 4.0)),
            Err(TextureError::InvalidDimensions { width: 3, height: 4 })
        ));
        assert!(matches!(
            texture.init_with_data(&[0; 16], PixelFormat::A8, 4, 4, Size::new(5.0, 4.0)),
            Err(TextureError::ContentExceedsTexture { .. })
        ));
        assert!(matches!(
            texture.init_with_data(&[0; 15], PixelFormat::A8, 4, 4, Size::new(4.0, 4.0)),
            Err(TextureError::BufferSizeMismatch {
                expected: 16,
                actual: 15
            })
        ));
        assert!(matches!(
            texture.init_with_data(&[0; 8], PixelFormat::Pvrtc4, 4, 4, Size::new(4.0, 4.0)),
            Err(TextureError::UnsupportedFormat(PixelFormat::Pvrtc4))
        ));
        assert!(matches!(
            texture.init_with_data(
                &vec![0; 4096 * 4096],
                PixelFormat::A8,
                4096,
                4096,
                Size::new(1.0, 1.0)
            ),
            Err(TextureError::InvalidDimensions { .. })
        ));

        assert!(!texture.is_initialized());
        assert_eq!(device.created_textures(), 0);
    }

    #[test]
    fn automatic_format_resolves_to_default() {
        let (_, mut texture) = setup();
        texture
            .init_with_data(&[0; 16], PixelFormat::Automatic, 2, 2, Size::new(2.0, 2.0))
            .expect("created");
        assert_eq!(texture.pixel_format(), PixelFormat::Rgba8888);
        assert_eq!(texture.bits_per_pixel_for_format(), 32);
    }

    #[test]
    fn reinitialization_releases_previous_resource() {
        let (device, mut texture) = setup();
        texture
            .init_with_data(&[0; 16], PixelFormat::A8, 4, 4, Size::new(4.0, 4.0))
            .expect("created");
        let first = texture.texture_id();

        texture
            .init_with_data(&[0; 64 * 2], PixelFormat::Ai88, 8, 8, Size::new(8.0, 8.0))
            .expect("recreated");

        assert_ne!(texture.texture_id(), first);
        assert_eq!(device.live_textures(), 1);
        assert_eq!(device.live_samplers(), 1);
        assert_eq!(device.created_textures(), 2);

        drop(texture);
        assert_eq!(device.live_textures(), 0);
        assert_eq!(device.live_samplers(), 0);
        assert_eq!(device.double_releases(), 0);
    }

    #[test]
    fn failed_reinitialization_leaves_texture_uninitialized() {
        let (device, mut texture) = setup();
        texture
            .init_with_data(&[0; 16], PixelFormat::A8, 4, 4, Size::new(4.0, 4.0))
            .expect("created");

        device.fail_next_texture();
        let result = texture.init_with_data(&[0; 16], PixelFormat::A8, 4, 4, Size::new(4.0, 4.0));

        assert!(matches!(result, Err(TextureError::OutOfMemory)));
        assert!(!texture.is_initialized());
        assert_eq!((texture.pixels_wide(), texture.pixels_high()), (0, 0));
        assert_eq!(texture.name(), 0);
        assert_eq!(device.live_textures(), 0);
        assert_eq!(device.live_samplers(), 0);
    }

    #[test]
    fn image_is_padded_and_premultiplied() {
        let _guard = lock_global_config();
        let (device, mut texture) = setup();
        let image = rgba_image(3, 5, 128);

        texture
            .init_with_image_and_resolution(&image, ResolutionType::HighDensity)
            .expect("created");

        assert_eq!(texture.pixel_format(), PixelFormat::Rgba8888);
        assert_eq!((texture.pixels_wide(), texture.pixels_high()), (4, 8));
        assert_eq!(texture.content_size_in_pixels(), Size::new(3.0, 5.0));
        assert_eq!(texture.content_size(), Size::new(1.5, 2.5));
        assert_relative_eq!(texture.max_s(), 0.75);
        assert_relative_eq!(texture.max_t(), 0.625);
        assert!(texture.has_premultiplied_alpha());
        assert_eq!(texture.resolution_type(), ResolutionType::HighDensity);

        let tracked = device.texture(texture.texture_id().expect("initialized")).expect("live");
        assert_eq!(&tracked.levels[0][0..4], &[100, 50, 25, 128]);
        assert_eq!(&tracked.levels[0][12..16], &[0, 0, 0, 0]);
    }

    #[test]
    fn opaque_image_uses_rgb888() {
        let _guard = lock_global_config();
        let (_, mut texture) = setup();
        texture.init_with_image(&rgba_image(4, 4, 255)).expect("created");

        assert_eq!(texture.pixel_format(), PixelFormat::Rgb888);
        assert!(!texture.has_premultiplied_alpha());

        let low_depth = rgba_image(4, 4, 255).with_bits_per_component(5);
        texture.init_with_image(&low_depth).expect("created");
        assert_eq!(texture.pixel_format(), PixelFormat::Rgb565);
    }

    #[test]
    fn default_alpha_format_rgb565_drops_alpha() {
        let _guard = lock_global_config();
        let (device, mut texture) = setup();

        set_default_alpha_pixel_format(PixelFormat::Rgb565);
        texture.init_with_image(&rgba_image(2, 2, 10)).expect("created");
        reset_global_config();

        assert_eq!(texture.pixel_format(), PixelFormat::Rgb565);
        assert!(!texture.has_premultiplied_alpha());
        let tracked = device.texture(texture.texture_id().expect("initialized")).expect("live");
        assert_eq!(tracked.levels[0].len(), 2 * 2 * 2);
    }

    #[test]
    fn explicit_config_overrides_global() {
        let _guard = lock_global_config();
        let (_, mut texture) = setup();
        let config = TextureConfig::new().with_default_alpha_pixel_format(PixelFormat::Rgba4444);

        texture
            .init_with_image_config(&rgba_image(2, 2, 10), ResolutionType::Standard, &config)
            .expect("created");
        assert_eq!(texture.pixel_format(), PixelFormat::Rgba4444);
        assert!(texture.has_premultiplied_alpha());
    }

    #[test]
    fn already_premultiplied_image_is_not_scaled_again() {
        let _guard = lock_global_config();
        let (device, mut texture) = setup();
        let image = rgba_image(1, 1, 128).with_premultiplied_alpha(true);

        texture.init_with_image(&image).expect("created");
        let tracked = device.texture(texture.texture_id().expect("initialized")).expect("live");
        assert_eq!(&tracked.levels[0][..], &[200, 100, 50, 128]);
        assert!(texture.has_premultiplied_alpha());
    }

    #[test]
    fn image_above_device_limit_fails() {
        let device = Arc::new(TrackingDevice::new().with_max_texture_size(64));
        let mut texture = Texture2D::new(device.clone());

        assert!(matches!(
            texture.init_with_image_config(
                &rgba_image(65, 1, 255),
                ResolutionType::Unknown,
                &TextureConfig::new()
            ),
            Err(TextureError::ImageTooLarge { width: 128, height: 1, max: 64 })
        ));
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn text_creates_a8_texture() {
        let (device, mut texture) = setup();
        texture
            .init_with_string("hello", "sans-serif", 12.0, &BlockRasterizer)
            .expect("created");

        assert_eq!(texture.pixel_format(), PixelFormat::A8);
        assert_eq!(texture.content_size_in_pixels(), Size::new(30.0, 12.0));
        assert_eq!((texture.pixels_wide(), texture.pixels_high()), (32, 16));
        assert!(!texture.has_premultiplied_alpha());
        assert_eq!(device.live_textures(), 1);
    }

    #[test]
    fn text_in_box_uses_given_dimensions() {
        let (_, mut texture) = setup();
        texture
            .init_with_string_in_box(
                "hello",
                Size::new(100.0, 40.0),
                TextAlignment::Left,
                "sans-serif",
                12.0,
                &BlockRasterizer,
            )
            .expect("created");

        assert_eq!(texture.content_size_in_pixels(), Size::new(100.0, 40.0));
        assert_eq!((texture.pixels_wide(), texture.pixels_high()), (128, 64));
    }

    #[test]
    fn empty_text_fails() {
        let (device, mut texture) = setup();
        assert!(matches!(
            texture.init_with_string("", "sans-serif", 12.0, &BlockRasterizer),
            Err(TextureError::Text(_))
        ));
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn pvr_bytes_upload_all_levels() {
        let _guard = lock_global_config();
        let (device, mut texture) = setup();
        let data = vec![0u8; (16 + 4 + 1) * 4];

        set_pvr_images_have_premultiplied_alpha(true);
        texture
            .init_with_pvr_bytes(container(0x12, 4, 4, 0xff, &data).into())
            .expect("created");
        reset_global_config();

        assert_eq!(texture.pixel_format(), PixelFormat::Rgba8888);
        assert!(texture.has_mipmaps());
        assert!(texture.has_premultiplied_alpha());
        assert_eq!(
            texture.tex_params().map(|p| p.min_filter),
            Some(MinFilter::LinearMipmapNearest)
        );
        let tracked = device.texture(texture.texture_id().expect("initialized")).expect("live");
        assert_eq!(tracked.levels.len(), 3);
    }

    #[test]
    fn malformed_pvr_leaves_texture_uninitialized() {
        let (device, mut texture) = setup();
        texture
            .init_with_data(&[0; 16], PixelFormat::A8, 4, 4, Size::new(4.0, 4.0))
            .expect("created");

        let result = texture.init_with_pvr_bytes(Bytes::from_static(&[0u8; 60]));
        assert!(matches!(result, Err(TextureError::InvalidPvr(_))));
        assert!(!texture.is_initialized());
        assert_eq!((texture.pixels_wide(), texture.pixels_high()), (0, 0));
        assert_eq!(texture.content_size_in_pixels(), Size::ZERO);
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn pvr_with_oversized_header_fails() {
        let (device, mut texture) = setup();
        let bytes = container(0x12, u32::MAX, u32::MAX, 0, &[0; 4]);

        let result = texture.init_with_pvr_bytes_config(bytes.into(), &TextureConfig::new());
        assert!(matches!(result, Err(TextureError::InvalidPvr(_))));
        assert!(!texture.is_initialized());
        assert_eq!(device.created_textures(), 0);
    }

    #[test]
    fn pvr_trailing_bytes_after_last_level_are_ignored() {
        let (device, mut texture) = setup();
        let bytes = container(0x12, 1, 1, 0, &[0; 20]);

        texture
            .init_with_pvr_bytes_config(bytes.into(), &TextureConfig::new())
            .expect("created");
        assert!(!texture.has_mipmaps());
        let tracked = device.texture(texture.texture_id().expect("initialized")).expect("live");
        assert_eq!(tracked.levels.len(), 1);
    }

    #[test]
    fn pvrtc_on_device_without_support_fails() {
        let device = Arc::new(TrackingDevice::new().without_format(PixelFormat::Pvrtc4));
        let mut texture = Texture2D::new(device.clone());

        let bytes = container(0x19, 16, 16, 0, &[0; 128]);
        assert!(matches!(
            texture.init_with_pvr_bytes_config(bytes.into(), &TextureConfig::new()),
            Err(TextureError::UnsupportedFormat(PixelFormat::Pvrtc4))
        ));
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn pvrtc_data_square_upload() {
        let (device, mut texture) = setup();
        let config = TextureConfig::new();

        texture
            .init_with_pvrtc_data_config(&[0; 64], 0, 2, true, 16, PixelFormat::Pvrtc2, &config)
            .expect("created");
        assert_eq!((texture.pixels_wide(), texture.pixels_high()), (16, 16));
        assert_relative_eq!(texture.max_s(), 1.0);
        assert!(!texture.has_premultiplied_alpha());
        let tracked = device.texture(texture.texture_id().expect("initialized")).expect("live");
        assert!(tracked.descriptor.has_alpha);

        // 4x4 at 2bpp is 4 bytes, padded to the 32 byte minimum.
        assert!(matches!(
            texture.init_with_pvrtc_data_config(
                &[0; 16],
                0,
                2,
                false,
                4,
                PixelFormat::Pvrtc2,
                &config
            ),
            Err(TextureError::BufferSizeMismatch { expected: 32, actual: 16 })
        ));
        assert!(matches!(
            texture.init_with_pvrtc_data_config(
                &[0; 64],
                0,
                4,
                false,
                16,
                PixelFormat::Pvrtc2,
                &config
            ),
            Err(TextureError::UnsupportedConfiguration(_))
        ));
        assert!(!texture.is_initialized());
    }

    #[test]
    fn wrap_modes_are_clamped_for_partial_content() {
        let (device, mut texture) = setup();
        texture
            .init_with_data(&[0; 64], PixelFormat::A8, 8, 8, Size::new(5.0, 8.0))
            .expect("created");

        texture
            .set_tex_parameters(TexParams::new(
                MinFilter::Nearest,
                MagFilter::Nearest,
                WrapMode::Repeat,
                WrapMode::MirroredRepeat,
            ))
            .expect("set");

        let params = texture.tex_params().expect("initialized");
        assert_eq!(params, TexParams::ALIAS);
        let sampler = texture.sampler_id().expect("initialized");
        assert_eq!(device.sampler_params(sampler), Some(TexParams::ALIAS));
        assert_eq!(device.live_samplers(), 1);
    }

    #[test]
    fn wrap_modes_are_kept_for_full_pot_content() {
        let (_, mut texture) = setup();
        texture
            .init_with_data(&[0; 64], PixelFormat::A8, 8, 8, Size::new(8.0, 8.0))
            .expect("created");

        let params = TexParams::ANTI_ALIAS.with_wrap(WrapMode::MirroredRepeat);
        texture.set_tex_parameters(params).expect("set");
        assert_eq!(texture.tex_params(), Some(params));
    }

    #[test]
    fn filter_presets_keep_wrap_modes() {
        let (_, mut texture) = setup();
        texture
            .init_with_data(&[0; 64], PixelFormat::A8, 8, 8, Size::new(8.0, 8.0))
            .expect("created");

        texture.set_alias_tex_parameters().expect("set");
        let params = texture.tex_params().expect("initialized");
        assert_eq!(params.min_filter, MinFilter::Nearest);
        assert_eq!(params.mag_filter, MagFilter::Nearest);
        assert_eq!(params.wrap_s, WrapMode::Repeat);

        texture.set_anti_alias_tex_parameters().expect("set");
        assert_eq!(texture.tex_params().map(|p| p.mag_filter), Some(MagFilter::Linear));
    }

    #[test]
    fn mipmap_filter_without_mipmaps_falls_back() {
        let (_, mut texture) = setup();
        texture
            .init_with_data(&[0; 64], PixelFormat::A8, 8, 8, Size::new(8.0, 8.0))
            .expect("created");

        texture
            .set_tex_parameters(TexParams {
                min_filter: MinFilter::LinearMipmapLinear,
                ..TexParams::ANTI_ALIAS
            })
            .expect("set");
        assert_eq!(texture.tex_params().map(|p| p.min_filter), Some(MinFilter::Linear));

        texture.generate_mipmap().expect("generated");
        texture
            .set_tex_parameters(TexParams {
                min_filter: MinFilter::LinearMipmapLinear,
                ..TexParams::ANTI_ALIAS
            })
            .expect("set");
        assert_eq!(
            texture.tex_params().map(|p| p.min_filter),
            Some(MinFilter::LinearMipmapLinear)
        );
    }

    #[test]
    fn parameters_need_initialized_texture() {
        let (_, mut texture) = setup();
        assert!(matches!(
            texture.set_tex_parameters(TexParams::ALIAS),
            Err(TextureError::NotInitialized)
        ));
        assert!(matches!(
            texture.set_anti_alias_tex_parameters(),
            Err(TextureError::NotInitialized)
        ));
        assert!(matches!(texture.generate_mipmap(), Err(TextureError::NotInitialized)));
    }

    #[test]
    fn mipmaps_are_requested_from_device() {
        let (device, mut texture) = setup();
        texture
            .init_with_data(&[0; 64], PixelFormat::A8, 8, 8, Size::new(6.0, 6.0))
            .expect("created");

        texture.generate_mipmap().expect("generated");
        assert!(texture.has_mipmaps());
        assert_eq!(device.mipmap_requests(), vec![texture.texture_id().expect("initialized")]);
    }

    #[test]
    fn mipmaps_of_compressed_textures_are_rejected() {
        let (_, mut texture) = setup();
        texture
            .init_with_pvrtc_data_config(
                &[0; 128],
                0,
                4,
                true,
                16,
                PixelFormat::Pvrtc4,
                &TextureConfig::new(),
            )
            .expect("created");
        assert!(matches!(
            texture.generate_mipmap(),
            Err(TextureError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn npot_pvr_rejects_mipmaps() {
        let (_, mut texture) = setup();
        let bytes = container(0x1b, 3, 2, 0xff, &[0; 6]);
        texture.init_with_pvr_bytes_config(bytes.into(), &TextureConfig::new()).expect("created");

        assert!(texture.requires_edge_clamp());
        assert!(matches!(
            texture.generate_mipmap(),
            Err(TextureError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn draw_at_point_covers_content() {
        let (device, mut texture) = setup();
        texture
            .init_with_data(&[0; 64 * 32], PixelFormat::A8, 64, 32, Size::new(48.0, 16.0))
            .expect("created");

        texture.draw_at_point(Point::new(10.0, 20.0));

        let draws = device.draws();
        assert_eq!(draws.len(), 1);
        let quad = &draws[0];
        assert_eq!(quad.blend, BlendMode::Alpha);
        let positions: Vec<_> =
            quad.vertices.iter().map(|v| (v.position.x, v.position.y)).collect();
        assert_eq!(positions, vec![(10.0, 20.0), (58.0, 20.0), (10.0, 36.0), (58.0, 36.0)]);
        let uvs: Vec<_> = quad.vertices.iter().map(|v| (v.uv.x, v.uv.y)).collect();
        assert_eq!(uvs, vec![(0.0, 0.5), (0.75, 0.5), (0.0, 0.0), (0.75, 0.0)]);
        assert_eq!(device.invalid_draws(), 0);
    }

    #[test]
    fn draw_in_rect_uses_premultiplied_blending() {
        let _guard = lock_global_config();
        let (device, mut texture) = setup();
        texture.init_with_image(&rgba_image(4, 4, 100)).expect("created");

        texture.draw_in_rect(Rect::new(0.0, 0.0, 100.0, 50.0));
        let quad = &device.draws()[0];
        assert_eq!(quad.blend, BlendMode::Premultiplied);
        assert_eq!(quad.vertices[3].position, Point::new(100.0, 50.0));
        assert_eq!(quad.vertices[3].uv, Point::new(1.0, 0.0));
    }

    #[test]
    fn uninitialized_draw_is_ignored() {
        let (device, texture) = setup();
        texture.draw_at_point(Point::ZERO);
        assert!(device.draws().is_empty());
    }

    #[test]
    fn max_st_setters_clamp() {
        let (_, mut texture) = setup();
        texture.set_max_s(0.5);
        assert_relative_eq!(texture.max_s(), 0.5);
        texture.set_max_s(2.0);
        assert_relative_eq!(texture.max_s(), 1.0);
        texture.set_max_t(-1.0);
        assert!(texture.max_t() > 0.0);
    }

    #[test]
    fn description() {
        let (_, mut texture) = setup();
        texture
            .init_with_data(&[0; 16], PixelFormat::A8, 4, 4, Size::new(3.0, 2.0))
            .expect("created");
        insta::assert_snapshot!(
            texture.to_string(),
            @"<Texture2D | Name = 1 | Dimensions = 4 x 4 | Coordinates = (0.75, 0.50)>"
        );
    }
}
