//! Graphics device abstraction used by [`Texture2D`](crate::Texture2D).
//!
//! A device owns the actual GPU objects. Textures only hold opaque handles to them
//! through a [`GpuResource`], which returns the handles to the device when dropped.

mod resource;
mod tracking;
#[cfg(feature = "wgpu")]
mod wgpu_device;

pub use resource::GpuResource;
pub use tracking::{TrackedTexture, TrackingDevice};
#[cfg(feature = "wgpu")]
pub use wgpu_device::{OffscreenTarget, WgpuDevice};

use crate::error::Result;
use crate::geometry::Point;
use crate::pixel_format::PixelFormat;

/// Handle of a texture allocated by a [`GraphicsDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u32);

/// Handle of a sampler state created by a [`GraphicsDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SamplerId(u32);

macro_rules! handle_impl {
    ($name:ident) => {
        impl $name {
            /// Wraps a raw handle value. Devices must never hand out `0`.
            pub fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            /// Raw handle value.
            pub fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

handle_impl!(TextureId);
handle_impl!(SamplerId);

/// Minification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MinFilter {
    /// Nearest texel.
    Nearest,
    /// Bilinear.
    Linear,
    /// Nearest texel of the nearest mip level.
    NearestMipmapNearest,
    /// Bilinear within the nearest mip level.
    LinearMipmapNearest,
    /// Nearest texel, blended between mip levels.
    NearestMipmapLinear,
    /// Trilinear.
    LinearMipmapLinear,
}

impl MinFilter {
    /// Whether the filter reads from mip levels other than the base.
    pub fn uses_mipmaps(self) -> bool {
        !matches!(self, MinFilter::Nearest | MinFilter::Linear)
    }

    /// The same filter restricted to the base level.
    pub fn without_mipmaps(self) -> MinFilter {
        match self {
            MinFilter::Nearest
            | MinFilter::NearestMipmapNearest
            | MinFilter::NearestMipmapLinear => MinFilter::Nearest,
            MinFilter::Linear | MinFilter::LinearMipmapNearest | MinFilter::LinearMipmapLinear => {
                MinFilter::Linear
            }
        }
    }
}

/// Magnification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MagFilter {
    /// Nearest texel.
    Nearest,
    /// Bilinear.
    Linear,
}

/// Texture coordinate wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WrapMode {
    /// Tile the texture.
    Repeat,
    /// Clamp coordinates to the edge texel.
    ClampToEdge,
    /// Tile the texture, mirroring every other repetition.
    MirroredRepeat,
}

/// Sampler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TexParams {
    /// Minification filter.
    pub min_filter: MinFilter,
    /// Magnification filter.
    pub mag_filter: MagFilter,
    /// Wrapping along S (horizontal).
    pub wrap_s: WrapMode,
    /// Wrapping along T (vertical).
    pub wrap_t: WrapMode,
}

impl TexParams {
    /// Linear filtering, clamped.
    pub const ANTI_ALIAS: TexParams = TexParams {
        min_filter: MinFilter::Linear,
        mag_filter: MagFilter::Linear,
        wrap_s: WrapMode::ClampToEdge,
        wrap_t: WrapMode::ClampToEdge,
    };

    /// Nearest filtering, clamped.
    pub const ALIAS: TexParams = TexParams {
        min_filter: MinFilter::Nearest,
        mag_filter: MagFilter::Nearest,
        wrap_s: WrapMode::ClampToEdge,
        wrap_t: WrapMode::ClampToEdge,
    };

    /// Creates sampler parameters.
    pub fn new(
        min_filter: MinFilter,
        mag_filter: MagFilter,
        wrap_s: WrapMode,
        wrap_t: WrapMode,
    ) -> Self {
        Self {
            min_filter,
            mag_filter,
            wrap_s,
            wrap_t,
        }
    }

    /// Same parameters with both wrap modes replaced.
    pub fn with_wrap(mut self, wrap: WrapMode) -> Self {
        self.wrap_s = wrap;
        self.wrap_t = wrap;
        self
    }
}

/// Allocation request for a texture.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    /// Width of the base level in texels.
    pub width: u32,
    /// Height of the base level in texels.
    pub height: u32,
    /// Storage format of the provided level data.
    pub format: PixelFormat,
    /// Whether the alpha channel is meaningful. Selects RGB or RGBA variants of PVRTC.
    pub has_alpha: bool,
}

/// Pixel data of one mip level, already in the descriptor's format.
#[derive(Debug, Clone, Copy)]
pub struct MipLevel<'a> {
    /// Level width in texels.
    pub width: u32,
    /// Level height in texels.
    pub height: u32,
    /// Texel bytes.
    pub data: &'a [u8],
}

/// How a quad is blended into the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// `src * src_alpha + dst * (1 - src_alpha)`.
    Alpha,
    /// `src + dst * (1 - src_alpha)`, for premultiplied textures.
    Premultiplied,
}

/// Vertex of a textured quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadVertex {
    /// Position in target pixels, y pointing up.
    pub position: Point,
    /// Texture coordinate, `(0, 0)` being the first texel row.
    pub uv: Point,
}

/// A textured quad in triangle-strip order: bottom-left, bottom-right, top-left, top-right.
#[derive(Debug, Clone, PartialEq)]
pub struct TexturedQuad {
    /// Texture to sample.
    pub texture: TextureId,
    /// Sampler to sample with.
    pub sampler: SamplerId,
    /// Blending of the quad.
    pub blend: BlendMode,
    /// Corners.
    pub vertices: [QuadVertex; 4],
}

/// GPU operations needed by textures.
///
/// All calls are synchronous and must happen on the thread that owns the graphics context.
pub trait GraphicsDevice: Send + Sync {
    /// Largest width or height of a 2D texture.
    fn max_texture_size(&self) -> u32;

    /// Whether textures of this format can be created.
    fn supports_format(&self, format: PixelFormat) -> bool;

    /// Allocates a texture and uploads the given levels, base level first.
    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        levels: &[MipLevel<'_>],
    ) -> Result<TextureId>;

    /// Creates a sampler state.
    fn create_sampler(&self, params: &TexParams) -> Result<SamplerId>;

    /// Builds the full mip chain of the texture. Returns the number of levels.
    fn generate_mipmaps(&self, texture: TextureId) -> Result<u32>;

    /// Issues a draw of the quad.
    fn draw_quad(&self, quad: &TexturedQuad);

    /// Frees a texture.
    fn release_texture(&self, texture: TextureId);

    /// Frees a sampler state.
    fn release_sampler(&self, sampler: SamplerId);
}
