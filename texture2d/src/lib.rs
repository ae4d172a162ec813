//! GPU-backed 2D textures for sprite renderers.
//!
//! A [`Texture2D`] is created from raw texels, a decoded image, rendered text or a PVR
//! container, and owns the GPU texture and sampler it uploads to. Textures are drawn as
//! textured quads through a [`GraphicsDevice`](device::GraphicsDevice).
//!
//! Two devices are provided:
//! * [`WgpuDevice`](device::WgpuDevice) (feature `wgpu`) renders into offscreen targets;
//! * [`TrackingDevice`](device::TrackingDevice) keeps resources in memory and counts them.
//!
//! ```ignore
//! let device = Arc::new(WgpuDevice::new_headless().await?);
//! let mut texture = Texture2D::new(device.clone());
//! texture.init_with_image(&DecodedImage::open("sprite.png")?)?;
//! texture.draw_at_point(Point::new(10.0, 10.0));
//! ```

pub mod config;
pub mod decoded_image;
pub mod device;
pub mod error;
pub mod geometry;
pub mod pixel_convert;
pub mod pixel_format;
pub mod pvr;
pub mod text;
mod texture;

pub use config::TextureConfig;
pub use decoded_image::DecodedImage;
pub use device::{GraphicsDevice, TexParams};
pub use error::{Result, TextureError};
pub use geometry::{Point, Rect, Size};
pub use pixel_format::PixelFormat;
pub use texture::{ResolutionType, Texture2D};
