use std::sync::Arc;

use super::{GraphicsDevice, MipLevel, SamplerId, TexParams, TextureDescriptor, TextureId};
use crate::error::Result;

/// Exclusive owner of one texture and one sampler state of a device.
///
/// Both handles are released when the value is dropped.
pub struct GpuResource {
    device: Arc<dyn GraphicsDevice>,
    texture: TextureId,
    sampler: SamplerId,
    params: TexParams,
}

impl GpuResource {
    /// Allocates the texture and its sampler.
    ///
    /// If the sampler cannot be created the texture is released before the error is returned.
    pub fn create(
        device: Arc<dyn GraphicsDevice>,
        descriptor: &TextureDescriptor,
        levels: &[MipLevel<'_>],
        params: TexParams,
    ) -> Result<Self> {
        let texture = device.create_texture(descriptor, levels)?;
        let sampler = match device.create_sampler(&params) {
            Ok(sampler) => sampler,
            Err(err) => {
                log::error!("Failed to create sampler for texture {}: {err}", texture.raw());
                device.release_texture(texture);
                return Err(err);
            }
        };

        Ok(Self {
            device,
            texture,
            sampler,
            params,
        })
    }

    /// Texture handle.
    pub fn texture(&self) -> TextureId {
        self.texture
    }

    /// Sampler handle.
    pub fn sampler(&self) -> SamplerId {
        self.sampler
    }

    /// Parameters of the current sampler.
    pub fn params(&self) -> TexParams {
        self.params
    }

    /// Device the resource lives on.
    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    /// Swaps the sampler for one with new parameters.
    ///
    /// On failure the old sampler stays in place.
    pub fn replace_sampler(&mut self, params: TexParams) -> Result<()> {
        if params == self.params {
            return Ok(());
        }

        let sampler = self.device.create_sampler(&params)?;
        let old = std::mem::replace(&mut self.sampler, sampler);
        self.device.release_sampler(old);
        self.params = params;

        Ok(())
    }
}

impl Drop for GpuResource {
    fn drop(&mut self) {
        self.device.release_sampler(self.sampler);
        self.device.release_texture(self.texture);
    }
}

impl std::fmt::Debug for GpuResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuResource")
            .field("texture", &self.texture)
            .field("sampler", &self.sampler)
            .field("params", &self.params)
            .finish()
    }
}
