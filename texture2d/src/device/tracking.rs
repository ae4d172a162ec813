use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use super::{
    GraphicsDevice, MipLevel, SamplerId, TexParams, TextureDescriptor, TextureId, TexturedQuad,
};
use crate::error::{Result, TextureError};
use crate::pixel_format::PixelFormat;

const DEFAULT_MAX_TEXTURE_SIZE: u32 = 2048;

/// Texture as seen by a [`TrackingDevice`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedTexture {
    /// Allocation request.
    pub descriptor: TextureDescriptor,
    /// Uploaded level data, base level first.
    pub levels: Vec<Vec<u8>>,
}

#[derive(Default)]
struct TrackingState {
    last_id: u32,
    textures: HashMap<TextureId, TrackedTexture>,
    samplers: HashMap<SamplerId, TexParams>,
    created_textures: usize,
    created_samplers: usize,
    double_releases: usize,
    draws: Vec<TexturedQuad>,
    invalid_draws: usize,
    mipmap_requests: Vec<TextureId>,
    fail_next_texture: bool,
    fail_next_sampler: bool,
}

impl TrackingState {
    fn next_id(&mut self) -> u32 {
        self.last_id += 1;
        self.last_id
    }
}

/// In-memory [`GraphicsDevice`] that keeps count of every resource it hands out.
///
/// Used for headless testing of texture lifecycles.
pub struct TrackingDevice {
    state: Mutex<TrackingState>,
    max_texture_size: u32,
    unsupported: HashSet<PixelFormat>,
}

impl TrackingDevice {
    /// Creates a device with a 2048 texel size limit that supports every format.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TrackingState::default()),
            max_texture_size: DEFAULT_MAX_TEXTURE_SIZE,
            unsupported: HashSet::new(),
        }
    }

    /// Sets the texture size limit.
    pub fn with_max_texture_size(mut self, max_texture_size: u32) -> Self {
        self.max_texture_size = max_texture_size;
        self
    }

    /// Marks a format as not supported by the device.
    pub fn without_format(mut self, format: PixelFormat) -> Self {
        self.unsupported.insert(format);
        self
    }

    /// Makes the next texture allocation fail with [`TextureError::OutOfMemory`].
    pub fn fail_next_texture(&self) {
        self.state.lock().fail_next_texture = true;
    }

    /// Makes the next sampler creation fail with [`TextureError::OutOfMemory`].
    pub fn fail_next_sampler(&self) {
        self.state.lock().fail_next_sampler = true;
    }

    /// Number of textures currently allocated.
    pub fn live_textures(&self) -> usize {
        self.state.lock().textures.len()
    }

    /// Number of samplers currently allocated.
    pub fn live_samplers(&self) -> usize {
        self.state.lock().samplers.len()
    }

    /// Total number of successful texture allocations.
    pub fn created_textures(&self) -> usize {
        self.state.lock().created_textures
    }

    /// Total number of successful sampler creations.
    pub fn created_samplers(&self) -> usize {
        self.state.lock().created_samplers
    }

    /// Number of release calls for handles that were not alive.
    pub fn double_releases(&self) -> usize {
        self.state.lock().double_releases
    }

    /// Copy of a live texture.
    pub fn texture(&self, id: TextureId) -> Option<TrackedTexture> {
        self.state.lock().textures.get(&id).cloned()
    }

    /// Parameters of a live sampler.
    pub fn sampler_params(&self, id: SamplerId) -> Option<TexParams> {
        self.state.lock().samplers.get(&id).copied()
    }

    /// All quads drawn so far.
    pub fn draws(&self) -> Vec<TexturedQuad> {
        self.state.lock().draws.clone()
    }

    /// Number of draws that referenced a dead texture or sampler.
    pub fn invalid_draws(&self) -> usize {
        self.state.lock().invalid_draws
    }

    /// Textures mipmap generation was requested for.
    pub fn mipmap_requests(&self) -> Vec<TextureId> {
        self.state.lock().mipmap_requests.clone()
    }
}

impl Default for TrackingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for TrackingDevice {
    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    fn supports_format(&self, format: PixelFormat) -> bool {
        !self.unsupported.contains(&format)
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        levels: &[MipLevel<'_>],
    ) -> Result<TextureId> {
        if !self.supports_format(descriptor.format) {
            return Err(TextureError::UnsupportedFormat(descriptor.format));
        }
        let max_levels = u32::BITS - descriptor.width.max(descriptor.height).leading_zeros();
        if levels.len() as u32 > max_levels {
            return Err(TextureError::UnsupportedConfiguration(
                "more mip levels than the texture size allows",
            ));
        }

        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_texture) {
            return Err(TextureError::OutOfMemory);
        }

        let id = TextureId::from_raw(state.next_id());
        state.textures.insert(
            id,
            TrackedTexture {
                descriptor: descriptor.clone(),
                levels: levels.iter().map(|level| level.data.to_vec()).collect(),
            },
        );
        state.created_textures += 1;

        Ok(id)
    }

    fn create_sampler(&self, params: &TexParams) -> Result<SamplerId> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_sampler) {
            return Err(TextureError::OutOfMemory);
        }

        let id = SamplerId::from_raw(state.next_id());
        state.samplers.insert(id, *params);
        state.created_samplers += 1;

        Ok(id)
    }

    fn generate_mipmaps(&self, texture: TextureId) -> Result<u32> {
        let mut state = self.state.lock();
        let Some(tracked) = state.textures.get(&texture) else {
            return Err(TextureError::NotInitialized);
        };

        let size = tracked.descriptor.width.max(tracked.descriptor.height);
        state.mipmap_requests.push(texture);

        Ok(u32::BITS - size.leading_zeros())
    }

    fn draw_quad(&self, quad: &TexturedQuad) {
        let mut state = self.state.lock();
        if !state.textures.contains_key(&quad.texture)
            || !state.samplers.contains_key(&quad.sampler)
        {
            log::error!("Draw references released texture {}", quad.texture.raw());
            state.invalid_draws += 1;
        }

        state.draws.push(quad.clone());
    }

    fn release_texture(&self, texture: TextureId) {
        let mut state = self.state.lock();
        if state.textures.remove(&texture).is_none() {
            log::error!("Texture {} released twice", texture.raw());
            state.double_releases += 1;
        }
    }

    fn release_sampler(&self, sampler: SamplerId) {
        let mut state = self.state.lock();
        if state.samplers.remove(&sampler).is_none() {
            log::error!("Sampler {} released twice", sampler.raw());
            state.double_releases += 1;
        }
    }
}
