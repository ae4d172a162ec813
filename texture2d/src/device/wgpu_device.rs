//! [`GraphicsDevice`] implementation on top of wgpu.
//!
//! Textures are stored as `Rgba8Unorm` because wgpu has no packed 16-bit or 24-bit
//! formats. PVRTC is not available in wgpu, so compressed textures are rejected.
//!
//! Draw calls are recorded and rendered into an [`OffscreenTarget`] with
//! [`WgpuDevice::render`].

use std::collections::HashMap;

use parking_lot::Mutex;
use wgpu::util::DeviceExt;
use wgpu::{
    Device, Extent3d, Queue, Texture, TextureDescriptor as WgpuTextureDescriptor, TextureDimension,
    TextureFormat, TextureUsages, TextureView,
};

use super::{
    BlendMode, GraphicsDevice, MagFilter, MinFilter, MipLevel, SamplerId, TexParams,
    TextureDescriptor, TextureId, TexturedQuad, WrapMode,
};
use crate::error::{Result, TextureError};
use crate::pixel_convert::{downsample_rgba8, unpack_to_rgba8};
use crate::pixel_format::PixelFormat;

const STORAGE_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;
const TARGET_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

const QUAD_SHADER: &str = r#"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(in.position, 0.0, 1.0);
    out.uv = in.uv;
    return out;
}

@group(0) @binding(0) var quad_texture: texture_2d<f32>;
@group(0) @binding(1) var quad_sampler: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(quad_texture, quad_sampler, in.uv);
}
"#;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct GpuVertex {
    position: [f32; 2],
    uv: [f32; 2],
}

impl GpuVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

struct StoredTexture {
    texture: Texture,
    view: TextureView,
    width: u32,
    height: u32,
    /// Base level in RGBA8888, kept to rebuild the texture with a mip chain.
    base_level: Vec<u8>,
}

#[derive(Default)]
struct WgpuState {
    last_id: u32,
    textures: HashMap<TextureId, StoredTexture>,
    samplers: HashMap<SamplerId, wgpu::Sampler>,
    pending_quads: Vec<TexturedQuad>,
}

impl WgpuState {
    fn next_id(&mut self) -> u32 {
        self.last_id += 1;
        self.last_id
    }
}

struct QuadPipelines {
    bind_group_layout: wgpu::BindGroupLayout,
    alpha: wgpu::RenderPipeline,
    premultiplied: wgpu::RenderPipeline,
}

impl QuadPipelines {
    fn new(device: &Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Texture2D Quad Shader"),
            source: wgpu::ShaderSource::Wgsl(QUAD_SHADER.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture2D Quad Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Texture2D Quad Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let create_pipeline = |label: &str, blend: wgpu::BlendState| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[GpuVertex::layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TARGET_FORMAT,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        Self {
            alpha: create_pipeline("Texture2D Alpha Pipeline", wgpu::BlendState::ALPHA_BLENDING),
            premultiplied: create_pipeline(
                "Texture2D Premultiplied Pipeline",
                wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
            ),
            bind_group_layout,
        }
    }

    fn for_blend(&self, blend: BlendMode) -> &wgpu::RenderPipeline {
        match blend {
            BlendMode::Alpha => &self.alpha,
            BlendMode::Premultiplied => &self.premultiplied,
        }
    }
}

/// Render target texture that recorded quads are drawn into.
pub struct OffscreenTarget {
    texture: Texture,
    view: TextureView,
    width: u32,
    height: u32,
}

impl OffscreenTarget {
    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Texture view for use in other render passes.
    pub fn view(&self) -> &TextureView {
        &self.view
    }
}

/// wgpu-backed graphics device.
pub struct WgpuDevice {
    device: Device,
    queue: Queue,
    pipelines: QuadPipelines,
    state: Mutex<WgpuState>,
}

impl WgpuDevice {
    /// Creates a device without a surface.
    pub async fn new_headless() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|err| TextureError::Gpu(format!("failed to create adapter: {err}")))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Texture2D Headless Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|err| TextureError::Gpu(format!("failed to create device: {err}")))?;

        Ok(Self::new(device, queue))
    }

    /// Wraps an existing device and queue.
    pub fn new(device: Device, queue: Queue) -> Self {
        let pipelines = QuadPipelines::new(&device);
        Self {
            device,
            queue,
            pipelines,
            state: Mutex::new(WgpuState::default()),
        }
    }

    /// The wrapped wgpu device.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The wrapped wgpu queue.
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Creates a render target that can be read back.
    pub fn create_target(&self, width: u32, height: u32) -> Result<OffscreenTarget> {
        if width == 0 || height == 0 {
            return Err(TextureError::InvalidDimensions { width, height });
        }

        let texture = self.device.create_texture(&WgpuTextureDescriptor {
            label: Some("Texture2D Offscreen Target"),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(OffscreenTarget {
            texture,
            view,
            width,
            height,
        })
    }

    /// Number of draws recorded since the last [`WgpuDevice::render`].
    pub fn pending_draws(&self) -> usize {
        self.state.lock().pending_quads.len()
    }

    /// Renders all recorded quads into the target, clearing it first.
    ///
    /// Quad positions are target pixels with the origin at the bottom-left corner.
    pub fn render(&self, target: &OffscreenTarget, clear_color: wgpu::Color) {
        let mut state = self.state.lock();
        let quads = std::mem::take(&mut state.pending_quads);

        let mut vertices = Vec::with_capacity(quads.len() * 4);
        let mut bind_groups = Vec::with_capacity(quads.len());
        for quad in &quads {
            let (Some(stored), Some(sampler)) =
                (state.textures.get(&quad.texture), state.samplers.get(&quad.sampler))
            else {
                log::warn!("Skipping draw of released texture {}", quad.texture.raw());
                continue;
            };

            bind_groups.push((
                quad.blend,
                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Texture2D Quad Bind Group"),
                    layout: &self.pipelines.bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&stored.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(sampler),
                        },
                    ],
                }),
            ));

            vertices.extend(quad.vertices.iter().map(|vertex| GpuVertex {
                position: [
                    vertex.position.x / target.width as f32 * 2.0 - 1.0,
                    vertex.position.y / target.height as f32 * 2.0 - 1.0,
                ],
                uv: [vertex.uv.x, vertex.uv.y],
            }));
        }

        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Texture2D Quad Vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Texture2D Render Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Texture2D Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if !vertices.is_empty() {
                pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            }

            for (index, (blend, bind_group)) in bind_groups.iter().enumerate() {
                let first = index as u32 * 4;
                pass.set_pipeline(self.pipelines.for_blend(*blend));
                pass.set_bind_group(0, bind_group, &[]);
                pass.draw(first..first + 4, 0..1);
            }
        }

        self.queue.submit(Some(encoder.finish()));
        log::trace!("Rendered {} quads", bind_groups.len());
    }

    /// Copies the target into CPU memory as tightly packed RGBA8888 rows, top row first.
    pub async fn read_pixels(&self, target: &OffscreenTarget) -> Result<Vec<u8>> {
        let unpadded_row = 4 * target.width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = unpadded_row.div_ceil(align) * align;

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Texture2D Staging Buffer"),
            size: (padded_row * target.height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Texture2D Copy Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(target.height),
                },
            },
            Extent3d {
                width: target.width,
                height: target.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = staging_buffer.slice(..);
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| TextureError::Gpu(format!("failed to poll device: {err}")))?;

        match receiver.receive().await {
            Some(Ok(())) => {}
            Some(Err(err)) => return Err(TextureError::Gpu(format!("failed to map buffer: {err}"))),
            None => return Err(TextureError::Gpu("buffer mapping was cancelled".into())),
        }

        let mut pixels = Vec::with_capacity((unpadded_row * target.height) as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks(padded_row as usize) {
                pixels.extend_from_slice(&row[..unpadded_row as usize]);
            }
        }
        staging_buffer.unmap();

        Ok(pixels)
    }

    fn upload(&self, width: u32, height: u32, levels: &[Vec<u8>]) -> (Texture, TextureView) {
        let texture = self.device.create_texture(&WgpuTextureDescriptor {
            label: Some("Texture2D"),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: STORAGE_FORMAT,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let (mut level_width, mut level_height) = (width, height);
        for (mip_level, data) in levels.iter().enumerate() {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: mip_level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * level_width),
                    rows_per_image: Some(level_height),
                },
                Extent3d {
                    width: level_width,
                    height: level_height,
                    depth_or_array_layers: 1,
                },
            );
            level_width = (level_width / 2).max(1);
            level_height = (level_height / 2).max(1);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }
}

fn address_mode(wrap: WrapMode) -> wgpu::AddressMode {
    match wrap {
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
    }
}

fn min_filter_modes(filter: MinFilter) -> (wgpu::FilterMode, wgpu::FilterMode) {
    use wgpu::FilterMode::{Linear, Nearest};
    match filter {
        MinFilter::Nearest | MinFilter::NearestMipmapNearest => (Nearest, Nearest),
        MinFilter::Linear | MinFilter::LinearMipmapNearest => (Linear, Nearest),
        MinFilter::NearestMipmapLinear => (Nearest, Linear),
        MinFilter::LinearMipmapLinear => (Linear, Linear),
    }
}

impl GraphicsDevice for WgpuDevice {
    fn max_texture_size(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn supports_format(&self, format: PixelFormat) -> bool {
        !format.is_compressed()
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        levels: &[MipLevel<'_>],
    ) -> Result<TextureId> {
        if !self.supports_format(descriptor.format) {
            return Err(TextureError::UnsupportedFormat(descriptor.format));
        }
        if levels.is_empty() {
            return Err(TextureError::BufferSizeMismatch {
                expected: descriptor
                    .format
                    .buffer_len(descriptor.width, descriptor.height)
                    .unwrap_or_default(),
                actual: 0,
            });
        }

        let max_levels = u32::BITS - descriptor.width.max(descriptor.height).leading_zeros();
        if levels.len() as u32 > max_levels {
            return Err(TextureError::UnsupportedConfiguration(
                "more mip levels than the texture size allows",
            ));
        }

        let rgba_levels = levels
            .iter()
            .map(|level| unpack_to_rgba8(level.data, descriptor.format))
            .collect::<Result<Vec<_>>>()?;

        let (texture, view) = self.upload(descriptor.width, descriptor.height, &rgba_levels);

        let mut state = self.state.lock();
        let id = TextureId::from_raw(state.next_id());
        state.textures.insert(
            id,
            StoredTexture {
                texture,
                view,
                width: descriptor.width,
                height: descriptor.height,
                base_level: rgba_levels.into_iter().next().unwrap_or_default(),
            },
        );

        Ok(id)
    }

    fn create_sampler(&self, params: &TexParams) -> Result<SamplerId> {
        let (min_filter, mipmap_filter) = min_filter_modes(params.min_filter);
        let mag_filter = match params.mag_filter {
            MagFilter::Nearest => wgpu::FilterMode::Nearest,
            MagFilter::Linear => wgpu::FilterMode::Linear,
        };

        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Texture2D Sampler"),
            address_mode_u: address_mode(params.wrap_s),
            address_mode_v: address_mode(params.wrap_t),
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter,
            min_filter,
            mipmap_filter,
            ..Default::default()
        });

        let mut state = self.state.lock();
        let id = SamplerId::from_raw(state.next_id());
        state.samplers.insert(id, sampler);

        Ok(id)
    }

    fn generate_mipmaps(&self, texture: TextureId) -> Result<u32> {
        let (width, height, mut levels) = {
            let state = self.state.lock();
            let stored = state.textures.get(&texture).ok_or(TextureError::NotInitialized)?;
            (stored.width, stored.height, vec![stored.base_level.clone()])
        };

        let (mut level_width, mut level_height) = (width, height);
        while level_width > 1 || level_height > 1 {
            let Some(previous) = levels.last() else { break };
            let (next, next_width, next_height) =
                downsample_rgba8(previous, level_width, level_height);
            levels.push(next);
            level_width = next_width;
            level_height = next_height;
        }

        let level_count = levels.len() as u32;
        let (new_texture, view) = self.upload(width, height, &levels);

        let mut state = self.state.lock();
        let stored = state.textures.get_mut(&texture).ok_or(TextureError::NotInitialized)?;
        stored.texture.destroy();
        stored.texture = new_texture;
        stored.view = view;

        log::debug!("Generated {level_count} mip levels for texture {}", texture.raw());
        Ok(level_count)
    }

    fn draw_quad(&self, quad: &TexturedQuad) {
        self.state.lock().pending_quads.push(quad.clone());
    }

    fn release_texture(&self, texture: TextureId) {
        match self.state.lock().textures.remove(&texture) {
            Some(stored) => stored.texture.destroy(),
            None => log::error!("Texture {} released twice", texture.raw()),
        }
    }

    fn release_sampler(&self, sampler: SamplerId) {
        if self.state.lock().samplers.remove(&sampler).is_none() {
            log::error!("Sampler {} released twice", sampler.raw());
        }
    }
}

impl std::fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("WgpuDevice")
            .field("textures", &state.textures.len())
            .field("samplers", &state.samplers.len())
            .field("pending_quads", &state.pending_quads.len())
            .finish()
    }
}
