//! wgpu render context
//!
//! wgpu has no global bind state, so [`WgpuContext`] keeps the program,
//! texture and quad bindings the compositor sets and replays them into a
//! fresh render pass on every `draw_indexed`. Each clear and draw is its own
//! submission; filter passes are few per frame and must observe each
//! other's output in order.

use std::sync::Arc;

use prism_core::Size;
use slotmap::SlotMap;

use crate::context::RenderContext;
use crate::error::{FilterError, Result};
use crate::quad::{Quad, QuadVertexLayout};
use crate::shader::WgpuFilterShader;
use crate::shaders::PASSTHROUGH_SHADER;
use crate::target::{RenderTarget, RenderTargetId};

/// A render target together with its GPU resources
struct GpuTarget {
    info: RenderTarget,
    /// Owned texture; `None` for a registered external view
    texture: Option<wgpu::Texture>,
    view: Arc<wgpu::TextureView>,
}

impl GpuTarget {
    fn sampleable(&self) -> bool {
        self.texture.is_some()
    }
}

struct QuadBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
}

/// Bindings set since the last draw
#[derive(Default)]
struct DrawState {
    pipeline: Option<Arc<wgpu::RenderPipeline>>,
    bind_group_layout: Option<Arc<wgpu::BindGroupLayout>>,
    uniform_buffer: Option<Arc<wgpu::Buffer>>,
    attributes: Option<QuadVertexLayout>,
    texture: Option<RenderTargetId>,
    quad_bound: bool,
}

/// [`RenderContext`] over a wgpu device
pub struct WgpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    format: wgpu::TextureFormat,
    targets: SlotMap<RenderTargetId, GpuTarget>,
    root: RenderTargetId,
    current: RenderTargetId,
    sampler: wgpu::Sampler,
    quad: Option<QuadBuffers>,
    draw: DrawState,
}

impl WgpuContext {
    /// Create a context whose root output is an owned texture of `root_size`
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        root_size: Size,
        format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Filter Input Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let root_texture = create_texture(&device, root_size, format, "Filter Root Target")?;
        let root_view = root_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut targets = SlotMap::with_key();
        let root = targets.insert(GpuTarget {
            info: RenderTarget::root(root_size),
            texture: Some(root_texture),
            view: Arc::new(root_view),
        });

        tracing::debug!(
            "wgpu filter context: root {}x{} format={:?}",
            root_size.width,
            root_size.height,
            format
        );

        Ok(Self {
            device,
            queue,
            format,
            targets,
            root,
            current: root,
            sampler,
            quad: None,
            draw: DrawState::default(),
        })
    }

    /// Create a context on a fresh device with no surface
    pub fn headless(root_size: Size, format: wgpu::TextureFormat) -> Result<Self> {
        let (device, queue) = pollster::block_on(request_device())?;
        Self::new(Arc::new(device), Arc::new(queue), root_size, format)
    }

    /// Use `view` (typically a swapchain frame) as the root output.
    ///
    /// The view is draw-only: filters cannot sample the root.
    pub fn register_root_view(&mut self, view: wgpu::TextureView, size: Size) {
        if let Some(root) = self.targets.get_mut(self.root) {
            root.info = RenderTarget::root(size);
            root.texture = None;
            root.view = Arc::new(view);
        }
        if self.draw.texture == Some(self.root) {
            self.draw.texture = None;
        }
    }

    /// The renderer's output target
    pub fn root(&self) -> RenderTargetId {
        self.root
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Number of live targets, root included
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Compile a filter shader for this context's target format
    pub fn create_filter_shader(&self, source: &str, label: &str) -> WgpuFilterShader {
        WgpuFilterShader::new(&self.device, self.format, source, label)
    }

    pub fn passthrough_shader(&self) -> WgpuFilterShader {
        self.create_filter_shader(PASSTHROUGH_SHADER, "Passthrough Filter")
    }

    fn gpu_target(&self, id: RenderTargetId) -> Result<&GpuTarget> {
        self.targets
            .get(id)
            .ok_or(FilterError::UnknownRenderTarget(id))
    }

    /// Copy a target's texture back to the CPU as tightly packed rows of
    /// 4-byte texels in the context format.
    pub fn read_render_target(&self, id: RenderTargetId) -> Result<Vec<u8>> {
        let target = self.gpu_target(id)?;
        let texture = target
            .texture
            .as_ref()
            .ok_or(FilterError::IncompleteDrawState("external root view cannot be read"))?;
        if self.format.block_copy_size(None) != Some(4) {
            return Err(FilterError::Device(format!(
                "readback needs a 4-byte texel format, got {:?}",
                self.format
            )));
        }

        let (width, height) = target.info.size.to_extent();
        let bytes_per_row = padded_bytes_per_row(width);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Filter Readback"),
            size: bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Filter Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .unwrap_or(Err(wgpu::BufferAsyncError))
            .map_err(|e| FilterError::Device(format!("readback map failed: {e}")))?;

        let data = slice.get_mapped_range();
        let row_bytes = width as usize * 4;
        let mut out = Vec::with_capacity(row_bytes * height as usize);
        for row in data.chunks_exact(bytes_per_row as usize) {
            out.extend_from_slice(&row[..row_bytes]);
        }
        drop(data);
        buffer.unmap();
        Ok(out)
    }
}

impl WgpuContext {
    /// Overwrite a target's texture with tightly packed 4-byte texels
    pub fn write_render_target(&self, id: RenderTargetId, data: &[u8]) -> Result<()> {
        let target = self.gpu_target(id)?;
        let texture = target
            .texture
            .as_ref()
            .ok_or(FilterError::IncompleteDrawState("external root view cannot be written"))?;
        let (width, height) = target.info.size.to_extent();
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(FilterError::Device(format!(
                "expected {} bytes for a {}x{} target, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }
}

async fn request_device() -> Result<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            force_fallback_adapter: false,
            compatible_surface: None,
        })
        .await
        .ok_or_else(|| FilterError::Device("no suitable GPU adapter found".to_owned()))?;

    let required_limits = adapter.limits();
    adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Prism Filter Device"),
                required_features: wgpu::Features::empty(),
                required_limits,
                memory_hints: wgpu::MemoryHints::MemoryUsage,
            },
            None,
        )
        .await
        .map_err(|e| FilterError::Device(e.to_string()))
}

fn create_texture(
    device: &wgpu::Device,
    size: Size,
    format: wgpu::TextureFormat,
    label: &str,
) -> Result<wgpu::Texture> {
    let (width, height) = size.to_extent();
    let max = device.limits().max_texture_dimension_2d;
    if width > max || height > max {
        return Err(FilterError::Device(format!(
            "render target {}x{} exceeds the device limit of {}",
            width, height, max
        )));
    }

    Ok(device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    }))
}

fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

impl RenderContext for WgpuContext {
    type Shader = WgpuFilterShader;

    fn current_render_target(&self) -> RenderTargetId {
        self.current
    }

    fn set_render_target(&mut self, id: RenderTargetId) -> Result<()> {
        self.gpu_target(id)?;
        self.current = id;
        Ok(())
    }

    fn render_target(&self, id: RenderTargetId) -> Option<&RenderTarget> {
        self.targets.get(id).map(|target| &target.info)
    }

    fn render_target_mut(&mut self, id: RenderTargetId) -> Option<&mut RenderTarget> {
        self.targets.get_mut(id).map(|target| &mut target.info)
    }

    fn create_render_target(&mut self, size: Size) -> Result<RenderTargetId> {
        let texture = create_texture(&self.device, size, self.format, "Filter Render Target")?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let info = RenderTarget {
            flip_y: true,
            ..RenderTarget::offscreen(size)
        };

        Ok(self.targets.insert(GpuTarget {
            info,
            texture: Some(texture),
            view: Arc::new(view),
        }))
    }

    fn destroy_render_target(&mut self, id: RenderTargetId) {
        if id == self.root {
            tracing::warn!("ignoring request to destroy the root render target");
            return;
        }
        if let Some(target) = self.targets.remove(id) {
            if let Some(texture) = target.texture {
                texture.destroy();
            }
        }
        if self.draw.texture == Some(id) {
            self.draw.texture = None;
        }
        if self.current == id {
            self.current = self.root;
        }
    }

    fn clear_render_target(&mut self, id: RenderTargetId) -> Result<()> {
        let view = Arc::clone(&self.gpu_target(id)?.view);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Filter Clear Encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Filter Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn create_quad_buffers(&mut self, quad: &Quad) -> Result<()> {
        let vertices = quad.vertex_data();
        let vertex = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Filter Quad Vertices"),
            size: std::mem::size_of_val(&vertices) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Filter Quad Indices"),
            size: quad.index_bytes().len() as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue
            .write_buffer(&vertex, 0, bytemuck::cast_slice(&vertices));
        self.queue.write_buffer(&index, 0, quad.index_bytes());

        self.quad = Some(QuadBuffers { vertex, index });
        self.draw.quad_bound = false;
        Ok(())
    }

    fn upload_quad(&mut self, quad: &Quad) -> Result<()> {
        let buffers = self
            .quad
            .as_ref()
            .ok_or(FilterError::IncompleteDrawState("quad buffers not created"))?;
        self.queue
            .write_buffer(&buffers.vertex, 0, bytemuck::cast_slice(&quad.vertex_data()));
        Ok(())
    }

    fn bind_quad(&mut self) -> Result<()> {
        if self.quad.is_none() {
            return Err(FilterError::IncompleteDrawState("quad buffers not created"));
        }
        self.draw.quad_bound = true;
        Ok(())
    }

    fn use_shader(&mut self, shader: &WgpuFilterShader) {
        self.draw.pipeline = Some(Arc::clone(&shader.pipeline));
        self.draw.bind_group_layout = Some(Arc::clone(&shader.bind_group_layout));
        self.draw.uniform_buffer = Some(Arc::clone(&shader.uniform_buffer));
        self.draw.attributes = None;
    }

    fn sync_uniforms(&mut self, shader: &WgpuFilterShader) {
        self.queue
            .write_buffer(&shader.uniform_buffer, 0, bytemuck::bytes_of(shader.uniforms()));
    }

    fn bind_quad_attributes(
        &mut self,
        shader: &WgpuFilterShader,
        layout: &QuadVertexLayout,
    ) -> Result<()> {
        if !self.draw.quad_bound {
            return Err(FilterError::IncompleteDrawState("quad not bound"));
        }
        if shader.layout != *layout {
            return Err(FilterError::IncompleteDrawState(
                "vertex layout does not match the shader pipeline",
            ));
        }
        self.draw.attributes = Some(*layout);
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, id: RenderTargetId) -> Result<()> {
        if unit != 0 {
            return Err(FilterError::IncompleteDrawState(
                "filter shaders sample texture unit 0 only",
            ));
        }
        if !self.gpu_target(id)?.sampleable() {
            return Err(FilterError::IncompleteDrawState(
                "external root view cannot be sampled",
            ));
        }
        self.draw.texture = Some(id);
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, format: wgpu::IndexFormat) -> Result<()> {
        let state = &self.draw;
        let pipeline = state
            .pipeline
            .as_ref()
            .ok_or(FilterError::IncompleteDrawState("no shader in use"))?;
        let bind_group_layout = state
            .bind_group_layout
            .as_ref()
            .ok_or(FilterError::IncompleteDrawState("no shader in use"))?;
        let uniform_buffer = state
            .uniform_buffer
            .as_ref()
            .ok_or(FilterError::IncompleteDrawState("no shader in use"))?;
        let attributes = state
            .attributes
            .ok_or(FilterError::IncompleteDrawState("vertex attributes not bound"))?;
        let input = state
            .texture
            .ok_or(FilterError::IncompleteDrawState("no input texture bound"))?;
        let quad = self
            .quad
            .as_ref()
            .filter(|_| state.quad_bound)
            .ok_or(FilterError::IncompleteDrawState("quad not bound"))?;
        if input == self.current {
            return Err(FilterError::IncompleteDrawState(
                "input texture is also the render target",
            ));
        }

        let input_view = &self.gpu_target(input)?.view;
        let output_view = &self.gpu_target(self.current)?.view;

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Filter Bind Group"),
            layout: bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(input_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Filter Draw Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Filter Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: output_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            for (slot, attribute) in attributes.attributes().iter().enumerate() {
                let range = attribute.offset..attribute.offset + attribute.len;
                pass.set_vertex_buffer(slot as u32, quad.vertex.slice(range));
            }
            pass.set_index_buffer(quad.index.slice(..), format);
            pass.draw_indexed(0..index_count, 0, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}
