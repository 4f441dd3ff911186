//! Filter shader programs
//!
//! The compositor only touches one uniform itself, the projection matrix.
//! Everything else a shader declares is uploaded by the render context when
//! the manager asks it to sync uniforms.

use std::sync::Arc;

use crate::quad::{QuadVertexLayout, QUAD_VERTEX_LAYOUT};
use crate::shaders::PASSTHROUGH_SHADER;

/// Shader program used by a filter pass
pub trait FilterShader {
    /// Set the `projectionMatrix` uniform (3x3, column-major)
    fn set_projection_matrix(&mut self, matrix: [f32; 9]);

    /// Current value of the `projectionMatrix` uniform (3x3, column-major)
    fn projection_matrix(&self) -> [f32; 9];
}

/// Uniform block shared by all filter shaders (see [`crate::shaders`])
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FilterUniforms {
    /// mat3x3 columns, each padded to 16 bytes
    pub projection: [[f32; 4]; 3],
    /// Filter-specific parameters; `x` is the output alpha for the passthrough shader
    pub params: [f32; 4],
}

impl Default for FilterUniforms {
    fn default() -> Self {
        Self {
            projection: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
            params: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

impl FilterUniforms {
    fn set_projection(&mut self, matrix: [f32; 9]) {
        for (column, values) in self.projection.iter_mut().zip(matrix.chunks_exact(3)) {
            *column = [values[0], values[1], values[2], 0.0];
        }
    }

    fn projection_array(&self) -> [f32; 9] {
        let mut out = [0.0; 9];
        for (values, column) in out.chunks_exact_mut(3).zip(self.projection.iter()) {
            values.copy_from_slice(&column[..3]);
        }
        out
    }
}

/// A compiled wgpu filter pipeline plus its uniform storage
///
/// GPU objects are reference counted so the context can keep them bound
/// after the filter releases its borrow of the shader.
pub struct WgpuFilterShader {
    label: String,
    pub(crate) pipeline: Arc<wgpu::RenderPipeline>,
    pub(crate) bind_group_layout: Arc<wgpu::BindGroupLayout>,
    pub(crate) uniform_buffer: Arc<wgpu::Buffer>,
    pub(crate) layout: QuadVertexLayout,
    uniforms: FilterUniforms,
}

impl WgpuFilterShader {
    /// Compile `source` (WGSL, `vs_main`/`fs_main`) into a filter pipeline
    /// that renders into `format` targets.
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        source: &str,
        label: &str,
    ) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Filter Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Filter Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let layout = QUAD_VERTEX_LAYOUT;
        let buffers = layout.buffer_layouts();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                buffers: &buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Filter Uniforms"),
            size: std::mem::size_of::<FilterUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            label: label.to_owned(),
            pipeline: Arc::new(pipeline),
            bind_group_layout: Arc::new(bind_group_layout),
            uniform_buffer: Arc::new(uniform_buffer),
            layout,
            uniforms: FilterUniforms::default(),
        }
    }

    /// The built-in copy shader
    pub fn passthrough(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        Self::new(device, format, PASSTHROUGH_SHADER, "Passthrough Filter")
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn uniforms(&self) -> &FilterUniforms {
        &self.uniforms
    }

    /// Set the filter-specific parameter block
    pub fn set_params(&mut self, params: [f32; 4]) {
        self.uniforms.params = params;
    }
}

impl FilterShader for WgpuFilterShader {
    fn set_projection_matrix(&mut self, matrix: [f32; 9]) {
        self.uniforms.set_projection(matrix);
    }

    fn projection_matrix(&self) -> [f32; 9] {
        self.uniforms.projection_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_matches_wgsl_layout() {
        // mat3x3<f32> (48 bytes) followed by vec4<f32>
        assert_eq!(std::mem::size_of::<FilterUniforms>(), 64);
    }

    #[test]
    fn projection_columns_are_padded() {
        let mut uniforms = FilterUniforms::default();
        uniforms.set_projection([1.0, 2.0, 0.0, 3.0, 4.0, 0.0, 5.0, 6.0, 1.0]);
        assert_eq!(
            uniforms.projection,
            [
                [1.0, 2.0, 0.0, 0.0],
                [3.0, 4.0, 0.0, 0.0],
                [5.0, 6.0, 1.0, 0.0]
            ]
        );
        assert_eq!(
            uniforms.projection_array(),
            [1.0, 2.0, 0.0, 3.0, 4.0, 0.0, 5.0, 6.0, 1.0]
        );
    }
}
