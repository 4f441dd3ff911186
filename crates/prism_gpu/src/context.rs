//! The renderer/graphics-context seam
//!
//! [`RenderContext`] is everything the filter compositor needs from the
//! renderer that drives it: the "current output" indirection, render-target
//! allocation, the shared quad buffers and the handful of bind calls one
//! filter draw is made of. Bind state set through these calls is global to
//! the context and is clobbered by every filter draw.

use crate::error::{FilterError, Result};
use crate::quad::{Quad, QuadVertexLayout};
use crate::shader::FilterShader;
use crate::target::{RenderTarget, RenderTargetId};
use prism_core::Size;

pub trait RenderContext {
    /// Shader program type filters draw with
    type Shader: FilterShader;

    /// Target that subsequent drawing goes into
    fn current_render_target(&self) -> RenderTargetId;

    /// Redirect subsequent drawing into `id`
    fn set_render_target(&mut self, id: RenderTargetId) -> Result<()>;

    fn render_target(&self, id: RenderTargetId) -> Option<&RenderTarget>;

    fn render_target_mut(&mut self, id: RenderTargetId) -> Option<&mut RenderTarget>;

    /// Allocate an off-screen target of `size`
    fn create_render_target(&mut self, size: Size) -> Result<RenderTargetId>;

    /// Free the target and its GPU memory. Unknown ids are ignored.
    fn destroy_render_target(&mut self, id: RenderTargetId);

    /// Clear the target to transparent
    fn clear_render_target(&mut self, id: RenderTargetId) -> Result<()>;

    /// (Re)create the quad vertex and index buffers from `quad`
    fn create_quad_buffers(&mut self, quad: &Quad) -> Result<()>;

    /// Upload remapped quad vertices into the existing buffers
    fn upload_quad(&mut self, quad: &Quad) -> Result<()>;

    /// Bind the quad vertex and index buffers
    fn bind_quad(&mut self) -> Result<()>;

    /// Make `shader` the active program
    fn use_shader(&mut self, shader: &Self::Shader);

    /// Upload every uniform `shader` declares
    fn sync_uniforms(&mut self, shader: &Self::Shader);

    /// Point the shader's vertex attributes at the bound quad buffer
    fn bind_quad_attributes(
        &mut self,
        shader: &Self::Shader,
        layout: &QuadVertexLayout,
    ) -> Result<()>;

    /// Bind the texture of render target `id` to texture unit `unit`
    fn bind_texture(&mut self, unit: u32, id: RenderTargetId) -> Result<()>;

    /// Draw `index_count` indices from the bound quad into the current target
    fn draw_indexed(&mut self, index_count: u32, format: wgpu::IndexFormat) -> Result<()>;

    /// [`render_target`](Self::render_target), failing on unknown ids
    fn target(&self, id: RenderTargetId) -> Result<&RenderTarget> {
        self.render_target(id)
            .ok_or(FilterError::UnknownRenderTarget(id))
    }

    /// [`render_target_mut`](Self::render_target_mut), failing on unknown ids
    fn target_mut(&mut self, id: RenderTargetId) -> Result<&mut RenderTarget> {
        self.render_target_mut(id)
            .ok_or(FilterError::UnknownRenderTarget(id))
    }
}
