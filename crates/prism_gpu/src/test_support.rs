//! In-memory render context that records every call, for unit tests

use std::cell::RefCell;
use std::rc::Rc;

use prism_core::Size;
use slotmap::SlotMap;

use crate::context::RenderContext;
use crate::error::{FilterError, Result};
use crate::filter::Filter;
use crate::manager::FilterManager;
use crate::quad::{Quad, QuadVertexLayout};
use crate::shader::FilterShader;
use crate::target::{RenderTarget, RenderTargetId};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    SetRenderTarget(RenderTargetId),
    CreateRenderTarget(RenderTargetId),
    DestroyRenderTarget(RenderTargetId),
    Clear(RenderTargetId),
    CreateQuadBuffers,
    UploadQuad { vertices: [f32; 8], uvs: [f32; 8] },
    BindQuad,
    UseShader(&'static str),
    SyncUniforms { shader: &'static str, projection: [f32; 9] },
    BindQuadAttributes(QuadVertexLayout),
    BindTexture(u32, RenderTargetId),
    DrawIndexed(u32, wgpu::IndexFormat),
}

#[derive(Debug, Default)]
pub struct RecordingShader {
    pub name: &'static str,
    pub projection: [f32; 9],
}

impl RecordingShader {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            projection: [0.0; 9],
        }
    }
}

impl FilterShader for RecordingShader {
    fn set_projection_matrix(&mut self, matrix: [f32; 9]) {
        self.projection = matrix;
    }

    fn projection_matrix(&self) -> [f32; 9] {
        self.projection
    }
}

pub struct RecordingContext {
    targets: SlotMap<RenderTargetId, RenderTarget>,
    root: RenderTargetId,
    current: RenderTargetId,
    created: usize,
    pub calls: Vec<Call>,
}

impl RecordingContext {
    pub fn new(root_size: Size) -> Self {
        let mut targets = SlotMap::with_key();
        let root = targets.insert(RenderTarget::root(root_size));
        Self {
            targets,
            root,
            current: root,
            created: 0,
            calls: Vec::new(),
        }
    }

    pub fn root(&self) -> RenderTargetId {
        self.root
    }

    /// Number of off-screen targets ever allocated
    pub fn created_targets(&self) -> usize {
        self.created
    }

    /// Number of targets alive, root included
    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }
}

impl RenderContext for RecordingContext {
    type Shader = RecordingShader;

    fn current_render_target(&self) -> RenderTargetId {
        self.current
    }

    fn set_render_target(&mut self, id: RenderTargetId) -> Result<()> {
        if !self.targets.contains_key(id) {
            return Err(FilterError::UnknownRenderTarget(id));
        }
        self.current = id;
        self.calls.push(Call::SetRenderTarget(id));
        Ok(())
    }

    fn render_target(&self, id: RenderTargetId) -> Option<&RenderTarget> {
        self.targets.get(id)
    }

    fn render_target_mut(&mut self, id: RenderTargetId) -> Option<&mut RenderTarget> {
        self.targets.get_mut(id)
    }

    fn create_render_target(&mut self, size: Size) -> Result<RenderTargetId> {
        let id = self.targets.insert(RenderTarget::offscreen(size));
        self.created += 1;
        self.calls.push(Call::CreateRenderTarget(id));
        Ok(id)
    }

    fn destroy_render_target(&mut self, id: RenderTargetId) {
        if self.targets.remove(id).is_some() {
            self.calls.push(Call::DestroyRenderTarget(id));
        }
    }

    fn clear_render_target(&mut self, id: RenderTargetId) -> Result<()> {
        self.target(id)?;
        self.calls.push(Call::Clear(id));
        Ok(())
    }

    fn create_quad_buffers(&mut self, _quad: &Quad) -> Result<()> {
        self.calls.push(Call::CreateQuadBuffers);
        Ok(())
    }

    fn upload_quad(&mut self, quad: &Quad) -> Result<()> {
        self.calls.push(Call::UploadQuad {
            vertices: quad.vertices,
            uvs: quad.uvs,
        });
        Ok(())
    }

    fn bind_quad(&mut self) -> Result<()> {
        self.calls.push(Call::BindQuad);
        Ok(())
    }

    fn use_shader(&mut self, shader: &RecordingShader) {
        self.calls.push(Call::UseShader(shader.name));
    }

    fn sync_uniforms(&mut self, shader: &RecordingShader) {
        self.calls.push(Call::SyncUniforms {
            shader: shader.name,
            projection: shader.projection,
        });
    }

    fn bind_quad_attributes(
        &mut self,
        _shader: &RecordingShader,
        layout: &QuadVertexLayout,
    ) -> Result<()> {
        self.calls.push(Call::BindQuadAttributes(*layout));
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, id: RenderTargetId) -> Result<()> {
        self.target(id)?;
        self.calls.push(Call::BindTexture(unit, id));
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, format: wgpu::IndexFormat) -> Result<()> {
        self.calls.push(Call::DrawIndexed(index_count, format));
        Ok(())
    }
}

/// One recorded `apply_filter` invocation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Invocation {
    pub input: RenderTargetId,
    pub output: RenderTargetId,
    /// Manager stack depth while the filter ran
    pub depth: usize,
}

/// Filter that records its invocations and draws through the manager
pub struct RecordingFilter {
    shader: RefCell<RecordingShader>,
    pub invocations: RefCell<Vec<Invocation>>,
}

impl RecordingFilter {
    pub fn new(name: &'static str) -> Rc<Self> {
        Rc::new(Self {
            shader: RefCell::new(RecordingShader::new(name)),
            invocations: RefCell::new(Vec::new()),
        })
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }
}

impl Filter<RecordingContext> for RecordingFilter {
    fn apply_filter(
        &self,
        manager: &mut FilterManager<RecordingContext>,
        ctx: &mut RecordingContext,
        input: RenderTargetId,
        output: RenderTargetId,
    ) -> Result<()> {
        self.invocations.borrow_mut().push(Invocation {
            input,
            output,
            depth: manager.depth(),
        });
        let mut shader = self.shader.borrow_mut();
        manager.apply_filter(ctx, &mut shader, input, output)
    }
}

/// Filter that never draws, so drawing stays wherever the stack left it
pub struct NoopFilter;

impl Filter<RecordingContext> for NoopFilter {
    fn apply_filter(
        &self,
        _manager: &mut FilterManager<RecordingContext>,
        _ctx: &mut RecordingContext,
        _input: RenderTargetId,
        _output: RenderTargetId,
    ) -> Result<()> {
        Ok(())
    }
}

/// Filter that fails without drawing
pub struct FailingFilter;

impl Filter<RecordingContext> for FailingFilter {
    fn apply_filter(
        &self,
        _manager: &mut FilterManager<RecordingContext>,
        _ctx: &mut RecordingContext,
        _input: RenderTargetId,
        _output: RenderTargetId,
    ) -> Result<()> {
        Err(FilterError::IncompleteDrawState("failing filter"))
    }
}
