//! Filter manager
//!
//! Drives nested filter regions for one renderer:
//!
//! 1. `begin` binds the root frame to the renderer's output once per frame
//! 2. `push_filter` takes a pooled buffer and redirects drawing into it
//! 3. the caller renders the filtered subtree
//! 4. `pop_filter` runs the filter from that buffer into the enclosing one
//!    and returns the buffer to the pool
//!
//! Pushes and pops must nest with the scene traversal.

use std::rc::Rc;

use prism_core::{cap_filter_area, Matrix, Point, Rect, Size};

use crate::context::RenderContext;
use crate::error::{FilterError, Result};
use crate::filter::{Filter, FilterTarget};
use crate::pool::{TexturePool, TexturePoolStats};
use crate::quad::{Quad, QUAD_INDEX_COUNT, QUAD_INDEX_FORMAT, QUAD_VERTEX_LAYOUT};
use crate::shader::FilterShader;
use crate::stack::{FilterStack, StackFrame};
use crate::target::RenderTargetId;

fn valid_extent(v: f32) -> bool {
    v.is_finite() && v >= 1.0
}

fn env_f32(name: &str) -> Option<f32> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| valid_extent(*v))
}

/// Configuration for the filter manager
#[derive(Clone, Debug, PartialEq)]
pub struct FilterManagerConfig {
    /// Size of every pooled filter buffer. Fixed, independent of the true
    /// output resolution; regions beyond it are clipped.
    pub working_size: Size,
}

impl Default for FilterManagerConfig {
    fn default() -> Self {
        Self {
            working_size: Size::new(800.0, 600.0),
        }
    }
}

impl FilterManagerConfig {
    /// Default configuration with environment overrides applied
    pub fn from_env() -> Self {
        apply_config_overrides(Self::default())
    }
}

fn apply_config_overrides(mut config: FilterManagerConfig) -> FilterManagerConfig {
    // Env:
    // - PRISM_FILTER_WORKING_WIDTH=1280
    // - PRISM_FILTER_WORKING_HEIGHT=720
    if let Some(width) = env_f32("PRISM_FILTER_WORKING_WIDTH") {
        config.working_size.width = width;
    }
    if let Some(height) = env_f32("PRISM_FILTER_WORKING_HEIGHT") {
        config.working_size.height = height;
    }
    config
}

fn log_manager_config(config: &FilterManagerConfig) {
    tracing::info!(
        "filter config: working_size={}x{}",
        config.working_size.width,
        config.working_size.height
    );
}

/// Sprite data the mapping matrix is computed from
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteTransform {
    pub world_transform: Matrix,
    /// Size of the sprite's source texture in pixels
    pub texture_size: Size,
    /// Normalized anchor point
    pub anchor: Point,
}

/// Stack-based filter compositor for one renderer
pub struct FilterManager<C: RenderContext> {
    config: FilterManagerConfig,
    stack: FilterStack<C>,
    pool: TexturePool,
    quad: Quad,
    /// Frame of the buffer most recently handed to a filter
    current_frame: Option<Rect>,
}

impl<C: RenderContext> FilterManager<C> {
    /// Create a manager for the renderer behind `ctx` and build its quad buffers
    pub fn new(ctx: &mut C, config: FilterManagerConfig) -> Result<Self> {
        log_manager_config(&config);

        let mut manager = Self {
            stack: FilterStack::new(ctx.current_render_target()),
            pool: TexturePool::new(config.working_size),
            quad: Quad::new(),
            current_frame: None,
            config,
        };
        manager.on_context_reset(ctx)?;
        Ok(manager)
    }

    /// Rebuild GPU state after the graphics context was lost and recreated.
    ///
    /// Pooled handles died with the old context, so they are forgotten
    /// rather than destroyed.
    pub fn on_context_reset(&mut self, ctx: &mut C) -> Result<()> {
        tracing::debug!(
            "filter context reset: forgetting {} pooled targets",
            self.pool.len()
        );
        self.pool.clear();
        self.quad = Quad::new();
        ctx.create_quad_buffers(&self.quad)
    }

    /// Bind the root frame to the renderer's current output.
    ///
    /// Call once per frame before any push. Frames left over from an
    /// unbalanced previous frame are released to the pool and reported as
    /// [`FilterError::UnbalancedStack`]; the manager is usable afterwards.
    pub fn begin(&mut self, ctx: &mut C) -> Result<()> {
        let leftover = self.stack.drain_pushed();
        let depth = leftover.len() + 1;

        if !leftover.is_empty() {
            tracing::warn!(
                "filter stack left at depth {} by the previous frame; releasing {} frame(s)",
                depth,
                leftover.len()
            );
            for frame in leftover {
                self.pool.release(ctx, frame.target);
            }
            // Drawing is still redirected into the innermost leftover buffer.
            ctx.set_render_target(self.stack.root().target)?;
        }

        let output = ctx.current_render_target();
        let size = ctx.target(output)?.size;
        let root = self.stack.root_mut();
        root.target = output;
        root.bounds = Some(size.to_rect());

        if depth > 1 {
            return Err(FilterError::UnbalancedStack { depth });
        }
        Ok(())
    }

    /// Start a filtered region for `target` and redirect drawing into a
    /// pooled buffer.
    ///
    /// Every push must be matched by exactly one [`pop_filter`](Self::pop_filter).
    pub fn push_filter(
        &mut self,
        ctx: &mut C,
        target: &dyn FilterTarget,
        filters: Vec<Rc<dyn Filter<C>>>,
    ) -> Result<()> {
        if filters.is_empty() {
            return Err(FilterError::EmptyFilterList);
        }

        let mut bounds = target.filter_area().unwrap_or_else(|| target.bounds());
        self.cap_filter_area(&mut bounds);

        let texture = self.pool.acquire(ctx)?;
        if let Err(err) = Self::redirect_into(ctx, texture, bounds) {
            self.pool.release(ctx, texture);
            return Err(err);
        }

        self.stack.push(StackFrame {
            target: texture,
            filters,
            bounds: Some(bounds),
        });

        tracing::trace!(
            "push_filter: {:?} region={:?} depth={}",
            texture,
            bounds,
            self.stack.depth()
        );
        Ok(())
    }

    fn redirect_into(ctx: &mut C, texture: RenderTargetId, bounds: Rect) -> Result<()> {
        ctx.target_mut(texture)?.frame = bounds;
        ctx.set_render_target(texture)?;
        ctx.clear_render_target(texture)
    }

    /// Close the innermost filtered region: run its filter from the region's
    /// buffer into the enclosing buffer and return the buffer to the pool.
    ///
    /// Only the first queued filter runs. Returns the frame's filter list.
    /// Popping with no pushed frame is [`FilterError::StackUnderflow`].
    pub fn pop_filter(&mut self, ctx: &mut C) -> Result<Vec<Rc<dyn Filter<C>>>> {
        let frame = self.stack.pop().ok_or(FilterError::StackUnderflow)?;
        let input = frame.target;
        let output = self.stack.top().target;

        let result = self.run_filter(ctx, &frame.filters, input, output);

        // A filter that failed or never drew leaves drawing redirected into
        // `input`, which must be idle before it goes back to the pool.
        let restored = if ctx.current_render_target() != output {
            ctx.set_render_target(output)
        } else {
            Ok(())
        };
        self.pool.release(ctx, input);

        tracing::trace!(
            "pop_filter: {:?} -> {:?} depth={}",
            input,
            output,
            self.stack.depth()
        );

        result.and(restored).map(|()| frame.filters)
    }

    fn run_filter(
        &mut self,
        ctx: &mut C,
        filters: &[Rc<dyn Filter<C>>],
        input: RenderTargetId,
        output: RenderTargetId,
    ) -> Result<()> {
        let filter = filters
            .first()
            .map(Rc::clone)
            .ok_or(FilterError::EmptyFilterList)?;
        if filters.len() > 1 {
            tracing::debug!(
                "pop_filter: applying first of {} queued filters",
                filters.len()
            );
        }

        let frame = ctx.target(input)?.frame;
        self.current_frame = Some(frame);
        self.quad.map(self.config.working_size, frame);
        ctx.upload_quad(&self.quad)?;
        ctx.bind_quad()?;

        filter.apply_filter(self, ctx, input, output)
    }

    /// Draw the bound quad through `shader`, sampling `input` and writing
    /// into `output`.
    ///
    /// This is the one draw call a filter issues. It overwrites the
    /// context's program, texture unit 0, vertex attribute and buffer
    /// bindings.
    pub fn apply_filter(
        &self,
        ctx: &mut C,
        shader: &mut C::Shader,
        input: RenderTargetId,
        output: RenderTargetId,
    ) -> Result<()> {
        ctx.set_render_target(output)?;
        ctx.use_shader(shader);

        // An enclosing buffer holds its content relative to its own frame.
        let projection = ctx.target(output)?.content_projection();
        shader.set_projection_matrix(projection.to_array(true));
        ctx.sync_uniforms(shader);

        ctx.bind_quad_attributes(shader, &QUAD_VERTEX_LAYOUT)?;
        ctx.bind_texture(0, input)?;
        ctx.draw_indexed(QUAD_INDEX_COUNT, QUAD_INDEX_FORMAT)
    }

    /// Take a working-size buffer from the pool, for filters that need
    /// scratch targets. Hand it back with
    /// [`return_render_target`](Self::return_render_target).
    pub fn get_render_target(&mut self, ctx: &mut C) -> Result<RenderTargetId> {
        let id = self.pool.acquire(ctx)?;
        let frame = self
            .current_frame
            .unwrap_or_else(|| self.config.working_size.to_rect());
        ctx.target_mut(id)?.frame = frame;
        Ok(id)
    }

    pub fn return_render_target(&mut self, ctx: &mut C, id: RenderTargetId) {
        self.pool.release(ctx, id);
    }

    /// Matrix mapping a sprite's texture space into the working buffer's
    /// normalized space, written into `output`.
    pub fn calculate_mapped_matrix<'m>(
        &self,
        filter_area: &Rect,
        sprite: &SpriteTransform,
        output: &'m mut Matrix,
    ) -> Result<&'m mut Matrix> {
        let working = self.config.working_size;
        let texture = sprite.texture_size;
        let ratio = working.ratio();

        let translate_scale_x = working.width / texture.width;
        let translate_scale_y = working.height / texture.height;

        let mut world = sprite.world_transform;
        world.tx /= texture.width * translate_scale_x;
        world.ty /= texture.width * translate_scale_x;
        let inverse = world.inverse().ok_or(FilterError::SingularTransform)?;

        output
            .identity()
            .translate(
                filter_area.x() / working.width,
                filter_area.y() / working.height,
            )
            .scale(1.0, ratio)
            .prepend(&inverse)
            .scale(1.0, 1.0 / ratio)
            .scale(translate_scale_x, translate_scale_y)
            .translate(sprite.anchor.x, sprite.anchor.y);

        Ok(output)
    }

    /// Clamp `area` into the working buffer (see [`prism_core::cap_filter_area`])
    pub fn cap_filter_area(&self, area: &mut Rect) {
        cap_filter_area(area, self.config.working_size);
    }

    /// Change the pooled buffer size. Idle buffers are destroyed now,
    /// in-flight ones when they are popped.
    pub fn set_working_size(&mut self, ctx: &mut C, size: Size) {
        if !valid_extent(size.width) || !valid_extent(size.height) {
            tracing::warn!(
                "ignoring invalid filter working size {}x{}",
                size.width,
                size.height
            );
            return;
        }
        if self.config.working_size == size {
            return;
        }
        tracing::info!(
            "filter working size {}x{} -> {}x{}",
            self.config.working_size.width,
            self.config.working_size.height,
            size.width,
            size.height
        );
        self.pool.resize(ctx, size);
        self.config.working_size = size;
    }

    /// Release every buffer this manager owns, pooled or still on the stack.
    /// The root output belongs to the renderer and is left alone.
    pub fn destroy(mut self, ctx: &mut C) {
        let in_flight = self.stack.drain_pushed();
        if !in_flight.is_empty() {
            tracing::warn!(
                "destroying filter manager with {} frame(s) still pushed",
                in_flight.len()
            );
        }
        for frame in in_flight {
            ctx.destroy_render_target(frame.target);
        }
        self.pool.destroy_all(ctx);
    }

    /// Number of stack frames including the root
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn stack(&self) -> &FilterStack<C> {
        &self.stack
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    pub fn pool_contains(&self, id: RenderTargetId) -> bool {
        self.pool.contains(id)
    }

    pub fn pool_stats(&self) -> &TexturePoolStats {
        self.pool.stats()
    }

    pub fn working_size(&self) -> Size {
        self.config.working_size
    }

    pub fn config(&self) -> &FilterManagerConfig {
        &self.config
    }

    pub fn quad(&self) -> &Quad {
        &self.quad
    }

    /// Frame of the buffer most recently handed to a filter
    pub fn current_frame(&self) -> Option<Rect> {
        self.current_frame
    }
}
