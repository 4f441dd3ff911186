//! Render-target pooling
//!
//! Every pooled target has the same fixed working size, so the pool is a
//! plain LIFO list: no size buckets, no matching. A miss allocates through
//! the render context and the pool only grows by what is in flight at once.

use prism_core::Size;

use crate::context::RenderContext;
use crate::error::Result;
use crate::target::RenderTargetId;

/// Statistics for pool performance monitoring
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TexturePoolStats {
    /// Targets handed out from the pool
    pub hits: u64,
    /// Targets that had to be allocated
    pub misses: u64,
    /// Targets currently idle in the pool
    pub pool_count: usize,
}

impl TexturePoolStats {
    /// Pool hit rate (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Idle render targets of the working size
#[derive(Debug)]
pub struct TexturePool {
    idle: Vec<RenderTargetId>,
    size: Size,
    stats: TexturePoolStats,
}

impl TexturePool {
    pub fn new(size: Size) -> Self {
        Self {
            idle: Vec::with_capacity(4),
            size,
            stats: TexturePoolStats::default(),
        }
    }

    /// Take an idle target, allocating a new one when the pool is empty
    pub fn acquire<C: RenderContext>(&mut self, ctx: &mut C) -> Result<RenderTargetId> {
        if let Some(id) = self.idle.pop() {
            self.stats.hits += 1;
            self.stats.pool_count = self.idle.len();
            return Ok(id);
        }

        let id = ctx.create_render_target(self.size)?;
        self.stats.misses += 1;
        tracing::debug!(
            "filter pool miss: allocated {:?} at {}x{} ({} allocated so far)",
            id,
            self.size.width,
            self.size.height,
            self.stats.misses
        );
        Ok(id)
    }

    /// Return a target to the pool
    ///
    /// Targets allocated before a working-size change are destroyed instead.
    pub fn release<C: RenderContext>(&mut self, ctx: &mut C, id: RenderTargetId) {
        let matches = ctx
            .render_target(id)
            .is_some_and(|target| target.size == self.size);

        if matches {
            self.idle.push(id);
            self.stats.pool_count = self.idle.len();
        } else {
            tracing::debug!("dropping stale filter target {:?}", id);
            ctx.destroy_render_target(id);
        }
    }

    /// Change the size of future allocations, destroying idle targets of the old size
    pub fn resize<C: RenderContext>(&mut self, ctx: &mut C, size: Size) {
        if self.size == size {
            return;
        }
        self.destroy_all(ctx);
        self.size = size;
    }

    /// Destroy every idle target
    pub fn destroy_all<C: RenderContext>(&mut self, ctx: &mut C) {
        for id in self.idle.drain(..) {
            ctx.destroy_render_target(id);
        }
        self.stats.pool_count = 0;
    }

    /// Forget every idle target without touching the context.
    ///
    /// Used after context loss, when the handles are already invalid.
    pub fn clear(&mut self) {
        self.idle.clear();
        self.stats.pool_count = 0;
    }

    pub fn contains(&self, id: RenderTargetId) -> bool {
        self.idle.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.idle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idle.is_empty()
    }

    /// Size every pooled target is allocated at
    pub fn size(&self) -> Size {
        self.size
    }

    pub fn stats(&self) -> &TexturePoolStats {
        &self.stats
    }
}
