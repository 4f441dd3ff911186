//! Filter capabilities and filtered scene nodes

use std::cell::{Ref, RefCell};

use prism_core::Rect;

use crate::context::RenderContext;
use crate::error::Result;
use crate::manager::FilterManager;
use crate::target::RenderTargetId;

/// A post-processing effect applied to a rendered buffer
///
/// `input` holds the filtered subtree, `output` is the enclosing buffer the
/// result is composited into. Implementations normally finish with
/// [`FilterManager::apply_filter`].
pub trait Filter<C: RenderContext> {
    fn apply_filter(
        &self,
        manager: &mut FilterManager<C>,
        ctx: &mut C,
        input: RenderTargetId,
        output: RenderTargetId,
    ) -> Result<()>;
}

/// A scene node that carries filters
pub trait FilterTarget {
    /// Explicit filter region, if the node has one
    fn filter_area(&self) -> Option<Rect> {
        None
    }

    /// Screen-space bounding box of the node's subtree
    fn bounds(&self) -> Rect;
}

impl FilterTarget for Rect {
    fn bounds(&self) -> Rect {
        *self
    }
}

/// Draws the input region into the output unchanged
pub struct PassthroughFilter<C: RenderContext> {
    shader: RefCell<C::Shader>,
}

impl<C: RenderContext> PassthroughFilter<C> {
    pub fn new(shader: C::Shader) -> Self {
        Self {
            shader: RefCell::new(shader),
        }
    }

    pub fn shader(&self) -> Ref<'_, C::Shader> {
        self.shader.borrow()
    }
}

impl<C: RenderContext> Filter<C> for PassthroughFilter<C> {
    fn apply_filter(
        &self,
        manager: &mut FilterManager<C>,
        ctx: &mut C,
        input: RenderTargetId,
        output: RenderTargetId,
    ) -> Result<()> {
        let mut shader = self.shader.borrow_mut();
        manager.apply_filter(ctx, &mut shader, input, output)
    }
}
