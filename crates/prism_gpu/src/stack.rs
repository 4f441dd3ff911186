//! Nested filter regions
//!
//! Frame 0 is the root: it is bound to the renderer's output by `begin` and
//! is never popped. Every pushed frame owns a pooled target until its
//! matching pop.

use std::rc::Rc;

use prism_core::Rect;
use smallvec::SmallVec;

use crate::context::RenderContext;
use crate::filter::Filter;
use crate::target::RenderTargetId;

/// One nesting level of the filter stack
pub struct StackFrame<C: RenderContext> {
    /// Buffer the level renders into
    pub target: RenderTargetId,
    /// Filters queued against this level, in application order
    pub filters: Vec<Rc<dyn Filter<C>>>,
    /// Region the subtree occupies; the root's covers the whole output
    pub bounds: Option<Rect>,
}

impl<C: RenderContext> StackFrame<C> {
    fn root(target: RenderTargetId) -> Self {
        Self {
            target,
            filters: Vec::new(),
            bounds: None,
        }
    }
}

/// Ordered stack of [`StackFrame`]s, never empty
pub struct FilterStack<C: RenderContext> {
    frames: SmallVec<[StackFrame<C>; 4]>,
}

impl<C: RenderContext> FilterStack<C> {
    pub fn new(root_target: RenderTargetId) -> Self {
        let mut frames = SmallVec::new();
        frames.push(StackFrame::root(root_target));
        Self { frames }
    }

    /// Number of frames including the root
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn root(&self) -> &StackFrame<C> {
        &self.frames[0]
    }

    pub fn root_mut(&mut self) -> &mut StackFrame<C> {
        &mut self.frames[0]
    }

    /// Innermost frame (the root when nothing is pushed)
    pub fn top(&self) -> &StackFrame<C> {
        &self.frames[self.frames.len() - 1]
    }

    pub fn push(&mut self, frame: StackFrame<C>) {
        self.frames.push(frame);
    }

    /// Pop the innermost pushed frame; `None` when only the root is left
    pub fn pop(&mut self) -> Option<StackFrame<C>> {
        if self.frames.len() <= 1 {
            return None;
        }
        self.frames.pop()
    }

    /// Remove every frame above the root, innermost last
    pub fn drain_pushed(&mut self) -> SmallVec<[StackFrame<C>; 4]> {
        self.frames.drain(1..).collect()
    }
}
