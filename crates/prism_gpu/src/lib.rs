//! Prism GPU filter compositor
//!
//! Applies post-processing filters to nested regions of a scene by
//! redirecting their rendering into pooled working-size buffers and
//! compositing the result back through a filter shader.
//!
//! [`FilterManager`] drives the stack of filtered regions. It talks to the
//! renderer only through [`RenderContext`]; [`WgpuContext`] is the wgpu
//! implementation.

pub mod context;
pub mod error;
pub mod filter;
pub mod manager;
pub mod pool;
pub mod quad;
pub mod shader;
pub mod shaders;
pub mod stack;
pub mod target;
pub mod wgpu_context;

#[cfg(test)]
mod test_support;

pub use context::RenderContext;
pub use error::{FilterError, Result};
pub use filter::{Filter, FilterTarget, PassthroughFilter};
pub use manager::{FilterManager, FilterManagerConfig, SpriteTransform};
pub use pool::{TexturePool, TexturePoolStats};
pub use quad::{Quad, QuadVertexLayout, QUAD_VERTEX_LAYOUT};
pub use shader::{FilterShader, FilterUniforms, WgpuFilterShader};
pub use stack::{FilterStack, StackFrame};
pub use target::{RenderTarget, RenderTargetId};
pub use wgpu_context::WgpuContext;
