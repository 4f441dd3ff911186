//! Render target descriptions shared by every render context

use prism_core::{Matrix, Rect, Size};

slotmap::new_key_type! {
    /// Handle to a render target owned by a render context.
    ///
    /// Two handles compare equal exactly when they name the same buffer.
    pub struct RenderTargetId;
}

/// CPU-side state of one render target
///
/// Backends keep the GPU texture next to this record and hand it out by
/// [`RenderTargetId`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderTarget {
    /// Allocated size in pixels
    pub size: Size,
    /// Sub-rectangle currently in use (the filter region for pooled targets)
    pub frame: Rect,
    /// Whether this is the renderer's final output rather than an off-screen buffer
    pub is_root: bool,
    /// Whether pixel row 0 maps to the top of clip space. GL framebuffers
    /// flip only the root; wgpu textures are top-down so every target flips.
    pub flip_y: bool,
}

impl RenderTarget {
    /// An off-screen buffer whose frame covers the whole texture
    pub fn offscreen(size: Size) -> Self {
        Self {
            size,
            frame: size.to_rect(),
            is_root: false,
            flip_y: false,
        }
    }

    /// The renderer's output
    pub fn root(size: Size) -> Self {
        Self {
            size,
            frame: size.to_rect(),
            is_root: true,
            flip_y: true,
        }
    }

    /// Pixel-to-clip projection for drawing into this target
    pub fn projection_matrix(&self) -> Matrix {
        Matrix::projection(self.size, self.flip_y)
    }

    /// Projection for rendering the filtered subtree: the frame origin lands
    /// on the buffer origin at 1:1 scale, which is where the filter pass
    /// samples from.
    pub fn content_projection(&self) -> Matrix {
        let mut projection = self.projection_matrix();
        projection.tx -= self.frame.x() * projection.a;
        projection.ty -= self.frame.y() * projection.d;
        projection
    }
}
