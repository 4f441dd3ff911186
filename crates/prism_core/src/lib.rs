//! Prism Core
//!
//! Foundational types for the Prism filter compositor:
//!
//! - **Geometry**: points, sizes and rectangles in working-buffer pixels
//! - **Matrix**: in-place 2D affine transforms for projections and texture mapping
//! - **Region clamping**: [`cap_filter_area`] keeps filter regions inside the working buffer
//!
//! # Example
//!
//! ```rust
//! use prism_core::{cap_filter_area, Rect, Size};
//!
//! let mut area = Rect::new(-10.0, 50.0, 100.0, 100.0);
//! cap_filter_area(&mut area, Size::new(800.0, 600.0));
//! assert_eq!(area, Rect::new(0.0, 50.0, 90.0, 100.0));
//! ```

pub mod geometry;
pub mod matrix;

pub use geometry::{cap_filter_area, Point, Rect, Size};
pub use matrix::Matrix;
