//! Filter compositor error types

use thiserror::Error;

use crate::target::RenderTargetId;

/// Errors raised by the filter compositor and its render contexts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// `pop_filter` with no pushed frame above the root
    #[error("filter stack underflow: pop_filter called with only the root frame")]
    StackUnderflow,

    /// `begin` found frames left over from an unbalanced push/pop sequence
    #[error("filter stack left unbalanced at depth {depth}; leftover frames were released")]
    UnbalancedStack { depth: usize },

    /// `push_filter` called without any filter
    #[error("push_filter requires at least one filter")]
    EmptyFilterList,

    /// The render context does not know this target
    #[error("unknown render target {0:?}")]
    UnknownRenderTarget(RenderTargetId),

    /// The sprite world transform could not be inverted
    #[error("sprite world transform is singular")]
    SingularTransform,

    /// A draw was issued before all of its state was bound
    #[error("incomplete draw state: {0}")]
    IncompleteDrawState(&'static str),

    /// Adapter, device or resource failure in the backend
    #[error("device error: {0}")]
    Device(String),
}

/// Result type for filter operations
pub type Result<T> = std::result::Result<T, FilterError>;
