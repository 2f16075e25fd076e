//! Error types for revgrad.

use thiserror::Error;

/// Errors reported by graph construction and backward traversal.
#[derive(Debug, Error)]
pub enum AutogradError {
    /// `backward` was called on a tensor that is not part of any graph.
    #[error("tensor does not require grad and has no grad_fn")]
    NotDifferentiable,

    /// A seed or accumulated gradient does not match the shape it flows into.
    #[error("gradient shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    /// The graph was already released by a previous non-retained backward.
    #[error("{op} was already freed by a previous backward; pass retain_graph = true to traverse the graph again")]
    GraphAlreadyFreed { op: &'static str },

    /// A backward function returned the wrong number of input gradients.
    #[error("{op} returned {got} gradients for {expected} inputs")]
    MissingGradient {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    /// `requires_grad` can only be changed on leaf tensors.
    #[error("requires_grad can only be changed on leaf tensors")]
    NonLeaf,

    /// Operand shapes cannot be combined by the operation.
    #[error("{op}: incompatible shapes {lhs:?} and {rhs:?}")]
    IncompatibleShapes {
        op: &'static str,
        lhs: Vec<usize>,
        rhs: Vec<usize>,
    },

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, AutogradError>;
