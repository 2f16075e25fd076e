use std::rc::Rc;

use tracing::trace;

use crate::{backward_function::BackwardFunction, grad_mode::is_grad_enabled, node::Node, tensor::Tensor, Buffer, Result};

/// The backward half of a differentiable operation.
///
/// Implementations hold only the forward values their derivative needs.
pub(crate) trait Function {
    fn name(&self) -> &'static str;

    /// Maps the gradient of the output to one gradient per operand, in operand
    /// order. Each returned gradient has the shape of its operand.
    fn backward(&self, grad_output: &Buffer) -> Result<Vec<Buffer>>;
}

/// Wraps the output of a forward computation, linking it into the graph when
/// any operand requires grad and grad mode is enabled.
pub(crate) fn record<F>(data: Buffer, function: F, inputs: &[&Tensor]) -> Tensor
where
    F: Function + 'static,
{
    if !is_grad_enabled() || !inputs.iter().any(|input| input.requires_grad) {
        return Tensor::from(data);
    }
    let next_functions = inputs.iter().map(|input| input.gradient_edge()).collect();
    trace!(op = function.name(), shape = ?data.shape(), "recorded operation");
    let grad_fn = BackwardFunction::new(Box::new(function), next_functions);
    Tensor::from_operation(data, Rc::new(Node::BackwardFunction(grad_fn)))
}
