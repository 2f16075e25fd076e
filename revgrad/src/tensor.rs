use std::{cell::RefCell, rc::Rc};

use ndarray::{Array2, ArrayD, IxDyn};
use tracing::{debug, warn};

use crate::{
    accumulate_grad::AccumulateGrad, add, backward, broadcast, div, exp, log, matmul, mul, node::Node, norm, pow, relu, reshape, sqrt, sub,
    sum, transpose, AutogradError, Buffer, Cell, Result,
};

/// A value in a computation, together with its autodiff metadata.
///
/// Cloning a `Tensor` is cheap and yields a handle to the same node: clones
/// share the value storage, the `grad_fn` and the accumulated gradient.
#[derive(Clone)]
pub struct Tensor {
    pub(crate) data: Buffer,
    pub(crate) requires_grad: bool,
    pub(crate) grad: Cell<Option<Buffer>>,
    pub(crate) grad_fn: Option<Rc<Node>>,
    pub(crate) grad_accumulator: Option<Rc<Node>>,
}

impl Tensor {
    pub(crate) fn from_operation(data: Buffer, grad_fn: Rc<Node>) -> Self {
        Tensor {
            data,
            requires_grad: true,
            grad: Rc::new(RefCell::new(None)),
            grad_fn: Some(grad_fn),
            grad_accumulator: None,
        }
    }

    /// Creates a tensor of the given shape from row-major `values`.
    pub fn from_vec(shape: &[usize], values: Vec<f64>) -> Result<Self> {
        Ok(Tensor::from(ArrayD::from_shape_vec(IxDyn(shape), values)?))
    }

    /// A zero-dimensional tensor.
    pub fn scalar(value: f64) -> Self {
        Tensor::from_elem(&[], value)
    }

    pub fn from_elem(shape: &[usize], value: f64) -> Self {
        Tensor::from(Buffer::from_elem(IxDyn(shape), value))
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Tensor::from(Buffer::zeros(IxDyn(shape)))
    }

    pub fn ones(shape: &[usize]) -> Self {
        Tensor::from(Buffer::ones(IxDyn(shape)))
    }

    pub fn zeros_like(other: &Tensor) -> Self {
        Tensor::zeros(other.shape())
    }

    pub fn ones_like(other: &Tensor) -> Self {
        Tensor::ones(other.shape())
    }

    /// A `rows` x `cols` matrix with ones on the main diagonal.
    pub fn eye(rows: usize, cols: usize) -> Self {
        let data = Array2::from_shape_fn((rows, cols), |(i, j)| if i == j { 1.0 } else { 0.0 });
        Tensor::from(data.into_dyn())
    }

    /// Builder form of [`Tensor::set_requires_grad`] for freshly created leaves.
    ///
    /// Non-leaf tensors are returned unchanged.
    pub fn with_requires_grad(mut self, requires_grad: bool) -> Self {
        if let Err(err) = self.set_requires_grad(requires_grad) {
            warn!(%err, "with_requires_grad ignored");
        }
        self
    }

    /// Marks a leaf as a gradient target (or stops tracking it).
    ///
    /// Non-leaf tensors always require grad; asking them to stop fails with
    /// [`AutogradError::NonLeaf`].
    pub fn set_requires_grad(&mut self, requires_grad: bool) -> Result<()> {
        if !self.is_leaf() {
            return if requires_grad { Ok(()) } else { Err(AutogradError::NonLeaf) };
        }
        self.requires_grad = requires_grad;
        self.grad_accumulator = requires_grad
            .then(|| Rc::new(Node::AccumulateGrad(AccumulateGrad::new(&self.grad, self.data.shape()))));
        Ok(())
    }

    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    pub fn is_leaf(&self) -> bool {
        self.grad_fn.is_none()
    }

    /// Name of the operation that produced this tensor, if it was recorded.
    pub fn grad_fn_name(&self) -> Option<&'static str> {
        self.grad_fn.as_ref().map(|node| node.name())
    }

    pub fn data(&self) -> &Buffer {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The value of a single-element tensor.
    pub fn item(&self) -> Result<f64> {
        match self.data.iter().next() {
            Some(value) if self.data.len() == 1 => Ok(*value),
            _ => Err(AutogradError::ShapeMismatch {
                expected: vec![],
                got: self.shape().to_vec(),
            }),
        }
    }

    /// Values in row-major order.
    pub fn to_vec(&self) -> Vec<f64> {
        self.data.iter().copied().collect()
    }

    /// Returns `true` if both tensors have the same shape and every pair of
    /// elements differs by at most `tolerance`.
    pub fn allclose(&self, other: &Tensor, tolerance: f64) -> bool {
        self.shape() == other.shape()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    /// Snapshot of the gradient accumulated into this leaf.
    ///
    /// Non-leaf tensors never expose a gradient.
    pub fn grad(&self) -> Option<Tensor> {
        if !self.is_leaf() {
            debug!(op = self.grad_fn_name(), "grad() of a non-leaf tensor is never populated");
            return None;
        }
        self.grad.borrow().as_ref().map(|grad| Tensor::from(grad.clone()))
    }

    /// Resets the accumulated gradient to zero in place.
    pub fn zero_grad(&self) {
        if let Some(grad) = self.grad.borrow_mut().as_mut() {
            grad.fill(0.0);
        }
    }

    /// Drops the accumulated gradient buffer.
    pub fn clear_grad(&self) {
        *self.grad.borrow_mut() = None;
    }

    /// Returns a tensor sharing this tensor's storage but cut from the graph.
    pub fn detach(&self) -> Tensor {
        Tensor::from(self.data.clone())
    }

    pub(crate) fn gradient_edge(&self) -> Option<Rc<Node>> {
        if !self.requires_grad {
            return None;
        }
        self.grad_fn.clone().or_else(|| self.grad_accumulator.clone())
    }

    /// Backpropagates from a zero-dimensional tensor, releasing the graph.
    pub fn backward(&self) -> Result<()> {
        backward::backward(self, None, false)
    }

    /// Backpropagates `seed` (a vector-Jacobian product for non-scalar roots).
    ///
    /// With `retain_graph` the recorded graph stays valid for another pass.
    pub fn backward_with(&self, seed: Option<&Tensor>, retain_graph: bool) -> Result<()> {
        backward::backward(self, seed, retain_graph)
    }

    pub fn powf(&self, exponent: f64) -> Tensor {
        pow::pow(self, exponent)
    }

    pub fn powi(&self, exponent: i32) -> Tensor {
        pow::pow(self, exponent.into())
    }

    pub fn square(&self) -> Tensor {
        self.powi(2)
    }

    pub fn exp(&self) -> Tensor {
        exp::exp(self)
    }

    pub fn log(&self) -> Tensor {
        log::log(self)
    }

    pub fn sqrt(&self) -> Tensor {
        sqrt::sqrt(self)
    }

    pub fn relu(&self) -> Tensor {
        relu::relu(self)
    }

    /// Sum of all elements as a zero-dimensional tensor.
    pub fn sum(&self) -> Tensor {
        sum::sum(self)
    }

    pub fn mean(&self) -> Tensor {
        self.sum() / self.len() as f64
    }

    /// Euclidean norm of all elements.
    pub fn norm(&self) -> Tensor {
        norm::norm(self)
    }

    /// Reverses the axes; for matrices this is the transpose.
    pub fn t(&self) -> Tensor {
        transpose::transpose(self)
    }

    pub fn reshape(&self, shape: &[usize]) -> Result<Tensor> {
        reshape::reshape(self, shape)
    }

    /// Matrix product for 2-D x 2-D, 2-D x 1-D, 1-D x 2-D and 1-D x 1-D operands.
    pub fn matmul(&self, rhs: &Tensor) -> Result<Tensor> {
        matmul::matmul(self, rhs)
    }

    /// Fallible form of `self + rhs`: shapes that do not broadcast together
    /// give [`AutogradError::IncompatibleShapes`] instead of a panic.
    pub fn try_add(&self, rhs: &Tensor) -> Result<Tensor> {
        broadcast::check_broadcast("add", self.shape(), rhs.shape())?;
        Ok(add::add(self, rhs))
    }

    pub fn try_sub(&self, rhs: &Tensor) -> Result<Tensor> {
        broadcast::check_broadcast("sub", self.shape(), rhs.shape())?;
        Ok(sub::sub(self, rhs))
    }

    pub fn try_mul(&self, rhs: &Tensor) -> Result<Tensor> {
        broadcast::check_broadcast("mul", self.shape(), rhs.shape())?;
        Ok(mul::mul(self, rhs))
    }

    pub fn try_div(&self, rhs: &Tensor) -> Result<Tensor> {
        broadcast::check_broadcast("div", self.shape(), rhs.shape())?;
        Ok(div::div(self, rhs))
    }

    pub fn dot(&self, rhs: &Tensor) -> Result<Tensor> {
        if self.ndim() != 1 || rhs.ndim() != 1 {
            return Err(AutogradError::IncompatibleShapes {
                op: "dot",
                lhs: self.shape().to_vec(),
                rhs: rhs.shape().to_vec(),
            });
        }
        matmul::matmul(self, rhs)
    }
}

impl From<Buffer> for Tensor {
    fn from(data: Buffer) -> Self {
        Tensor {
            data,
            requires_grad: false,
            grad: Rc::new(RefCell::new(None)),
            grad_fn: None,
            grad_accumulator: None,
        }
    }
}

impl From<ArrayD<f64>> for Tensor {
    fn from(data: ArrayD<f64>) -> Self {
        Tensor::from(data.into_shared())
    }
}

impl From<Tensor> for Vec<f64> {
    fn from(tensor: Tensor) -> Self {
        tensor.to_vec()
    }
}

/// Value equality: same shape and elements, regardless of graph metadata.
impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("data", &self.data)
            .field("requires_grad", &self.requires_grad)
            .field("is_leaf", &self.is_leaf())
            .field("grad_fn", &self.grad_fn_name())
            .field("grad", &self.grad.borrow())
            .finish()
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:path) => {
        impl std::ops::$trait<&Tensor> for &Tensor {
            type Output = Tensor;

            fn $method(self, rhs: &Tensor) -> Tensor {
                $op(self, rhs)
            }
        }

        impl std::ops::$trait<Tensor> for Tensor {
            type Output = Tensor;

            fn $method(self, rhs: Tensor) -> Tensor {
                $op(&self, &rhs)
            }
        }

        impl std::ops::$trait<&Tensor> for Tensor {
            type Output = Tensor;

            fn $method(self, rhs: &Tensor) -> Tensor {
                $op(&self, rhs)
            }
        }

        impl std::ops::$trait<Tensor> for &Tensor {
            type Output = Tensor;

            fn $method(self, rhs: Tensor) -> Tensor {
                $op(self, &rhs)
            }
        }

        impl std::ops::$trait<f64> for &Tensor {
            type Output = Tensor;

            fn $method(self, rhs: f64) -> Tensor {
                $op(self, &Tensor::scalar(rhs))
            }
        }

        impl std::ops::$trait<f64> for Tensor {
            type Output = Tensor;

            fn $method(self, rhs: f64) -> Tensor {
                $op(&self, &Tensor::scalar(rhs))
            }
        }

        impl std::ops::$trait<&Tensor> for f64 {
            type Output = Tensor;

            fn $method(self, rhs: &Tensor) -> Tensor {
                $op(&Tensor::scalar(self), rhs)
            }
        }

        impl std::ops::$trait<Tensor> for f64 {
            type Output = Tensor;

            fn $method(self, rhs: Tensor) -> Tensor {
                $op(&Tensor::scalar(self), &rhs)
            }
        }
    };
}

// Elementwise operators follow ndarray co-broadcasting and panic when the
// operand shapes cannot be broadcast together; see `Tensor::try_add` and
// friends for the checked forms.
impl_binary_op!(Add, add, add::add);
impl_binary_op!(Sub, sub, sub::sub);
impl_binary_op!(Mul, mul, mul::mul);
impl_binary_op!(Div, div, div::div);

impl std::ops::Neg for &Tensor {
    type Output = Tensor;

    fn neg(self) -> Tensor {
        sub::neg(self)
    }
}

impl std::ops::Neg for Tensor {
    type Output = Tensor;

    fn neg(self) -> Tensor {
        sub::neg(&self)
    }
}
