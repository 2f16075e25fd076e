//! Reverse-mode automatic differentiation over `ndarray` buffers.
//!
//! Every differentiable operation on a [`Tensor`] that requires grad records a
//! `grad_fn` linking it to its inputs. Calling [`Tensor::backward`] walks that
//! graph from the root back to the leaves and accumulates gradients into each
//! leaf's `grad` buffer.
//!
//! ```
//! use revgrad::Tensor;
//!
//! let x = Tensor::ones(&[2, 2]).with_requires_grad(true);
//! let y = &x + 2.0;
//! let z = &y * &y * 3.0;
//! let out = z.mean();
//! out.backward().unwrap();
//! assert!(x.grad().unwrap().allclose(&Tensor::from_elem(&[2, 2], 4.5), 1e-12));
//! ```
mod accumulate_grad;
mod add;
mod backward_function;
mod broadcast;
mod div;
mod exp;
mod function;
mod log;
mod matmul;
mod mul;
mod node;
mod norm;
mod pow;
mod relu;
mod reshape;
mod sqrt;
mod sub;
mod sum;
mod transpose;

pub mod backward;
pub mod error;
pub mod gradcheck;
pub mod grad_mode;
pub mod tensor;

use std::{cell::RefCell, rc::Rc};

use ndarray::{ArcArray, IxDyn};

pub use error::{AutogradError, Result};
pub use grad_mode::{enable_grad, is_grad_enabled, no_grad, set_grad_enabled, EnableGradGuard, NoGradGuard};
pub use tensor::Tensor;

/// Shared, copy-on-write storage backing every tensor value and gradient.
pub type Buffer = ArcArray<f64, IxDyn>;

type Cell<T> = Rc<RefCell<T>>;
