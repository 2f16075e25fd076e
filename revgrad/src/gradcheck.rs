//! Finite-difference verification of analytic gradients.
//!
//! The numerical Jacobian is built with central differences, one input
//! element at a time, inside a no-grad scope. Rows index output elements and
//! columns index input elements, both flattened in row-major order.

use ndarray::{Array1, Array2, IxDyn};

use crate::{grad_mode::no_grad, AutogradError, Buffer, Result, Tensor};

/// Outcome of [`check_vjp`].
#[derive(Debug, Clone)]
pub struct GradCheck {
    pub analytic: Buffer,
    pub numeric: Buffer,
    pub max_error: f64,
    pub passed: bool,
}

/// Central-difference Jacobian of `f` at `input`.
pub fn numerical_jacobian<F>(f: F, input: &Tensor, eps: f64) -> Result<Array2<f64>>
where
    F: Fn(&Tensor) -> Result<Tensor>,
{
    no_grad(|| -> Result<Array2<f64>> {
        let base = input.data().to_owned();
        let outputs = f(&Tensor::from(base.clone()))?.len();
        let mut jacobian = Array2::zeros((outputs, base.len()));
        for column in 0..base.len() {
            let shifted = |delta: f64| -> Result<Tensor> {
                let mut point = base.clone();
                if let Some(value) = point.iter_mut().nth(column) {
                    *value += delta;
                }
                f(&Tensor::from(point))
            };
            let plus = shifted(eps)?;
            let minus = shifted(-eps)?;
            for (row, (p, m)) in plus.data().iter().zip(minus.data().iter()).enumerate() {
                jacobian[[row, column]] = (p - m) / (2.0 * eps);
            }
        }
        Ok(jacobian)
    })
}

/// `seedᵀ · J` computed from the numerical Jacobian, shaped like `input`.
pub fn numerical_vjp<F>(f: F, input: &Tensor, seed: &Tensor, eps: f64) -> Result<Buffer>
where
    F: Fn(&Tensor) -> Result<Tensor>,
{
    let jacobian = numerical_jacobian(f, input, eps)?;
    if seed.len() != jacobian.nrows() {
        return Err(AutogradError::ShapeMismatch {
            expected: vec![jacobian.nrows()],
            got: seed.shape().to_vec(),
        });
    }
    let v: Array1<f64> = seed.data().iter().copied().collect();
    let vjp = jacobian.t().dot(&v);
    Ok(vjp.into_shape_with_order(IxDyn(input.shape()))?.into_shared())
}

/// Compares the analytic vector-Jacobian product of `f` at `input` against
/// central differences.
///
/// `f` is evaluated on a fresh leaf sharing `input`'s storage, so `input`'s
/// own gradient is left untouched.
pub fn check_vjp<F>(f: F, input: &Tensor, seed: &Tensor, eps: f64, tolerance: f64) -> Result<GradCheck>
where
    F: Fn(&Tensor) -> Result<Tensor>,
{
    let leaf = input.detach().with_requires_grad(true);
    f(&leaf)?.backward_with(Some(seed), false)?;
    let analytic = match leaf.grad() {
        Some(grad) => grad.data().clone(),
        None => Buffer::zeros(IxDyn(input.shape())),
    };
    let numeric = numerical_vjp(&f, input, seed, eps)?;
    let max_error = analytic
        .iter()
        .zip(numeric.iter())
        .map(|(a, n)| (a - n).abs())
        .fold(0.0, f64::max);
    Ok(GradCheck {
        analytic,
        numeric,
        max_error,
        passed: max_error <= tolerance,
    })
}
