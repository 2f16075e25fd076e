use ndarray::Axis;

use crate::{AutogradError, Buffer, Result};

/// Checks that `lhs` and `rhs` co-broadcast: aligned from the trailing axis,
/// each pair of sizes is equal or one of them is 1.
pub(crate) fn check_broadcast(op: &'static str, lhs: &[usize], rhs: &[usize]) -> Result<()> {
    let compatible = lhs
        .iter()
        .rev()
        .zip(rhs.iter().rev())
        .all(|(&l, &r)| l == r || l == 1 || r == 1);
    if compatible {
        Ok(())
    } else {
        Err(AutogradError::IncompatibleShapes {
            op,
            lhs: lhs.to_vec(),
            rhs: rhs.to_vec(),
        })
    }
}

/// Sums a gradient over the axes that forward broadcasting expanded, so it
/// lines up with an operand of `shape`.
pub(crate) fn sum_to_shape(grad: Buffer, shape: &[usize]) -> Buffer {
    if grad.shape() == shape {
        return grad;
    }
    let mut reduced = grad.into_owned();
    while reduced.ndim() > shape.len() {
        reduced = reduced.sum_axis(Axis(0));
    }
    for (axis, &size) in shape.iter().enumerate() {
        if size == 1 && reduced.shape()[axis] != 1 {
            reduced = reduced.sum_axis(Axis(axis)).insert_axis(Axis(axis));
        }
    }
    reduced.into_shared()
}
