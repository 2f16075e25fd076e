use ndarray::{prelude::*, Ix0};

use crate::{
    function::{record, Function},
    tensor::Tensor,
    AutogradError, Buffer, Result,
};

fn outer(x: ArrayView1<f64>, y: ArrayView1<f64>) -> Array2<f64> {
    x.insert_axis(Axis(1)).dot(&y.insert_axis(Axis(0)))
}

/// Saves both operands; the dimensionality of each picks the product rule.
#[derive(Debug, Clone)]
pub(crate) struct MatMulBackward {
    lhs: Buffer,
    rhs: Buffer,
}

impl Function for MatMulBackward {
    fn name(&self) -> &'static str {
        "MatMulBackward"
    }

    fn backward(&self, grad_output: &Buffer) -> Result<Vec<Buffer>> {
        let (grad_lhs, grad_rhs) = match (self.lhs.ndim(), self.rhs.ndim()) {
            (2, 2) => {
                let a = self.lhs.view().into_dimensionality::<Ix2>()?;
                let b = self.rhs.view().into_dimensionality::<Ix2>()?;
                let g = grad_output.view().into_dimensionality::<Ix2>()?;
                (g.dot(&b.t()).into_dyn(), a.t().dot(&g).into_dyn())
            }
            (2, 1) => {
                let a = self.lhs.view().into_dimensionality::<Ix2>()?;
                let b = self.rhs.view().into_dimensionality::<Ix1>()?;
                let g = grad_output.view().into_dimensionality::<Ix1>()?;
                (outer(g, b).into_dyn(), a.t().dot(&g).into_dyn())
            }
            (1, 2) => {
                let a = self.lhs.view().into_dimensionality::<Ix1>()?;
                let b = self.rhs.view().into_dimensionality::<Ix2>()?;
                let g = grad_output.view().into_dimensionality::<Ix1>()?;
                (b.dot(&g).into_dyn(), outer(a, g).into_dyn())
            }
            _ => {
                let g = *grad_output.view().into_dimensionality::<Ix0>()?.into_scalar();
                ((&self.rhs * g).into_dyn(), (&self.lhs * g).into_dyn())
            }
        };
        Ok(vec![grad_lhs.into_shared(), grad_rhs.into_shared()])
    }
}

pub(crate) fn matmul(lhs: &Tensor, rhs: &Tensor) -> Result<Tensor> {
    let incompatible = || AutogradError::IncompatibleShapes {
        op: "matmul",
        lhs: lhs.shape().to_vec(),
        rhs: rhs.shape().to_vec(),
    };
    let (lhs_ndim, rhs_ndim) = (lhs.ndim(), rhs.ndim());
    if !(1..=2).contains(&lhs_ndim) || !(1..=2).contains(&rhs_ndim) {
        return Err(incompatible());
    }
    // inner dimensions: last axis of lhs against first axis of rhs
    if lhs.shape()[lhs_ndim - 1] != rhs.shape()[0] {
        return Err(incompatible());
    }

    let data = match (lhs_ndim, rhs_ndim) {
        (2, 2) => {
            let a = lhs.data.view().into_dimensionality::<Ix2>()?;
            let b = rhs.data.view().into_dimensionality::<Ix2>()?;
            a.dot(&b).into_dyn()
        }
        (2, 1) => {
            let a = lhs.data.view().into_dimensionality::<Ix2>()?;
            let b = rhs.data.view().into_dimensionality::<Ix1>()?;
            a.dot(&b).into_dyn()
        }
        (1, 2) => {
            let a = lhs.data.view().into_dimensionality::<Ix1>()?;
            let b = rhs.data.view().into_dimensionality::<Ix2>()?;
            a.dot(&b).into_dyn()
        }
        _ => {
            let a = lhs.data.view().into_dimensionality::<Ix1>()?;
            let b = rhs.data.view().into_dimensionality::<Ix1>()?;
            arr0(a.dot(&b)).into_dyn()
        }
    };
    let function = MatMulBackward {
        lhs: lhs.data.clone(),
        rhs: rhs.data.clone(),
    };
    Ok(record(data.into_shared(), function, &[lhs, rhs]))
}
