use crate::{
    function::{record, Function},
    tensor::Tensor,
    Buffer, Result,
};

#[derive(Debug, Clone)]
pub(crate) struct TransposeBackward;

impl Function for TransposeBackward {
    fn name(&self) -> &'static str {
        "TransposeBackward"
    }

    fn backward(&self, grad_output: &Buffer) -> Result<Vec<Buffer>> {
        Ok(vec![grad_output.clone().reversed_axes()])
    }
}

/// Reverses the axes. The output is a strided view of the input's storage.
pub(crate) fn transpose(tensor: &Tensor) -> Tensor {
    let data = tensor.data.clone().reversed_axes();
    record(data, TransposeBackward, &[tensor])
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use ndarray::{arr2, Array};
    use ndarray_rand::{rand_distr::Uniform, RandomExt};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::gradcheck::check_vjp;

    #[test]
    fn test_transpose_shares_storage() {
        let x = Tensor::from(arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).into_dyn());
        let y = x.t();
        assert_eq!(y.shape(), &[3, 2]);
        assert_eq!(y.to_vec(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(y.data().as_ptr(), x.data().as_ptr());
    }

    #[test]
    fn test_transpose_random() {
        for _ in 0..10 {
            let A = Array::random((3, 5), Uniform::new(-5., 5.)).into_dyn();
            let seed = Tensor::from(Array::random((5, 3), Uniform::new(-1., 1.)).into_dyn());
            let check = check_vjp(|x| Ok(x.t() * 2.0), &Tensor::from(A), &seed, 1e-6, 1e-6).unwrap();
            assert!(check.passed, "max error {}", check.max_error);
            assert_eq!(check.analytic.shape(), &[3, 5]);
        }
    }
}
