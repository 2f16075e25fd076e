use num_traits::Inv;

use crate::{
    function::{record, Function},
    tensor::Tensor,
    Buffer, Result,
};

/// Natural logarithm.
#[derive(Debug, Clone)]
pub(crate) struct LogBackward {
    input: Buffer,
}

impl Function for LogBackward {
    fn name(&self) -> &'static str {
        "LogBackward"
    }

    fn backward(&self, grad_output: &Buffer) -> Result<Vec<Buffer>> {
        let local = self.input.mapv(Inv::inv);
        Ok(vec![(grad_output * &local).into_shared()])
    }
}

pub(crate) fn log(tensor: &Tensor) -> Tensor {
    let data = tensor.data.mapv(f64::ln).into_shared();
    let function = LogBackward { input: tensor.data.clone() };
    record(data, function, &[tensor])
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use all_asserts::assert_near;
    use ndarray::Array;
    use ndarray_rand::{rand_distr::Uniform, RandomExt};

    use super::*;
    use crate::gradcheck::check_vjp;

    #[test]
    fn test_log() {
        let x = Tensor::scalar(4.0).with_requires_grad(true);
        let y = x.log();
        assert_near!(y.item().unwrap(), 4f64.ln(), 1e-12);
        y.backward().unwrap();
        assert_near!(x.grad().unwrap().item().unwrap(), 0.25, 1e-12);
    }

    #[test]
    fn test_log_exp_is_identity() {
        let x = Tensor::from_vec(&[3], vec![-1.0, 0.5, 2.0]).unwrap().with_requires_grad(true);
        x.exp().log().sum().backward().unwrap();
        for g in x.grad().unwrap().to_vec() {
            assert_near!(g, 1.0, 1e-12);
        }
    }

    #[test]
    fn test_log_random() {
        for _ in 0..20 {
            let A = Array::random((3, 3), Uniform::new(0.5, 50.)).into_dyn();
            let seed = Tensor::from(Array::random((3, 3), Uniform::new(-1., 1.)).into_dyn());
            let check = check_vjp(|x| Ok(x.log()), &Tensor::from(A), &seed, 1e-6, 1e-5).unwrap();
            assert!(check.passed, "max error {}", check.max_error);
        }
    }
}
