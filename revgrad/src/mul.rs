use crate::{
    broadcast::sum_to_shape,
    function::{record, Function},
    tensor::Tensor,
    Buffer, Result,
};

/// Saves both operands: each one's gradient is scaled by the other.
#[derive(Debug, Clone)]
pub(crate) struct MulBackward {
    lhs: Buffer,
    rhs: Buffer,
}

impl Function for MulBackward {
    fn name(&self) -> &'static str {
        "MulBackward"
    }

    fn backward(&self, grad_output: &Buffer) -> Result<Vec<Buffer>> {
        let grad_lhs = (grad_output * &self.rhs).into_shared();
        let grad_rhs = (grad_output * &self.lhs).into_shared();
        Ok(vec![
            sum_to_shape(grad_lhs, self.lhs.shape()),
            sum_to_shape(grad_rhs, self.rhs.shape()),
        ])
    }
}

pub(crate) fn mul(lhs: &Tensor, rhs: &Tensor) -> Tensor {
    let data = (&lhs.data * &rhs.data).into_shared();
    let function = MulBackward {
        lhs: lhs.data.clone(),
        rhs: rhs.data.clone(),
    };
    record(data, function, &[lhs, rhs])
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use ndarray::Array;
    use ndarray_rand::{rand_distr::Uniform, RandomExt};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::gradcheck::check_vjp;

    #[test]
    fn test_mul() {
        let a = Tensor::from_vec(&[3], vec![1.0, 2.0, 3.0]).unwrap().with_requires_grad(true);
        let b = Tensor::from_vec(&[3], vec![4.0, 5.0, 6.0]).unwrap().with_requires_grad(true);
        (&a * &b).sum().backward().unwrap();
        assert_eq!(a.grad().unwrap().to_vec(), vec![4.0, 5.0, 6.0]);
        assert_eq!(b.grad().unwrap().to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mul_shared_operand() {
        // a * a feeds the same leaf through both edges
        let a = Tensor::from_vec(&[2], vec![3.0, -1.0]).unwrap().with_requires_grad(true);
        (&a * &a).sum().backward().unwrap();
        assert_eq!(a.grad().unwrap().to_vec(), vec![6.0, -2.0]);
    }

    #[test]
    fn test_mul_random() {
        for _ in 0..20 {
            let A = Array::random((4, 3), Uniform::new(-5., 5.)).into_dyn();
            let B = Array::random((4, 3), Uniform::new(-5., 5.)).into_dyn();
            let seed = Tensor::from(Array::random((4, 3), Uniform::new(-1., 1.)).into_dyn());
            let other = Tensor::from(B);
            let check = check_vjp(|x| Ok(x * &other * x), &Tensor::from(A), &seed, 1e-5, 1e-6).unwrap();
            assert!(check.passed, "max error {}", check.max_error);
        }
    }

    #[test]
    fn test_mul_column_broadcast() {
        let x = Tensor::from(Array::random((3, 1), Uniform::new(-2., 2.)).into_dyn());
        let m = Tensor::from(Array::random((3, 5), Uniform::new(-2., 2.)).into_dyn());
        let seed = Tensor::from(Array::random((3, 5), Uniform::new(-1., 1.)).into_dyn());
        let check = check_vjp(|x| Ok(&m * x), &x, &seed, 1e-6, 1e-6).unwrap();
        assert!(check.passed, "max error {}", check.max_error);
        assert_eq!(check.analytic.shape(), &[3, 1]);
    }
}
