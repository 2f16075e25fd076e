use crate::{
    function::{record, Function},
    tensor::Tensor,
    Buffer, Result,
};

#[derive(Debug, Clone)]
pub(crate) struct ReluBackward {
    input: Buffer,
}

impl Function for ReluBackward {
    fn name(&self) -> &'static str {
        "ReluBackward"
    }

    fn backward(&self, grad_output: &Buffer) -> Result<Vec<Buffer>> {
        let mask = self.input.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        Ok(vec![(grad_output * &mask).into_shared()])
    }
}

pub(crate) fn relu(tensor: &Tensor) -> Tensor {
    let data = tensor.data.mapv(|v| v.max(0.0)).into_shared();
    let function = ReluBackward { input: tensor.data.clone() };
    record(data, function, &[tensor])
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_relu() {
        let x = Tensor::from_vec(&[4], vec![-2.0, -0.0, 0.5, 3.0]).unwrap().with_requires_grad(true);
        let y = x.relu();
        assert_eq!(y.to_vec(), vec![0.0, 0.0, 0.5, 3.0]);
        let seed = Tensor::from_vec(&[4], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        y.backward_with(Some(&seed), false).unwrap();
        assert_eq!(x.grad().unwrap().to_vec(), vec![0.0, 0.0, 3.0, 4.0]);
    }
}
