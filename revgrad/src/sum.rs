use ndarray::IxDyn;

use crate::{
    function::{record, Function},
    tensor::Tensor,
    Buffer, Result,
};

/// Sum over every element. Only the input shape is needed to spread the
/// gradient back.
#[derive(Debug, Clone)]
pub(crate) struct SumBackward {
    input_shape: Vec<usize>,
}

impl Function for SumBackward {
    fn name(&self) -> &'static str {
        "SumBackward"
    }

    fn backward(&self, grad_output: &Buffer) -> Result<Vec<Buffer>> {
        // the output gradient holds a single element
        let upstream = grad_output.sum();
        Ok(vec![Buffer::from_elem(IxDyn(&self.input_shape), upstream)])
    }
}

pub(crate) fn sum(tensor: &Tensor) -> Tensor {
    let data = Buffer::from_elem(IxDyn(&[]), tensor.data.sum());
    let function = SumBackward {
        input_shape: tensor.shape().to_vec(),
    };
    record(data, function, &[tensor])
}
