use ndarray::IxDyn;

use crate::{
    function::{record, Function},
    tensor::Tensor,
    Buffer, Result,
};

#[derive(Debug, Clone)]
pub(crate) struct ReshapeBackward {
    input_shape: Vec<usize>,
}

impl Function for ReshapeBackward {
    fn name(&self) -> &'static str {
        "ReshapeBackward"
    }

    fn backward(&self, grad_output: &Buffer) -> Result<Vec<Buffer>> {
        let grad = grad_output.to_shape(IxDyn(&self.input_shape))?.into_owned();
        Ok(vec![grad.into_shared()])
    }
}

/// Row-major reshape. Fails when the element counts differ.
pub(crate) fn reshape(tensor: &Tensor, shape: &[usize]) -> Result<Tensor> {
    let data = tensor.data.to_shape(IxDyn(shape))?.into_owned().into_shared();
    let function = ReshapeBackward {
        input_shape: tensor.shape().to_vec(),
    };
    Ok(record(data, function, &[tensor]))
}
