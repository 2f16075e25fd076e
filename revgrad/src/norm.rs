use ndarray::IxDyn;

use crate::{
    function::{record, Function},
    tensor::Tensor,
    Buffer, Result,
};

/// Euclidean norm over every element. At a zero input the subgradient 0 is
/// used.
#[derive(Debug, Clone)]
pub(crate) struct NormBackward {
    input: Buffer,
    norm: f64,
}

impl Function for NormBackward {
    fn name(&self) -> &'static str {
        "NormBackward"
    }

    fn backward(&self, grad_output: &Buffer) -> Result<Vec<Buffer>> {
        if self.norm == 0.0 {
            return Ok(vec![Buffer::zeros(self.input.raw_dim())]);
        }
        let upstream = grad_output.sum();
        Ok(vec![self.input.mapv(|v| upstream * v / self.norm).into_shared()])
    }
}

pub(crate) fn norm(tensor: &Tensor) -> Tensor {
    let norm = tensor.data.iter().map(|v| v * v).sum::<f64>().sqrt();
    let function = NormBackward {
        input: tensor.data.clone(),
        norm,
    };
    record(Buffer::from_elem(IxDyn(&[]), norm), function, &[tensor])
}
