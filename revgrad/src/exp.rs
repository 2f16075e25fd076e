use crate::{
    function::{record, Function},
    tensor::Tensor,
    Buffer, Result,
};

/// Saves the output, which is also the local derivative.
#[derive(Debug, Clone)]
pub(crate) struct ExpBackward {
    output: Buffer,
}

impl Function for ExpBackward {
    fn name(&self) -> &'static str {
        "ExpBackward"
    }

    fn backward(&self, grad_output: &Buffer) -> Result<Vec<Buffer>> {
        Ok(vec![(grad_output * &self.output).into_shared()])
    }
}

pub(crate) fn exp(tensor: &Tensor) -> Tensor {
    let data = tensor.data.mapv(f64::exp).into_shared();
    let function = ExpBackward { output: data.clone() };
    record(data, function, &[tensor])
}
