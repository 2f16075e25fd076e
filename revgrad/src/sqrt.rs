use num_traits::Inv;

use crate::{
    function::{record, Function},
    tensor::Tensor,
    Buffer, Result,
};

#[derive(Debug, Clone)]
pub(crate) struct SqrtBackward {
    output: Buffer,
}

impl Function for SqrtBackward {
    fn name(&self) -> &'static str {
        "SqrtBackward"
    }

    fn backward(&self, grad_output: &Buffer) -> Result<Vec<Buffer>> {
        let local = self.output.mapv(|v| (2.0 * v).inv());
        Ok(vec![(grad_output * &local).into_shared()])
    }
}

pub(crate) fn sqrt(tensor: &Tensor) -> Tensor {
    let data = tensor.data.mapv(f64::sqrt).into_shared();
    let function = SqrtBackward { output: data.clone() };
    record(data, function, &[tensor])
}
