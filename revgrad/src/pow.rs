use crate::{
    function::{record, Function},
    tensor::Tensor,
    Buffer, Result,
};

#[derive(Debug, Clone)]
pub(crate) struct PowBackward {
    base: Buffer,
    exponent: f64,
}

impl Function for PowBackward {
    fn name(&self) -> &'static str {
        "PowBackward"
    }

    fn backward(&self, grad_output: &Buffer) -> Result<Vec<Buffer>> {
        let exponent = self.exponent;
        // x^0 is constant, even at x = 0 where the general rule gives 0 * inf
        if exponent == 0.0 {
            return Ok(vec![Buffer::zeros(self.base.raw_dim())]);
        }
        let local = self.base.mapv(|v| exponent * v.powf(exponent - 1.0));
        Ok(vec![(grad_output * &local).into_shared()])
    }
}

pub(crate) fn pow(tensor: &Tensor, exponent: f64) -> Tensor {
    let data = tensor.data.mapv(|v| v.powf(exponent)).into_shared();
    let function = PowBackward {
        base: tensor.data.clone(),
        exponent,
    };
    record(data, function, &[tensor])
}
