use crate::{
    broadcast::sum_to_shape,
    function::{record, Function},
    tensor::Tensor,
    Buffer, Result,
};

#[derive(Debug, Clone)]
pub(crate) struct DivBackward {
    lhs: Buffer,
    rhs: Buffer,
}

impl Function for DivBackward {
    fn name(&self) -> &'static str {
        "DivBackward"
    }

    fn backward(&self, grad_output: &Buffer) -> Result<Vec<Buffer>> {
        let grad_lhs = (grad_output / &self.rhs).into_shared();
        // d(a / b)/db = -a / b^2
        let rhs_squared = &self.rhs * &self.rhs;
        let grad_rhs = (-(grad_output * &self.lhs) / &rhs_squared).into_shared();
        Ok(vec![
            sum_to_shape(grad_lhs, self.lhs.shape()),
            sum_to_shape(grad_rhs, self.rhs.shape()),
        ])
    }
}

pub(crate) fn div(lhs: &Tensor, rhs: &Tensor) -> Tensor {
    let data = (&lhs.data / &rhs.data).into_shared();
    let function = DivBackward {
        lhs: lhs.data.clone(),
        rhs: rhs.data.clone(),
    };
    record(data, function, &[lhs, rhs])
}
