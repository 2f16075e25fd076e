use crate::{
    broadcast::sum_to_shape,
    function::{record, Function},
    tensor::Tensor,
    Buffer, Result,
};

#[derive(Debug, Clone)]
pub(crate) struct AddBackward {
    lhs_shape: Vec<usize>,
    rhs_shape: Vec<usize>,
}

impl Function for AddBackward {
    fn name(&self) -> &'static str {
        "AddBackward"
    }

    fn backward(&self, grad_output: &Buffer) -> Result<Vec<Buffer>> {
        Ok(vec![
            sum_to_shape(grad_output.clone(), &self.lhs_shape),
            sum_to_shape(grad_output.clone(), &self.rhs_shape),
        ])
    }
}

pub(crate) fn add(lhs: &Tensor, rhs: &Tensor) -> Tensor {
    let data = (&lhs.data + &rhs.data).into_shared();
    let function = AddBackward {
        lhs_shape: lhs.shape().to_vec(),
        rhs_shape: rhs.shape().to_vec(),
    };
    record(data, function, &[lhs, rhs])
}
