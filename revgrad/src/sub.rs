use crate::{
    broadcast::sum_to_shape,
    function::{record, Function},
    tensor::Tensor,
    Buffer, Result,
};

#[derive(Debug, Clone)]
pub(crate) struct SubBackward {
    lhs_shape: Vec<usize>,
    rhs_shape: Vec<usize>,
}

impl Function for SubBackward {
    fn name(&self) -> &'static str {
        "SubBackward"
    }

    fn backward(&self, grad_output: &Buffer) -> Result<Vec<Buffer>> {
        let negated = (-grad_output).into_shared();
        Ok(vec![
            sum_to_shape(grad_output.clone(), &self.lhs_shape),
            sum_to_shape(negated, &self.rhs_shape),
        ])
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NegBackward;

impl Function for NegBackward {
    fn name(&self) -> &'static str {
        "NegBackward"
    }

    fn backward(&self, grad_output: &Buffer) -> Result<Vec<Buffer>> {
        Ok(vec![(-grad_output).into_shared()])
    }
}

pub(crate) fn sub(lhs: &Tensor, rhs: &Tensor) -> Tensor {
    let data = (&lhs.data - &rhs.data).into_shared();
    let function = SubBackward {
        lhs_shape: lhs.shape().to_vec(),
        rhs_shape: rhs.shape().to_vec(),
    };
    record(data, function, &[lhs, rhs])
}

pub(crate) fn neg(tensor: &Tensor) -> Tensor {
    let data = (-&tensor.data).into_shared();
    record(data, NegBackward, &[tensor])
}
