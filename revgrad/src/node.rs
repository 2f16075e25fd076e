use std::rc::Rc;

use crate::{accumulate_grad::AccumulateGrad, backward_function::BackwardFunction};

/// A vertex of the backward graph.
#[derive(Debug)]
pub(crate) enum Node {
    BackwardFunction(BackwardFunction),
    AccumulateGrad(AccumulateGrad),
}

impl Node {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Node::BackwardFunction(function) => function.name(),
            Node::AccumulateGrad(_) => "AccumulateGrad",
        }
    }

    pub(crate) fn next_functions(&self) -> &[Option<Rc<Node>>] {
        match self {
            Node::BackwardFunction(function) => &function.next_functions,
            Node::AccumulateGrad(_) => &[],
        }
    }
}
