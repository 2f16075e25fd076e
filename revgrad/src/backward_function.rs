use std::{cell::RefCell, rc::Rc};

use tracing::{error, trace_span};

use crate::{function::Function, node::Node, AutogradError, Buffer, Result};

/// A recorded operation: its backward function plus one edge per operand.
///
/// An operand that does not require grad has an empty edge.
pub(crate) struct BackwardFunction {
    name: &'static str,
    function: RefCell<Option<Box<dyn Function>>>,
    pub(crate) next_functions: Vec<Option<Rc<Node>>>,
}

impl BackwardFunction {
    pub(crate) fn new(function: Box<dyn Function>, next_functions: Vec<Option<Rc<Node>>>) -> Self {
        BackwardFunction {
            name: function.name(),
            function: RefCell::new(Some(function)),
            next_functions,
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn is_released(&self) -> bool {
        self.function.borrow().is_none()
    }

    pub(crate) fn apply(&self, grad_output: &Buffer) -> Result<Vec<Buffer>> {
        let function = self.function.borrow();
        let function = function
            .as_ref()
            .ok_or(AutogradError::GraphAlreadyFreed { op: self.name })?;
        let _span = trace_span!("backward", op = self.name).entered();
        let grads = function.backward(grad_output)?;
        if grads.len() != self.next_functions.len() {
            error!(op = self.name, expected = self.next_functions.len(), got = grads.len(), "backward returned wrong gradient count");
            return Err(AutogradError::MissingGradient {
                op: self.name,
                expected: self.next_functions.len(),
                got: grads.len(),
            });
        }
        Ok(grads)
    }

    /// Drops the saved forward values. Later traversals fail.
    pub(crate) fn release(&self) {
        self.function.borrow_mut().take();
    }
}

impl std::fmt::Debug for BackwardFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackwardFunction")
            .field("name", &self.name)
            .field("inputs", &self.next_functions.len())
            .field("released", &self.is_released())
            .finish()
    }
}
