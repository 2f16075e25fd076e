use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use tracing::debug;

use crate::{AutogradError, Buffer, Cell, Result};

/// Graph sink for a leaf that requires grad.
///
/// Holds the leaf's gradient slot weakly: the graph never keeps a leaf's
/// storage alive on its own.
#[derive(Debug)]
pub(crate) struct AccumulateGrad {
    variable: Weak<RefCell<Option<Buffer>>>,
    shape: Vec<usize>,
}

impl AccumulateGrad {
    pub(crate) fn new(grad: &Cell<Option<Buffer>>, shape: &[usize]) -> Self {
        AccumulateGrad {
            variable: Rc::downgrade(grad),
            shape: shape.to_vec(),
        }
    }

    /// Checks that `grad` can be added into the leaf's gradient buffer.
    pub(crate) fn validate(&self, grad: &Buffer) -> Result<()> {
        if grad.shape() != self.shape.as_slice() {
            return Err(AutogradError::ShapeMismatch {
                expected: self.shape.clone(),
                got: grad.shape().to_vec(),
            });
        }
        if let Some(variable) = self.variable.upgrade() {
            if let Some(existing) = variable.borrow().as_ref() {
                if existing.shape() != grad.shape() {
                    return Err(AutogradError::ShapeMismatch {
                        expected: existing.shape().to_vec(),
                        got: grad.shape().to_vec(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Adds `grad` into the leaf's gradient buffer, allocating it on first use.
    pub(crate) fn apply(&self, grad: Buffer) -> Result<()> {
        self.validate(&grad)?;
        let Some(variable) = self.variable.upgrade() else {
            debug!(shape = ?self.shape, "leaf dropped before its gradient was committed");
            return Ok(());
        };
        let mut slot = variable.borrow_mut();
        match slot.as_mut() {
            Some(existing) => *existing += &grad,
            None => *slot = Some(grad),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{arr1, ArcArray, IxDyn};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_allocates_then_sums() {
        let slot: Cell<Option<Buffer>> = Rc::new(RefCell::new(None));
        let accumulate = AccumulateGrad::new(&slot, &[3]);
        let grad: Buffer = arr1(&[1.0, 2.0, 3.0]).into_dyn().into_shared();

        accumulate.apply(grad.clone()).unwrap();
        assert_eq!(slot.borrow().clone().unwrap(), grad);

        accumulate.apply(grad).unwrap();
        let expected: Buffer = arr1(&[2.0, 4.0, 6.0]).into_dyn().into_shared();
        assert_eq!(slot.borrow().clone().unwrap(), expected);
    }

    #[test]
    fn test_shape_mismatch() {
        let slot: Cell<Option<Buffer>> = Rc::new(RefCell::new(None));
        let accumulate = AccumulateGrad::new(&slot, &[3]);
        let grad: Buffer = ArcArray::ones(IxDyn(&[2]));
        assert!(matches!(
            accumulate.apply(grad),
            Err(AutogradError::ShapeMismatch { .. })
        ));
        assert!(slot.borrow().is_none());
    }

    #[test]
    fn test_dropped_leaf_is_skipped() {
        let slot: Cell<Option<Buffer>> = Rc::new(RefCell::new(None));
        let accumulate = AccumulateGrad::new(&slot, &[2]);
        drop(slot);
        accumulate.apply(ArcArray::ones(IxDyn(&[2]))).unwrap();
    }
}
