//! Reverse-mode traversal of a recorded graph.
//!
//! Gradients flowing into a node from several consumers are summed before the
//! node runs, so a node's backward executes once per pass no matter how many
//! paths reach it. Leaf gradients are committed only after the whole graph has
//! been traversed; a failed pass leaves every leaf and the graph untouched.

use std::{
    collections::{hash_map::Entry, HashMap, HashSet},
    rc::Rc,
};

use tracing::debug;

use crate::{node::Node, tensor::Tensor, AutogradError, Buffer, Result};

/// Backpropagates `seed` from `root` into the gradients of every reachable leaf.
///
/// Without a seed the root must be zero-dimensional and the seed is one.
/// Unless `retain_graph` is set, the traversed graph is released afterwards.
pub fn backward(root: &Tensor, seed: Option<&Tensor>, retain_graph: bool) -> Result<()> {
    let Some(root_node) = root.gradient_edge() else {
        return Err(AutogradError::NotDifferentiable);
    };
    let seed = match seed {
        Some(seed) if seed.shape() != root.shape() => {
            return Err(AutogradError::ShapeMismatch {
                expected: root.shape().to_vec(),
                got: seed.shape().to_vec(),
            });
        }
        Some(seed) => seed.data().clone(),
        None if root.ndim() != 0 => {
            return Err(AutogradError::ShapeMismatch {
                expected: vec![],
                got: root.shape().to_vec(),
            });
        }
        None => Buffer::ones(root.data().raw_dim()),
    };
    run_backward(root_node, seed, retain_graph)
}

type NodeId = *const Node;

fn node_id(node: &Rc<Node>) -> NodeId {
    Rc::as_ptr(node)
}

/// Counts, for every node reachable from `root`, how many reachable edges
/// point at it.
fn count_dependencies(root: &Rc<Node>) -> HashMap<NodeId, usize> {
    let mut dependencies = HashMap::new();
    let mut seen = HashSet::from([node_id(root)]);
    let mut stack = vec![Rc::clone(root)];
    while let Some(node) = stack.pop() {
        for next in node.next_functions().iter().flatten() {
            *dependencies.entry(node_id(next)).or_insert(0) += 1;
            if seen.insert(node_id(next)) {
                stack.push(Rc::clone(next));
            }
        }
    }
    dependencies
}

fn accumulate_pending(pending: &mut HashMap<NodeId, Buffer>, id: NodeId, grad: Buffer) -> Result<()> {
    match pending.entry(id) {
        Entry::Occupied(mut entry) => {
            let sum = entry.get_mut();
            if sum.shape() != grad.shape() {
                return Err(AutogradError::ShapeMismatch {
                    expected: sum.shape().to_vec(),
                    got: grad.shape().to_vec(),
                });
            }
            *sum += &grad;
        }
        Entry::Vacant(entry) => {
            entry.insert(grad);
        }
    }
    Ok(())
}

pub(crate) fn run_backward(root: Rc<Node>, seed: Buffer, retain_graph: bool) -> Result<()> {
    let mut dependencies = count_dependencies(&root);
    let mut pending = HashMap::from([(node_id(&root), seed)]);
    let mut ready = vec![root];
    let mut visited = Vec::new();
    let mut leaf_grads = Vec::new();

    // Kahn's algorithm: a node becomes ready once all of its consumers ran.
    while let Some(node) = ready.pop() {
        // every consumer hands a gradient to each of its edges
        let Some(grad) = pending.remove(&node_id(&node)) else {
            return Err(AutogradError::MissingGradient {
                op: node.name(),
                expected: 1,
                got: 0,
            });
        };
        let function = match node.as_ref() {
            Node::AccumulateGrad(_) => {
                leaf_grads.push((Rc::clone(&node), grad));
                continue;
            }
            Node::BackwardFunction(function) => function,
        };
        for (next, input_grad) in node.next_functions().iter().zip(function.apply(&grad)?) {
            let Some(next) = next else { continue };
            let id = node_id(next);
            accumulate_pending(&mut pending, id, input_grad)?;
            if let Some(count) = dependencies.get_mut(&id) {
                *count -= 1;
                if *count == 0 {
                    ready.push(Rc::clone(next));
                }
            }
        }
        visited.push(node);
    }

    for (node, grad) in &leaf_grads {
        if let Node::AccumulateGrad(accumulate) = node.as_ref() {
            accumulate.validate(grad)?;
        }
    }
    let leaves = leaf_grads.len();
    for (node, grad) in leaf_grads {
        if let Node::AccumulateGrad(accumulate) = node.as_ref() {
            accumulate.apply(grad)?;
        }
    }

    if !retain_graph {
        for node in &visited {
            if let Node::BackwardFunction(function) = node.as_ref() {
                function.release();
            }
        }
    }
    debug!(operations = visited.len(), leaves, retain_graph, "backward pass complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use all_asserts::assert_near;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::no_grad;

    #[test]
    fn test_not_differentiable() {
        let x = Tensor::ones(&[]);
        assert!(matches!(x.backward(), Err(AutogradError::NotDifferentiable)));
    }

    #[test]
    fn test_non_scalar_needs_seed() {
        let x = Tensor::ones(&[3]).with_requires_grad(true);
        let y = &x * 2.0;
        assert!(matches!(
            y.backward(),
            Err(AutogradError::ShapeMismatch { expected, got }) if expected.is_empty() && got == vec![3]
        ));
    }

    #[test]
    fn test_seed_shape_checked() {
        let x = Tensor::ones(&[3]).with_requires_grad(true);
        let y = &x * 2.0;
        let seed = Tensor::ones(&[4]);
        assert!(matches!(
            y.backward_with(Some(&seed), false),
            Err(AutogradError::ShapeMismatch { .. })
        ));
        // a rejected seed leaves the graph usable
        y.backward_with(Some(&Tensor::ones(&[3])), false).unwrap();
        assert_eq!(x.grad().unwrap().to_vec(), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_implicit_seed_needs_zero_dimensional_root() {
        let x = Tensor::from_vec(&[1, 1], vec![3.0]).unwrap().with_requires_grad(true);
        let y = x.square();
        assert!(matches!(
            y.backward(),
            Err(AutogradError::ShapeMismatch { expected, got }) if expected.is_empty() && got == vec![1, 1]
        ));
        assert!(x.grad().is_none());
        y.backward_with(Some(&Tensor::ones(&[1, 1])), false).unwrap();
        assert_eq!(x.grad().unwrap().to_vec(), vec![6.0]);
    }

    #[test]
    fn test_constant_operand_edge_over_freed_graph() {
        // c has no edge, x's side of the graph is already released
        let x = Tensor::ones(&[2]).with_requires_grad(true);
        let c = Tensor::from_elem(&[2], 5.0);
        let h = &x * &c;
        h.sum().backward().unwrap();
        assert!(matches!(
            (&h * &c).sum().backward(),
            Err(AutogradError::GraphAlreadyFreed { op: "MulBackward" })
        ));
        assert_eq!(x.grad().unwrap().to_vec(), vec![5.0, 5.0]);
    }

    #[test]
    fn test_backward_on_leaf() {
        let x = Tensor::ones(&[2]).with_requires_grad(true);
        let seed = Tensor::from_vec(&[2], vec![3.0, 4.0]).unwrap();
        x.backward_with(Some(&seed), false).unwrap();
        x.backward_with(Some(&seed), false).unwrap();
        assert_eq!(x.grad().unwrap().to_vec(), vec![6.0, 8.0]);
    }

    #[test]
    fn test_graph_freed_after_backward() {
        let x = Tensor::ones(&[2]).with_requires_grad(true);
        let y = (&x * 3.0).sum();
        y.backward().unwrap();
        assert!(matches!(y.backward(), Err(AutogradError::GraphAlreadyFreed { op: "SumBackward" })));
        assert_eq!(x.grad().unwrap().to_vec(), vec![3.0, 3.0]);
    }

    #[test]
    fn test_shared_subgraph_freed() {
        let x = Tensor::ones(&[2]).with_requires_grad(true);
        let h = &x * 3.0;
        h.sum().backward().unwrap();
        // a new root over a freed intermediate fails when it reaches it
        let z = (&h + 1.0).sum();
        assert!(matches!(z.backward(), Err(AutogradError::GraphAlreadyFreed { op: "MulBackward" })));
        assert_eq!(x.grad().unwrap().to_vec(), vec![3.0, 3.0]);
    }

    #[test]
    fn test_retained_graph_accumulates() {
        let x = Tensor::from_vec(&[2], vec![1.0, 2.0]).unwrap().with_requires_grad(true);
        let y = x.square().sum();
        y.backward_with(None, true).unwrap();
        y.backward_with(None, true).unwrap();
        assert_eq!(x.grad().unwrap().to_vec(), vec![4.0, 8.0]);
        y.backward().unwrap();
        assert_eq!(x.grad().unwrap().to_vec(), vec![6.0, 12.0]);
        assert!(y.backward().is_err());
    }

    #[test]
    fn test_diamond_graph_sums_paths() {
        // y = a * b with a = 2x and b = x^2, so dy/dx = 6x^2
        let x = Tensor::from_vec(&[3], vec![1.0, -2.0, 0.5]).unwrap().with_requires_grad(true);
        let a = &x * 2.0;
        let b = x.square();
        let y = (&a * &b).sum();
        y.backward().unwrap();
        let expected = [6.0, 24.0, 1.5];
        for (g, e) in x.grad().unwrap().to_vec().into_iter().zip(expected) {
            assert_near!(g, e, 1e-12);
        }
    }

    #[test]
    fn test_reused_intermediate_runs_once() {
        // h feeds three consumers; its backward must see the summed gradient
        let x = Tensor::scalar(2.0).with_requires_grad(true);
        let h = x.exp();
        let y = &h + &h + &h * 2.0;
        y.backward().unwrap();
        assert_near!(x.grad().unwrap().item().unwrap(), 4.0 * 2f64.exp(), 1e-9);
    }

    #[test]
    fn test_intermediate_grad_not_exposed() {
        let x = Tensor::ones(&[2]).with_requires_grad(true);
        let h = &x + 1.0;
        h.sum().backward().unwrap();
        assert!(h.grad().is_none());
        assert!(x.grad().is_some());
    }

    #[test]
    fn test_leaf_dropped_before_backward() {
        let y = {
            let x = Tensor::ones(&[2]).with_requires_grad(true);
            (&x * 2.0).sum()
        };
        y.backward().unwrap();
    }

    #[test]
    fn test_graph_built_before_no_grad_still_differentiates() {
        let x = Tensor::ones(&[2]).with_requires_grad(true);
        let y = x.square().sum();
        no_grad(|| y.backward()).unwrap();
        assert_eq!(x.grad().unwrap().to_vec(), vec![2.0, 2.0]);
    }
}
