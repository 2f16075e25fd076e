use ndarray::Array;
use ndarray_rand::{rand_distr::Normal, RandomExt};
use revgrad::{no_grad, Tensor};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn randn(shape: &[usize]) -> Result<Tensor, Box<dyn std::error::Error>> {
    let normal = Normal::new(0.0, 1.0)?;
    Ok(Tensor::from(Array::random(shape, normal)))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Recording a graph
    let x = Tensor::ones(&[2, 2]).with_requires_grad(true);
    let y = &x + 2.0;
    info!(grad_fn = ?y.grad_fn_name(), "y = x + 2");
    let z = &y * &y * 3.0;
    let out = z.mean();
    info!(z = ?z.data(), out = out.item()?, "z = 3 * y * y, out = mean(z)");

    // Switching tracking on for an existing leaf
    let a = randn(&[2, 2])?;
    let mut a = (&a * 3.0) / (&a - 1.0);
    info!(requires_grad = a.requires_grad(), "a built from untracked values");
    a.set_requires_grad(true)?;
    let b = (&a * &a).sum();
    info!(requires_grad = a.requires_grad(), grad_fn = ?b.grad_fn_name(), "after set_requires_grad");

    // Scalar backward
    out.backward()?;
    info!(grad = ?x.grad().map(|g| g.to_vec()), "d(out)/dx");

    // Vector-Jacobian product
    let x = randn(&[3])?.with_requires_grad(true);
    let mut y = &x * 2.0;
    while y.norm().item()? < 1000.0 {
        y = y * 2.0;
    }
    let v = Tensor::from_vec(&[3], vec![0.1, 1.0, 0.0001])?;
    y.backward_with(Some(&v), false)?;
    info!(grad = ?x.grad().map(|g| g.to_vec()), "vᵀ·J");

    // Grad mode
    info!(requires_grad = x.square().requires_grad(), "x ** 2");
    let untracked = no_grad(|| x.square());
    info!(requires_grad = untracked.requires_grad(), "x ** 2 under no_grad");

    // Detach
    let detached = x.detach();
    info!(requires_grad = detached.requires_grad(), equal = (detached == x), "x.detach()");

    // Accumulation over a retained graph
    let inp = Tensor::eye(4, 5).with_requires_grad(true);
    let out = (&inp + 1.0).powi(2).t();
    let seed = Tensor::ones_like(&out);
    out.backward_with(Some(&seed), true)?;
    info!(grad = ?inp.grad().map(|g| g.data().clone()), "first call");
    out.backward_with(Some(&seed), true)?;
    info!(grad = ?inp.grad().map(|g| g.data().clone()), "second call");
    inp.zero_grad();
    out.backward_with(Some(&seed), true)?;
    info!(grad = ?inp.grad().map(|g| g.data().clone()), "call after zero_grad");

    Ok(())
}
