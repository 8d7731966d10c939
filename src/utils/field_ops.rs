//! Element-wise field kernels shared by the solvers.
//!
//! With the `rayon` feature the element-wise updates run on the thread pool.
//! Sums stay sequential in index order so a reduction gives the same bits
//! however many threads are available.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// y += a x
pub fn axpy(a: f64, x: &[f64], y: &mut [f64]) {
    assert_eq!(x.len(), y.len(), "axpy: length mismatch");
    #[cfg(feature = "rayon")]
    y.par_iter_mut().zip(x.par_iter()).for_each(|(yi, &xi)| *yi += a * xi);
    #[cfg(not(feature = "rayon"))]
    y.iter_mut().zip(x).for_each(|(yi, &xi)| *yi += a * xi);
}

/// y = x + a y
pub fn xpay(x: &[f64], a: f64, y: &mut [f64]) {
    assert_eq!(x.len(), y.len(), "xpay: length mismatch");
    #[cfg(feature = "rayon")]
    y.par_iter_mut().zip(x.par_iter()).for_each(|(yi, &xi)| *yi = xi + a * *yi);
    #[cfg(not(feature = "rayon"))]
    y.iter_mut().zip(x).for_each(|(yi, &xi)| *yi = xi + a * *yi);
}

/// out = a ∘ b
pub fn mul(a: &[f64], b: &[f64], out: &mut [f64]) {
    assert_eq!(a.len(), b.len(), "mul: length mismatch");
    assert_eq!(a.len(), out.len(), "mul: length mismatch");
    #[cfg(feature = "rayon")]
    out.par_iter_mut()
        .zip(a.par_iter().zip(b.par_iter()))
        .for_each(|(o, (&ai, &bi))| *o = ai * bi);
    #[cfg(not(feature = "rayon"))]
    out.iter_mut().zip(a.iter().zip(b)).for_each(|(o, (&ai, &bi))| *o = ai * bi);
}

/// out = a − b
pub fn sub(a: &[f64], b: &[f64], out: &mut [f64]) {
    assert_eq!(a.len(), b.len(), "sub: length mismatch");
    assert_eq!(a.len(), out.len(), "sub: length mismatch");
    #[cfg(feature = "rayon")]
    out.par_iter_mut()
        .zip(a.par_iter().zip(b.par_iter()))
        .for_each(|(o, (&ai, &bi))| *o = ai - bi);
    #[cfg(not(feature = "rayon"))]
    out.iter_mut().zip(a.iter().zip(b)).for_each(|(o, (&ai, &bi))| *o = ai - bi);
}

/// Local inner product, summed in index order.
pub fn local_dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
