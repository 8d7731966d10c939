//! Stopping criteria for iterative solvers.

use crate::config::SolverControls;
use num_traits::Float;

/// Outcome of one convergence test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Converged,
    Diverged,
    MaxIterations,
}

/// Stopping criteria on normalised residuals.
#[derive(Clone, Debug, PartialEq)]
pub struct Convergence<T> {
    pub tolerance: T,
    pub rel_tol: T,
    pub div_tol: T,
    pub min_iter: usize,
    pub max_iter: usize,
}

impl Convergence<f64> {
    pub fn from_controls(controls: &SolverControls) -> Self {
        Self {
            tolerance: controls.tolerance,
            rel_tol: controls.rel_tol,
            div_tol: controls.div_tol,
            min_iter: controls.min_iter,
            max_iter: controls.max_iter,
        }
    }
}

impl<T: Float> Convergence<T> {
    /// `current < tolerance`, or below `rel_tol × initial` when that is on.
    pub fn converged(&self, initial: T, current: T) -> bool {
        current < self.tolerance
            || (self.rel_tol > T::zero() && current < self.rel_tol * initial)
    }

    /// Non-finite, or grown past `div_tol` times the larger of the initial
    /// residual and the tolerance.
    pub fn diverged(&self, initial: T, current: T) -> bool {
        !current.is_finite() || current > self.div_tol * initial.max(self.tolerance)
    }

    /// Test after `iter` completed iterations.
    pub fn check(&self, initial: T, current: T, iter: usize) -> Verdict {
        if self.diverged(initial, current) {
            Verdict::Diverged
        } else if iter >= self.min_iter && self.converged(initial, current) {
            Verdict::Converged
        } else if iter >= self.max_iter {
            Verdict::MaxIterations
        } else {
            Verdict::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv() -> Convergence<f64> {
        Convergence { tolerance: 1e-6, rel_tol: 0.1, div_tol: 1e5, min_iter: 2, max_iter: 10 }
    }

    #[test]
    fn relative_and_absolute() {
        let c = conv();
        assert!(c.converged(1.0, 1e-7));
        assert!(c.converged(1.0, 0.05));
        assert!(!c.converged(1.0, 0.5));
        let c = Convergence { rel_tol: 0.0, ..conv() };
        assert!(!c.converged(1.0, 0.05));
    }

    #[test]
    fn min_iter_forces_work() {
        let c = conv();
        assert_eq!(c.check(1.0, 1e-9, 1), Verdict::Continue);
        assert_eq!(c.check(1.0, 1e-9, 2), Verdict::Converged);
        assert_eq!(c.check(1.0, 0.5, 10), Verdict::MaxIterations);
    }

    #[test]
    fn divergence() {
        let c = conv();
        assert_eq!(c.check(1.0, f64::NAN, 3), Verdict::Diverged);
        assert_eq!(c.check(1.0, 1e6, 3), Verdict::Diverged);
        assert_eq!(c.check(0.0, 0.05, 3), Verdict::Continue);
    }
}
