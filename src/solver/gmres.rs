//! Restarted GMRES with right preconditioning (Saad §6.4, §9.3.2).
//!
//! Arnoldi on `A M⁻¹` builds an orthonormal basis of at most `restart`
//! vectors; the small least-squares problem is kept triangular with Givens
//! rotations so its residual is known after every step. The solution is
//! updated with the preconditioned basis at the end of each cycle and the
//! true residual recomputed before the next one.
//!
//! # Features
//! - Double (iterative) modified Gram-Schmidt, every inner product reduced
//!   across processes
//! - Happy breakdown detection
//! - Least-squares back-substitution with zero-pivot protection

use crate::error::Result;
use crate::preconditioner::Preconditioner;
use crate::solver::base::SolverBase;
use crate::solver::{LduSolver, SolveContext, SolverPerformance};
use crate::utils::convergence::Verdict;
use crate::utils::field_ops;

const EPSILON: f64 = 1e-14;

pub struct Gmres<'a> {
    base: SolverBase<'a>,
    preconditioner: Box<dyn Preconditioner + 'a>,
    restart: usize,
}

impl<'a> Gmres<'a> {
    pub fn new(base: SolverBase<'a>, preconditioner: Box<dyn Preconditioner + 'a>) -> Self {
        let restart = base.controls.restart.max(1);
        Self { base, preconditioner, restart }
    }
}

/// Plane rotation acting on two neighbouring entries of a vector.
#[derive(Clone, Copy, Debug)]
struct Givens {
    c: f64,
    s: f64,
}

impl Givens {
    /// The rotation taking `(a, b)` to `(r, 0)`; identity when both are
    /// below `tiny`.
    fn zeroing(a: f64, b: f64, tiny: f64) -> Self {
        let r = a.hypot(b);
        if r < tiny { Self { c: 1.0, s: 0.0 } } else { Self { c: a / r, s: b / r } }
    }

    fn rotate(self, v: &mut [f64], i: usize) {
        let (a, b) = (v[i], v[i + 1]);
        v[i] = self.c * a + self.s * b;
        v[i + 1] = self.c * b - self.s * a;
    }
}

/// Solve `R y = g` where column `k` of the upper-triangular `R` is
/// `cols[k][..=k]`. Pivots below `tiny` give zero entries.
fn back_substitute(cols: &[Vec<f64>], g: &[f64], tiny: f64) -> Vec<f64> {
    let m = cols.len();
    let mut y = vec![0.0; m];
    for i in (0..m).rev() {
        let rhs = g[i] - (i + 1..m).map(|k| cols[k][i] * y[k]).sum::<f64>();
        let pivot = cols[i][i];
        y[i] = if pivot.abs() > tiny { rhs / pivot } else { 0.0 };
    }
    y
}

pub fn build<'a>(ctx: SolveContext<'a>) -> Result<Box<dyn LduSolver + 'a>> {
    let preconditioner = ctx.preconditioner()?;
    Ok(Box::new(Gmres::new(ctx.base(), preconditioner)))
}

impl LduSolver for Gmres<'_> {
    fn name(&self) -> &'static str {
        "GMRES"
    }

    fn solve(&mut self, psi: &mut [f64], source: &[f64]) -> Result<SolverPerformance> {
        let b = &self.base;
        let n = b.size();
        let m_max = self.restart;
        let mut state = b.initialise(psi, source)?;
        let mut verdict = b.first_check(&state);

        let mut w = vec![0.0; n];
        while verdict == Verdict::Continue {
            let beta = b.sum_prod(&state.r_a, &state.r_a)?.sqrt();
            if beta == 0.0 {
                verdict = b.breakdown(&state, "zero residual norm");
                break;
            }
            let cycle_start = state.final_residual;

            let mut v_basis: Vec<Vec<f64>> = Vec::with_capacity(m_max + 1);
            let mut z_basis: Vec<Vec<f64>> = Vec::with_capacity(m_max);
            v_basis.push(state.r_a.iter().map(|&ri| ri / beta).collect());
            // columns of the rotated Hessenberg matrix, column j has j + 2 rows
            let mut cols: Vec<Vec<f64>> = Vec::with_capacity(m_max);
            let mut rotations: Vec<Givens> = Vec::with_capacity(m_max);
            let mut g = vec![0.0; m_max + 1];
            g[0] = beta;

            for j in 0..m_max {
                let mut z = vec![0.0; n];
                self.preconditioner.apply(&v_basis[j], &mut z)?;
                b.amul(&z, &mut w)?;
                z_basis.push(z);

                // two passes of modified Gram-Schmidt
                let mut col = vec![0.0; j + 2];
                for _ in 0..2 {
                    for (i, v) in v_basis.iter().enumerate().take(j + 1) {
                        let tmp = b.sum_prod(&w, v)?;
                        col[i] += tmp;
                        field_ops::axpy(-tmp, v, &mut w);
                    }
                }
                col[j + 1] = b.sum_prod(&w, &w)?.sqrt();
                let happy = col[j + 1] < EPSILON * beta;
                if !happy {
                    let inv = 1.0 / col[j + 1];
                    v_basis.push(w.iter().map(|&wi| wi * inv).collect());
                }

                for (i, rot) in rotations.iter().enumerate() {
                    rot.rotate(&mut col, i);
                }
                let rot = Givens::zeroing(col[j], col[j + 1], EPSILON);
                rot.rotate(&mut col, j);
                col[j + 1] = 0.0;
                rot.rotate(&mut g, j);
                rotations.push(rot);
                cols.push(col);
                state.iterations += 1;

                // the rotated residual is a 2-norm; scale it onto the
                // normalised residual measured at the start of the cycle
                let estimate = cycle_start * g[j + 1].abs() / beta;
                let inner = b.conv.check(state.initial_residual, estimate, state.iterations);
                log::trace!("GMRES inner step {}: estimated residual {:e}", state.iterations, estimate);
                if happy || inner != Verdict::Continue {
                    break;
                }
            }

            let y = back_substitute(&cols, &g, EPSILON);
            for (yj, zj) in y.iter().zip(&z_basis) {
                field_ops::axpy(*yj, zj, psi);
            }
            b.amul(psi, &mut state.w_a)?;
            field_ops::sub(source, &state.w_a, &mut state.r_a);
            state.final_residual = b.normalised(&state.r_a, state.norm_factor)?;
            verdict = b.step(&mut state, psi);
        }
        Ok(b.finish(self.name(), state, psi, verdict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rotation_zeroes_the_lower_entry() {
        let mut v = [3.0, 4.0, 1.0];
        let rot = Givens::zeroing(v[0], v[1], EPSILON);
        rot.rotate(&mut v, 0);
        assert_relative_eq!(v[0], 5.0);
        assert!(v[1].abs() < 1e-15);
        assert_eq!(v[2], 1.0);
    }

    #[test]
    fn back_substitution_skips_vanishing_pivots() {
        // R = [[2, 1], [0, 4]]
        let cols = vec![vec![2.0, 0.0], vec![1.0, 4.0, 0.0]];
        let y = back_substitute(&cols, &[4.0, 8.0], EPSILON);
        assert_relative_eq!(y[0], 1.0);
        assert_relative_eq!(y[1], 2.0);
        let cols = vec![vec![2.0, 0.0], vec![1.0, 0.0, 0.0]];
        assert_eq!(back_substitute(&cols, &[4.0, 8.0], EPSILON), vec![2.0, 0.0]);
    }
}
