//! Preconditioned BiCGStab (van der Vorst 1992) for symmetric and asymmetric
//! systems. Two products and two preconditioner applications per
//! iteration; stops half way when the intermediate residual already
//! satisfies the tolerance.

use crate::error::Result;
use crate::preconditioner::Preconditioner;
use crate::solver::base::{SolverBase, VSMALL};
use crate::solver::{LduSolver, SolveContext, SolverPerformance};
use crate::utils::convergence::Verdict;
use crate::utils::field_ops;

pub struct PBiCGStab<'a> {
    base: SolverBase<'a>,
    preconditioner: Box<dyn Preconditioner + 'a>,
}

impl<'a> PBiCGStab<'a> {
    pub fn new(base: SolverBase<'a>, preconditioner: Box<dyn Preconditioner + 'a>) -> Self {
        Self { base, preconditioner }
    }
}

pub fn build<'a>(ctx: SolveContext<'a>) -> Result<Box<dyn LduSolver + 'a>> {
    let preconditioner = ctx.preconditioner()?;
    Ok(Box::new(PBiCGStab::new(ctx.base(), preconditioner)))
}

impl LduSolver for PBiCGStab<'_> {
    fn name(&self) -> &'static str {
        "PBiCGStab"
    }

    fn solve(&mut self, psi: &mut [f64], source: &[f64]) -> Result<SolverPerformance> {
        let b = &self.base;
        let n = b.size();
        let mut state = b.initialise(psi, source)?;
        let mut verdict = b.first_check(&state);

        let r_a0 = state.r_a.clone();
        let mut p_a = vec![0.0; n];
        let mut y_a = vec![0.0; n];
        let mut ay_a = vec![0.0; n];
        let mut s_a = vec![0.0; n];
        let mut z_a = vec![0.0; n];
        let mut t_a = vec![0.0; n];
        let (mut rho, mut alpha, mut omega): (f64, f64, f64) = (0.0, 0.0, 0.0);

        while verdict == Verdict::Continue {
            let rho_old = rho;
            rho = b.sum_prod(&r_a0, &state.r_a)?;
            if rho.abs() < VSMALL {
                verdict = b.breakdown(&state, "zero rho");
                break;
            }

            if state.iterations == 0 {
                p_a.copy_from_slice(&state.r_a);
            } else {
                if omega.abs() < VSMALL {
                    verdict = b.breakdown(&state, "zero omega");
                    break;
                }
                let beta = (rho / rho_old) * (alpha / omega);
                for i in 0..n {
                    p_a[i] = state.r_a[i] + beta * (p_a[i] - omega * ay_a[i]);
                }
            }

            self.preconditioner.apply(&p_a, &mut y_a)?;
            b.amul(&y_a, &mut ay_a)?;
            let r_a0_ay_a = b.sum_prod(&r_a0, &ay_a)?;
            if r_a0_ay_a.abs() < VSMALL {
                verdict = b.breakdown(&state, "zero r0·Ay");
                break;
            }
            alpha = rho / r_a0_ay_a;

            for i in 0..n {
                s_a[i] = state.r_a[i] - alpha * ay_a[i];
            }
            let half = b.normalised(&s_a, state.norm_factor)?;
            if state.iterations + 1 >= b.conv.min_iter && b.conv.converged(state.initial_residual, half)
            {
                field_ops::axpy(alpha, &y_a, psi);
                state.r_a.copy_from_slice(&s_a);
                state.final_residual = half;
                state.iterations += 1;
                verdict = b.step(&mut state, psi);
                break;
            }

            self.preconditioner.apply(&s_a, &mut z_a)?;
            b.amul(&z_a, &mut t_a)?;
            let t_a_t_a = b.sum_prod(&t_a, &t_a)?;
            omega = if t_a_t_a.abs() < VSMALL { 0.0 } else { b.sum_prod(&t_a, &s_a)? / t_a_t_a };

            field_ops::axpy(alpha, &y_a, psi);
            field_ops::axpy(omega, &z_a, psi);
            for i in 0..n {
                state.r_a[i] = s_a[i] - omega * t_a[i];
            }
            state.final_residual = b.normalised(&state.r_a, state.norm_factor)?;
            state.iterations += 1;
            verdict = b.step(&mut state, psi);
        }
        Ok(b.finish(self.name(), state, psi, verdict))
    }
}
