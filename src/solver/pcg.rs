//! Preconditioned Conjugate Gradient for symmetric systems (Saad §9.2).

use crate::error::{LduError, Result};
use crate::preconditioner::Preconditioner;
use crate::solver::base::{SolverBase, VSMALL};
use crate::solver::{LduSolver, SolveContext, SolverPerformance};
use crate::utils::convergence::Verdict;
use crate::utils::field_ops;

pub struct Pcg<'a> {
    base: SolverBase<'a>,
    preconditioner: Box<dyn Preconditioner + 'a>,
}

impl<'a> Pcg<'a> {
    pub fn new(base: SolverBase<'a>, preconditioner: Box<dyn Preconditioner + 'a>) -> Result<Self> {
        if !base.system.is_symmetric() {
            return Err(LduError::InvalidConfig(
                "PCG needs a symmetric matrix, use PBiCGStab or GMRES".into(),
            ));
        }
        Ok(Self { base, preconditioner })
    }
}

pub fn build<'a>(ctx: SolveContext<'a>) -> Result<Box<dyn LduSolver + 'a>> {
    let preconditioner = ctx.preconditioner()?;
    Ok(Box::new(Pcg::new(ctx.base(), preconditioner)?))
}

impl LduSolver for Pcg<'_> {
    fn name(&self) -> &'static str {
        "PCG"
    }

    fn solve(&mut self, psi: &mut [f64], source: &[f64]) -> Result<SolverPerformance> {
        let b = &self.base;
        let mut state = b.initialise(psi, source)?;
        let mut verdict = b.first_check(&state);
        let mut p_a = vec![0.0; b.size()];
        let mut w_a_r_a: f64 = 0.0;

        while verdict == Verdict::Continue {
            let w_a_r_a_old = w_a_r_a;
            self.preconditioner.apply(&state.r_a, &mut state.w_a)?;
            w_a_r_a = b.sum_prod(&state.w_a, &state.r_a)?;

            if state.iterations == 0 {
                p_a.copy_from_slice(&state.w_a);
            } else {
                if w_a_r_a_old.abs() < VSMALL {
                    verdict = b.breakdown(&state, "zero rho");
                    break;
                }
                let beta = w_a_r_a / w_a_r_a_old;
                field_ops::xpay(&state.w_a, beta, &mut p_a);
            }

            b.amul(&p_a, &mut state.w_a)?;
            let w_a_p_a = b.sum_prod(&state.w_a, &p_a)?;
            if w_a_p_a.abs() / state.norm_factor < VSMALL {
                verdict = b.breakdown(&state, "zero p·Ap");
                break;
            }

            let alpha = w_a_r_a / w_a_p_a;
            field_ops::axpy(alpha, &p_a, psi);
            field_ops::axpy(-alpha, &state.w_a, &mut state.r_a);
            state.final_residual = b.normalised(&state.r_a, state.norm_factor)?;
            state.iterations += 1;
            verdict = b.step(&mut state, psi);
        }
        Ok(b.finish(self.name(), state, psi, verdict))
    }
}
