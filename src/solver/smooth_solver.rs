//! Iterates a smoother, checking the residual every `nSweeps` sweeps.

use crate::error::Result;
use crate::smoother::Smoother;
use crate::solver::base::SolverBase;
use crate::solver::{LduSolver, SolveContext, SolverPerformance};
use crate::utils::convergence::Verdict;
use crate::utils::field_ops;

pub struct SmoothSolver<'a> {
    base: SolverBase<'a>,
    smoother: Box<dyn Smoother + 'a>,
}

impl<'a> SmoothSolver<'a> {
    pub fn new(base: SolverBase<'a>, smoother: Box<dyn Smoother + 'a>) -> Self {
        Self { base, smoother }
    }
}

pub fn build<'a>(ctx: SolveContext<'a>) -> Result<Box<dyn LduSolver + 'a>> {
    let smoother = ctx.smoother()?;
    Ok(Box::new(SmoothSolver::new(ctx.base(), smoother)))
}

impl LduSolver for SmoothSolver<'_> {
    fn name(&self) -> &'static str {
        "smoothSolver"
    }

    fn solve(&mut self, psi: &mut [f64], source: &[f64]) -> Result<SolverPerformance> {
        let b = &self.base;
        let n_sweeps = b.controls.n_sweeps.max(1);
        let mut state = b.initialise(psi, source)?;
        let mut verdict = b.first_check(&state);

        while verdict == Verdict::Continue {
            self.smoother.smooth(psi, source, n_sweeps)?;
            b.amul(psi, &mut state.w_a)?;
            field_ops::sub(source, &state.w_a, &mut state.r_a);
            state.final_residual = b.normalised(&state.r_a, state.norm_factor)?;
            state.iterations += n_sweeps;
            verdict = b.step(&mut state, psi);
        }
        Ok(b.finish(self.name(), state, psi, verdict))
    }
}
