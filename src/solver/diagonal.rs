//! Direct solve of a system without off-diagonal couplings.

use crate::error::{LduError, Result};
use crate::matrix::LduSystem;
use crate::solver::state::TerminalState;
use crate::solver::{LduSolver, SolveContext, SolverPerformance};

pub struct DiagonalSolver<'a> {
    field_name: String,
    system: &'a LduSystem,
}

impl<'a> DiagonalSolver<'a> {
    pub fn new(field_name: &str, system: &'a LduSystem) -> Result<Self> {
        if !system.is_diagonal() {
            return Err(LduError::InvalidConfig(
                "the diagonal solver needs a matrix without faces or interfaces".into(),
            ));
        }
        Ok(Self { field_name: field_name.to_string(), system })
    }
}

pub fn build<'a>(ctx: SolveContext<'a>) -> Result<Box<dyn LduSolver + 'a>> {
    Ok(Box::new(DiagonalSolver::new(ctx.field_name, ctx.system)?))
}

impl LduSolver for DiagonalSolver<'_> {
    fn name(&self) -> &'static str {
        "diagonal"
    }

    /// psi = b / D, exact; no communication.
    fn solve(&mut self, psi: &mut [f64], source: &[f64]) -> Result<SolverPerformance> {
        let diag = self.system.matrix().diag();
        if psi.len() != diag.len() || source.len() != diag.len() {
            return Err(LduError::shape(format!(
                "solving a {}-cell system with psi of length {} and source of length {}",
                diag.len(),
                psi.len(),
                source.len()
            )));
        }
        if let Some(row) = diag.iter().position(|&d| d == 0.0) {
            return Err(LduError::ZeroPivot(row));
        }
        for ((p, &s), &d) in psi.iter_mut().zip(source).zip(diag) {
            *p = s / d;
        }
        let performance = SolverPerformance {
            solver_name: self.name().to_string(),
            field_name: self.field_name.clone(),
            initial_residual: 0.0,
            final_residual: 0.0,
            iterations: 0,
            state: TerminalState::Converged,
        };
        log::debug!("{performance}");
        Ok(performance)
    }
}
