use std::fmt;

use crate::solver::state::TerminalState;

/// Summary of one solve, the record handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverPerformance {
    pub solver_name: String,
    pub field_name: String,
    pub initial_residual: f64,
    pub final_residual: f64,
    pub iterations: usize,
    pub state: TerminalState,
}

impl SolverPerformance {
    pub fn converged(&self) -> bool {
        self.state == TerminalState::Converged
    }
}

impl fmt::Display for SolverPerformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:  Solving for {}, Initial residual = {:.6e}, Final residual = {:.6e}, No Iterations {}",
            self.solver_name,
            self.field_name,
            self.initial_residual,
            self.final_residual,
            self.iterations
        )
    }
}
