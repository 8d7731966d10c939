//! Pieces every iterative solver shares: the distributed product, the
//! reduced dot products, the residual normalisation and the bookkeeping at
//! the start and end of a solve.

use crate::config::SolverControls;
use crate::error::{LduError, Result};
use crate::matrix::LduSystem;
use crate::parallel::{CommsType, Communicator};
use crate::solver::performance::SolverPerformance;
use crate::solver::state::{SolveState, TerminalState};
use crate::utils::convergence::{Convergence, Verdict};
use crate::utils::field_ops;

/// Below this a pivot or inner product counts as zero.
pub const VSMALL: f64 = 1e-300;

pub struct SolverBase<'a> {
    pub field_name: String,
    pub system: &'a LduSystem,
    pub comm: &'a Communicator,
    pub controls: SolverControls,
    pub conv: Convergence<f64>,
    pub mode: CommsType,
}

impl<'a> SolverBase<'a> {
    pub fn new(
        field_name: &str,
        system: &'a LduSystem,
        comm: &'a Communicator,
        controls: SolverControls,
    ) -> Self {
        Self {
            field_name: field_name.to_string(),
            system,
            comm,
            conv: Convergence::from_controls(&controls),
            controls,
            mode: comm.config().comms_type,
        }
    }

    pub fn size(&self) -> usize {
        self.system.size()
    }

    /// y = A x, halo exchange included.
    pub fn amul(&self, x: &[f64], y: &mut [f64]) -> Result<()> {
        self.system.amul(x, y, self.comm, self.mode)
    }

    /// Global inner product; local part summed in index order.
    pub fn sum_prod(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        self.comm.sum(field_ops::local_dot(a, b))
    }

    /// Normalised residual of `r`.
    pub fn normalised(&self, r: &[f64], norm_factor: f64) -> Result<f64> {
        Ok(self.comm.sum_mag(r)? / norm_factor)
    }

    /// Residual, normalisation and initial residual of the starting guess.
    pub fn initialise(&self, psi: &[f64], source: &[f64]) -> Result<SolveState> {
        let n = self.size();
        if psi.len() != n || source.len() != n {
            return Err(LduError::shape(format!(
                "solving a {n}-cell system with psi of length {} and source of length {}",
                psi.len(),
                source.len()
            )));
        }
        let mut state = SolveState::new(n);
        self.amul(psi, &mut state.w_a)?;
        field_ops::sub(source, &state.w_a, &mut state.r_a);
        state.norm_factor = self.system.norm_factor(psi, source, &state.w_a, self.comm)?;
        state.initial_residual = self.normalised(&state.r_a, state.norm_factor)?;
        state.final_residual = state.initial_residual;
        state.track(psi);
        log::trace!(
            "{} {}: normalisation factor {:e}, initial residual {:e}",
            self.field_name,
            self.controls.solver,
            state.norm_factor,
            state.initial_residual
        );
        Ok(state)
    }

    /// Verdict before any iteration has run.
    pub fn first_check(&self, state: &SolveState) -> Verdict {
        self.conv.check(state.initial_residual, state.initial_residual, 0)
    }

    /// Record a finished iteration and test for termination.
    pub fn step(&self, state: &mut SolveState, psi: &[f64]) -> Verdict {
        state.track(psi);
        log::trace!(
            "{} iteration {}: residual {:e}",
            self.field_name,
            state.iterations,
            state.final_residual
        );
        self.conv.check(state.initial_residual, state.final_residual, state.iterations)
    }

    /// A breakdown ends the solve. It counts as convergence if the residual
    /// already passes the test or is exactly zero, as divergence if the
    /// residual is non-finite or has grown past the initial one, and as
    /// running out of iterations otherwise.
    pub fn breakdown(&self, state: &SolveState, what: &str) -> Verdict {
        let (initial, current) = (state.initial_residual, state.final_residual);
        if current == 0.0 || self.conv.converged(initial, current) {
            return Verdict::Converged;
        }
        log::warn!(
            "{}: breakdown ({what}) after {} iterations solving for {}",
            self.controls.solver,
            state.iterations,
            self.field_name
        );
        if !current.is_finite() || current > initial {
            Verdict::Diverged
        } else {
            Verdict::MaxIterations
        }
    }

    /// Build the performance record; an unconverged solve hands back the
    /// best iterate it saw.
    pub fn finish(
        &self,
        name: &str,
        mut state: SolveState,
        psi: &mut [f64],
        verdict: Verdict,
    ) -> SolverPerformance {
        let terminal = match verdict {
            Verdict::Converged => TerminalState::Converged,
            Verdict::Diverged => TerminalState::Diverged,
            Verdict::MaxIterations | Verdict::Continue => TerminalState::MaxIterationsReached,
        };
        if terminal != TerminalState::Converged {
            if state.restore_best(psi) {
                log::debug!("{name}: restored best iterate for {}", self.field_name);
            }
            log::warn!(
                "{name}: {} not converged ({terminal:?}) after {} iterations, residual {:e}",
                self.field_name,
                state.iterations,
                state.final_residual
            );
        }
        let performance = SolverPerformance {
            solver_name: name.to_string(),
            field_name: self.field_name.clone(),
            initial_residual: state.initial_residual,
            final_residual: state.final_residual,
            iterations: state.iterations,
            state: terminal,
        };
        log::info!("{performance}");
        performance
    }
}
