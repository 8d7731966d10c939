//! Solver and communication options.
//!
//! `SolverControls` is the small record the discretisation layer hands over
//! for every solve: which iterative method, which preconditioner or smoother,
//! and the stopping criteria. `CommsConfig` carries the tunable defaults of
//! the communication layer. Both deserialize from camelCase keys, so a
//! caller holding a parsed dictionary can feed it through `serde` directly.

use serde::{Deserialize, Serialize};

use crate::error::{LduError, Result};
use crate::parallel::CommsType;

/// Solver selection & stopping criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverControls {
    /// Iterative method key (PCG, PBiCGStab, GMRES, smoothSolver, diagonal)
    pub solver: String,
    /// Preconditioner key for the Krylov methods
    pub preconditioner: String,
    /// Smoother key for smoothSolver
    pub smoother: String,
    /// Absolute stopping residual
    pub tolerance: f64,
    /// Relative reduction stopping factor, 0 disables it
    pub rel_tol: f64,
    pub max_iter: usize,
    pub min_iter: usize,
    /// Smoother sweeps between convergence checks
    pub n_sweeps: usize,
    /// Residual growth factor (over the initial residual) treated as divergence
    pub div_tol: f64,
    /// Krylov basis size before GMRES restarts
    pub restart: usize,
}

impl Default for SolverControls {
    fn default() -> Self {
        Self {
            solver: "PCG".to_string(),
            preconditioner: "diagonal".to_string(),
            smoother: "GaussSeidel".to_string(),
            tolerance: 1e-6,
            rel_tol: 0.0,
            max_iter: 1000,
            min_iter: 0,
            n_sweeps: 1,
            div_tol: 1e5,
            restart: 30,
        }
    }
}

impl SolverControls {
    pub fn new(solver: &str, preconditioner: &str) -> Self {
        Self {
            solver: solver.to_string(),
            preconditioner: preconditioner.to_string(),
            ..Self::default()
        }
    }
    pub fn with_smoother(mut self, smoother: &str) -> Self {
        self.smoother = smoother.to_string();
        self
    }
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
    pub fn with_rel_tol(mut self, rel_tol: f64) -> Self {
        self.rel_tol = rel_tol;
        self
    }
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }
    pub fn with_min_iter(mut self, min_iter: usize) -> Self {
        self.min_iter = min_iter;
        self
    }
    pub fn with_n_sweeps(mut self, n_sweeps: usize) -> Self {
        self.n_sweeps = n_sweeps;
        self
    }
    pub fn with_div_tol(mut self, div_tol: f64) -> Self {
        self.div_tol = div_tol;
        self
    }
    pub fn with_restart(mut self, restart: usize) -> Self {
        self.restart = restart;
        self
    }

    /// Reject controls that cannot drive an iteration.
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance >= 0.0) || !(self.rel_tol >= 0.0) {
            return Err(LduError::InvalidConfig(format!(
                "tolerances must be non-negative (tolerance={}, relTol={})",
                self.tolerance, self.rel_tol
            )));
        }
        if !(self.div_tol > 1.0) {
            return Err(LduError::InvalidConfig(format!(
                "divTol must exceed 1, got {}",
                self.div_tol
            )));
        }
        if self.max_iter == 0 {
            return Err(LduError::InvalidConfig("maxIter must be positive".into()));
        }
        if self.n_sweeps == 0 {
            return Err(LduError::InvalidConfig("nSweeps must be positive".into()));
        }
        if self.restart == 0 {
            return Err(LduError::InvalidConfig("restart must be positive".into()));
        }
        Ok(())
    }
}

/// Tunable defaults of the communication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommsConfig {
    /// Below this process count reductions use the flat linear scheme,
    /// at or above it the binomial tree.
    pub n_procs_simple_sum: usize,
    /// Largest number of values sent in one message by `exchange`; 0 sends
    /// everything in one go.
    pub max_comms_size: usize,
    /// Default halo exchange discipline.
    pub comms_type: CommsType,
}

impl Default for CommsConfig {
    fn default() -> Self {
        Self {
            n_procs_simple_sum: 16,
            max_comms_size: 0,
            comms_type: CommsType::NonBlocking,
        }
    }
}
