//! Per-solve mutable state.

/// How a solve ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    Converged,
    MaxIterationsReached,
    Diverged,
}

/// Owned by one `solve` call and dropped when it returns.
#[derive(Debug, Clone)]
pub struct SolveState {
    /// Scratch for `A ·` products, holds `A psi` after initialisation.
    pub w_a: Vec<f64>,
    /// Current residual `b − A psi`.
    pub r_a: Vec<f64>,
    pub norm_factor: f64,
    pub initial_residual: f64,
    pub final_residual: f64,
    pub iterations: usize,
    best: Option<(f64, Vec<f64>)>,
}

impl SolveState {
    pub fn new(n: usize) -> Self {
        Self {
            w_a: vec![0.0; n],
            r_a: vec![0.0; n],
            norm_factor: 1.0,
            initial_residual: 0.0,
            final_residual: 0.0,
            iterations: 0,
            best: None,
        }
    }

    /// Remember `psi` if its residual is the smallest seen so far.
    pub fn track(&mut self, psi: &[f64]) {
        let residual = self.final_residual;
        if !residual.is_finite() {
            return;
        }
        match &mut self.best {
            Some((best, stored)) if residual < *best => {
                *best = residual;
                stored.copy_from_slice(psi);
            }
            Some(_) => {}
            None => self.best = Some((residual, psi.to_vec())),
        }
    }

    /// Put the best tracked iterate back into `psi` if it beats the current
    /// one. Returns whether anything changed.
    pub fn restore_best(&mut self, psi: &mut [f64]) -> bool {
        match &self.best {
            Some((best, stored)) if !(self.final_residual <= *best) => {
                psi.copy_from_slice(stored);
                self.final_residual = *best;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_the_best_iterate() {
        let mut s = SolveState::new(2);
        s.final_residual = 1.0;
        s.track(&[1.0, 1.0]);
        s.final_residual = 0.5;
        s.track(&[2.0, 2.0]);
        s.final_residual = 3.0;
        s.track(&[3.0, 3.0]);
        let mut psi = [3.0, 3.0];
        assert!(s.restore_best(&mut psi));
        assert_eq!(psi, [2.0, 2.0]);
        assert_eq!(s.final_residual, 0.5);
        assert!(!s.restore_best(&mut psi));
    }

    #[test]
    fn non_finite_residual_is_replaced() {
        let mut s = SolveState::new(1);
        s.final_residual = 2.0;
        s.track(&[1.0]);
        s.final_residual = f64::NAN;
        s.track(&[f64::NAN]);
        let mut psi = [f64::NAN];
        assert!(s.restore_best(&mut psi));
        assert_eq!(psi, [1.0]);
    }
}
