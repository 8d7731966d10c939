//! Name → constructor tables for solvers, preconditioners and smoothers.
//!
//! Each kind keeps one table for symmetric and one for asymmetric storage;
//! a key is looked up in the table matching the system at hand. A
//! `Registry` is an ordinary value: build one (usually with
//! [`Registry::with_defaults`]), extend it with `register_*` and hand it to
//! every solve by reference.
//!
//! Lookups never communicate, so an unknown key fails on every process
//! before the first message of the solve. Failures that depend on the local
//! share of the matrix (a zero pivot, say) are agreed on collectively, so no
//! process is left waiting for a peer that gave up.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::SolverControls;
use crate::error::{LduError, Result};
use crate::matrix::LduSystem;
use crate::parallel::Communicator;
use crate::preconditioner::{self, Capability, Preconditioner, PreconditionerCtor};
use crate::smoother::{self, Smoother, SmootherCtor};
use crate::solver::{self, LduSolver, SolveContext, SolverCtor, SolverPerformance};

/// One kind of algorithm, split by the storage it accepts.
#[derive(Clone)]
struct Table<C> {
    kind: &'static str,
    symmetric: BTreeMap<String, C>,
    asymmetric: BTreeMap<String, C>,
}

impl<C: Copy> Table<C> {
    fn new(kind: &'static str) -> Self {
        Self { kind, symmetric: BTreeMap::new(), asymmetric: BTreeMap::new() }
    }

    fn insert(&mut self, name: &str, capability: Capability, ctor: C) {
        if capability.contains(Capability::SYMMETRIC) {
            self.symmetric.insert(name.to_string(), ctor);
        }
        if capability.contains(Capability::ASYMMETRIC) {
            self.asymmetric.insert(name.to_string(), ctor);
        }
    }

    fn side(&self, capability: Capability) -> &BTreeMap<String, C> {
        if capability.contains(Capability::ASYMMETRIC) {
            &self.asymmetric
        } else {
            &self.symmetric
        }
    }

    fn names(&self, capability: Capability) -> Vec<String> {
        self.side(capability).keys().cloned().collect()
    }

    fn get(&self, capability: Capability, name: &str) -> Result<C> {
        self.side(capability).get(name).copied().ok_or_else(|| LduError::UnknownAlgorithm {
            kind: self.kind,
            name: name.to_string(),
            valid: self.names(capability),
        })
    }
}

#[derive(Clone)]
pub struct Registry {
    solvers: Table<SolverCtor>,
    preconditioners: Table<PreconditionerCtor>,
    smoothers: Table<SmootherCtor>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("symmetric_solvers", &self.solvers.names(Capability::SYMMETRIC))
            .field("asymmetric_solvers", &self.solvers.names(Capability::ASYMMETRIC))
            .field("preconditioners", &self.preconditioners.names(Capability::ASYMMETRIC))
            .field("smoothers", &self.smoothers.names(Capability::ASYMMETRIC))
            .finish()
    }
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            solvers: Table::new("solver"),
            preconditioners: Table::new("preconditioner"),
            smoothers: Table::new("smoother"),
        }
    }

    /// Every built-in algorithm under its usual key.
    pub fn with_defaults() -> Self {
        let sym = Capability::SYMMETRIC;
        let both = Capability::BOTH;
        let mut r = Self::new();

        r.register_solver("PCG", sym, solver::pcg::build);
        r.register_solver("PBiCGStab", both, solver::pbicgstab::build);
        r.register_solver("GMRES", both, solver::gmres::build);
        r.register_solver("smoothSolver", both, solver::smooth_solver::build);
        r.register_solver("diagonal", both, solver::diagonal::build);

        r.register_preconditioner("none", both, preconditioner::none::build);
        r.register_preconditioner("diagonal", both, preconditioner::diagonal::build);
        r.register_preconditioner("DIC", sym, preconditioner::dic::build);
        r.register_preconditioner("DILU", both, preconditioner::dilu::build);
        r.register_preconditioner("GaussSeidel", both, preconditioner::gauss_seidel::build);

        r.register_smoother("GaussSeidel", both, smoother::gauss_seidel::build);
        r.register_smoother("symGaussSeidel", both, smoother::gauss_seidel::build_symmetric);
        r.register_smoother("DIC", sym, smoother::incomplete::build_dic);
        r.register_smoother("DILU", both, smoother::incomplete::build_dilu);
        r
    }

    /// Add or replace a solver; `capability` picks the tables it joins.
    pub fn register_solver(&mut self, name: &str, capability: Capability, ctor: SolverCtor) -> &mut Self {
        self.solvers.insert(name, capability, ctor);
        self
    }

    pub fn register_preconditioner(
        &mut self,
        name: &str,
        capability: Capability,
        ctor: PreconditionerCtor,
    ) -> &mut Self {
        self.preconditioners.insert(name, capability, ctor);
        self
    }

    pub fn register_smoother(&mut self, name: &str, capability: Capability, ctor: SmootherCtor) -> &mut Self {
        self.smoothers.insert(name, capability, ctor);
        self
    }

    /// Sorted solver keys usable for the given storage.
    pub fn solver_names(&self, capability: Capability) -> Vec<String> {
        self.solvers.names(capability)
    }
    pub fn preconditioner_names(&self, capability: Capability) -> Vec<String> {
        self.preconditioners.names(capability)
    }
    pub fn smoother_names(&self, capability: Capability) -> Vec<String> {
        self.smoothers.names(capability)
    }

    pub fn preconditioner<'a>(
        &self,
        name: &str,
        system: &'a LduSystem,
        comm: &'a Communicator,
        controls: &SolverControls,
    ) -> Result<Box<dyn Preconditioner + 'a>> {
        let ctor = self.preconditioners.get(Capability::of(system), name)?;
        log::debug!("selected preconditioner {name} for a {}-cell system", system.size());
        ctor(system, comm, controls)
    }

    pub fn smoother<'a>(
        &self,
        name: &str,
        system: &'a LduSystem,
        comm: &'a Communicator,
        controls: &SolverControls,
    ) -> Result<Box<dyn Smoother + 'a>> {
        let ctor = self.smoothers.get(Capability::of(system), name)?;
        log::debug!("selected smoother {name} for a {}-cell system", system.size());
        ctor(system, comm, controls)
    }

    /// Build the solver named in `controls`.
    ///
    /// Key lookups come first and never communicate. After that the
    /// processes agree on two things: whether every one of them built its
    /// solver, and whether the whole system is free of faces and interfaces,
    /// in which case the diagonal solver replaces the one named.
    pub fn new_solver<'a>(
        &'a self,
        field_name: &'a str,
        system: &'a LduSystem,
        comm: &'a Communicator,
        controls: &'a SolverControls,
    ) -> Result<Box<dyn LduSolver + 'a>> {
        controls.validate()?;
        let ctx = SolveContext { field_name, system, comm, controls, registry: self };
        let ctor = self.solvers.get(Capability::of(system), &controls.solver)?;
        let built = match ctor(ctx) {
            Err(e @ LduError::UnknownAlgorithm { .. }) => return Err(e),
            built => built,
        };

        let all_built = comm.all_true(built.is_ok())?;
        let solver = match built {
            Err(e) => {
                log::warn!("{field_name}: could not build {}: {e}", controls.solver);
                return Err(e);
            }
            Ok(_) if !all_built => {
                return Err(LduError::CommunicationFailure(format!(
                    "{field_name}: {} could not be built on another process",
                    controls.solver
                )));
            }
            Ok(solver) => solver,
        };

        if comm.all_true(system.is_diagonal())? {
            log::debug!("{field_name}: matrix is diagonal, solving directly");
            return solver::diagonal::build(ctx);
        }
        log::debug!(
            "{field_name}: selected {} with preconditioner {} / smoother {}",
            controls.solver,
            controls.preconditioner,
            controls.smoother
        );
        Ok(solver)
    }

    /// Build and run a solver in one go.
    pub fn solve(
        &self,
        field_name: &str,
        system: &LduSystem,
        comm: &Communicator,
        controls: &SolverControls,
        psi: &mut [f64],
        source: &[f64],
    ) -> Result<SolverPerformance> {
        self.new_solver(field_name, system, comm, controls)?.solve(psi, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::LduMatrix;
    use crate::solver::TerminalState;

    fn chain(n: usize, asymmetric: bool) -> LduSystem {
        let lower = asymmetric.then(|| vec![-0.5; n - 1]);
        let m = LduMatrix::from_faces(
            vec![4.0; n],
            (0..n - 1).collect(),
            (1..n).collect(),
            vec![-1.0; n - 1],
            lower,
        )
        .unwrap();
        LduSystem::serial(m)
    }

    #[test]
    fn default_tables() {
        let r = Registry::with_defaults();
        assert_eq!(
            r.solver_names(Capability::SYMMETRIC),
            vec!["GMRES", "PBiCGStab", "PCG", "diagonal", "smoothSolver"]
        );
        assert!(!r.solver_names(Capability::ASYMMETRIC).contains(&"PCG".to_string()));
        assert!(r.preconditioner_names(Capability::SYMMETRIC).contains(&"DIC".to_string()));
        assert!(!r.preconditioner_names(Capability::ASYMMETRIC).contains(&"DIC".to_string()));
        assert_eq!(
            r.smoother_names(Capability::ASYMMETRIC),
            vec!["DILU", "GaussSeidel", "symGaussSeidel"]
        );
    }

    #[test]
    fn unknown_solver_lists_valid_keys() {
        let r = Registry::with_defaults();
        let sys = chain(4, true);
        let comm = Communicator::serial();
        let controls = SolverControls::new("PCG", "DILU");
        let err = r.new_solver("U", &sys, &comm, &controls).err();
        match err {
            Some(LduError::UnknownAlgorithm { kind, name, valid }) => {
                assert_eq!(kind, "solver");
                assert_eq!(name, "PCG");
                assert_eq!(valid, vec!["GMRES", "PBiCGStab", "diagonal", "smoothSolver"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_preconditioner_for_storage() {
        let r = Registry::with_defaults();
        let sys = chain(4, true);
        let comm = Communicator::serial();
        let controls = SolverControls::new("PBiCGStab", "DIC");
        let err = r.new_solver("U", &sys, &comm, &controls).err();
        assert!(matches!(
            err,
            Some(LduError::UnknownAlgorithm { kind: "preconditioner", .. })
        ));
    }

    #[test]
    fn diagonal_system_is_solved_directly() {
        let r = Registry::with_defaults();
        let sys = LduSystem::serial(
            LduMatrix::from_faces(vec![2.0, 4.0], vec![], vec![], vec![], None).unwrap(),
        );
        let comm = Communicator::serial();
        let controls = SolverControls::new("GMRES", "none");
        let mut psi = vec![0.0; 2];
        let perf = r.solve("T", &sys, &comm, &controls, &mut psi, &[1.0, 1.0]).unwrap();
        assert_eq!(psi, vec![0.5, 0.25]);
        assert_eq!(perf.solver_name, "diagonal");
        assert_eq!(perf.state, TerminalState::Converged);
        assert_eq!(perf.iterations, 0);

        let controls = SolverControls::new("notASolver", "none");
        assert!(matches!(
            r.new_solver("T", &sys, &comm, &controls).err(),
            Some(LduError::UnknownAlgorithm { kind: "solver", .. })
        ));
    }

    #[test]
    fn invalid_controls_rejected_first() {
        let r = Registry::with_defaults();
        let sys = chain(3, false);
        let comm = Communicator::serial();
        let controls = SolverControls::new("PCG", "DIC").with_max_iter(0);
        assert!(matches!(
            r.new_solver("p", &sys, &comm, &controls).err(),
            Some(LduError::InvalidConfig(_))
        ));
    }

    fn build_identity<'a>(
        system: &'a LduSystem,
        _comm: &'a Communicator,
        _controls: &SolverControls,
    ) -> Result<Box<dyn Preconditioner + 'a>> {
        Ok(Box::new(preconditioner::NoPreconditioner::new(system)))
    }

    #[test]
    fn registered_preconditioner_is_used() {
        let mut r = Registry::new();
        r.register_solver("PCG", Capability::SYMMETRIC, solver::pcg::build)
            .register_preconditioner("identity", Capability::BOTH, build_identity);
        let sys = chain(5, false);
        let comm = Communicator::serial();
        let controls = SolverControls::new("PCG", "identity").with_tolerance(1e-12);
        let mut psi = vec![0.0; 5];
        let perf = r.solve("p", &sys, &comm, &controls, &mut psi, &[1.0; 5]).unwrap();
        assert!(perf.converged());
        assert!(perf.iterations <= 5);
    }
}
