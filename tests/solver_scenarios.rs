//! Single-process solver behaviour: the path-graph scenario, finite
//! termination of CG, the asymmetric solvers and the smooth solver against a
//! dense LU reference, and the structural failure modes.

mod common;

use approx::assert_abs_diff_eq;
use common::{dense_solve, grid_system, path_system, random_vec};
use ldusolve::parallel::Transport;
use ldusolve::{
    Capability, CommsConfig, Communicator, LduError, LocalUniverse, Registry, SolverControls,
    TerminalState,
};

#[test]
fn path_graph_with_diagonal_preconditioner() {
    let system = path_system(5, 4.0, -1.0);
    let comm = Communicator::serial();
    let registry = Registry::with_defaults();
    let controls = SolverControls::new("PCG", "diagonal").with_rel_tol(1e-8);
    let mut psi = vec![0.0; 5];
    let perf = registry.solve("T", &system, &comm, &controls, &mut psi, &[1.0; 5]).unwrap();

    assert!(perf.converged());
    assert!(perf.iterations <= 5, "took {} iterations", perf.iterations);
    let exact = [19.0, 24.0, 25.0, 24.0, 19.0].map(|v| v / 52.0);
    for (p, e) in psi.iter().zip(exact) {
        assert_abs_diff_eq!(*p, e, epsilon = 1e-6);
    }
    assert!(perf.to_string().starts_with("PCG:  Solving for T, Initial residual = "));
}

#[test]
fn cg_terminates_within_n_iterations() {
    let n = 12;
    let system = grid_system(n, 1, false, 3);
    let b = random_vec(n, 4);
    let comm = Communicator::serial();
    let controls = SolverControls::new("PCG", "none").with_tolerance(1e-12);
    let mut psi = vec![0.0; n];
    let perf = Registry::with_defaults()
        .solve("x", &system, &comm, &controls, &mut psi, &b)
        .unwrap();
    assert!(perf.converged());
    assert!(perf.iterations <= n);
    let exact = dense_solve(&system, &b);
    for (p, e) in psi.iter().zip(&exact) {
        assert_abs_diff_eq!(*p, *e, epsilon = 1e-8);
    }
}

#[test]
fn symmetric_solvers_match_dense_lu() {
    let system = grid_system(5, 4, false, 11);
    let b = random_vec(20, 12);
    let exact = dense_solve(&system, &b);
    let comm = Communicator::serial();
    let registry = Registry::with_defaults();
    for (solver, pc) in [
        ("PCG", "DIC"),
        ("PCG", "GaussSeidel"),
        ("PCG", "DILU"),
        ("PBiCGStab", "DIC"),
        ("GMRES", "diagonal"),
    ] {
        let controls = SolverControls::new(solver, pc).with_tolerance(1e-12);
        let mut psi = vec![0.0; 20];
        let perf = registry.solve("p", &system, &comm, &controls, &mut psi, &b).unwrap();
        assert!(perf.converged(), "{solver}/{pc}: {perf}");
        for (p, e) in psi.iter().zip(&exact) {
            assert_abs_diff_eq!(*p, *e, epsilon = 1e-8);
        }
    }
}

#[test]
fn asymmetric_solvers_match_dense_lu() {
    let system = grid_system(6, 4, true, 21);
    let b = random_vec(24, 22);
    let exact = dense_solve(&system, &b);
    let comm = Communicator::serial();
    let registry = Registry::with_defaults();
    for (solver, pc) in [
        ("PBiCGStab", "DILU"),
        ("PBiCGStab", "none"),
        ("GMRES", "DILU"),
        ("GMRES", "GaussSeidel"),
    ] {
        let controls = SolverControls::new(solver, pc).with_tolerance(1e-12);
        let mut psi = vec![0.0; 24];
        let perf = registry.solve("U", &system, &comm, &controls, &mut psi, &b).unwrap();
        assert!(perf.converged(), "{solver}/{pc}: {perf}");
        for (p, e) in psi.iter().zip(&exact) {
            assert_abs_diff_eq!(*p, *e, epsilon = 1e-8);
        }
    }
}

#[test]
fn gmres_restarts_with_a_small_basis() {
    let system = grid_system(6, 5, true, 31);
    let b = random_vec(30, 32);
    let exact = dense_solve(&system, &b);
    let comm = Communicator::serial();
    let controls = SolverControls::new("GMRES", "none").with_tolerance(1e-11).with_restart(3);
    let mut psi = vec![0.0; 30];
    let perf = Registry::with_defaults()
        .solve("U", &system, &comm, &controls, &mut psi, &b)
        .unwrap();
    assert!(perf.converged(), "{perf}");
    assert!(perf.iterations > 3);
    for (p, e) in psi.iter().zip(&exact) {
        assert_abs_diff_eq!(*p, *e, epsilon = 1e-7);
    }
}

#[test]
fn smooth_solver_with_every_smoother() {
    let registry = Registry::with_defaults();
    let comm = Communicator::serial();
    for asymmetric in [false, true] {
        let system = grid_system(4, 4, asymmetric, 41);
        let b = random_vec(16, 42);
        let exact = dense_solve(&system, &b);
        for smoother in registry.smoother_names(Capability::of(&system)) {
            let controls = SolverControls::new("smoothSolver", "none")
                .with_smoother(&smoother)
                .with_n_sweeps(2)
                .with_tolerance(1e-11);
            let mut psi = vec![0.0; 16];
            let perf = registry.solve("h", &system, &comm, &controls, &mut psi, &b).unwrap();
            assert!(perf.converged(), "{smoother}: {perf}");
            assert_eq!(perf.iterations % 2, 0);
            for (p, e) in psi.iter().zip(&exact) {
                assert_abs_diff_eq!(*p, *e, epsilon = 1e-7);
            }
        }
    }
}

#[test]
fn max_iterations_keeps_the_best_iterate() {
    let system = grid_system(8, 8, false, 51);
    let b = random_vec(64, 52);
    let comm = Communicator::serial();
    let controls = SolverControls::new("PCG", "none").with_tolerance(1e-14).with_max_iter(3);
    let mut psi = vec![0.0; 64];
    let perf = Registry::with_defaults()
        .solve("p", &system, &comm, &controls, &mut psi, &b)
        .unwrap();
    assert_eq!(perf.state, TerminalState::MaxIterationsReached);
    assert_eq!(perf.iterations, 3);
    assert!(perf.final_residual < perf.initial_residual);
}

#[test]
fn diverging_smoother_hands_back_the_starting_guess() {
    // indefinite: Gauss-Seidel amplifies the error ninefold per sweep
    let system = path_system(2, 1.0, -3.0);
    let comm = Communicator::serial();
    let controls = SolverControls::new("smoothSolver", "none").with_smoother("GaussSeidel");
    let mut psi = vec![0.0; 2];
    let perf = Registry::with_defaults()
        .solve("k", &system, &comm, &controls, &mut psi, &[1.0, 1.0])
        .unwrap();
    assert_eq!(perf.state, TerminalState::Diverged);
    assert_eq!(perf.iterations, 6);
    assert_eq!(psi, vec![0.0, 0.0]);
    assert_eq!(perf.final_residual, perf.initial_residual);
}

#[test]
fn max_iterations_returns_the_best_not_the_last_iterate() {
    let system = path_system(2, 1.0, -3.0);
    let comm = Communicator::serial();
    let controls = SolverControls::new("smoothSolver", "none")
        .with_smoother("GaussSeidel")
        .with_max_iter(3);
    let mut psi = vec![0.0; 2];
    let perf = Registry::with_defaults()
        .solve("k", &system, &comm, &controls, &mut psi, &[1.0, 1.0])
        .unwrap();
    assert_eq!(perf.state, TerminalState::MaxIterationsReached);
    assert_eq!(perf.iterations, 3);
    // the third sweep left psi = (121, 364); the starting guess was better
    assert_eq!(psi, vec![0.0, 0.0]);
    assert_abs_diff_eq!(perf.final_residual, 1.0, epsilon = 1e-12);
}

#[test]
fn zero_tolerance_on_an_exactly_solved_system_is_not_divergence() {
    let system = path_system(3, 4.0, -1.0);
    let b = [1.0, 2.0, 3.0];
    let exact = dense_solve(&system, &b);
    let comm = Communicator::serial();
    let controls = SolverControls::new("PCG", "DIC").with_tolerance(0.0);
    let mut psi = vec![0.0; 3];
    let perf = Registry::with_defaults()
        .solve("p", &system, &comm, &controls, &mut psi, &b)
        .unwrap();
    assert_ne!(perf.state, TerminalState::Diverged, "{perf}");
    assert!(perf.final_residual < 1e-12);
    for (p, e) in psi.iter().zip(&exact) {
        assert_abs_diff_eq!(*p, *e, epsilon = 1e-12);
    }
}

#[test]
fn min_iter_forces_work_on_a_solved_system() {
    let system = path_system(4, 3.0, -1.0);
    let comm = Communicator::serial();
    let mut psi = vec![0.0; 4];
    let controls = SolverControls::new("PCG", "diagonal").with_min_iter(2);
    let perf = Registry::with_defaults()
        .solve("p", &system, &comm, &controls, &mut psi, &[0.0; 4])
        .unwrap();
    assert!(perf.converged());
    assert!(perf.iterations >= 2 || perf.final_residual == 0.0);
    assert_eq!(psi, vec![0.0; 4]);
}

#[test]
fn unknown_solver_fails_before_any_message() {
    let system = grid_system(4, 2, false, 61);
    let parts = ldusolve::utils::decompose(&system, &[0, 0, 1, 1, 0, 0, 1, 1]).unwrap();
    let topology = ldusolve::utils::topology_of(&parts).unwrap();
    let registry = Registry::with_defaults();
    let controls = SolverControls::new("doesNotExist", "DIC");
    let got = LocalUniverse::run(2, |t| {
        let part = &parts[t.rank()];
        let comm = Communicator::new(t, topology.clone(), CommsConfig::default()).unwrap();
        let mut psi = vec![0.0; part.cells.len()];
        let b = vec![1.0; part.cells.len()];
        let err = registry.solve("p", &part.system, &comm, &controls, &mut psi, &b).err();
        (err, comm.messages_sent())
    });
    for (err, sent) in got {
        match err {
            Some(LduError::UnknownAlgorithm { kind, name, valid }) => {
                assert_eq!(kind, "solver");
                assert_eq!(name, "doesNotExist");
                assert!(valid.contains(&"PCG".to_string()));
                assert!(valid.windows(2).all(|w| w[0] <= w[1]));
            }
            other => panic!("expected an unknown-algorithm error, got {other:?}"),
        }
        assert_eq!(sent, 0);
    }
}

#[test]
fn unknown_preconditioner_fails_before_any_message() {
    let system = grid_system(3, 2, false, 65);
    let parts = ldusolve::utils::decompose(&system, &[0, 0, 1, 0, 1, 1]).unwrap();
    let topology = ldusolve::utils::topology_of(&parts).unwrap();
    let registry = Registry::with_defaults();
    let controls = SolverControls::new("PCG", "doesNotExist");
    let got = LocalUniverse::run(2, |t| {
        let part = &parts[t.rank()];
        let comm = Communicator::new(t, topology.clone(), CommsConfig::default()).unwrap();
        let mut psi = vec![0.0; part.cells.len()];
        let b = vec![1.0; part.cells.len()];
        let err = registry.solve("p", &part.system, &comm, &controls, &mut psi, &b).err();
        (err, comm.messages_sent())
    });
    for (err, sent) in got {
        match err {
            Some(LduError::UnknownAlgorithm { kind, valid, .. }) => {
                assert_eq!(kind, "preconditioner");
                assert_eq!(valid, vec!["DIC", "DILU", "GaussSeidel", "diagonal", "none"]);
            }
            other => panic!("expected an unknown-algorithm error, got {other:?}"),
        }
        assert_eq!(sent, 0);
    }
}

#[test]
fn dic_is_refused_for_asymmetric_storage() {
    let system = grid_system(3, 3, true, 71);
    let comm = Communicator::serial();
    let controls = SolverControls::new("PBiCGStab", "DIC");
    let mut psi = vec![0.0; 9];
    let err = Registry::with_defaults()
        .solve("U", &system, &comm, &controls, &mut psi, &[1.0; 9])
        .err();
    assert!(matches!(err, Some(LduError::UnknownAlgorithm { kind: "preconditioner", .. })));
}

#[test]
fn source_length_is_checked() {
    let system = path_system(4, 3.0, -1.0);
    let comm = Communicator::serial();
    let mut psi = vec![0.0; 4];
    let err = Registry::with_defaults()
        .solve("p", &system, &comm, &SolverControls::default(), &mut psi, &[1.0; 3])
        .err();
    assert!(matches!(err, Some(LduError::ShapeMismatch(_))));
}
