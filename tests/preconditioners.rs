//! Properties every registered preconditioner has to satisfy.

mod common;

use common::{grid_system, random_vec};
use ldusolve::{Capability, Communicator, LduError, Registry, SolverControls};

#[test]
fn apply_is_idempotent() {
    let registry = Registry::with_defaults();
    let comm = Communicator::serial();
    let controls = SolverControls::default().with_n_sweeps(2);
    for asymmetric in [false, true] {
        let system = grid_system(5, 3, asymmetric, 201);
        let r = random_vec(15, 202);
        for name in registry.preconditioner_names(Capability::of(&system)) {
            let pc = registry.preconditioner(&name, &system, &comm, &controls).unwrap();
            let mut z1 = vec![0.0; 15];
            let mut z2 = vec![7.0; 15];
            pc.apply(&r, &mut z1).unwrap();
            pc.apply(&r, &mut z2).unwrap();
            assert_eq!(z1, z2, "{name}");
            assert!(pc.capability().contains(Capability::of(&system)), "{name}");
        }
    }
}

#[test]
fn wrong_lengths_are_rejected() {
    let registry = Registry::with_defaults();
    let comm = Communicator::serial();
    let system = grid_system(3, 2, false, 221);
    let pc = registry
        .preconditioner("diagonal", &system, &comm, &SolverControls::default())
        .unwrap();
    let mut z = vec![0.0; 5];
    assert!(matches!(pc.apply(&[1.0; 6], &mut z), Err(LduError::ShapeMismatch(_))));
}
