//! Shared builders for the integration tests: structured-grid systems, a
//! dense reference solve and a driver running one solve per process.

#![allow(dead_code)]

use faer::Mat;
use faer::linalg::solvers::SolveCore;
use ldusolve::parallel::Transport;
use ldusolve::utils::{assemble, decompose, topology_of};
use ldusolve::{
    CommsConfig, CommsType, Communicator, LduMatrix, LduSystem, LocalUniverse, Registry,
    SolverControls, SolverPerformance,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Five-point Laplacian-like system on an `nx` × `ny` grid with random,
/// diagonally dominant coefficients. Cell `(i, j)` is `j * nx + i`.
pub fn grid_system(nx: usize, ny: usize, asymmetric: bool, seed: u64) -> LduSystem {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = nx * ny;
    let (mut owner, mut neighbour) = (Vec::new(), Vec::new());
    for j in 0..ny {
        for i in 0..nx {
            let c = j * nx + i;
            if i + 1 < nx {
                owner.push(c);
                neighbour.push(c + 1);
            }
            if j + 1 < ny {
                owner.push(c);
                neighbour.push(c + nx);
            }
        }
    }
    let upper: Vec<f64> = owner.iter().map(|_| -rng.gen_range(0.1..1.0)).collect();
    let lower: Option<Vec<f64>> =
        asymmetric.then(|| owner.iter().map(|_| -rng.gen_range(0.1..1.0)).collect());
    let mut diag = vec![0.0; n];
    for (face, (&o, &nb)) in owner.iter().zip(&neighbour).enumerate() {
        let l = lower.as_ref().map_or(upper[face], |l| l[face]);
        diag[o] += upper[face].abs();
        diag[nb] += l.abs();
    }
    for d in &mut diag {
        *d += rng.gen_range(0.5..1.5);
    }
    let m = LduMatrix::from_faces(diag, owner, neighbour, upper, lower).unwrap();
    LduSystem::serial(m)
}

/// Tridiagonal path graph with constant coefficients.
pub fn path_system(n: usize, diag: f64, off: f64) -> LduSystem {
    let m = LduMatrix::from_faces(
        vec![diag; n],
        (0..n - 1).collect(),
        (1..n).collect(),
        vec![off; n - 1],
        None,
    )
    .unwrap();
    LduSystem::serial(m)
}

pub fn random_vec(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// Reference solution by dense LU.
pub fn dense_solve(system: &LduSystem, b: &[f64]) -> Vec<f64> {
    let a: Mat<f64> = system.matrix().to_dense();
    let n = b.len();
    let mut x = b.to_vec();
    let lu = faer::linalg::solvers::FullPivLu::new(a.as_ref());
    let x_mat = faer::MatMut::from_column_major_slice_mut(&mut x, n, 1);
    lu.solve_in_place_with_conj(faer::Conj::No, x_mat);
    x
}

/// Contiguous blocks of cells per process.
pub fn block_partition(n: usize, n_procs: usize) -> Vec<usize> {
    (0..n).map(|c| c * n_procs / n).collect()
}

/// Split `system` by `cell_to_proc`, solve on one thread per process and
/// return the assembled solution with every process's performance record.
pub fn solve_decomposed(
    system: &LduSystem,
    cell_to_proc: &[usize],
    controls: &SolverControls,
    comms_type: CommsType,
    source: &[f64],
) -> (Vec<f64>, Vec<SolverPerformance>) {
    let parts = decompose(system, cell_to_proc).unwrap();
    let topology = topology_of(&parts).unwrap();
    let registry = Registry::with_defaults();
    let config = CommsConfig { comms_type, ..CommsConfig::default() };
    let results = LocalUniverse::run(parts.len(), |t| {
        let part = &parts[t.rank()];
        let comm = Communicator::new(t, topology.clone(), config).unwrap();
        let mut psi = vec![0.0; part.cells.len()];
        let b = part.restrict(source);
        let perf = registry
            .solve("psi", &part.system, &comm, controls, &mut psi, &b)
            .unwrap();
        (psi, perf)
    });
    let (locals, perfs): (Vec<_>, Vec<_>) = results.into_iter().unzip();
    (assemble(&parts, &locals), perfs)
}
