//! Splitting a single-process system across processes.
//!
//! Cells are assigned to processes by a `cell_to_proc` map. Faces with both
//! cells on one process stay internal faces there; a face cut by the
//! partition becomes one entry of a processor interface on each side, the
//! owner side carrying the upper coefficient and the neighbour side the lower
//! one. Both sides list the cut faces of a process pair in the same (global
//! face) order, so the halo buffers line up.

use crate::error::{LduError, Result};
use crate::matrix::{LduInterface, LduMatrix, LduSystem};
use crate::parallel::ProcessorTopology;
use std::collections::BTreeMap;

/// The share of one process.
#[derive(Debug, Clone, PartialEq)]
pub struct DecomposedSystem {
    pub rank: usize,
    pub system: LduSystem,
    /// Global index of each local cell, ascending.
    pub cells: Vec<usize>,
    /// Ranks this process shares an interface with, ascending.
    pub peers: Vec<usize>,
}

impl DecomposedSystem {
    /// Local slice of a global field.
    pub fn restrict(&self, global: &[f64]) -> Vec<f64> {
        self.cells.iter().map(|&c| global[c]).collect()
    }
}

/// Split `system` over `max(cell_to_proc) + 1` processes.
pub fn decompose(system: &LduSystem, cell_to_proc: &[usize]) -> Result<Vec<DecomposedSystem>> {
    let matrix = system.matrix();
    let n = matrix.size();
    if cell_to_proc.len() != n {
        return Err(LduError::shape(format!(
            "decomposition maps {} cells of a {n}-cell system",
            cell_to_proc.len()
        )));
    }
    if !system.interfaces().is_empty() {
        return Err(LduError::shape("only systems without interfaces can be decomposed"));
    }
    let n_procs = cell_to_proc.iter().max().map_or(1, |&p| p + 1);

    let mut local = vec![0usize; n];
    let mut cells = vec![Vec::new(); n_procs];
    for (cell, &proc) in cell_to_proc.iter().enumerate() {
        local[cell] = cells[proc].len();
        cells[proc].push(cell);
    }

    struct Faces {
        owner: Vec<usize>,
        neighbour: Vec<usize>,
        upper: Vec<f64>,
        lower: Vec<f64>,
    }
    let mut internal: Vec<Faces> = (0..n_procs)
        .map(|_| Faces { owner: vec![], neighbour: vec![], upper: vec![], lower: vec![] })
        .collect();
    // (proc, neighbour proc) -> (face cells, coeffs)
    let mut cut: Vec<BTreeMap<usize, (Vec<usize>, Vec<f64>)>> = vec![BTreeMap::new(); n_procs];

    let addr = matrix.addressing();
    let (upper, lower) = (matrix.upper(), matrix.lower());
    for face in 0..addr.n_faces() {
        let (o, nb) = (addr.lower_addr()[face], addr.upper_addr()[face]);
        let (po, pn) = (cell_to_proc[o], cell_to_proc[nb]);
        if po == pn {
            let f = &mut internal[po];
            f.owner.push(local[o]);
            f.neighbour.push(local[nb]);
            f.upper.push(upper[face]);
            f.lower.push(lower[face]);
        } else {
            let side = cut[po].entry(pn).or_default();
            side.0.push(local[o]);
            side.1.push(upper[face]);
            let side = cut[pn].entry(po).or_default();
            side.0.push(local[nb]);
            side.1.push(lower[face]);
        }
    }

    let mut parts = Vec::with_capacity(n_procs);
    for (rank, (faces, couplings)) in internal.into_iter().zip(cut).enumerate() {
        let diag = cells[rank].iter().map(|&c| matrix.diag()[c]).collect();
        let lower = matrix.is_asymmetric().then_some(faces.lower);
        let local_matrix = LduMatrix::from_faces(diag, faces.owner, faces.neighbour, faces.upper, lower)?;
        let peers: Vec<usize> = couplings.keys().copied().collect();
        let interfaces = couplings
            .into_iter()
            .map(|(nbr, (face_cells, coeffs))| LduInterface::processor(nbr, 0, face_cells, coeffs))
            .collect();
        parts.push(DecomposedSystem {
            rank,
            system: LduSystem::new(local_matrix, interfaces)?,
            cells: std::mem::take(&mut cells[rank]),
            peers,
        });
    }
    log::debug!("decomposed {n} cells over {n_procs} processes");
    Ok(parts)
}

/// The topology the decomposed systems describe.
pub fn topology_of(parts: &[DecomposedSystem]) -> Result<ProcessorTopology> {
    ProcessorTopology::new(
        parts.iter().map(|p| p.rank).collect(),
        parts.iter().map(|p| p.peers.clone()).collect(),
    )
}

/// Reassemble a global field from per-process pieces.
pub fn assemble(parts: &[DecomposedSystem], locals: &[Vec<f64>]) -> Vec<f64> {
    let n = parts.iter().map(|p| p.cells.len()).sum();
    let mut global = vec![0.0; n];
    for (part, values) in parts.iter().zip(locals) {
        for (&cell, &v) in part.cells.iter().zip(values) {
            global[cell] = v;
        }
    }
    global
}
