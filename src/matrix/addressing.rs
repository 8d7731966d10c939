//! Face-based (owner/neighbour) addressing of an LDU matrix.
//!
//! Every internal face `e` couples the owner cell `lower_addr[e]` to the
//! neighbour cell `upper_addr[e]` with `owner < neighbour`. The upper
//! coefficient of face `e` sits in row `owner`, column `neighbour`; the lower
//! coefficient sits in row `neighbour`, column `owner`.
//!
//! Two derived indexings are built once:
//! - `owner_order`/`owner_start`: faces grouped by owner, sorted by owner
//!   then neighbour. Sweeping faces in this order visits the strict upper
//!   triangle row by row, which is what the incomplete factorizations need.
//! - `losort`/`losort_start`: faces grouped by neighbour cell, so a
//!   Gauss-Seidel sweep can visit the lower triangle of a row directly.

use crate::error::{LduError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct LduAddressing {
    n_cells: usize,
    lower_addr: Vec<usize>,
    upper_addr: Vec<usize>,
    owner_order: Vec<usize>,
    owner_start: Vec<usize>,
    losort: Vec<usize>,
    losort_start: Vec<usize>,
}

impl LduAddressing {
    /// Build and validate the addressing for `n_cells` cells.
    pub fn new(n_cells: usize, lower_addr: Vec<usize>, upper_addr: Vec<usize>) -> Result<Self> {
        if lower_addr.len() != upper_addr.len() {
            return Err(LduError::shape(format!(
                "owner list has {} faces but neighbour list has {}",
                lower_addr.len(),
                upper_addr.len()
            )));
        }
        for (face, (&l, &u)) in lower_addr.iter().zip(&upper_addr).enumerate() {
            if l >= n_cells || u >= n_cells {
                return Err(LduError::shape(format!(
                    "face {face} addresses cells ({l}, {u}) outside [0, {n_cells})"
                )));
            }
            if l >= u {
                return Err(LduError::shape(format!(
                    "face {face} has owner {l} not below neighbour {u}"
                )));
            }
        }

        let (owner_order, owner_start) = group_faces(n_cells, &lower_addr, &upper_addr);
        let (losort, losort_start) = group_faces(n_cells, &upper_addr, &lower_addr);

        Ok(Self {
            n_cells,
            lower_addr,
            upper_addr,
            owner_order,
            owner_start,
            losort,
            losort_start,
        })
    }

    /// Addressing without any faces.
    pub fn diagonal(n_cells: usize) -> Self {
        Self {
            n_cells,
            lower_addr: Vec::new(),
            upper_addr: Vec::new(),
            owner_order: Vec::new(),
            owner_start: vec![0; n_cells + 1],
            losort: Vec::new(),
            losort_start: vec![0; n_cells + 1],
        }
    }

    pub fn size(&self) -> usize {
        self.n_cells
    }
    pub fn n_faces(&self) -> usize {
        self.lower_addr.len()
    }
    /// Owner cell of every face.
    pub fn lower_addr(&self) -> &[usize] {
        &self.lower_addr
    }
    /// Neighbour cell of every face.
    pub fn upper_addr(&self) -> &[usize] {
        &self.upper_addr
    }

    /// Faces sorted by (owner, neighbour).
    pub fn owner_order(&self) -> &[usize] {
        &self.owner_order
    }

    /// Faces owned by `cell`, ascending neighbour.
    pub fn owner_faces(&self, cell: usize) -> &[usize] {
        &self.owner_order[self.owner_start[cell]..self.owner_start[cell + 1]]
    }

    /// Faces whose neighbour is `cell`, ascending owner.
    pub fn neighbour_faces(&self, cell: usize) -> &[usize] {
        &self.losort[self.losort_start[cell]..self.losort_start[cell + 1]]
    }
}

/// Counting sort of faces by `key`, ties broken by `tie`.
fn group_faces(n_cells: usize, key: &[usize], tie: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let mut start = vec![0usize; n_cells + 1];
    for &k in key {
        start[k + 1] += 1;
    }
    for c in 0..n_cells {
        start[c + 1] += start[c];
    }
    let mut fill = start.clone();
    let mut order = vec![0usize; key.len()];
    for (face, &k) in key.iter().enumerate() {
        order[fill[k]] = face;
        fill[k] += 1;
    }
    for c in 0..n_cells {
        order[start[c]..start[c + 1]].sort_by_key(|&f| (tie[f], f));
    }
    (order, start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_length_mismatch() {
        let err = LduAddressing::new(3, vec![0, 1], vec![1]).unwrap_err();
        assert!(matches!(err, LduError::ShapeMismatch(_)));
    }

    #[test]
    fn rejects_out_of_range_and_orientation() {
        assert!(LduAddressing::new(3, vec![0], vec![3]).is_err());
        assert!(LduAddressing::new(3, vec![2], vec![1]).is_err());
        assert!(LduAddressing::new(3, vec![1], vec![1]).is_err());
    }

    #[test]
    fn groups_unsorted_faces() {
        // faces listed out of upper-triangular order
        let addr = LduAddressing::new(4, vec![1, 0, 2, 0], vec![2, 3, 3, 1]).unwrap();
        assert_eq!(addr.owner_order(), &[3, 1, 0, 2]);
        assert_eq!(addr.owner_faces(0), &[3, 1]);
        assert_eq!(addr.owner_faces(3), &[] as &[usize]);
        assert_eq!(addr.neighbour_faces(3), &[1, 2]);
        assert_eq!(addr.neighbour_faces(1), &[3]);
    }
}
