//! Couplings that cross the boundary of the locally held matrix.
//!
//! An interface couples row `face_cells[k]` to a value that is not part of
//! the local vector: the `k`-th value owned by a neighbouring process, or
//! for a cyclic interface the local cell `neighbour_cells[k]` on the other
//! side of a periodic boundary. The coefficient `coeffs[k]` is the matrix
//! entry in that row, so the product gains `coeffs[k] * neighbour_value[k]`.

use crate::error::{LduError, Result};

/// How the neighbour values of an interface are obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum InterfaceKind {
    /// Values owned by another process; `tag` is shared by both sides of
    /// the coupling and distinguishes several interfaces between the same
    /// pair of processes.
    Processor { neighbour: usize, tag: u32 },
    /// Periodic coupling between cells of the same process.
    Cyclic { neighbour_cells: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LduInterface {
    kind: InterfaceKind,
    face_cells: Vec<usize>,
    coeffs: Vec<f64>,
}

impl LduInterface {
    pub fn processor(neighbour: usize, tag: u32, face_cells: Vec<usize>, coeffs: Vec<f64>) -> Self {
        Self {
            kind: InterfaceKind::Processor { neighbour, tag },
            face_cells,
            coeffs,
        }
    }

    pub fn cyclic(face_cells: Vec<usize>, neighbour_cells: Vec<usize>, coeffs: Vec<f64>) -> Self {
        Self {
            kind: InterfaceKind::Cyclic { neighbour_cells },
            face_cells,
            coeffs,
        }
    }

    pub fn kind(&self) -> &InterfaceKind {
        &self.kind
    }
    pub fn face_cells(&self) -> &[usize] {
        &self.face_cells
    }
    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }
    pub fn coeffs_mut(&mut self) -> &mut [f64] {
        &mut self.coeffs
    }
    pub fn len(&self) -> usize {
        self.face_cells.len()
    }
    pub fn is_empty(&self) -> bool {
        self.face_cells.is_empty()
    }

    /// Neighbouring process, if this interface needs communication.
    pub fn neighbour_rank(&self) -> Option<usize> {
        match self.kind {
            InterfaceKind::Processor { neighbour, .. } => Some(neighbour),
            InterfaceKind::Cyclic { .. } => None,
        }
    }

    /// Values of `x` this side contributes to the coupling.
    pub fn pack(&self, x: &[f64]) -> Vec<f64> {
        self.face_cells.iter().map(|&c| x[c]).collect()
    }

    /// y[face_cells[k]] += coeffs[k] * neighbour[k]
    pub fn add_contribution(&self, neighbour: &[f64], y: &mut [f64]) {
        for ((&cell, &coeff), &value) in self.face_cells.iter().zip(&self.coeffs).zip(neighbour) {
            y[cell] += coeff * value;
        }
    }

    pub(crate) fn validate(&self, index: usize, n_cells: usize) -> Result<()> {
        if self.coeffs.len() != self.face_cells.len() {
            return Err(LduError::shape(format!(
                "interface {index} has {} coefficients for {} faces",
                self.coeffs.len(),
                self.face_cells.len()
            )));
        }
        if let Some(&cell) = self.face_cells.iter().find(|&&c| c >= n_cells) {
            return Err(LduError::shape(format!(
                "interface {index} addresses cell {cell} outside [0, {n_cells})"
            )));
        }
        if let InterfaceKind::Cyclic { neighbour_cells } = &self.kind {
            if neighbour_cells.len() != self.face_cells.len() {
                return Err(LduError::shape(format!(
                    "cyclic interface {index} pairs {} faces with {} neighbour cells",
                    self.face_cells.len(),
                    neighbour_cells.len()
                )));
            }
            if let Some(&cell) = neighbour_cells.iter().find(|&&c| c >= n_cells) {
                return Err(LduError::shape(format!(
                    "cyclic interface {index} addresses neighbour cell {cell} outside [0, {n_cells})"
                )));
            }
        }
        Ok(())
    }
}
