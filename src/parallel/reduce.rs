//! Values that can travel through a reduction, and the usual operators.

use crate::error::{LduError, Result};
use num_traits::Num;

/// A value with a flat `f64` wire form.
pub trait Reducible: Sized {
    fn to_wire(&self) -> Vec<f64>;
    fn from_wire(wire: &[f64]) -> Result<Self>;
}

fn scalar(wire: &[f64]) -> Result<f64> {
    match wire {
        [v] => Ok(*v),
        _ => Err(LduError::comm(format!(
            "expected a single value on the wire, got {}",
            wire.len()
        ))),
    }
}

impl Reducible for f64 {
    fn to_wire(&self) -> Vec<f64> {
        vec![*self]
    }
    fn from_wire(wire: &[f64]) -> Result<Self> {
        scalar(wire)
    }
}

// Counts stay exact below 2^53.
impl Reducible for usize {
    fn to_wire(&self) -> Vec<f64> {
        vec![*self as f64]
    }
    fn from_wire(wire: &[f64]) -> Result<Self> {
        scalar(wire).map(|v| v as usize)
    }
}

impl Reducible for bool {
    fn to_wire(&self) -> Vec<f64> {
        vec![if *self { 1.0 } else { 0.0 }]
    }
    fn from_wire(wire: &[f64]) -> Result<Self> {
        scalar(wire).map(|v| v != 0.0)
    }
}

impl Reducible for Vec<f64> {
    fn to_wire(&self) -> Vec<f64> {
        self.clone()
    }
    fn from_wire(wire: &[f64]) -> Result<Self> {
        Ok(wire.to_vec())
    }
}

pub fn sum_op<T: Num>(a: T, b: T) -> T {
    a + b
}

pub fn max_op<T: PartialOrd>(a: T, b: T) -> T {
    if b > a { b } else { a }
}

pub fn min_op<T: PartialOrd>(a: T, b: T) -> T {
    if b < a { b } else { a }
}

pub fn and_op(a: bool, b: bool) -> bool {
    a && b
}

/// Element-wise sum; the shorter operand is padded with zeros.
pub fn vec_sum_op(mut a: Vec<f64>, b: Vec<f64>) -> Vec<f64> {
    if a.len() < b.len() {
        a.resize(b.len(), 0.0);
    }
    for (x, y) in a.iter_mut().zip(&b) {
        *x += *y;
    }
    a
}

/// Flatten a list of vectors as `[n, len_0 .. len_n-1, data ..]`.
pub(crate) fn pack_list(list: &[Vec<f64>]) -> Vec<f64> {
    let total: usize = list.iter().map(Vec::len).sum();
    let mut wire = Vec::with_capacity(1 + list.len() + total);
    wire.push(list.len() as f64);
    wire.extend(list.iter().map(|v| v.len() as f64));
    for v in list {
        wire.extend_from_slice(v);
    }
    wire
}

pub(crate) fn unpack_list(wire: &[f64]) -> Result<Vec<Vec<f64>>> {
    let bad = || LduError::comm("malformed packed list on the wire");
    let n = *wire.first().ok_or_else(bad)? as usize;
    let mut offset = n.checked_add(1).ok_or_else(bad)?;
    let lens = wire.get(1..offset).ok_or_else(bad)?;
    let mut list = Vec::with_capacity(lens.len());
    for &len in lens {
        let end = offset.checked_add(len as usize).ok_or_else(bad)?;
        list.push(wire.get(offset..end).ok_or_else(bad)?.to_vec());
        offset = end;
    }
    if offset != wire.len() {
        return Err(bad());
    }
    Ok(list)
}
