//! Processor topology: who talks to whom.
//!
//! The topology is described once, identically on every process: the flat
//! list of participating ranks and, per participant, the ranks it is
//! directly coupled to through the mesh partition. From that two reduction
//! structures are derived over participant indices:
//!
//! - linear: the first participant is the master, every other participant
//!   sits directly below it (one hop, P − 1 messages into one process);
//! - tree: a binomial tree rooted at the master, `ceil(log2 P)` hops deep.
//!
//! Both must span all participants; a disagreement is a construction error.

use crate::error::{LduError, Result};
use std::collections::HashSet;

/// One process's place in a communication structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommsStruct {
    above: Option<usize>,
    below: Vec<usize>,
    all_below: Vec<usize>,
    all_not_below: Vec<usize>,
}

impl CommsStruct {
    /// Parent participant, `None` for the master.
    pub fn above(&self) -> Option<usize> {
        self.above
    }
    /// Direct children, ascending.
    pub fn below(&self) -> &[usize] {
        &self.below
    }
    /// Every participant in the subtree below, ascending.
    pub fn all_below(&self) -> &[usize] {
        &self.all_below
    }
    /// Every other participant outside that subtree, ascending.
    pub fn all_not_below(&self) -> &[usize] {
        &self.all_not_below
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorTopology {
    ranks: Vec<usize>,
    peers: Vec<Vec<usize>>,
    linear: Vec<CommsStruct>,
    tree: Vec<CommsStruct>,
}

impl ProcessorTopology {
    /// `peers[i]` lists the ranks participant `ranks[i]` exchanges halo data
    /// with. The relation must be symmetric.
    pub fn new(ranks: Vec<usize>, peers: Vec<Vec<usize>>) -> Result<Self> {
        if ranks.is_empty() {
            return Err(LduError::comm("topology without participants"));
        }
        if peers.len() != ranks.len() {
            return Err(LduError::comm(format!(
                "{} participants but {} peer lists",
                ranks.len(),
                peers.len()
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = ranks.iter().find(|r| !seen.insert(**r)) {
            return Err(LduError::comm(format!("rank {dup} listed twice")));
        }

        let mut sorted_peers = Vec::with_capacity(peers.len());
        for (i, list) in peers.into_iter().enumerate() {
            let mut list = list;
            list.sort_unstable();
            list.dedup();
            for &p in &list {
                if p == ranks[i] {
                    return Err(LduError::comm(format!("rank {p} lists itself as a peer")));
                }
                if !seen.contains(&p) {
                    return Err(LduError::comm(format!(
                        "rank {} lists peer {p} which does not participate",
                        ranks[i]
                    )));
                }
            }
            sorted_peers.push(list);
        }
        for (i, list) in sorted_peers.iter().enumerate() {
            for &p in list {
                let Some(j) = ranks.iter().position(|&r| r == p) else {
                    continue;
                };
                if sorted_peers[j].binary_search(&ranks[i]).is_err() {
                    return Err(LduError::comm(format!(
                        "rank {} couples to {p} but not the other way round",
                        ranks[i]
                    )));
                }
            }
        }

        let n = ranks.len();
        let linear = linear_communication(n);
        let tree = tree_communication(n);
        let n_linear = 1 + linear[0].all_below.len();
        let n_tree = 1 + tree[0].all_below.len();
        if n_linear != n || n_tree != n {
            return Err(LduError::comm(format!(
                "linear schedule spans {n_linear} and tree schedule {n_tree} of {n} participants"
            )));
        }
        log::debug!("topology over {n} participants, tree depth {}", tree_depth(&tree));

        Ok(Self { ranks, peers: sorted_peers, linear, tree })
    }

    /// Participants `0..n` with no halo coupling.
    pub fn uncoupled(n: usize) -> Result<Self> {
        Self::new((0..n).collect(), vec![Vec::new(); n])
    }

    pub fn single() -> Self {
        Self {
            ranks: vec![0],
            peers: vec![Vec::new()],
            linear: linear_communication(1),
            tree: tree_communication(1),
        }
    }

    pub fn n_procs(&self) -> usize {
        self.ranks.len()
    }
    pub fn ranks(&self) -> &[usize] {
        &self.ranks
    }
    pub fn rank_of(&self, index: usize) -> usize {
        self.ranks[index]
    }
    pub fn index_of(&self, rank: usize) -> Option<usize> {
        self.ranks.iter().position(|&r| r == rank)
    }
    /// Peer ranks of participant `index`, ascending.
    pub fn peers_of(&self, index: usize) -> &[usize] {
        &self.peers[index]
    }
    pub fn linear_communication(&self) -> &[CommsStruct] {
        &self.linear
    }
    pub fn tree_communication(&self) -> &[CommsStruct] {
        &self.tree
    }

    /// Coupled participant pairs `(i, j)`, `i < j`, as participant indices.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges = Vec::new();
        for (i, list) in self.peers.iter().enumerate() {
            for &p in list {
                if let Some(j) = self.index_of(p) {
                    if i < j {
                        edges.push((i, j));
                    }
                }
            }
        }
        edges.sort_unstable();
        edges
    }
}

fn build(n: usize, above: impl Fn(usize) -> Option<usize>) -> Vec<CommsStruct> {
    let parents: Vec<Option<usize>> = (0..n).map(&above).collect();
    let mut below = vec![Vec::new(); n];
    for (i, p) in parents.iter().enumerate() {
        if let Some(p) = p {
            below[*p].push(i);
        }
    }
    (0..n)
        .map(|i| {
            let mut all_below = Vec::new();
            let mut stack = below[i].clone();
            while let Some(c) = stack.pop() {
                all_below.push(c);
                stack.extend_from_slice(&below[c]);
            }
            all_below.sort_unstable();
            let all_not_below = (0..n)
                .filter(|&j| j != i && all_below.binary_search(&j).is_err())
                .collect();
            CommsStruct {
                above: parents[i],
                below: below[i].clone(),
                all_below,
                all_not_below,
            }
        })
        .collect()
}

fn linear_communication(n: usize) -> Vec<CommsStruct> {
    build(n, |i| if i == 0 { None } else { Some(0) })
}

/// Binomial tree: the parent of `i` is `i` with its lowest set bit cleared.
fn tree_communication(n: usize) -> Vec<CommsStruct> {
    build(n, |i| if i == 0 { None } else { Some(i & (i - 1)) })
}

fn tree_depth(tree: &[CommsStruct]) -> usize {
    (0..tree.len())
        .map(|mut i| {
            let mut d = 0;
            while let Some(p) = tree[i].above {
                i = p;
                d += 1;
            }
            d
        })
        .max()
        .unwrap_or(0)
}
