//! Pre-computed order of halo partners.
//!
//! The coupled process pairs are coloured greedily into steps so that in
//! any one step a process exchanges with at most one peer. Walking the
//! steps in order keeps every pair of processes busy with each other at the
//! same time instead of queueing up behind a third one.

use crate::error::{LduError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommSchedule {
    steps: Vec<Vec<(usize, usize)>>,
    per_proc: Vec<Vec<usize>>,
}

impl CommSchedule {
    /// `edges` are pairs of participant indices below `n_procs`.
    pub fn new(n_procs: usize, edges: &[(usize, usize)]) -> Result<Self> {
        let mut edges: Vec<(usize, usize)> = edges
            .iter()
            .map(|&(a, b)| if a < b { (a, b) } else { (b, a) })
            .collect();
        edges.sort_unstable();
        edges.dedup();

        // busy[s] marks the processes already talking in step s
        let mut busy: Vec<Vec<bool>> = Vec::new();
        let mut steps: Vec<Vec<(usize, usize)>> = Vec::new();
        for &(a, b) in &edges {
            if b >= n_procs || a == b {
                return Err(LduError::comm(format!(
                    "edge ({a}, {b}) is not a pair of distinct processes below {n_procs}"
                )));
            }
            let step = match busy.iter().position(|s| !s[a] && !s[b]) {
                Some(step) => step,
                None => {
                    busy.push(vec![false; n_procs]);
                    steps.push(Vec::new());
                    busy.len() - 1
                }
            };
            busy[step][a] = true;
            busy[step][b] = true;
            steps[step].push((a, b));
        }

        let mut per_proc = vec![Vec::new(); n_procs];
        for step in &steps {
            for &(a, b) in step {
                per_proc[a].push(b);
                per_proc[b].push(a);
            }
        }
        log::debug!(
            "communication schedule: {} edges in {} steps",
            edges.len(),
            steps.len()
        );
        Ok(Self { steps, per_proc })
    }

    /// Schedule for processes that exchange nothing.
    pub fn empty(n_procs: usize) -> Self {
        Self { steps: Vec::new(), per_proc: vec![Vec::new(); n_procs] }
    }

    pub fn n_steps(&self) -> usize {
        self.steps.len()
    }

    /// Pairs active in each step.
    pub fn steps(&self) -> &[Vec<(usize, usize)>] {
        &self.steps
    }

    /// Peers of process `index` in the order it should talk to them.
    pub fn proc_schedule(&self, index: usize) -> &[usize] {
        &self.per_proc[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid(schedule: &CommSchedule, n: usize, n_edges: usize) {
        let mut seen = 0;
        for step in schedule.steps() {
            let mut talking = vec![false; n];
            for &(a, b) in step {
                assert!(!talking[a] && !talking[b], "process talks twice in one step");
                talking[a] = true;
                talking[b] = true;
                seen += 1;
            }
        }
        assert_eq!(seen, n_edges);
    }

    #[test]
    fn ring_of_four_needs_two_steps() {
        let edges = [(0, 1), (1, 2), (2, 3), (3, 0)];
        let s = CommSchedule::new(4, &edges).unwrap();
        assert_valid(&s, 4, 4);
        assert_eq!(s.n_steps(), 2);
        assert_eq!(s.proc_schedule(0), &[1, 3]);
    }

    #[test]
    fn star_serialises_on_the_hub() {
        let edges = [(0, 1), (0, 2), (0, 3)];
        let s = CommSchedule::new(4, &edges).unwrap();
        assert_valid(&s, 4, 3);
        assert_eq!(s.n_steps(), 3);
        assert_eq!(s.proc_schedule(2), &[0]);
    }

    #[test]
    fn no_edges_no_steps() {
        let s = CommSchedule::new(3, &[]).unwrap();
        assert_eq!(s.n_steps(), 0);
        assert!(s.proc_schedule(1).is_empty());
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(CommSchedule::new(2, &[(0, 2)]).is_err());
        assert!(CommSchedule::new(2, &[(1, 1)]).is_err());
    }
}
