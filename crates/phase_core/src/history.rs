//! Recently seeded trajectories, oldest evicted first.

use crate::solvers::Trajectory;
use serde::Serialize;
use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 5;

/// Display colors, assigned round-robin.
pub const PALETTE: [&str; 5] = ["#e4572e", "#17bebb", "#ffc914", "#76b041", "#6a4c93"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryEntry {
    pub id: u64,
    pub color: &'static str,
    pub trajectory: Trajectory,
}

#[derive(Debug, Clone)]
pub struct TrajectoryHistory {
    capacity: usize,
    entries: VecDeque<TrajectoryEntry>,
    next_id: u64,
}

impl Default for TrajectoryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl TrajectoryHistory {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
            next_id: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a trajectory, evicting the oldest once full.
    pub fn push(&mut self, trajectory: Trajectory) -> &TrajectoryEntry {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_back(TrajectoryEntry {
            id,
            color: PALETTE[(id % PALETTE.len() as u64) as usize],
            trajectory,
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrajectoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
