use std::collections::VecDeque;

use super::tick::Tick;

pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

/// Bounded, insertion-ordered buffer of recent ticks. Oldest entries are
/// evicted first once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct TickWindow {
    capacity: usize,
    ticks: VecDeque<Tick>,
}

impl Default for TickWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

impl TickWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            ticks: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, tick: Tick) {
        while self.ticks.len() >= self.capacity {
            self.ticks.pop_front();
        }
        self.ticks.push_back(tick);
    }

    pub fn clear(&mut self) {
        self.ticks.clear();
    }

    /// Owned copy in arrival order; later pushes are not visible through it.
    pub fn snapshot(&self) -> Vec<Tick> {
        self.ticks.iter().copied().collect()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.ticks.iter().map(|t| t.price).collect()
    }

    pub fn latest(&self) -> Option<&Tick> {
        self.ticks.back()
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
