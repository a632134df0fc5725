use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::sum_tree::SumTree;

/// A sampled firing: the reaction index and the time increment until it
/// happens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub index: usize,
    pub dt: f64,
}

/// Assigns a new propensity to one reaction slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Update {
    pub index: usize,
    pub propensity: f64,
}

/// Samples `(next reaction, dt)` pairs from a propensity vector with the
/// Gillespie direct method: `dt = -ln(u1) / Σp` and the reaction is the
/// smallest index whose cumulative propensity reaches `u2 · Σp`.
pub trait Solver {
    fn new(seed: u64, initial_propensities: Vec<f64>) -> Self
    where
        Self: Sized;

    /// Draws the next event, or `None` once the total propensity is zero.
    fn event(&mut self) -> Option<Event>;

    fn update(&mut self, update: Update);

    fn total_propensity(&self) -> f64;
}

/// Uniform draw on (0, 1], so the logarithm below never sees zero.
fn open_unit(rng: &mut StdRng) -> f64 {
    1.0 - rng.random::<f64>()
}

/// Scans the propensity vector linearly on every draw and keeps a running
/// total. An update at `index == len` grows the vector, so models whose
/// reaction set grows over time can append slots.
pub struct LinearSolver {
    propensities: Vec<f64>,
    total: f64,
    rng: StdRng,
}

impl Solver for LinearSolver {
    fn new(seed: u64, initial_propensities: Vec<f64>) -> Self {
        let total = initial_propensities.iter().sum();
        LinearSolver {
            propensities: initial_propensities,
            total,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn event(&mut self) -> Option<Event> {
        if self.total <= 0.0 {
            return None;
        }
        let dt = -open_unit(&mut self.rng).ln() / self.total;
        let target = open_unit(&mut self.rng) * self.total;

        let mut chosen = self.propensities.len() - 1;
        let mut partial = 0.0;
        for (index, &propensity) in self.propensities.iter().enumerate() {
            partial += propensity;
            if partial >= target {
                chosen = index;
                break;
            }
        }
        // The running total can drift a few ulps above the true sum; if the
        // scan ran off the end, settle on the last reaction that can fire.
        while chosen > 0 && self.propensities[chosen] == 0.0 {
            chosen -= 1;
        }
        Some(Event { index: chosen, dt })
    }

    fn update(&mut self, update: Update) {
        debug_assert!(update.propensity >= 0.0);
        if update.index == self.propensities.len() {
            self.propensities.push(0.0);
        }
        let slot = &mut self.propensities[update.index];
        self.total += update.propensity - *slot;
        *slot = update.propensity;
        if self.total < 0.0 {
            self.total = 0.0;
        }
    }

    fn total_propensity(&self) -> f64 {
        self.total
    }
}

/// Samples through a binary sum tree: O(log R) per update and per draw. The
/// reaction count is fixed at construction, which fits models whose reaction
/// table never grows.
pub struct TreeSolver {
    tree: SumTree,
    rng: StdRng,
}

impl Solver for TreeSolver {
    fn new(seed: u64, initial_propensities: Vec<f64>) -> Self {
        TreeSolver {
            tree: SumTree::new(initial_propensities),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn event(&mut self) -> Option<Event> {
        let total = self.tree.total();
        if total <= 0.0 {
            return None;
        }
        let dt = -open_unit(&mut self.rng).ln() / total;
        let target = open_unit(&mut self.rng) * total;
        Some(Event {
            index: self.tree.search(target),
            dt,
        })
    }

    fn update(&mut self, update: Update) {
        debug_assert!(update.propensity >= 0.0);
        self.tree.update(update.index, update.propensity);
    }

    fn total_propensity(&self) -> f64 {
        self.tree.total()
    }
}
