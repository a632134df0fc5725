use rayon::prelude::*;
use serde::Serialize;

use crate::model::{HistoryElement, Model};
use crate::simulation::Simulation;
use crate::solver::Solver;

/// One finished trajectory, tagged with the seed that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPacket<E> {
    pub seed: u64,
    pub history: Vec<HistoryElement<E>>,
}

/// Seeding and cutoffs for a batch of independent trajectories. Trajectory
/// `i` runs with seed `base_seed + i`, so a batch is reproducible from its
/// settings alone.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub number_of_trajectories: usize,
    pub base_seed: u64,
    pub step_cutoff: usize,
    pub time_cutoff: f64,
}

/// Runs the whole batch on the rayon pool. Each worker owns its simulation;
/// the model is shared immutably across workers.
pub fn run_trajectories<M, S>(model: &M, settings: RunSettings) -> Vec<HistoryPacket<M::EventId>>
where
    M: Model + Sync,
    M::EventId: Send,
    S: Solver,
{
    (0..settings.number_of_trajectories)
        .into_par_iter()
        .map(|index| {
            let seed = settings.base_seed.wrapping_add(index as u64);
            let mut simulation =
                Simulation::<M, S>::new(model, seed, settings.step_cutoff, settings.time_cutoff);
            simulation.execute_steps(settings.step_cutoff);
            HistoryPacket {
                seed,
                history: simulation.into_history(),
            }
        })
        .collect()
}
