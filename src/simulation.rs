use crate::model::{HistoryElement, Model};
use crate::solver::Solver;

/// One trajectory: its own state, solver, clock, and bounded history over a
/// shared model. Trajectories are independent, so any number of simulations
/// can run concurrently against the same model.
pub struct Simulation<'m, M: Model, S: Solver> {
    model: &'m M,
    pub seed: u64,
    pub state: M::State,
    pub time: f64,
    pub step: usize,
    time_cutoff: f64,
    solver: S,
    pub history: Vec<HistoryElement<M::EventId>>,
}

impl<'m, M: Model, S: Solver> Simulation<'m, M, S> {
    pub fn new(model: &'m M, seed: u64, step_cutoff: usize, time_cutoff: f64) -> Self {
        let state = model.initial_state();
        let solver = S::new(seed, model.initial_propensities(&state));
        Simulation {
            model,
            seed,
            state,
            time: 0.0,
            step: 0,
            time_cutoff,
            solver,
            history: Vec::with_capacity(step_cutoff + 1),
        }
    }

    /// Executes one event: sample, advance the clock, record, apply the
    /// state update, and feed the resulting propensity updates back into the
    /// solver. Returns false once the trajectory is finished, either because
    /// no event is possible or because the clock reached the time cutoff.
    pub fn execute_step(&mut self) -> bool {
        let Some(event) = self.solver.event() else {
            return false;
        };

        self.time += event.dt;
        self.history.push(HistoryElement {
            event: self.model.event_id(&self.state, event.index),
            time: self.time,
        });
        self.step += 1;

        let model = self.model;
        let solver = &mut self.solver;
        model.apply_event(&mut self.state, event.index, &mut |update| {
            solver.update(update)
        });

        self.time < self.time_cutoff
    }

    /// Runs until the step cutoff, the time cutoff, or a zero total
    /// propensity, whichever comes first. At most `step_cutoff` events are
    /// recorded.
    pub fn execute_steps(&mut self, step_cutoff: usize) {
        while self.step < step_cutoff {
            if !self.execute_step() {
                break;
            }
        }
    }

    pub fn into_history(self) -> Vec<HistoryElement<M::EventId>> {
        self.history
    }
}
