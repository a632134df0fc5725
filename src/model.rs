use serde::Serialize;

use crate::solver::Update;

/// One recorded firing: the model-specific event identifier and the
/// simulation clock after the event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryElement<E> {
    pub event: E,
    pub time: f64,
}

/// A reaction model the simulation driver can evolve. The model itself is
/// shared immutably across trajectories; everything a single trajectory
/// mutates lives in `State`. Propensity changes flow back to the solver
/// through the `emit` callback, so models never hold a solver reference.
pub trait Model {
    type State: Clone;
    type EventId: Copy + std::fmt::Debug + Serialize;

    fn initial_state(&self) -> Self::State;

    fn initial_propensities(&self, state: &Self::State) -> Vec<f64>;

    /// The identifier recorded in the history for firing `reaction_index`.
    /// Called before `apply_event`, while `reaction_index` still names the
    /// reaction that fired.
    fn event_id(&self, state: &Self::State, reaction_index: usize) -> Self::EventId;

    /// Applies reaction `reaction_index` to `state` and emits every
    /// propensity update the firing causes.
    fn apply_event(
        &self,
        state: &mut Self::State,
        reaction_index: usize,
        emit: &mut dyn FnMut(Update),
    );
}
