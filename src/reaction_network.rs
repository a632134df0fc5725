use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::model::{HistoryElement, Model};
use crate::solver::Update;
use crate::tables::{GmcTables, GmcTrajectoryRow};

/// A mass-action reaction with up to two reactants and two products. Unused
/// slots hold the sentinel `-1` and are never dereferenced; the slot counts
/// guard every access.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Reaction {
    pub number_of_reactants: u8,
    pub number_of_products: u8,
    pub reactants: [i32; 2],
    pub products: [i32; 2],
    pub rate: f64,
}

/// Reactions whose propensity can change when the owning reaction fires.
/// `dependents` stays `None` until the reaction has fired often enough to be
/// worth the O(R) discovery scan; once computed it is never rewritten.
#[derive(Default)]
struct DependentsNode {
    state: Mutex<NodeState>,
}

#[derive(Default)]
struct NodeState {
    dependents: Option<Arc<Vec<usize>>>,
    occurrences: u32,
}

/// Model-specific knobs handed over by the caller per run.
#[derive(Debug, Clone, Copy)]
pub struct ReactionNetworkParameters {
    /// Number of firings before a reaction's dependency node is computed.
    pub dependency_threshold: u32,
}

/// Gillespie mass-action model: the state is a species-count vector and each
/// firing decrements its reactants and increments its products. The reaction
/// table and factors are immutable after loading; the dependency graph is
/// the only shared structure that fills in over time, one mutex per node.
pub struct ReactionNetwork {
    pub reactions: Vec<Reaction>,
    pub initial_state: Vec<i32>,
    pub factor_zero: f64,
    pub factor_two: f64,
    pub factor_duplicate: f64,
    dependency_threshold: u32,
    dependency_graph: Vec<DependentsNode>,
}

impl ReactionNetwork {
    pub fn from_tables(
        tables: &GmcTables,
        parameters: ReactionNetworkParameters,
    ) -> Result<Self, ModelError> {
        let number_of_species = tables.metadata.number_of_species;
        let number_of_reactions = tables.metadata.number_of_reactions;

        if tables.reactions.len() != number_of_reactions {
            return Err(ModelError::ReactionCountMismatch {
                declared: number_of_reactions,
                found: tables.reactions.len(),
            });
        }

        let empty = Reaction {
            number_of_reactants: 0,
            number_of_products: 0,
            reactants: [-1, -1],
            products: [-1, -1],
            rate: 0.0,
        };
        let mut reactions = vec![empty; number_of_reactions];
        for row in tables.reactions.iter() {
            if row.reaction_id >= number_of_reactions {
                return Err(ModelError::IndexOutOfRange {
                    table: "reactions",
                    field: "reaction_id",
                    value: row.reaction_id as i64,
                    bound: number_of_reactions,
                });
            }
            let reaction = Reaction {
                number_of_reactants: row.number_of_reactants,
                number_of_products: row.number_of_products,
                reactants: [row.reactant_1, row.reactant_2],
                products: [row.product_1, row.product_2],
                rate: row.rate,
            };
            for m in 0..reaction.number_of_reactants as usize {
                check_species("reactions", "reactant", reaction.reactants[m], number_of_species)?;
            }
            for m in 0..reaction.number_of_products as usize {
                check_species("reactions", "product", reaction.products[m], number_of_species)?;
            }
            reactions[row.reaction_id] = reaction;
        }

        let mut initial_state = vec![0; number_of_species];
        for row in tables.initial_state.iter() {
            check_species("initial_state", "species_id", row.species_id, number_of_species)?;
            initial_state[row.species_id as usize] = row.count;
        }

        let mut dependency_graph = Vec::new();
        dependency_graph.resize_with(number_of_reactions, DependentsNode::default);

        Ok(ReactionNetwork {
            reactions,
            initial_state,
            factor_zero: tables.factors.factor_zero,
            factor_two: tables.factors.factor_two,
            factor_duplicate: tables.factors.factor_duplicate,
            dependency_threshold: parameters.dependency_threshold,
            dependency_graph,
        })
    }

    pub fn compute_propensity(&self, state: &[i32], reaction_index: usize) -> f64 {
        let reaction = &self.reactions[reaction_index];
        match reaction.number_of_reactants {
            0 => self.factor_zero * reaction.rate,
            1 => state[reaction.reactants[0] as usize] as f64 * reaction.rate,
            _ => {
                let a = reaction.reactants[0] as usize;
                let b = reaction.reactants[1] as usize;
                if a == b {
                    self.factor_duplicate
                        * self.factor_two
                        * state[a] as f64
                        * (state[a] - 1) as f64
                        * reaction.rate
                } else {
                    self.factor_two * state[a] as f64 * state[b] as f64 * reaction.rate
                }
            }
        }
    }

    pub fn update_state(&self, state: &mut [i32], reaction_index: usize) {
        let reaction = &self.reactions[reaction_index];
        for m in 0..reaction.number_of_reactants as usize {
            state[reaction.reactants[m] as usize] -= 1;
        }
        for m in 0..reaction.number_of_products as usize {
            state[reaction.products[m] as usize] += 1;
        }
    }

    /// Returns the dependency set of `reaction_index`, computing it under
    /// the node's mutex once the reaction has fired `dependency_threshold`
    /// times. Early firings return `None`, which tells the caller to refresh
    /// every propensity instead.
    fn get_dependents(&self, reaction_index: usize) -> Option<Arc<Vec<usize>>> {
        let mut node = self.dependency_graph[reaction_index].state.lock().unwrap();
        node.occurrences += 1;
        if node.dependents.is_none() && node.occurrences >= self.dependency_threshold {
            node.dependents = Some(Arc::new(self.compute_dependents(reaction_index)));
        }
        node.dependents.clone()
    }

    /// A reaction depends on `reaction_index` when one of its reactants is a
    /// reactant or product of `reaction_index`.
    fn compute_dependents(&self, reaction_index: usize) -> Vec<usize> {
        let fired = &self.reactions[reaction_index];
        let mut dependents = Vec::new();
        for (index, candidate) in self.reactions.iter().enumerate() {
            let mut depends = false;
            for l in 0..candidate.number_of_reactants as usize {
                let species = candidate.reactants[l];
                for m in 0..fired.number_of_reactants as usize {
                    if species == fired.reactants[m] {
                        depends = true;
                    }
                }
                for n in 0..fired.number_of_products as usize {
                    if species == fired.products[n] {
                        depends = true;
                    }
                }
            }
            if depends {
                dependents.push(index);
            }
        }
        dependents
    }

    pub fn update_propensities(
        &self,
        state: &[i32],
        fired: usize,
        emit: &mut dyn FnMut(Update),
    ) {
        match self.get_dependents(fired) {
            Some(dependents) => {
                for &index in dependents.iter() {
                    emit(Update {
                        index,
                        propensity: self.compute_propensity(state, index),
                    });
                }
            }
            None => {
                for index in 0..self.reactions.len() {
                    emit(Update {
                        index,
                        propensity: self.compute_propensity(state, index),
                    });
                }
            }
        }
    }

    /// True once the dependency node for `reaction_index` has been filled
    /// in.
    pub fn dependents_computed(&self, reaction_index: usize) -> bool {
        self.dependency_graph[reaction_index]
            .state
            .lock()
            .unwrap()
            .dependents
            .is_some()
    }

    pub fn trajectory_row(
        &self,
        seed: u64,
        step: usize,
        element: &HistoryElement<usize>,
    ) -> GmcTrajectoryRow {
        GmcTrajectoryRow {
            seed,
            step,
            reaction_id: element.event,
            time: element.time,
        }
    }
}

fn check_species(
    table: &'static str,
    field: &'static str,
    species: i32,
    number_of_species: usize,
) -> Result<(), ModelError> {
    if species < 0 || species as usize >= number_of_species {
        return Err(ModelError::IndexOutOfRange {
            table,
            field,
            value: species as i64,
            bound: number_of_species,
        });
    }
    Ok(())
}

impl Model for ReactionNetwork {
    type State = Vec<i32>;
    type EventId = usize;

    fn initial_state(&self) -> Vec<i32> {
        self.initial_state.clone()
    }

    fn initial_propensities(&self, state: &Vec<i32>) -> Vec<f64> {
        (0..self.reactions.len())
            .map(|index| self.compute_propensity(state, index))
            .collect()
    }

    fn event_id(&self, _state: &Vec<i32>, reaction_index: usize) -> usize {
        reaction_index
    }

    fn apply_event(
        &self,
        state: &mut Vec<i32>,
        reaction_index: usize,
        emit: &mut dyn FnMut(Update),
    ) {
        self.update_state(state, reaction_index);
        self.update_propensities(state, reaction_index, emit);
    }
}
