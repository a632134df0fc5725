use std::collections::BTreeSet;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::model::{HistoryElement, Model};
use crate::solver::Update;
use crate::tables::{NpmcTables, NpmcTrajectoryRow};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Site {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub species_id: i32,
}

fn site_distance(a: &Site, b: &Site) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dz = a.z - b.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// A one- or two-site interaction template. For one-site interactions the
/// second species/state slots hold `-1`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Interaction {
    pub interaction_id: i32,
    pub number_of_sites: u8,
    pub species_id: [i32; 2],
    pub left_state: [i32; 2],
    pub right_state: [i32; 2],
    pub rate: f64,
}

/// An interaction bound to concrete sites; `site_id[1]` is `-1` for one-site
/// reactions. The rate folds in the interaction factor and, for two-site
/// reactions, the distance factor, so it is the propensity the solver
/// stores.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SiteReaction {
    pub site_id: [i32; 2],
    pub interaction: Interaction,
    pub rate: f64,
}

/// The identifier a trajectory history records for one firing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NanoEvent {
    pub site_ids: [i32; 2],
    pub interaction_id: i32,
}

/// Spatial decay applied to two-site interaction rates, chosen once at load
/// time from a closed set so the hot loop stays a two-way branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceFactor {
    Linear { radius: f64 },
    InverseCubic,
}

impl DistanceFactor {
    pub fn evaluate(&self, distance: f64) -> f64 {
        match *self {
            DistanceFactor::Linear { radius } => 1.0 - distance / radius,
            DistanceFactor::InverseCubic => 1.0 / distance.powi(6),
        }
    }
}

/// Dense lookup from (species, state) to the interactions a site in that
/// configuration can start. Two-site lists are keyed by the donor first.
struct InteractionIndex {
    num_species: usize,
    num_states: usize,
    one_site: Vec<Vec<Interaction>>,
    two_site: Vec<Vec<Interaction>>,
}

impl InteractionIndex {
    fn new(num_species: usize, num_states: usize) -> Self {
        InteractionIndex {
            num_species,
            num_states,
            one_site: vec![Vec::new(); num_species * num_states],
            two_site: vec![Vec::new(); num_species * num_species * num_states * num_states],
        }
    }

    fn one_site_key(&self, species: i32, state: i32) -> usize {
        species as usize * self.num_states + state as usize
    }

    fn two_site_key(&self, species: [i32; 2], states: [i32; 2]) -> usize {
        ((species[0] as usize * self.num_species + species[1] as usize) * self.num_states
            + states[0] as usize)
            * self.num_states
            + states[1] as usize
    }

    fn insert(&mut self, interaction: Interaction) {
        if interaction.number_of_sites == 1 {
            let key = self.one_site_key(interaction.species_id[0], interaction.left_state[0]);
            self.one_site[key].push(interaction);
        } else {
            let key = self.two_site_key(interaction.species_id, interaction.left_state);
            self.two_site[key].push(interaction);
        }
    }

    fn matching_one_site(&self, species: i32, state: i32) -> &[Interaction] {
        &self.one_site[self.one_site_key(species, state)]
    }

    fn matching_two_site(&self, species: [i32; 2], states: [i32; 2]) -> &[Interaction] {
        &self.two_site[self.two_site_key(species, states)]
    }
}

/// Everything one trajectory mutates: per-site levels, the dense vector of
/// live reactions, and the per-site index of reaction ids touching each
/// site. Reaction ids are positions in `reactions`; the site index and the
/// reaction vector stay bijectively consistent through every edit.
#[derive(Clone)]
pub struct NanoState {
    pub levels: Vec<i32>,
    pub reactions: Vec<SiteReaction>,
    pub site_index: Vec<BTreeSet<usize>>,
}

/// Nano-particle model: sites with fixed 3-D positions and species, per-site
/// discrete levels, and one/two-site interactions gated by a distance
/// cutoff. Static data (sites, interactions, distances) is shared across
/// trajectories; the live reaction set lives in `NanoState`.
pub struct NanoParticle {
    pub sites: Vec<Site>,
    pub degrees_of_freedom: Vec<i32>,
    pub one_site_interaction_factor: f64,
    pub two_site_interaction_factor: f64,
    pub interaction_radius_bound: f64,
    pub distance_factor: DistanceFactor,
    interactions: InteractionIndex,
    distance_matrix: Array2<f64>,
    initial_levels: Vec<i32>,
    initial_reactions: Vec<SiteReaction>,
    initial_site_index: Vec<BTreeSet<usize>>,
}

impl NanoParticle {
    pub fn from_tables(tables: &NpmcTables) -> Result<Self, ModelError> {
        let number_of_species = tables.metadata.number_of_species;
        let number_of_sites = tables.metadata.number_of_sites;

        let distance_factor = match tables.factors.distance_factor_type.as_str() {
            "linear" => DistanceFactor::Linear {
                radius: tables.factors.interaction_radius_bound,
            },
            "inverse_cubic" => DistanceFactor::InverseCubic,
            other => return Err(ModelError::UnknownDistanceFactor(other.to_string())),
        };

        let mut degrees_of_freedom = vec![0; number_of_species];
        for row in tables.species.iter() {
            check_index("species", "species_id", row.species_id, number_of_species)?;
            degrees_of_freedom[row.species_id as usize] = row.degrees_of_freedom;
        }

        let placeholder = Site {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            species_id: 0,
        };
        let mut sites = vec![placeholder; number_of_sites];
        for row in tables.sites.iter() {
            check_index("sites", "site_id", row.site_id, number_of_sites)?;
            check_index("sites", "species_id", row.species_id, number_of_species)?;
            sites[row.site_id as usize] = Site {
                x: row.x,
                y: row.y,
                z: row.z,
                species_id: row.species_id,
            };
        }

        // The state axis must cover every species' degrees of freedom and
        // every state an interaction names.
        let mut num_states = degrees_of_freedom.iter().copied().max().unwrap_or(0);
        for row in tables.interactions.iter() {
            num_states = num_states
                .max(row.left_state_1 + 1)
                .max(row.right_state_1 + 1);
            if row.number_of_sites == 2 {
                num_states = num_states
                    .max(row.left_state_2 + 1)
                    .max(row.right_state_2 + 1);
            }
        }

        let mut interactions = InteractionIndex::new(number_of_species, num_states as usize);
        for row in tables.interactions.iter() {
            check_index(
                "interactions",
                "species_id_1",
                row.species_id_1,
                number_of_species,
            )?;
            if row.number_of_sites == 2 {
                check_index(
                    "interactions",
                    "species_id_2",
                    row.species_id_2,
                    number_of_species,
                )?;
            }
            interactions.insert(Interaction {
                interaction_id: row.interaction_id,
                number_of_sites: row.number_of_sites,
                species_id: [row.species_id_1, row.species_id_2],
                left_state: [row.left_state_1, row.left_state_2],
                right_state: [row.right_state_1, row.right_state_2],
                rate: row.rate,
            });
        }

        let mut distance_matrix = Array2::zeros((number_of_sites, number_of_sites));
        for i in 0..number_of_sites {
            for j in 0..number_of_sites {
                distance_matrix[[i, j]] = site_distance(&sites[i], &sites[j]);
            }
        }

        let mut initial_levels = vec![0; number_of_sites];
        for row in tables.initial_state.iter() {
            check_index("initial_state", "site_id", row.site_id, number_of_sites)?;
            initial_levels[row.site_id as usize] = row.degree_of_freedom;
        }

        let mut particle = NanoParticle {
            sites,
            degrees_of_freedom,
            one_site_interaction_factor: tables.factors.one_site_interaction_factor,
            two_site_interaction_factor: tables.factors.two_site_interaction_factor,
            interaction_radius_bound: tables.factors.interaction_radius_bound,
            distance_factor,
            interactions,
            distance_matrix,
            initial_levels,
            initial_reactions: Vec::new(),
            initial_site_index: Vec::new(),
        };
        particle.build_initial_reactions();
        Ok(particle)
    }

    /// Enumerates every reaction the initial levels admit. Each ordered pair
    /// of in-range sites is visited once and contributes only its donor-first
    /// reactions, so both directions of a pair end up in the set exactly
    /// once.
    fn build_initial_reactions(&mut self) {
        let mut reactions = Vec::new();
        let mut site_index = vec![BTreeSet::new(); self.sites.len()];

        for site_a in 0..self.sites.len() {
            let level_a = self.initial_levels[site_a];
            let species_a = self.sites[site_a].species_id;

            for &interaction in self.interactions.matching_one_site(species_a, level_a) {
                let id = reactions.len();
                reactions.push(SiteReaction {
                    site_id: [site_a as i32, -1],
                    interaction,
                    rate: interaction.rate * self.one_site_interaction_factor,
                });
                site_index[site_a].insert(id);
            }

            for site_b in 0..self.sites.len() {
                if site_b == site_a {
                    continue;
                }
                let distance = self.distance_matrix[[site_a, site_b]];
                if distance >= self.interaction_radius_bound {
                    continue;
                }
                let level_b = self.initial_levels[site_b];
                let species_b = self.sites[site_b].species_id;
                for &interaction in self
                    .interactions
                    .matching_two_site([species_a, species_b], [level_a, level_b])
                {
                    let id = reactions.len();
                    reactions.push(SiteReaction {
                        site_id: [site_a as i32, site_b as i32],
                        interaction,
                        rate: self.distance_factor.evaluate(distance)
                            * interaction.rate
                            * self.two_site_interaction_factor,
                    });
                    site_index[site_a].insert(id);
                    site_index[site_b].insert(id);
                }
            }
        }

        self.initial_reactions = reactions;
        self.initial_site_index = site_index;
    }

    /// Moves every participating site from its left to its right state. A
    /// mismatch means the live reaction set disagrees with the levels, which
    /// is a broken invariant, not a recoverable condition.
    pub fn update_state(&self, levels: &mut [i32], fired: &SiteReaction) {
        let interaction = fired.interaction;
        for k in 0..interaction.number_of_sites as usize {
            let site = fired.site_id[k] as usize;
            if levels[site] != interaction.left_state[k] {
                panic!(
                    "state mismatch for site {}: expected {}, found {}",
                    site, interaction.left_state[k], levels[site]
                );
            }
            levels[site] = interaction.right_state[k];
        }
    }

    /// Re-enumerates the reactions the fired sites participate in now that
    /// they hold their right states. `levels` must already be updated. When
    /// both endpoints of a two-site firing mutated, the pair between them is
    /// visited from both ends; the donor-`other` direction is skipped on the
    /// first visit so it is produced exactly once.
    fn replacement_reactions(&self, levels: &[i32], fired: &SiteReaction) -> Vec<SiteReaction> {
        let mut new_reactions = Vec::new();
        for k in 0..fired.interaction.number_of_sites as usize {
            let site_a = fired.site_id[k] as usize;
            let other = fired.site_id[1 - k];
            let level_a = fired.interaction.right_state[k];
            let species_a = self.sites[site_a].species_id;

            for &interaction in self.interactions.matching_one_site(species_a, level_a) {
                new_reactions.push(SiteReaction {
                    site_id: [site_a as i32, -1],
                    interaction,
                    rate: interaction.rate * self.one_site_interaction_factor,
                });
            }

            for site_b in 0..self.sites.len() {
                if site_b == site_a {
                    continue;
                }
                let distance = self.distance_matrix[[site_a, site_b]];
                if distance >= self.interaction_radius_bound {
                    continue;
                }
                let level_b = levels[site_b];
                let species_b = self.sites[site_b].species_id;
                let decay = self.distance_factor.evaluate(distance);

                for &interaction in self
                    .interactions
                    .matching_two_site([species_a, species_b], [level_a, level_b])
                {
                    new_reactions.push(SiteReaction {
                        site_id: [site_a as i32, site_b as i32],
                        interaction,
                        rate: decay * interaction.rate * self.two_site_interaction_factor,
                    });
                }

                if site_b as i32 != other {
                    for &interaction in self
                        .interactions
                        .matching_two_site([species_b, species_a], [level_b, level_a])
                    {
                        new_reactions.push(SiteReaction {
                            site_id: [site_b as i32, site_a as i32],
                            interaction,
                            rate: decay * interaction.rate * self.two_site_interaction_factor,
                        });
                    }
                }
            }
        }
        new_reactions
    }

    /// Rewrites the live reaction set after `fired` has been applied to
    /// `levels`: every reaction touching a mutated site is invalidated, the
    /// replacement reactions are spliced into the vacated slots (overflow
    /// appends at the tail), and leftover holes are filled by swapping live
    /// reactions down from the end before truncating. Each edit is mirrored
    /// into the site index and emitted to the solver.
    pub fn update_reactions(
        &self,
        levels: &[i32],
        fired: &SiteReaction,
        reactions: &mut Vec<SiteReaction>,
        site_index: &mut [BTreeSet<usize>],
        emit: &mut dyn FnMut(Update),
    ) {
        let new_reactions = self.replacement_reactions(levels, fired);

        let mut vacated: BTreeSet<usize> = BTreeSet::new();
        for k in 0..fired.interaction.number_of_sites as usize {
            let site = fired.site_id[k] as usize;
            let touching: Vec<usize> = site_index[site].iter().copied().collect();
            for id in touching {
                if !vacated.insert(id) {
                    continue;
                }
                emit(Update {
                    index: id,
                    propensity: 0.0,
                });
                let stale = reactions[id];
                site_index[stale.site_id[0] as usize].remove(&id);
                if stale.interaction.number_of_sites == 2 {
                    site_index[stale.site_id[1] as usize].remove(&id);
                }
            }
        }

        let slots = vacated.len();
        for (i, new_reaction) in new_reactions.into_iter().enumerate() {
            let id = if i < slots {
                let id = vacated.pop_first().unwrap();
                reactions[id] = new_reaction;
                id
            } else {
                reactions.push(new_reaction);
                reactions.len() - 1
            };
            for k in 0..new_reaction.interaction.number_of_sites as usize {
                site_index[new_reaction.site_id[k] as usize].insert(id);
            }
            emit(Update {
                index: id,
                propensity: new_reaction.rate,
            });
        }

        // Compact the tail: fill each remaining hole, lowest first, with the
        // highest live reaction, then drop the dead suffix in one cut.
        if !vacated.is_empty() {
            let tombstones: Vec<usize> = vacated.iter().copied().collect();
            let dead = tombstones.len();
            let mut filled = 0;
            let mut tail = reactions.len();
            while filled < dead && tail > 0 {
                let candidate = tail - 1;
                if vacated.contains(&candidate) {
                    tail -= 1;
                    continue;
                }
                let slot = tombstones[filled];
                if candidate < slot {
                    break;
                }
                let moved = reactions[candidate];
                reactions[slot] = moved;
                for k in 0..moved.interaction.number_of_sites as usize {
                    let site = moved.site_id[k] as usize;
                    if !site_index[site].remove(&candidate) {
                        panic!(
                            "reaction {} missing from the site index of site {}",
                            candidate, site
                        );
                    }
                    site_index[site].insert(slot);
                }
                emit(Update {
                    index: slot,
                    propensity: moved.rate,
                });
                emit(Update {
                    index: candidate,
                    propensity: 0.0,
                });
                filled += 1;
                tail -= 1;
            }
            reactions.truncate(reactions.len() - dead);
        }
    }

    pub fn trajectory_row(
        &self,
        seed: u64,
        step: usize,
        element: &HistoryElement<NanoEvent>,
    ) -> NpmcTrajectoryRow {
        NpmcTrajectoryRow {
            seed,
            step,
            time: element.time,
            site_id_1: element.event.site_ids[0],
            site_id_2: element.event.site_ids[1],
            interaction_id: element.event.interaction_id,
        }
    }
}

fn check_index(
    table: &'static str,
    field: &'static str,
    value: i32,
    bound: usize,
) -> Result<(), ModelError> {
    if value < 0 || value as usize >= bound {
        return Err(ModelError::IndexOutOfRange {
            table,
            field,
            value: value as i64,
            bound,
        });
    }
    Ok(())
}

impl Model for NanoParticle {
    type State = NanoState;
    type EventId = NanoEvent;

    fn initial_state(&self) -> NanoState {
        NanoState {
            levels: self.initial_levels.clone(),
            reactions: self.initial_reactions.clone(),
            site_index: self.initial_site_index.clone(),
        }
    }

    fn initial_propensities(&self, state: &NanoState) -> Vec<f64> {
        state.reactions.iter().map(|reaction| reaction.rate).collect()
    }

    fn event_id(&self, state: &NanoState, reaction_index: usize) -> NanoEvent {
        let reaction = &state.reactions[reaction_index];
        NanoEvent {
            site_ids: reaction.site_id,
            interaction_id: reaction.interaction.interaction_id,
        }
    }

    fn apply_event(
        &self,
        state: &mut NanoState,
        reaction_index: usize,
        emit: &mut dyn FnMut(Update),
    ) {
        let fired = state.reactions[reaction_index];
        self.update_state(&mut state.levels, &fired);
        self.update_reactions(
            &state.levels,
            &fired,
            &mut state.reactions,
            &mut state.site_index,
            emit,
        );
    }
}
