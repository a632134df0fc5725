//! Row types mirroring the relational tables the models load from, plus the
//! trajectory rows they write back. Any I/O layer that can produce these
//! structs (a SQL reader, a JSON file, a test fixture built inline) can feed
//! the models.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GmcMetadataRow {
    pub number_of_species: usize,
    pub number_of_reactions: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GmcFactorsRow {
    pub factor_zero: f64,
    pub factor_two: f64,
    pub factor_duplicate: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GmcInitialStateRow {
    pub species_id: i32,
    pub count: i32,
}

/// One mass-action reaction row. Unused reactant/product slots hold `-1`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReactionRow {
    pub reaction_id: usize,
    pub number_of_reactants: u8,
    pub number_of_products: u8,
    pub reactant_1: i32,
    pub reactant_2: i32,
    pub product_1: i32,
    pub product_2: i32,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmcTables {
    pub metadata: GmcMetadataRow,
    pub factors: GmcFactorsRow,
    pub reactions: Vec<ReactionRow>,
    pub initial_state: Vec<GmcInitialStateRow>,
}

impl GmcTables {
    pub fn from_json_reader(reader: impl Read) -> Result<Self, ModelError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NpmcMetadataRow {
    pub number_of_species: usize,
    pub number_of_sites: usize,
    pub number_of_interactions: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpeciesRow {
    pub species_id: i32,
    pub degrees_of_freedom: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SiteRow {
    pub site_id: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub species_id: i32,
}

/// One interaction row. For one-site interactions the second species/state
/// slots hold `-1`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InteractionRow {
    pub interaction_id: i32,
    pub number_of_sites: u8,
    pub species_id_1: i32,
    pub species_id_2: i32,
    pub left_state_1: i32,
    pub left_state_2: i32,
    pub right_state_1: i32,
    pub right_state_2: i32,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpmcFactorsRow {
    pub one_site_interaction_factor: f64,
    pub two_site_interaction_factor: f64,
    pub interaction_radius_bound: f64,
    pub distance_factor_type: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NpmcInitialStateRow {
    pub site_id: i32,
    pub degree_of_freedom: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpmcTables {
    pub metadata: NpmcMetadataRow,
    pub species: Vec<SpeciesRow>,
    pub sites: Vec<SiteRow>,
    pub interactions: Vec<InteractionRow>,
    pub factors: NpmcFactorsRow,
    pub initial_state: Vec<NpmcInitialStateRow>,
}

impl NpmcTables {
    pub fn from_json_reader(reader: impl Read) -> Result<Self, ModelError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

/// One recorded GMC firing, keyed by seed and step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GmcTrajectoryRow {
    pub seed: u64,
    pub step: usize,
    pub reaction_id: usize,
    pub time: f64,
}

/// One recorded NPMC firing; `site_id_2` is `-1` for one-site events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NpmcTrajectoryRow {
    pub seed: u64,
    pub step: usize,
    pub time: f64,
    pub site_id_1: i32,
    pub site_id_2: i32,
    pub interaction_id: i32,
}
