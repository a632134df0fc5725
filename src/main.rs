use flate2::{write::GzEncoder, Compression};
use std::fs;
use tqdm::tqdm;

use reaction_mc::dispatcher::{run_trajectories, RunSettings};
use reaction_mc::nano_particle::NanoParticle;
use reaction_mc::reaction_network::{ReactionNetwork, ReactionNetworkParameters};
use reaction_mc::serialize;
use reaction_mc::solver::{LinearSolver, TreeSolver};
use reaction_mc::tables::{
    GmcFactorsRow, GmcInitialStateRow, GmcMetadataRow, GmcTables, GmcTrajectoryRow,
    InteractionRow, NpmcFactorsRow, NpmcInitialStateRow, NpmcMetadataRow, NpmcTables,
    NpmcTrajectoryRow, ReactionRow, SiteRow, SpeciesRow,
};

fn main() -> Result<(), Box<dyn std::error::Error + 'static>> {
    fs::create_dir_all("data")?;
    dimerization()?;
    energy_transfer()
}

/// Reversible dimerization with a feed: 0 -> A, A + A -> B, B -> A + A.
fn dimerization() -> Result<(), Box<dyn std::error::Error + 'static>> {
    let feed_rate = 5.0;
    let association_rate = 0.1;
    let dissociation_rate = 0.5;

    let tables = GmcTables {
        metadata: GmcMetadataRow {
            number_of_species: 2,
            number_of_reactions: 3,
        },
        factors: GmcFactorsRow {
            factor_zero: 1.0,
            factor_two: 1.0,
            factor_duplicate: 0.5,
        },
        reactions: vec![
            ReactionRow {
                reaction_id: 0,
                number_of_reactants: 0,
                number_of_products: 1,
                reactant_1: -1,
                reactant_2: -1,
                product_1: 0,
                product_2: -1,
                rate: feed_rate,
            },
            ReactionRow {
                reaction_id: 1,
                number_of_reactants: 2,
                number_of_products: 1,
                reactant_1: 0,
                reactant_2: 0,
                product_1: 1,
                product_2: -1,
                rate: association_rate,
            },
            ReactionRow {
                reaction_id: 2,
                number_of_reactants: 1,
                number_of_products: 2,
                reactant_1: 1,
                reactant_2: -1,
                product_1: 0,
                product_2: 0,
                rate: dissociation_rate,
            },
        ],
        initial_state: vec![
            GmcInitialStateRow {
                species_id: 0,
                count: 20,
            },
            GmcInitialStateRow {
                species_id: 1,
                count: 0,
            },
        ],
    };
    let network = ReactionNetwork::from_tables(
        &tables,
        ReactionNetworkParameters {
            dependency_threshold: 5,
        },
    )?;

    let settings = RunSettings {
        number_of_trajectories: 50,
        base_seed: 1000,
        step_cutoff: 10_000,
        time_cutoff: 50.0,
    };
    let packets = run_trajectories::<_, TreeSolver>(&network, settings);

    let outfile = fs::File::create("data/dimerization.tar.gz")?;
    let zipper = GzEncoder::new(outfile, Compression::default());
    let mut archive_builder = tar::Builder::new(zipper);

    serialize::serialize_object("tables.json".to_string(), &tables, &mut archive_builder)?;
    for packet in tqdm(packets.iter()) {
        let rows: Vec<GmcTrajectoryRow> = packet
            .history
            .iter()
            .enumerate()
            .map(|(step, element)| network.trajectory_row(packet.seed, step, element))
            .collect();
        serialize::serialize_object(
            format!("trajectories/trajectory_{}.json", packet.seed),
            &rows,
            &mut archive_builder,
        )?;
    }
    archive_builder.finish()?;

    Ok(())
}

/// An excitation hopping along a chain of sites and occasionally decaying.
fn energy_transfer() -> Result<(), Box<dyn std::error::Error + 'static>> {
    let number_of_sites = 20;
    let spacing = 1.0;
    let radius = 2.5;
    let hop_rate = 1.0;
    let decay_rate = 0.05;

    let tables = NpmcTables {
        metadata: NpmcMetadataRow {
            number_of_species: 1,
            number_of_sites,
            number_of_interactions: 2,
        },
        species: vec![SpeciesRow {
            species_id: 0,
            degrees_of_freedom: 2,
        }],
        sites: (0..number_of_sites)
            .map(|site| SiteRow {
                site_id: site as i32,
                x: site as f64 * spacing,
                y: 0.0,
                z: 0.0,
                species_id: 0,
            })
            .collect(),
        interactions: vec![
            InteractionRow {
                interaction_id: 0,
                number_of_sites: 2,
                species_id_1: 0,
                species_id_2: 0,
                left_state_1: 1,
                left_state_2: 0,
                right_state_1: 0,
                right_state_2: 1,
                rate: hop_rate,
            },
            InteractionRow {
                interaction_id: 1,
                number_of_sites: 1,
                species_id_1: 0,
                species_id_2: -1,
                left_state_1: 1,
                left_state_2: -1,
                right_state_1: 0,
                right_state_2: -1,
                rate: decay_rate,
            },
        ],
        factors: NpmcFactorsRow {
            one_site_interaction_factor: 1.0,
            two_site_interaction_factor: 1.0,
            interaction_radius_bound: radius,
            distance_factor_type: "linear".to_string(),
        },
        initial_state: (0..number_of_sites)
            .map(|site| NpmcInitialStateRow {
                site_id: site as i32,
                degree_of_freedom: if site == 0 { 1 } else { 0 },
            })
            .collect(),
    };
    let particle = NanoParticle::from_tables(&tables)?;

    let settings = RunSettings {
        number_of_trajectories: 50,
        base_seed: 2000,
        step_cutoff: 10_000,
        time_cutoff: 200.0,
    };
    let packets = run_trajectories::<_, LinearSolver>(&particle, settings);

    let outfile = fs::File::create("data/energy_transfer.tar.gz")?;
    let zipper = GzEncoder::new(outfile, Compression::default());
    let mut archive_builder = tar::Builder::new(zipper);

    serialize::serialize_object("tables.json".to_string(), &tables, &mut archive_builder)?;
    for packet in tqdm(packets.iter()) {
        let rows: Vec<NpmcTrajectoryRow> = packet
            .history
            .iter()
            .enumerate()
            .map(|(step, element)| particle.trajectory_row(packet.seed, step, element))
            .collect();
        serialize::serialize_object(
            format!("trajectories/trajectory_{}.json", packet.seed),
            &rows,
            &mut archive_builder,
        )?;
    }
    archive_builder.finish()?;

    Ok(())
}
