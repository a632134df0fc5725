use reaction_mc::dispatcher::{run_trajectories, RunSettings};
use reaction_mc::nano_particle::NanoParticle;
use reaction_mc::reaction_network::{ReactionNetwork, ReactionNetworkParameters};
use reaction_mc::simulation::Simulation;
use reaction_mc::solver::{LinearSolver, TreeSolver};
use reaction_mc::tables::{
    GmcFactorsRow, GmcInitialStateRow, GmcMetadataRow, GmcTables, InteractionRow, NpmcFactorsRow,
    NpmcInitialStateRow, NpmcMetadataRow, NpmcTables, ReactionRow, SiteRow, SpeciesRow,
};

/// Feed plus reversible dimerization: 0 -> A, A + A -> B, B -> A + A.
fn dimerization_network() -> ReactionNetwork {
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
                rate: 2.0,
            },
            ReactionRow {
                reaction_id: 1,
                number_of_reactants: 2,
                number_of_products: 1,
                reactant_1: 0,
                reactant_2: 0,
                product_1: 1,
                product_2: -1,
                rate: 0.2,
            },
            ReactionRow {
                reaction_id: 2,
                number_of_reactants: 1,
                number_of_products: 2,
                reactant_1: 1,
                reactant_2: -1,
                product_1: 0,
                product_2: 0,
                rate: 0.5,
            },
        ],
        initial_state: vec![
            GmcInitialStateRow {
                species_id: 0,
                count: 10,
            },
            GmcInitialStateRow {
                species_id: 1,
                count: 0,
            },
        ],
    };
    ReactionNetwork::from_tables(
        &tables,
        ReactionNetworkParameters {
            dependency_threshold: 3,
        },
    )
    .unwrap()
}

/// An excitation walking a six-site chain with a slow one-site decay.
fn chain_particle() -> NanoParticle {
    let number_of_sites = 6;
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
                x: site as f64,
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
                rate: 1.0,
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
                rate: 0.1,
            },
        ],
        factors: NpmcFactorsRow {
            one_site_interaction_factor: 1.0,
            two_site_interaction_factor: 1.0,
            interaction_radius_bound: 1.5,
            distance_factor_type: "linear".to_string(),
        },
        initial_state: (0..number_of_sites)
            .map(|site| NpmcInitialStateRow {
                site_id: site as i32,
                degree_of_freedom: if site == 0 { 1 } else { 0 },
            })
            .collect(),
    };
    NanoParticle::from_tables(&tables).unwrap()
}

#[test]
fn gmc_history_replays_with_mass_balance() {
    let network = dimerization_network();
    let mut simulation = Simulation::<_, TreeSolver>::new(&network, 7, 2000, f64::INFINITY);
    simulation.execute_steps(2000);
    assert_eq!(simulation.step, 2000);

    // Replaying the history must reproduce the final state without any
    // count ever dipping below zero.
    let mut state = network.initial_state.clone();
    let mut previous_time = 0.0;
    for element in simulation.history.iter() {
        assert!(element.time > previous_time);
        previous_time = element.time;

        let reaction = &network.reactions[element.event];
        for m in 0..reaction.number_of_reactants as usize {
            let species = reaction.reactants[m] as usize;
            state[species] -= 1;
            assert!(
                state[species] >= 0,
                "reaction {} fired without reactant {}",
                element.event,
                species
            );
        }
        for m in 0..reaction.number_of_products as usize {
            state[reaction.products[m] as usize] += 1;
        }
    }
    assert_eq!(state, simulation.state);
}

#[test]
fn parallel_batches_reproduce_bit_identical_histories() {
    let network = dimerization_network();
    let settings = RunSettings {
        number_of_trajectories: 8,
        base_seed: 400,
        step_cutoff: 500,
        time_cutoff: f64::INFINITY,
    };

    let first = run_trajectories::<_, TreeSolver>(&network, settings);
    let second = run_trajectories::<_, TreeSolver>(&network, settings);

    assert_eq!(first.len(), 8);
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.seed, b.seed);
        assert_eq!(a.history, b.history);
    }
    for (index, packet) in first.iter().enumerate() {
        assert_eq!(packet.seed, 400 + index as u64);
        assert!(packet.history.len() <= 500);
    }
}

#[test]
fn gmc_trajectory_rows_mirror_the_history() {
    let network = dimerization_network();
    let mut simulation = Simulation::<_, TreeSolver>::new(&network, 11, 50, f64::INFINITY);
    simulation.execute_steps(50);

    for (step, element) in simulation.history.iter().enumerate() {
        let row = network.trajectory_row(11, step, element);
        assert_eq!(row.seed, 11);
        assert_eq!(row.step, step);
        assert_eq!(row.reaction_id, element.event);
        assert_eq!(row.time, element.time);
        assert!(row.reaction_id < network.reactions.len());
    }
}

#[test]
fn npmc_batch_respects_cutoffs_and_schema() {
    let particle = chain_particle();
    let settings = RunSettings {
        number_of_trajectories: 8,
        base_seed: 77,
        step_cutoff: 30,
        time_cutoff: f64::INFINITY,
    };
    let packets = run_trajectories::<_, LinearSolver>(&particle, settings);

    for packet in packets.iter() {
        assert!(packet.history.len() <= 30);
        let mut previous_time = 0.0;
        for (step, element) in packet.history.iter().enumerate() {
            assert!(element.time > previous_time);
            previous_time = element.time;

            let row = particle.trajectory_row(packet.seed, step, element);
            assert!(row.site_id_1 >= 0 && (row.site_id_1 as usize) < particle.sites.len());
            match row.interaction_id {
                // Hops always name two sites, decays none but the first.
                0 => assert!(row.site_id_2 >= 0 && (row.site_id_2 as usize) < particle.sites.len()),
                1 => assert_eq!(row.site_id_2, -1),
                other => panic!("unexpected interaction {}", other),
            }
        }
    }
}

#[test]
fn npmc_time_cutoff_ends_the_walk() {
    let particle = chain_particle();
    let mut simulation = Simulation::<_, LinearSolver>::new(&particle, 3, 1000, 2.0);
    simulation.execute_steps(1000);

    assert!(simulation.time >= 2.0 || simulation.state.reactions.is_empty());
    if simulation.history.len() > 1 {
        // Only the final event may cross the cutoff.
        let before_last = &simulation.history[simulation.history.len() - 2];
        assert!(before_last.time < 2.0);
    }
}
