pub mod dispatcher;
pub mod error;
pub mod model;
pub mod nano_particle;
pub mod reaction_network;
pub mod serialize;
pub mod simulation;
pub mod solver;
pub mod sum_tree;
pub mod tables;
