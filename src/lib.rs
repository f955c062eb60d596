pub mod config;
pub mod constants;
pub mod energy;
pub mod energy_chunk;
pub mod energy_chunk_container_slice;
pub mod energy_chunk_distributor;
pub mod energy_chunk_path_mover;
pub mod energy_chunk_wander_controller;
pub mod error;
pub mod geometry;
pub mod heat_transfer;
pub mod math_utils;
pub mod sim;
pub mod sim_op;
pub mod state;
pub mod systems;
pub mod thermal;
