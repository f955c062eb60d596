// Thermal simulation tests
// Runs containers, burners and air together through the default operators

use energy_forms_rust::assert_deviation;
use energy_forms_rust::config::EfacConfig;
use energy_forms_rust::constants::{BURNER_HEIGHT, ROOM_TEMPERATURE, SIM_TIME_PER_TICK_NORMAL};
use energy_forms_rust::energy::EnergyType;
use energy_forms_rust::energy_chunk::EnergyChunk;
use energy_forms_rust::energy_chunk_container_slice::EnergyChunkContainerSlice;
use energy_forms_rust::energy_chunk_distributor::{EnergyChunkDistributor, generate_random_location};
use energy_forms_rust::geometry::{Rect, SliceBounds};
use energy_forms_rust::heat_transfer::HeatReservoir;
use energy_forms_rust::sim::{ThermalSimProps, ThermalSimulation};
use energy_forms_rust::sim_op::{HeatExchangeOp, SimOpHandle};
use energy_forms_rust::state::{ThermalSimulationState, from_json, to_json};
use energy_forms_rust::thermal::{Beaker, BeakerType, Block, BlockType, Burner, ThermalContainer};
use glam::DVec2;
use more_asserts::{assert_gt, assert_le, assert_lt};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::collections::HashSet;

fn kitchen(seed: u64) -> ThermalSimulation {
    let config = EfacConfig::seeded(seed);
    let brick = Block::new(BlockType::Brick, DVec2::new(-0.1, BURNER_HEIGHT), &config);
    let water = Beaker::new(BeakerType::Water, DVec2::new(0.1, BURNER_HEIGHT), &config);
    let mut heater = Burner::new(DVec2::new(-0.1, 0.0));
    heater.set_heat_cool_level(1.0);
    let cooler = Burner::new(DVec2::new(0.1, 0.0));

    ThermalSimulation::new(ThermalSimProps {
        name: "kitchen",
        config,
        containers: vec![Box::new(brick), Box::new(water)],
        burners: vec![heater, cooler],
        ops: ThermalSimulation::default_ops(),
    })
    .expect("valid config")
}

#[test]
fn test_chunk_counts_track_energy() {
    let mut sim = kitchen(23);
    for _ in 0..(30.0 / SIM_TIME_PER_TICK_NORMAL) as usize {
        sim.step(SIM_TIME_PER_TICK_NORMAL);
    }
    println!("brick at {:.1}K", sim.containers[0].temperature());
    assert_gt!(sim.containers[0].temperature(), ROOM_TEMPERATURE + 10.0);
    for container in &sim.containers {
        let balance = container.element().energy_chunk_balance();
        assert!(balance.abs() <= 1, "{} off by {balance} chunks", container.name());
    }
}

#[test]
fn test_chunk_ids_are_unique_across_owners() {
    let mut sim = kitchen(4);
    sim.burners[1].set_heat_cool_level(-1.0);
    for _ in 0..900 {
        sim.step(SIM_TIME_PER_TICK_NORMAL);
        let mut seen = HashSet::new();
        for chunk in sim.energy_chunks() {
            assert!(seen.insert(chunk.id()), "chunk {:?} owned twice", chunk.id());
        }
    }
}

#[test]
fn test_isolated_pair_conserves_energy_and_converges() {
    let mut config = EfacConfig::seeded(8);
    config.air_exchange_enabled = false;
    let mut hot = Block::new(BlockType::Iron, DVec2::ZERO, &config);
    let hot_capacity = hot.element().heat_capacity();
    hot.element_mut().change_energy(hot_capacity * 80.0);
    let cold = Block::new(BlockType::Brick, DVec2::new(0.045, 0.0), &config);

    let mut sim = ThermalSimulation::new(ThermalSimProps {
        name: "isolated pair",
        config,
        containers: vec![Box::new(hot), Box::new(cold)],
        burners: Vec::new(),
        ops: vec![SimOpHandle::new(Box::new(HeatExchangeOp::new()))],
    })
    .expect("valid config");

    let total = |sim: &ThermalSimulation| -> f64 { sim.containers.iter().map(|c| c.element().energy()).sum() };
    let start = total(&sim);
    let mut gap = sim.containers[0].temperature() - sim.containers[1].temperature();
    // a large dt is split into sub-steps and must not overshoot
    for _ in 0..300 {
        sim.step(0.5);
        let now = sim.containers[0].temperature() - sim.containers[1].temperature();
        assert_le!(now.abs(), gap.abs() + 1e-9);
        assert!(now >= -1e-9, "heat flowed past equilibrium");
        gap = now;
    }
    assert_lt!((total(&sim) - start).abs() / start, 1e-9);
}

#[test]
fn test_distributor_spreads_chunks_apart() {
    let bounds = SliceBounds::Rectangle(Rect::new(0.0, 0.0, 0.1, 0.1));
    let mut rng = SmallRng::seed_from_u64(31);
    let mut slice = EnergyChunkContainerSlice::new(bounds, 0.0);
    for _ in 0..10 {
        slice.add_energy_chunk(EnergyChunk::at(EnergyType::Thermal, generate_random_location(&bounds, &mut rng)));
    }
    let mut slices = vec![slice];
    let distributor = EnergyChunkDistributor::default();
    for _ in 0..500 {
        distributor.update_positions(&mut slices, SIM_TIME_PER_TICK_NORMAL);
    }

    let chunks = slices[0].energy_chunks();
    let spacing = (bounds.area() / chunks.len() as f64).sqrt();
    let mut closest = f64::INFINITY;
    for (i, a) in chunks.iter().enumerate() {
        assert!(bounds.contains(a.position), "{:?} escaped", a.position);
        for b in &chunks[i + 1..] {
            closest = closest.min(a.position.distance(b.position));
        }
    }
    println!("closest pair {closest:.4} m, spacing {spacing:.4} m");
    assert_gt!(closest, spacing * 0.25);
}

#[test]
fn test_state_survives_json() {
    let mut sim = kitchen(2);
    for _ in 0..120 {
        sim.step(SIM_TIME_PER_TICK_NORMAL);
    }
    let json = to_json(&sim.state()).expect("serializable");
    let parsed: ThermalSimulationState = from_json(&json).expect("same version");

    let mut restored = kitchen(99);
    restored.apply_state(&parsed).expect("same layout");
    assert_eq!(restored.step, 120);
    for (a, b) in sim.containers.iter().zip(&restored.containers) {
        assert_deviation!(b.element().energy(), a.element().energy(), 1e-9, "{} energy", a.name());
        assert_lt!(a.element().position().distance(b.element().position()), 1e-12);
    }
    assert_deviation!(restored.air.energy(), sim.air.energy(), 1e-9);
    assert_eq!(restored.burners[0].heat_cool_level(), 1.0);
}
