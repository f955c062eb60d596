/// Burner operation
/// Heats or cools whatever rests on each burner (the air otherwise) and keeps
/// the chunk count of a heated/cooled container in step with its energy.
use crate::constants::BURNER_MIN_COOLING_TEMPERATURE;
use crate::heat_transfer::HeatReservoir;
use crate::sim::simulation::ThermalSimulation;
use crate::sim_op::SimOp;
use tracing::trace;

#[derive(Debug, Default)]
pub struct BurnerOp;

impl BurnerOp {
    pub fn new() -> Self {
        Self
    }
}

impl SimOp for BurnerOp {
    fn name(&self) -> &str {
        "BurnerOp"
    }

    fn update_sim(&mut self, sim: &mut ThermalSimulation) {
        let dt = sim.dt;
        for burner_index in 0..sim.burners.len() {
            let burner = sim.burners[burner_index].clone();
            let delta = burner.energy_delta(dt);
            if delta == 0.0 {
                continue;
            }

            let Some(container_index) = sim.container_index_on_burner(&burner) else {
                sim.air.change_energy(delta);
                continue;
            };

            let element = sim.containers[container_index].element_mut();
            let delta = if delta < 0.0 {
                let floor = element.heat_capacity() * BURNER_MIN_COOLING_TEMPERATURE;
                delta.max(floor - element.energy()).min(0.0)
            } else {
                delta
            };
            element.change_energy(delta);

            if delta > 0.0 && element.energy_chunk_balance() < 0 {
                let chunk = burner.emit_energy_chunk(&mut sim.rng);
                trace!(burner = burner_index, chunk = chunk.id().0, "burner emitted chunk");
                element.add_energy_chunk(chunk, &mut sim.rng);
            } else if delta < 0.0 && element.energy_chunk_balance() > 0 {
                if let Some(chunk) = element.extract_energy_chunk_closest_to_point(burner.top_center()) {
                    trace!(burner = burner_index, chunk = chunk.id().0, "burner absorbed chunk");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EfacConfig;
    use crate::constants::{BURNER_HEIGHT, ROOM_TEMPERATURE};
    use crate::sim::simulation::ThermalSimProps;
    use crate::sim_op::SimOpHandle;
    use crate::thermal::{Block, BlockType, Burner, ThermalContainer};
    use glam::DVec2;
    use more_asserts::{assert_gt, assert_lt};

    fn sim_with_block_on_burner(level: f64) -> ThermalSimulation {
        let config = EfacConfig::seeded(12);
        let block = Block::new(BlockType::Iron, DVec2::new(0.0, BURNER_HEIGHT), &config);
        let mut burner = Burner::new(DVec2::ZERO);
        burner.set_heat_cool_level(level);
        ThermalSimulation::new(ThermalSimProps {
            name: "burner",
            config,
            containers: vec![Box::new(block)],
            burners: vec![burner],
            ops: vec![SimOpHandle::new(Box::new(BurnerOp::new()))],
        })
        .expect("valid config")
    }

    #[test]
    fn test_heating_adds_energy_and_chunks() {
        let mut sim = sim_with_block_on_burner(1.0);
        let chunks_before = sim.containers[0].element().num_energy_chunks();
        for _ in 0..120 {
            sim.step(1.0 / 60.0);
        }
        assert_gt!(sim.containers[0].temperature(), ROOM_TEMPERATURE + 5.0);
        assert_gt!(sim.containers[0].element().num_energy_chunks(), chunks_before);
        assert!(sim.containers[0].element().energy_chunk_balance().abs() <= 1);
    }

    #[test]
    fn test_cooling_stops_at_floor() {
        let mut sim = sim_with_block_on_burner(-1.0);
        for _ in 0..60 * 120 {
            sim.step(1.0 / 60.0);
        }
        let temperature = sim.containers[0].temperature();
        assert_gt!(temperature, BURNER_MIN_COOLING_TEMPERATURE - 1e-6);
        assert_lt!(temperature, ROOM_TEMPERATURE);
    }

    #[test]
    fn test_burner_without_container_heats_air() {
        let config = EfacConfig::seeded(3);
        let mut burner = Burner::new(DVec2::new(0.5, 0.0));
        burner.set_heat_cool_level(1.0);
        let mut sim = ThermalSimulation::new(ThermalSimProps {
            name: "air only",
            config,
            containers: Vec::new(),
            burners: vec![burner],
            ops: vec![SimOpHandle::new(Box::new(BurnerOp::new()))],
        })
        .expect("valid config");
        sim.step(1.0 / 60.0);
        assert_gt!(sim.air.temperature(), ROOM_TEMPERATURE);
    }
}
