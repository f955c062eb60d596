/// Heat exchange operation
/// Trades heat between every pair of containers in contact, then between each
/// exposed container and the air.
use crate::sim::simulation::ThermalSimulation;
use crate::sim_op::SimOp;

#[derive(Debug, Default)]
pub struct HeatExchangeOp {
    /// Energy that crossed between containers last step, in joules.
    pub last_container_transfer: f64,
}

impl HeatExchangeOp {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SimOp for HeatExchangeOp {
    fn name(&self) -> &str {
        "HeatExchangeOp"
    }

    fn update_sim(&mut self, sim: &mut ThermalSimulation) {
        let dt = sim.dt;
        let count = sim.containers.len();
        let mut moved = 0.0;

        for i in 0..count {
            for j in (i + 1)..count {
                let (left, right) = sim.containers.split_at_mut(j);
                moved += left[i]
                    .element_mut()
                    .exchange_energy_with(right[0].element_mut(), dt)
                    .abs();
            }
        }
        self.last_container_transfer = moved;

        if !sim.config.air_exchange_enabled {
            return;
        }
        for i in 0..count {
            if sim.is_immersed(i) {
                continue;
            }
            sim.air.exchange_energy_with(sim.containers[i].element_mut(), dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EfacConfig;
    use crate::heat_transfer::HeatReservoir;
    use crate::sim::simulation::ThermalSimProps;
    use crate::sim_op::SimOpHandle;
    use crate::thermal::{Block, BlockType, ThermalContainer};
    use approx::assert_abs_diff_eq;
    use glam::DVec2;
    use more_asserts::assert_le;

    #[test]
    fn test_touching_blocks_converge_and_conserve_energy() {
        let mut config = EfacConfig::seeded(5);
        config.air_exchange_enabled = false;
        let mut hot = Block::new(BlockType::Brick, DVec2::ZERO, &config);
        let hot_capacity = hot.element().heat_capacity();
        hot.element_mut().change_energy(hot_capacity * 60.0);
        let cold = Block::new(BlockType::Iron, DVec2::new(0.045, 0.0), &config);

        let mut sim = ThermalSimulation::new(ThermalSimProps {
            name: "pair",
            config,
            containers: vec![Box::new(hot), Box::new(cold)],
            burners: Vec::new(),
            ops: vec![SimOpHandle::new(Box::new(HeatExchangeOp::new()))],
        })
        .expect("valid config");

        let total = |sim: &ThermalSimulation| -> f64 { sim.containers.iter().map(|c| c.element().energy()).sum() };
        let start = total(&sim);
        let mut gap = sim.containers[0].temperature() - sim.containers[1].temperature();
        for _ in 0..600 {
            sim.step(0.1);
            let now = sim.containers[0].temperature() - sim.containers[1].temperature();
            assert_le!(now.abs(), gap.abs() + 1e-9);
            gap = now;
        }
        assert_abs_diff_eq!(total(&sim), start, epsilon = 1e-6);
        assert!(gap.abs() < 60.0, "blocks should have moved toward equilibrium");
    }
}
