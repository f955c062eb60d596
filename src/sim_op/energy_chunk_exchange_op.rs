/// Energy chunk exchange operation
/// Moves at most one chunk per container per step so chunk counts follow the
/// energy that heat exchange moved: surplus containers hand chunks to touching
/// containers in deficit, and exposed containers trade the rest with the air.
use crate::constants::AIR_CHUNK_RADIATION_HEIGHT;
use crate::geometry::Rect;
use crate::sim::simulation::ThermalSimulation;
use crate::sim_op::SimOp;
use tracing::trace;

#[derive(Debug, Default)]
pub struct EnergyChunkExchangeOp {
    /// Chunks handed between containers since the simulation started.
    pub container_transfers: u64,
    /// Chunks given to or taken from the air since the simulation started.
    pub air_transfers: u64,
}

impl EnergyChunkExchangeOp {
    pub fn new() -> Self {
        Self::default()
    }

    fn exchange_between_containers(&mut self, sim: &mut ThermalSimulation) {
        let count = sim.containers.len();
        for from in 0..count {
            for to in 0..count {
                if from == to
                    || sim.containers[from].element().energy_chunk_balance() <= 0
                    || sim.containers[to].element().energy_chunk_balance() >= 0
                {
                    continue;
                }
                let source_area = sim.containers[from].thermal_contact_area();
                let destination_area = sim.containers[to].thermal_contact_area();
                if source_area.thermal_contact_length(&destination_area) <= 0.0 {
                    continue;
                }
                let Some(chunk) = sim.containers[from]
                    .element_mut()
                    .extract_energy_chunk_closest_to_bounds(&destination_area.bounds)
                else {
                    continue;
                };
                trace!(chunk = chunk.id().0, from, to, "chunk moved between containers");
                sim.containers[to].element_mut().add_energy_chunk(chunk, &mut sim.rng);
                self.container_transfers += 1;
            }
        }
    }

    fn exchange_with_air(&mut self, sim: &mut ThermalSimulation) {
        for index in 0..sim.containers.len() {
            if sim.is_immersed(index) {
                continue;
            }
            let outline = sim.containers[index].outline();
            let element = sim.containers[index].element_mut();
            let balance = element.energy_chunk_balance();
            if balance > 0 {
                let above = Rect::new(
                    outline.min.x,
                    outline.max.y,
                    outline.max.x,
                    outline.max.y + AIR_CHUNK_RADIATION_HEIGHT,
                );
                if let Some(chunk) = element.extract_energy_chunk_closest_to_bounds(&above) {
                    sim.air.add_energy_chunk(chunk, &mut sim.rng);
                    self.air_transfers += 1;
                }
            } else if balance < 0 {
                let chunk = sim.air.request_energy_chunk(&outline, &mut sim.rng);
                element.add_energy_chunk(chunk, &mut sim.rng);
                self.air_transfers += 1;
            }
        }
    }
}

impl SimOp for EnergyChunkExchangeOp {
    fn name(&self) -> &str {
        "EnergyChunkExchangeOp"
    }

    fn update_sim(&mut self, sim: &mut ThermalSimulation) {
        self.exchange_between_containers(sim);
        if sim.config.air_exchange_enabled {
            self.exchange_with_air(sim);
        }
    }
}
