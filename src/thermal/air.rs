use crate::config::SimRng;
use crate::constants::{
    AIR_AMBIENT_RECOVERY_RATE, AIR_CHUNK_RADIATION_HEIGHT, AIR_CHUNK_SPAWN_HEIGHT, AIR_DENSITY, AIR_DEPTH, AIR_HEIGHT,
    AIR_SPECIFIC_HEAT, AIR_WIDTH, ENERGY_CHUNK_VELOCITY, ROOM_TEMPERATURE,
};
use crate::energy::EnergyType;
use crate::energy_chunk::EnergyChunk;
use crate::energy_chunk_path_mover::{EnergyChunkPathMover, create_radiated_path};
use crate::error::EfacError;
use crate::geometry::Rect;
use crate::heat_transfer::{EnergyContainerCategory, HeatReservoir, exchange_energy, heat_transfer_constant};
use crate::math_utils::random_between;
use crate::state::AirState;
use glam::DVec2;
use tracing::{error, trace};

use super::ThermalElement;

/// The room around the containers.
///
/// A large heat reservoir that relaxes back toward room temperature. Chunks
/// given to the air drift upward and disappear; chunks taken from it appear
/// just above the container that asked for them.
#[derive(Debug, Clone)]
pub struct Air {
    energy: f64,
    heat_capacity: f64,
    max_heat_exchange_time_step: f64,
    movers: Vec<EnergyChunkPathMover>,
}

impl Air {
    pub fn new(max_heat_exchange_time_step: f64) -> Self {
        let heat_capacity = AIR_WIDTH * AIR_HEIGHT * AIR_DEPTH * AIR_DENSITY * AIR_SPECIFIC_HEAT;
        Self {
            energy: heat_capacity * ROOM_TEMPERATURE,
            heat_capacity,
            max_heat_exchange_time_step,
            movers: Vec::new(),
        }
    }

    pub fn temperature(&self) -> f64 {
        self.energy / self.heat_capacity
    }

    pub fn energy_chunks(&self) -> impl Iterator<Item = &EnergyChunk> {
        self.movers.iter().map(|mover| mover.chunk())
    }

    pub fn num_energy_chunks(&self) -> usize {
        self.movers.len()
    }

    /// Relax toward room temperature and move released chunks, dropping those
    /// that finished rising.
    pub fn step(&mut self, dt: f64) {
        let ambient = self.heat_capacity * ROOM_TEMPERATURE;
        let recovery = (AIR_AMBIENT_RECOVERY_RATE * dt).min(1.0);
        self.energy += (ambient - self.energy) * recovery;

        for mover in &mut self.movers {
            mover.move_along_path(dt);
        }
        self.movers.retain(|mover| !mover.path_fully_traversed());
    }

    /// Heat exchange with a container that isn't immersed in anything.
    /// The whole contact-area perimeter is exposed. Returns the energy the container gained.
    pub fn exchange_energy_with(&mut self, container: &mut ThermalElement, dt: f64) -> f64 {
        let contact_length = container.thermal_contact_area().perimeter();
        let constant = heat_transfer_constant(EnergyContainerCategory::Air, container.category());
        let max_step = self.max_heat_exchange_time_step;
        exchange_energy(container, self, contact_length, constant, dt, max_step)
    }

    /// Take a chunk released by a container and let it radiate away.
    pub fn add_energy_chunk(&mut self, mut chunk: EnergyChunk, rng: &mut SimRng) {
        trace!(chunk = chunk.id().0, "chunk released to air");
        chunk.set_energy_type(EnergyType::Thermal);
        let path = create_radiated_path(chunk.position, 0.0, AIR_CHUNK_RADIATION_HEIGHT, rng);
        self.movers.push(EnergyChunkPathMover::new(chunk, path, ENERGY_CHUNK_VELOCITY));
    }

    /// Mint a thermal chunk just above `destination` for a container in deficit.
    pub fn request_energy_chunk(&mut self, destination: &Rect, rng: &mut SimRng) -> EnergyChunk {
        let half_width = destination.width() / 2.0;
        let x = destination.center().x + random_between(rng, -half_width, half_width);
        EnergyChunk::at(
            EnergyType::Thermal,
            DVec2::new(x, destination.max.y + AIR_CHUNK_SPAWN_HEIGHT),
        )
    }

    pub fn reset(&mut self) {
        self.energy = self.heat_capacity * ROOM_TEMPERATURE;
        self.movers.clear();
    }

    pub fn state(&self) -> AirState {
        AirState { energy: self.energy }
    }

    pub fn check_state(&self, state: &AirState) -> Result<(), EfacError> {
        if !state.energy.is_finite() || state.energy < 0.0 {
            return Err(EfacError::InvalidConfig("air energy must be finite and non-negative"));
        }
        Ok(())
    }

    pub fn apply_state(&mut self, state: &AirState) -> Result<(), EfacError> {
        self.check_state(state)?;
        self.energy = state.energy;
        Ok(())
    }
}

impl HeatReservoir for Air {
    fn energy(&self) -> f64 {
        self.energy
    }

    fn heat_capacity(&self) -> f64 {
        self.heat_capacity
    }

    fn change_energy(&mut self, delta: f64) {
        debug_assert!(delta.is_finite(), "energy delta must be finite, got {delta}");
        if !delta.is_finite() {
            error!(delta, "discarding non-finite air energy change");
            return;
        }
        self.energy += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EfacConfig;
    use crate::constants::MAX_HEAT_EXCHANGE_TIME_STEP;
    use crate::thermal::{Block, BlockType, ThermalContainer};
    use approx::assert_abs_diff_eq;
    use more_asserts::{assert_gt, assert_lt};
    use rand::SeedableRng;

    #[test]
    fn test_air_recovers_room_temperature() {
        let mut air = Air::new(MAX_HEAT_EXCHANGE_TIME_STEP);
        air.change_energy(air.heat_capacity() * 50.0);
        assert_gt!(air.temperature(), ROOM_TEMPERATURE + 49.0);
        for _ in 0..6_000 {
            air.step(1.0 / 60.0);
        }
        assert_abs_diff_eq!(air.temperature(), ROOM_TEMPERATURE, epsilon = 0.5);
    }

    #[test]
    fn test_hot_block_loses_heat_to_air() {
        let mut air = Air::new(MAX_HEAT_EXCHANGE_TIME_STEP);
        let mut block = Block::new(BlockType::Iron, DVec2::ZERO, &EfacConfig::default());
        block.element_mut().change_energy(20_000.0);
        let before = block.temperature();

        let gained = air.exchange_energy_with(block.element_mut(), 1.0);
        assert_lt!(gained, 0.0);
        assert_lt!(block.temperature(), before);
    }

    #[test]
    fn test_released_chunks_rise_and_vanish() {
        let mut rng = SimRng::seed_from_u64(1);
        let mut air = Air::new(MAX_HEAT_EXCHANGE_TIME_STEP);
        air.add_energy_chunk(EnergyChunk::at(EnergyType::Thermal, DVec2::new(0.0, 0.05)), &mut rng);
        assert_eq!(air.num_energy_chunks(), 1);

        let mut steps = 0;
        while air.num_energy_chunks() > 0 {
            air.step(1.0 / 60.0);
            steps += 1;
            assert_lt!(steps, 60 * 30);
        }
    }

    #[test]
    fn test_requested_chunk_spawns_above_destination() {
        let mut rng = SimRng::seed_from_u64(3);
        let mut air = Air::new(MAX_HEAT_EXCHANGE_TIME_STEP);
        let destination = Rect::new(-0.02, 0.0, 0.02, 0.045);
        let chunk = air.request_energy_chunk(&destination, &mut rng);
        assert_gt!(chunk.position.y, destination.max.y);
        assert_eq!(chunk.energy_type, EnergyType::Thermal);
    }
}
