pub mod biker;
pub mod carousel;
pub mod element_core;
pub mod energy_systems_model;
pub mod fan;
pub mod faucet;
pub mod generator;
pub mod light_bulb;
pub mod solar_panel;
pub mod sun;
pub mod tea_kettle;

pub use biker::Biker;
pub use carousel::EnergySystemElementCarousel;
pub use element_core::{ChunkPipeline, ElementCore, LegMover, LegOutcome};
pub use energy_systems_model::EnergySystemsModel;
pub use fan::Fan;
pub use faucet::Faucet;
pub use generator::Generator;
pub use light_bulb::{BulbType, LightBulb};
pub use solar_panel::SolarPanel;
pub use sun::Sun;
pub use tea_kettle::TeaKettle;

use crate::config::SimRng;
use crate::constants::{ENERGY_PER_CHUNK, SIM_TIME_PER_TICK_NORMAL};
use crate::energy::{Energy, EnergyType};
use crate::energy_chunk::EnergyChunk;
use crate::error::EfacError;
use crate::state::ElementState;
use glam::DVec2;
use std::any::Any;
use tracing::{debug, warn};

/// Top output rate of any source, J/s.
pub const MAX_ENERGY_PRODUCTION_RATE: f64 = 10_000.0;

/// Where an element sits in the source → converter → user pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementRole {
    Source,
    Converter,
    User,
}

/// One stage of the energy-systems pipeline.
///
/// Each element owns its chunks through a [`ChunkPipeline`]; the provided
/// methods cover chunk bookkeeping so implementors only supply the energy
/// physics and their leg transition table.
pub trait EnergySystemElement: std::fmt::Debug {
    fn name(&self) -> &'static str;
    fn role(&self) -> ElementRole;

    fn pipeline(&self) -> &dyn ChunkPipeline;
    fn pipeline_mut(&mut self) -> &mut dyn ChunkPipeline;

    /// Form of the energy this element hands downstream, if any.
    fn output_type(&self) -> Option<EnergyType>;

    /// Whether chunks and energy of this type are taken from upstream.
    fn accepts(&self, energy_type: EnergyType) -> bool;

    /// Advance one tick. `incoming` is the energy delivered during this tick;
    /// the return value is the energy passed on during it.
    fn step(&mut self, dt: f64, incoming: &Energy, rng: &mut SimRng) -> Energy;

    /// Energy per second this element currently passes on.
    fn energy_output_rate(&self) -> Energy;

    /// Drop every chunk and all accumulated per-element counters.
    fn deactivate(&mut self);

    fn state(&self) -> ElementState;

    /// Whether `state` could be applied to this element, without applying it.
    fn check_state(&self, state: &ElementState) -> Result<(), EfacError>;

    /// Restore from `state`. Leaves the element untouched when it fails.
    fn apply_state(&mut self, state: &ElementState) -> Result<(), EfacError>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// A chunk placed where upstream would deliver one, used while preloading.
    fn preload_entry_chunk(&self, _energy_type: EnergyType) -> Option<EnergyChunk> {
        None
    }

    fn position(&self) -> DVec2 {
        self.pipeline().position()
    }

    fn set_position(&mut self, position: DVec2) {
        self.pipeline_mut().set_position(position);
    }

    fn is_active(&self) -> bool {
        self.pipeline().is_active()
    }

    fn activate(&mut self) {
        debug!(element = self.name(), "element activated");
        self.pipeline_mut().set_active(true);
    }

    fn set_handoff_enabled(&mut self, enabled: bool) {
        self.pipeline_mut().set_handoff_enabled(enabled);
    }

    fn inject_energy_chunks(&mut self, chunks: Vec<EnergyChunk>) {
        self.pipeline_mut().inject_energy_chunks(chunks);
    }

    fn extract_outgoing_energy_chunks(&mut self) -> Vec<EnergyChunk> {
        self.pipeline_mut().extract_outgoing_energy_chunks()
    }

    fn energy_chunks(&self) -> Vec<&EnergyChunk> {
        self.pipeline().energy_chunks()
    }

    fn mover_count(&self) -> usize {
        self.pipeline().mover_count()
    }

    /// Fast-forward at the nominal tick until the first chunk comes through:
    /// one waiting to be handed on or, with nothing downstream, one leaving.
    ///
    /// `incoming_rate` is the upstream output in J/s; sources ignore it and use
    /// their own rate. Converters and users mint their own arriving chunks at
    /// that rate since nothing is stepping upstream. Gives up after
    /// `max_time` simulated seconds.
    fn preload_energy_chunks(&mut self, incoming_rate: &Energy, max_time: f64, rng: &mut SimRng) {
        preload_pipeline(self, incoming_rate, max_time, rng);
    }
}

/// Shared body of [`EnergySystemElement::preload_energy_chunks`].
pub(crate) fn preload_pipeline<E: EnergySystemElement + ?Sized>(
    element: &mut E,
    incoming_rate: &Energy,
    max_time: f64,
    rng: &mut SimRng,
) {
    let is_source = element.role() == ElementRole::Source;
    let driving_rate = if is_source { element.energy_output_rate() } else { *incoming_rate };
    if !element.is_active() || driving_rate.is_none() {
        debug!(element = element.name(), "nothing to preload");
        return;
    }
    if !is_source && !element.accepts(incoming_rate.energy_type) {
        return;
    }

    // stages that hand chunks on are loaded once one is waiting at the exit
    let wants_outgoing = element.role() != ElementRole::User && element.pipeline().handoff_enabled();
    let dt = SIM_TIME_PER_TICK_NORMAL;
    let removed_at_start = element.pipeline().removed_count();
    let mut entry_energy = ENERGY_PER_CHUNK * 0.99;
    if is_source {
        element.pipeline_mut().set_energy_since_last_chunk(ENERGY_PER_CHUNK * 0.99);
    }

    let mut elapsed = 0.0;
    while elapsed < max_time {
        let incoming = if is_source {
            Energy::none()
        } else {
            entry_energy += incoming_rate.amount * dt;
            while entry_energy >= ENERGY_PER_CHUNK {
                entry_energy -= ENERGY_PER_CHUNK;
                if let Some(chunk) = element.preload_entry_chunk(incoming_rate.energy_type) {
                    element.inject_energy_chunks(vec![chunk]);
                }
            }
            incoming_rate.with_amount(incoming_rate.amount * dt)
        };
        element.step(dt, &incoming, rng);
        elapsed += dt;

        let pipeline = element.pipeline();
        let loaded = if wants_outgoing {
            pipeline.outgoing_count() > 0
        } else {
            pipeline.removed_count() > removed_at_start
        };
        if loaded {
            debug!(element = element.name(), simulated_seconds = elapsed, "preload complete");
            return;
        }
    }
    warn!(element = element.name(), max_time, "preload reached its time bound before any chunk came through");
}

/// Advance a chunk accumulator by `energy` and return how many chunks are due.
///
/// The accumulator is drained completely, so a long `dt` yields several
/// chunks and only the remainder below [`ENERGY_PER_CHUNK`] carries over.
pub(crate) fn accumulate_chunk_energy(pipeline: &mut dyn ChunkPipeline, energy: f64) -> usize {
    let total = pipeline.energy_since_last_chunk() + energy;
    let due = (total / ENERGY_PER_CHUNK).floor().max(0.0);
    pipeline.set_energy_since_last_chunk(total - due * ENERGY_PER_CHUNK);
    due as usize
}

/// First-order approach of `current` toward `target` at `rate` per second.
pub(crate) fn approach(current: f64, target: f64, rate: f64, dt: f64) -> f64 {
    current + (target - current) * (rate * dt).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_accumulator_carries_remainder() {
        let mut core: ElementCore<()> = ElementCore::new(DVec2::ZERO);
        assert_eq!(accumulate_chunk_energy(&mut core, ENERGY_PER_CHUNK * 0.6), 0);
        assert_eq!(accumulate_chunk_energy(&mut core, ENERGY_PER_CHUNK * 0.6), 1);
        assert_abs_diff_eq!(core.energy_since_last_chunk(), ENERGY_PER_CHUNK * 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_accumulator_drains_long_steps() {
        let mut core: ElementCore<()> = ElementCore::new(DVec2::ZERO);
        assert_eq!(accumulate_chunk_energy(&mut core, ENERGY_PER_CHUNK * 3.5), 3);
        assert_abs_diff_eq!(core.energy_since_last_chunk(), ENERGY_PER_CHUNK * 0.5, epsilon = 1e-6);
        assert_eq!(accumulate_chunk_energy(&mut core, ENERGY_PER_CHUNK * 0.5), 1);
        assert_abs_diff_eq!(core.energy_since_last_chunk(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_approach_never_overshoots() {
        assert_abs_diff_eq!(approach(0.0, 1.0, 2.0, 0.25), 0.5);
        assert_abs_diff_eq!(approach(0.0, 1.0, 100.0, 1.0), 1.0);
    }
}
