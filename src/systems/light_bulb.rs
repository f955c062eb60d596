use crate::config::SimRng;
use crate::constants::ENERGY_CHUNK_VELOCITY;
use crate::energy::{Energy, EnergyType};
use crate::energy_chunk::EnergyChunk;
use crate::energy_chunk_path_mover::{create_path_from_offsets, create_radiated_path, create_random_straight_path};
use crate::error::EfacError;
use crate::state::{ElementState, LightBulbState};
use crate::systems::element_core::{ChunkPipeline, ElementCore, LegOutcome};
use crate::systems::{ElementRole, EnergySystemElement, MAX_ENERGY_PRODUCTION_RATE, approach};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::f64::consts::PI;
use tracing::trace;

// where a converter's wire delivers chunks, relative to the bulb
const WIRE_ENTRY_OFFSET: DVec2 = DVec2::new(-0.045, 0.03);
const FILAMENT_PATH: [DVec2; 3] = [
    DVec2::new(0.0, 0.03),
    DVec2::new(0.0, 0.06),
    FILAMENT_OFFSET,
];
const FILAMENT_OFFSET: DVec2 = DVec2::new(0.0, 0.1);
const LIGHT_TRAVEL_HEIGHT: f64 = 0.2;
const HEAT_RADIATION_HEIGHT: f64 = 0.12;
// fraction of the brightness gap closed per second
const LIT_RESPONSE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BulbType {
    Incandescent,
    Fluorescent,
}

impl BulbType {
    /// Share of the electrical energy leaving as light; the rest is heat.
    pub fn light_proportion(&self) -> f64 {
        match self {
            BulbType::Incandescent => 0.2,
            BulbType::Fluorescent => 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BulbLeg {
    ToFilament,
    Shining,
    Radiating,
}

#[derive(Debug, Clone)]
pub struct LightBulb {
    core: ElementCore<BulbLeg>,
    bulb_type: BulbType,
    lit_proportion: f64,
    light_accumulator: f64,
}

impl LightBulb {
    pub fn new(bulb_type: BulbType, position: DVec2) -> Self {
        Self {
            core: ElementCore::new(position),
            bulb_type,
            lit_proportion: 0.0,
            light_accumulator: 0.0,
        }
    }

    pub fn bulb_type(&self) -> BulbType {
        self.bulb_type
    }

    /// Brightness in [0, 1].
    pub fn lit_proportion(&self) -> f64 {
        self.lit_proportion
    }

    fn next_leg(&mut self, leg: BulbLeg, rng: &mut SimRng) -> LegOutcome<BulbLeg> {
        let filament = self.core.position() + FILAMENT_OFFSET;
        match leg {
            BulbLeg::ToFilament => {
                self.light_accumulator += self.bulb_type.light_proportion();
                if self.light_accumulator >= 1.0 {
                    self.light_accumulator -= 1.0;
                    LegOutcome::Continue {
                        leg: BulbLeg::Shining,
                        path: create_random_straight_path(filament, 0.0, PI, LIGHT_TRAVEL_HEIGHT, rng),
                        speed: ENERGY_CHUNK_VELOCITY * 2.0,
                        energy_type: Some(EnergyType::Light),
                    }
                } else {
                    LegOutcome::Continue {
                        leg: BulbLeg::Radiating,
                        path: create_radiated_path(filament, 0.0, HEAT_RADIATION_HEIGHT, rng),
                        speed: ENERGY_CHUNK_VELOCITY,
                        energy_type: Some(EnergyType::Thermal),
                    }
                }
            }
            BulbLeg::Shining | BulbLeg::Radiating => LegOutcome::Remove,
        }
    }
}

fn light_bulb_state(state: &ElementState) -> Result<&LightBulbState, EfacError> {
    match state {
        ElementState::LightBulb(state) => Ok(state),
        other => Err(EfacError::StateMismatch {
            expected: "light bulb",
            found: other.kind_name(),
        }),
    }
}

impl EnergySystemElement for LightBulb {
    fn name(&self) -> &'static str {
        match self.bulb_type {
            BulbType::Incandescent => "incandescent bulb",
            BulbType::Fluorescent => "fluorescent bulb",
        }
    }

    fn role(&self) -> ElementRole {
        ElementRole::User
    }

    fn pipeline(&self) -> &dyn ChunkPipeline {
        &self.core
    }

    fn pipeline_mut(&mut self) -> &mut dyn ChunkPipeline {
        &mut self.core
    }

    fn output_type(&self) -> Option<EnergyType> {
        None
    }

    fn accepts(&self, energy_type: EnergyType) -> bool {
        energy_type == EnergyType::Electrical
    }

    fn step(&mut self, dt: f64, incoming: &Energy, rng: &mut SimRng) -> Energy {
        if !self.core.is_active() {
            return Energy::none();
        }
        let incoming_rate = if incoming.energy_type == EnergyType::Electrical && dt > 0.0 {
            incoming.amount / dt
        } else {
            0.0
        };
        let target = (incoming_rate / MAX_ENERGY_PRODUCTION_RATE).min(1.0);
        self.lit_proportion = approach(self.lit_proportion, target, LIT_RESPONSE, dt);

        for chunk in self.core.take_incoming() {
            if chunk.energy_type != EnergyType::Electrical {
                trace!(chunk = chunk.id().0, "bulb ignores non-electrical chunk");
                self.core.apply(chunk, LegOutcome::Remove);
                continue;
            }
            let path = create_path_from_offsets(self.core.position(), &FILAMENT_PATH);
            self.core.launch(chunk, BulbLeg::ToFilament, path, ENERGY_CHUNK_VELOCITY);
        }
        self.core.move_chunks(dt);
        for (leg, chunk) in self.core.take_finished() {
            let outcome = self.next_leg(leg, rng);
            self.core.apply(chunk, outcome);
        }
        Energy::none()
    }

    fn energy_output_rate(&self) -> Energy {
        Energy::none()
    }

    fn preload_entry_chunk(&self, energy_type: EnergyType) -> Option<EnergyChunk> {
        let entry = self.core.position() + WIRE_ENTRY_OFFSET;
        self.accepts(energy_type).then(|| EnergyChunk::at(energy_type, entry))
    }

    fn deactivate(&mut self) {
        self.core.clear();
        self.core.set_active(false);
        self.lit_proportion = 0.0;
        self.light_accumulator = 0.0;
    }

    fn state(&self) -> ElementState {
        ElementState::LightBulb(LightBulbState {
            lit_proportion: self.lit_proportion,
            light_accumulator: self.light_accumulator,
        })
    }

    fn check_state(&self, state: &ElementState) -> Result<(), EfacError> {
        light_bulb_state(state).map(|_| ())
    }

    fn apply_state(&mut self, state: &ElementState) -> Result<(), EfacError> {
        let state = light_bulb_state(state)?;
        self.lit_proportion = state.lit_proportion.clamp(0.0, 1.0);
        self.light_accumulator = state.light_accumulator;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use more_asserts::assert_gt;
    use rand::SeedableRng;

    fn count_conversions(bulb_type: BulbType) -> (usize, usize) {
        let mut bulb = LightBulb::new(bulb_type, DVec2::ZERO);
        bulb.activate();
        let mut rng = SimRng::seed_from_u64(12);
        let chunks = (0..10).map(|_| EnergyChunk::at(EnergyType::Electrical, WIRE_ENTRY_OFFSET)).collect();
        bulb.inject_energy_chunks(chunks);

        // long enough to reach the filament, short enough that nothing has left yet
        for _ in 0..210 {
            bulb.step(1.0 / 60.0, &Energy::none(), &mut rng);
        }
        let light = bulb.energy_chunks().iter().filter(|c| c.energy_type == EnergyType::Light).count();
        let heat = bulb.energy_chunks().iter().filter(|c| c.energy_type == EnergyType::Thermal).count();
        (light, heat)
    }

    #[test]
    fn test_incandescent_mostly_heats() {
        assert_eq!(count_conversions(BulbType::Incandescent), (2, 8));
    }

    #[test]
    fn test_fluorescent_mostly_shines() {
        let (light, heat) = count_conversions(BulbType::Fluorescent);
        assert_eq!(light + heat, 10);
        assert!((6..=7).contains(&light));
    }

    #[test]
    fn test_brightness_follows_electrical_input() {
        let mut bulb = LightBulb::new(BulbType::Fluorescent, DVec2::ZERO);
        bulb.activate();
        let mut rng = SimRng::seed_from_u64(12);
        let dt = 1.0 / 60.0;
        let input = Energy::new(EnergyType::Electrical, MAX_ENERGY_PRODUCTION_RATE * 0.5 * dt, 0.0);
        for _ in 0..60 * 5 {
            bulb.step(dt, &input, &mut rng);
        }
        assert_gt!(bulb.lit_proportion(), 0.49);

        for _ in 0..60 * 5 {
            bulb.step(dt, &Energy::none(), &mut rng);
        }
        assert!(bulb.lit_proportion() < 0.01);
    }
}
