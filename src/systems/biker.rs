use crate::config::SimRng;
use crate::constants::ENERGY_CHUNK_VELOCITY;
use crate::energy::{Energy, EnergyType};
use crate::energy_chunk::EnergyChunk;
use crate::energy_chunk_path_mover::{create_path_from_offsets, create_radiated_path};
use crate::error::EfacError;
use crate::state::{BikerState, ElementState};
use crate::systems::element_core::{ChunkPipeline, ElementCore, LegOutcome};
use crate::systems::{ElementRole, EnergySystemElement, MAX_ENERGY_PRODUCTION_RATE, accumulate_chunk_energy};
use glam::DVec2;
use std::any::Any;
use std::f64::consts::{PI, TAU};

const TORSO_OFFSET: DVec2 = DVec2::new(-0.005, 0.13);
const KNEE_OFFSET: DVec2 = DVec2::new(0.01, 0.09);
const PEDAL_OFFSET: DVec2 = DVec2::new(0.0, 0.05);
// chain from the rear hub out to a converter's wheel
const REAR_HUB_OFFSET: DVec2 = DVec2::new(0.04, 0.04);
const CHAIN_EXIT_OFFSET: DVec2 = DVec2::new(0.09, 0.045);
const MAX_CRANK_ANGULAR_VELOCITY: f64 = 3.0 * PI; // rad/s
const CRANK_TO_REAR_WHEEL_RATIO: f64 = 1.5;
// one chunk in this many turns to heat at the pedals
const THERMAL_CHUNK_PERIOD: u32 = 4;
const RADIATED_HEIGHT: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BikerLeg {
    ToPedal,
    ToHub,
    ToChainExit,
    Radiating,
}

/// Cyclist turning food energy into mechanical energy at the rear wheel.
#[derive(Debug, Clone)]
pub struct Biker {
    core: ElementCore<BikerLeg>,
    crank_rate: f64,
    crank_angle: f64,
    rear_wheel_angle: f64,
    mechanical_chunks_since_last_thermal: u32,
}

impl Biker {
    pub fn new(position: DVec2) -> Self {
        Self {
            core: ElementCore::new(position),
            crank_rate: 0.0,
            crank_angle: 0.0,
            rear_wheel_angle: 0.0,
            mechanical_chunks_since_last_thermal: 0,
        }
    }

    pub fn crank_rate(&self) -> f64 {
        self.crank_rate
    }

    /// Pedalling effort as a proportion of the maximum.
    pub fn set_crank_rate(&mut self, crank_rate: f64) {
        self.crank_rate = crank_rate.clamp(0.0, 1.0);
    }

    pub fn crank_angle(&self) -> f64 {
        self.crank_angle
    }

    pub fn rear_wheel_angle(&self) -> f64 {
        self.rear_wheel_angle
    }

    fn chemical_rate(&self) -> f64 {
        self.crank_rate * MAX_ENERGY_PRODUCTION_RATE
    }

    fn next_leg(&mut self, leg: BikerLeg, rng: &mut SimRng) -> LegOutcome<BikerLeg> {
        let position = self.core.position();
        match leg {
            BikerLeg::ToPedal => {
                if self.mechanical_chunks_since_last_thermal + 1 >= THERMAL_CHUNK_PERIOD {
                    self.mechanical_chunks_since_last_thermal = 0;
                    LegOutcome::Continue {
                        leg: BikerLeg::Radiating,
                        path: create_radiated_path(position + PEDAL_OFFSET, 0.0, RADIATED_HEIGHT, rng),
                        speed: ENERGY_CHUNK_VELOCITY,
                        energy_type: Some(EnergyType::Thermal),
                    }
                } else {
                    self.mechanical_chunks_since_last_thermal += 1;
                    LegOutcome::Continue {
                        leg: BikerLeg::ToHub,
                        path: vec![position + REAR_HUB_OFFSET],
                        speed: ENERGY_CHUNK_VELOCITY,
                        energy_type: Some(EnergyType::Mechanical),
                    }
                }
            }
            BikerLeg::ToHub => LegOutcome::Continue {
                leg: BikerLeg::ToChainExit,
                path: vec![position + CHAIN_EXIT_OFFSET],
                speed: ENERGY_CHUNK_VELOCITY,
                energy_type: None,
            },
            BikerLeg::ToChainExit => LegOutcome::Outgoing,
            BikerLeg::Radiating => LegOutcome::Remove,
        }
    }
}

fn biker_state(state: &ElementState) -> Result<&BikerState, EfacError> {
    match state {
        ElementState::Biker(state) => Ok(state),
        other => Err(EfacError::StateMismatch {
            expected: "biker",
            found: other.kind_name(),
        }),
    }
}

impl EnergySystemElement for Biker {
    fn name(&self) -> &'static str {
        "biker"
    }

    fn role(&self) -> ElementRole {
        ElementRole::Source
    }

    fn pipeline(&self) -> &dyn ChunkPipeline {
        &self.core
    }

    fn pipeline_mut(&mut self) -> &mut dyn ChunkPipeline {
        &mut self.core
    }

    fn output_type(&self) -> Option<EnergyType> {
        Some(EnergyType::Mechanical)
    }

    fn accepts(&self, _energy_type: EnergyType) -> bool {
        false
    }

    fn step(&mut self, dt: f64, _incoming: &Energy, rng: &mut SimRng) -> Energy {
        if !self.core.is_active() {
            return Energy::none();
        }
        let crank_speed = self.crank_rate * MAX_CRANK_ANGULAR_VELOCITY;
        self.crank_angle = (self.crank_angle + crank_speed * dt).rem_euclid(TAU);
        self.rear_wheel_angle =
            (self.rear_wheel_angle + crank_speed * CRANK_TO_REAR_WHEEL_RATIO * dt).rem_euclid(TAU);

        let chemical_energy = self.chemical_rate() * dt;
        for _ in 0..accumulate_chunk_energy(&mut self.core, chemical_energy) {
            let position = self.core.position();
            let chunk = EnergyChunk::at(EnergyType::Chemical, position + TORSO_OFFSET);
            let path = create_path_from_offsets(position, &[KNEE_OFFSET, PEDAL_OFFSET]);
            self.core.launch(chunk, BikerLeg::ToPedal, path, ENERGY_CHUNK_VELOCITY);
        }

        self.core.move_chunks(dt);
        for (leg, chunk) in self.core.take_finished() {
            let outcome = self.next_leg(leg, rng);
            self.core.apply(chunk, outcome);
        }
        let rate = self.energy_output_rate();
        rate.with_amount(rate.amount * dt)
    }

    /// Mechanical output: the food energy less what is lost as heat at the pedals.
    fn energy_output_rate(&self) -> Energy {
        let mechanical_share = 1.0 - 1.0 / THERMAL_CHUNK_PERIOD as f64;
        Energy::new(EnergyType::Mechanical, self.chemical_rate() * mechanical_share, 0.0)
    }

    fn deactivate(&mut self) {
        self.core.clear();
        self.core.set_active(false);
        self.mechanical_chunks_since_last_thermal = 0;
    }

    fn state(&self) -> ElementState {
        ElementState::Biker(BikerState {
            crank_rate: self.crank_rate,
            crank_angle: self.crank_angle,
            rear_wheel_angle: self.rear_wheel_angle,
            energy_since_last_chunk: self.core.energy_since_last_chunk,
            mechanical_chunks_since_last_thermal: self.mechanical_chunks_since_last_thermal,
        })
    }

    fn check_state(&self, state: &ElementState) -> Result<(), EfacError> {
        biker_state(state).map(|_| ())
    }

    fn apply_state(&mut self, state: &ElementState) -> Result<(), EfacError> {
        let state = biker_state(state)?;
        self.set_crank_rate(state.crank_rate);
        self.crank_angle = state.crank_angle.rem_euclid(TAU);
        self.rear_wheel_angle = state.rear_wheel_angle.rem_euclid(TAU);
        self.core.energy_since_last_chunk = state.energy_since_last_chunk;
        self.mechanical_chunks_since_last_thermal = state.mechanical_chunks_since_last_thermal;
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
    use rand::SeedableRng;

    #[test]
    fn test_every_fourth_chunk_turns_to_heat() {
        let mut biker = Biker::new(DVec2::ZERO);
        biker.activate();
        biker.set_crank_rate(1.0);
        let mut rng = SimRng::seed_from_u64(4);

        let mut handed_off = Vec::new();
        for _ in 0..60 * 30 {
            biker.step(1.0 / 60.0, &Energy::none(), &mut rng);
            handed_off.extend(biker.extract_outgoing_energy_chunks());
        }
        assert!(handed_off.iter().all(|c| c.energy_type == EnergyType::Mechanical));
        let removed = biker.core.removed_count() as usize;
        assert!(removed > 0);
        // three mechanical for each thermal, give or take those still in transit
        assert!(handed_off.len() >= 2 * removed);
    }

    #[test]
    fn test_crank_turns_with_effort() {
        let mut biker = Biker::new(DVec2::ZERO);
        biker.activate();
        let mut rng = SimRng::seed_from_u64(4);
        biker.step(0.1, &Energy::none(), &mut rng);
        assert_eq!(biker.crank_angle(), 0.0);

        biker.set_crank_rate(0.5);
        biker.step(0.1, &Energy::none(), &mut rng);
        assert!(biker.crank_angle() > 0.0);
        assert!(biker.rear_wheel_angle() > biker.crank_angle());
    }

    #[test]
    fn test_deactivate_clears_chunks() {
        let mut biker = Biker::new(DVec2::ZERO);
        biker.activate();
        biker.set_crank_rate(1.0);
        let mut rng = SimRng::seed_from_u64(4);
        for _ in 0..300 {
            biker.step(1.0 / 60.0, &Energy::none(), &mut rng);
        }
        assert!(!biker.energy_chunks().is_empty());
        biker.deactivate();
        assert!(biker.energy_chunks().is_empty());
        assert_eq!(biker.mover_count(), 0);
        assert_eq!(biker.core.energy_since_last_chunk(), 0.0);
    }
}
