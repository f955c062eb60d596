use crate::config::SimRng;
use crate::constants::ENERGY_CHUNK_VELOCITY;
use crate::energy::{Energy, EnergyType};
use crate::energy_chunk::EnergyChunk;
use crate::energy_chunk_path_mover::{create_path_from_offsets, create_radiated_path};
use crate::error::EfacError;
use crate::math_utils::random_between;
use crate::state::{ElementState, FanState};
use crate::systems::element_core::{ChunkPipeline, ElementCore, LegOutcome};
use crate::systems::{ElementRole, EnergySystemElement, MAX_ENERGY_PRODUCTION_RATE, approach};
use glam::DVec2;
use std::any::Any;
use std::f64::consts::{PI, TAU};
use tracing::trace;

const WIRE_ENTRY_OFFSET: DVec2 = DVec2::new(-0.045, 0.03);
const MOTOR_PATH: [DVec2; 2] = [DVec2::new(0.0, 0.03), MOTOR_OFFSET];
const MOTOR_OFFSET: DVec2 = DVec2::new(0.01, 0.07);
const BLADE_OFFSET: DVec2 = DVec2::new(0.04, 0.09);
const AIR_TRAVEL_DISTANCE: f64 = 0.2;
const AIR_SPREAD: f64 = 0.02;
const HEAT_RADIATION_HEIGHT: f64 = 0.1;
// share of the electrical energy the motor loses as heat
const MOTOR_HEAT_FRACTION: f64 = 0.3;
const MAX_ANGULAR_VELOCITY: f64 = 4.0 * PI; // rad/s
const BLADE_RESPONSE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FanLeg {
    ToMotor,
    ToBlade,
    Blowing,
    Radiating,
}

/// Electric fan; most of its input becomes moving air, some warms the motor.
#[derive(Debug, Clone)]
pub struct Fan {
    core: ElementCore<FanLeg>,
    blade_angle: f64,
    angular_velocity: f64,
    heat_accumulator: f64,
}

impl Fan {
    pub fn new(position: DVec2) -> Self {
        Self {
            core: ElementCore::new(position),
            blade_angle: 0.0,
            angular_velocity: 0.0,
            heat_accumulator: 0.0,
        }
    }

    pub fn blade_angle(&self) -> f64 {
        self.blade_angle
    }

    pub fn angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    fn next_leg(&mut self, leg: FanLeg, rng: &mut SimRng) -> LegOutcome<FanLeg> {
        let position = self.core.position();
        match leg {
            FanLeg::ToMotor => {
                self.heat_accumulator += MOTOR_HEAT_FRACTION;
                if self.heat_accumulator >= 1.0 {
                    self.heat_accumulator -= 1.0;
                    LegOutcome::Continue {
                        leg: FanLeg::Radiating,
                        path: create_radiated_path(position + MOTOR_OFFSET, 0.0, HEAT_RADIATION_HEIGHT, rng),
                        speed: ENERGY_CHUNK_VELOCITY,
                        energy_type: Some(EnergyType::Thermal),
                    }
                } else {
                    LegOutcome::Continue {
                        leg: FanLeg::ToBlade,
                        path: vec![position + BLADE_OFFSET],
                        speed: ENERGY_CHUNK_VELOCITY,
                        energy_type: Some(EnergyType::Mechanical),
                    }
                }
            }
            FanLeg::ToBlade => {
                let spread = random_between(rng, -AIR_SPREAD, AIR_SPREAD);
                LegOutcome::Continue {
                    leg: FanLeg::Blowing,
                    path: vec![position + BLADE_OFFSET + DVec2::new(AIR_TRAVEL_DISTANCE, spread)],
                    speed: ENERGY_CHUNK_VELOCITY * 2.0,
                    energy_type: None,
                }
            }
            FanLeg::Blowing | FanLeg::Radiating => LegOutcome::Remove,
        }
    }
}

fn fan_state(state: &ElementState) -> Result<&FanState, EfacError> {
    match state {
        ElementState::Fan(state) => Ok(state),
        other => Err(EfacError::StateMismatch {
            expected: "fan",
            found: other.kind_name(),
        }),
    }
}

impl EnergySystemElement for Fan {
    fn name(&self) -> &'static str {
        "fan"
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
        let target = (incoming_rate / MAX_ENERGY_PRODUCTION_RATE).min(1.0) * MAX_ANGULAR_VELOCITY;
        self.angular_velocity = approach(self.angular_velocity, target, BLADE_RESPONSE, dt);
        self.blade_angle = (self.blade_angle + self.angular_velocity * dt).rem_euclid(TAU);

        for chunk in self.core.take_incoming() {
            if chunk.energy_type != EnergyType::Electrical {
                trace!(chunk = chunk.id().0, "fan ignores non-electrical chunk");
                self.core.apply(chunk, LegOutcome::Remove);
                continue;
            }
            let path = create_path_from_offsets(self.core.position(), &MOTOR_PATH);
            self.core.launch(chunk, FanLeg::ToMotor, path, ENERGY_CHUNK_VELOCITY);
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
        self.angular_velocity = 0.0;
        self.heat_accumulator = 0.0;
    }

    fn state(&self) -> ElementState {
        ElementState::Fan(FanState {
            blade_angle: self.blade_angle,
            angular_velocity: self.angular_velocity,
            heat_accumulator: self.heat_accumulator,
        })
    }

    fn check_state(&self, state: &ElementState) -> Result<(), EfacError> {
        fan_state(state).map(|_| ())
    }

    fn apply_state(&mut self, state: &ElementState) -> Result<(), EfacError> {
        let state = fan_state(state)?;
        self.blade_angle = state.blade_angle.rem_euclid(TAU);
        self.angular_velocity = state.angular_velocity.clamp(0.0, MAX_ANGULAR_VELOCITY);
        self.heat_accumulator = state.heat_accumulator;
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
    use crate::constants::MAX_PRELOAD_TIME;
    use more_asserts::assert_gt;
    use rand::SeedableRng;

    #[test]
    fn test_motor_loses_some_energy_as_heat() {
        let mut fan = Fan::new(DVec2::ZERO);
        fan.activate();
        let mut rng = SimRng::seed_from_u64(21);
        let chunks = (0..10).map(|_| EnergyChunk::at(EnergyType::Electrical, WIRE_ENTRY_OFFSET)).collect();
        fan.inject_energy_chunks(chunks);
        // 0.085 m to the motor at 0.04 m/s
        for _ in 0..150 {
            fan.step(1.0 / 60.0, &Energy::none(), &mut rng);
        }
        let heat = fan.energy_chunks().iter().filter(|c| c.energy_type == EnergyType::Thermal).count();
        let mechanical = fan.energy_chunks().iter().filter(|c| c.energy_type == EnergyType::Mechanical).count();
        assert_eq!(heat + mechanical, 10);
        assert!((2..=3).contains(&heat));
    }

    #[test]
    fn test_blades_spin_with_input_and_stop_on_deactivate() {
        let mut fan = Fan::new(DVec2::ZERO);
        fan.activate();
        let mut rng = SimRng::seed_from_u64(21);
        let dt = 1.0 / 60.0;
        let input = Energy::new(EnergyType::Electrical, MAX_ENERGY_PRODUCTION_RATE * dt, 0.0);
        fan.preload_energy_chunks(&input.with_amount(MAX_ENERGY_PRODUCTION_RATE), MAX_PRELOAD_TIME, &mut rng);
        for _ in 0..120 {
            fan.step(dt, &input, &mut rng);
        }
        assert_gt!(fan.angular_velocity(), 0.0);
        assert!(!fan.energy_chunks().is_empty());

        fan.deactivate();
        assert!(fan.energy_chunks().is_empty());
        assert_eq!(fan.mover_count(), 0);
        assert_eq!(fan.angular_velocity(), 0.0);
    }
}
