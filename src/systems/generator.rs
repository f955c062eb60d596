use crate::config::SimRng;
use crate::constants::ENERGY_CHUNK_VELOCITY;
use crate::energy::{Energy, EnergyType};
use crate::energy_chunk::EnergyChunk;
use crate::energy_chunk_path_mover::create_path_from_offsets;
use crate::error::EfacError;
use crate::state::{ElementState, GeneratorState};
use crate::systems::element_core::{ChunkPipeline, ElementCore, LegOutcome};
use crate::systems::{ElementRole, EnergySystemElement, MAX_ENERGY_PRODUCTION_RATE, approach};
use glam::DVec2;
use std::any::Any;
use std::f64::consts::{PI, TAU};
use tracing::trace;

const WHEEL_HUB_OFFSET: DVec2 = DVec2::new(0.0, 0.06);
const WHEEL_RADIUS: f64 = 0.04;
const LEFT_COIL_PATH: [DVec2; 3] = [
    DVec2::new(0.02, 0.08),
    DVec2::new(0.05, 0.07),
    WIRE_EXIT_OFFSET,
];
const RIGHT_COIL_PATH: [DVec2; 3] = [
    DVec2::new(0.02, 0.04),
    DVec2::new(0.05, 0.05),
    WIRE_EXIT_OFFSET,
];
const WIRE_EXIT_OFFSET: DVec2 = DVec2::new(0.07, 0.03);
const RETURN_PATH: [DVec2; 2] = [DVec2::new(0.0, 0.0), DVec2::new(-0.03, 0.0)];
const MAX_ROTATIONAL_VELOCITY: f64 = 16.0 * PI; // rad/s
// fraction of the wheel-speed gap closed per second
const WHEEL_RESPONSE: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GeneratorLeg {
    ToHub,
    ThroughCoil,
    Return,
}

/// Turns mechanical energy arriving at its wheel into electricity.
///
/// Every chunk converted at the hub is shadowed by a hidden chunk running the
/// return wire, so the hand-off reads as a closed circuit.
#[derive(Debug, Clone)]
pub struct Generator {
    core: ElementCore<GeneratorLeg>,
    wheel_rotational_velocity: f64,
    wheel_rotational_angle: f64,
    route_next_chunk_left: bool,
}

impl Generator {
    pub fn new(position: DVec2) -> Self {
        Self {
            core: ElementCore::new(position),
            wheel_rotational_velocity: 0.0,
            wheel_rotational_angle: 0.0,
            route_next_chunk_left: true,
        }
    }

    pub fn wheel_rotational_velocity(&self) -> f64 {
        self.wheel_rotational_velocity
    }

    pub fn wheel_rotational_angle(&self) -> f64 {
        self.wheel_rotational_angle
    }

    fn receive(&mut self, chunk: EnergyChunk) {
        if chunk.energy_type != EnergyType::Mechanical {
            trace!(chunk = chunk.id().0, energy_type = chunk.energy_type.as_str(), "generator ignores chunk");
            self.core.apply(chunk, LegOutcome::Remove);
            return;
        }
        let hub = self.core.position() + WHEEL_HUB_OFFSET;
        self.core.launch(chunk, GeneratorLeg::ToHub, vec![hub], ENERGY_CHUNK_VELOCITY);
    }

    fn next_leg(&mut self, leg: GeneratorLeg) -> LegOutcome<GeneratorLeg> {
        let position = self.core.position();
        match leg {
            GeneratorLeg::ToHub => {
                let hidden = EnergyChunk::at(EnergyType::Hidden, position + WHEEL_HUB_OFFSET);
                let return_path = create_path_from_offsets(position, &RETURN_PATH);
                self.core.launch(hidden, GeneratorLeg::Return, return_path, ENERGY_CHUNK_VELOCITY);

                let coil = if self.route_next_chunk_left {
                    &LEFT_COIL_PATH
                } else {
                    &RIGHT_COIL_PATH
                };
                self.route_next_chunk_left = !self.route_next_chunk_left;
                LegOutcome::Continue {
                    leg: GeneratorLeg::ThroughCoil,
                    path: create_path_from_offsets(position, coil),
                    speed: ENERGY_CHUNK_VELOCITY,
                    energy_type: Some(EnergyType::Electrical),
                }
            }
            GeneratorLeg::ThroughCoil => LegOutcome::Outgoing,
            GeneratorLeg::Return => LegOutcome::Remove,
        }
    }
}

fn generator_state(state: &ElementState) -> Result<&GeneratorState, EfacError> {
    match state {
        ElementState::Generator(state) => Ok(state),
        other => Err(EfacError::StateMismatch {
            expected: "generator",
            found: other.kind_name(),
        }),
    }
}

impl EnergySystemElement for Generator {
    fn name(&self) -> &'static str {
        "generator"
    }

    fn role(&self) -> ElementRole {
        ElementRole::Converter
    }

    fn pipeline(&self) -> &dyn ChunkPipeline {
        &self.core
    }

    fn pipeline_mut(&mut self) -> &mut dyn ChunkPipeline {
        &mut self.core
    }

    fn output_type(&self) -> Option<EnergyType> {
        Some(EnergyType::Electrical)
    }

    fn accepts(&self, energy_type: EnergyType) -> bool {
        energy_type == EnergyType::Mechanical
    }

    fn step(&mut self, dt: f64, incoming: &Energy, _rng: &mut SimRng) -> Energy {
        if !self.core.is_active() {
            return Energy::none();
        }
        let incoming_rate = if incoming.energy_type == EnergyType::Mechanical && dt > 0.0 {
            incoming.amount / dt
        } else {
            0.0
        };
        let target = (incoming_rate / MAX_ENERGY_PRODUCTION_RATE).min(1.0) * MAX_ROTATIONAL_VELOCITY;
        self.wheel_rotational_velocity = approach(self.wheel_rotational_velocity, target, WHEEL_RESPONSE, dt);
        self.wheel_rotational_angle = (self.wheel_rotational_angle + self.wheel_rotational_velocity * dt).rem_euclid(TAU);

        for chunk in self.core.take_incoming() {
            self.receive(chunk);
        }
        self.core.move_chunks(dt);
        for (leg, chunk) in self.core.take_finished() {
            let outcome = self.next_leg(leg);
            self.core.apply(chunk, outcome);
        }
        let rate = self.energy_output_rate();
        rate.with_amount(rate.amount * dt)
    }

    /// Electrical output follows the wheel speed, so it rises and falls with some inertia.
    fn energy_output_rate(&self) -> Energy {
        Energy::new(
            EnergyType::Electrical,
            self.wheel_rotational_velocity / MAX_ROTATIONAL_VELOCITY * MAX_ENERGY_PRODUCTION_RATE,
            0.0,
        )
    }

    fn preload_entry_chunk(&self, energy_type: EnergyType) -> Option<EnergyChunk> {
        let rim = self.core.position() + WHEEL_HUB_OFFSET - DVec2::new(WHEEL_RADIUS, 0.0);
        self.accepts(energy_type).then(|| EnergyChunk::at(energy_type, rim))
    }

    fn deactivate(&mut self) {
        self.core.clear();
        self.core.set_active(false);
        self.wheel_rotational_velocity = 0.0;
        self.route_next_chunk_left = true;
    }

    fn state(&self) -> ElementState {
        ElementState::Generator(GeneratorState {
            wheel_rotational_velocity: self.wheel_rotational_velocity,
            wheel_rotational_angle: self.wheel_rotational_angle,
            route_next_chunk_left: self.route_next_chunk_left,
        })
    }

    fn check_state(&self, state: &ElementState) -> Result<(), EfacError> {
        generator_state(state).map(|_| ())
    }

    fn apply_state(&mut self, state: &ElementState) -> Result<(), EfacError> {
        let state = generator_state(state)?;
        self.wheel_rotational_velocity = state.wheel_rotational_velocity.clamp(0.0, MAX_ROTATIONAL_VELOCITY);
        self.wheel_rotational_angle = state.wheel_rotational_angle.rem_euclid(TAU);
        self.route_next_chunk_left = state.route_next_chunk_left;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
