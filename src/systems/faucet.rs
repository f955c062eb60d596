use crate::config::SimRng;
use crate::energy::{Energy, EnergyType};
use crate::energy_chunk::EnergyChunk;
use crate::error::EfacError;
use crate::math_utils::random_between;
use crate::state::{ElementState, FaucetState};
use crate::systems::element_core::{ChunkPipeline, ElementCore, LegOutcome};
use crate::systems::{ElementRole, EnergySystemElement, MAX_ENERGY_PRODUCTION_RATE, accumulate_chunk_energy};
use glam::DVec2;
use std::any::Any;
use std::f64::consts::FRAC_PI_2;

const OUTLET_OFFSET: DVec2 = DVec2::new(0.095, 0.14);
// where falling water meets the generator wheel
const WHEEL_CONTACT_OFFSET: DVec2 = DVec2::new(0.095, 0.055);
const FALL_OFF_OFFSET: DVec2 = DVec2::new(0.095, -0.05);
const OUTLET_JITTER: f64 = 0.004;
const FALLING_ENERGY_CHUNK_VELOCITY: f64 = 0.09;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FaucetLeg {
    ToWheel,
    FallOff,
}

/// Water source. Every other falling chunk is handed to the wheel below;
/// the rest fall past it.
#[derive(Debug, Clone)]
pub struct Faucet {
    core: ElementCore<FaucetLeg>,
    flow_proportion: f64,
    transfer_next_chunk: bool,
}

impl Faucet {
    pub fn new(position: DVec2) -> Self {
        Self {
            core: ElementCore::new(position),
            flow_proportion: 0.0,
            transfer_next_chunk: true,
        }
    }

    pub fn flow_proportion(&self) -> f64 {
        self.flow_proportion
    }

    pub fn set_flow_proportion(&mut self, flow_proportion: f64) {
        self.flow_proportion = flow_proportion.clamp(0.0, 1.0);
    }

    fn emit_chunk(&mut self, rng: &mut SimRng) {
        let position = self.core.position();
        let jitter = DVec2::new(random_between(rng, -OUTLET_JITTER, OUTLET_JITTER), 0.0);
        let chunk = EnergyChunk::at(EnergyType::Mechanical, position + OUTLET_OFFSET + jitter);

        let transfer = self.core.handoff_enabled() && self.transfer_next_chunk;
        self.transfer_next_chunk = !self.transfer_next_chunk;
        let (leg, offset) = if transfer {
            (FaucetLeg::ToWheel, WHEEL_CONTACT_OFFSET)
        } else {
            (FaucetLeg::FallOff, FALL_OFF_OFFSET)
        };
        let destination = DVec2::new(chunk.position.x, position.y + offset.y);
        self.core.launch(chunk, leg, vec![destination], FALLING_ENERGY_CHUNK_VELOCITY);
    }

    fn next_leg(&self, leg: FaucetLeg) -> LegOutcome<FaucetLeg> {
        match leg {
            FaucetLeg::ToWheel => LegOutcome::Outgoing,
            FaucetLeg::FallOff => LegOutcome::Remove,
        }
    }
}

fn faucet_state(state: &ElementState) -> Result<&FaucetState, EfacError> {
    match state {
        ElementState::Faucet(state) => Ok(state),
        other => Err(EfacError::StateMismatch {
            expected: "faucet",
            found: other.kind_name(),
        }),
    }
}

impl EnergySystemElement for Faucet {
    fn name(&self) -> &'static str {
        "faucet"
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
        let rate = self.energy_output_rate();
        for _ in 0..accumulate_chunk_energy(&mut self.core, rate.amount * dt) {
            self.emit_chunk(rng);
        }

        self.core.move_chunks(dt);
        for (leg, chunk) in self.core.take_finished() {
            let outcome = self.next_leg(leg);
            self.core.apply(chunk, outcome);
        }
        rate.with_amount(rate.amount * dt)
    }

    fn energy_output_rate(&self) -> Energy {
        Energy::new(
            EnergyType::Mechanical,
            self.flow_proportion * MAX_ENERGY_PRODUCTION_RATE,
            -FRAC_PI_2,
        )
    }

    fn deactivate(&mut self) {
        self.core.clear();
        self.core.set_active(false);
        self.transfer_next_chunk = true;
    }

    fn state(&self) -> ElementState {
        ElementState::Faucet(FaucetState {
            flow_proportion: self.flow_proportion,
            energy_since_last_chunk: self.core.energy_since_last_chunk,
            transfer_next_chunk: self.transfer_next_chunk,
        })
    }

    fn check_state(&self, state: &ElementState) -> Result<(), EfacError> {
        faucet_state(state).map(|_| ())
    }

    fn apply_state(&mut self, state: &ElementState) -> Result<(), EfacError> {
        let state = faucet_state(state)?;
        self.set_flow_proportion(state.flow_proportion);
        self.core.energy_since_last_chunk = state.energy_since_last_chunk;
        self.transfer_next_chunk = state.transfer_next_chunk;
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
    use crate::constants::ENERGY_PER_CHUNK;
    use rand::SeedableRng;

    fn running_faucet() -> Faucet {
        let mut faucet = Faucet::new(DVec2::ZERO);
        faucet.set_flow_proportion(1.0);
        faucet.activate();
        faucet
    }

    #[test]
    fn test_alternate_chunks_reach_the_wheel() {
        let mut faucet = running_faucet();
        let mut rng = SimRng::seed_from_u64(3);
        let mut handed_off = Vec::new();
        for _ in 0..60 * 20 {
            faucet.step(1.0 / 60.0, &Energy::none(), &mut rng);
            handed_off.extend(faucet.extract_outgoing_energy_chunks());
        }
        assert!(!handed_off.is_empty());
        for chunk in &handed_off {
            assert_eq!(chunk.energy_type, EnergyType::Mechanical);
            assert!((chunk.position.y - WHEEL_CONTACT_OFFSET.y).abs() < 1e-9);
        }
        // every other chunk falls past the wheel
        assert!(faucet.core.removed_count() > 0);
    }

    #[test]
    fn test_nothing_handed_off_without_downstream() {
        let mut faucet = running_faucet();
        faucet.set_handoff_enabled(false);
        let mut rng = SimRng::seed_from_u64(3);
        for _ in 0..60 * 10 {
            faucet.step(1.0 / 60.0, &Energy::none(), &mut rng);
            assert!(faucet.extract_outgoing_energy_chunks().is_empty());
        }
    }

    #[test]
    fn test_long_step_emits_every_chunk_it_paid_for() {
        let mut faucet = running_faucet();
        let mut rng = SimRng::seed_from_u64(3);
        faucet.step(1.0, &Energy::none(), &mut rng);

        let emitted = faucet.energy_chunks().len() as u64 + faucet.core.removed_count();
        assert_eq!(emitted, (MAX_ENERGY_PRODUCTION_RATE / ENERGY_PER_CHUNK).floor() as u64);
        assert!(faucet.core.energy_since_last_chunk < ENERGY_PER_CHUNK);
    }

    #[test]
    fn test_inactive_faucet_does_nothing() {
        let mut faucet = Faucet::new(DVec2::ZERO);
        faucet.set_flow_proportion(1.0);
        let mut rng = SimRng::seed_from_u64(3);
        let energy = faucet.step(1.0, &Energy::none(), &mut rng);
        assert!(energy.is_none());
        assert!(faucet.energy_chunks().is_empty());
    }

    #[test]
    fn test_state_round_trip_and_mismatch() {
        let mut faucet = running_faucet();
        faucet.core.energy_since_last_chunk = ENERGY_PER_CHUNK * 0.5;
        let state = faucet.state();

        let mut restored = Faucet::new(DVec2::ZERO);
        restored.apply_state(&state).expect("faucet state");
        assert_eq!(restored.state(), state);

        let wrong = ElementState::LightBulb(crate::state::LightBulbState {
            lit_proportion: 0.0,
            light_accumulator: 0.0,
        });
        assert!(matches!(
            restored.apply_state(&wrong),
            Err(EfacError::StateMismatch { expected: "faucet", .. })
        ));
    }
}
