use crate::config::SimRng;
use crate::constants::ENERGY_CHUNK_VELOCITY;
use crate::energy::{Energy, EnergyType};
use crate::energy_chunk::EnergyChunk;
use crate::energy_chunk_path_mover::{create_path_from_offsets, create_random_straight_path};
use crate::error::EfacError;
use crate::math_utils::random_between;
use crate::state::{ElementState, TeaKettleState};
use crate::systems::element_core::{ChunkPipeline, ElementCore, LegOutcome};
use crate::systems::{
    ElementRole, EnergySystemElement, MAX_ENERGY_PRODUCTION_RATE, accumulate_chunk_energy, approach,
    preload_pipeline,
};
use glam::DVec2;
use std::any::Any;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

const BURNER_TOP_OFFSET: DVec2 = DVec2::new(0.0, 0.005);
const BURNER_HALF_WIDTH: f64 = 0.02;
const KETTLE_BODY_HEIGHT: f64 = 0.05;
const SPOUT_BASE_OFFSET: DVec2 = DVec2::new(0.03, 0.07);
const SPOUT_TIP_OFFSET: DVec2 = DVec2::new(0.045, 0.085);
// where steam reaches the wheel of a converter to the right
const STEAM_HANDOFF_OFFSET: DVec2 = DVec2::new(0.09, 0.1);
const STEAM_DISSIPATE_HEIGHT: f64 = 0.15;
// fraction of the production-rate gap closed per second; the water takes time to boil
const PRODUCTION_RATE_RESPONSE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KettleLeg {
    ToWater,
    ToSpout,
    ToWheel,
    Dissipating,
}

/// Steam source heated by a burner underneath.
#[derive(Debug, Clone)]
pub struct TeaKettle {
    core: ElementCore<KettleLeg>,
    heat_proportion: f64,
    energy_production_rate: f64,
    transfer_next_chunk: bool,
}

impl TeaKettle {
    pub fn new(position: DVec2) -> Self {
        Self {
            core: ElementCore::new(position),
            heat_proportion: 0.0,
            energy_production_rate: 0.0,
            transfer_next_chunk: true,
        }
    }

    pub fn heat_proportion(&self) -> f64 {
        self.heat_proportion
    }

    pub fn set_heat_proportion(&mut self, heat_proportion: f64) {
        self.heat_proportion = heat_proportion.clamp(0.0, 1.0);
    }

    pub fn energy_production_rate(&self) -> f64 {
        self.energy_production_rate
    }

    fn emit_chunk(&mut self, rng: &mut SimRng) {
        let position = self.core.position();
        let x = random_between(rng, -BURNER_HALF_WIDTH, BURNER_HALF_WIDTH);
        let start = position + BURNER_TOP_OFFSET + DVec2::new(x, 0.0);
        let chunk = EnergyChunk::at(EnergyType::Thermal, start);
        let path = vec![DVec2::new(start.x, position.y + KETTLE_BODY_HEIGHT)];
        self.core.launch(chunk, KettleLeg::ToWater, path, ENERGY_CHUNK_VELOCITY);
    }

    fn next_leg(&mut self, leg: KettleLeg, rng: &mut SimRng) -> LegOutcome<KettleLeg> {
        let position = self.core.position();
        match leg {
            KettleLeg::ToWater => LegOutcome::Continue {
                leg: KettleLeg::ToSpout,
                path: create_path_from_offsets(position, &[SPOUT_BASE_OFFSET, SPOUT_TIP_OFFSET]),
                speed: ENERGY_CHUNK_VELOCITY,
                energy_type: Some(EnergyType::Mechanical),
            },
            KettleLeg::ToSpout => {
                let transfer = self.core.handoff_enabled() && self.transfer_next_chunk;
                self.transfer_next_chunk = !self.transfer_next_chunk;
                if transfer {
                    LegOutcome::Continue {
                        leg: KettleLeg::ToWheel,
                        path: vec![position + STEAM_HANDOFF_OFFSET],
                        speed: ENERGY_CHUNK_VELOCITY,
                        energy_type: None,
                    }
                } else {
                    LegOutcome::Continue {
                        leg: KettleLeg::Dissipating,
                        path: create_random_straight_path(
                            position + SPOUT_TIP_OFFSET,
                            FRAC_PI_4,
                            FRAC_PI_2,
                            STEAM_DISSIPATE_HEIGHT,
                            rng,
                        ),
                        speed: ENERGY_CHUNK_VELOCITY,
                        energy_type: None,
                    }
                }
            }
            KettleLeg::ToWheel => LegOutcome::Outgoing,
            KettleLeg::Dissipating => LegOutcome::Remove,
        }
    }
}

fn tea_kettle_state(state: &ElementState) -> Result<&TeaKettleState, EfacError> {
    match state {
        ElementState::TeaKettle(state) => Ok(state),
        other => Err(EfacError::StateMismatch {
            expected: "tea kettle",
            found: other.kind_name(),
        }),
    }
}

impl EnergySystemElement for TeaKettle {
    fn name(&self) -> &'static str {
        "tea kettle"
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
        self.energy_production_rate = approach(
            self.energy_production_rate,
            self.heat_proportion * MAX_ENERGY_PRODUCTION_RATE,
            PRODUCTION_RATE_RESPONSE,
            dt,
        );
        for _ in 0..accumulate_chunk_energy(&mut self.core, self.energy_production_rate * dt) {
            self.emit_chunk(rng);
        }

        self.core.move_chunks(dt);
        for (leg, chunk) in self.core.take_finished() {
            let outcome = self.next_leg(leg, rng);
            self.core.apply(chunk, outcome);
        }
        let rate = self.energy_output_rate();
        rate.with_amount(rate.amount * dt)
    }

    fn energy_output_rate(&self) -> Energy {
        Energy::new(EnergyType::Mechanical, self.energy_production_rate, 0.0)
    }

    /// A kettle fast-forwards from the burner setting, not from the still-cold rate.
    fn preload_energy_chunks(&mut self, _incoming_rate: &Energy, max_time: f64, rng: &mut SimRng) {
        self.energy_production_rate = self.heat_proportion * MAX_ENERGY_PRODUCTION_RATE;
        preload_pipeline(self, &Energy::none(), max_time, rng);
    }

    fn deactivate(&mut self) {
        self.core.clear();
        self.core.set_active(false);
        self.energy_production_rate = 0.0;
        self.transfer_next_chunk = true;
    }

    fn state(&self) -> ElementState {
        ElementState::TeaKettle(TeaKettleState {
            heat_proportion: self.heat_proportion,
            energy_production_rate: self.energy_production_rate,
            energy_since_last_chunk: self.core.energy_since_last_chunk,
            transfer_next_chunk: self.transfer_next_chunk,
        })
    }

    fn check_state(&self, state: &ElementState) -> Result<(), EfacError> {
        tea_kettle_state(state).map(|_| ())
    }

    fn apply_state(&mut self, state: &ElementState) -> Result<(), EfacError> {
        let state = tea_kettle_state(state)?;
        self.set_heat_proportion(state.heat_proportion);
        self.energy_production_rate = state.energy_production_rate.max(0.0);
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
