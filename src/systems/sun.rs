use crate::config::SimRng;
use crate::constants::{ENERGY_CHUNK_VELOCITY, ENERGY_PER_CHUNK, SOURCE_TO_CONVERTER_OFFSET};
use crate::energy::{Energy, EnergyType};
use crate::energy_chunk::EnergyChunk;
use crate::error::EfacError;
use crate::math_utils::{angle_of, polar, random_between, wrap_signed_angle};
use crate::state::{ElementState, SunState};
use crate::systems::element_core::{ChunkPipeline, ElementCore, LegOutcome};
use crate::systems::{ElementRole, EnergySystemElement, accumulate_chunk_energy};
use glam::DVec2;
use rand::Rng;
use rand::seq::SliceRandom;
use std::any::Any;
use std::f64::consts::{PI, TAU};

const SUN_CENTER_OFFSET: DVec2 = DVec2::new(0.0, 0.25);
const SUN_RADIUS: f64 = 0.02;
// centre of the solar panel's face, relative to the sun's position
const PANEL_TARGET_OFFSET: DVec2 = DVec2::new(SOURCE_TO_CONVERTER_OFFSET.x, 0.05);
const PANEL_CONE_HALF_ANGLE: f64 = PI / 8.0;
const NUM_EMISSION_SECTORS: usize = 10;
const RAY_LENGTH: f64 = 0.4;
// fraction of panel-bound light the clouds stop at full cloudiness
const CLOUD_ABSORPTION: f64 = 0.8;
const EMISSION_ENERGY_RATE: f64 = 8.0 * ENERGY_PER_CHUNK; // J/s
const LIGHT_VELOCITY: f64 = ENERGY_CHUNK_VELOCITY * 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SunLeg {
    ToPanel,
    ToCloud,
    Radiating,
}

/// Light source radiating in every direction.
///
/// Emission angles cycle through a shuffled set of sectors so rays spread
/// evenly. Rays inside the cone toward the panel are handed on unless a cloud
/// absorbs them.
#[derive(Debug, Clone)]
pub struct Sun {
    core: ElementCore<SunLeg>,
    cloudiness: f64,
    sector_order: Vec<usize>,
    current_sector_index: usize,
}

impl Sun {
    pub fn new(position: DVec2) -> Self {
        Self {
            core: ElementCore::new(position),
            cloudiness: 0.0,
            sector_order: (0..NUM_EMISSION_SECTORS).collect(),
            current_sector_index: 0,
        }
    }

    pub fn cloudiness(&self) -> f64 {
        self.cloudiness
    }

    pub fn set_cloudiness(&mut self, cloudiness: f64) {
        self.cloudiness = cloudiness.clamp(0.0, 1.0);
    }

    fn panel_angle() -> f64 {
        angle_of(PANEL_TARGET_OFFSET - SUN_CENTER_OFFSET)
    }

    fn next_emission_angle(&mut self, rng: &mut SimRng) -> f64 {
        if self.current_sector_index >= self.sector_order.len() {
            self.sector_order.shuffle(rng);
            self.current_sector_index = 0;
        }
        let sector = self.sector_order[self.current_sector_index];
        self.current_sector_index += 1;
        let width = TAU / NUM_EMISSION_SECTORS as f64;
        sector as f64 * width + random_between(rng, 0.0, width)
    }

    fn emit_chunk(&mut self, rng: &mut SimRng) {
        let angle = self.next_emission_angle(rng);
        let center = self.core.position() + SUN_CENTER_OFFSET;
        let chunk = EnergyChunk::at(EnergyType::Light, center + polar(SUN_RADIUS, angle));

        let toward_panel = wrap_signed_angle(angle - Self::panel_angle()).abs() < PANEL_CONE_HALF_ANGLE;
        let panel_distance = (PANEL_TARGET_OFFSET - SUN_CENTER_OFFSET).length();
        let (leg, distance) = if toward_panel && self.core.handoff_enabled() {
            if rng.random::<f64>() < self.cloudiness * CLOUD_ABSORPTION {
                (SunLeg::ToCloud, panel_distance * 0.5)
            } else {
                (SunLeg::ToPanel, panel_distance)
            }
        } else {
            (SunLeg::Radiating, RAY_LENGTH)
        };
        self.core.launch(chunk, leg, vec![center + polar(distance, angle)], LIGHT_VELOCITY);
    }

    fn next_leg(&self, leg: SunLeg) -> LegOutcome<SunLeg> {
        match leg {
            SunLeg::ToPanel => LegOutcome::Outgoing,
            SunLeg::ToCloud | SunLeg::Radiating => LegOutcome::Remove,
        }
    }
}

/// The sun's part of `state`, provided its sector order is a permutation.
fn sun_state(state: &ElementState) -> Result<&SunState, EfacError> {
    let ElementState::Sun(state) = state else {
        return Err(EfacError::StateMismatch {
            expected: "sun",
            found: state.kind_name(),
        });
    };
    let mut sorted = state.sector_order.clone();
    sorted.sort_unstable();
    if !sorted.iter().copied().eq(0..NUM_EMISSION_SECTORS) {
        return Err(EfacError::StateMismatch {
            expected: "sun with a permutation of its emission sectors",
            found: "sun",
        });
    }
    Ok(state)
}

impl EnergySystemElement for Sun {
    fn name(&self) -> &'static str {
        "sun"
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
        Some(EnergyType::Light)
    }

    fn accepts(&self, _energy_type: EnergyType) -> bool {
        false
    }

    fn step(&mut self, dt: f64, _incoming: &Energy, rng: &mut SimRng) -> Energy {
        if !self.core.is_active() {
            return Energy::none();
        }
        for _ in 0..accumulate_chunk_energy(&mut self.core, EMISSION_ENERGY_RATE * dt) {
            self.emit_chunk(rng);
        }

        self.core.move_chunks(dt);
        for (leg, chunk) in self.core.take_finished() {
            let outcome = self.next_leg(leg);
            self.core.apply(chunk, outcome);
        }
        let rate = self.energy_output_rate();
        rate.with_amount(rate.amount * dt)
    }

    /// Light reaching the panel: the cone's share of the emission, less what the clouds absorb.
    fn energy_output_rate(&self) -> Energy {
        let cone_fraction = 2.0 * PANEL_CONE_HALF_ANGLE / TAU;
        Energy::new(
            EnergyType::Light,
            EMISSION_ENERGY_RATE * cone_fraction * (1.0 - self.cloudiness * CLOUD_ABSORPTION),
            Self::panel_angle(),
        )
    }

    fn deactivate(&mut self) {
        self.core.clear();
        self.core.set_active(false);
        self.current_sector_index = self.sector_order.len();
    }

    fn state(&self) -> ElementState {
        ElementState::Sun(SunState {
            cloudiness: self.cloudiness,
            energy_since_last_chunk: self.core.energy_since_last_chunk,
            sector_order: self.sector_order.clone(),
            current_sector_index: self.current_sector_index,
        })
    }

    fn check_state(&self, state: &ElementState) -> Result<(), EfacError> {
        sun_state(state).map(|_| ())
    }

    fn apply_state(&mut self, state: &ElementState) -> Result<(), EfacError> {
        let state = sun_state(state)?;
        self.set_cloudiness(state.cloudiness);
        self.core.energy_since_last_chunk = state.energy_since_last_chunk;
        self.sector_order = state.sector_order.clone();
        self.current_sector_index = state.current_sector_index.min(NUM_EMISSION_SECTORS);
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

    fn run(sun: &mut Sun, seconds: usize, rng: &mut SimRng) -> Vec<EnergyChunk> {
        let mut handed_off = Vec::new();
        for _ in 0..60 * seconds {
            sun.step(1.0 / 60.0, &Energy::none(), rng);
            handed_off.extend(sun.extract_outgoing_energy_chunks());
        }
        handed_off
    }

    #[test]
    fn test_every_sector_used_once_per_cycle() {
        let mut sun = Sun::new(DVec2::ZERO);
        let mut rng = SimRng::seed_from_u64(8);
        let width = TAU / NUM_EMISSION_SECTORS as f64;
        let mut sectors: Vec<usize> = (0..NUM_EMISSION_SECTORS * 2)
            .map(|_| (sun.next_emission_angle(&mut rng) / width) as usize)
            .collect();
        let second = sectors.split_off(NUM_EMISSION_SECTORS);
        sectors.sort_unstable();
        assert!(sectors.into_iter().eq(0..NUM_EMISSION_SECTORS));
        let mut second = second;
        second.sort_unstable();
        assert!(second.into_iter().eq(0..NUM_EMISSION_SECTORS));
    }

    #[test]
    fn test_clear_sky_light_reaches_the_panel() {
        let mut sun = Sun::new(DVec2::ZERO);
        sun.activate();
        let mut rng = SimRng::seed_from_u64(2);
        let handed_off = run(&mut sun, 20, &mut rng);
        assert!(!handed_off.is_empty());
        assert!(handed_off.iter().all(|c| c.energy_type == EnergyType::Light));
    }

    #[test]
    fn test_clouds_reduce_output() {
        let mut sun = Sun::new(DVec2::ZERO);
        let clear = sun.energy_output_rate().amount;
        sun.set_cloudiness(1.0);
        assert_gt!(clear, sun.energy_output_rate().amount);
        assert_gt!(sun.energy_output_rate().amount, 0.0);
    }

    #[test]
    fn test_rejects_corrupt_sector_order() {
        let mut sun = Sun::new(DVec2::ZERO);
        let ElementState::Sun(mut state) = sun.state() else {
            unreachable!()
        };
        state.sector_order = vec![0, 0, 1];
        assert!(sun.apply_state(&ElementState::Sun(state)).is_err());
    }
}
