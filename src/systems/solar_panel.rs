use crate::config::SimRng;
use crate::constants::ENERGY_CHUNK_VELOCITY;
use crate::energy::{Energy, EnergyType};
use crate::energy_chunk::EnergyChunk;
use crate::energy_chunk_path_mover::create_path_from_offsets;
use crate::error::EfacError;
use crate::state::{ElementState, SolarPanelState};
use crate::systems::element_core::{ChunkPipeline, ElementCore, LegOutcome};
use crate::systems::{ElementRole, EnergySystemElement};
use glam::DVec2;
use std::any::Any;
use tracing::trace;

const CONVERGENCE_OFFSET: DVec2 = DVec2::new(0.0, 0.045);
const WIRE_PATH: [DVec2; 3] = [
    DVec2::new(0.0, 0.01),
    DVec2::new(0.04, 0.01),
    DVec2::new(0.07, 0.03),
];
// light arriving from the upper left while preloading
const PRELOAD_ENTRY_OFFSET: DVec2 = DVec2::new(-0.05, 0.15);
// arrivals at the convergence point are spread at least this far apart, in seconds
const MIN_INTER_CHUNK_TIME: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PanelLeg {
    ToConvergence,
    ThroughWire,
}

/// Converts light landing on the panel into electricity.
#[derive(Debug, Clone)]
pub struct SolarPanel {
    core: ElementCore<PanelLeg>,
    simulation_time: f64,
    latest_chunk_arrival_time: f64,
    output_rate: f64,
}

impl SolarPanel {
    pub fn new(position: DVec2) -> Self {
        Self {
            core: ElementCore::new(position),
            simulation_time: 0.0,
            latest_chunk_arrival_time: 0.0,
            output_rate: 0.0,
        }
    }

    fn receive(&mut self, chunk: EnergyChunk) {
        if chunk.energy_type != EnergyType::Light {
            trace!(chunk = chunk.id().0, energy_type = chunk.energy_type.as_str(), "solar panel ignores chunk");
            self.core.apply(chunk, LegOutcome::Remove);
            return;
        }
        let convergence = self.core.position() + CONVERGENCE_OFFSET;
        let distance = chunk.position.distance(convergence);
        let mut speed = ENERGY_CHUNK_VELOCITY;
        let mut arrival = self.simulation_time + distance / speed;
        let earliest = self.latest_chunk_arrival_time + MIN_INTER_CHUNK_TIME;
        if arrival < earliest && distance > 0.0 {
            arrival = earliest;
            speed = distance / (arrival - self.simulation_time);
        }
        self.latest_chunk_arrival_time = arrival;
        self.core.launch(chunk, PanelLeg::ToConvergence, vec![convergence], speed);
    }

    fn next_leg(&self, leg: PanelLeg) -> LegOutcome<PanelLeg> {
        match leg {
            PanelLeg::ToConvergence => LegOutcome::Continue {
                leg: PanelLeg::ThroughWire,
                path: create_path_from_offsets(self.core.position(), &WIRE_PATH),
                speed: ENERGY_CHUNK_VELOCITY,
                energy_type: Some(EnergyType::Electrical),
            },
            PanelLeg::ThroughWire => LegOutcome::Outgoing,
        }
    }
}

fn solar_panel_state(state: &ElementState) -> Result<&SolarPanelState, EfacError> {
    match state {
        ElementState::SolarPanel(state) => Ok(state),
        other => Err(EfacError::StateMismatch {
            expected: "solar panel",
            found: other.kind_name(),
        }),
    }
}

impl EnergySystemElement for SolarPanel {
    fn name(&self) -> &'static str {
        "solar panel"
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
        energy_type == EnergyType::Light
    }

    fn step(&mut self, dt: f64, incoming: &Energy, _rng: &mut SimRng) -> Energy {
        if !self.core.is_active() {
            return Energy::none();
        }
        self.simulation_time += dt;
        let converted = if incoming.energy_type == EnergyType::Light {
            incoming.amount
        } else {
            0.0
        };
        self.output_rate = if dt > 0.0 { converted / dt } else { 0.0 };

        for chunk in self.core.take_incoming() {
            self.receive(chunk);
        }
        self.core.move_chunks(dt);
        for (leg, chunk) in self.core.take_finished() {
            let outcome = self.next_leg(leg);
            self.core.apply(chunk, outcome);
        }
        Energy::new(EnergyType::Electrical, converted, 0.0)
    }

    fn energy_output_rate(&self) -> Energy {
        Energy::new(EnergyType::Electrical, self.output_rate, 0.0)
    }

    fn preload_entry_chunk(&self, energy_type: EnergyType) -> Option<EnergyChunk> {
        let entry = self.core.position() + PRELOAD_ENTRY_OFFSET;
        self.accepts(energy_type).then(|| EnergyChunk::at(energy_type, entry))
    }

    fn deactivate(&mut self) {
        self.core.clear();
        self.core.set_active(false);
        self.simulation_time = 0.0;
        self.latest_chunk_arrival_time = 0.0;
        self.output_rate = 0.0;
    }

    fn state(&self) -> ElementState {
        ElementState::SolarPanel(SolarPanelState {
            simulation_time: self.simulation_time,
            latest_chunk_arrival_time: self.latest_chunk_arrival_time,
        })
    }

    fn check_state(&self, state: &ElementState) -> Result<(), EfacError> {
        solar_panel_state(state).map(|_| ())
    }

    fn apply_state(&mut self, state: &ElementState) -> Result<(), EfacError> {
        let state = solar_panel_state(state)?;
        self.simulation_time = state.simulation_time;
        self.latest_chunk_arrival_time = state.latest_chunk_arrival_time;
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
    use approx::assert_abs_diff_eq;
    use more_asserts::assert_ge;
    use rand::SeedableRng;

    #[test]
    fn test_simultaneous_arrivals_are_spaced_out() {
        let mut panel = SolarPanel::new(DVec2::ZERO);
        panel.activate();
        let mut rng = SimRng::seed_from_u64(1);
        let entry = PRELOAD_ENTRY_OFFSET;
        panel.inject_energy_chunks(vec![
            EnergyChunk::at(EnergyType::Light, entry),
            EnergyChunk::at(EnergyType::Light, entry),
        ]);
        panel.step(1.0 / 60.0, &Energy::none(), &mut rng);

        let travelled: Vec<f64> = panel.core.movers().iter().map(|m| m.mover.chunk().position.distance(entry)).collect();
        assert_eq!(travelled.len(), 2);
        // the second chunk was slowed down to arrive later
        assert!(travelled[1] < travelled[0]);
        let distance = entry.distance(CONVERGENCE_OFFSET);
        assert_ge!(
            panel.latest_chunk_arrival_time,
            distance / ENERGY_CHUNK_VELOCITY + MIN_INTER_CHUNK_TIME - 1e-9
        );
    }

    #[test]
    fn test_light_becomes_electricity_at_the_wire_exit() {
        let mut panel = SolarPanel::new(DVec2::ZERO);
        panel.activate();
        let mut rng = SimRng::seed_from_u64(1);
        panel.inject_energy_chunks(vec![EnergyChunk::at(EnergyType::Light, PRELOAD_ENTRY_OFFSET)]);

        let mut outgoing = Vec::new();
        for _ in 0..60 * 10 {
            panel.step(1.0 / 60.0, &Energy::none(), &mut rng);
            outgoing.extend(panel.extract_outgoing_energy_chunks());
        }
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].energy_type, EnergyType::Electrical);
        assert_abs_diff_eq!(outgoing[0].position.x, WIRE_PATH[2].x, epsilon = 1e-12);
    }

    #[test]
    fn test_output_matches_incoming_light() {
        let mut panel = SolarPanel::new(DVec2::ZERO);
        panel.activate();
        let mut rng = SimRng::seed_from_u64(1);
        let out = panel.step(0.5, &Energy::new(EnergyType::Light, 200.0, 0.0), &mut rng);
        assert_eq!(out.energy_type, EnergyType::Electrical);
        assert_abs_diff_eq!(out.amount, 200.0);
        assert_abs_diff_eq!(panel.energy_output_rate().amount, 400.0);
    }
}
