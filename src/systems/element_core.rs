use crate::energy::EnergyType;
use crate::energy_chunk::{EnergyChunk, EnergyChunkId};
use crate::energy_chunk_path_mover::EnergyChunkPathMover;
use glam::DVec2;
use tracing::trace;

/// A chunk in transit together with the leg of the element's route it is on.
#[derive(Debug, Clone)]
pub struct LegMover<L> {
    pub leg: L,
    pub mover: EnergyChunkPathMover,
}

/// What happens to a chunk that finished a leg.
#[derive(Debug, Clone)]
pub enum LegOutcome<L> {
    /// Start another leg, optionally converting the chunk first.
    Continue {
        leg: L,
        path: Vec<DVec2>,
        speed: f64,
        energy_type: Option<EnergyType>,
    },
    /// Hand the chunk to the next element.
    Outgoing,
    /// The chunk leaves the simulation.
    Remove,
}

/// Chunk bookkeeping shared by every energy-systems element.
///
/// Each chunk the element owns is in exactly one of `incoming`, `movers` or
/// `outgoing`. Finished movers are taken out with [`take_finished`](Self::take_finished)
/// and routed back in through [`apply`](Self::apply).
#[derive(Debug, Clone)]
pub struct ElementCore<L> {
    position: DVec2,
    active: bool,
    handoff_enabled: bool,
    movers: Vec<LegMover<L>>,
    incoming: Vec<EnergyChunk>,
    outgoing: Vec<EnergyChunk>,
    removed_count: u64,
    pub energy_since_last_chunk: f64,
}

impl<L: Copy + std::fmt::Debug> ElementCore<L> {
    pub fn new(position: DVec2) -> Self {
        Self {
            position,
            active: false,
            handoff_enabled: true,
            movers: Vec::new(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
            removed_count: 0,
            energy_since_last_chunk: 0.0,
        }
    }

    pub fn position(&self) -> DVec2 {
        self.position
    }

    pub fn handoff_enabled(&self) -> bool {
        self.handoff_enabled
    }

    pub fn movers(&self) -> &[LegMover<L>] {
        &self.movers
    }

    pub fn launch(&mut self, chunk: EnergyChunk, leg: L, path: Vec<DVec2>, speed: f64) {
        self.movers.push(LegMover {
            leg,
            mover: EnergyChunkPathMover::new(chunk, path, speed),
        });
    }

    pub fn move_chunks(&mut self, dt: f64) {
        for leg_mover in &mut self.movers {
            leg_mover.mover.move_along_path(dt);
        }
    }

    /// Remove and return every chunk whose mover reached the end of its path.
    pub fn take_finished(&mut self) -> Vec<(L, EnergyChunk)> {
        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.movers)
            .into_iter()
            .partition(|leg_mover| leg_mover.mover.path_fully_traversed());
        self.movers = running;
        finished
            .into_iter()
            .map(|leg_mover| (leg_mover.leg, leg_mover.mover.into_chunk()))
            .collect()
    }

    pub fn take_incoming(&mut self) -> Vec<EnergyChunk> {
        std::mem::take(&mut self.incoming)
    }

    /// Route a chunk that finished a leg. Hand-offs fall back to removal while
    /// nothing downstream accepts chunks.
    pub fn apply(&mut self, mut chunk: EnergyChunk, outcome: LegOutcome<L>) {
        match outcome {
            LegOutcome::Continue {
                leg,
                path,
                speed,
                energy_type,
            } => {
                if let Some(energy_type) = energy_type {
                    chunk.set_energy_type(energy_type);
                }
                self.launch(chunk, leg, path, speed);
            }
            LegOutcome::Outgoing if self.handoff_enabled => {
                trace!(chunk = chunk.id().0, "chunk ready for hand-off");
                self.outgoing.push(chunk);
            }
            LegOutcome::Outgoing | LegOutcome::Remove => {
                trace!(chunk = chunk.id().0, energy_type = chunk.energy_type.as_str(), "chunk removed");
                self.removed_count += 1;
            }
        }
    }

    pub fn contains(&self, id: EnergyChunkId) -> bool {
        self.incoming.iter().any(|c| c.id() == id)
            || self.outgoing.iter().any(|c| c.id() == id)
            || self.movers.iter().any(|m| m.mover.chunk().id() == id)
    }
}

/// The element-independent view of an [`ElementCore`], whatever its leg type.
pub trait ChunkPipeline {
    fn position(&self) -> DVec2;
    /// Move the element, carrying every owned chunk and remaining path with it.
    fn set_position(&mut self, position: DVec2);
    fn is_active(&self) -> bool;
    fn set_active(&mut self, active: bool);
    fn handoff_enabled(&self) -> bool;
    fn set_handoff_enabled(&mut self, enabled: bool);
    /// Drop every owned chunk and mover and zero the chunk accumulator.
    fn clear(&mut self);
    /// Queue chunks from upstream, skipping any already owned.
    fn inject_energy_chunks(&mut self, chunks: Vec<EnergyChunk>);
    fn extract_outgoing_energy_chunks(&mut self) -> Vec<EnergyChunk>;
    fn energy_chunks(&self) -> Vec<&EnergyChunk>;
    fn mover_count(&self) -> usize;
    fn outgoing_count(&self) -> usize;
    /// Chunks that left the simulation through this element so far.
    fn removed_count(&self) -> u64;
    fn energy_since_last_chunk(&self) -> f64;
    fn set_energy_since_last_chunk(&mut self, energy: f64);
}

impl<L: Copy + std::fmt::Debug> ChunkPipeline for ElementCore<L> {
    fn position(&self) -> DVec2 {
        self.position
    }

    fn set_position(&mut self, position: DVec2) {
        let delta = position - self.position;
        self.position = position;
        for leg_mover in &mut self.movers {
            leg_mover.mover.translate(delta);
        }
        for chunk in self.incoming.iter_mut().chain(self.outgoing.iter_mut()) {
            chunk.translate(delta);
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn handoff_enabled(&self) -> bool {
        self.handoff_enabled
    }

    fn set_handoff_enabled(&mut self, enabled: bool) {
        self.handoff_enabled = enabled;
    }

    fn clear(&mut self) {
        self.movers.clear();
        self.incoming.clear();
        self.outgoing.clear();
        self.energy_since_last_chunk = 0.0;
    }

    fn inject_energy_chunks(&mut self, chunks: Vec<EnergyChunk>) {
        for chunk in chunks {
            if self.contains(chunk.id()) {
                continue;
            }
            self.incoming.push(chunk);
        }
    }

    fn extract_outgoing_energy_chunks(&mut self) -> Vec<EnergyChunk> {
        std::mem::take(&mut self.outgoing)
    }

    fn energy_chunks(&self) -> Vec<&EnergyChunk> {
        self.movers
            .iter()
            .map(|m| m.mover.chunk())
            .chain(self.incoming.iter())
            .chain(self.outgoing.iter())
            .collect()
    }

    fn mover_count(&self) -> usize {
        self.movers.len()
    }

    fn outgoing_count(&self) -> usize {
        self.outgoing.len()
    }

    fn removed_count(&self) -> u64 {
        self.removed_count
    }

    fn energy_since_last_chunk(&self) -> f64 {
        self.energy_since_last_chunk
    }

    fn set_energy_since_last_chunk(&mut self, energy: f64) {
        self.energy_since_last_chunk = energy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Leg {
        First,
        Second,
    }

    #[test]
    fn test_inject_is_idempotent() {
        let mut core: ElementCore<Leg> = ElementCore::new(DVec2::ZERO);
        let chunk = EnergyChunk::at(EnergyType::Electrical, DVec2::ZERO);
        core.inject_energy_chunks(vec![chunk.clone()]);
        core.inject_energy_chunks(vec![chunk]);
        assert_eq!(core.energy_chunks().len(), 1);
    }

    #[test]
    fn test_finished_chunks_are_routed() {
        let mut core: ElementCore<Leg> = ElementCore::new(DVec2::ZERO);
        let chunk = EnergyChunk::at(EnergyType::Mechanical, DVec2::ZERO);
        core.launch(chunk, Leg::First, vec![DVec2::new(0.01, 0.0)], 1.0);
        core.move_chunks(1.0);

        let finished = core.take_finished();
        assert_eq!(finished.len(), 1);
        assert_eq!(core.mover_count(), 0);
        let (leg, chunk) = finished.into_iter().next().unwrap();
        assert_eq!(leg, Leg::First);
        core.apply(
            chunk,
            LegOutcome::Continue {
                leg: Leg::Second,
                path: vec![DVec2::new(0.02, 0.0)],
                speed: 1.0,
                energy_type: Some(EnergyType::Electrical),
            },
        );
        assert_eq!(core.movers()[0].leg, Leg::Second);
        assert_eq!(core.movers()[0].mover.chunk().energy_type, EnergyType::Electrical);
    }

    #[test]
    fn test_outgoing_without_handoff_is_removed() {
        let mut core: ElementCore<Leg> = ElementCore::new(DVec2::ZERO);
        core.set_handoff_enabled(false);
        core.apply(EnergyChunk::at(EnergyType::Light, DVec2::ZERO), LegOutcome::Outgoing);
        assert_eq!(core.outgoing_count(), 0);
        assert_eq!(core.removed_count(), 1);
    }

    #[test]
    fn test_set_position_carries_chunks() {
        let mut core: ElementCore<Leg> = ElementCore::new(DVec2::ZERO);
        core.launch(
            EnergyChunk::at(EnergyType::Mechanical, DVec2::new(0.0, 0.1)),
            Leg::First,
            vec![DVec2::new(0.0, 0.0)],
            0.01,
        );
        core.set_position(DVec2::new(1.0, 0.0));
        assert_eq!(core.movers()[0].mover.chunk().position, DVec2::new(1.0, 0.1));
        assert_eq!(core.movers()[0].mover.final_destination(), Some(DVec2::new(1.0, 0.0)));
    }
}
