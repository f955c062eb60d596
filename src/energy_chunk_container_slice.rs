use crate::energy_chunk::{EnergyChunk, EnergyChunkId};
use crate::geometry::SliceBounds;
use glam::DVec2;

/// A 2D cross-section of a container at a fixed depth, holding some of its chunks.
#[derive(Debug, Clone)]
pub struct EnergyChunkContainerSlice {
    bounds: SliceBounds,
    z_position: f64,
    energy_chunks: Vec<EnergyChunk>,
}

impl EnergyChunkContainerSlice {
    pub fn new(bounds: SliceBounds, z_position: f64) -> Self {
        Self {
            bounds,
            z_position,
            energy_chunks: Vec::new(),
        }
    }

    pub fn bounds(&self) -> &SliceBounds {
        &self.bounds
    }

    pub fn z_position(&self) -> f64 {
        self.z_position
    }

    /// Take ownership of a chunk, moving it to this slice's depth.
    pub fn add_energy_chunk(&mut self, mut chunk: EnergyChunk) {
        chunk.z_position = self.z_position;
        self.energy_chunks.push(chunk);
    }

    pub fn remove_energy_chunk(&mut self, id: EnergyChunkId) -> Option<EnergyChunk> {
        let index = self.energy_chunks.iter().position(|c| c.id() == id)?;
        Some(self.energy_chunks.swap_remove(index))
    }

    pub fn contains_energy_chunk(&self, id: EnergyChunkId) -> bool {
        self.energy_chunks.iter().any(|c| c.id() == id)
    }

    pub fn energy_chunks(&self) -> &[EnergyChunk] {
        &self.energy_chunks
    }

    pub(crate) fn energy_chunks_mut(&mut self) -> &mut [EnergyChunk] {
        &mut self.energy_chunks
    }

    pub fn num_energy_chunks(&self) -> usize {
        self.energy_chunks.len()
    }

    pub fn clear(&mut self) {
        self.energy_chunks.clear();
    }

    /// Move the slice and everything in it.
    pub fn translate(&mut self, delta: DVec2) {
        self.bounds = self.bounds.translated(delta);
        for chunk in &mut self.energy_chunks {
            chunk.translate(delta);
        }
    }

    /// Replace the outline (after a resize), leaving chunks where they are.
    pub fn set_bounds(&mut self, bounds: SliceBounds) {
        self.bounds = bounds;
    }
}
