use crate::energy::EnergyType;
use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CHUNK_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a chunk, stable across hand-offs between owners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnergyChunkId(pub u64);

impl EnergyChunkId {
    fn next() -> Self {
        EnergyChunkId(NEXT_CHUNK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A single quantum of energy.
///
/// Chunks are owned by value: a slice, a wander controller, a path mover or an
/// outgoing buffer holds each one, and moving it between them moves the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyChunk {
    id: EnergyChunkId,
    pub energy_type: EnergyType,
    pub position: DVec2,
    pub velocity: DVec2,
    /// Layering depth, used only for drawing order and perspective offsets.
    pub z_position: f64,
    pub visible: bool,
}

impl EnergyChunk {
    pub fn new(energy_type: EnergyType, position: DVec2, velocity: DVec2, visible: bool) -> Self {
        Self {
            id: EnergyChunkId::next(),
            energy_type,
            position,
            velocity,
            z_position: 0.0,
            visible: visible && energy_type != EnergyType::Hidden,
        }
    }

    /// A visible chunk at rest.
    pub fn at(energy_type: EnergyType, position: DVec2) -> Self {
        Self::new(energy_type, position, DVec2::ZERO, true)
    }

    pub fn id(&self) -> EnergyChunkId {
        self.id
    }

    pub fn translate(&mut self, delta: DVec2) {
        self.position += delta;
    }

    pub fn translate_based_on_velocity(&mut self, dt: f64) {
        self.position += self.velocity * dt;
    }

    /// Change the chunk's form, hiding it when it becomes [`EnergyType::Hidden`].
    pub fn set_energy_type(&mut self, energy_type: EnergyType) {
        self.energy_type = energy_type;
        if energy_type == EnergyType::Hidden {
            self.visible = false;
        }
    }
}
