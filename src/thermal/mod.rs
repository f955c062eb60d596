pub mod air;
pub mod beaker;
pub mod block;
pub mod burner;
pub mod thermal_contact_area;
pub mod thermal_element;

pub use air::Air;
pub use beaker::{Beaker, BeakerType};
pub use block::{Block, BlockType};
pub use burner::Burner;
pub use thermal_contact_area::ThermalContactArea;
pub use thermal_element::{ThermalElement, ThermalElementParams};

use crate::constants::{ENERGY_PER_CHUNK, LOW_ENERGY_FOR_MAP_FUNCTION, NUM_ENERGY_CHUNKS_IN_BLOCK_AT_FREEZING};
use crate::geometry::Rect;
use crate::heat_transfer::EnergyContainerCategory;

/// Number of chunks that represent `energy` joules.
///
/// A monotonic step function anchored on a brick block: 1.5 chunks at
/// freezing, 6 at boiling, never negative.
pub fn energy_to_chunk_count(energy: f64) -> usize {
    let count = NUM_ENERGY_CHUNKS_IN_BLOCK_AT_FREEZING + (energy - LOW_ENERGY_FOR_MAP_FUNCTION) / ENERGY_PER_CHUNK;
    if count.is_finite() { count.round().max(0.0) as usize } else { 0 }
}

/// A movable container that holds thermal energy.
///
/// The concrete shapes only decide their slice layout and outline; the
/// energy bookkeeping lives in the shared [`ThermalElement`].
pub trait ThermalContainer: std::fmt::Debug {
    fn name(&self) -> &str;

    fn element(&self) -> &ThermalElement;

    fn element_mut(&mut self) -> &mut ThermalElement;

    fn category(&self) -> EnergyContainerCategory {
        self.element().category()
    }

    /// Visible outline, which can be taller than the energy-holding region.
    fn outline(&self) -> Rect {
        self.element().bounds()
    }

    fn thermal_contact_area(&self) -> ThermalContactArea {
        self.element().thermal_contact_area()
    }

    fn temperature(&self) -> f64 {
        self.element().temperature()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{BRICK_HEAT_CAPACITY, BOILING_POINT_TEMPERATURE, FREEZING_POINT_TEMPERATURE};
    use more_asserts::assert_le;

    #[test]
    fn test_mapping_is_anchored_on_brick() {
        // 1.5 rounds away from zero
        assert_eq!(energy_to_chunk_count(BRICK_HEAT_CAPACITY * FREEZING_POINT_TEMPERATURE), 2);
        assert_eq!(energy_to_chunk_count(BRICK_HEAT_CAPACITY * BOILING_POINT_TEMPERATURE), 6);
    }

    #[test]
    fn test_mapping_is_monotonic_and_never_negative() {
        assert_eq!(energy_to_chunk_count(0.0), 0);
        assert_eq!(energy_to_chunk_count(f64::NAN), 0);
        let mut previous = 0;
        for i in 0..400 {
            let count = energy_to_chunk_count(i as f64 * 1000.0);
            assert_le!(previous, count);
            previous = count;
        }
    }
}
