use crate::config::SimRng;
use crate::constants::{BURNER_HEIGHT, BURNER_MAX_ENERGY_GENERATION_RATE, BURNER_WIDTH, TOUCH_DISTANCE_THRESHOLD};
use crate::energy::EnergyType;
use crate::energy_chunk::EnergyChunk;
use crate::error::EfacError;
use crate::geometry::Rect;
use crate::math_utils::random_between;
use crate::state::BurnerState;
use glam::DVec2;

/// A heater/cooler that containers can rest on.
///
/// `heat_cool_level` runs from -1 (full cooling) to 1 (full heating).
#[derive(Debug, Clone, PartialEq)]
pub struct Burner {
    position: DVec2,
    heat_cool_level: f64,
}

impl Burner {
    pub fn new(position: DVec2) -> Self {
        Self {
            position,
            heat_cool_level: 0.0,
        }
    }

    pub fn position(&self) -> DVec2 {
        self.position
    }

    pub fn heat_cool_level(&self) -> f64 {
        self.heat_cool_level
    }

    pub fn set_heat_cool_level(&mut self, level: f64) {
        debug_assert!(level.is_finite());
        self.heat_cool_level = if level.is_finite() { level.clamp(-1.0, 1.0) } else { 0.0 };
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_bottom_center(self.position, BURNER_WIDTH, BURNER_HEIGHT)
    }

    /// Point in the middle of the burner's top surface.
    pub fn top_center(&self) -> DVec2 {
        DVec2::new(self.position.x, self.position.y + BURNER_HEIGHT)
    }

    /// Whether a container with this outline sits on the burner.
    pub fn is_supporting(&self, outline: &Rect) -> bool {
        let top = self.bounds();
        (outline.min.y - top.max.y).abs() < TOUCH_DISTANCE_THRESHOLD && outline.horizontal_overlap(&top) > 0.0
    }

    /// Joules added (negative when cooling) over `dt`.
    pub fn energy_delta(&self, dt: f64) -> f64 {
        self.heat_cool_level * BURNER_MAX_ENERGY_GENERATION_RATE * dt
    }

    /// A thermal chunk rising out of the flame.
    pub fn emit_energy_chunk(&self, rng: &mut SimRng) -> EnergyChunk {
        let half_width = BURNER_WIDTH / 4.0;
        let top = self.top_center();
        EnergyChunk::at(
            EnergyType::Thermal,
            DVec2::new(top.x + random_between(rng, -half_width, half_width), top.y),
        )
    }

    pub fn state(&self) -> BurnerState {
        BurnerState {
            heat_cool_level: self.heat_cool_level,
            position: self.position,
        }
    }

    pub fn check_state(&self, state: &BurnerState) -> Result<(), EfacError> {
        if !state.heat_cool_level.is_finite() || state.heat_cool_level.abs() > 1.0 {
            return Err(EfacError::InvalidConfig("burner heat_cool_level must be within [-1, 1]"));
        }
        Ok(())
    }

    pub fn apply_state(&mut self, state: &BurnerState) -> Result<(), EfacError> {
        self.check_state(state)?;
        self.heat_cool_level = state.heat_cool_level;
        self.position = state.position;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_block_resting_on_top() {
        let burner = Burner::new(DVec2::ZERO);
        let resting = Rect::from_bottom_center(DVec2::new(0.01, BURNER_HEIGHT), 0.045, 0.045);
        let floating = Rect::from_bottom_center(DVec2::new(0.01, BURNER_HEIGHT + 0.02), 0.045, 0.045);
        let beside = Rect::from_bottom_center(DVec2::new(0.2, BURNER_HEIGHT), 0.045, 0.045);

        assert!(burner.is_supporting(&resting));
        assert!(!burner.is_supporting(&floating));
        assert!(!burner.is_supporting(&beside));
    }

    #[test]
    fn test_level_is_clamped() {
        let mut burner = Burner::new(DVec2::ZERO);
        burner.set_heat_cool_level(3.0);
        assert_eq!(burner.heat_cool_level(), 1.0);
        assert_eq!(burner.energy_delta(0.5), BURNER_MAX_ENERGY_GENERATION_RATE * 0.5);
        burner.set_heat_cool_level(-2.0);
        assert_eq!(burner.energy_delta(1.0), -BURNER_MAX_ENERGY_GENERATION_RATE);
    }
}
