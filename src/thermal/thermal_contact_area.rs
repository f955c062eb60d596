use crate::constants::TOUCH_DISTANCE_THRESHOLD;
use crate::geometry::Rect;
use serde::{Deserialize, Serialize};

/// Region of a container through which it can exchange heat with a neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalContactArea {
    pub bounds: Rect,
    /// Fluids let another container sit inside them.
    pub supports_immersion: bool,
}

impl ThermalContactArea {
    pub fn new(bounds: Rect, supports_immersion: bool) -> Self {
        Self {
            bounds,
            supports_immersion,
        }
    }

    /// Length of the boundary shared with `other`, in metres.
    ///
    /// Immersion counts the whole perimeter of the overlap. Two solids only
    /// touch along an edge, and only when the edges are within
    /// `TOUCH_DISTANCE_THRESHOLD` of each other.
    pub fn thermal_contact_length(&self, other: &ThermalContactArea) -> f64 {
        let a = &self.bounds;
        let b = &other.bounds;
        let x_overlap = a.horizontal_overlap(b);
        let y_overlap = a.vertical_overlap(b);

        if x_overlap > 0.0 && y_overlap > 0.0 {
            if self.supports_immersion || other.supports_immersion {
                let inner = match (self.supports_immersion, other.supports_immersion) {
                    (true, false) => b,
                    (false, true) => a,
                    _ if a.area() <= b.area() => a,
                    _ => b,
                };
                let mut length = 2.0 * (x_overlap + y_overlap);
                // partially immersed: the dry side isn't in contact
                if y_overlap < inner.height() - 1e-12 {
                    length -= x_overlap;
                } else if x_overlap < inner.width() - 1e-12 {
                    length -= y_overlap;
                }
                return length;
            }
            // solids pressed slightly into each other still only share an edge
            if y_overlap < TOUCH_DISTANCE_THRESHOLD {
                return x_overlap;
            }
            if x_overlap < TOUCH_DISTANCE_THRESHOLD {
                return y_overlap;
            }
            return 0.0;
        }

        if x_overlap > 0.0
            && ((b.max.y - a.min.y).abs() < TOUCH_DISTANCE_THRESHOLD
                || (a.max.y - b.min.y).abs() < TOUCH_DISTANCE_THRESHOLD)
        {
            return x_overlap;
        }
        if y_overlap > 0.0
            && ((b.max.x - a.min.x).abs() < TOUCH_DISTANCE_THRESHOLD
                || (a.max.x - b.min.x).abs() < TOUCH_DISTANCE_THRESHOLD)
        {
            return y_overlap;
        }
        0.0
    }

    pub fn perimeter(&self) -> f64 {
        2.0 * (self.bounds.width() + self.bounds.height())
    }

    /// True when this area lies entirely inside `other` and `other` can hold it.
    pub fn is_immersed_in(&self, other: &ThermalContactArea) -> bool {
        other.supports_immersion && other.bounds.contains_rect(&self.bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn solid(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> ThermalContactArea {
        ThermalContactArea::new(Rect::new(min_x, min_y, max_x, max_y), false)
    }

    #[test]
    fn test_stacked_blocks_touch_along_shared_edge() {
        let lower = solid(0.0, 0.0, 0.045, 0.045);
        let upper = solid(0.01, 0.045, 0.055, 0.09);
        assert_abs_diff_eq!(lower.thermal_contact_length(&upper), 0.035, epsilon = 1e-12);
        assert_abs_diff_eq!(upper.thermal_contact_length(&lower), 0.035, epsilon = 1e-12);
    }

    #[test]
    fn test_side_by_side_blocks_touch() {
        let left = solid(0.0, 0.0, 0.045, 0.045);
        let right = solid(0.0455, 0.0, 0.0905, 0.045);
        assert_abs_diff_eq!(left.thermal_contact_length(&right), 0.045, epsilon = 1e-12);
    }

    #[test]
    fn test_separated_blocks_have_no_contact() {
        let a = solid(0.0, 0.0, 0.045, 0.045);
        let b = solid(0.1, 0.0, 0.145, 0.045);
        assert_eq!(a.thermal_contact_length(&b), 0.0);
    }

    #[test]
    fn test_fully_immersed_block_uses_whole_perimeter() {
        let fluid = ThermalContactArea::new(Rect::new(0.0, 0.0, 0.085, 0.05), true);
        let block = solid(0.02, 0.0, 0.065, 0.045);
        assert_abs_diff_eq!(fluid.thermal_contact_length(&block), 2.0 * (0.045 + 0.045), epsilon = 1e-12);
        assert!(block.is_immersed_in(&fluid));
    }

    #[test]
    fn test_partially_immersed_block_drops_the_dry_side() {
        let fluid = ThermalContactArea::new(Rect::new(0.0, 0.0, 0.085, 0.03), true);
        let block = solid(0.02, 0.0, 0.065, 0.045);
        // covers the block's width but only 0.03 of its height, the top stays dry
        assert_abs_diff_eq!(fluid.thermal_contact_length(&block), 2.0 * 0.03 + 0.045, epsilon = 1e-12);
        assert!(!block.is_immersed_in(&fluid));
    }
}
