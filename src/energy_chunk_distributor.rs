//! Relaxation of chunk positions inside a container.
//!
//! Every chunk is pushed away from every other chunk in the same container and
//! from the outline of its own slice with an inverse-square acceleration.
//! Velocities are damped each sub-step, and any chunk that leaves its slice is
//! clamped back onto the outline with its outward velocity removed. Repeated
//! application settles the chunks into an evenly spread, non-overlapping layout.

use crate::energy_chunk_container_slice::EnergyChunkContainerSlice;
use crate::error::EfacError;
use crate::geometry::SliceBounds;
use glam::DVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

// golden angle, spreads apart chunks that sit exactly on top of each other
const COINCIDENT_ANGLE_STEP: f64 = 2.399_963_229_728_653;
const COINCIDENT_DISTANCE: f64 = 1e-12;

/// Tunable constants of the relaxation.
///
/// Forces are scaled by the characteristic chunk spacing `sqrt(area / n)` of the
/// container so the same values work for a small block and a wide beaker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistributorParams {
    /// Largest internal integration step in seconds.
    pub max_time_step: f64,
    /// Chunk-to-chunk repulsion, in spacing³/s².
    pub repulsion_strength: f64,
    /// Outline-to-chunk repulsion, in spacing³/s².
    pub edge_repulsion_strength: f64,
    /// Exponential velocity damping rate, per second.
    pub damping: f64,
    /// Distance floor for the force calculation, as a fraction of the spacing.
    pub min_separation_fraction: f64,
    /// Speed limit expressed as the fraction of the spacing travelled per internal step.
    pub max_speed_fraction: f64,
    /// Displacement (m) under which a chunk is considered to be at rest.
    pub moved_epsilon: f64,
}

impl Default for DistributorParams {
    fn default() -> Self {
        Self {
            max_time_step: 1.0 / 180.0,
            repulsion_strength: 10.0,
            edge_repulsion_strength: 10.0,
            damping: 6.0,
            min_separation_fraction: 0.15,
            max_speed_fraction: 0.25,
            moved_epsilon: 1e-5,
        }
    }
}

impl DistributorParams {
    pub fn validate(&self) -> Result<(), EfacError> {
        if !(self.max_time_step > 0.0) {
            return Err(EfacError::InvalidConfig("distributor max_time_step must be positive"));
        }
        if !(self.repulsion_strength > 0.0) || !(self.edge_repulsion_strength > 0.0) {
            return Err(EfacError::InvalidConfig("distributor repulsion must be positive"));
        }
        if !(self.damping >= 0.0) {
            return Err(EfacError::InvalidConfig("distributor damping must not be negative"));
        }
        if !(self.min_separation_fraction > 0.0) {
            return Err(EfacError::InvalidConfig(
                "distributor min_separation_fraction must be positive",
            ));
        }
        if !(self.max_speed_fraction > 0.0) || self.max_speed_fraction > 1.0 {
            return Err(EfacError::InvalidConfig(
                "distributor max_speed_fraction must be in (0, 1]",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnergyChunkDistributor {
    params: DistributorParams,
}

impl EnergyChunkDistributor {
    pub fn new(params: DistributorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DistributorParams {
        &self.params
    }

    /// Advance the relaxation by `dt` seconds across all slices of one container.
    ///
    /// Returns true if any chunk moved more than `moved_epsilon` during the call.
    pub fn update_positions(&self, slices: &mut [EnergyChunkContainerSlice], dt: f64) -> bool {
        let total: usize = slices.iter().map(|s| s.num_energy_chunks()).sum();
        if total < 2 || !(dt > 0.0) {
            return false;
        }

        let mut moved = false;
        let mut time_left = dt;
        while time_left > 1e-12 {
            let step = time_left.min(self.params.max_time_step);
            moved |= self.relax(slices, total, step);
            time_left -= step;
        }
        moved
    }

    /// Run the relaxation until nothing moves or `max_iterations` steps of `dt` were taken.
    /// Returns the number of iterations used.
    pub fn settle(
        &self,
        slices: &mut [EnergyChunkContainerSlice],
        dt: f64,
        max_iterations: usize,
    ) -> usize {
        for iteration in 0..max_iterations {
            if !self.update_positions(slices, dt) {
                return iteration + 1;
            }
        }
        max_iterations
    }

    fn relax(&self, slices: &mut [EnergyChunkContainerSlice], total: usize, dt: f64) -> bool {
        let max_area = slices
            .iter()
            .map(|s| s.bounds().area())
            .fold(0.0, f64::max);
        let spacing = (max_area / total as f64).sqrt();
        if !(spacing > 0.0) {
            return false;
        }

        let spacing_cubed = spacing * spacing * spacing;
        let repulsion = self.params.repulsion_strength * spacing_cubed;
        let edge_repulsion = self.params.edge_repulsion_strength * spacing_cubed;
        let min_distance = spacing * self.params.min_separation_fraction;
        let max_speed = spacing * self.params.max_speed_fraction / self.params.max_time_step;

        let positions: Vec<DVec2> = slices
            .iter()
            .flat_map(|s| s.energy_chunks().iter().map(|c| c.position))
            .collect();
        let mut accelerations = vec![DVec2::ZERO; total];

        for i in 0..total {
            for j in (i + 1)..total {
                let delta = positions[i] - positions[j];
                let distance = delta.length();
                let direction = if distance > COINCIDENT_DISTANCE {
                    delta / distance
                } else {
                    let angle = (i * 7 + j * 13) as f64 * COINCIDENT_ANGLE_STEP;
                    DVec2::new(angle.cos(), angle.sin())
                };
                let d = distance.max(min_distance);
                let a = direction * (repulsion / (d * d));
                accelerations[i] += a;
                accelerations[j] -= a;
            }
        }

        let mut index = 0;
        for slice in slices.iter() {
            for chunk in slice.energy_chunks() {
                accelerations[index] +=
                    edge_acceleration(slice.bounds(), chunk.position, edge_repulsion, min_distance);
                index += 1;
            }
        }

        let decay = (-self.params.damping * dt).exp();
        let mut moved = false;
        let mut index = 0;
        for slice in slices.iter_mut() {
            let bounds = *slice.bounds();
            for chunk in slice.energy_chunks_mut() {
                let mut velocity = (chunk.velocity + accelerations[index] * dt) * decay;
                if velocity.length() > max_speed {
                    velocity = velocity.normalize() * max_speed;
                }
                let before = chunk.position;
                let (position, velocity) = confine(&bounds, before + velocity * dt, velocity);
                chunk.position = position;
                chunk.velocity = velocity;
                if position.distance(before) > self.params.moved_epsilon {
                    moved = true;
                }
                index += 1;
            }
        }
        moved
    }
}

/// Uniformly pick a starting location for a new chunk inside `bounds`.
pub fn generate_random_location<R: Rng + ?Sized>(bounds: &SliceBounds, rng: &mut R) -> DVec2 {
    bounds.random_point(rng)
}

fn edge_acceleration(bounds: &SliceBounds, p: DVec2, strength: f64, min_distance: f64) -> DVec2 {
    match bounds {
        SliceBounds::Rectangle(rect) => {
            let push = |d: f64| {
                let d = d.max(min_distance);
                strength / (d * d)
            };
            DVec2::new(
                push(p.x - rect.min.x) - push(rect.max.x - p.x),
                push(p.y - rect.min.y) - push(rect.max.y - p.y),
            )
        }
        SliceBounds::Ellipse {
            center,
            radius_x,
            radius_y,
        } => {
            let offset = p - *center;
            let r = bounds.normalized_radius(p);
            if r < 1e-9 {
                return DVec2::ZERO;
            }
            let outward = ellipse_normal(offset, *radius_x, *radius_y);
            // radial estimate of the gap to the outline
            let gap = (offset.length() * (1.0 / r - 1.0)).max(min_distance);
            -outward * (strength / (gap * gap))
        }
    }
}

fn ellipse_normal(offset: DVec2, radius_x: f64, radius_y: f64) -> DVec2 {
    DVec2::new(
        offset.x / (radius_x * radius_x),
        offset.y / (radius_y * radius_y),
    )
    .normalize_or_zero()
}

/// Clamp a position into the bounds and drop the velocity component that points out.
fn confine(bounds: &SliceBounds, mut position: DVec2, mut velocity: DVec2) -> (DVec2, DVec2) {
    match bounds {
        SliceBounds::Rectangle(rect) => {
            if position.x < rect.min.x {
                position.x = rect.min.x;
                velocity.x = velocity.x.max(0.0);
            } else if position.x > rect.max.x {
                position.x = rect.max.x;
                velocity.x = velocity.x.min(0.0);
            }
            if position.y < rect.min.y {
                position.y = rect.min.y;
                velocity.y = velocity.y.max(0.0);
            } else if position.y > rect.max.y {
                position.y = rect.max.y;
                velocity.y = velocity.y.min(0.0);
            }
        }
        SliceBounds::Ellipse {
            center,
            radius_x,
            radius_y,
        } => {
            let r = bounds.normalized_radius(position);
            if r > 1.0 {
                // land a hair inside so rounding can't leave the point outside
                position = *center + (position - *center) / (r * (1.0 + 1e-9));
                let outward = ellipse_normal(position - *center, *radius_x, *radius_y);
                let outward_speed = velocity.dot(outward);
                if outward_speed > 0.0 {
                    velocity -= outward * outward_speed;
                }
            }
        }
    }
    (position, velocity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::EnergyType;
    use crate::energy_chunk::EnergyChunk;
    use crate::geometry::Rect;
    use more_asserts::assert_le;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn square_slice(chunks: &[DVec2]) -> EnergyChunkContainerSlice {
        let mut slice =
            EnergyChunkContainerSlice::new(SliceBounds::Rectangle(Rect::new(0.0, 0.0, 0.1, 0.1)), 0.0);
        for p in chunks {
            slice.add_energy_chunk(EnergyChunk::at(EnergyType::Thermal, *p));
        }
        slice
    }

    #[test]
    fn test_empty_and_single_chunk_are_no_ops() {
        let distributor = EnergyChunkDistributor::default();
        let mut empty = vec![square_slice(&[])];
        assert!(!distributor.update_positions(&mut empty, 1.0 / 60.0));

        let mut single = vec![square_slice(&[DVec2::new(0.01, 0.01)])];
        assert!(!distributor.update_positions(&mut single, 1.0 / 60.0));
        assert_eq!(single[0].energy_chunks()[0].position, DVec2::new(0.01, 0.01));
    }

    #[test]
    fn test_coincident_chunks_separate_without_nan() {
        let distributor = EnergyChunkDistributor::default();
        let p = DVec2::new(0.05, 0.05);
        let mut slices = vec![square_slice(&[p, p])];

        assert!(distributor.update_positions(&mut slices, 1.0 / 60.0));
        let chunks = slices[0].energy_chunks();
        assert!(chunks.iter().all(|c| c.position.is_finite()));
        assert!(chunks[0].position.distance(chunks[1].position) > 0.0);
    }

    #[test]
    fn test_chunks_outside_are_pulled_back_in() {
        let distributor = EnergyChunkDistributor::default();
        let mut slices = vec![square_slice(&[DVec2::new(0.2, 0.05), DVec2::new(0.05, -0.3)])];
        distributor.update_positions(&mut slices, 1.0 / 60.0);

        for chunk in slices[0].energy_chunks() {
            assert!(slices[0].bounds().contains(chunk.position), "{:?}", chunk.position);
        }
    }

    #[test]
    fn test_ellipse_slices_keep_chunks_inside() {
        let distributor = EnergyChunkDistributor::default();
        let mut rng = SmallRng::seed_from_u64(11);
        let bounds = SliceBounds::Ellipse {
            center: DVec2::new(0.0, 0.05),
            radius_x: 0.04,
            radius_y: 0.03,
        };
        let mut slice = EnergyChunkContainerSlice::new(bounds, 0.0);
        for _ in 0..12 {
            slice.add_energy_chunk(EnergyChunk::at(
                EnergyType::Thermal,
                generate_random_location(&bounds, &mut rng),
            ));
        }
        let mut slices = vec![slice];
        for _ in 0..300 {
            distributor.update_positions(&mut slices, 1.0 / 60.0);
        }
        for chunk in slices[0].energy_chunks() {
            assert_le!(bounds.normalized_radius(chunk.position), 1.0 + 1e-9);
        }
    }

    #[test]
    fn test_settle_stops_once_at_rest() {
        let distributor = EnergyChunkDistributor::default();
        let mut slices = vec![square_slice(&[DVec2::new(0.03, 0.05), DVec2::new(0.07, 0.05)])];
        let iterations = distributor.settle(&mut slices, 1.0 / 60.0, 2_000);
        assert!(iterations < 2_000, "two chunks should come to rest");
    }

    #[test]
    fn test_params_validation() {
        assert!(DistributorParams::default().validate().is_ok());
        let bad = DistributorParams {
            max_time_step: 0.0,
            ..DistributorParams::default()
        };
        assert!(bad.validate().is_err());
    }
}
