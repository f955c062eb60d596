use crate::constants::{RADIATED_MAX_ANGLE_VARIATION, RADIATED_SEGMENT_LENGTH};
use crate::energy_chunk::EnergyChunk;
use crate::math_utils::{polar, random_between};
use glam::DVec2;
use rand::Rng;
use std::f64::consts::PI;

// a final waypoint closer than this is treated as reached
const ARRIVAL_TOLERANCE: f64 = 1e-9;
// steepest allowed heading of a radiated segment away from vertical
const RADIATED_MIN_ANGLE: f64 = PI / 6.0;
const RADIATED_MAX_ANGLE: f64 = PI * 5.0 / 6.0;

/// Moves one chunk along a fixed polyline at constant speed.
///
/// The mover owns the chunk for the duration of the trip. Once
/// [`path_fully_traversed`](Self::path_fully_traversed) is set the owning
/// element takes the chunk back with [`into_chunk`](Self::into_chunk).
#[derive(Debug, Clone)]
pub struct EnergyChunkPathMover {
    chunk: EnergyChunk,
    path: Vec<DVec2>,
    speed: f64,
    next_point_index: usize,
    path_fully_traversed: bool,
}

impl EnergyChunkPathMover {
    pub fn new(chunk: EnergyChunk, path: Vec<DVec2>, speed: f64) -> Self {
        debug_assert!(speed > 0.0, "path mover speed must be positive, got {speed}");
        let path_fully_traversed = path.is_empty();
        Self {
            chunk,
            path,
            speed,
            next_point_index: 0,
            path_fully_traversed,
        }
    }

    pub fn chunk(&self) -> &EnergyChunk {
        &self.chunk
    }

    pub(crate) fn chunk_mut(&mut self) -> &mut EnergyChunk {
        &mut self.chunk
    }

    pub fn into_chunk(self) -> EnergyChunk {
        self.chunk
    }

    pub fn path(&self) -> &[DVec2] {
        &self.path
    }

    pub fn path_fully_traversed(&self) -> bool {
        self.path_fully_traversed
    }

    pub fn final_destination(&self) -> Option<DVec2> {
        self.path.last().copied()
    }

    /// Travel `dt * speed` along the path, crossing as many waypoints as the budget allows.
    pub fn move_along_path(&mut self, dt: f64) {
        let mut distance_to_travel = dt * self.speed;

        while distance_to_travel > 0.0 && !self.path_fully_traversed {
            let Some(&next_point) = self.path.get(self.next_point_index) else {
                debug_assert!(false, "path mover has no next waypoint");
                self.path_fully_traversed = true;
                break;
            };
            let distance_to_next_point = self.chunk.position.distance(next_point);

            if distance_to_travel < distance_to_next_point - ARRIVAL_TOLERANCE {
                let direction = (next_point - self.chunk.position) / distance_to_next_point;
                self.chunk.position += direction * distance_to_travel;
                distance_to_travel = 0.0;
            } else {
                distance_to_travel -= distance_to_next_point;
                self.chunk.position = next_point;
                if self.next_point_index + 1 == self.path.len() {
                    self.path_fully_traversed = true;
                } else {
                    self.next_point_index += 1;
                }
            }
        }
    }

    /// Shift the remaining path and the chunk together.
    pub fn translate(&mut self, delta: DVec2) {
        self.chunk.translate(delta);
        for point in &mut self.path {
            *point += delta;
        }
    }
}

/// Total length of the trip from `start` through every waypoint.
pub fn path_length(start: DVec2, path: &[DVec2]) -> f64 {
    let mut length = 0.0;
    let mut previous = start;
    for point in path {
        length += previous.distance(*point);
        previous = *point;
    }
    length
}

/// Turn element-relative offsets into world waypoints.
pub fn create_path_from_offsets(position: DVec2, offsets: &[DVec2]) -> Vec<DVec2> {
    offsets.iter().map(|offset| position + *offset).collect()
}

/// A wavy path drifting upward until it is `max_height` above `start`.
///
/// Segments have a fixed length and a random heading around `π/2 + path_angle`;
/// the final segment is shortened so it ends exactly on the height cutoff.
pub fn create_radiated_path<R: Rng + ?Sized>(
    start: DVec2,
    path_angle: f64,
    max_height: f64,
    rng: &mut R,
) -> Vec<DVec2> {
    let cutoff = start.y + max_height;
    let mut path = Vec::new();
    let mut current = start;

    while current.y < cutoff {
        let heading = (PI / 2.0
            + path_angle
            + random_between(rng, -RADIATED_MAX_ANGLE_VARIATION, RADIATED_MAX_ANGLE_VARIATION))
        .clamp(RADIATED_MIN_ANGLE, RADIATED_MAX_ANGLE);
        let segment = polar(RADIATED_SEGMENT_LENGTH, heading);
        if current.y + segment.y >= cutoff {
            let fraction = (cutoff - current.y) / segment.y;
            current = DVec2::new(current.x + segment.x * fraction, cutoff);
        } else {
            current += segment;
        }
        path.push(current);
    }
    path
}

/// One segment leaving `start` at `angle` and ending `height` above it.
///
/// Near-horizontal angles would never gain the height; those travel `height`
/// along the angle instead.
pub fn create_straight_path(start: DVec2, angle: f64, height: f64) -> Vec<DVec2> {
    let rise = angle.sin();
    let distance = if rise > 0.05 { height / rise } else { height };
    vec![start + polar(distance, angle)]
}

/// [`create_straight_path`] with the angle drawn uniformly from `[min_angle, max_angle)`.
pub fn create_random_straight_path<R: Rng + ?Sized>(
    start: DVec2,
    min_angle: f64,
    max_angle: f64,
    height: f64,
    rng: &mut R,
) -> Vec<DVec2> {
    create_straight_path(start, random_between(rng, min_angle, max_angle), height)
}
