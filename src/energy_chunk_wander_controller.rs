use crate::energy_chunk::EnergyChunk;
use crate::math_utils::{angle_of, polar, random_between};
use glam::DVec2;
use rand::Rng;
use std::f64::consts::PI;

const MIN_VELOCITY: f64 = 0.06; // m/s
const MAX_VELOCITY: f64 = 0.10;
const MAX_ANGLE_VARIATION: f64 = PI * 0.2; // max deviation from the heading to the destination
const ANGLE_JITTER_PER_STEP: f64 = 0.1;
const DISTANCE_AT_WHICH_TO_STOP_WANDERING: f64 = 0.05; // m

/// Steers one chunk toward a (possibly moving) destination with a little wobble.
///
/// The controller owns its chunk while it is on the way. The heading is
/// recomputed every update from the chunk's current position to the current
/// destination, then perturbed by a random-walk jitter bounded by
/// `MAX_ANGLE_VARIATION`, so the chunk always makes progress.
#[derive(Debug, Clone)]
pub struct EnergyChunkWanderController {
    chunk: EnergyChunk,
    offset: DVec2,
    speed: f64,
    angle_jitter: f64,
}

impl EnergyChunkWanderController {
    pub fn new<R: Rng + ?Sized>(chunk: EnergyChunk, offset: Option<DVec2>, rng: &mut R) -> Self {
        Self {
            chunk,
            offset: offset.unwrap_or(DVec2::ZERO),
            speed: random_between(rng, MIN_VELOCITY, MAX_VELOCITY),
            angle_jitter: random_between(rng, -MAX_ANGLE_VARIATION, MAX_ANGLE_VARIATION),
        }
    }

    pub fn chunk(&self) -> &EnergyChunk {
        &self.chunk
    }

    pub fn into_chunk(self) -> EnergyChunk {
        self.chunk
    }

    pub fn destination(&self, target_position: DVec2) -> DVec2 {
        target_position + self.offset
    }

    pub fn is_at_destination(&self, target_position: DVec2) -> bool {
        self.chunk.position == self.destination(target_position)
    }

    /// Move the chunk one step toward `target_position` (plus the offset).
    pub fn update_position<R: Rng + ?Sized>(&mut self, target_position: DVec2, dt: f64, rng: &mut R) {
        let destination = self.destination(target_position);
        let to_destination = destination - self.chunk.position;
        let distance = to_destination.length();

        if distance <= self.speed * dt {
            self.chunk.position = destination;
            self.chunk.velocity = DVec2::ZERO;
            return;
        }

        self.angle_jitter = (self.angle_jitter
            + random_between(rng, -ANGLE_JITTER_PER_STEP, ANGLE_JITTER_PER_STEP))
        .clamp(-MAX_ANGLE_VARIATION, MAX_ANGLE_VARIATION);

        let jitter = if distance > DISTANCE_AT_WHICH_TO_STOP_WANDERING {
            self.angle_jitter
        } else {
            0.0
        };
        self.chunk.velocity = polar(self.speed, angle_of(to_destination) + jitter);
        self.chunk.translate_based_on_velocity(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::EnergyType;
    use more_asserts::assert_lt;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_reaches_a_moving_destination() {
        let mut rng = SmallRng::seed_from_u64(3);
        let chunk = EnergyChunk::at(EnergyType::Thermal, DVec2::new(0.0, 0.3));
        let mut controller = EnergyChunkWanderController::new(chunk, None, &mut rng);

        let mut target = DVec2::new(0.2, 0.0);
        let dt = 1.0 / 60.0;
        let mut steps = 0;
        while !controller.is_at_destination(target) {
            target.x -= 0.01 * dt;
            controller.update_position(target, dt, &mut rng);
            steps += 1;
            assert_lt!(steps, 2_000, "chunk never arrived");
        }
        assert_eq!(controller.chunk().velocity, DVec2::ZERO);
    }

    #[test]
    fn test_distance_never_grows() {
        let mut rng = SmallRng::seed_from_u64(99);
        let chunk = EnergyChunk::at(EnergyType::Thermal, DVec2::new(-0.4, 0.1));
        let mut controller = EnergyChunkWanderController::new(chunk, Some(DVec2::new(0.0, 0.02)), &mut rng);
        let target = DVec2::ZERO;

        let mut last = controller.chunk().position.distance(controller.destination(target));
        for _ in 0..200 {
            controller.update_position(target, 1.0 / 60.0, &mut rng);
            let now = controller.chunk().position.distance(controller.destination(target));
            assert!(now <= last + 1e-12);
            last = now;
        }
    }
}
