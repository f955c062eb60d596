use super::energy_to_chunk_count;
use super::thermal_contact_area::ThermalContactArea;
use crate::config::{EfacConfig, SimRng};
use crate::constants::{ROOM_TEMPERATURE, SIM_TIME_PER_TICK_NORMAL, Z_TO_Y_OFFSET_MULTIPLIER};
use crate::energy::EnergyType;
use crate::energy_chunk::{EnergyChunk, EnergyChunkId};
use crate::energy_chunk_container_slice::EnergyChunkContainerSlice;
use crate::energy_chunk_distributor::{EnergyChunkDistributor, generate_random_location};
use crate::energy_chunk_wander_controller::EnergyChunkWanderController;
use crate::error::EfacError;
use crate::geometry::{Rect, SliceBounds};
use crate::heat_transfer::{EnergyContainerCategory, HeatReservoir, exchange_energy, heat_transfer_constant};
use crate::state::ThermalElementState;
use glam::DVec2;
use tracing::{debug, error, trace};

/// Everything needed to build a [`ThermalElement`].
#[derive(Debug, Clone)]
pub struct ThermalElementParams {
    /// Bottom centre of the energy-holding region.
    pub position: DVec2,
    pub width: f64,
    pub height: f64,
    pub mass: f64,
    pub specific_heat: f64,
    pub category: EnergyContainerCategory,
    pub supports_immersion: bool,
    /// Slice outlines and depths, front to back, for the element at `position`.
    pub slices: Vec<(SliceBounds, f64)>,
}

/// The energy-bearing core shared by blocks and beakers.
///
/// `energy` is the source of truth. Chunks are a visual proxy whose count
/// follows [`energy_to_chunk_count`]; the surplus or deficit is reported by
/// [`energy_chunk_balance`](Self::energy_chunk_balance) and corrected by
/// whoever moves heat in or out.
#[derive(Debug, Clone)]
pub struct ThermalElement {
    position: DVec2,
    initial_position: DVec2,
    width: f64,
    height: f64,
    energy: f64,
    mass: f64,
    specific_heat: f64,
    category: EnergyContainerCategory,
    supports_immersion: bool,
    slices: Vec<EnergyChunkContainerSlice>,
    approaching: Vec<EnergyChunkWanderController>,
    next_slice_index: usize,
    distributor: EnergyChunkDistributor,
    settle_max_iterations: usize,
    max_heat_exchange_time_step: f64,
}

impl ThermalElement {
    pub fn new(params: ThermalElementParams, config: &EfacConfig) -> Self {
        debug_assert!(params.mass > 0.0, "mass must be positive");
        debug_assert!(params.specific_heat > 0.0, "specific heat must be positive");
        debug_assert!(!params.slices.is_empty(), "a container needs at least one slice");
        let slices = params
            .slices
            .into_iter()
            .map(|(bounds, z)| EnergyChunkContainerSlice::new(bounds, z))
            .collect();
        Self {
            position: params.position,
            initial_position: params.position,
            width: params.width,
            height: params.height,
            energy: params.mass * params.specific_heat * ROOM_TEMPERATURE,
            mass: params.mass,
            specific_heat: params.specific_heat,
            category: params.category,
            supports_immersion: params.supports_immersion,
            slices,
            approaching: Vec::new(),
            next_slice_index: 0,
            distributor: EnergyChunkDistributor::new(config.distributor.clone()),
            settle_max_iterations: config.settle_max_iterations,
            max_heat_exchange_time_step: config.max_heat_exchange_time_step,
        }
    }

    pub fn position(&self) -> DVec2 {
        self.position
    }

    /// Move the element, carrying its slices and the chunks inside them rigidly.
    ///
    /// Approaching chunks aren't inside yet; they keep chasing the new position.
    pub fn set_position(&mut self, position: DVec2) {
        let delta = position - self.position;
        if delta == DVec2::ZERO {
            return;
        }
        self.position = position;
        for slice in &mut self.slices {
            slice.translate(delta);
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_bottom_center(self.position, self.width, self.height)
    }

    pub fn thermal_contact_area(&self) -> ThermalContactArea {
        ThermalContactArea::new(self.bounds(), self.supports_immersion)
    }

    pub fn category(&self) -> EnergyContainerCategory {
        self.category
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn specific_heat(&self) -> f64 {
        self.specific_heat
    }

    /// Add `delta` joules (negative to remove). Non-finite deltas are rejected.
    pub fn change_energy(&mut self, delta: f64) {
        debug_assert!(delta.is_finite(), "energy delta must be finite, got {delta}");
        if !delta.is_finite() {
            error!(delta, category = self.category.as_str(), "discarding non-finite energy change");
            return;
        }
        self.energy += delta;
    }

    pub fn temperature(&self) -> f64 {
        debug_assert!(self.energy >= 0.0, "energy must not be negative, got {}", self.energy);
        debug_assert!(self.mass > 0.0 && self.specific_heat > 0.0);
        self.energy / (self.mass * self.specific_heat)
    }

    pub fn slices(&self) -> &[EnergyChunkContainerSlice] {
        &self.slices
    }

    /// Replace the slice outlines after a resize. Chunks stay in their slices and
    /// are pulled inside the new outline by the distributor.
    pub fn set_slice_bounds(&mut self, slices: Vec<(SliceBounds, f64)>, height: f64) {
        debug_assert_eq!(slices.len(), self.slices.len(), "slice count can't change on resize");
        for (slice, (bounds, _)) in self.slices.iter_mut().zip(slices) {
            slice.set_bounds(bounds);
        }
        self.height = height;
    }

    pub(crate) fn set_mass(&mut self, mass: f64) {
        debug_assert!(mass > 0.0);
        let temperature = self.temperature();
        self.mass = mass;
        self.energy = temperature * mass * self.specific_heat;
    }

    pub fn approaching_energy_chunks(&self) -> impl Iterator<Item = &EnergyChunk> {
        self.approaching.iter().map(|controller| controller.chunk())
    }

    /// Every chunk this element owns, inside or on the way in.
    pub fn energy_chunks(&self) -> impl Iterator<Item = &EnergyChunk> {
        self.slices
            .iter()
            .flat_map(|slice| slice.energy_chunks().iter())
            .chain(self.approaching_energy_chunks())
    }

    pub fn num_energy_chunks(&self) -> usize {
        self.slices.iter().map(|s| s.num_energy_chunks()).sum::<usize>() + self.approaching.len()
    }

    pub fn target_energy_chunk_count(&self) -> usize {
        energy_to_chunk_count(self.energy)
    }

    /// Actual minus target chunk count: positive means chunks should leave.
    pub fn energy_chunk_balance(&self) -> i64 {
        self.num_energy_chunks() as i64 - self.target_energy_chunk_count() as i64
    }

    /// Relax the chunks inside, then bring approaching chunks closer.
    pub fn step(&mut self, dt: f64, rng: &mut SimRng) {
        self.distributor.update_positions(&mut self.slices, dt);

        let target = self.bounds().center();
        let mut still_approaching = Vec::with_capacity(self.approaching.len());
        for mut controller in std::mem::take(&mut self.approaching) {
            controller.update_position(target, dt, rng);
            let position = controller.chunk().position;
            if controller.is_at_destination(target) || self.slices.iter().any(|s| s.bounds().contains(position)) {
                self.insert_round_robin(controller.into_chunk());
            } else {
                still_approaching.push(controller);
            }
        }
        self.approaching = still_approaching;
    }

    /// Take ownership of a chunk, placing it directly in a slice when it's
    /// already inside, otherwise letting it wander in.
    pub fn add_energy_chunk(&mut self, chunk: EnergyChunk, rng: &mut SimRng) {
        if self.slices.iter().any(|s| s.bounds().contains(chunk.position)) {
            self.insert_round_robin(chunk);
        } else {
            trace!(chunk = chunk.id().0, "chunk approaching container");
            self.approaching.push(EnergyChunkWanderController::new(chunk, None, rng));
        }
    }

    fn insert_round_robin(&mut self, chunk: EnergyChunk) {
        let index = self.next_slice_index % self.slices.len();
        self.slices[index].add_energy_chunk(chunk);
        self.next_slice_index = (index + 1) % self.slices.len();
    }

    pub fn remove_energy_chunk(&mut self, id: EnergyChunkId) -> Option<EnergyChunk> {
        for slice in &mut self.slices {
            if let Some(chunk) = slice.remove_energy_chunk(id) {
                return Some(chunk);
            }
        }
        let index = self.approaching.iter().position(|c| c.chunk().id() == id)?;
        Some(self.approaching.swap_remove(index).into_chunk())
    }

    /// Remove the chunk nearest `point`, or any chunk if the slices are empty.
    pub fn extract_energy_chunk_closest_to_point(&mut self, point: DVec2) -> Option<EnergyChunk> {
        let closest = self.closest_slice_chunk(|p| p.distance(point));
        self.extract_or_fallback(closest)
    }

    /// Pick the chunk that should leave first toward `destination`.
    ///
    /// A contact area fully inside the destination gives up the chunk nearest
    /// its own side edges. A contact area that contains the destination gives
    /// up the chunk nearest the destination outline that isn't already inside
    /// it. Anything else gives up the chunk nearest the destination centre.
    pub fn extract_energy_chunk_closest_to_bounds(&mut self, destination: &Rect) -> Option<EnergyChunk> {
        let own = self.bounds();
        let closest = if destination.contains_rect(&own) {
            self.closest_slice_chunk(|p| (p.x - own.min.x).abs().min((own.max.x - p.x).abs()))
        } else if own.contains_rect(destination) {
            self.closest_slice_chunk(|p| {
                if destination.contains(p) {
                    f64::INFINITY
                } else {
                    destination.distance_to_outline(p)
                }
            })
        } else {
            let center = destination.center();
            self.closest_slice_chunk(|p| p.distance(center))
        };
        self.extract_or_fallback(closest)
    }

    /// Slice chunk with the smallest finite `metric`, measured on the
    /// depth-compensated position.
    fn closest_slice_chunk(&self, metric: impl Fn(DVec2) -> f64) -> Option<EnergyChunkId> {
        let mut best: Option<(f64, EnergyChunkId)> = None;
        for chunk in self.slices.iter().flat_map(|s| s.energy_chunks().iter()) {
            let compensated = DVec2::new(
                chunk.position.x,
                chunk.position.y - chunk.z_position * Z_TO_Y_OFFSET_MULTIPLIER,
            );
            let value = metric(compensated);
            if !value.is_finite() {
                continue;
            }
            if best.is_none_or(|(d, _)| value < d) {
                best = Some((value, chunk.id()));
            }
        }
        best.map(|(_, id)| id)
    }

    fn extract_or_fallback(&mut self, id: Option<EnergyChunkId>) -> Option<EnergyChunk> {
        if let Some(id) = id {
            return self.remove_energy_chunk(id);
        }
        let any = self
            .slices
            .iter()
            .flat_map(|s| s.energy_chunks().first())
            .map(|c| c.id())
            .next()
            .or_else(|| self.approaching.first().map(|c| c.chunk().id()));
        match any {
            Some(id) => {
                trace!(chunk = id.0, "no chunk matched the extraction heuristic, taking any");
                self.remove_energy_chunk(id)
            }
            None => {
                trace!(category = self.category.as_str(), "no chunk available to extract");
                None
            }
        }
    }

    /// Trade heat with another element for `dt` seconds. Returns the energy gained.
    pub fn exchange_energy_with(&mut self, other: &mut ThermalElement, dt: f64) -> f64 {
        let contact_length = self
            .thermal_contact_area()
            .thermal_contact_length(&other.thermal_contact_area());
        let constant = heat_transfer_constant(self.category, other.category);
        let max_step = self.max_heat_exchange_time_step;
        exchange_energy(self, other, contact_length, constant, dt, max_step)
    }

    /// Drop every chunk and seed a fresh, relaxed population for the current energy.
    pub fn add_initial_energy_chunks(&mut self, rng: &mut SimRng) {
        self.clear_energy_chunks();
        for _ in 0..self.target_energy_chunk_count() {
            let index = self.next_slice_index % self.slices.len();
            let position = generate_random_location(self.slices[index].bounds(), rng);
            self.insert_round_robin(EnergyChunk::at(EnergyType::Thermal, position));
        }
        let iterations = self.distributor.settle(
            &mut self.slices,
            SIM_TIME_PER_TICK_NORMAL,
            self.settle_max_iterations,
        );
        debug!(
            category = self.category.as_str(),
            chunks = self.num_energy_chunks(),
            iterations,
            "seeded container energy chunks"
        );
    }

    pub fn clear_energy_chunks(&mut self) {
        for slice in &mut self.slices {
            slice.clear();
        }
        self.approaching.clear();
        self.next_slice_index = 0;
    }

    /// Back to room temperature at the starting position with a fresh population.
    pub fn reset(&mut self, rng: &mut SimRng) {
        self.energy = self.heat_capacity() * ROOM_TEMPERATURE;
        self.set_position(self.initial_position);
        self.add_initial_energy_chunks(rng);
        debug!(category = self.category.as_str(), "container reset");
    }

    pub fn state(&self) -> ThermalElementState {
        ThermalElementState {
            energy: self.energy,
            position: self.position,
            next_slice_index: self.next_slice_index,
        }
    }

    pub fn check_state(&self, state: &ThermalElementState) -> Result<(), EfacError> {
        if !state.energy.is_finite() || state.energy < 0.0 {
            return Err(EfacError::InvalidConfig("container energy must be finite and non-negative"));
        }
        Ok(())
    }

    pub fn apply_state(&mut self, state: &ThermalElementState) -> Result<(), EfacError> {
        self.check_state(state)?;
        self.energy = state.energy;
        self.set_position(state.position);
        self.next_slice_index = state.next_slice_index % self.slices.len();
        Ok(())
    }
}

impl HeatReservoir for ThermalElement {
    fn energy(&self) -> f64 {
        self.energy
    }

    fn heat_capacity(&self) -> f64 {
        self.mass * self.specific_heat
    }

    fn change_energy(&mut self, delta: f64) {
        ThermalElement::change_energy(self, delta);
    }

    fn temperature(&self) -> f64 {
        ThermalElement::temperature(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const FACE: Rect = Rect {
        min: DVec2::new(-0.05, 0.0),
        max: DVec2::new(0.05, 0.1),
    };

    fn element(slice_depths: &[f64]) -> ThermalElement {
        ThermalElement::new(
            ThermalElementParams {
                position: DVec2::ZERO,
                width: FACE.width(),
                height: FACE.height(),
                mass: 1.0,
                specific_heat: 450.0,
                category: EnergyContainerCategory::Iron,
                supports_immersion: false,
                slices: slice_depths.iter().map(|&z| (SliceBounds::Rectangle(FACE), z)).collect(),
            },
            &EfacConfig::default(),
        )
    }

    /// Add chunks in order, round-robin over the slices; returns their ids.
    fn place(element: &mut ThermalElement, positions: &[DVec2]) -> Vec<EnergyChunkId> {
        let mut rng = SimRng::seed_from_u64(3);
        positions
            .iter()
            .map(|&p| {
                let chunk = EnergyChunk::at(EnergyType::Thermal, p);
                let id = chunk.id();
                element.add_energy_chunk(chunk, &mut rng);
                id
            })
            .collect()
    }

    #[test]
    fn test_enclosed_element_gives_up_chunk_nearest_its_sides() {
        let mut element = element(&[0.0]);
        let ids = place(
            &mut element,
            &[DVec2::new(0.0, 0.01), DVec2::new(0.03, 0.05), DVec2::new(-0.01, 0.09)],
        );
        let surroundings = Rect::new(-1.0, -1.0, 1.0, 1.0);
        let chunk = element
            .extract_energy_chunk_closest_to_bounds(&surroundings)
            .expect("element has chunks");
        assert_eq!(chunk.id(), ids[1]);
        assert_eq!(element.num_energy_chunks(), 2);
    }

    #[test]
    fn test_enclosing_element_skips_chunks_inside_destination() {
        let mut element = element(&[0.0]);
        let ids = place(
            &mut element,
            &[DVec2::new(0.0, 0.02), DVec2::new(0.03, 0.02), DVec2::new(-0.04, 0.08)],
        );
        let inner = Rect::new(-0.02, 0.0, 0.02, 0.04);
        let chunk = element
            .extract_energy_chunk_closest_to_bounds(&inner)
            .expect("element has chunks");
        assert_eq!(chunk.id(), ids[1]);
    }

    #[test]
    fn test_separate_destination_takes_chunk_nearest_its_centre() {
        let mut element = element(&[0.0]);
        let ids = place(
            &mut element,
            &[DVec2::new(-0.04, 0.05), DVec2::new(0.04, 0.05), DVec2::new(0.0, 0.05)],
        );
        let neighbour = Rect::new(0.2, 0.0, 0.3, 0.1);
        let chunk = element
            .extract_energy_chunk_closest_to_bounds(&neighbour)
            .expect("element has chunks");
        assert_eq!(chunk.id(), ids[1]);
    }

    #[test]
    fn test_depth_shifts_which_chunk_is_nearest() {
        // first chunk lands in the back slice, second in the front one
        let mut element = element(&[-0.2, 0.0]);
        let ids = place(&mut element, &[DVec2::new(0.0, 0.03), DVec2::new(0.0, 0.07)]);
        assert!(element.slices[0].contains_energy_chunk(ids[0]));

        // both are 0.02 from the point on screen, but the back one sits 0.05 lower
        let chunk = element
            .extract_energy_chunk_closest_to_point(DVec2::new(0.0, 0.05))
            .expect("element has chunks");
        assert_eq!(chunk.id(), ids[1]);
    }

    #[test]
    fn test_empty_slices_fall_back_to_approaching_chunk() {
        let mut element = element(&[0.0]);
        let ids = place(&mut element, &[DVec2::new(0.5, 0.5)]);
        assert_eq!(element.approaching_energy_chunks().count(), 1);
        let chunk = element
            .extract_energy_chunk_closest_to_point(DVec2::ZERO)
            .expect("approaching chunk");
        assert_eq!(chunk.id(), ids[0]);
        assert!(element.extract_energy_chunk_closest_to_point(DVec2::ZERO).is_none());
    }
}
