use crate::constants::TEMPERATURES_EQUAL_THRESHOLD;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coarse material tag used to look up how fast heat moves between two containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnergyContainerCategory {
    Iron,
    Brick,
    Water,
    OliveOil,
    Air,
}

impl EnergyContainerCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyContainerCategory::Iron => "iron",
            EnergyContainerCategory::Brick => "brick",
            EnergyContainerCategory::Water => "water",
            EnergyContainerCategory::OliveOil => "olive oil",
            EnergyContainerCategory::Air => "air",
        }
    }
}

/// Symmetric table of heat transfer constants (W/(m·K) in model units).
static HEAT_TRANSFER_CONSTANTS: Lazy<HashMap<(EnergyContainerCategory, EnergyContainerCategory), f64>> =
    Lazy::new(|| {
        use EnergyContainerCategory::*;
        let pairs = [
            (Iron, Iron, 50.0),
            (Iron, Brick, 20.0),
            (Iron, Water, 80.0),
            (Iron, OliveOil, 80.0),
            (Iron, Air, 10.0),
            (Brick, Brick, 20.0),
            (Brick, Water, 80.0),
            (Brick, OliveOil, 80.0),
            (Brick, Air, 15.0),
            (Water, Water, 100.0),
            (Water, OliveOil, 100.0),
            (Water, Air, 25.0),
            (OliveOil, OliveOil, 100.0),
            (OliveOil, Air, 25.0),
            (Air, Air, 10.0),
        ];
        let mut table = HashMap::new();
        for (a, b, k) in pairs {
            table.insert((a, b), k);
            table.insert((b, a), k);
        }
        table
    });

pub fn heat_transfer_constant(a: EnergyContainerCategory, b: EnergyContainerCategory) -> f64 {
    HEAT_TRANSFER_CONSTANTS.get(&(a, b)).copied().unwrap_or(0.0)
}

/// Anything that stores thermal energy as a single continuous quantity.
pub trait HeatReservoir {
    fn energy(&self) -> f64;
    fn heat_capacity(&self) -> f64;
    fn change_energy(&mut self, delta: f64);

    fn temperature(&self) -> f64 {
        self.energy() / self.heat_capacity()
    }
}

/// Move heat between two reservoirs in contact for `dt` seconds.
///
/// `dt` is split into `floor(dt / max_step)` steps of `max_step` plus the
/// remainder. Temperatures are re-read before every sub-step and each transfer
/// is capped at the amount that would equalise them, so the temperature gap
/// shrinks monotonically and never changes sign. Whatever `a` gains `b` loses.
///
/// Returns the total energy moved into `a` (negative when `a` cooled).
pub fn exchange_energy(
    a: &mut dyn HeatReservoir,
    b: &mut dyn HeatReservoir,
    contact_length: f64,
    heat_transfer_constant: f64,
    dt: f64,
    max_step: f64,
) -> f64 {
    if !(contact_length > 0.0) || !(dt > 0.0) || !(max_step > 0.0) {
        return 0.0;
    }
    let (capacity_a, capacity_b) = (a.heat_capacity(), b.heat_capacity());
    debug_assert!(capacity_a > 0.0 && capacity_b > 0.0, "heat capacities must be positive");
    if !(capacity_a > 0.0) || !(capacity_b > 0.0) {
        return 0.0;
    }
    // energy that brings a unit temperature gap to zero
    let equalising_per_kelvin = capacity_a * capacity_b / (capacity_a + capacity_b);

    let full_steps = (dt / max_step).floor() as usize;
    let remainder = dt - full_steps as f64 * max_step;
    let mut total = 0.0;

    let sub_steps = std::iter::repeat_n(max_step, full_steps).chain((remainder > 0.0).then_some(remainder));
    for sub_dt in sub_steps {
        let gap = b.temperature() - a.temperature();
        if gap.abs() < TEMPERATURES_EQUAL_THRESHOLD {
            break;
        }
        let flow = gap * contact_length * heat_transfer_constant * sub_dt;
        let limit = gap.abs() * equalising_per_kelvin;
        let transfer = flow.clamp(-limit, limit);
        a.change_energy(transfer);
        b.change_energy(-transfer);
        total += transfer;
    }
    total
}
