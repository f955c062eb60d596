use super::{ThermalContainer, ThermalElement, ThermalElementParams};
use crate::config::EfacConfig;
use crate::constants::{
    BEAKER_HEIGHT, BEAKER_WIDTH, INITIAL_FLUID_LEVEL, NUM_BEAKER_SLICES, OLIVE_OIL_DENSITY, OLIVE_OIL_SPECIFIC_HEAT,
    WATER_DENSITY, WATER_SPECIFIC_HEAT,
};
use crate::geometry::{Rect, SliceBounds, perspective_offset};
use crate::heat_transfer::EnergyContainerCategory;
use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// fraction of the fluid cross-section used by the chunk slices
const SLICE_FILL: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeakerType {
    Water,
    OliveOil,
}

impl BeakerType {
    pub fn density(&self) -> f64 {
        match self {
            BeakerType::Water => WATER_DENSITY,
            BeakerType::OliveOil => OLIVE_OIL_DENSITY,
        }
    }

    pub fn specific_heat(&self) -> f64 {
        match self {
            BeakerType::Water => WATER_SPECIFIC_HEAT,
            BeakerType::OliveOil => OLIVE_OIL_SPECIFIC_HEAT,
        }
    }

    pub fn category(&self) -> EnergyContainerCategory {
        match self {
            BeakerType::Water => EnergyContainerCategory::Water,
            BeakerType::OliveOil => EnergyContainerCategory::OliveOil,
        }
    }
}

/// A cylindrical beaker of fluid seen from the front.
///
/// Only the fluid holds energy, so the element's height is the fluid height
/// and its slices are ellipses inscribed in the fluid, receding into the page.
/// Blocks can be immersed in it.
#[derive(Debug, Clone)]
pub struct Beaker {
    beaker_type: BeakerType,
    fluid_level: f64,
    element: ThermalElement,
}

impl Beaker {
    pub fn new(beaker_type: BeakerType, position: DVec2, config: &EfacConfig) -> Self {
        let fluid_height = BEAKER_HEIGHT * INITIAL_FLUID_LEVEL;
        let element = ThermalElement::new(
            ThermalElementParams {
                position,
                width: BEAKER_WIDTH,
                height: fluid_height,
                mass: fluid_mass(beaker_type, fluid_height),
                specific_heat: beaker_type.specific_heat(),
                category: beaker_type.category(),
                supports_immersion: true,
                slices: beaker_slices(position, fluid_height),
            },
            config,
        );
        Self {
            beaker_type,
            fluid_level: INITIAL_FLUID_LEVEL,
            element,
        }
    }

    pub fn beaker_type(&self) -> BeakerType {
        self.beaker_type
    }

    pub fn fluid_level(&self) -> f64 {
        self.fluid_level
    }

    /// Change the fill proportion, keeping the temperature and rebuilding the slices.
    pub fn set_fluid_level(&mut self, fluid_level: f64) {
        let fluid_level = fluid_level.clamp(0.05, 1.0);
        if fluid_level == self.fluid_level {
            return;
        }
        self.fluid_level = fluid_level;
        let fluid_height = BEAKER_HEIGHT * fluid_level;
        let position = self.element.position();
        self.element
            .set_slice_bounds(beaker_slices(position, fluid_height), fluid_height);
        self.element.set_mass(fluid_mass(self.beaker_type, fluid_height));
    }
}

fn fluid_mass(beaker_type: BeakerType, fluid_height: f64) -> f64 {
    PI * (BEAKER_WIDTH / 2.0).powi(2) * fluid_height * beaker_type.density()
}

fn beaker_slices(position: DVec2, fluid_height: f64) -> Vec<(SliceBounds, f64)> {
    let fluid = Rect::from_bottom_center(position, BEAKER_WIDTH, fluid_height);
    let radius_x = fluid.width() / 2.0 * SLICE_FILL;
    let radius_y = fluid.height() / 2.0 * SLICE_FILL;
    (0..NUM_BEAKER_SLICES)
        .map(|i| {
            // shallower than a block so the back slices stay inside the glass
            let z = -(i as f64) / (NUM_BEAKER_SLICES - 1).max(1) as f64 * BEAKER_WIDTH * 0.25;
            let bounds = SliceBounds::Ellipse {
                center: fluid.center() + perspective_offset(z),
                radius_x,
                radius_y,
            };
            (bounds, z)
        })
        .collect()
}

impl ThermalContainer for Beaker {
    fn name(&self) -> &str {
        match self.beaker_type {
            BeakerType::Water => "water",
            BeakerType::OliveOil => "olive oil",
        }
    }

    fn element(&self) -> &ThermalElement {
        &self.element
    }

    fn element_mut(&mut self) -> &mut ThermalElement {
        &mut self.element
    }

    fn outline(&self) -> Rect {
        Rect::from_bottom_center(self.element.position(), BEAKER_WIDTH, BEAKER_HEIGHT)
    }
}
