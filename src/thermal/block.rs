use super::{ThermalContainer, ThermalElement, ThermalElementParams};
use crate::config::EfacConfig;
use crate::constants::{
    BLOCK_SURFACE_WIDTH, BLOCK_VOLUME, BRICK_DENSITY, BRICK_SPECIFIC_HEAT, IRON_DENSITY, IRON_SPECIFIC_HEAT,
    NUM_BLOCK_SLICES,
};
use crate::geometry::{Rect, SliceBounds, perspective_offset};
use crate::heat_transfer::EnergyContainerCategory;
use glam::DVec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockType {
    Brick,
    Iron,
}

impl BlockType {
    pub fn density(&self) -> f64 {
        match self {
            BlockType::Brick => BRICK_DENSITY,
            BlockType::Iron => IRON_DENSITY,
        }
    }

    pub fn specific_heat(&self) -> f64 {
        match self {
            BlockType::Brick => BRICK_SPECIFIC_HEAT,
            BlockType::Iron => IRON_SPECIFIC_HEAT,
        }
    }

    pub fn category(&self) -> EnergyContainerCategory {
        match self {
            BlockType::Brick => EnergyContainerCategory::Brick,
            BlockType::Iron => EnergyContainerCategory::Iron,
        }
    }
}

/// A solid cube with rectangular slices receding into the page.
#[derive(Debug, Clone)]
pub struct Block {
    block_type: BlockType,
    element: ThermalElement,
}

impl Block {
    pub fn new(block_type: BlockType, position: DVec2, config: &EfacConfig) -> Self {
        let width = BLOCK_SURFACE_WIDTH;
        let element = ThermalElement::new(
            ThermalElementParams {
                position,
                width,
                height: width,
                mass: BLOCK_VOLUME * block_type.density(),
                specific_heat: block_type.specific_heat(),
                category: block_type.category(),
                supports_immersion: false,
                slices: block_slices(position, width),
            },
            config,
        );
        Self { block_type, element }
    }

    pub fn block_type(&self) -> BlockType {
        self.block_type
    }
}

/// Front slice at z = 0, the rest spread back to half the block's width.
fn block_slices(position: DVec2, width: f64) -> Vec<(SliceBounds, f64)> {
    let face = Rect::from_bottom_center(position, width, width).inset(width * 0.1);
    (0..NUM_BLOCK_SLICES)
        .map(|i| {
            let z = -(i as f64) / (NUM_BLOCK_SLICES - 1).max(1) as f64 * width * 0.5;
            (SliceBounds::Rectangle(face.translated(perspective_offset(z))), z)
        })
        .collect()
}

impl ThermalContainer for Block {
    fn name(&self) -> &str {
        match self.block_type {
            BlockType::Brick => "brick",
            BlockType::Iron => "iron",
        }
    }

    fn element(&self) -> &ThermalElement {
        &self.element
    }

    fn element_mut(&mut self) -> &mut ThermalElement {
        &mut self.element
    }
}
