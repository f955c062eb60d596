//! Minimal 2D shapes used for container slices and thermal contact areas.

use crate::constants::{Z_TO_X_OFFSET_MULTIPLIER, Z_TO_Y_OFFSET_MULTIPLIER};
use crate::math_utils::polar;
use glam::DVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Axis-aligned rectangle, y up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: DVec2,
    pub max: DVec2,
}

impl Rect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min: DVec2::new(min_x.min(max_x), min_y.min(max_y)),
            max: DVec2::new(min_x.max(max_x), min_y.max(max_y)),
        }
    }

    /// Rectangle whose bottom edge is centred on `position`.
    pub fn from_bottom_center(position: DVec2, width: f64, height: f64) -> Self {
        Self::new(
            position.x - width / 2.0,
            position.y,
            position.x + width / 2.0,
            position.y + height,
        )
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    pub fn translated(&self, delta: DVec2) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    /// Shrink (or grow, for negative values) every side by `amount`.
    pub fn inset(&self, amount: f64) -> Self {
        Self::new(
            self.min.x + amount,
            self.min.y + amount,
            self.max.x - amount,
            self.max.y - amount,
        )
    }

    pub fn horizontal_overlap(&self, other: &Rect) -> f64 {
        (self.max.x.min(other.max.x) - self.min.x.max(other.min.x)).max(0.0)
    }

    pub fn vertical_overlap(&self, other: &Rect) -> f64 {
        (self.max.y.min(other.max.y) - self.min.y.max(other.min.y)).max(0.0)
    }

    /// Distance from an interior point to the nearest edge; 0 outside.
    pub fn distance_to_edge(&self, p: DVec2) -> f64 {
        if !self.contains(p) {
            return 0.0;
        }
        (p.x - self.min.x)
            .min(self.max.x - p.x)
            .min(p.y - self.min.y)
            .min(self.max.y - p.y)
    }

    /// Distance from any point to the rectangle outline.
    pub fn distance_to_outline(&self, p: DVec2) -> f64 {
        if self.contains(p) {
            return self.distance_to_edge(p);
        }
        let clamped = p.clamp(self.min, self.max);
        p.distance(clamped)
    }

    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> DVec2 {
        DVec2::new(
            self.min.x + rng.random::<f64>() * self.width(),
            self.min.y + rng.random::<f64>() * self.height(),
        )
    }
}

/// Outline of a single container slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SliceBounds {
    Rectangle(Rect),
    /// Axis-aligned ellipse, used for beaker cross-sections.
    Ellipse {
        center: DVec2,
        radius_x: f64,
        radius_y: f64,
    },
}

impl SliceBounds {
    pub fn contains(&self, p: DVec2) -> bool {
        match self {
            SliceBounds::Rectangle(rect) => rect.contains(p),
            SliceBounds::Ellipse { .. } => self.normalized_radius(p) <= 1.0,
        }
    }

    pub fn center(&self) -> DVec2 {
        match self {
            SliceBounds::Rectangle(rect) => rect.center(),
            SliceBounds::Ellipse { center, .. } => *center,
        }
    }

    pub fn area(&self) -> f64 {
        match self {
            SliceBounds::Rectangle(rect) => rect.area(),
            SliceBounds::Ellipse {
                radius_x, radius_y, ..
            } => PI * radius_x * radius_y,
        }
    }

    /// Bounding rectangle of the shape.
    pub fn bounding_rect(&self) -> Rect {
        match self {
            SliceBounds::Rectangle(rect) => *rect,
            SliceBounds::Ellipse {
                center,
                radius_x,
                radius_y,
            } => Rect::new(
                center.x - radius_x,
                center.y - radius_y,
                center.x + radius_x,
                center.y + radius_y,
            ),
        }
    }

    pub fn translated(&self, delta: DVec2) -> Self {
        match self {
            SliceBounds::Rectangle(rect) => SliceBounds::Rectangle(rect.translated(delta)),
            SliceBounds::Ellipse {
                center,
                radius_x,
                radius_y,
            } => SliceBounds::Ellipse {
                center: *center + delta,
                radius_x: *radius_x,
                radius_y: *radius_y,
            },
        }
    }

    /// `sqrt((dx/rx)² + (dy/ry)²)`; 1 on the outline of an ellipse.
    pub(crate) fn normalized_radius(&self, p: DVec2) -> f64 {
        match self {
            SliceBounds::Rectangle(rect) => {
                let half = DVec2::new(rect.width() / 2.0, rect.height() / 2.0);
                let d = (p - rect.center()).abs() / half;
                d.x.max(d.y)
            }
            SliceBounds::Ellipse {
                center,
                radius_x,
                radius_y,
            } => {
                let d = p - *center;
                ((d.x / radius_x).powi(2) + (d.y / radius_y).powi(2)).sqrt()
            }
        }
    }

    /// Uniformly sample a point inside the shape.
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> DVec2 {
        match self {
            SliceBounds::Rectangle(rect) => rect.random_point(rng),
            SliceBounds::Ellipse {
                center,
                radius_x,
                radius_y,
            } => {
                // sqrt keeps the density uniform over the area
                let r = rng.random::<f64>().sqrt();
                let unit = polar(r, rng.random::<f64>() * TAU);
                *center + DVec2::new(unit.x * radius_x, unit.y * radius_y)
            }
        }
    }
}

/// Screen-space offset applied to something at depth `z`.
pub fn perspective_offset(z: f64) -> DVec2 {
    DVec2::new(z * Z_TO_X_OFFSET_MULTIPLIER, z * Z_TO_Y_OFFSET_MULTIPLIER)
}
