use serde::{Deserialize, Serialize};

/// Form of energy a chunk (or a quantity of energy) represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnergyType {
    Thermal,
    Mechanical,
    Electrical,
    Light,
    Chemical,
    /// Used only to pace visual hand-offs; never shown.
    Hidden,
}

impl EnergyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyType::Thermal => "thermal",
            EnergyType::Mechanical => "mechanical",
            EnergyType::Electrical => "electrical",
            EnergyType::Light => "light",
            EnergyType::Chemical => "chemical",
            EnergyType::Hidden => "hidden",
        }
    }
}

/// Quantity of energy passed from one pipeline stage to the next each tick.
///
/// `amount` is in joules and never negative. `direction` is in radians,
/// 0 = +x, counter-clockwise positive, and only meaningful for some types.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Energy {
    pub energy_type: EnergyType,
    pub amount: f64,
    pub direction: f64,
}

impl Energy {
    pub fn new(energy_type: EnergyType, amount: f64, direction: f64) -> Self {
        debug_assert!(amount.is_finite(), "energy amount must be finite, got {amount}");
        Self {
            energy_type,
            amount: amount.max(0.0),
            direction,
        }
    }

    /// No energy at all; the type is irrelevant.
    pub fn none() -> Self {
        Self {
            energy_type: EnergyType::Hidden,
            amount: 0.0,
            direction: 0.0,
        }
    }

    pub fn is_none(&self) -> bool {
        self.amount <= 0.0
    }

    /// Same energy with `amount` replaced, useful for per-second rates.
    pub fn with_amount(&self, amount: f64) -> Self {
        Self::new(self.energy_type, amount, self.direction)
    }
}
