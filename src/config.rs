use crate::constants::{MAX_HEAT_EXCHANGE_TIME_STEP, MAX_PRELOAD_TIME, MAX_SETTLE_ITERATIONS};
use crate::energy_chunk_distributor::DistributorParams;
use crate::error::EfacError;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

/// Random source threaded explicitly through everything that jitters or samples.
pub type SimRng = SmallRng;

/// Runtime knobs shared by the thermal and energy-systems simulations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EfacConfig {
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
    /// Relaxation constants for chunk distribution inside containers.
    pub distributor: DistributorParams,
    /// Largest heat-exchange sub-step in seconds.
    pub max_heat_exchange_time_step: f64,
    /// Upper bound on relaxation iterations when seeding a container.
    pub settle_max_iterations: usize,
    /// Simulated-time budget for an element preload, in seconds.
    pub preload_max_time: f64,
    /// Whether containers trade heat and chunks with the surrounding air.
    pub air_exchange_enabled: bool,
}

impl Default for EfacConfig {
    fn default() -> Self {
        Self {
            rng_seed: None,
            distributor: DistributorParams::default(),
            max_heat_exchange_time_step: MAX_HEAT_EXCHANGE_TIME_STEP,
            settle_max_iterations: MAX_SETTLE_ITERATIONS,
            preload_max_time: MAX_PRELOAD_TIME,
            air_exchange_enabled: true,
        }
    }
}

impl EfacConfig {
    /// Default configuration with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng_seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), EfacError> {
        self.distributor.validate()?;
        if !(self.max_heat_exchange_time_step > 0.0) {
            return Err(EfacError::InvalidConfig(
                "max_heat_exchange_time_step must be positive",
            ));
        }
        if self.settle_max_iterations == 0 {
            return Err(EfacError::InvalidConfig(
                "settle_max_iterations must be non-zero",
            ));
        }
        if !(self.preload_max_time > 0.0) || !self.preload_max_time.is_finite() {
            return Err(EfacError::InvalidConfig(
                "preload_max_time must be positive and finite",
            ));
        }
        Ok(())
    }

    /// Returns the configured RNG, drawing a seed from entropy if none is set.
    pub fn seeded_rng(&self) -> SimRng {
        match self.rng_seed {
            Some(seed) => SimRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SimRng::seed_from_u64(seed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EfacConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = EfacConfig::default();
        config.max_heat_exchange_time_step = 0.0;
        assert!(matches!(config.validate(), Err(EfacError::InvalidConfig(_))));

        let mut config = EfacConfig::default();
        config.preload_max_time = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = EfacConfig::default();
        config.distributor.damping = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_seed_makes_rng_reproducible() {
        let config = EfacConfig::seeded(42);
        let mut first = config.seeded_rng();
        let mut second = config.seeded_rng();
        let a: Vec<u32> = (0..4).map(|_| first.random()).collect();
        let b: Vec<u32> = (0..4).map(|_| second.random()).collect();
        assert_eq!(a, b);
    }
}
