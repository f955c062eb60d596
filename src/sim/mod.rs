pub mod simulation;

pub use simulation::{OpTiming, ThermalSimProps, ThermalSimulation};
