// Operators run by the thermal simulation every step, in order
pub mod burner_op;
pub mod energy_chunk_exchange_op;
pub mod heat_exchange_op;
pub mod temperature_reporting_op;

pub use burner_op::BurnerOp;
pub use energy_chunk_exchange_op::EnergyChunkExchangeOp;
pub use heat_exchange_op::HeatExchangeOp;
pub use temperature_reporting_op::{TemperatureReading, TemperatureReportingOp};

use crate::sim::simulation::ThermalSimulation;

pub trait SimOp {
    /// The name of this operator (for identification and lookup)
    fn name(&self) -> &str;

    /// Called once before the first step
    fn init_sim(&mut self, _sim: &mut ThermalSimulation) {}

    /// Called every simulation step, after the containers have moved their chunks
    fn update_sim(&mut self, _sim: &mut ThermalSimulation) {}

    /// Called once when the simulation is finished
    fn after_sim(&mut self, _sim: &mut ThermalSimulation) {}
}

pub struct SimOpHandle {
    pub op: Box<dyn SimOp>,
}

impl SimOpHandle {
    /// Create a new SimOpHandle with the given operation
    pub fn new(op: Box<dyn SimOp>) -> Self {
        SimOpHandle { op }
    }
}
