/// Temperature reporting operation
/// Logs every container's temperature and chunk balance at a fixed step interval

use crate::sim::simulation::ThermalSimulation;
use crate::sim_op::SimOp;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureReading {
    pub name: String,
    pub temperature_k: f64,
    pub energy_chunks: usize,
    pub balance: i64,
}

pub struct TemperatureReportingOp {
    pub report_interval_steps: u64,
    last_report: Vec<TemperatureReading>,
    reports: u64,
}

impl TemperatureReportingOp {
    pub fn new() -> Self {
        Self::with_interval(60) // once a simulated second at normal speed
    }

    pub fn with_interval(report_interval_steps: u64) -> Self {
        Self {
            report_interval_steps: report_interval_steps.max(1),
            last_report: Vec::new(),
            reports: 0,
        }
    }

    pub fn last_report(&self) -> &[TemperatureReading] {
        &self.last_report
    }

    pub fn report_count(&self) -> u64 {
        self.reports
    }

    fn take_readings(&mut self, sim: &ThermalSimulation) {
        self.last_report = sim
            .containers
            .iter()
            .map(|container| TemperatureReading {
                name: container.name().to_string(),
                temperature_k: container.temperature(),
                energy_chunks: container.element().num_energy_chunks(),
                balance: container.element().energy_chunk_balance(),
            })
            .collect();
        self.reports += 1;
    }
}

impl Default for TemperatureReportingOp {
    fn default() -> Self {
        Self::new()
    }
}

impl SimOp for TemperatureReportingOp {
    fn name(&self) -> &str {
        "TemperatureReportingOp"
    }

    fn update_sim(&mut self, sim: &mut ThermalSimulation) {
        if sim.step % self.report_interval_steps != 0 {
            return;
        }
        self.take_readings(sim);
        for reading in &self.last_report {
            debug!(
                step = sim.step,
                container = %reading.name,
                temperature_k = reading.temperature_k,
                chunks = reading.energy_chunks,
                balance = reading.balance,
                "container temperature"
            );
        }
        debug!(step = sim.step, temperature_k = sim.air.temperature(), chunks = sim.air.num_energy_chunks(), "air temperature");
    }

    fn after_sim(&mut self, sim: &mut ThermalSimulation) {
        self.take_readings(sim);
        for reading in &self.last_report {
            info!(
                container = %reading.name,
                temperature_k = reading.temperature_k,
                chunks = reading.energy_chunks,
                "final container temperature"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EfacConfig;
    use crate::constants::ROOM_TEMPERATURE;
    use crate::sim::simulation::ThermalSimProps;
    use crate::thermal::{Block, BlockType};
    use approx::assert_abs_diff_eq;
    use glam::DVec2;

    #[test]
    fn test_reports_on_interval() {
        let config = EfacConfig::seeded(1);
        let block = Block::new(BlockType::Brick, DVec2::ZERO, &config);
        let mut sim = ThermalSimulation::new(ThermalSimProps {
            name: "report",
            config,
            containers: vec![Box::new(block)],
            burners: Vec::new(),
            ops: Vec::new(),
        })
        .expect("valid config");

        let mut op = TemperatureReportingOp::with_interval(10);
        for _ in 0..25 {
            sim.step(1.0 / 60.0);
            op.update_sim(&mut sim);
        }
        // steps 10 and 20
        assert_eq!(op.report_count(), 2);
        assert_eq!(op.last_report().len(), 1);
        assert_eq!(op.last_report()[0].name, "brick");
        assert_abs_diff_eq!(op.last_report()[0].temperature_k, ROOM_TEMPERATURE, epsilon = 1e-9);
    }
}
