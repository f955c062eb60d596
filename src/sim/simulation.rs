use crate::config::{EfacConfig, SimRng};
use crate::energy_chunk::EnergyChunk;
use crate::error::EfacError;
use crate::heat_transfer::HeatReservoir;
use crate::sim_op::{
    BurnerOp, EnergyChunkExchangeOp, HeatExchangeOp, SimOp, SimOpHandle, TemperatureReportingOp,
};
use crate::state::ThermalSimulationState;
use crate::thermal::{Air, Burner, ThermalContainer};
use glam::DVec2;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct OpTiming {
    pub op_name: String,
    pub init_time: Duration,
    pub total_update_time: Duration,
    pub update_call_count: u32,
    pub after_time: Duration,
}

impl OpTiming {
    pub fn new(op_name: String) -> Self {
        Self {
            op_name,
            init_time: Duration::ZERO,
            total_update_time: Duration::ZERO,
            update_call_count: 0,
            after_time: Duration::ZERO,
        }
    }

    pub fn avg_update_time(&self) -> Duration {
        if self.update_call_count > 0 {
            self.total_update_time / self.update_call_count
        } else {
            Duration::ZERO
        }
    }

    pub fn total_time(&self) -> Duration {
        self.init_time + self.total_update_time + self.after_time
    }
}

/// Blocks and beakers on burners, surrounded by air.
///
/// Each `step(dt)` first lets every container relax its chunks and pull in
/// approaching ones, then runs the operators in order.
pub struct ThermalSimulation {
    pub name: String,
    pub config: EfacConfig,
    pub containers: Vec<Box<dyn ThermalContainer>>,
    pub air: Air,
    pub burners: Vec<Burner>,
    pub rng: SimRng,
    pub ops: Vec<Box<dyn SimOp>>,
    pub op_timings: Vec<OpTiming>,
    /// Number of completed steps; already incremented while operators run.
    pub step: u64,
    /// Length of the step in progress, in seconds.
    pub dt: f64,
    pub elapsed_time: f64,
    initialized: bool,
}

pub struct ThermalSimProps {
    pub name: &'static str,
    pub config: EfacConfig,
    pub containers: Vec<Box<dyn ThermalContainer>>,
    pub burners: Vec<Burner>,
    pub ops: Vec<SimOpHandle>,
}

impl ThermalSimulation {
    pub fn new(props: ThermalSimProps) -> Result<ThermalSimulation, EfacError> {
        props.config.validate()?;
        let mut rng = props.config.seeded_rng();
        let mut containers = props.containers;
        for container in &mut containers {
            container.element_mut().add_initial_energy_chunks(&mut rng);
        }
        let ops: Vec<Box<dyn SimOp>> = props.ops.into_iter().map(|handle| handle.op).collect();
        let op_timings = ops.iter().map(|op| OpTiming::new(op.name().to_string())).collect();

        Ok(ThermalSimulation {
            name: props.name.to_string(),
            air: Air::new(props.config.max_heat_exchange_time_step),
            config: props.config,
            containers,
            burners: props.burners,
            rng,
            ops,
            op_timings,
            step: 0,
            dt: 0.0,
            elapsed_time: 0.0,
            initialized: false,
        })
    }

    /// Burner, heat exchange, chunk exchange and reporting, in that order.
    pub fn default_ops() -> Vec<SimOpHandle> {
        vec![
            SimOpHandle::new(Box::new(BurnerOp::new())),
            SimOpHandle::new(Box::new(HeatExchangeOp::new())),
            SimOpHandle::new(Box::new(EnergyChunkExchangeOp::new())),
            SimOpHandle::new(Box::new(TemperatureReportingOp::new())),
        ]
    }

    pub fn step(&mut self, dt: f64) {
        if !self.initialized {
            self.simulate_init();
            self.initialized = true;
        }
        self.dt = dt;
        self.step += 1;

        for container in &mut self.containers {
            container.element_mut().step(dt, &mut self.rng);
        }
        self.air.step(dt);
        self.simulate_step();
        self.elapsed_time += dt;
    }

    /// Step `steps` times, then run the end-of-simulation hooks.
    pub fn run(&mut self, steps: u64, dt: f64) {
        for _ in 0..steps {
            self.step(dt);
        }
        self.finish();
    }

    pub fn finish(&mut self) {
        self.simulate_end();
        self.timing_report();
    }

    /// Move a container, carrying its chunks along before they are relaxed again.
    pub fn set_container_position(&mut self, index: usize, position: DVec2) -> Result<(), EfacError> {
        let len = self.containers.len();
        let container = self
            .containers
            .get_mut(index)
            .ok_or(EfacError::IndexOutOfRange { index, len })?;
        container.element_mut().set_position(position);
        Ok(())
    }

    /// Index of the first container resting on `burner`.
    pub fn container_index_on_burner(&self, burner: &Burner) -> Option<usize> {
        self.containers
            .iter()
            .position(|container| burner.is_supporting(&container.outline()))
    }

    /// True when the container sits entirely inside another one that holds fluid.
    pub fn is_immersed(&self, index: usize) -> bool {
        let Some(container) = self.containers.get(index) else {
            return false;
        };
        let area = container.thermal_contact_area();
        self.containers
            .iter()
            .enumerate()
            .any(|(other, c)| other != index && area.is_immersed_in(&c.thermal_contact_area()))
    }

    /// Every chunk owned by a container or rising through the air.
    pub fn energy_chunks(&self) -> impl Iterator<Item = &EnergyChunk> {
        self.containers
            .iter()
            .flat_map(|container| container.element().energy_chunks())
            .chain(self.air.energy_chunks())
    }

    /// Total thermal energy held by containers and air.
    pub fn total_energy(&self) -> f64 {
        self.containers.iter().map(|c| c.element().energy()).sum::<f64>() + self.air.energy()
    }

    pub fn reset(&mut self) {
        for container in &mut self.containers {
            container.element_mut().reset(&mut self.rng);
        }
        for burner in &mut self.burners {
            burner.set_heat_cool_level(0.0);
        }
        self.air.reset();
        self.step = 0;
        self.elapsed_time = 0.0;
        debug!(name = %self.name, "thermal simulation reset");
    }

    pub fn state(&self) -> ThermalSimulationState {
        ThermalSimulationState {
            step: self.step,
            elapsed_time: self.elapsed_time,
            containers: self.containers.iter().map(|c| c.element().state()).collect(),
            air: self.air.state(),
            burners: self.burners.iter().map(|b| b.state()).collect(),
        }
    }

    pub fn apply_state(&mut self, state: &ThermalSimulationState) -> Result<(), EfacError> {
        if state.containers.len() != self.containers.len() || state.burners.len() != self.burners.len() {
            return Err(EfacError::StateMismatch {
                expected: "thermal simulation with the same containers and burners",
                found: "thermal simulation of a different layout",
            });
        }
        for (container, container_state) in self.containers.iter().zip(&state.containers) {
            container.element().check_state(container_state)?;
        }
        for (burner, burner_state) in self.burners.iter().zip(&state.burners) {
            burner.check_state(burner_state)?;
        }
        self.air.check_state(&state.air)?;

        for (container, container_state) in self.containers.iter_mut().zip(&state.containers) {
            container.element_mut().apply_state(container_state)?;
        }
        for (burner, burner_state) in self.burners.iter_mut().zip(&state.burners) {
            burner.apply_state(burner_state)?;
        }
        self.air.apply_state(&state.air)?;
        self.step = state.step;
        self.elapsed_time = state.elapsed_time;
        Ok(())
    }

    fn simulate_init(&mut self) {
        let mut ops = std::mem::take(&mut self.ops);

        for (i, op) in ops.iter_mut().enumerate() {
            let start = Instant::now();
            op.init_sim(self);
            self.op_timings[i].init_time = start.elapsed();
        }
        self.ops = ops;
    }

    fn simulate_end(&mut self) {
        let mut ops = std::mem::take(&mut self.ops);

        for (i, op) in ops.iter_mut().enumerate() {
            let start = Instant::now();
            op.after_sim(self);
            self.op_timings[i].after_time = start.elapsed();
        }
        self.ops = ops;
    }

    fn simulate_step(&mut self) {
        let mut ops = std::mem::take(&mut self.ops);

        for (i, op) in ops.iter_mut().enumerate() {
            let start = Instant::now();
            op.update_sim(self);
            self.op_timings[i].total_update_time += start.elapsed();
            self.op_timings[i].update_call_count += 1;
        }
        self.ops = ops;
    }

    pub fn timing_report(&self) {
        let total_time: Duration = self.op_timings.iter().map(|t| t.total_time()).sum();

        for timing in &self.op_timings {
            let share = if total_time > Duration::ZERO {
                timing.total_time().as_secs_f64() / total_time.as_secs_f64() * 100.0
            } else {
                0.0
            };
            info!(
                op = %timing.op_name,
                total_ms = timing.total_time().as_secs_f64() * 1000.0,
                avg_step_ms = timing.avg_update_time().as_secs_f64() * 1000.0,
                init_ms = timing.init_time.as_secs_f64() * 1000.0,
                after_ms = timing.after_time.as_secs_f64() * 1000.0,
                share_percent = share,
                "operator timing"
            );
        }
        info!(
            name = %self.name,
            steps = self.step,
            simulated_seconds = self.elapsed_time,
            total_ms = total_time.as_secs_f64() * 1000.0,
            "thermal simulation timing"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BURNER_HEIGHT;
    use crate::thermal::{Beaker, BeakerType, Block, BlockType};
    use approx::assert_abs_diff_eq;
    use std::collections::HashSet;

    fn lab(seed: u64) -> ThermalSimulation {
        let config = EfacConfig::seeded(seed);
        let brick = Block::new(BlockType::Brick, DVec2::new(-0.1, BURNER_HEIGHT), &config);
        let iron = Block::new(BlockType::Iron, DVec2::new(0.2, 0.0), &config);
        let water = Beaker::new(BeakerType::Water, DVec2::new(0.1, BURNER_HEIGHT), &config);
        let mut heater = Burner::new(DVec2::new(-0.1, 0.0));
        heater.set_heat_cool_level(1.0);
        let mut cooler = Burner::new(DVec2::new(0.1, 0.0));
        cooler.set_heat_cool_level(-0.5);

        ThermalSimulation::new(ThermalSimProps {
            name: "lab",
            config,
            containers: vec![Box::new(brick), Box::new(iron), Box::new(water)],
            burners: vec![heater, cooler],
            ops: ThermalSimulation::default_ops(),
        })
        .expect("valid config")
    }

    #[test]
    fn test_chunks_are_never_owned_twice() {
        let mut sim = lab(17);
        for _ in 0..600 {
            sim.step(1.0 / 60.0);
            let mut seen = HashSet::new();
            for chunk in sim.energy_chunks() {
                assert!(seen.insert(chunk.id()), "chunk {:?} owned twice", chunk.id());
            }
        }
    }

    #[test]
    fn test_bad_container_index_is_an_error() {
        let mut sim = lab(1);
        assert!(matches!(
            sim.set_container_position(9, DVec2::ZERO),
            Err(EfacError::IndexOutOfRange { index: 9, len: 3 })
        ));
    }

    #[test]
    fn test_state_restores_energies() {
        let mut sim = lab(4);
        for _ in 0..120 {
            sim.step(1.0 / 60.0);
        }
        let saved = sim.state();
        let energy = sim.total_energy();
        for _ in 0..120 {
            sim.step(1.0 / 60.0);
        }
        sim.apply_state(&saved).expect("same layout");
        assert_abs_diff_eq!(sim.total_energy(), energy, epsilon = 1e-6);
        assert_eq!(sim.step, 120);
    }

    #[test]
    fn test_rejected_state_changes_nothing() {
        let mut sim = lab(4);
        for _ in 0..60 {
            sim.step(1.0 / 60.0);
        }
        let before = sim.state();
        let chunk_count = sim.energy_chunks().count();

        let mut bad = before.clone();
        bad.containers[0].energy *= 2.0;
        bad.burners[1].heat_cool_level = 3.0;
        assert!(sim.apply_state(&bad).is_err());
        assert_eq!(sim.state(), before);
        assert_eq!(sim.energy_chunks().count(), chunk_count);

        bad = before.clone();
        bad.containers[1].energy *= 2.0;
        bad.air.energy = f64::NAN;
        assert!(sim.apply_state(&bad).is_err());
        assert_eq!(sim.state(), before);
    }

    #[test]
    fn test_run_reports_timings() {
        let mut sim = lab(2);
        sim.run(30, 1.0 / 60.0);
        assert_eq!(sim.op_timings.len(), 4);
        assert!(sim.op_timings.iter().all(|t| t.update_call_count == 30));
    }
}
