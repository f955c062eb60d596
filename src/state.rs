//! Serializable snapshots of the counters that can't be derived from anything else.
//!
//! Chunk positions and types are captured by serializing the chunks
//! themselves; these structs only hold what each owner needs on top of that.

use crate::error::EfacError;
use glam::DVec2;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalElementState {
    pub energy: f64,
    pub position: DVec2,
    pub next_slice_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirState {
    pub energy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnerState {
    pub heat_cool_level: f64,
    pub position: DVec2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalSimulationState {
    pub step: u64,
    pub elapsed_time: f64,
    pub containers: Vec<ThermalElementState>,
    pub air: AirState,
    pub burners: Vec<BurnerState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaucetState {
    pub flow_proportion: f64,
    pub energy_since_last_chunk: f64,
    pub transfer_next_chunk: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunState {
    pub cloudiness: f64,
    pub energy_since_last_chunk: f64,
    pub sector_order: Vec<usize>,
    pub current_sector_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeaKettleState {
    pub heat_proportion: f64,
    pub energy_production_rate: f64,
    pub energy_since_last_chunk: f64,
    pub transfer_next_chunk: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BikerState {
    pub crank_rate: f64,
    pub crank_angle: f64,
    pub rear_wheel_angle: f64,
    pub energy_since_last_chunk: f64,
    pub mechanical_chunks_since_last_thermal: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorState {
    pub wheel_rotational_velocity: f64,
    pub wheel_rotational_angle: f64,
    pub route_next_chunk_left: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarPanelState {
    pub simulation_time: f64,
    pub latest_chunk_arrival_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightBulbState {
    pub lit_proportion: f64,
    pub light_accumulator: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanState {
    pub blade_angle: f64,
    pub angular_velocity: f64,
    pub heat_accumulator: f64,
}

/// State of any energy-systems element, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementState {
    Faucet(FaucetState),
    Sun(SunState),
    TeaKettle(TeaKettleState),
    Biker(BikerState),
    Generator(GeneratorState),
    SolarPanel(SolarPanelState),
    LightBulb(LightBulbState),
    Fan(FanState),
}

impl ElementState {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ElementState::Faucet(_) => "faucet",
            ElementState::Sun(_) => "sun",
            ElementState::TeaKettle(_) => "tea kettle",
            ElementState::Biker(_) => "biker",
            ElementState::Generator(_) => "generator",
            ElementState::SolarPanel(_) => "solar panel",
            ElementState::LightBulb(_) => "light bulb",
            ElementState::Fan(_) => "fan",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergySystemsState {
    pub selected_source: usize,
    pub selected_converter: usize,
    pub selected_user: usize,
    pub elements: Vec<ElementState>,
}

#[derive(Serialize, Deserialize)]
struct StateEnvelope<T> {
    version: u32,
    state: T,
}

/// Serialize a state struct with the current version stamp.
pub fn to_json<T: Serialize>(state: &T) -> Result<String, EfacError> {
    let envelope = StateEnvelope {
        version: STATE_VERSION,
        state,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Parse a state struct written by [`to_json`], rejecting other versions.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, EfacError> {
    let envelope: StateEnvelope<T> = serde_json::from_str(json)?;
    if envelope.version != STATE_VERSION {
        return Err(EfacError::UnsupportedStateVersion {
            found: envelope.version,
            supported: STATE_VERSION,
        });
    }
    Ok(envelope.state)
}
