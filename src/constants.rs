use glam::DVec2;

// Shared physical and visual constants. Values are tuned for a plausible
// looking simulation rather than metrological accuracy.

// Temperatures (Kelvin)
pub const ROOM_TEMPERATURE: f64 = 296.0;
pub const FREEZING_POINT_TEMPERATURE: f64 = 273.15;
pub const BOILING_POINT_TEMPERATURE: f64 = 373.15;

// Materials
pub const BRICK_DENSITY: f64 = 3300.0; // kg/m³
pub const BRICK_SPECIFIC_HEAT: f64 = 840.0; // J/(kg·K)
pub const IRON_DENSITY: f64 = 7800.0;
pub const IRON_SPECIFIC_HEAT: f64 = 450.0;
// The real specific heat of water is 4186, lowered so a beaker doesn't need too many chunks
pub const WATER_DENSITY: f64 = 1000.0;
pub const WATER_SPECIFIC_HEAT: f64 = 3000.0;
pub const OLIVE_OIL_DENSITY: f64 = 910.0;
pub const OLIVE_OIL_SPECIFIC_HEAT: f64 = 1970.0;

// Block and beaker geometry (metres)
pub const BLOCK_SURFACE_WIDTH: f64 = 0.045;
pub const BLOCK_VOLUME: f64 = BLOCK_SURFACE_WIDTH * BLOCK_SURFACE_WIDTH * BLOCK_SURFACE_WIDTH;
pub const NUM_BLOCK_SLICES: usize = 4;
pub const BEAKER_WIDTH: f64 = 0.085;
pub const BEAKER_HEIGHT: f64 = BEAKER_WIDTH * 1.1;
pub const INITIAL_FLUID_LEVEL: f64 = 0.5;
pub const NUM_BEAKER_SLICES: usize = 6;

// Reference brick block used to scale the energy-to-chunk mapping
pub const BRICK_HEAT_CAPACITY: f64 = BLOCK_VOLUME * BRICK_DENSITY * BRICK_SPECIFIC_HEAT;
pub const LOW_ENERGY_FOR_MAP_FUNCTION: f64 = BRICK_HEAT_CAPACITY * FREEZING_POINT_TEMPERATURE;
pub const HIGH_ENERGY_FOR_MAP_FUNCTION: f64 = BRICK_HEAT_CAPACITY * BOILING_POINT_TEMPERATURE;
pub const NUM_ENERGY_CHUNKS_IN_BLOCK_AT_FREEZING: f64 = 1.5;
pub const NUM_ENERGY_CHUNKS_IN_BLOCK_AT_BOILING: f64 = 6.0;
pub const ENERGY_PER_CHUNK: f64 = (HIGH_ENERGY_FOR_MAP_FUNCTION - LOW_ENERGY_FOR_MAP_FUNCTION)
    / (NUM_ENERGY_CHUNKS_IN_BLOCK_AT_BOILING - NUM_ENERGY_CHUNKS_IN_BLOCK_AT_FREEZING);

// Heat exchange
pub const MAX_HEAT_EXCHANGE_TIME_STEP: f64 = 0.02; // seconds
pub const TEMPERATURES_EQUAL_THRESHOLD: f64 = 1e-6; // K
pub const TOUCH_DISTANCE_THRESHOLD: f64 = 0.001; // m

// Air
pub const AIR_WIDTH: f64 = 0.7;
pub const AIR_HEIGHT: f64 = 0.3;
pub const AIR_DEPTH: f64 = 0.25;
pub const AIR_DENSITY: f64 = 10.0; // far above real air so it can soak up heat visibly
pub const AIR_SPECIFIC_HEAT: f64 = 1012.0;
pub const AIR_AMBIENT_RECOVERY_RATE: f64 = 0.05; // fraction of the room-temperature gap per second
pub const AIR_CHUNK_SPAWN_HEIGHT: f64 = 0.06;
pub const AIR_CHUNK_RADIATION_HEIGHT: f64 = 0.2;

// Burner
pub const BURNER_WIDTH: f64 = 0.075;
pub const BURNER_HEIGHT: f64 = 0.05;
pub const BURNER_MAX_ENERGY_GENERATION_RATE: f64 = 2000.0; // J/s
pub const BURNER_MIN_COOLING_TEMPERATURE: f64 = 250.0; // K, cooling stops here

// Perspective applied to z-layered slices and chunks
pub const Z_TO_X_OFFSET_MULTIPLIER: f64 = -0.25;
pub const Z_TO_Y_OFFSET_MULTIPLIER: f64 = -0.25;

// Chunk motion
pub const ENERGY_CHUNK_VELOCITY: f64 = 0.04; // m/s
pub const RADIATED_SEGMENT_LENGTH: f64 = 0.02;
pub const RADIATED_MAX_ANGLE_VARIATION: f64 = std::f64::consts::PI * 0.25;

// Stepping
pub const FRAMES_PER_SECOND: f64 = 60.0;
pub const SIM_TIME_PER_TICK_NORMAL: f64 = 1.0 / FRAMES_PER_SECOND;
pub const MAX_PRELOAD_TIME: f64 = 10.0; // simulated seconds
pub const MAX_SETTLE_ITERATIONS: usize = 500;

// Energy systems layout: distance between adjacent carousel stages
pub const SOURCE_TO_CONVERTER_OFFSET: DVec2 = DVec2::new(0.125, 0.0);
pub const CONVERTER_TO_USER_OFFSET: DVec2 = DVec2::new(0.115, 0.0);
