//! Sensor bus seam.
//!
//! Live hardware is an external collaborator: the validator only ever
//! talks to this trait, so tests inject a scripted bus and the production
//! probe stays swappable.

use thiserror::Error;

/// AHT20 climate sensor address.
pub const CLIMATE_SENSOR_ADDR: u8 = 0x38;

/// VCNL4200 proximity/ambient-light sensor address.
pub const AMBIENT_SENSOR_ADDR: u8 = 0x51;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus initialization failed: {0}")]
    Init(String),
    #[error("bus not initialized")]
    NotInitialized,
    #[error("no device responding at address {addr:#04x}")]
    DeviceAbsent { addr: u8 },
    #[error("device returned malformed data: {0}")]
    Protocol(String),
    #[error("bus utility timed out")]
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientReading {
    pub proximity: u32,
    pub lux: f32,
}

pub trait SensorBus {
    /// Bring the bus up. Must be called before any other operation.
    fn init(&mut self) -> Result<(), BusError>;

    /// Whether a device acknowledges at `addr`.
    fn detect(&mut self, addr: u8) -> Result<bool, BusError>;

    /// Temperature/humidity from the climate sensor.
    fn read_climate(&mut self) -> Result<ClimateReading, BusError>;

    /// Proximity/lux from the ambient sensor.
    fn read_ambient(&mut self) -> Result<AmbientReading, BusError>;
}
