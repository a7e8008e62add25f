//! Production bus access over the `i2c-tools` utilities.
//!
//! Uses `i2cdetect` for the bus scan, `i2ctransfer` for the AHT20
//! measurement transaction and `i2cget` for the VCNL4200 registers.
//! Every invocation is bounded; a wedged bus degrades to an error the
//! validator reports, never a hang.

use std::thread;
use std::time::Duration;

use crate::hardware::bus::{
    AmbientReading, BusError, ClimateReading, SensorBus, AMBIENT_SENSOR_ADDR, CLIMATE_SENSOR_ADDR,
};
use crate::util::process::{run_with_timeout, ProcessError};

const SCAN_TIMEOUT: Duration = Duration::from_secs(5);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(2);

/// AHT20 measurement delay after triggering, per datasheet.
const MEASUREMENT_DELAY: Duration = Duration::from_millis(80);

/// VCNL4200 proximity and ambient-light data registers.
const PS_DATA_REG: &str = "0x08";
const ALS_DATA_REG: &str = "0x09";

/// Lux per ALS count at the default integration time.
const LUX_PER_COUNT: f32 = 0.024;

pub struct I2cToolsProbe {
    bus: u8,
    scan: Option<String>,
}

impl I2cToolsProbe {
    pub fn new(bus: u8) -> Self {
        Self { bus, scan: None }
    }

    fn bus_arg(&self) -> String {
        self.bus.to_string()
    }

    fn scan_output(&mut self) -> Result<&str, BusError> {
        if self.scan.is_none() {
            let out = run_with_timeout("i2cdetect", &["-y", &self.bus_arg()], SCAN_TIMEOUT)
                .map_err(map_process_error)?;
            if !out.success {
                return Err(BusError::Init(format!(
                    "i2cdetect reported failure on bus {}",
                    self.bus
                )));
            }
            self.scan = Some(out.stdout);
        }
        Ok(self.scan.as_deref().unwrap_or_default())
    }
}

fn map_process_error(e: ProcessError) -> BusError {
    match e {
        ProcessError::Timeout { .. } => BusError::Timeout,
        ProcessError::Missing { command } => {
            BusError::Init(format!("`{command}` is not installed (install i2c-tools)"))
        }
        ProcessError::Io { source, .. } => BusError::Init(source.to_string()),
    }
}

/// Parse `0x..` byte tokens from i2ctransfer output.
fn parse_bytes(stdout: &str) -> Vec<u8> {
    stdout
        .split_whitespace()
        .filter_map(|t| t.strip_prefix("0x"))
        .filter_map(|t| u8::from_str_radix(t, 16).ok())
        .collect()
}

/// Convert the 7-byte AHT20 measurement frame to physical units.
///
/// Bits: status, then 20 bits humidity, then 20 bits temperature, CRC.
fn convert_climate(bytes: &[u8]) -> Result<ClimateReading, BusError> {
    if bytes.len() < 6 {
        return Err(BusError::Protocol(format!(
            "expected 7 measurement bytes, got {}",
            bytes.len()
        )));
    }
    if bytes[0] & 0x80 != 0 {
        return Err(BusError::Protocol("sensor busy".to_string()));
    }

    let raw_humidity =
        ((bytes[1] as u32) << 12) | ((bytes[2] as u32) << 4) | ((bytes[3] as u32) >> 4);
    let raw_temperature =
        (((bytes[3] as u32) & 0x0f) << 16) | ((bytes[4] as u32) << 8) | (bytes[5] as u32);

    const FULL_SCALE: f32 = (1u32 << 20) as f32;
    Ok(ClimateReading {
        temperature_c: raw_temperature as f32 / FULL_SCALE * 200.0 - 50.0,
        humidity_pct: raw_humidity as f32 / FULL_SCALE * 100.0,
    })
}

impl SensorBus for I2cToolsProbe {
    fn init(&mut self) -> Result<(), BusError> {
        self.scan = None;
        self.scan_output().map(|_| ())
    }

    fn detect(&mut self, addr: u8) -> Result<bool, BusError> {
        let needle = format!("{addr:02x}");
        // Address cells are bare hex tokens; row labels carry a colon.
        Ok(self
            .scan_output()?
            .split_whitespace()
            .any(|token| token == needle))
    }

    fn read_climate(&mut self) -> Result<ClimateReading, BusError> {
        if self.scan.is_none() {
            return Err(BusError::NotInitialized);
        }

        let addr = format!("0x{CLIMATE_SENSOR_ADDR:02x}");
        let bus = self.bus_arg();

        // Trigger a measurement, wait, then read the 7-byte frame.
        let trigger = run_with_timeout(
            "i2ctransfer",
            &["-y", &bus, &format!("w3@{addr}"), "0xac", "0x33", "0x00"],
            TRANSFER_TIMEOUT,
        )
        .map_err(map_process_error)?;
        if !trigger.success {
            return Err(BusError::DeviceAbsent {
                addr: CLIMATE_SENSOR_ADDR,
            });
        }

        thread::sleep(MEASUREMENT_DELAY);

        let frame = run_with_timeout(
            "i2ctransfer",
            &["-y", &bus, &format!("r7@{addr}")],
            TRANSFER_TIMEOUT,
        )
        .map_err(map_process_error)?;
        if !frame.success {
            return Err(BusError::DeviceAbsent {
                addr: CLIMATE_SENSOR_ADDR,
            });
        }

        convert_climate(&parse_bytes(&frame.stdout))
    }

    fn read_ambient(&mut self) -> Result<AmbientReading, BusError> {
        if self.scan.is_none() {
            return Err(BusError::NotInitialized);
        }

        let addr = format!("0x{AMBIENT_SENSOR_ADDR:02x}");
        let bus = self.bus_arg();

        let read_word = |register: &str| -> Result<u16, BusError> {
            let out = run_with_timeout(
                "i2cget",
                &["-y", &bus, &addr, register, "w"],
                TRANSFER_TIMEOUT,
            )
            .map_err(map_process_error)?;
            if !out.success {
                return Err(BusError::DeviceAbsent {
                    addr: AMBIENT_SENSOR_ADDR,
                });
            }
            let token = out.stdout.trim();
            token
                .strip_prefix("0x")
                .and_then(|t| u16::from_str_radix(t, 16).ok())
                .ok_or_else(|| BusError::Protocol(format!("unparseable register value {token:?}")))
        };

        let proximity = read_word(PS_DATA_REG)? as u32;
        let als = read_word(ALS_DATA_REG)?;

        Ok(AmbientReading {
            proximity,
            lux: als as f32 * LUX_PER_COUNT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bytes_reads_hex_tokens() {
        assert_eq!(
            parse_bytes("0x1c 0x6a 0x2f 0x05 0x9b 0xc0 0x1d\n"),
            vec![0x1c, 0x6a, 0x2f, 0x05, 0x9b, 0xc0, 0x1d]
        );
        assert!(parse_bytes("garbage\n").is_empty());
    }

    #[test]
    fn convert_climate_produces_plausible_values() {
        // Mid-scale humidity and temperature words.
        let frame = [0x1c, 0x80, 0x00, 0x08, 0x00, 0x00, 0x00];
        let reading = convert_climate(&frame).unwrap();

        assert!((reading.humidity_pct - 50.0).abs() < 0.1);
        assert!((reading.temperature_c - 50.0).abs() < 0.1);
    }

    #[test]
    fn busy_status_bit_is_a_protocol_error() {
        let frame = [0x80, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            convert_climate(&frame),
            Err(BusError::Protocol(_))
        ));
    }

    #[test]
    fn short_frame_is_a_protocol_error() {
        assert!(matches!(
            convert_climate(&[0x1c, 0x00]),
            Err(BusError::Protocol(_))
        ));
    }

    #[test]
    fn reads_require_init_first() {
        let mut probe = I2cToolsProbe::new(1);
        assert!(matches!(
            probe.read_climate(),
            Err(BusError::NotInitialized)
        ));
        assert!(matches!(
            probe.read_ambient(),
            Err(BusError::NotInitialized)
        ));
    }
}
