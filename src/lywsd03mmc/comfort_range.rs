use std::str::FromStr;

use anyhow::{Context as _, bail};

use crate::error::{Error, Result};

pub const COMFORT_RANGE_LEN: usize = 6;

const MAX_TEMPERATURE_CELSIUS: f64 = 99.0;
const MAX_HUMIDITY: i32 = 255;

/// Thresholds that drive the face shown on the sensor display.
///
/// ```text
/// |-----------|--------|-----------|-------|
/// | Humidity  | < minT | minT~maxT | >maxT |
/// |-----------|--------|-----------|-------|
/// | <minH     | (-^-)  | (-^-)     | (-^-) |
/// | minH~maxH | (-^-)  | (^_^)     | (-^-) |
/// | >maxH     | (-^-)  | (-^-)     | (-^-) |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComfortRange {
    pub max_temperature_celsius: f64,

    pub min_temperature_celsius: f64,

    pub max_humidity: i32,

    pub min_humidity: i32,
}

impl ComfortRange {
    /// Decodes `T T t t H h`: max and min temperature ×100 as u16 LE, then
    /// max and min humidity bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let &[t1, t2, t3, t4, max_h, min_h] = data else {
            return Err(Error::MalformedPayload {
                payload: "comfort range",
                expected: COMFORT_RANGE_LEN,
                actual: data.len(),
            });
        };

        Ok(Self {
            max_temperature_celsius: u16::from_le_bytes([t1, t2]) as f64 / 100.0,
            min_temperature_celsius: u16::from_le_bytes([t3, t4]) as f64 / 100.0,
            max_humidity: max_h as i32,
            min_humidity: min_h as i32,
        })
    }

    /// Temperatures are truncated to whole hundredths of a degree.
    pub fn encode(&self) -> Result<[u8; COMFORT_RANGE_LEN]> {
        self.validate()?;

        let [t1, t2] = ((self.max_temperature_celsius * 100.0) as u16).to_le_bytes();
        let [t3, t4] = ((self.min_temperature_celsius * 100.0) as u16).to_le_bytes();

        Ok([
            t1,
            t2,
            t3,
            t4,
            self.max_humidity as u8,
            self.min_humidity as u8,
        ])
    }

    pub fn validate(&self) -> Result<()> {
        let temperatures = 0.0..=MAX_TEMPERATURE_CELSIUS;
        if !temperatures.contains(&self.max_temperature_celsius)
            || !temperatures.contains(&self.min_temperature_celsius)
        {
            return Err(Error::InvalidRange("temperature out of bounds"));
        }
        if self.min_temperature_celsius > self.max_temperature_celsius {
            return Err(Error::InvalidRange(
                "min temperature must not exceed max temperature",
            ));
        }

        let humidities = 0..=MAX_HUMIDITY;
        if !humidities.contains(&self.max_humidity) || !humidities.contains(&self.min_humidity) {
            return Err(Error::InvalidRange("humidity out of bounds"));
        }
        if self.min_humidity > self.max_humidity {
            return Err(Error::InvalidRange(
                "min humidity must not exceed max humidity",
            ));
        }

        Ok(())
    }
}

/// Parses `MAX_T,MIN_T,MAX_H,MIN_H`, e.g. `27,19.5,60,20`.
impl FromStr for ComfortRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(',').map(str::trim).collect();
        let &[max_t, min_t, max_h, min_h] = fields.as_slice() else {
            bail!("expected MAX_T,MIN_T,MAX_H,MIN_H, got: {s}");
        };

        let range = Self {
            max_temperature_celsius: max_t
                .parse()
                .with_context(|| format!("failed to parse max temperature: {max_t}"))?,
            min_temperature_celsius: min_t
                .parse()
                .with_context(|| format!("failed to parse min temperature: {min_t}"))?,
            max_humidity: max_h
                .parse()
                .with_context(|| format!("failed to parse max humidity: {max_h}"))?,
            min_humidity: min_h
                .parse()
                .with_context(|| format!("failed to parse min humidity: {min_h}"))?,
        };
        range.validate()?;

        Ok(range)
    }
}
