use std::fmt;

use macaddr::MacAddr6;

use crate::error::{Error, Result};

pub const READING_LEN: usize = 5;

/// One sensor data notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub address: MacAddr6,

    pub temperature_celsius: f64,

    /// Raw humidity byte divided by 100, as the firmware contract expects.
    pub humidity: f64,

    pub voltage_v: f64,
}

impl Reading {
    /// Decodes a `T1 T2 H V1 V2` frame: temperature ×100 as i16 LE,
    /// humidity byte, battery millivolts as u16 LE.
    pub fn decode(address: MacAddr6, data: &[u8]) -> Result<Self> {
        let &[t1, t2, h, v1, v2] = data else {
            return Err(Error::MalformedPayload {
                payload: "sensor data",
                expected: READING_LEN,
                actual: data.len(),
            });
        };

        Ok(Self {
            address,
            temperature_celsius: i16::from_le_bytes([t1, t2]) as f64 / 100.0,
            humidity: h as f64 / 100.0,
            voltage_v: u16::from_le_bytes([v1, v2]) as f64 / 1000.0,
        })
    }

    /// 2.1 V is empty and 3.1 V is full. Capped at 100 but may go negative.
    pub fn battery_percent(&self) -> i32 {
        battery_percent(self.voltage_v)
    }
}

pub fn battery_percent(voltage_v: f64) -> i32 {
    ((voltage_v - 2.1) * 100.0).min(100.0) as i32
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} temperature={:.2}°C humidity={:.2} battery={}% voltage={:.3}V",
            self.address,
            self.temperature_celsius,
            self.humidity,
            self.battery_percent(),
            self.voltage_v,
        )
    }
}
