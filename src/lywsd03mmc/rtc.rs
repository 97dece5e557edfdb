use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

pub const RTC_LEN: usize = 4;

/// Decodes the RTC value, UNIX seconds as u32 LE.
pub fn decode_rtc(data: &[u8]) -> Result<DateTime<Utc>> {
    let Ok(raw) = <[u8; RTC_LEN]>::try_from(data) else {
        return Err(Error::MalformedPayload {
            payload: "RTC",
            expected: RTC_LEN,
            actual: data.len(),
        });
    };

    let secs = u32::from_le_bytes(raw);

    // Every u32 is a valid UNIX time.
    Ok(DateTime::from_timestamp(secs as i64, 0).unwrap_or_default())
}

/// Truncates `time` to whole seconds in 32 bits.
pub fn encode_rtc(time: DateTime<Utc>) -> [u8; RTC_LEN] {
    (time.timestamp() as u32).to_le_bytes()
}
