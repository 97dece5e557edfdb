//! Driver for the Xiaomi Mijia LYWSD03MMC thermometer/hygrometer.

mod attribute;
mod comfort_range;
mod reading;
mod rtc;
mod sensor_set;
mod session;

pub use attribute::*;
pub use comfort_range::*;
pub use reading::*;
pub use rtc::*;
pub use sensor_set::*;
pub use session::*;

pub const MODEL: &str = "LYWSD03MMC";
