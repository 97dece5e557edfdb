use chrono_tz::Tz;
use clap::Parser;
use macaddr::MacAddr6;
use misense::lywsd03mmc::ComfortRange;

/// CLI to interface with Xiaomi Mijia LYWSD03MMC sensors.
///
/// Without sensor addresses, scans for advertising devices.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    /// Scan/connect timeout in seconds
    #[arg(short = 't', long, env = "MISENSE_TIMEOUT", default_value_t = 5)]
    pub timeout: u64,

    /// Report each scanned device only once
    #[arg(short = 'u', long)]
    pub dedup: bool,

    /// Show the GATT tree of each sensor
    #[arg(short = 'i', long)]
    pub info: bool,

    /// Set the sensor RTC to the current system time
    #[arg(short = 'T', long)]
    pub set_rtc: bool,

    /// Enable battery saving mode
    #[arg(short = 'B', long)]
    pub power_saving: bool,

    /// Number of seconds to read, 0 to run until interrupted
    #[arg(short = 'r', long, default_value_t = 0)]
    pub read_secs: u64,

    /// Print the comfort range of each sensor
    #[arg(long)]
    pub comfort: bool,

    /// Set the comfort range of each sensor
    #[arg(long, value_name = "MAX_T,MIN_T,MAX_H,MIN_H")]
    pub set_comfort: Option<ComfortRange>,

    #[arg(long, env = "TZ", default_value = "UTC")]
    pub timezone: Tz,

    pub sensors: Vec<MacAddr6>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Scan,
    Show,
    Read,
}

impl Args {
    pub fn mode(&self) -> Mode {
        match (self.sensors.is_empty(), self.info) {
            (true, _) => Mode::Scan,
            (false, true) => Mode::Show,
            (false, false) => Mode::Read,
        }
    }
}
