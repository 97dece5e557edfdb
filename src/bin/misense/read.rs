use std::time::Duration;

use anyhow::{Context as _, Result};
use chrono::Utc;
use misense::{
    gatt::{HostCentral, HostLink},
    lywsd03mmc::{Sensor, SensorSet},
};
use tokio::{signal, time::sleep};
use tracing::{info, warn};

use crate::{args::Args, finish};

pub async fn read(central: &HostCentral, args: &Args, timeout: Duration) -> Result<()> {
    let mut sensors = SensorSet::new();

    let result = read_all(central, &mut sensors, args, timeout).await;
    let failures = sensors.disconnect_all().await;

    finish(result, failures)
}

async fn read_all(
    central: &HostCentral,
    sensors: &mut SensorSet<HostLink>,
    args: &Args,
    timeout: Duration,
) -> Result<()> {
    for &address in &args.sensors {
        let Some(sensor) = sensors.register_new(address) else {
            warn!(%address, "sensor listed more than once, skipping");
            continue;
        };
        set_up(central, sensor, args, timeout)
            .await
            .with_context(|| format!("failed to set up sensor {address}"))?;
    }

    if args.read_secs == 0 {
        println!("press ctrl c to quit");
        signal::ctrl_c()
            .await
            .context("failed to listen for ctrl-c")?;
        info!("stopping");
    } else {
        sleep(Duration::from_secs(args.read_secs)).await;
    }

    Ok(())
}

async fn set_up(
    central: &HostCentral,
    sensor: &mut Sensor<HostLink>,
    args: &Args,
    timeout: Duration,
) -> Result<()> {
    let address = sensor.address();
    let tz = args.timezone;

    sensor
        .connect_and_discover(central, timeout)
        .await
        .context("failed to connect")?;
    println!("sensor {address} version {}", sensor.model());

    let time = sensor.time().await.context("failed to read RTC")?;
    println!("sensor {address} rtc: {}", time.with_timezone(&tz));

    if args.set_rtc {
        info!(%address, "setting RTC");
        sensor
            .set_time(Utc::now())
            .await
            .context("failed to set RTC")?;
    }

    if args.comfort {
        let range = sensor
            .comfort_range()
            .await
            .context("failed to read comfort range")?;
        println!(
            "sensor {address} comfort: temperature {:.2}~{:.2} humidity {}~{}",
            range.min_temperature_celsius,
            range.max_temperature_celsius,
            range.min_humidity,
            range.max_humidity,
        );
    }

    if let Some(range) = &args.set_comfort {
        info!(%address, "setting comfort range");
        sensor
            .set_comfort_range(range)
            .await
            .context("failed to set comfort range")?;
    }

    info!(%address, "enabling notifications");
    sensor
        .enable_notifications()
        .await
        .context("failed to enable notifications")?;

    if args.power_saving {
        info!(%address, "enabling power saving");
        sensor
            .enable_power_saving()
            .await
            .context("failed to enable power saving")?;
    }

    sensor
        .subscribe(move |reading| {
            let now = Utc::now().with_timezone(&tz);
            println!("[{}] read {reading}", now.format("%d-%b-%y %H:%M:%S %Z"));
        })
        .await
        .context("failed to subscribe to sensor data")?;

    Ok(())
}
