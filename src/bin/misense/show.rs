use std::time::Duration;

use anyhow::{Context as _, Result};
use macaddr::MacAddr6;
use misense::{
    gatt::{HostCentral, HostLink},
    lywsd03mmc::SensorSet,
};
use tracing::{info, warn};

use crate::{finish, tree::print_device_tree};

pub async fn show(central: &HostCentral, addresses: &[MacAddr6], timeout: Duration) -> Result<()> {
    let mut sensors = SensorSet::new();

    let result = show_all(central, &mut sensors, addresses, timeout).await;
    let failures = sensors.disconnect_all().await;

    finish(result, failures)
}

async fn show_all(
    central: &HostCentral,
    sensors: &mut SensorSet<HostLink>,
    addresses: &[MacAddr6],
    timeout: Duration,
) -> Result<()> {
    for &address in addresses {
        let Some(sensor) = sensors.register_new(address) else {
            warn!(%address, "sensor listed more than once, skipping");
            continue;
        };

        info!(%address, "connecting");
        sensor
            .connect_and_discover(central, timeout)
            .await
            .with_context(|| format!("failed to connect to {address}"))?;

        let (Some(link), Some(profile)) = (sensor.link(), sensor.profile()) else {
            continue;
        };

        let properties = link
            .properties()
            .await
            .with_context(|| format!("failed to get BLE peripheral properties: {address}"))?;

        print_device_tree(link, profile, properties.as_ref()).await;
    }

    Ok(())
}
