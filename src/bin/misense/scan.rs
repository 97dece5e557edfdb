use std::time::Duration;

use anyhow::{Context as _, Result};
use btleplug::{
    api::{Central as _, CentralEvent, Peripheral as _, ScanFilter},
    platform::{Adapter, PeripheralId},
};
use macaddr::MacAddr6;
use tokio::{signal, time::sleep};
use tokio_stream::StreamExt as _;
use tracing::{info, warn};

use crate::tree::hex;

pub async fn scan(adapter: &Adapter, timeout: Duration, dedup: bool) -> Result<()> {
    let mut events = adapter
        .events()
        .await
        .context("failed to get Bluetooth adapter events")?;

    adapter
        .start_scan(ScanFilter::default())
        .await
        .context("failed to start BLE scan")?;
    info!(?timeout, "scanning");

    let deadline = sleep(timeout);
    let interrupted = signal::ctrl_c();
    tokio::pin!(deadline, interrupted);

    loop {
        let id = tokio::select! {
            _ = &mut deadline => break,
            _ = &mut interrupted => break,
            event = events.next() => match event {
                Some(CentralEvent::DeviceDiscovered(id)) => id,
                Some(CentralEvent::DeviceUpdated(id)) if !dedup => id,
                Some(_) => continue,
                None => break,
            },
        };

        if let Err(err) = report(adapter, &id).await {
            warn!("failed to report BLE peripheral {id}: {err:#}");
        }
    }

    adapter
        .stop_scan()
        .await
        .context("failed to stop BLE scan")?;

    Ok(())
}

async fn report(adapter: &Adapter, id: &PeripheralId) -> Result<()> {
    let peripheral = adapter
        .peripheral(id)
        .await
        .context("failed to get BLE peripheral")?;

    let Some(properties) = peripheral
        .properties()
        .await
        .context("failed to get BLE peripheral properties")?
    else {
        return Ok(());
    };

    let address: MacAddr6 = peripheral.address().into_inner().into();

    println!("ADDR {address}");
    if let Some(rssi) = properties.rssi {
        println!("  rssi {rssi:3}");
    }
    if let Some(tx_power) = properties.tx_power_level {
        println!("  tx_power {tx_power}");
    }
    if let Some(name) = &properties.local_name {
        println!("  name {name}");
    }
    if !properties.services.is_empty() {
        println!("  services {:?}", properties.services);
    }
    for (company_id, data) in &properties.manufacturer_data {
        println!("  oem {company_id:04X} {}", hex(data));
    }
    for (uuid, data) in &properties.service_data {
        println!("  service_data {uuid} {}", hex(data));
    }

    Ok(())
}
