use std::{future::Future, sync::Arc, time::Duration};

use btleplug::{
    api::{
        BDAddr, Central as _, Characteristic as HostCharacteristic, Descriptor as HostDescriptor,
        Manager as _, Peripheral as _, PeripheralProperties, ScanFilter, Service as HostService,
        WriteType,
    },
    platform::{Adapter, Manager, Peripheral},
};
use macaddr::MacAddr6;
use tokio::time::{Instant, sleep, timeout_at};
use tokio_stream::StreamExt as _;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    gatt::{
        Central, Characteristic, Descriptor, Link, Notifications, Profile, Service, UNKNOWN_HANDLE,
    },
};

const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// ATT handle of an attribute the host stack only identifies by UUID.
///
/// A hint without `descriptor` names a characteristic value handle; with
/// `descriptor` it names that descriptor under the characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleHint {
    pub characteristic: Uuid,

    pub descriptor: Option<Uuid>,

    pub handle: u16,
}

/// btleplug-backed [`Central`] on the first Bluetooth adapter.
pub struct HostCentral {
    adapter: Adapter,
    hints: Arc<[HandleHint]>,
}

impl HostCentral {
    pub async fn new(hints: impl Into<Arc<[HandleHint]>>) -> Result<Self> {
        let manager = Manager::new().await?;

        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::transport("no Bluetooth adapters found"))?;

        Ok(Self {
            adapter,
            hints: hints.into(),
        })
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    async fn find_peripheral(&self, address: BDAddr) -> Result<Peripheral> {
        loop {
            let peripherals = self.adapter.peripherals().await?;
            if let Some(p) = peripherals.into_iter().find(|p| p.address() == address) {
                return Ok(p);
            }

            sleep(SCAN_POLL_INTERVAL).await;
        }
    }
}

impl Central for HostCentral {
    type Link = HostLink;

    async fn connect(&self, address: MacAddr6, timeout: Duration) -> Result<HostLink> {
        let deadline = Instant::now() + timeout;
        let target = BDAddr::from(address.into_array());

        let peripheral = scan_until(&self.adapter, deadline, self.find_peripheral(target))
            .await?
            .ok_or(Error::ConnectTimeout { address, timeout })?;

        debug!(%address, id = %peripheral.id(), "connecting");
        if timeout_at(deadline, peripheral.connect()).await.is_err() {
            if let Err(err) = peripheral.disconnect().await {
                warn!(%address, "failed to cancel connection attempt: {err}");
            }
            return Err(Error::ConnectTimeout { address, timeout });
        }

        Ok(HostLink {
            address,
            peripheral,
            hints: Arc::clone(&self.hints),
        })
    }
}

/// Start/stop control of LE scanning.
trait Scanner {
    fn start(&self) -> impl Future<Output = Result<()>> + Send;

    fn stop(&self) -> impl Future<Output = Result<()>> + Send;
}

impl Scanner for Adapter {
    async fn start(&self) -> Result<()> {
        Ok(self.start_scan(ScanFilter::default()).await?)
    }

    async fn stop(&self) -> Result<()> {
        Ok(self.stop_scan().await?)
    }
}

/// Runs `search` while scanning and stops the scan whether `search`
/// finishes, fails or runs past `deadline`. `None` means the deadline passed.
async fn scan_until<S, F, T>(scanner: &S, deadline: Instant, search: F) -> Result<Option<T>>
where
    S: Scanner,
    F: Future<Output = Result<T>>,
{
    scanner.start().await?;

    let found = timeout_at(deadline, search).await;

    if let Err(err) = scanner.stop().await {
        warn!("failed to stop BLE scan: {err}");
    }

    found.ok().transpose()
}

pub struct HostLink {
    address: MacAddr6,
    peripheral: Peripheral,
    hints: Arc<[HandleHint]>,
}

impl HostLink {
    pub async fn properties(&self) -> Result<Option<PeripheralProperties>> {
        Ok(self.peripheral.properties().await?)
    }

    fn value_handle(&self, characteristic: Uuid) -> u16 {
        self.hints
            .iter()
            .find(|h| h.characteristic == characteristic && h.descriptor.is_none())
            .map_or(UNKNOWN_HANDLE, |h| h.handle)
    }

    fn descriptor_handle(&self, characteristic: Uuid, descriptor: Uuid) -> u16 {
        self.hints
            .iter()
            .find(|h| h.characteristic == characteristic && h.descriptor == Some(descriptor))
            .map_or(UNKNOWN_HANDLE, |h| h.handle)
    }

    fn convert_service(&self, service: &HostService) -> Service {
        let characteristics: Vec<Characteristic> = service
            .characteristics
            .iter()
            .map(|c| self.convert_characteristic(c))
            .collect();

        // The service declaration precedes its first attribute.
        let handle = characteristics
            .iter()
            .map(|c| c.handle)
            .filter(|&h| h != UNKNOWN_HANDLE)
            .min()
            .map_or(UNKNOWN_HANDLE, |h| h - 1);

        Service {
            uuid: service.uuid,
            handle,
            characteristics,
        }
    }

    fn convert_characteristic(&self, characteristic: &HostCharacteristic) -> Characteristic {
        let value_handle = self.value_handle(characteristic.uuid);
        let handle = value_handle.saturating_sub(1);

        Characteristic {
            uuid: characteristic.uuid,
            service_uuid: characteristic.service_uuid,
            handle,
            value_handle,
            properties: characteristic.properties,
            descriptors: characteristic
                .descriptors
                .iter()
                .map(|d| Descriptor {
                    uuid: d.uuid,
                    service_uuid: d.service_uuid,
                    characteristic_uuid: d.characteristic_uuid,
                    handle: self.descriptor_handle(d.characteristic_uuid, d.uuid),
                })
                .collect(),
        }
    }

    fn host_characteristic(&self, characteristic: &Characteristic) -> Result<HostCharacteristic> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == characteristic.uuid && c.service_uuid == characteristic.service_uuid)
            .ok_or_else(|| {
                Error::transport(format!(
                    "characteristic not known to host: {}",
                    characteristic.uuid
                ))
            })
    }

    fn host_descriptor(&self, descriptor: &Descriptor) -> Result<HostDescriptor> {
        self.peripheral
            .characteristics()
            .into_iter()
            .filter(|c| {
                c.uuid == descriptor.characteristic_uuid && c.service_uuid == descriptor.service_uuid
            })
            .flat_map(|c| c.descriptors)
            .find(|d| d.uuid == descriptor.uuid)
            .ok_or_else(|| {
                Error::transport(format!("descriptor not known to host: {}", descriptor.uuid))
            })
    }
}

impl Link for HostLink {
    fn address(&self) -> MacAddr6 {
        self.address
    }

    async fn discover_profile(&mut self) -> Result<Profile> {
        self.peripheral
            .discover_services()
            .await
            .map_err(|e| Error::Discovery(Box::new(e)))?;

        let services = self
            .peripheral
            .services()
            .iter()
            .map(|s| self.convert_service(s))
            .collect();

        Ok(Profile { services })
    }

    async fn read(&self, characteristic: &Characteristic) -> Result<Vec<u8>> {
        let c = self.host_characteristic(characteristic)?;
        Ok(self.peripheral.read(&c).await?)
    }

    async fn write(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
        with_response: bool,
    ) -> Result<()> {
        let c = self.host_characteristic(characteristic)?;
        let write_type = if with_response {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };

        Ok(self.peripheral.write(&c, data, write_type).await?)
    }

    async fn read_descriptor(&self, descriptor: &Descriptor) -> Result<Vec<u8>> {
        let d = self.host_descriptor(descriptor)?;
        Ok(self.peripheral.read_descriptor(&d).await?)
    }

    async fn write_descriptor(&self, descriptor: &Descriptor, data: &[u8]) -> Result<()> {
        let d = self.host_descriptor(descriptor)?;
        Ok(self.peripheral.write_descriptor(&d, data).await?)
    }

    async fn subscribe(&self, characteristic: &Characteristic) -> Result<Notifications> {
        let c = self.host_characteristic(characteristic)?;
        // btleplug writes the CCCD again here; the session's explicit
        // enable write stays so the fixed 0x01,0x00 payload is always sent.
        self.peripheral.subscribe(&c).await?;

        let uuid = c.uuid;
        let notifications = self.peripheral.notifications().await?;

        Ok(Box::pin(
            notifications
                .filter(move |n| n.uuid == uuid)
                .map(|n| n.value),
        ))
    }

    async fn disconnect(&mut self) -> Result<()> {
        Ok(self.peripheral.disconnect().await?)
    }
}
