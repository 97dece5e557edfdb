//! In-memory transport serving a LYWSD03MMC-shaped profile.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use btleplug::api::CharPropFlags;
use macaddr::MacAddr6;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::{Uuid, uuid};

use crate::{
    error::{Error, Result},
    gatt::{Central, Characteristic, Descriptor, Link, Notifications, Profile, Service},
};

const SERVICE: Uuid = uuid!("ebe0ccb0-7a0a-4b0c-8a1a-6ff2997da3a6");
const CCCD: Uuid = uuid!("00002902-0000-1000-8000-00805f9b34fb");

fn characteristic(uuid: Uuid, value_handle: u16, properties: CharPropFlags) -> Characteristic {
    Characteristic {
        uuid,
        service_uuid: SERVICE,
        handle: value_handle - 1,
        value_handle,
        properties,
        descriptors: Vec::new(),
    }
}

pub(crate) fn lywsd03mmc_profile() -> Profile {
    let data_uuid = uuid!("ebe0ccc1-7a0a-4b0c-8a1a-6ff2997da3a6");
    let mut data = characteristic(
        data_uuid,
        0x36,
        CharPropFlags::READ | CharPropFlags::NOTIFY,
    );
    data.descriptors.push(Descriptor {
        uuid: CCCD,
        service_uuid: SERVICE,
        characteristic_uuid: data_uuid,
        handle: 0x38,
    });

    let read_write = CharPropFlags::READ | CharPropFlags::WRITE;

    Profile {
        services: vec![Service {
            uuid: SERVICE,
            handle: 0x21,
            characteristics: vec![
                characteristic(
                    uuid!("ebe0ccb7-7a0a-4b0c-8a1a-6ff2997da3a6"),
                    0x23,
                    read_write,
                ),
                data,
                characteristic(
                    uuid!("ebe0ccd7-7a0a-4b0c-8a1a-6ff2997da3a6"),
                    0x43,
                    read_write,
                ),
                characteristic(
                    uuid!("ebe0ccd8-7a0a-4b0c-8a1a-6ff2997da3a6"),
                    0x46,
                    read_write,
                ),
            ],
        }],
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeLog {
    pub writes: Vec<(u16, Vec<u8>)>,
    pub disconnects: Vec<MacAddr6>,
}

pub(crate) struct FakeCentral {
    pub profile: Profile,
    pub values: HashMap<u16, Vec<u8>>,
    pub connect_delay: Duration,
    pub discover_delay: Duration,
    pub fail_discovery: bool,
    pub fail_disconnect: bool,
    pub log: Arc<Mutex<FakeLog>>,
    frames: Mutex<Option<mpsc::Receiver<Vec<u8>>>>,
}

impl FakeCentral {
    pub fn new() -> Self {
        Self {
            profile: lywsd03mmc_profile(),
            values: HashMap::new(),
            connect_delay: Duration::ZERO,
            discover_delay: Duration::ZERO,
            fail_discovery: false,
            fail_disconnect: false,
            log: Arc::default(),
            frames: Mutex::new(None),
        }
    }

    /// Returns the sender that feeds the next link's notification stream.
    /// It holds a single frame, so sends wait until the subscriber pulls.
    pub fn frames(&self) -> mpsc::Sender<Vec<u8>> {
        let (tx, rx) = mpsc::channel(1);
        *self.frames.lock().unwrap() = Some(rx);
        tx
    }

    pub fn writes(&self) -> Vec<(u16, Vec<u8>)> {
        self.log.lock().unwrap().writes.clone()
    }

    pub fn disconnects(&self) -> Vec<MacAddr6> {
        self.log.lock().unwrap().disconnects.clone()
    }
}

impl Central for FakeCentral {
    type Link = FakeLink;

    async fn connect(&self, address: MacAddr6, timeout: Duration) -> Result<FakeLink> {
        tokio::time::timeout(timeout, tokio::time::sleep(self.connect_delay))
            .await
            .map_err(|_| Error::ConnectTimeout { address, timeout })?;

        let frames = self.frames.lock().unwrap().take();

        Ok(FakeLink {
            address,
            profile: self.profile.clone(),
            values: self.values.clone(),
            discover_delay: self.discover_delay,
            fail_discovery: self.fail_discovery,
            fail_disconnect: self.fail_disconnect,
            log: Arc::clone(&self.log),
            frames: Mutex::new(frames),
        })
    }
}

pub(crate) struct FakeLink {
    address: MacAddr6,
    profile: Profile,
    values: HashMap<u16, Vec<u8>>,
    discover_delay: Duration,
    fail_discovery: bool,
    fail_disconnect: bool,
    log: Arc<Mutex<FakeLog>>,
    frames: Mutex<Option<mpsc::Receiver<Vec<u8>>>>,
}

impl FakeLink {
    fn read_handle(&self, handle: u16) -> Result<Vec<u8>> {
        self.values
            .get(&handle)
            .cloned()
            .ok_or_else(|| Error::transport(format!("read not permitted: 0x{handle:02x}")))
    }

    fn record_write(&self, handle: u16, data: &[u8]) {
        self.log.lock().unwrap().writes.push((handle, data.to_vec()));
    }
}

impl Link for FakeLink {
    fn address(&self) -> MacAddr6 {
        self.address
    }

    async fn discover_profile(&mut self) -> Result<Profile> {
        tokio::time::sleep(self.discover_delay).await;

        if self.fail_discovery {
            return Err(Error::Discovery("GATT database unavailable".into()));
        }

        Ok(self.profile.clone())
    }

    async fn read(&self, characteristic: &Characteristic) -> Result<Vec<u8>> {
        self.read_handle(characteristic.value_handle)
    }

    async fn write(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
        _with_response: bool,
    ) -> Result<()> {
        self.record_write(characteristic.value_handle, data);
        Ok(())
    }

    async fn read_descriptor(&self, descriptor: &Descriptor) -> Result<Vec<u8>> {
        self.read_handle(descriptor.handle)
    }

    async fn write_descriptor(&self, descriptor: &Descriptor, data: &[u8]) -> Result<()> {
        self.record_write(descriptor.handle, data);
        Ok(())
    }

    async fn subscribe(&self, _characteristic: &Characteristic) -> Result<Notifications> {
        let rx = self
            .frames
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::transport("already subscribed"))?;

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.log.lock().unwrap().disconnects.push(self.address);

        if self.fail_disconnect {
            return Err(Error::transport("link lost"));
        }

        Ok(())
    }
}
