use std::{future::Future, pin::Pin, time::Duration};

use macaddr::MacAddr6;
use tokio_stream::Stream;

use crate::{
    error::Result,
    gatt::{Characteristic, Descriptor, Profile},
};

/// Raw notification payloads pushed by the peripheral.
pub type Notifications = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// Host side of the BLE stack, able to open connections.
pub trait Central {
    type Link: Link;

    /// Gives up with [`Error::ConnectTimeout`] once `timeout` has passed,
    /// after releasing whatever the attempt acquired.
    ///
    /// [`Error::ConnectTimeout`]: crate::Error::ConnectTimeout
    fn connect(
        &self,
        address: MacAddr6,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Link>> + Send;
}

/// One live connection to a peripheral.
pub trait Link {
    fn address(&self) -> MacAddr6;

    fn discover_profile(&mut self) -> impl Future<Output = Result<Profile>> + Send;

    fn read(&self, characteristic: &Characteristic) -> impl Future<Output = Result<Vec<u8>>> + Send;

    fn write(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
        with_response: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    fn read_descriptor(
        &self,
        descriptor: &Descriptor,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;

    fn write_descriptor(
        &self,
        descriptor: &Descriptor,
        data: &[u8],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Starts notifications or indications (whichever the characteristic
    /// supports) and returns the stream of its values.
    fn subscribe(
        &self,
        characteristic: &Characteristic,
    ) -> impl Future<Output = Result<Notifications>> + Send;

    fn disconnect(&mut self) -> impl Future<Output = Result<()>> + Send;
}
