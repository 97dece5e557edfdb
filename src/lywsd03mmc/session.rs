use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use macaddr::MacAddr6;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
    time::{Instant, timeout_at},
};
use tokio_stream::StreamExt as _;
use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result},
    gatt::{Central, Link, Profile},
    lywsd03mmc::{ComfortRange, MODEL, Reading, Role, decode_rtc, encode_rtc},
};

const NOTIFY_ENABLE: [u8; 2] = [0x01, 0x00];

// Reduces the report interval, see
// https://github.com/JsBergbau/MiTemperature2/issues/18#issuecomment-590986874
const POWER_SAVE_INTERVAL: [u8; 3] = [0xf4, 0x01, 0x00];

/// Frames buffered between the transport and the reading callback.
const FRAME_QUEUE_DEPTH: usize = 64;

const DISCOVERED: [SessionState; 3] = [
    SessionState::ProfileDiscovered,
    SessionState::Configured,
    SessionState::Streaming,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconnected,
    Connected,
    ProfileDiscovered,
    Configured,
    Streaming,
    Disconnected,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Unconnected => "unconnected",
            SessionState::Connected => "connected",
            SessionState::ProfileDiscovered => "profile discovered",
            SessionState::Configured => "configured",
            SessionState::Streaming => "streaming",
            SessionState::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session with one LYWSD03MMC sensor.
///
/// Not meant to be shared between tasks; drive each sensor from one flow.
/// Readings are delivered on background tasks owned by the session, which
/// are aborted on [`Sensor::disconnect`] or drop.
pub struct Sensor<L> {
    address: MacAddr6,
    state: SessionState,
    link: Option<L>,
    profile: Option<Profile>,
    tasks: Vec<JoinHandle<()>>,
}

impl<L> Sensor<L> {
    pub fn new(address: MacAddr6) -> Self {
        Self {
            address,
            state: SessionState::Unconnected,
            link: None,
            profile: None,
            tasks: Vec::new(),
        }
    }

    pub fn address(&self) -> MacAddr6 {
        self.address
    }

    pub fn model(&self) -> &'static str {
        MODEL
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn link(&self) -> Option<&L> {
        self.link.as_ref()
    }

    fn check(&self, operation: &'static str, allowed: &[SessionState]) -> Result<()> {
        if self.state == SessionState::Disconnected {
            return Err(Error::SessionClosed);
        }

        if !allowed.contains(&self.state) {
            return Err(Error::InvalidState {
                operation,
                state: self.state,
            });
        }

        Ok(())
    }

    fn ready(&self, operation: &'static str, allowed: &[SessionState]) -> Result<(&L, &Profile)> {
        self.check(operation, allowed)?;

        match (&self.link, &self.profile) {
            (Some(link), Some(profile)) => Ok((link, profile)),
            _ => Err(Error::InvalidState {
                operation,
                state: self.state,
            }),
        }
    }

    fn stop_streaming(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl<L: Link> Sensor<L> {
    pub async fn connect<C>(&mut self, central: &C, timeout: Duration) -> Result<()>
    where
        C: Central<Link = L>,
    {
        self.check("connect", &[SessionState::Unconnected])?;

        let address = self.address;
        debug!(%address, ?timeout, "connecting");

        // The central owns the deadline so it can stop scanning on expiry.
        let link = central.connect(address, timeout).await?;

        self.link = Some(link);
        self.state = SessionState::Connected;
        info!(%address, "connected");

        Ok(())
    }

    /// Connects and discovers the profile, both bounded by one `timeout`.
    pub async fn connect_and_discover<C>(&mut self, central: &C, timeout: Duration) -> Result<()>
    where
        C: Central<Link = L>,
    {
        let deadline = Instant::now() + timeout;
        let address = self.address;

        self.connect(central, timeout).await?;

        timeout_at(deadline, self.discover_profile())
            .await
            .map_err(|_| Error::ConnectTimeout { address, timeout })??;

        Ok(())
    }

    pub async fn discover_profile(&mut self) -> Result<&Profile> {
        self.check("discover profile", &[SessionState::Connected])?;

        let Some(link) = self.link.as_mut() else {
            return Err(Error::InvalidState {
                operation: "discover profile",
                state: self.state,
            });
        };

        let profile = link.discover_profile().await?;
        debug!(
            address = %self.address,
            attributes = profile.attribute_count(),
            "profile discovered"
        );

        self.state = SessionState::ProfileDiscovered;

        Ok(self.profile.insert(profile))
    }

    pub async fn time(&self) -> Result<DateTime<Utc>> {
        let (link, profile) = self.ready("read RTC", &DISCOVERED)?;

        let data = link.read(Role::Rtc.characteristic(profile)?).await?;

        decode_rtc(&data)
    }

    pub async fn set_time(&self, time: DateTime<Utc>) -> Result<()> {
        let (link, profile) = self.ready("set RTC", &DISCOVERED)?;
        let characteristic = Role::Rtc.characteristic(profile)?;

        debug!(address = %self.address, %time, "setting RTC");
        link.write(characteristic, &encode_rtc(time), true).await
    }

    pub async fn comfort_range(&self) -> Result<ComfortRange> {
        let (link, profile) = self.ready("read comfort range", &DISCOVERED)?;

        let data = link
            .read(Role::ComfortRange.characteristic(profile)?)
            .await?;

        ComfortRange::decode(&data)
    }

    pub async fn set_comfort_range(&self, range: &ComfortRange) -> Result<()> {
        let (link, profile) = self.ready("set comfort range", &DISCOVERED)?;
        let data = range.encode()?;
        let characteristic = Role::ComfortRange.characteristic(profile)?;

        debug!(address = %self.address, ?range, "setting comfort range");
        link.write(characteristic, &data, true).await
    }

    pub async fn enable_power_saving(&self) -> Result<()> {
        let (link, profile) = self.ready("enable power saving", &DISCOVERED)?;
        let characteristic = Role::PowerMode.characteristic(profile)?;

        debug!(address = %self.address, "enabling power saving");
        link.write(characteristic, &POWER_SAVE_INTERVAL, true).await
    }

    pub async fn enable_notifications(&mut self) -> Result<()> {
        let (link, profile) = self.ready(
            "enable notifications",
            &[SessionState::ProfileDiscovered, SessionState::Configured],
        )?;
        let descriptor = Role::NotifyConfig.descriptor(profile)?;

        link.write_descriptor(descriptor, &NOTIFY_ENABLE).await?;

        self.state = SessionState::Configured;
        debug!(address = %self.address, "notifications enabled");

        Ok(())
    }

    /// Calls `on_reading` for every well-formed sensor data notification.
    /// Malformed frames are logged and skipped.
    pub async fn subscribe<F>(&mut self, mut on_reading: F) -> Result<()>
    where
        F: FnMut(Reading) + Send + 'static,
    {
        let (link, profile) = self.ready("subscribe", &[SessionState::Configured])?;
        let characteristic = Role::SensorData.characteristic(profile)?;

        let mut notifications = link.subscribe(characteristic).await?;

        let address = self.address;
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(FRAME_QUEUE_DEPTH);

        // Never blocks the transport: frames are dropped once the queue is full.
        let pump = tokio::spawn(async move {
            while let Some(frame) = notifications.next().await {
                match tx.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!(%address, "notification queue full, dropping frame");
                    }
                    Err(TrySendError::Closed(_)) => break,
                }
            }
            debug!(%address, "notification stream ended");
        });

        let dispatch = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                match Reading::decode(address, &frame) {
                    Ok(reading) => on_reading(reading),
                    Err(err) => warn!(%address, "dropping notification: {err}"),
                }
            }
        });

        self.stop_streaming();
        self.tasks = vec![pump, dispatch];
        self.state = SessionState::Streaming;
        info!(%address, "streaming");

        Ok(())
    }

    /// Releases the connection. The session is closed afterwards even if
    /// the transport fails to disconnect cleanly.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.state == SessionState::Disconnected {
            return Ok(());
        }

        self.stop_streaming();
        self.state = SessionState::Disconnected;
        self.profile = None;

        let Some(mut link) = self.link.take() else {
            return Ok(());
        };

        info!(address = %self.address, "disconnecting");
        link.disconnect().await
    }
}

impl<L> Drop for Sensor<L> {
    fn drop(&mut self) {
        self.stop_streaming();
    }
}
