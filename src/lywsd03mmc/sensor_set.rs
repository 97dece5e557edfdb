use indexmap::{IndexMap, map::Entry};
use macaddr::MacAddr6;
use tracing::warn;

use crate::{error::Error, gatt::Link, lywsd03mmc::Sensor};

/// Sessions for several sensors, released together.
///
/// Register a sensor before connecting it so that [`SensorSet::disconnect_all`]
/// also covers sessions that failed halfway through setup.
pub struct SensorSet<L> {
    sensors: IndexMap<MacAddr6, Sensor<L>>,
}

impl<L> Default for SensorSet<L> {
    fn default() -> Self {
        Self {
            sensors: IndexMap::new(),
        }
    }
}

impl<L: Link> SensorSet<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `address`, creating an unconnected one if needed.
    pub fn register(&mut self, address: MacAddr6) -> &mut Sensor<L> {
        self.sensors
            .entry(address)
            .or_insert_with(|| Sensor::new(address))
    }

    /// Registers a new unconnected session for `address`. Returns `None`
    /// when the address is already registered.
    pub fn register_new(&mut self, address: MacAddr6) -> Option<&mut Sensor<L>> {
        match self.sensors.entry(address) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => Some(entry.insert(Sensor::new(address))),
        }
    }

    pub fn get(&self, address: &MacAddr6) -> Option<&Sensor<L>> {
        self.sensors.get(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sensor<L>> {
        self.sensors.values()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Disconnects every registered session in registration order, exactly
    /// once each, and returns the failures instead of stopping at the first.
    pub async fn disconnect_all(&mut self) -> Vec<(MacAddr6, Error)> {
        let mut failures = Vec::new();

        for (address, mut sensor) in self.sensors.drain(..) {
            if let Err(err) = sensor.disconnect().await {
                warn!(%address, "failed to disconnect: {err}");
                failures.push((address, err));
            }
        }

        failures
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        gatt::fake::{FakeCentral, FakeLink},
        lywsd03mmc::SessionState,
    };

    const A: MacAddr6 = MacAddr6::new(0xa4, 0xc1, 0x38, 0x00, 0x00, 0x01);
    const B: MacAddr6 = MacAddr6::new(0xa4, 0xc1, 0x38, 0x00, 0x00, 0x02);
    const C: MacAddr6 = MacAddr6::new(0xa4, 0xc1, 0x38, 0x00, 0x00, 0x03);
    const TIMEOUT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn disconnects_every_session_despite_failures() {
        let mut failing = FakeCentral::new();
        failing.fail_disconnect = true;
        let healthy = FakeCentral::new();

        let mut set = SensorSet::<FakeLink>::new();
        set.register(A)
            .connect_and_discover(&failing, TIMEOUT)
            .await
            .unwrap();
        set.register(B)
            .connect_and_discover(&healthy, TIMEOUT)
            .await
            .unwrap();
        set.register(C);
        assert_eq!(set.len(), 3);

        let failures = set.disconnect_all().await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, A);
        assert!(matches!(failures[0].1, Error::Transport(_)));
        assert_eq!(failing.disconnects(), vec![A]);
        assert_eq!(healthy.disconnects(), vec![B]);
        assert!(set.is_empty());

        assert!(set.disconnect_all().await.is_empty());
    }

    #[tokio::test]
    async fn timeout_on_one_sensor_leaves_others_alone() {
        let mut slow = FakeCentral::new();
        slow.connect_delay = Duration::from_secs(5);
        let fast = FakeCentral::new();

        let mut set = SensorSet::<FakeLink>::new();
        set.register(A)
            .connect_and_discover(&fast, TIMEOUT)
            .await
            .unwrap();
        let err = set
            .register(B)
            .connect_and_discover(&slow, Duration::from_millis(20))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ConnectTimeout { .. }));
        assert_eq!(set.get(&A).unwrap().state(), SessionState::ProfileDiscovered);
        assert_eq!(set.get(&B).unwrap().state(), SessionState::Unconnected);

        assert!(set.disconnect_all().await.is_empty());
        assert_eq!(fast.disconnects(), vec![A]);
        assert!(slow.disconnects().is_empty());
    }

    #[test]
    fn register_returns_existing_session() {
        let mut set = SensorSet::<FakeLink>::new();

        set.register(A);
        set.register(A);

        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().address(), A);
    }

    #[tokio::test]
    async fn register_new_skips_known_address() {
        let central = FakeCentral::new();
        let mut set = SensorSet::<FakeLink>::new();

        set.register_new(A)
            .unwrap()
            .connect_and_discover(&central, TIMEOUT)
            .await
            .unwrap();

        assert!(set.register_new(A).is_none());
        assert!(set.register_new(B).is_some());
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(&A).unwrap().state(), SessionState::ProfileDiscovered);

        assert!(set.disconnect_all().await.is_empty());
        assert_eq!(central.disconnects(), vec![A]);
    }
}
