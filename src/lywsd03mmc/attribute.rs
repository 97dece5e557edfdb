use std::fmt;

use uuid::{Uuid, uuid};

use crate::{
    error::{Error, Result},
    gatt::{Characteristic, Descriptor, HandleHint, Profile},
};

pub const SERVICE_UUID: Uuid = uuid!("ebe0ccb0-7a0a-4b0c-8a1a-6ff2997da3a6");

const CLIENT_CHARACTERISTIC_CONFIGURATION_UUID: Uuid =
    uuid!("00002902-0000-1000-8000-00805f9b34fb");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Rtc,
    SensorData,
    NotifyConfig,
    ComfortRange,
    PowerMode,
}

/// How a binding's handle is matched against a discovered profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    CharacteristicValue,
    Descriptor(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeBinding {
    pub role: Role,

    pub handle: u16,

    pub characteristic: Uuid,

    pub target: Target,
}

/// Handle layout of the supported firmware.
pub static ATTRIBUTES: [AttributeBinding; 5] = [
    AttributeBinding {
        role: Role::Rtc,
        handle: 0x23,
        characteristic: uuid!("ebe0ccb7-7a0a-4b0c-8a1a-6ff2997da3a6"),
        target: Target::CharacteristicValue,
    },
    AttributeBinding {
        role: Role::SensorData,
        handle: 0x36,
        characteristic: uuid!("ebe0ccc1-7a0a-4b0c-8a1a-6ff2997da3a6"),
        target: Target::CharacteristicValue,
    },
    AttributeBinding {
        role: Role::NotifyConfig,
        handle: 0x38,
        characteristic: uuid!("ebe0ccc1-7a0a-4b0c-8a1a-6ff2997da3a6"),
        target: Target::Descriptor(CLIENT_CHARACTERISTIC_CONFIGURATION_UUID),
    },
    AttributeBinding {
        role: Role::ComfortRange,
        handle: 0x43,
        characteristic: uuid!("ebe0ccd7-7a0a-4b0c-8a1a-6ff2997da3a6"),
        target: Target::CharacteristicValue,
    },
    AttributeBinding {
        role: Role::PowerMode,
        handle: 0x46,
        characteristic: uuid!("ebe0ccd8-7a0a-4b0c-8a1a-6ff2997da3a6"),
        target: Target::CharacteristicValue,
    },
];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Rtc => "RTC",
            Role::SensorData => "sensor data",
            Role::NotifyConfig => "notification config",
            Role::ComfortRange => "comfort range",
            Role::PowerMode => "power mode",
        }
    }

    pub fn binding(&self) -> &'static AttributeBinding {
        match self {
            Role::Rtc => &ATTRIBUTES[0],
            Role::SensorData => &ATTRIBUTES[1],
            Role::NotifyConfig => &ATTRIBUTES[2],
            Role::ComfortRange => &ATTRIBUTES[3],
            Role::PowerMode => &ATTRIBUTES[4],
        }
    }

    pub fn handle(&self) -> u16 {
        self.binding().handle
    }

    pub fn characteristic<'a>(&self, profile: &'a Profile) -> Result<&'a Characteristic> {
        profile
            .characteristic_by_value_handle(self.handle())
            .ok_or_else(|| self.not_found())
    }

    pub fn descriptor<'a>(&self, profile: &'a Profile) -> Result<&'a Descriptor> {
        profile
            .descriptor_by_handle(self.handle())
            .ok_or_else(|| self.not_found())
    }

    fn not_found(&self) -> Error {
        Error::AttributeNotFound {
            role: *self,
            handle: self.handle(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finds the role bound to a characteristic value or descriptor handle.
pub fn role_by_handle(handle: u16) -> Option<Role> {
    ATTRIBUTES.iter().find(|b| b.handle == handle).map(|b| b.role)
}

/// Finds the role whose characteristic has `uuid`.
pub fn role_by_uuid(uuid: Uuid) -> Option<Role> {
    ATTRIBUTES
        .iter()
        .find(|b| b.characteristic == uuid && b.target == Target::CharacteristicValue)
        .map(|b| b.role)
}

/// Handles for host stacks that only identify attributes by UUID.
pub fn handle_hints() -> Vec<HandleHint> {
    ATTRIBUTES
        .iter()
        .map(|b| HandleHint {
            characteristic: b.characteristic,
            descriptor: match b.target {
                Target::CharacteristicValue => None,
                Target::Descriptor(uuid) => Some(uuid),
            },
            handle: b.handle,
        })
        .collect()
}
