use btleplug::api::CharPropFlags;
use uuid::Uuid;

/// ATT handle `0x0000` is reserved; attributes whose handle the host stack
/// did not report carry it.
pub const UNKNOWN_HANDLE: u16 = 0x0000;

/// Discovered GATT database of one remote device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub uuid: Uuid,

    pub handle: u16,

    pub characteristics: Vec<Characteristic>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Characteristic {
    pub uuid: Uuid,

    pub service_uuid: Uuid,

    /// Handle of the characteristic declaration.
    pub handle: u16,

    /// Handle of the characteristic value, used for reads and writes.
    pub value_handle: u16,

    pub properties: CharPropFlags,

    pub descriptors: Vec<Descriptor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub uuid: Uuid,

    pub service_uuid: Uuid,

    pub characteristic_uuid: Uuid,

    pub handle: u16,
}

/// Any node of a [`Profile`] tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Attribute<'a> {
    Service(&'a Service),
    Characteristic(&'a Characteristic),
    Descriptor(&'a Descriptor),
}

impl Profile {
    pub fn service_by_handle(&self, handle: u16) -> Option<&Service> {
        if handle == UNKNOWN_HANDLE {
            return None;
        }

        self.services.iter().find(|s| s.handle == handle)
    }

    pub fn characteristic_by_handle(&self, handle: u16) -> Option<&Characteristic> {
        if handle == UNKNOWN_HANDLE {
            return None;
        }

        self.characteristics().find(|c| c.handle == handle)
    }

    pub fn characteristic_by_value_handle(&self, handle: u16) -> Option<&Characteristic> {
        if handle == UNKNOWN_HANDLE {
            return None;
        }

        self.characteristics().find(|c| c.value_handle == handle)
    }

    pub fn descriptor_by_handle(&self, handle: u16) -> Option<&Descriptor> {
        if handle == UNKNOWN_HANDLE {
            return None;
        }

        self.characteristics()
            .flat_map(|c| c.descriptors.iter())
            .find(|d| d.handle == handle)
    }

    /// Finds whichever node owns `handle`, treating a characteristic value
    /// handle as the characteristic itself.
    pub fn attribute_by_handle(&self, handle: u16) -> Option<Attribute<'_>> {
        if let Some(s) = self.service_by_handle(handle) {
            return Some(Attribute::Service(s));
        }

        if let Some(c) = self
            .characteristic_by_handle(handle)
            .or_else(|| self.characteristic_by_value_handle(handle))
        {
            return Some(Attribute::Characteristic(c));
        }

        self.descriptor_by_handle(handle).map(Attribute::Descriptor)
    }

    pub fn characteristics(&self) -> impl Iterator<Item = &Characteristic> {
        self.services.iter().flat_map(|s| s.characteristics.iter())
    }

    pub fn attribute_count(&self) -> usize {
        self.services
            .iter()
            .map(|s| {
                1 + s
                    .characteristics
                    .iter()
                    .map(|c| 1 + c.descriptors.len())
                    .sum::<usize>()
            })
            .sum()
    }
}
