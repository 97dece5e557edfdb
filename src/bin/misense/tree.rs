use std::fmt::Write as _;

use btleplug::api::{CharPropFlags, PeripheralProperties, bleuuid::BleUuid as _};
use misense::{
    gatt::{Characteristic, Descriptor, Link, Profile, Service, UNKNOWN_HANDLE},
    lywsd03mmc::{SERVICE_UUID, role_by_handle, role_by_uuid},
};
use uuid::Uuid;

const PROPERTY_FLAGS: [(CharPropFlags, char); 8] = [
    (CharPropFlags::BROADCAST, 'B'),
    (CharPropFlags::READ, 'R'),
    (CharPropFlags::WRITE_WITHOUT_RESPONSE, 'w'),
    (CharPropFlags::WRITE, 'W'),
    (CharPropFlags::NOTIFY, 'N'),
    (CharPropFlags::INDICATE, 'I'),
    (CharPropFlags::AUTHENTICATED_SIGNED_WRITES, 'S'),
    (CharPropFlags::EXTENDED_PROPERTIES, 'E'),
];

pub async fn print_device_tree<L: Link>(
    link: &L,
    profile: &Profile,
    properties: Option<&PeripheralProperties>,
) {
    println!("[ble_device]");
    println!("  - mac: {}", link.address());
    if let Some(properties) = properties {
        if let Some(rssi) = properties.rssi {
            println!("  - rssi: {rssi}");
        }
        println!(
            "  - name: {}",
            properties.local_name.as_deref().unwrap_or_default()
        );
    }

    for service in &profile.services {
        println!("  - [service]");
        print_service(service, "    -");

        for characteristic in &service.characteristics {
            println!("    - [characteristic]");
            print_characteristic(link, characteristic, "      -").await;

            for descriptor in &characteristic.descriptors {
                println!("      - [descriptor]");
                print_descriptor(link, descriptor, "        -").await;
            }
        }
    }
}

fn print_service(service: &Service, prefix: &str) {
    println!("{prefix} uuid: {}", service.uuid);
    println!("{prefix} name: {}", name(service.uuid));
    println!("{prefix} handle: {}", handle(service.handle));
}

async fn print_characteristic<L: Link>(link: &L, characteristic: &Characteristic, prefix: &str) {
    println!("{prefix} uuid: {}", characteristic.uuid);
    println!("{prefix} name: {}", name(characteristic.uuid));
    println!(
        "{prefix} property: 0x{:02X} | {}",
        characteristic.properties.bits(),
        property_string(characteristic.properties)
    );
    println!("{prefix} handle: {}", handle(characteristic.handle));
    println!("{prefix} vhandle: {}", handle(characteristic.value_handle));

    if !characteristic.properties.contains(CharPropFlags::READ) {
        println!("{prefix} value: [no read permission]");
        return;
    }

    match link.read(characteristic).await {
        Ok(value) => println!("{prefix} value: {}", value_string(&value)),
        Err(err) => println!("{prefix} value: [error: {err}]"),
    }
}

async fn print_descriptor<L: Link>(link: &L, descriptor: &Descriptor, prefix: &str) {
    println!("{prefix} uuid: {}", descriptor.uuid);
    println!("{prefix} name: {}", descriptor_name(descriptor));
    println!("{prefix} handle: {}", handle(descriptor.handle));

    match link.read_descriptor(descriptor).await {
        Ok(value) => println!("{prefix} value: {}", value_string(&value)),
        Err(err) => println!("{prefix} value: [error: {err}]"),
    }
}

pub fn hex(data: &[u8]) -> String {
    data.iter().fold(String::new(), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

fn value_string(data: &[u8]) -> String {
    format!("{} | {:?}", hex(data), String::from_utf8_lossy(data))
}

fn handle(handle: u16) -> String {
    if handle == UNKNOWN_HANDLE {
        return "-".to_owned();
    }

    format!("0x{handle:02X}")
}

fn property_string(properties: CharPropFlags) -> String {
    PROPERTY_FLAGS
        .iter()
        .filter(|(flag, _)| properties.contains(*flag))
        .map(|(_, c)| c)
        .collect()
}

fn descriptor_name(descriptor: &Descriptor) -> &'static str {
    match role_by_handle(descriptor.handle) {
        Some(role) => role.as_str(),
        None => name(descriptor.uuid),
    }
}

fn name(uuid: Uuid) -> &'static str {
    if uuid == SERVICE_UUID {
        return "LYWSD03MMC";
    }

    if let Some(role) = role_by_uuid(uuid) {
        return role.as_str();
    }

    match uuid.to_ble_u16() {
        Some(0x1800) => "Generic Access",
        Some(0x1801) => "Generic Attribute",
        Some(0x180a) => "Device Information",
        Some(0x180f) => "Battery Service",
        Some(0x2a00) => "Device Name",
        Some(0x2a01) => "Appearance",
        Some(0x2a04) => "Peripheral Preferred Connection Parameters",
        Some(0x2a05) => "Service Changed",
        Some(0x2a19) => "Battery Level",
        Some(0x2a24) => "Model Number String",
        Some(0x2a25) => "Serial Number String",
        Some(0x2a26) => "Firmware Revision String",
        Some(0x2a27) => "Hardware Revision String",
        Some(0x2a28) => "Software Revision String",
        Some(0x2a29) => "Manufacturer Name String",
        Some(0x2900) => "Characteristic Extended Properties",
        Some(0x2901) => "Characteristic User Description",
        Some(0x2902) => "Client Characteristic Configuration",
        _ => "",
    }
}
