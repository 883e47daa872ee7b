use serde::{Deserialize, Serialize};
use serialport::{SerialPortInfo, SerialPortType};
use tracing::{debug, warn};

/// A serial port present on the host.
///
/// This is a snapshot, the next listing may differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    /// The name used to open the port, e.g. `/dev/ttyUSB0` or `COM3`.
    pub device: String,

    /// Human readable description.
    pub description: String,

    /// Hardware id, e.g. `USB VID:PID=1A86:7523 SER=0001`.
    pub hwid: String,
}

const NOT_AVAILABLE: &str = "n/a";

impl From<SerialPortInfo> for PortDescriptor {
    fn from(info: SerialPortInfo) -> Self {
        let (description, hwid) = match info.port_type {
            SerialPortType::UsbPort(usb) => {
                let description = usb
                    .product
                    .or(usb.manufacturer)
                    .unwrap_or_else(|| NOT_AVAILABLE.into());

                let mut hwid = format!("USB VID:PID={:04X}:{:04X}", usb.vid, usb.pid);
                if let Some(serial_number) = usb.serial_number {
                    hwid += &format!(" SER={serial_number}");
                }

                (description, hwid)
            }
            SerialPortType::PciPort => (NOT_AVAILABLE.into(), "PCI".into()),
            SerialPortType::BluetoothPort => (NOT_AVAILABLE.into(), "BLUETOOTH".into()),
            SerialPortType::Unknown => (NOT_AVAILABLE.into(), NOT_AVAILABLE.into()),
        };

        Self {
            device: info.port_name,
            description,
            hwid,
        }
    }
}

/// List the serial ports on this host.
///
/// If the ports can't be enumerated the list is empty.
pub fn list_ports() -> Vec<PortDescriptor> {
    match serialport::available_ports() {
        Ok(ports) => {
            debug!("Found {} serial port(s)", ports.len());
            ports.into_iter().map(PortDescriptor::from).collect()
        }
        Err(e) => {
            warn!(?e, "Could not list serial ports");
            vec![]
        }
    }
}
