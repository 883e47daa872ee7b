/// Serial port related errors.
pub mod error;

/// The transport owning a serial handle, and the connectors which open them.
pub mod transport;

/// Enumerating the serial ports of the host.
pub mod ports;

/// Codecs for encoding/decoding messages to/from wire.
pub(crate) mod codecs {
    /// Newline delimited text.
    pub(crate) mod lines;
}

pub use error::SerialPortError;
pub use ports::{list_ports, PortDescriptor};
pub use transport::{Connector, SerialTransport, SystemConnector, Transport};

/// The baud rate used when none is given.
pub const DEFAULT_BAUD: u32 = 115_200;
