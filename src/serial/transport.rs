use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tokio_util::codec::{Decoder, Framed};
use tracing::{debug, info, trace};

use crate::{
    config::Config,
    mock::{self, MockTransport},
    serial::{codecs::lines::LinesCodec, error::SerialPortError, ports, PortDescriptor},
};

/// Line oriented access to one open device.
///
/// A transport is open from the moment it is created until [`Transport::close`]
/// is called, or until the device goes away.
#[async_trait]
pub trait Transport: Send {
    /// The device this transport talks to.
    fn name(&self) -> &str;

    /// Whether the device handle is still held.
    fn is_open(&self) -> bool;

    /// Write the line followed by a newline.
    async fn write_line(&mut self, line: &str) -> Result<(), SerialPortError>;

    /// Get a line if one arrives within a short bounded wait.
    ///
    /// `Ok(None)` means no data right now.
    async fn try_read_line(&mut self) -> Result<Option<String>, SerialPortError>;

    /// Release the device. Calling this again does nothing.
    fn close(&mut self);
}

/// Opens transports by port name.
pub trait Connector: Send + Sync {
    /// Open the given port.
    fn open(&self, port: &str, baud: u32) -> Result<Box<dyn Transport>, SerialPortError>;

    /// The ports which may be opened.
    ///
    /// This may block, so async callers should use a blocking task.
    fn list_ports(&self) -> Vec<PortDescriptor> {
        ports::list_ports()
    }
}

/// A serial device opened through tokio-serial.
pub struct SerialTransport {
    path: String,
    framed: Option<Framed<SerialStream, LinesCodec>>,
    read_timeout: Duration,
}

impl SerialTransport {
    /// Open the device at `path` as 8N1 without flow control.
    pub fn open(path: &str, baud: u32, read_timeout: Duration) -> Result<Self, SerialPortError> {
        let serial_stream = tokio_serial::new(path, baud)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| SerialPortError::Open {
                path: path.to_owned(),
                problem: e.to_string(),
            })?;

        info!(%path, %baud, "Serial port opened");

        Ok(Self {
            path: path.to_owned(),
            framed: Some(LinesCodec::default().framed(serial_stream)),
            read_timeout,
        })
    }
}

#[async_trait]
impl Transport for SerialTransport {
    fn name(&self) -> &str {
        &self.path
    }

    fn is_open(&self) -> bool {
        self.framed.is_some()
    }

    async fn write_line(&mut self, line: &str) -> Result<(), SerialPortError> {
        let framed = self.framed.as_mut().ok_or(SerialPortError::NotOpen)?;

        trace!(%line, "To wire");
        let sent = framed.send(line.to_owned()).await;

        if sent.is_err() {
            self.close();
        }
        sent
    }

    async fn try_read_line(&mut self) -> Result<Option<String>, SerialPortError> {
        let Some(framed) = self.framed.as_mut() else {
            return Ok(None);
        };

        let next = tokio::time::timeout(self.read_timeout, framed.next()).await;

        match next {
            Err(_elapsed) => Ok(None),
            Ok(Some(Ok(line))) => {
                trace!(%line, "From wire");
                Ok(Some(line))
            }
            Ok(Some(Err(e))) => {
                self.close();
                Err(e)
            }
            Ok(None) => {
                self.close();
                Err(SerialPortError::Disconnected)
            }
        }
    }

    fn close(&mut self) {
        if self.framed.take().is_some() {
            debug!(path = %self.path, "Serial port closed");
        }
    }
}

/// Opens real serial ports, and simulated firmware for `mock:` ports when allowed.
#[derive(Debug, Clone)]
pub struct SystemConnector {
    read_timeout: Duration,
    allow_mocks: bool,
}

impl SystemConnector {
    /// A connector set up from the given configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            read_timeout: config.read_timeout(),
            allow_mocks: config.allow_mocks,
        }
    }
}

impl Connector for SystemConnector {
    fn open(&self, port: &str, baud: u32) -> Result<Box<dyn Transport>, SerialPortError> {
        if self.allow_mocks && mock::is_mock_port(port) {
            return Ok(Box::new(MockTransport::new(port)));
        }

        Ok(Box::new(SerialTransport::open(
            port,
            baud,
            self.read_timeout,
        )?))
    }

    fn list_ports(&self) -> Vec<PortDescriptor> {
        let mut ports = ports::list_ports();

        if self.allow_mocks {
            ports.push(mock::descriptor());
        }

        ports
    }
}
