use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{error, serial::PortDescriptor, status::StatusEvent};

/// Actions a client can ask of the server.
///
/// On the wire these are JSON objects tagged by `type`, e.g.
/// `{"type": "connect", "port": "/dev/ttyUSB0", "baud": 115200}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Open the given port, closing any port already open.
    Connect {
        /// The device to open.
        #[serde(default)]
        port: String,

        /// The baud rate. The server's default is used if omitted.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        baud: Option<u32>,
    },

    /// Close the port if one is open.
    Disconnect,

    /// Send a line of G-code to the machine.
    Gcode {
        /// The line to send.
        #[serde(default)]
        data: String,
    },

    /// List the ports available on the server.
    ListPorts,
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Connect { port, baud: Some(baud) } => write!(f, "connect: {port} @ {baud}"),
            Action::Connect { port, baud: None } => write!(f, "connect: {port}"),
            Action::Disconnect => write!(f, "disconnect"),
            Action::Gcode { data } => write!(f, "gcode: {}", data.trim()),
            Action::ListPorts => write!(f, "list ports"),
        }
    }
}

impl Action {
    /// Create a connect action.
    pub fn connect(port: &str, baud: Option<u32>) -> Self {
        Self::Connect {
            port: port.into(),
            baud,
        }
    }

    /// An example of connecting to a machine.
    pub fn example_connect() -> Self {
        Self::connect("/dev/ttyUSB0", Some(115_200))
    }

    /// Create a G-code action.
    pub fn gcode(data: &str) -> Self {
        Self::Gcode { data: data.into() }
    }

    /// An example of sending G-code.
    pub fn example_gcode() -> Self {
        Self::gcode("G90 G0 X10 Y20 F3000")
    }

    /// Turn an action into serialized json.
    pub fn serialize(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Messages the server sends to connected clients.
///
/// Some are replies to an [`Action`], the rest (`position`, `status`, firmware `error`s)
/// arrive whenever the machine is polled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Connecting succeeded.
    Connected {
        /// The port now open.
        port: String,
    },

    /// Disconnecting is done.
    Disconnected,

    /// Something went wrong, or the firmware reported an error.
    Error {
        /// What happened.
        text: String,
    },

    /// The machine position from a status report.
    Position {
        /// Machine X.
        x: f64,

        /// Machine Y.
        y: f64,
    },

    /// A line from the firmware with no other meaning to us.
    Status {
        /// The line as received.
        text: String,
    },

    /// The ports available on the server.
    Ports {
        /// The ports.
        ports: Vec<PortDescriptor>,
    },
}

impl Response {
    pub(crate) fn connected(port: &str) -> Self {
        Self::Connected { port: port.into() }
    }

    pub(crate) fn error(e: &error::Error) -> Self {
        Self::Error {
            text: e.to_string(),
        }
    }

    /// Whether this is sent unprompted by status polling.
    pub fn is_status(&self) -> bool {
        matches!(self, Response::Position { .. } | Response::Status { .. })
    }

    /// An example of a connect reply.
    pub fn example_connected() -> Self {
        Self::connected("/dev/ttyUSB0")
    }

    /// An example of a position update.
    pub fn example_position() -> Self {
        Self::Position { x: 1.25, y: -3.0 }
    }

    /// An example reply to listing ports.
    pub fn example_ports() -> Self {
        Self::Ports {
            ports: vec![
                PortDescriptor {
                    device: "/dev/ttyUSB0".into(),
                    description: "USB Serial".into(),
                    hwid: "USB VID:PID=1A86:7523".into(),
                },
                crate::mock::descriptor(),
            ],
        }
    }

    /// Turn a response into serialized json.
    pub fn serialize(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl TryFrom<StatusEvent> for Response {
    type Error = StatusEvent;

    /// Acknowledgements are not forwarded, so they are handed back.
    fn try_from(event: StatusEvent) -> Result<Self, StatusEvent> {
        match event {
            StatusEvent::Position { x, y } => Ok(Response::Position { x, y }),
            StatusEvent::Error(text) => Ok(Response::Error { text }),
            StatusEvent::StatusText(text) => Ok(Response::Status { text }),
            StatusEvent::Ack => Err(StatusEvent::Ack),
        }
    }
}

impl Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Response::Connected { port } => write!(f, "Connected to {port}"),
            Response::Disconnected => write!(f, "Disconnected"),
            Response::Error { text } => write!(f, "Error: {text}"),
            Response::Position { x, y } => write!(f, "Position ({x}, {y})"),
            Response::Status { text } => write!(f, "Status: {text}"),
            Response::Ports { ports } => write!(f, "{} port(s)", ports.len()),
        }
    }
}
