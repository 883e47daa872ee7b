#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

/// The actions that can be sent from a connecting user,
/// as well as the responses.
pub mod actions;

/// Code relating to setting up the server which sets up connections and spawns handlers for clients.
pub mod server;

/// Clients.
pub mod client;

/// The command line interface.
pub mod cli;

/// Handles incoming websockets.
pub(crate) mod websocket;

/// The actor spawned from a connected user.
pub(crate) mod peer;

/// A mock, useful to test the bridge without a machine attached.
///
/// Ports named `mock:<anything>` open a small simulation of a GRBL controller.
/// It understands enough of the protocol to answer status queries and move around.
pub mod mock;

/// Serial port driver.
pub mod serial;

/// Relates to config files.
pub mod config;

/// Possible errors in this library.
pub mod error;

/// Logging/tracing setup.
pub mod logging;

/// The machine session: at most one open transport, and the task owning it.
///
/// All access to the transport goes through a [`session::MachineHandle`].
/// Requests are served one at a time by the task holding the [`session::MachineSession`],
/// so a command from the client and a status query from the poller never overlap.
pub mod session;

/// Status polling.
///
/// GRBL does not report its state unprompted, so while a port is open we keep asking.
pub mod poller;

/// Parsing of the lines a GRBL-class firmware prints.
///
/// Every line maps to exactly one [`status::StatusEvent`].
/// Malformed status reports are not errors, they are passed on as text.
pub mod status;
