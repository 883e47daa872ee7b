use std::{fmt::Display, sync::Arc};

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, trace, warn, Instrument, Span};

use crate::{
    error::Error,
    serial::{Connector, Transport, DEFAULT_BAUD},
};

/// Where the session is at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// No port is open.
    Disconnected,

    /// A port is open.
    Connected {
        /// The open port.
        port: String,

        /// Its baud rate.
        baud: u32,
    },
}

impl Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Disconnected => write!(f, "disconnected"),
            State::Connected { port, baud } => write!(f, "connected to {port} @ {baud}"),
        }
    }
}

/// Owns the transport to one machine.
///
/// The transport is either absent or open.
/// Whenever it fails or is found closed it is dropped.
pub struct MachineSession {
    connector: Arc<dyn Connector>,
    transport: Option<Box<dyn Transport>>,
    port: String,
    baud: u32,
}

impl MachineSession {
    /// A disconnected session which opens ports through the given connector.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            transport: None,
            port: String::new(),
            baud: DEFAULT_BAUD,
        }
    }

    /// The current state.
    pub fn state(&self) -> State {
        match &self.transport {
            Some(_) => State::Connected {
                port: self.port.clone(),
                baud: self.baud,
            },
            None => State::Disconnected,
        }
    }

    /// Whether a port is open.
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Open `port`, closing whatever was open before.
    pub fn connect(&mut self, port: &str, baud: u32) -> Result<(), Error> {
        self.disconnect();

        match self.connector.open(port, baud) {
            Ok(transport) => {
                info!(%port, %baud, "Connected");
                self.transport = Some(transport);
                self.port = port.into();
                self.baud = baud;

                Ok(())
            }
            Err(e) => {
                warn!(%port, %e, "Could not connect");
                Err(Error::CannotOpen(port.into()))
            }
        }
    }

    /// Close the port if one is open.
    pub fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            info!(port = %transport.name(), "Disconnecting");
            transport.close();
        }
    }

    fn open_transport(&mut self) -> Result<&mut Box<dyn Transport>, Error> {
        if !self.transport.as_ref().map_or(false, |t| t.is_open()) {
            self.disconnect();
        }

        self.transport.as_mut().ok_or(Error::NotConnected)
    }

    /// Send a command to the machine.
    ///
    /// Trailing whitespace is trimmed, the transport adds the newline.
    pub async fn send(&mut self, command: &str) -> Result<(), Error> {
        let transport = self.open_transport()?;

        let written = transport.write_line(command.trim_end()).await;

        if let Err(e) = written {
            warn!(%e, "Write failed");
            self.disconnect();
            return Err(e.into());
        }

        Ok(())
    }

    /// Read every line the machine has sent so far.
    ///
    /// Blank lines are skipped.
    pub async fn read_available(&mut self) -> Result<Vec<String>, Error> {
        let transport = self.open_transport()?;
        let mut lines = vec![];

        loop {
            let next = transport.try_read_line().await;

            match next {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        lines.push(line.to_owned());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(%e, "Read failed");
                    self.disconnect();
                    return Err(e.into());
                }
            }
        }

        Ok(lines)
    }
}

impl Drop for MachineSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

enum Request {
    Connect {
        port: String,
        baud: u32,
        reply: oneshot::Sender<Result<(), Error>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Send {
        command: String,
        reply: oneshot::Sender<Result<(), Error>>,
    },
    ReadAvailable {
        reply: oneshot::Sender<Result<Vec<String>, Error>>,
    },
    State {
        reply: oneshot::Sender<State>,
    },
}

async fn run(mut session: MachineSession, mut requests: mpsc::UnboundedReceiver<Request>) {
    debug!("Machine session started");

    // Replies may go nowhere if the asker gave up, that's fine.
    while let Some(request) = requests.recv().await {
        match request {
            Request::Connect { port, baud, reply } => {
                let _ = reply.send(session.connect(&port, baud));
            }
            Request::Disconnect { reply } => {
                session.disconnect();
                let _ = reply.send(());
            }
            Request::Send { command, reply } => {
                trace!(%command, "Send");
                let _ = reply.send(session.send(&command).await);
            }
            Request::ReadAvailable { reply } => {
                let _ = reply.send(session.read_available().await);
            }
            Request::State { reply } => {
                let _ = reply.send(session.state());
            }
        }
    }

    debug!("Machine session stopped");
}

/// A handle to a running [`MachineSession`].
///
/// Cheap to clone. The session stops, closing any open port,
/// when every handle is gone.
#[derive(Clone)]
pub struct MachineHandle {
    requests: mpsc::UnboundedSender<Request>,
}

/// Joins the task running a [`MachineSession`].
pub struct MachineTask(JoinHandle<()>);

impl MachineHandle {
    /// Spawn a task owning the session.
    pub fn new(session: MachineSession) -> (Self, MachineTask) {
        let (requests, receiver) = mpsc::unbounded_channel();

        let handle = tokio::spawn(run(session, receiver).instrument(Span::current()));

        (Self { requests }, MachineTask(handle))
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Request) -> Result<T, Error> {
        let (tx, rx) = oneshot::channel();

        self.requests
            .send(make(tx))
            .map_err(|_| Error::SessionClosed)?;

        rx.await.map_err(|_| Error::SessionClosed)
    }

    /// See [`MachineSession::connect`].
    pub async fn connect(&self, port: &str, baud: u32) -> Result<(), Error> {
        let port = port.to_owned();
        self.request(|reply| Request::Connect { port, baud, reply })
            .await?
    }

    /// See [`MachineSession::disconnect`].
    pub async fn disconnect(&self) -> Result<(), Error> {
        self.request(|reply| Request::Disconnect { reply }).await
    }

    /// See [`MachineSession::send`].
    pub async fn send(&self, command: &str) -> Result<(), Error> {
        let command = command.to_owned();
        self.request(|reply| Request::Send { command, reply })
            .await?
    }

    /// See [`MachineSession::read_available`].
    pub async fn read_available(&self) -> Result<Vec<String>, Error> {
        self.request(|reply| Request::ReadAvailable { reply })
            .await?
    }

    /// See [`MachineSession::state`].
    pub async fn state(&self) -> Result<State, Error> {
        self.request(|reply| Request::State { reply }).await
    }
}

impl MachineTask {
    /// Wait for the session to stop.
    ///
    /// The session stops once every [`MachineHandle`] has been dropped.
    pub async fn join(self) {
        if let Err(e) = self.0.await {
            warn!("Machine session join error: {e:?}");
        }
    }
}
