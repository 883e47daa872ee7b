use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{
    actions::{Action, Response},
    config::Config,
    error::Error,
    poller::StatusPoller,
    serial::{Connector, PortDescriptor},
    session::{MachineHandle, MachineSession, MachineTask},
};

/// Everything one connected client owns:
/// a machine session, and the poller reporting on it.
pub(crate) struct Peer {
    machine: MachineHandle,
    machine_task: MachineTask,

    // Polls the machine, sending what it finds to the client
    poller: JoinHandle<()>,

    // For listing ports
    connector: Arc<dyn Connector>,

    default_baud: u32,
}

impl Peer {
    pub(crate) fn new(
        connector: Arc<dyn Connector>,
        config: &Config,
        sender: mpsc::UnboundedSender<Response>,
    ) -> Self {
        let (machine, machine_task) = MachineHandle::new(MachineSession::new(connector.clone()));

        let poller = tokio::spawn(
            StatusPoller::new(machine.clone(), sender, config)
                .run()
                .instrument(info_span!("Poller")),
        );

        Self {
            machine,
            machine_task,
            poller,
            connector,
            default_baud: config.default_baud,
        }
    }

    async fn connect(&self, port: String, baud: Option<u32>) -> Response {
        if port.is_empty() {
            return Response::error(&Error::NoPortSpecified);
        }

        let baud = baud.unwrap_or(self.default_baud);

        match self.machine.connect(&port, baud).await {
            Ok(()) => Response::connected(&port),
            Err(e) => Response::error(&e),
        }
    }

    async fn disconnect(&self) -> Response {
        match self.machine.disconnect().await {
            Ok(()) => Response::Disconnected,
            Err(e) => Response::error(&e),
        }
    }

    async fn gcode(&self, data: String) -> Option<Response> {
        match self.machine.send(&data).await {
            Ok(()) => None,
            Err(e) => Some(Response::error(&e)),
        }
    }

    async fn list_ports(&self) -> Response {
        let connector = self.connector.clone();

        let ports: Vec<PortDescriptor> =
            match tokio::task::spawn_blocking(move || connector.list_ports()).await {
                Ok(ports) => ports,
                Err(e) => {
                    warn!(?e, "Listing ports failed");
                    vec![]
                }
            };

        Response::Ports { ports }
    }

    /// Carry out what the client asked for.
    ///
    /// Sending G-code gets no reply unless it fails.
    pub(crate) async fn do_user_action(&self, action: Action) -> Option<Response> {
        info!("client requested action: {action}");

        match action {
            Action::Connect { port, baud } => Some(self.connect(port, baud).await),
            Action::Disconnect => Some(self.disconnect().await),
            Action::Gcode { data } => self.gcode(data).await,
            Action::ListPorts => Some(self.list_ports().await),
        }
    }

    /// Stop polling and release the port.
    pub(crate) async fn shutdown(self) {
        debug!("Shutting down");

        self.poller.abort();
        if let Err(e) = self.poller.await {
            if !e.is_cancelled() {
                warn!("Poller join error: {e:?}");
            }
        }

        if let Err(e) = self.machine.disconnect().await {
            debug!(%e, "Machine session already gone");
        }

        drop(self.machine);
        self.machine_task.join().await;

        debug!("Shutdown complete");
    }
}
