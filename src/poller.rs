use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::{
    actions::Response,
    config::Config,
    error::Error,
    session::MachineHandle,
    status::{self, StatusEvent},
};

/// The realtime command asking for a status report.
pub const STATUS_QUERY: &str = "?";

/// Periodically queries the machine and forwards what it says.
pub struct StatusPoller {
    machine: MachineHandle,
    events: mpsc::UnboundedSender<Response>,
    settle: Duration,
    interval: Duration,
}

impl StatusPoller {
    /// A poller for the given machine, sending events to `events`.
    pub fn new(
        machine: MachineHandle,
        events: mpsc::UnboundedSender<Response>,
        config: &Config,
    ) -> Self {
        Self {
            machine,
            events,
            settle: config.status_settle(),
            interval: config.status_interval(),
        }
    }

    /// Poll until the event receiver or the machine session goes away.
    pub async fn run(self) {
        debug!("Status poller started");

        loop {
            match self.poll_once().await {
                Ok(()) => {}
                Err(Error::SessionClosed) => break,
                Err(e) => {
                    if self.forward(Response::error(&e)).is_err() {
                        break;
                    }
                }
            }

            if self.events.is_closed() {
                break;
            }

            tokio::time::sleep(self.interval).await;
        }

        debug!("Status poller stopped");
    }

    fn forward(&self, response: Response) -> Result<(), Error> {
        self.events
            .send(response)
            .map_err(|_| Error::SessionClosed)
    }

    /// Query the machine once, if connected, and forward everything it has sent.
    async fn poll_once(&self) -> Result<(), Error> {
        match self.machine.send(STATUS_QUERY).await {
            Ok(()) => {}
            Err(Error::NotConnected) => {
                trace!("Not connected, skipping status query");
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        tokio::time::sleep(self.settle).await;

        let lines = match self.machine.read_available().await {
            Ok(lines) => lines,
            // Disconnected while we were waiting.
            Err(Error::NotConnected) => return Ok(()),
            Err(e) => return Err(e),
        };

        for line in lines {
            match Response::try_from(status::parse_line(&line)) {
                Ok(response) => {
                    trace!(%response, "Status");
                    self.forward(response)?;
                }
                Err(StatusEvent::Ack) => trace!("Ack"),
                Err(other) => debug!(%other, "Not forwarded"),
            }
        }

        Ok(())
    }
}
