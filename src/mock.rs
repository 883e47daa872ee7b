use std::collections::VecDeque;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::serial::{error::SerialPortError, PortDescriptor, Transport};

/// Ports with this prefix are simulated.
pub const MOCK_PREFIX: &str = "mock:";

/// Greeting printed by the firmware when it resets.
pub(crate) const BANNER: &str = "Grbl 1.1h ['$' for help]";

/// Whether the port name refers to a simulated machine.
pub fn is_mock_port(port: &str) -> bool {
    port.starts_with(MOCK_PREFIX)
}

/// How the simulated machine shows up in port listings.
pub fn descriptor() -> PortDescriptor {
    PortDescriptor {
        device: format!("{MOCK_PREFIX}grbl"),
        description: "Simulated GRBL controller".into(),
        hwid: "MOCK".into(),
    }
}

#[derive(Debug, Default)]
struct Firmware {
    x: f64,
    y: f64,
    relative: bool,
}

/// Split a block such as `G0X1.5 Y-2` into its letter/value words.
fn words(block: &str) -> Option<Vec<(char, f64)>> {
    let mut words = vec![];
    let mut chars = block.chars().filter(|c| !c.is_whitespace()).peekable();

    while let Some(letter) = chars.next() {
        if !letter.is_ascii_alphabetic() {
            return None;
        }

        let mut value = String::new();
        while let Some(c) = chars.next_if(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+')) {
            value.push(c);
        }

        words.push((letter.to_ascii_uppercase(), value.parse().ok()?));
    }

    Some(words)
}

impl Firmware {
    fn report(&self) -> String {
        format!("<Idle|MPos:{:.3},{:.3},0.000|FS:0,0>", self.x, self.y)
    }

    fn settings(&mut self, block: &str) -> Vec<String> {
        match block.to_ascii_uppercase().as_str() {
            "$H" => {
                self.x = 0.0;
                self.y = 0.0;
            }
            "$I" => return vec!["[VER:1.1h.mock]".into(), "ok".into()],
            _ => {}
        }

        vec!["ok".into()]
    }

    fn execute(&mut self, block: &str) -> Vec<String> {
        let Some(words) = words(block) else {
            return vec!["error:2".into()];
        };

        let mut set_position = false;
        let (mut x, mut y) = (None, None);

        for (letter, value) in words {
            match (letter, value as u32) {
                ('G', 90) => self.relative = false,
                ('G', 91) => self.relative = true,
                ('G', 92) => set_position = true,
                ('X', _) => x = Some(value),
                ('Y', _) => y = Some(value),
                _ => {}
            }
        }

        if set_position {
            self.x = x.unwrap_or(self.x);
            self.y = y.unwrap_or(self.y);
        } else if self.relative {
            self.x += x.unwrap_or(0.0);
            self.y += y.unwrap_or(0.0);
        } else {
            self.x = x.unwrap_or(self.x);
            self.y = y.unwrap_or(self.y);
        }

        vec!["ok".into()]
    }

    /// What the firmware prints in response to a line.
    fn respond(&mut self, line: &str) -> Vec<String> {
        // Comments run to the end of the line.
        let block = line.split(';').next().unwrap_or_default().trim();

        match block {
            "?" => vec![self.report()],
            // Realtime commands: feed hold, resume, soft reset.
            "!" | "~" | "\u{18}" => vec![],
            "" => vec!["ok".into()],
            _ if block.starts_with('$') => self.settings(block),
            _ if block.starts_with(|c: char| "GMFSXYZgmfsxyz".contains(c)) => self.execute(block),
            _ => vec!["error:1".into()],
        }
    }
}

/// A [`Transport`] backed by simulated firmware.
///
/// Every instance starts from a freshly reset machine at the origin.
#[derive(Debug)]
pub struct MockTransport {
    name: String,
    firmware: Firmware,
    outbox: VecDeque<String>,
    open: bool,
}

impl MockTransport {
    /// Open a simulated machine.
    pub fn new(name: &str) -> Self {
        debug!(%name, "Running mock");

        Self {
            name: name.into(),
            firmware: Firmware::default(),
            outbox: VecDeque::from([BANNER.to_owned()]),
            open: true,
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn write_line(&mut self, line: &str) -> Result<(), SerialPortError> {
        if !self.open {
            return Err(SerialPortError::NotOpen);
        }

        let responses = self.firmware.respond(line);
        trace!(%line, ?responses, "Mock firmware");
        self.outbox.extend(responses);

        Ok(())
    }

    async fn try_read_line(&mut self) -> Result<Option<String>, SerialPortError> {
        if !self.open {
            return Ok(None);
        }

        Ok(self.outbox.pop_front())
    }

    fn close(&mut self) {
        self.open = false;
        self.outbox.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn exchange(transport: &mut MockTransport, line: &str) -> Vec<String> {
        transport.write_line(line).await.unwrap();

        let mut lines = vec![];
        while let Some(line) = transport.try_read_line().await.unwrap() {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn greets_on_open() {
        let mut mock = MockTransport::new("mock:grbl");

        assert_eq!(mock.try_read_line().await.unwrap(), Some(BANNER.into()));
        assert_eq!(mock.try_read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn status_query_reports_position() {
        let mut mock = MockTransport::new("mock:grbl");
        exchange(&mut mock, "").await;

        assert_eq!(
            exchange(&mut mock, "?").await,
            vec!["<Idle|MPos:0.000,0.000,0.000|FS:0,0>"]
        );
    }

    #[tokio::test]
    async fn moves_absolute_and_relative() {
        let mut mock = MockTransport::new("mock:grbl");

        assert_eq!(
            exchange(&mut mock, "G90 G0 X10 Y-2.5 F3000").await,
            vec![BANNER, "ok"]
        );
        assert_eq!(
            exchange(&mut mock, "?").await,
            vec!["<Idle|MPos:10.000,-2.500,0.000|FS:0,0>"]
        );

        exchange(&mut mock, "G91 G1X1Y1").await;
        assert_eq!(
            exchange(&mut mock, "?").await,
            vec!["<Idle|MPos:11.000,-1.500,0.000|FS:0,0>"]
        );
    }

    #[tokio::test]
    async fn set_position_and_home() {
        let mut mock = MockTransport::new("mock:grbl");

        exchange(&mut mock, "G92 X5 Y6").await;
        assert_eq!(
            exchange(&mut mock, "?").await,
            vec!["<Idle|MPos:5.000,6.000,0.000|FS:0,0>"]
        );

        assert_eq!(exchange(&mut mock, "$H").await, vec!["ok"]);
        assert_eq!(
            exchange(&mut mock, "?").await,
            vec!["<Idle|MPos:0.000,0.000,0.000|FS:0,0>"]
        );
    }

    #[tokio::test]
    async fn errors_and_realtime() {
        let mut mock = MockTransport::new("mock:grbl");
        exchange(&mut mock, "").await;

        assert_eq!(exchange(&mut mock, "hello").await, vec!["error:1"]);
        assert_eq!(exchange(&mut mock, "G0 X1..2").await, vec!["error:2"]);
        assert_eq!(exchange(&mut mock, "!").await, Vec::<String>::new());
        assert_eq!(exchange(&mut mock, "$I").await, vec!["[VER:1.1h.mock]", "ok"]);
    }

    #[tokio::test]
    async fn closed_mock_is_silent() {
        let mut mock = MockTransport::new("mock:grbl");
        mock.close();

        assert!(!mock.is_open());
        assert_eq!(mock.try_read_line().await.unwrap(), None);
        assert!(matches!(
            mock.write_line("?").await,
            Err(SerialPortError::NotOpen)
        ));
    }

    #[test]
    fn mock_ports() {
        assert!(is_mock_port("mock:anything"));
        assert!(!is_mock_port("/dev/ttyUSB0"));
        assert!(is_mock_port(&descriptor().device));
    }
}
