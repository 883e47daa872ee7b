use std::fmt::Display;

/// What a single line from the firmware means.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// A status report carrying the machine position.
    Position {
        /// Machine X.
        x: f64,

        /// Machine Y.
        y: f64,
    },

    /// The firmware reported an error, e.g. `error:9`.
    Error(String),

    /// Anything else, forwarded verbatim.
    StatusText(String),

    /// The firmware accepted a command (`ok`).
    Ack,
}

impl Display for StatusEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusEvent::Position { x, y } => write!(f, "position: ({x}, {y})"),
            StatusEvent::Error(text) => write!(f, "error: {text}"),
            StatusEvent::StatusText(text) => write!(f, "status: {text}"),
            StatusEvent::Ack => write!(f, "ack"),
        }
    }
}

const MACHINE_POSITION: &str = "MPos:";

/// Pull X and Y out of a report such as `<Idle|MPos:1.000,2.000,0.000|FS:0,0>`.
fn machine_position(line: &str) -> Option<(f64, f64)> {
    let (_, after) = line.split_once(MACHINE_POSITION)?;

    let field = after.split('|').next()?;

    let mut coordinates = field.split(',');
    let x = coordinates.next()?.trim().parse().ok()?;
    let y = coordinates.next()?.trim().parse().ok()?;

    Some((x, y))
}

/// Turn one trimmed line from the firmware into a [`StatusEvent`].
pub fn parse_line(line: &str) -> StatusEvent {
    if line.starts_with('<') && line.contains(MACHINE_POSITION) {
        return match machine_position(line) {
            Some((x, y)) => StatusEvent::Position { x, y },
            None => StatusEvent::StatusText(line.to_owned()),
        };
    }

    if line == "ok" {
        StatusEvent::Ack
    } else if line.starts_with("error") {
        StatusEvent::Error(line.to_owned())
    } else {
        StatusEvent::StatusText(line.to_owned())
    }
}
