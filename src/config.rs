use std::{path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{error::Error, serial::DEFAULT_BAUD};

/// The configuration used for running the server.
///
/// Every field may be omitted from a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Baud rate used when a connect request does not name one.
    pub default_baud: u32,

    /// How long a read waits for a line before deciding there is none.
    /// In milliseconds.
    pub read_timeout_ms: u64,

    /// How long to wait after asking the firmware for status before reading the reply.
    /// In milliseconds.
    pub status_settle_ms: u64,

    /// How long to sleep between status polls.
    /// In milliseconds.
    pub status_interval_ms: u64,

    /// Whether `mock:` ports open simulated firmware.
    pub allow_mocks: bool,

    /// If set, files in this directory are served for paths no route matches.
    pub static_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_baud: DEFAULT_BAUD,
            read_timeout_ms: 100,
            status_settle_ms: 50,
            status_interval_ms: 200,
            allow_mocks: true,
            static_dir: None,
        }
    }
}

impl Config {
    fn ron() -> ron::Options {
        ron::Options::default().with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
    }

    /// Deserialize a .ron file's contents.
    pub fn deserialize(input: &str) -> Result<Self, Error> {
        Self::ron()
            .from_str::<Config>(input)
            .map_err(|e| Error::BadConfig(format!("Could not parse configuration: {e}")))
    }

    /// An example configuration with some fields filled in.
    pub fn example() -> Self {
        Self {
            allow_mocks: false,
            static_dir: Some("frontend".into()),
            ..Default::default()
        }
    }

    /// Serialize the configuration in a "pretty" (i.e. non-compact) fashion.
    pub fn serialize_pretty(&self) -> String {
        Self::ron()
            .to_string_pretty(self, ron::ser::PrettyConfig::default())
            .unwrap_or_else(|e| format!("Could not serialize configuration: {e}"))
    }

    /// Setup a new configuration from a RON file.
    pub fn new_from_path<P: AsRef<Path>>(p: P) -> Result<Self, Error> {
        let path = p.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| Error::BadConfig(format!("Could not read {}: {e}", path.display())))?;

        Self::deserialize(&s)
    }

    /// Bounded wait for a single read.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Wait between a status query and reading its reply.
    pub fn status_settle(&self) -> Duration {
        Duration::from_millis(self.status_settle_ms)
    }

    /// Wait between status polls.
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.default_baud == 0 {
            return Err(Error::BadConfig("The default baud rate must be non-zero".into()));
        }

        for (name, value) in [
            ("read_timeout_ms", self.read_timeout_ms),
            ("status_settle_ms", self.status_settle_ms),
            ("status_interval_ms", self.status_interval_ms),
        ] {
            if value == 0 {
                return Err(Error::BadConfig(format!(
                    "`{name}` must be non-zero, a zero wait would spin on the serial port"
                )));
            }
        }

        if let Some(dir) = &self.static_dir {
            if !dir.is_dir() {
                return Err(Error::BadConfig(format!(
                    "The static directory {} does not exist",
                    dir.display()
                )));
            }
        }

        Ok(())
    }
}
