use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;

use crate::{
    actions::{Action, Response},
    config::Config,
    server::DEFAULT_PORT,
};

/// The command line interface for grbl keel.
#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a configuration file
    pub config: Option<PathBuf>,

    /// The port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Log level of output to stdout
    #[arg(long, default_value_t = Level::INFO)]
    pub log_level: Level,

    /// If given, also log to a daily rolling file in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Commands available in the command line interface.
#[derive(Subcommand)]
pub enum Commands {
    /// Examples for user convenience.
    #[clap(subcommand)]
    Examples(Examples),
}

/// Helpful examples for users.
#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Examples {
    /// Show an example of a configuration file's contents.
    Config,

    /// Show an example JSON request of connecting to a machine.
    Connect,

    /// Show an example JSON request of sending G-code.
    Gcode,

    /// Show an example JSON message (from server to user) of a position update.
    Position,

    /// Show an example JSON response to listing ports.
    Ports,
}

impl Examples {
    /// The text shown for this example.
    pub fn render(self) -> String {
        match self {
            Examples::Config => Config::example().serialize_pretty(),
            Examples::Connect => Action::example_connect().serialize(),
            Examples::Gcode => Action::example_gcode().serialize(),
            Examples::Position => Response::example_position().serialize(),
            Examples::Ports => Response::example_ports().serialize(),
        }
    }
}

/// Carry out a subcommand.
pub fn handle_command(command: Commands) {
    match command {
        Commands::Examples(example) => println!("{}", example.render()),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["grbl-keel"]).unwrap();

        assert_eq!(cli.port, 8000);
        assert_eq!(cli.log_level, Level::INFO);
        assert!(cli.config.is_none());
        assert!(cli.log_dir.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn options() {
        let cli = Cli::try_parse_from([
            "grbl-keel",
            "my-config.ron",
            "--port",
            "9000",
            "--log-level",
            "debug",
            "--log-dir",
            "logs",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("my-config.ron")));
        assert_eq!(cli.port, 9000);
        assert_eq!(cli.log_level, Level::DEBUG);
        assert_eq!(cli.log_dir, Some(PathBuf::from("logs")));
    }

    #[test]
    fn examples_subcommand() {
        let cli = Cli::try_parse_from(["grbl-keel", "examples", "position"]).unwrap();

        assert!(matches!(
            cli.command,
            Some(Commands::Examples(Examples::Position))
        ));
    }

    #[test]
    fn examples_are_valid() {
        let config = Config::deserialize(&Examples::Config.render()).unwrap();
        assert_eq!(config, Config::example());

        let connect: Action = serde_json::from_str(&Examples::Connect.render()).unwrap();
        assert_eq!(connect, Action::example_connect());

        let position: Response = serde_json::from_str(&Examples::Position.render()).unwrap();
        assert_eq!(position, Response::example_position());
    }
}
