use clap::{Args, Parser, Subcommand, ValueEnum};
use frame_client::config::DEFAULT_SERVER;
use frame_client::{ClientConfig, ConfigError, ScreenPower};
use std::path::PathBuf;
use std::time::Duration;

use crate::telemetry::{LogConfig, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "frame",
    about = "Monitor and control the photo frame downloader",
    author,
    version
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "FRAME_SERVER",
        default_value = DEFAULT_SERVER,
        help = "Base URL of the frame backend"
    )]
    pub server: String,

    #[arg(
        long = "poll-interval-ms",
        global = true,
        env = "FRAME_POLL_INTERVAL_MS",
        default_value_t = 5_000,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Delay between status polls while logged in"
    )]
    pub poll_interval_ms: u64,

    #[arg(
        long = "request-timeout-secs",
        global = true,
        env = "FRAME_REQUEST_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Per-request timeout for backend calls"
    )]
    pub request_timeout_secs: u64,

    #[command(flatten)]
    pub logging: LoggingArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        Ok(ClientConfig::new(&self.server)?
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))?
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs)))
    }
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        global = true,
        value_enum,
        env = "FRAME_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        global = true,
        value_name = "PATH",
        env = "FRAME_LOG_FILE",
        help = "Write logs to the specified file instead of stderr"
    )]
    pub file: Option<PathBuf>,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Log in and follow download progress interactively (default)
    Watch,
    /// Print the session phase and, when logged in, the current status
    Status,
    /// Switch the frame's screen on or off
    Screen(ScreenArgs),
    /// Delete a fetched photo by its gallery path
    Delete(DeleteArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ScreenArgs {
    #[arg(value_enum)]
    pub power: PowerArg,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct DeleteArgs {
    /// Path exactly as listed in the gallery
    pub path: String,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum PowerArg {
    On,
    Off,
}

impl From<PowerArg> for ScreenPower {
    fn from(value: PowerArg) -> Self {
        match value {
            PowerArg::On => ScreenPower::On,
            PowerArg::Off => ScreenPower::Off,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_is_the_default_command() {
        let cli = Cli::try_parse_from(["frame", "--server", "http://frame.local:5000"]).unwrap();
        assert_eq!(cli.command, None);
        let config = cli.client_config().unwrap();
        assert_eq!(config.server.as_str(), "http://frame.local:5000/");
    }

    #[test]
    fn parses_subcommands_and_global_flags() {
        let cli = Cli::try_parse_from([
            "frame",
            "screen",
            "off",
            "--server",
            "http://frame.local",
            "--poll-interval-ms",
            "250",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Screen(ScreenArgs { power: PowerArg::Off }))
        );
        assert_eq!(cli.logging.level, LogLevel::Debug);
        assert_eq!(
            cli.client_config().unwrap().poll_interval,
            Duration::from_millis(250)
        );

        let cli =
            Cli::try_parse_from(["frame", "--server", "http://frame.local", "delete", "cache/a.jpg"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Delete(DeleteArgs {
                path: "cache/a.jpg".into()
            }))
        );
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let result = Cli::try_parse_from(["frame", "--server", "http://frame.local", "--poll-interval-ms", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_screen_power() {
        assert!(Cli::try_parse_from(["frame", "screen", "dim"]).is_err());
    }
}
