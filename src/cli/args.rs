use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Command line arguments for FluidCom
#[derive(Parser, Debug)]
#[command(
    name = "fluidcom",
    version = env!("CARGO_PKG_VERSION"),
    about = "Command/reply control for Runze syringe pumps and rotary valves",
    long_about = "Talks the Runze binary protocol over a serial port: probes baud rates, sends common and factory commands, and drives configured pumps and valves."
)]
pub struct Args {
    /// Enable verbose logging (includes frame dumps)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List available serial ports
    Ports,
    /// Find the baud rate a device answers at
    Probe {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Send one command frame and print the reply
    Send(SendArgs),
    /// Send a pre-encoded frame
    Raw(RawArgs),
    /// Operate a device from the configuration
    Device(DeviceArgs),
    /// Configuration management commands
    Config(ConfigArgs),
    /// Display version information
    Version,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
}

/// Port and address of an unconfigured device
#[derive(ClapArgs, Debug, Clone)]
pub struct TargetArgs {
    /// Serial port path
    #[arg(short, long)]
    pub port: String,

    /// Baud rate; every standard rate is probed when omitted
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Device address (decimal or 0x-prefixed hex)
    #[arg(short, long, default_value = "0x31", value_parser = parse_byte)]
    pub address: u8,
}

/// Send arguments
#[derive(ClapArgs, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Command code (decimal or 0x-prefixed hex)
    #[arg(value_parser = parse_byte)]
    pub code: u8,

    /// Command parameter
    #[arg(default_value = "0")]
    pub param: u32,

    /// Send as a factory command
    #[arg(long)]
    pub factory: bool,

    /// Return as soon as the frame is written
    #[arg(long)]
    pub no_wait: bool,
}

/// Raw frame arguments
#[derive(ClapArgs, Debug)]
pub struct RawArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Frame bytes
    pub data: String,

    /// Data format (hex, base64)
    #[arg(short, long, value_enum, default_value = "hex")]
    pub format: DataFormat,

    /// Return as soon as the frame is written
    #[arg(long)]
    pub no_wait: bool,
}

/// Device arguments
#[derive(ClapArgs, Debug)]
pub struct DeviceArgs {
    /// Device name from the configuration
    pub name: String,

    /// Device subcommand
    #[command(subcommand)]
    pub command: DeviceCommand,
}

/// Device subcommands
#[derive(Subcommand, Debug)]
pub enum DeviceCommand {
    /// Query address, baud rates, firmware and motor status
    Info,
    /// Stop any motion
    Halt,
    /// Home the plunger, or the valve on a rotary valve
    Home {
        /// Drive to the end of travel first
        #[arg(long)]
        forced: bool,
    },
    /// Move the plunger to an absolute step position
    Move {
        steps: u16,
        /// Return as soon as the command is sent
        #[arg(long)]
        no_wait: bool,
    },
    /// Turn the valve to a port
    Port {
        port: u16,
        /// Return as soon as the command is sent
        #[arg(long)]
        no_wait: bool,
    },
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Validate configuration
    Validate {
        /// Configuration file path
        file: Option<String>,
    },
    /// Create default configuration
    Init {
        /// Directory to create `.fluidcom/config.toml` in
        #[arg(short, long)]
        dir: Option<String>,
        /// Global configuration
        #[arg(short, long)]
        global: bool,
    },
    /// List device configurations
    Devices,
}

/// Data format argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DataFormat {
    Hex,
    Base64,
}

/// Parse `49`, `0x31` or `0X31` as a byte.
pub fn parse_byte(value: &str) -> Result<u8, String> {
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse::<u8>(),
    };
    parsed.map_err(|e| format!("'{}' is not a byte: {}", value, e))
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataFormat::Hex => write!(f, "hex"),
            DataFormat::Base64 => write!(f, "base64"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_byte() {
        assert_eq!(parse_byte("0x4E"), Ok(0x4E));
        assert_eq!(parse_byte("49"), Ok(49));
        assert!(parse_byte("0x100").is_err());
        assert!(parse_byte("pump").is_err());
    }

    #[test]
    fn test_send_args_parse() {
        let args = Args::try_parse_from([
            "fluidcom", "send", "-p", "/dev/ttyUSB0", "0x4E", "3000", "--no-wait",
        ])
        .unwrap();
        match args.command {
            Command::Send(send) => {
                assert_eq!(send.code, 0x4E);
                assert_eq!(send.param, 3000);
                assert!(send.no_wait);
                assert_eq!(send.target.address, 0x31);
                assert_eq!(send.target.baud, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
