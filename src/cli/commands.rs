use crate::cli::args::{
    Args, Command, ConfigCommand, DataFormat, DeviceArgs, DeviceCommand, RawArgs, SendArgs,
    TargetArgs,
};
use crate::cli::output::{ConnectionSummary, ConsoleWriter, OutputWriter};
use crate::core::clock::SystemClock;
use crate::core::connect::{connect, ConnectOptions};
use crate::core::device::{Device, DeviceInfo};
use crate::core::protocol::{Address, DeviceFamily, Reply};
use crate::core::session::{SharedSession, Timeouts};
use crate::domain::config::{DeviceConfig, FluidComConfig};
use crate::domain::error::{FluidComError, FluidComResult};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::serial::{list_ports, SerialOpener};
use std::sync::Arc;
use tracing::info;

/// Execute CLI command
pub async fn execute_command(args: Args) -> FluidComResult<()> {
    let writer = ConsoleWriter::new(args.output);

    // Load configuration using ConfigManager
    let config_manager = ConfigManager::new()?;
    let config = if let Some(config_path) = &args.config {
        let config = config_manager.load_config_from_path(config_path.as_ref())?;
        config.validate()?;
        config
    } else {
        config_manager.load_config()?
    };

    if !args.quiet {
        init_logging(&config.global.log_level, args.verbose)?;
    }

    let timeouts = config.global.timeouts();

    match args.command {
        Command::Ports => {
            let ports = list_ports()?;
            writer.write_ports(&ports)?;
            Ok(())
        }
        Command::Probe { target } => {
            let shared = open_session(&target, timeouts).await?;
            let summary = shared.run(|s| Ok(ConnectionSummary::from(&*s))).await?;
            writer.write_connection(&summary)?;
            Ok(())
        }
        Command::Send(send_args) => execute_send_command(send_args, &writer, timeouts).await,
        Command::Raw(raw_args) => execute_raw_command(raw_args, &writer, timeouts).await,
        Command::Device(device_args) => {
            execute_device_command(device_args, &writer, &config, timeouts).await
        }
        Command::Config(config_args) => {
            execute_config_command(config_args.command, &writer, &config, &config_manager)
        }
        Command::Version => {
            writer.write_message(&format!("fluidcom {}", env!("CARGO_PKG_VERSION")))?;
            Ok(())
        }
    }
}

async fn open_session(target: &TargetArgs, timeouts: Timeouts) -> FluidComResult<SharedSession> {
    let mut options = ConnectOptions::new(target.port.clone(), Address::new(target.address)?)
        .with_timeouts(timeouts);
    if let Some(baud) = target.baud {
        options = options.with_baud_rate(baud);
    }
    SharedSession::connect(SerialOpener, Arc::new(SystemClock), options).await
}

fn write_outcome(writer: &ConsoleWriter, reply: Option<Reply>) -> FluidComResult<()> {
    match reply {
        Some(reply) => writer.write_reply(&reply)?,
        None => writer.write_message("Command sent; not waiting for the reply")?,
    }
    Ok(())
}

async fn execute_send_command(
    args: SendArgs,
    writer: &ConsoleWriter,
    timeouts: Timeouts,
) -> FluidComResult<()> {
    let wait = !args.no_wait;
    let shared = open_session(&args.target, timeouts).await?;

    let reply = if args.factory {
        shared.send_factory(args.code, args.param, wait, false).await?
    } else {
        let param = u16::try_from(args.param).map_err(|_| {
            FluidComError::InvalidParameter(format!(
                "Common command parameter {} does not fit in 16 bits",
                args.param
            ))
        })?;
        shared.send_common(args.code, param, wait, false).await?
    };

    write_outcome(writer, reply)
}

async fn execute_raw_command(
    args: RawArgs,
    writer: &ConsoleWriter,
    timeouts: Timeouts,
) -> FluidComResult<()> {
    let frame = parse_data(&args.data, args.format)?;
    let wait = !args.no_wait;
    let shared = open_session(&args.target, timeouts).await?;

    info!("Sending raw frame ({} bytes)", frame.len());
    let reply = shared
        .run(move |s| s.send_frame(&frame, wait, false))
        .await?;
    write_outcome(writer, reply)
}

enum DeviceOutcome {
    Info(DeviceInfo),
    Reply(Option<Reply>),
}

async fn execute_device_command(
    args: DeviceArgs,
    writer: &ConsoleWriter,
    config: &FluidComConfig,
    timeouts: Timeouts,
) -> FluidComResult<()> {
    let device_config = config.device(&args.name)?.clone();
    let command = args.command;

    let outcome = tokio::task::spawn_blocking(move || -> FluidComResult<DeviceOutcome> {
        let mut device = open_device(&device_config, timeouts)?;
        run_device_command(&mut device, command)
    })
    .await
    .map_err(|e| FluidComError::Session {
        message: format!("Device task failed: {}", e),
    })??;

    match outcome {
        DeviceOutcome::Info(info) => writer.write_device_info(&info)?,
        DeviceOutcome::Reply(reply) => write_outcome(writer, reply)?,
    }
    Ok(())
}

fn open_device(device_config: &DeviceConfig, timeouts: Timeouts) -> FluidComResult<Device> {
    let mut options = ConnectOptions::new(device_config.port.clone(), device_config.address()?)
        .with_timeouts(timeouts);
    if let Some(baud) = device_config.baud_rate {
        options = options.with_baud_rate(baud);
    }

    let session = connect(&mut SerialOpener, Arc::new(SystemClock), &options)?;
    info!(
        "Connected to '{}' ({}) at {} baud",
        device_config.name,
        device_config.family,
        session.baud_rate()
    );
    Ok(Device::new(session, device_config.family, device_config.options()))
}

fn run_device_command(device: &mut Device, command: DeviceCommand) -> FluidComResult<DeviceOutcome> {
    let reply = match command {
        DeviceCommand::Info => return device.info().map(DeviceOutcome::Info),
        DeviceCommand::Halt => Some(device.halt()?),
        DeviceCommand::Home { forced } => match (device.family(), forced) {
            (DeviceFamily::RotaryValve, _) => device.valve()?.reset(true)?,
            (_, true) => device.plunger()?.forced_home(true)?,
            (_, false) => device.plunger()?.home(true)?,
        },
        DeviceCommand::Move { steps, no_wait } => device.plunger()?.move_to(steps, !no_wait)?,
        DeviceCommand::Port { port, no_wait } => device.valve()?.move_to_port(port, !no_wait)?,
    };
    Ok(DeviceOutcome::Reply(reply))
}

fn execute_config_command(
    command: ConfigCommand,
    writer: &ConsoleWriter,
    config: &FluidComConfig,
    config_manager: &ConfigManager,
) -> FluidComResult<()> {
    match command {
        ConfigCommand::Show => {
            writer.write_config(config)?;
            Ok(())
        }
        ConfigCommand::Validate { file } => {
            let result = match &file {
                Some(config_path) => config_manager
                    .load_config_from_path(config_path.as_ref())
                    .and_then(|c| c.validate()),
                None => config_manager.load_config().map(|_| ()),
            };
            match (result, file) {
                (Ok(()), Some(path)) => {
                    writer.write_message(&format!("Configuration file '{}' is valid", path))?
                }
                (Ok(()), None) => writer.write_message("Current configuration is valid")?,
                (Err(e), _) => {
                    return Err(FluidComError::Config {
                        message: format!("Configuration validation failed: {}", e),
                    })
                }
            }
            Ok(())
        }
        ConfigCommand::Init { dir, global } => {
            if global {
                let global_path = config_manager.get_global_config_path_ref();
                if let Some(parent) = global_path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| FluidComError::Config {
                        message: format!("Failed to create config directory: {}", e),
                    })?;
                }
                config_manager.save_config_to_path(global_path, &FluidComConfig::default())?;
                writer.write_message(&format!(
                    "Global configuration initialized at '{}'",
                    global_path.display()
                ))?;
            } else {
                let base = match dir {
                    Some(dir) => dir.into(),
                    None => std::env::current_dir().map_err(|e| FluidComError::Config {
                        message: format!("Failed to get current directory: {}", e),
                    })?,
                };
                let path = config_manager.init_project_config(&base)?;
                writer.write_message(&format!(
                    "Project configuration initialized at '{}'",
                    path.display()
                ))?;
            }
            Ok(())
        }
        ConfigCommand::Devices => {
            writer.write_devices(&config.devices)?;
            Ok(())
        }
    }
}

fn parse_data(data: &str, format: DataFormat) -> FluidComResult<Vec<u8>> {
    match format {
        DataFormat::Hex => {
            let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
            hex::decode(&cleaned)
                .map_err(|e| FluidComError::InvalidInput(format!("Invalid hex data: {}", e)))
        }
        DataFormat::Base64 => {
            use base64::Engine;
            base64::engine::general_purpose::STANDARD
                .decode(data.trim())
                .map_err(|e| FluidComError::InvalidInput(format!("Invalid base64 data: {}", e)))
        }
    }
}
