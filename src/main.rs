// FluidCom - Runze pump and valve control
use clap::Parser;
use fluidcom::cli::args::Args;
use fluidcom::cli::commands::execute_command;
use fluidcom::domain::error::ErrorCategory;
use fluidcom::FluidComError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Err(e) = execute_command(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(exit_code(&e));
    }
    Ok(())
}

/// Distinct exit status per error category, for scripts.
fn exit_code(error: &FluidComError) -> i32 {
    match error.category() {
        ErrorCategory::Usage => 2,
        ErrorCategory::LinkFailure => 3,
        ErrorCategory::ProtocolViolation => 4,
        ErrorCategory::DeviceRejected => 5,
        ErrorCategory::DeviceBusy => 6,
    }
}
