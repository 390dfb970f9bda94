// bitswitch-config - Serial provisioning tool for bitcoinSwitch devices
use anyhow::Context;
use bitswitch_config::cli::{execute_command, report_failure, Args, ConsoleWriter};
use bitswitch_config::infrastructure::logging::{init_logging, Verbosity};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(Verbosity::from_flags(args.verbose, args.quiet))
        .context("Failed to set up logging")?;

    if let Err(e) = execute_command(args).await {
        report_failure(&ConsoleWriter::new(), &e);
        std::process::exit(1);
    }

    Ok(())
}
