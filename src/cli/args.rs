use crate::domain::settings::{FinalizeBehavior, ProvisionerSettings};
use clap::Parser;
use std::path::PathBuf;

/// Command line arguments for bitswitch-config
#[derive(Parser, Debug)]
#[command(
    name = "bitswitch-config",
    version = env!("CARGO_PKG_VERSION"),
    about = "Write a JSON configuration to a bitcoinSwitch device over serial",
    long_about = "Loads config_local.json, validates it, and writes it to a bitcoinSwitch device in config mode using the serial file commands. A template is created on first run."
)]
pub struct Args {
    /// Serial port path (defaults to the settings value)
    pub port: Option<String>,

    /// Device configuration file (defaults to config_local.json next to the executable)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Tool settings file (TOML)
    #[arg(short, long)]
    pub settings: Option<PathBuf>,

    /// Write without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Baud rate
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Skip config-mode detection and the recovery menu
    #[arg(long)]
    pub no_mode_check: bool,

    /// File argument for /file-remove (bare command when omitted)
    #[arg(long)]
    pub remove_path: Option<String>,

    /// File argument for /file-read
    #[arg(long)]
    pub read_path: Option<String>,

    /// The device reboots on /config-done instead of leaving config mode
    #[arg(long)]
    pub reboot: bool,

    /// List available serial ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress logging
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Override loaded settings with the flags given on the command line
    pub fn apply_to(&self, settings: &mut ProvisionerSettings) {
        if let Some(port) = &self.port {
            settings.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            settings.serial.baud_rate = baud;
        }
        if self.no_mode_check {
            settings.protocol.mode_detection = false;
        }
        if let Some(path) = &self.remove_path {
            settings.protocol.remove_path = Some(path.clone());
        }
        if let Some(path) = &self.read_path {
            settings.protocol.read_path = path.clone();
        }
        if self.reboot {
            settings.protocol.finalize = FinalizeBehavior::Reboot;
        }
    }
}
