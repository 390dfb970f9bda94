use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tool settings handed to the provisioning session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvisionerSettings {
    /// Name of the device configuration file, next to the executable
    #[serde(default = "default_config_file")]
    pub config_file: String,
    /// Serial link parameters
    #[serde(default)]
    pub serial: SerialSettings,
    /// Device protocol variant
    #[serde(default)]
    pub protocol: ProtocolSettings,
    /// Fixed delays respecting the device's processing rate
    #[serde(default)]
    pub timings: Timings,
}

/// Serial link parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialSettings {
    /// Port used when none is given on the command line
    #[serde(default = "default_port")]
    pub port: String,
    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Read timeout of the opened port in milliseconds
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

/// Protocol variant selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtocolSettings {
    /// Probe for config mode before writing and offer recovery
    #[serde(default = "default_mode_detection")]
    pub mode_detection: bool,
    /// Argument to `/file-remove`; bare command when unset
    #[serde(default)]
    pub remove_path: Option<String>,
    /// Argument to `/file-read`
    #[serde(default = "default_read_path")]
    pub read_path: String,
    /// What `/config-done` does on the device
    #[serde(default)]
    pub finalize: FinalizeBehavior,
}

/// Device behaviour after `/config-done`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FinalizeBehavior {
    /// Device leaves config mode without necessarily rebooting
    #[default]
    ExitConfigMode,
    /// Device reboots
    Reboot,
}

impl std::fmt::Display for FinalizeBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinalizeBehavior::ExitConfigMode => write!(f, "Device will exit config mode"),
            FinalizeBehavior::Reboot => write!(f, "Device will reboot"),
        }
    }
}

/// Protocol delays in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Timings {
    /// After opening the port
    pub settle_ms: u64,
    /// Between `/file-list` and the first read
    pub probe_delay_ms: u64,
    /// Window during which probe responses are collected
    pub probe_window_ms: u64,
    /// After `/file-remove`
    pub remove_delay_ms: u64,
    /// After every `/file-append`
    pub line_delay_ms: u64,
    /// After the closing bracket
    pub closing_delay_ms: u64,
    /// After flushing the written file
    pub flush_delay_ms: u64,
    /// Between `/file-read` and draining its output
    pub read_back_delay_ms: u64,
    /// After `/config-done`
    pub finalize_delay_ms: u64,
    /// Idle time after which a drain stops
    pub drain_idle_ms: u64,
    /// Hard limit on a single drain, however chatty the device
    pub drain_max_ms: u64,
    /// Between `/reset` and reading its acknowledgment
    pub reset_ack_delay_ms: u64,
    /// Time allowed for the device to boot after a reset
    pub reboot_wait_ms: u64,
    /// Width of each DTR/RTS pulse during a hardware reset
    pub control_pulse_ms: u64,
    /// After a successful reset, before re-probing
    pub post_reset_delay_ms: u64,
    /// Operator-requested wait before re-probing
    pub retry_wait_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle_ms: 1000,
            probe_delay_ms: 500,
            probe_window_ms: 3000,
            remove_delay_ms: 500,
            line_delay_ms: 100,
            closing_delay_ms: 200,
            flush_delay_ms: 500,
            read_back_delay_ms: 1000,
            finalize_delay_ms: 500,
            drain_idle_ms: 250,
            drain_max_ms: 5000,
            reset_ack_delay_ms: 300,
            reboot_wait_ms: 2500,
            control_pulse_ms: 100,
            post_reset_delay_ms: 1000,
            retry_wait_ms: 10_000,
        }
    }
}

/// Millisecond setting as a `Duration`
pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

// Default value functions
fn default_config_file() -> String {
    "config_local.json".to_string()
}

fn default_port() -> String {
    if cfg!(target_os = "macos") {
        "/dev/cu.usbmodem101".to_string()
    } else if cfg!(windows) {
        "COM3".to_string()
    } else {
        "/dev/ttyACM0".to_string()
    }
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_read_timeout() -> u64 {
    2000
}

fn default_mode_detection() -> bool {
    true
}

fn default_read_path() -> String {
    "/elements.json".to_string()
}

impl Default for ProvisionerSettings {
    fn default() -> Self {
        Self {
            config_file: default_config_file(),
            serial: SerialSettings::default(),
            protocol: ProtocolSettings::default(),
            timings: Timings::default(),
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout(),
        }
    }
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            mode_detection: default_mode_detection(),
            remove_path: None,
            read_path: default_read_path(),
            finalize: FinalizeBehavior::default(),
        }
    }
}
