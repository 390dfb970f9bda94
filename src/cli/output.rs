use crate::core::communication::Verification;
use crate::core::session::{ResetMethod, SessionEvent};
use crate::domain::config::{keys, ConfigRecord, PLACEHOLDER_SSID};
use crate::domain::validation::ValidationReport;
use std::path::Path;
use tabled::{Table, Tabled};

/// Shown whenever the device is found outside config mode
const RECOVERY_MENU: &str = "
Device is not in config mode!

To enter config mode:
  - Device auto-enters if no valid config exists
  - OR power cycle and look for BLUE FAST BLINK LED
  - OR send reset command (option 't' below)

Options:
  [r] Retry detection (if config mode is now active)
  [t] Trigger reset to enter config mode
  [w] Wait 10 seconds and retry
  [q] Quit
";

/// Endpoints longer than this are shortened in the summary
const ENDPOINT_DISPLAY_LIMIT: usize = 60;

/// Human-readable view of a configuration before it is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSummary {
    pub wifi: String,
    pub endpoint: String,
    pub telegram_enabled: bool,
    pub device_name: String,
    pub static_ip: Option<String>,
    pub serial_port: String,
}

impl ConfigSummary {
    pub fn from_record(record: &ConfigRecord, serial_port: &str) -> Self {
        let ssid = record.get(keys::SSID);
        let wifi = if ssid.is_empty() || ssid == PLACEHOLDER_SSID {
            "(disabled - Ethernet only)".to_string()
        } else {
            ssid
        };

        let device_name = record.get(keys::DEVICE_NAME);
        let static_ip = record.get(keys::STATIC_IP);

        Self {
            wifi,
            endpoint: shorten(&record.get(keys::DEVICE_STRING), ENDPOINT_DISPLAY_LIMIT),
            telegram_enabled: !record.get(keys::TELEGRAM_BOT_TOKEN).is_empty(),
            device_name: if device_name.is_empty() {
                "Not set".to_string()
            } else {
                device_name
            },
            static_ip: (!static_ip.is_empty()).then_some(static_ip),
            serial_port: serial_port.to_string(),
        }
    }

    fn rows(&self) -> Vec<SummaryRow> {
        let network = match &self.static_ip {
            Some(ip) => SummaryRow::new("Static IP", ip.clone()),
            None => SummaryRow::new("Network", "DHCP (auto)".to_string()),
        };

        vec![
            SummaryRow::new("WiFi", self.wifi.clone()),
            SummaryRow::new("LNbits", self.endpoint.clone()),
            SummaryRow::new(
                "Telegram",
                (if self.telegram_enabled { "Enabled" } else { "Disabled" }).to_string(),
            ),
            SummaryRow::new("Device Name", self.device_name.clone()),
            network,
            SummaryRow::new("Serial Port", self.serial_port.clone()),
        ]
    }
}

/// Keep at most `limit` characters, ending in `...` when cut
fn shorten(value: &str, limit: usize) -> String {
    if value.chars().count() > limit {
        let head: String = value.chars().take(limit - 3).collect();
        format!("{}...", head)
    } else {
        value.to_string()
    }
}

/// Table row for the configuration summary
#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Setting")]
    setting: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

impl SummaryRow {
    fn new(setting: &'static str, value: String) -> Self {
        Self { setting, value }
    }
}

/// Console output for the operator; logs go to stderr separately
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleWriter;

impl ConsoleWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_message(&self, message: &str) {
        println!("{}", message);
    }

    pub fn write_warning(&self, warning: &str) {
        println!("Warning: {}", warning);
    }

    pub fn write_error(&self, error: &str) {
        eprintln!("Error: {}", error);
    }

    pub fn write_banner(&self) {
        println!("bitcoinSwitch Configuration Tool v{}", env!("CARGO_PKG_VERSION"));
        println!();
    }

    pub fn write_template_created(&self, path: &Path) {
        println!("Config file not found, created template at {}", path.display());
        println!("Edit it with your settings and run again");
    }

    pub fn write_validation(&self, report: &ValidationReport, config_path: &Path) {
        if !report.warnings.is_empty() {
            println!("Warnings:");
            for warning in &report.warnings {
                println!("  - {}", warning);
            }
            println!();
        }

        if !report.errors.is_empty() {
            eprintln!("Configuration errors:");
            for error in &report.errors {
                eprintln!("  - {}", error);
            }
            eprintln!();
            eprintln!("Edit {} to fix these issues", config_path.display());
        }
    }

    pub fn write_summary(&self, summary: &ConfigSummary) {
        println!("Configuration summary:");
        println!("{}", Table::new(summary.rows()));
        println!();
    }

    pub fn write_ports(&self, ports: &[String]) {
        if ports.is_empty() {
            println!("No serial ports found");
            return;
        }
        println!("Available serial ports:");
        for port in ports {
            println!("  {}", port);
        }
    }

    /// Remediation hints after a failed port open
    pub fn write_connection_hints(&self, port: &str) {
        eprintln!("  Make sure the device is connected to {}", port);
        eprintln!("  On macOS, list ports with: ls /dev/cu.usbmodem*");
        eprintln!("  On Linux, try: ls /dev/ttyUSB* /dev/ttyACM*");
        eprintln!("  Or run: bitswitch-config --list-ports");
    }

    /// Recovery menu followed by the choice prompt
    pub fn recovery_prompt(&self) -> String {
        format!("{}\nYour choice [r/t/w/q]: ", RECOVERY_MENU)
    }

    pub fn write_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Probing => println!("Checking if device is in config mode..."),
            SessionEvent::ModeDetected(probe) => {
                let mark = if probe.is_config_mode() { "OK" } else { "FAILED" };
                println!("[{}] {}", mark, probe.status_message());
            }
            SessionEvent::ResetAttempt(ResetMethod::Software) => {
                println!("Sending software reset command...")
            }
            SessionEvent::ResetAttempt(ResetMethod::Hardware) => {
                println!("Attempting hardware reset via DTR/RTS...")
            }
            SessionEvent::ResetOutcome { method, success, detail } => match (*method, *success) {
                (ResetMethod::Software, true) => println!("Software reset command acknowledged"),
                (ResetMethod::Software, false) => {
                    println!("No response to software reset, trying hardware reset as fallback")
                }
                (ResetMethod::Hardware, true) => println!("Hardware reset complete"),
                (ResetMethod::Hardware, false) => {
                    self.write_warning(&format!(
                        "Hardware reset failed: {}",
                        detail.as_deref().unwrap_or("unknown error")
                    ));
                    println!("Reset failed");
                }
            },
            SessionEvent::PowerCycleHint => println!("Device may need to be manually power cycled"),
            SessionEvent::Waiting(duration) => {
                println!("Waiting {} seconds...", duration.as_secs())
            }
            SessionEvent::RemovingOldConfig => println!("Removing old config..."),
            SessionEvent::WritingConfig { total } => {
                println!("Writing configuration ({} parameters)...", total)
            }
            SessionEvent::Progress { written, total } => {
                println!("  Written {}/{} parameters...", written, total)
            }
            SessionEvent::Verifying => {
                println!("Verifying configuration...");
                println!();
                println!("=== Device Response ===");
            }
            SessionEvent::DeviceLine(line) => println!("  {}", line),
            SessionEvent::Verified(verification) => self.write_verification(verification),
            SessionEvent::Finalizing => {
                println!();
                println!("Finalizing configuration...");
            }
            SessionEvent::Completed(behavior) => {
                println!();
                println!("Configuration complete! {}.", behavior);
            }
        }
    }

    fn write_verification(&self, verification: &Verification) {
        match verification {
            Verification::Valid { parameters } => {
                println!();
                println!("Validation: config has {} valid parameters", parameters);
            }
            Verification::NoResponse => {
                self.write_warning("No response - config may not have been written")
            }
            Verification::NoContent => {
                self.write_warning("Device response contained no file content")
            }
            Verification::Malformed { reason } => {
                self.write_warning(&format!("JSON validation failed - {}", reason))
            }
        }
    }
}
