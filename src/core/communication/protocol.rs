//! Text command protocol spoken by the device firmware.
//!
//! Commands are newline-terminated ASCII lines. Responses are free-form
//! text whose meaning is recovered by substring matching against known
//! marker phrases.

use crate::domain::config::ConfigEntry;
use crate::domain::error::ProvisionResult;
use serde::Serialize;

/// Prefix the firmware puts in front of each line streamed by `/file-read`
pub const FILE_SEND_PREFIX: &str = "/file-send";

/// Phrases meaning the device accepts file-management commands
pub const CONFIG_MODE_MARKERS: &[&str] = &["config mode", "available commands", "file-list"];

/// Phrases meaning the device is running its normal payment logic
pub const RUNNING_MARKERS: &[&str] = &["wifi", "ethernet", "websocket", "connected", "network"];

/// Phrase acknowledging a `/reset`
pub const REBOOT_MARKER: &str = "reboot";

/// Commands understood by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    /// List files; harmless, used to probe the device mode
    FileList,
    /// Delete the remote file, optionally naming it
    FileRemove(Option<String>),
    /// Append one line to the open remote file
    FileAppend(String),
    /// Stream a remote file back, one `/file-send` line at a time
    FileRead(String),
    /// Software reboot
    Reset,
    /// Finish configuration
    ConfigDone,
}

impl std::fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceCommand::FileList => write!(f, "/file-list"),
            DeviceCommand::FileRemove(None) => write!(f, "/file-remove"),
            DeviceCommand::FileRemove(Some(path)) => write!(f, "/file-remove {}", path),
            DeviceCommand::FileAppend(line) => write!(f, "/file-append {}", line),
            DeviceCommand::FileRead(path) => write!(f, "/file-read {}", path),
            DeviceCommand::Reset => write!(f, "/reset"),
            DeviceCommand::ConfigDone => write!(f, "/config-done"),
        }
    }
}

/// Device state inferred from its response text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceMode {
    /// Ready to receive configuration
    ConfigMode,
    /// Running normally, not accepting configuration
    Running,
    /// Nothing recognizable was received
    Unknown,
}

/// Classify accumulated response text. Config-mode markers win over
/// running markers.
pub fn classify_mode(text: &str) -> DeviceMode {
    let text = text.to_lowercase();

    if CONFIG_MODE_MARKERS.iter().any(|marker| text.contains(marker)) {
        DeviceMode::ConfigMode
    } else if RUNNING_MARKERS.iter().any(|marker| text.contains(marker)) {
        DeviceMode::Running
    } else {
        DeviceMode::Unknown
    }
}

/// Result of one mode probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeProbe {
    pub mode: DeviceMode,
    pub lines: Vec<String>,
}

impl ModeProbe {
    pub fn from_lines(lines: Vec<String>) -> Self {
        let mode = classify_mode(&lines.join(" "));
        Self { mode, lines }
    }

    pub fn is_config_mode(&self) -> bool {
        self.mode == DeviceMode::ConfigMode
    }

    /// Operator-facing description of the probe outcome
    pub fn status_message(&self) -> &'static str {
        match self.mode {
            DeviceMode::ConfigMode => "Device is in config mode",
            DeviceMode::Running => "Device is running normally (not in config mode)",
            DeviceMode::Unknown if self.lines.is_empty() => "No response from device",
            DeviceMode::Unknown => "Could not determine device state",
        }
    }
}

/// True if any response line acknowledges a reboot
pub fn acknowledges_reboot(lines: &[String]) -> bool {
    lines.join(" ").to_lowercase().contains(REBOOT_MARKER)
}

/// Payloads for the `/file-append` sequence writing `entries` as one JSON
/// array: an opening bracket, one compact entry per line with a trailing
/// comma on all but the last, and a closing bracket.
pub fn append_payloads(entries: &[ConfigEntry]) -> ProvisionResult<Vec<String>> {
    let mut payloads = Vec::with_capacity(entries.len() + 2);
    payloads.push("[".to_string());

    for (index, entry) in entries.iter().enumerate() {
        let mut line = serde_json::to_string(entry)?;
        if index + 1 < entries.len() {
            line.push(',');
        }
        payloads.push(line);
    }

    payloads.push("]".to_string());
    Ok(payloads)
}

/// Outcome of reading the stored file back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Verification {
    /// The device said nothing at all
    NoResponse,
    /// The device answered but streamed no file content
    NoContent,
    /// The reconstructed file parsed; `parameters` entries found
    Valid { parameters: usize },
    /// The reconstructed file did not parse
    Malformed { reason: String },
}

/// Accumulates `/file-read` output and rebuilds the stored document
#[derive(Debug, Clone, Default)]
pub struct ReadBack {
    lines: Vec<String>,
    fragments: Vec<String>,
}

impl ReadBack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one response line, keeping its content if it is a file fragment
    pub fn push_line(&mut self, line: &str) {
        self.lines.push(line.to_string());

        if let Some((_, content)) = line.split_once(FILE_SEND_PREFIX) {
            let content = content.trim();
            if !content.is_empty() {
                self.fragments.push(content.to_string());
            }
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Concatenated fragments
    pub fn reconstruct(&self) -> String {
        self.fragments.concat()
    }

    pub fn verify(&self) -> Verification {
        if self.lines.is_empty() {
            return Verification::NoResponse;
        }
        if self.fragments.is_empty() {
            return Verification::NoContent;
        }

        match serde_json::from_str::<serde_json::Value>(&self.reconstruct()) {
            Ok(serde_json::Value::Array(items)) => Verification::Valid { parameters: items.len() },
            Ok(serde_json::Value::Object(fields)) => Verification::Valid { parameters: fields.len() },
            Ok(_) => Verification::Malformed {
                reason: "stored file is not a JSON array".to_string(),
            },
            Err(e) => Verification::Malformed { reason: e.to_string() },
        }
    }
}
