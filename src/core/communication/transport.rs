use crate::domain::error::ProvisionResult;
use async_trait::async_trait;
use std::time::Duration;

/// Modem control lines used for a hardware reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLine {
    /// Data Terminal Ready
    Dtr,
    /// Request To Send
    Rts,
}

impl std::fmt::Display for ControlLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlLine::Dtr => write!(f, "DTR"),
            ControlLine::Rts => write!(f, "RTS"),
        }
    }
}

/// Line-oriented link to a device.
///
/// Implemented by the serial client and by simulated devices in tests.
#[async_trait]
pub trait DeviceLink: Send {
    /// Human-readable name of the link, usually the port path
    fn name(&self) -> String;

    /// Write one line; the newline terminator is appended by the link
    async fn write_line(&mut self, line: &str) -> ProvisionResult<()>;

    /// Next non-empty line with surrounding whitespace trimmed, or `None`
    /// when no complete line arrives within `timeout`
    async fn read_line(&mut self, timeout: Duration) -> ProvisionResult<Option<String>>;

    /// Discard pending input and output
    async fn clear(&mut self) -> ProvisionResult<()>;

    /// Wait until written data has been transmitted
    async fn flush(&mut self) -> ProvisionResult<()>;

    /// Drive a modem control line
    async fn set_control_line(&mut self, line: ControlLine, level: bool) -> ProvisionResult<()>;

    /// Release the underlying handle; further I/O fails
    async fn close(&mut self) -> ProvisionResult<()>;
}
