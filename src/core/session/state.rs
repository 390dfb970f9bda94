use serde::{Deserialize, Serialize};

/// Lifecycle of a provisioning session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionState {
    /// No link yet
    Disconnected,
    /// Link open, nothing sent
    Connected,
    /// Waiting for the answer to `/file-list`
    ModeCheck,
    /// Device accepts configuration
    ConfigMode,
    /// Device answered but is not in config mode
    NotConfigMode,
    /// Operator-driven retry or reset in progress
    Recovering,
    /// Streaming the configuration file
    Writing,
    /// Reading the stored file back
    Verifying,
    /// `/config-done` sent
    Finalizing,
    /// Provisioning finished
    Done,
    /// Link released
    Closed,
}

impl SessionState {
    /// True once the link may no longer be used
    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed)
    }

    /// True while device I/O is allowed
    pub fn is_open(&self) -> bool {
        !matches!(self, SessionState::Disconnected | SessionState::Closed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Disconnected => "Disconnected",
            SessionState::Connected => "Connected",
            SessionState::ModeCheck => "ModeCheck",
            SessionState::ConfigMode => "ConfigMode",
            SessionState::NotConfigMode => "NotConfigMode",
            SessionState::Recovering => "Recovering",
            SessionState::Writing => "Writing",
            SessionState::Verifying => "Verifying",
            SessionState::Finalizing => "Finalizing",
            SessionState::Done => "Done",
            SessionState::Closed => "Closed",
        };
        write!(f, "{}", name)
    }
}
