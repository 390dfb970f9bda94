use crate::core::communication::{ModeProbe, Verification};
use crate::domain::error::ProvisionResult;
use crate::domain::settings::FinalizeBehavior;
use async_trait::async_trait;
use std::time::Duration;

/// Operator answer when the device is not in config mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryChoice {
    /// Probe again
    Retry,
    /// Reset the device, then probe again
    Reset,
    /// Wait, then probe again
    Wait,
    /// Give up
    Abort,
}

impl RecoveryChoice {
    /// Parse a menu answer (`r`, `t`, `w`, `q`)
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "r" => Some(Self::Retry),
            "t" => Some(Self::Reset),
            "w" => Some(Self::Wait),
            "q" => Some(Self::Abort),
            _ => None,
        }
    }
}

/// How a reset was attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMethod {
    /// `/reset` command
    Software,
    /// DTR/RTS toggling
    Hardware,
}

impl std::fmt::Display for ResetMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResetMethod::Software => write!(f, "software"),
            ResetMethod::Hardware => write!(f, "hardware"),
        }
    }
}

/// Progress notifications emitted by a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Probing,
    ModeDetected(ModeProbe),
    ResetAttempt(ResetMethod),
    ResetOutcome {
        method: ResetMethod,
        success: bool,
        detail: Option<String>,
    },
    /// Reset went through but the device still is not in config mode
    PowerCycleHint,
    Waiting(Duration),
    RemovingOldConfig,
    WritingConfig { total: usize },
    Progress { written: usize, total: usize },
    Verifying,
    /// Raw line echoed by the device
    DeviceLine(String),
    Verified(Verification),
    Finalizing,
    Completed(FinalizeBehavior),
}

/// The person driving the session.
///
/// Receives progress events and answers the recovery menu.
#[async_trait]
pub trait Operator: Send {
    async fn choose_recovery(&mut self, probe: &ModeProbe) -> ProvisionResult<RecoveryChoice>;

    fn notify(&mut self, event: &SessionEvent);
}
