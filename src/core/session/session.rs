use crate::core::communication::protocol::{acknowledges_reboot, append_payloads};
use crate::core::communication::{ControlLine, DeviceCommand, DeviceLink, ModeProbe, ReadBack, Verification};
use crate::core::session::operator::{Operator, RecoveryChoice, ResetMethod, SessionEvent};
use crate::core::session::state::SessionState;
use crate::domain::config::{ConfigEntry, ConfigRecord};
use crate::domain::error::{ProvisionError, ProvisionResult};
use crate::domain::settings::{ms, FinalizeBehavior, ProvisionerSettings};
use serde::Serialize;
use std::future::Future;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Progress is reported after every this many entries
const PROGRESS_INTERVAL: usize = 3;

/// Summary of a completed provisioning run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    /// Entries written to the device
    pub parameters: usize,
    /// Read-back outcome
    pub verification: Verification,
    /// What the device does after `/config-done`
    pub finalize: FinalizeBehavior,
}

/// One provisioning run over an exclusively owned device link
pub struct ProvisionSession<L: DeviceLink> {
    link: L,
    settings: ProvisionerSettings,
    state: SessionState,
}

impl<L: DeviceLink> ProvisionSession<L> {
    /// Wrap an already opened link
    pub fn new(link: L, settings: ProvisionerSettings) -> Self {
        Self {
            link,
            settings,
            state: SessionState::Connected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session state {} -> {}", self.state, next);
        self.state = next;
    }

    fn ensure_open(&self) -> ProvisionResult<()> {
        if self.state.is_open() {
            Ok(())
        } else {
            Err(ProvisionError::Protocol(format!(
                "Session is {}, device I/O not possible",
                self.state
            )))
        }
    }

    async fn send(&mut self, command: DeviceCommand) -> ProvisionResult<()> {
        self.ensure_open()?;
        let line = command.to_string();
        debug!("-> {}", line);
        self.link.write_line(&line).await
    }

    /// Read lines until the device stays quiet for the drain idle time or
    /// the drain limit passes
    async fn drain(&mut self) -> ProvisionResult<Vec<String>> {
        let idle = ms(self.settings.timings.drain_idle_ms);
        let deadline = Instant::now() + ms(self.settings.timings.drain_max_ms);
        let mut lines = Vec::new();

        loop {
            let now = Instant::now();
            if now >= deadline {
                debug!("Drain limit reached after {} line(s)", lines.len());
                break;
            }
            match self.link.read_line(idle.min(deadline - now)).await? {
                Some(line) => {
                    debug!("<- {}", line);
                    lines.push(line);
                }
                None => break,
            }
        }

        Ok(lines)
    }

    /// Let the port settle after opening and discard stale data
    pub async fn prepare(&mut self) -> ProvisionResult<()> {
        self.ensure_open()?;
        sleep(ms(self.settings.timings.settle_ms)).await;
        self.link.clear().await
    }

    /// Send `/file-list` and classify everything received within the
    /// probe window
    pub async fn probe_mode<O: Operator>(&mut self, operator: &mut O) -> ProvisionResult<ModeProbe> {
        self.ensure_open()?;
        self.transition(SessionState::ModeCheck);
        operator.notify(&SessionEvent::Probing);

        self.link.clear().await?;
        self.send(DeviceCommand::FileList).await?;
        sleep(ms(self.settings.timings.probe_delay_ms)).await;

        let deadline = Instant::now() + ms(self.settings.timings.probe_window_ms);
        let mut lines = Vec::new();
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            if let Some(line) = self.link.read_line(deadline - now).await? {
                debug!("<- {}", line);
                lines.push(line);
            }
        }

        let probe = ModeProbe::from_lines(lines);
        info!("Mode probe: {:?} ({} line(s))", probe.mode, probe.lines.len());

        self.transition(if probe.is_config_mode() {
            SessionState::ConfigMode
        } else {
            SessionState::NotConfigMode
        });
        operator.notify(&SessionEvent::ModeDetected(probe.clone()));

        Ok(probe)
    }

    /// Probe the device and run the recovery menu until it is in config
    /// mode or the operator aborts
    pub async fn ensure_config_mode<O: Operator>(&mut self, operator: &mut O) -> ProvisionResult<()> {
        let mut probe = self.probe_mode(operator).await?;

        while !probe.is_config_mode() {
            self.transition(SessionState::Recovering);

            match operator.choose_recovery(&probe).await? {
                RecoveryChoice::Retry => {
                    probe = self.probe_mode(operator).await?;
                }
                RecoveryChoice::Reset => {
                    if !self.reset_device(operator).await? {
                        continue;
                    }
                    sleep(ms(self.settings.timings.post_reset_delay_ms)).await;
                    probe = self.probe_mode(operator).await?;
                    if !probe.is_config_mode() {
                        operator.notify(&SessionEvent::PowerCycleHint);
                    }
                }
                RecoveryChoice::Wait => {
                    let wait = ms(self.settings.timings.retry_wait_ms);
                    operator.notify(&SessionEvent::Waiting(wait));
                    sleep(wait).await;
                    probe = self.probe_mode(operator).await?;
                }
                RecoveryChoice::Abort => {
                    info!("Operator aborted while device was not in config mode");
                    return Err(ProvisionError::Cancelled);
                }
            }
        }

        Ok(())
    }

    /// Reset the device: software command first, DTR/RTS toggling if the
    /// command is not acknowledged
    pub async fn reset_device<O: Operator>(&mut self, operator: &mut O) -> ProvisionResult<bool> {
        if self.software_reset(operator).await? {
            return Ok(true);
        }
        self.hardware_reset(operator).await
    }

    async fn software_reset<O: Operator>(&mut self, operator: &mut O) -> ProvisionResult<bool> {
        operator.notify(&SessionEvent::ResetAttempt(ResetMethod::Software));
        self.send(DeviceCommand::Reset).await?;
        sleep(ms(self.settings.timings.reset_ack_delay_ms)).await;

        let response = self.drain().await?;
        for line in &response {
            operator.notify(&SessionEvent::DeviceLine(line.clone()));
        }

        let acknowledged = acknowledges_reboot(&response);
        operator.notify(&SessionEvent::ResetOutcome {
            method: ResetMethod::Software,
            success: acknowledged,
            detail: None,
        });

        if acknowledged {
            info!("Software reset acknowledged");
            sleep(ms(self.settings.timings.reboot_wait_ms)).await;
        } else {
            warn!("No acknowledgment to software reset");
        }
        Ok(acknowledged)
    }

    async fn hardware_reset<O: Operator>(&mut self, operator: &mut O) -> ProvisionResult<bool> {
        operator.notify(&SessionEvent::ResetAttempt(ResetMethod::Hardware));

        match self.toggle_reset_lines().await {
            Ok(()) => {
                sleep(ms(self.settings.timings.reboot_wait_ms)).await;
                info!("Hardware reset complete");
                operator.notify(&SessionEvent::ResetOutcome {
                    method: ResetMethod::Hardware,
                    success: true,
                    detail: None,
                });
                Ok(true)
            }
            Err(e) => {
                warn!("Hardware reset failed: {}", e);
                operator.notify(&SessionEvent::ResetOutcome {
                    method: ResetMethod::Hardware,
                    success: false,
                    detail: Some(e.to_string()),
                });
                Ok(false)
            }
        }
    }

    async fn toggle_reset_lines(&mut self) -> ProvisionResult<()> {
        self.ensure_open()?;
        let pulse = ms(self.settings.timings.control_pulse_ms);

        self.link.set_control_line(ControlLine::Dtr, false).await?;
        self.link.set_control_line(ControlLine::Rts, true).await?;
        sleep(pulse).await;
        self.link.set_control_line(ControlLine::Rts, false).await?;
        sleep(pulse).await;
        self.link.set_control_line(ControlLine::Dtr, true).await
    }

    /// Replace the remote configuration file with `entries`
    pub async fn write_config<O: Operator>(
        &mut self,
        entries: &[ConfigEntry],
        operator: &mut O,
    ) -> ProvisionResult<()> {
        self.ensure_open()?;
        self.transition(SessionState::Writing);
        let timings = self.settings.timings.clone();

        operator.notify(&SessionEvent::RemovingOldConfig);
        let remove_path = self.settings.protocol.remove_path.clone();
        self.send(DeviceCommand::FileRemove(remove_path)).await?;
        sleep(ms(timings.remove_delay_ms)).await;
        self.drain().await?;

        let total = entries.len();
        info!("Writing {} parameter(s)", total);
        operator.notify(&SessionEvent::WritingConfig { total });

        let payloads = append_payloads(entries)?;
        let last = payloads.len() - 1;
        for (index, payload) in payloads.into_iter().enumerate() {
            self.send(DeviceCommand::FileAppend(payload)).await?;

            if index == last {
                sleep(ms(timings.closing_delay_ms)).await;
                break;
            }
            sleep(ms(timings.line_delay_ms)).await;

            // payload 0 is the opening bracket
            let written = index;
            if written > 0 && (written % PROGRESS_INTERVAL == 0 || written == total) {
                operator.notify(&SessionEvent::Progress { written, total });
            }
        }

        self.link.flush().await?;
        sleep(ms(timings.flush_delay_ms)).await;
        Ok(())
    }

    /// Read the stored file back and check that it parses
    pub async fn verify<O: Operator>(&mut self, operator: &mut O) -> ProvisionResult<Verification> {
        self.ensure_open()?;
        self.transition(SessionState::Verifying);
        operator.notify(&SessionEvent::Verifying);

        let read_path = self.settings.protocol.read_path.clone();
        self.send(DeviceCommand::FileRead(read_path)).await?;
        sleep(ms(self.settings.timings.read_back_delay_ms)).await;

        let mut read_back = ReadBack::new();
        for line in self.drain().await? {
            read_back.push_line(&line);
            operator.notify(&SessionEvent::DeviceLine(line));
        }

        let verification = read_back.verify();
        match &verification {
            Verification::Valid { parameters } => info!("Read back {} parameter(s)", parameters),
            Verification::NoResponse => warn!("No response to file read"),
            Verification::NoContent => warn!("File read returned no content"),
            Verification::Malformed { reason } => warn!("Stored file did not parse: {}", reason),
        }
        operator.notify(&SessionEvent::Verified(verification.clone()));

        Ok(verification)
    }

    /// Send `/config-done` and echo whatever the device answers
    pub async fn finalize<O: Operator>(&mut self, operator: &mut O) -> ProvisionResult<Vec<String>> {
        self.ensure_open()?;
        self.transition(SessionState::Finalizing);
        operator.notify(&SessionEvent::Finalizing);

        self.send(DeviceCommand::ConfigDone).await?;
        self.link.flush().await?;
        sleep(ms(self.settings.timings.finalize_delay_ms)).await;

        let response = self.drain().await?;
        for line in &response {
            operator.notify(&SessionEvent::DeviceLine(line.clone()));
        }

        self.transition(SessionState::Done);
        operator.notify(&SessionEvent::Completed(self.settings.protocol.finalize));
        Ok(response)
    }

    /// Full sequence: settle, optional mode check and recovery, write,
    /// verify, finalize
    pub async fn provision<O: Operator>(
        &mut self,
        record: &ConfigRecord,
        operator: &mut O,
    ) -> ProvisionResult<ProvisionReport> {
        info!("Provisioning device on {}", self.link.name());
        self.prepare().await?;

        if self.settings.protocol.mode_detection {
            self.ensure_config_mode(operator).await?;
        }

        let entries = record.entries();
        self.write_config(&entries, operator).await?;
        let verification = self.verify(operator).await?;
        self.finalize(operator).await?;

        Ok(ProvisionReport {
            parameters: entries.len(),
            verification,
            finalize: self.settings.protocol.finalize,
        })
    }

    /// Release the link. Safe to call more than once.
    pub async fn close(&mut self) -> ProvisionResult<()> {
        if self.state.is_closed() {
            return Ok(());
        }
        self.transition(SessionState::Closed);
        self.link.close().await?;
        info!("Closed link to {}", self.link.name());
        Ok(())
    }
}

/// Provision through `session`, racing it against `cancel`. The link is
/// closed on every path.
pub async fn run_session<L, O, C>(
    mut session: ProvisionSession<L>,
    record: &ConfigRecord,
    operator: &mut O,
    cancel: C,
) -> ProvisionResult<ProvisionReport>
where
    L: DeviceLink,
    O: Operator,
    C: Future<Output = ()>,
{
    let outcome = tokio::select! {
        result = session.provision(record, operator) => result,
        _ = cancel => {
            warn!("Provisioning interrupted");
            Err(ProvisionError::Interrupted)
        }
    };

    let closed = session.close().await;
    match (outcome, closed) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_error)) => {
            warn!("Failed to close link after error: {}", close_error);
            Err(e)
        }
    }
}
