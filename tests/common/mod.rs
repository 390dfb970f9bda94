#![allow(dead_code)]

use async_trait::async_trait;
use bitswitch_config::core::communication::{ControlLine, DeviceLink, ModeProbe};
use bitswitch_config::core::session::{Operator, RecoveryChoice, SessionEvent};
use bitswitch_config::{ProvisionError, ProvisionResult};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// What the simulated firmware is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimMode {
    Config,
    Running,
    Silent,
}

/// Firmware state shared between the link and the test body
#[derive(Debug)]
pub struct SimState {
    pub mode: SimMode,
    /// `/reset` is answered with a reboot notice and brings up config mode
    pub acknowledges_reset: bool,
    /// Toggling DTR back high brings up config mode
    pub hardware_reset_enters_config: bool,
    pub fail_control_lines: bool,
    /// Stream a truncated document on `/file-read`
    pub corrupt_read_back: bool,
    /// Log line emitted every `CHATTER_INTERVAL` while nothing else is queued
    pub chatter: Option<String>,
    pub written: Vec<String>,
    pub control_changes: Vec<(ControlLine, bool)>,
    pub stored_file: Vec<String>,
    pub closes: usize,
    outbox: VecDeque<String>,
}

impl SimState {
    fn respond(&mut self, line: &str) {
        self.outbox.push_back(line.to_string());
    }

    fn handle_command(&mut self, line: &str) {
        self.written.push(line.to_string());

        if self.mode == SimMode::Silent {
            return;
        }

        let (command, argument) = line.split_once(' ').unwrap_or((line, ""));
        match (self.mode, command) {
            (SimMode::Running, "/file-list") => {
                self.respond("WiFi connected");
                self.respond("WebSocket connected to server");
            }
            (SimMode::Running, "/reset") => {
                if self.acknowledges_reset {
                    self.respond("Rebooting...");
                    self.mode = SimMode::Config;
                }
            }
            (SimMode::Running, _) => {}
            (SimMode::Config, "/file-list") => {
                self.respond("Config mode active");
                self.respond("Available commands: /file-list /file-remove /file-append /file-read");
            }
            (SimMode::Config, "/file-remove") => {
                self.stored_file.clear();
                self.respond("File removed");
            }
            (SimMode::Config, "/file-append") => {
                self.stored_file.push(argument.to_string());
            }
            (SimMode::Config, "/file-read") => {
                if self.corrupt_read_back {
                    self.respond("/file-send [{\"name\":");
                    return;
                }
                let lines: Vec<String> = self
                    .stored_file
                    .iter()
                    .map(|content| format!("/file-send {}", content))
                    .collect();
                self.outbox.extend(lines);
                self.respond("/file-done");
            }
            (SimMode::Config, "/config-done") => {
                self.respond("Configuration saved");
            }
            (SimMode::Config, _) => {}
            (SimMode::Silent, _) => {}
        }
    }
}

/// Spacing of unsolicited log lines from a chatty device
pub const CHATTER_INTERVAL: Duration = Duration::from_millis(100);

pub type SimHandle = Arc<Mutex<SimState>>;

pub fn lock(handle: &SimHandle) -> MutexGuard<'_, SimState> {
    handle.lock().unwrap()
}

/// In-memory stand-in for a bitcoinSwitch on a serial port
pub struct SimulatedDevice {
    state: SimHandle,
    open: bool,
}

impl SimulatedDevice {
    pub fn new(mode: SimMode) -> (Self, SimHandle) {
        let state = Arc::new(Mutex::new(SimState {
            mode,
            acknowledges_reset: false,
            hardware_reset_enters_config: false,
            fail_control_lines: false,
            corrupt_read_back: false,
            chatter: None,
            written: Vec::new(),
            control_changes: Vec::new(),
            stored_file: Vec::new(),
            closes: 0,
            outbox: VecDeque::new(),
        }));
        (Self::attach(&state), state)
    }

    /// Another link to the same firmware, as after reopening the port
    pub fn attach(state: &SimHandle) -> Self {
        Self {
            state: Arc::clone(state),
            open: true,
        }
    }

    fn ensure_open(&self) -> ProvisionResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(ProvisionError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "simulated port is closed",
            )))
        }
    }
}

#[async_trait]
impl DeviceLink for SimulatedDevice {
    fn name(&self) -> String {
        "sim0".to_string()
    }

    async fn write_line(&mut self, line: &str) -> ProvisionResult<()> {
        self.ensure_open()?;
        lock(&self.state).handle_command(line);
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> ProvisionResult<Option<String>> {
        self.ensure_open()?;
        let (next, chatter) = {
            let mut state = lock(&self.state);
            (state.outbox.pop_front(), state.chatter.clone())
        };
        match (next, chatter) {
            (Some(line), _) => Ok(Some(line)),
            (None, Some(chatter)) if timeout >= CHATTER_INTERVAL => {
                tokio::time::sleep(CHATTER_INTERVAL).await;
                Ok(Some(chatter))
            }
            (None, _) => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }

    async fn clear(&mut self) -> ProvisionResult<()> {
        self.ensure_open()?;
        lock(&self.state).outbox.clear();
        Ok(())
    }

    async fn flush(&mut self) -> ProvisionResult<()> {
        self.ensure_open()
    }

    async fn set_control_line(&mut self, line: ControlLine, level: bool) -> ProvisionResult<()> {
        self.ensure_open()?;
        let mut state = lock(&self.state);
        if state.fail_control_lines {
            return Err(ProvisionError::Protocol(format!("cannot drive {}", line)));
        }
        state.control_changes.push((line, level));
        if line == ControlLine::Dtr && level && state.hardware_reset_enters_config {
            state.mode = SimMode::Config;
            state.outbox.clear();
        }
        Ok(())
    }

    async fn close(&mut self) -> ProvisionResult<()> {
        self.ensure_open()?;
        self.open = false;
        lock(&self.state).closes += 1;
        Ok(())
    }
}

/// Operator answering the recovery menu from a fixed script; aborts once
/// the script runs out
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    choices: VecDeque<RecoveryChoice>,
    pub menus_shown: usize,
    pub events: Vec<SessionEvent>,
}

impl ScriptedOperator {
    pub fn new(choices: &[RecoveryChoice]) -> Self {
        Self {
            choices: choices.iter().copied().collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    async fn choose_recovery(&mut self, _probe: &ModeProbe) -> ProvisionResult<RecoveryChoice> {
        self.menus_shown += 1;
        Ok(self.choices.pop_front().unwrap_or(RecoveryChoice::Abort))
    }

    fn notify(&mut self, event: &SessionEvent) {
        self.events.push(event.clone());
    }
}

/// A small record mixing value types and a comment key
pub fn sample_record() -> bitswitch_config::ConfigRecord {
    bitswitch_config::ConfigRecord::from_json_str(
        r#"{
            "_comment": "shop counter",
            "config_ssid": "ShopNet",
            "config_password": "hunter2",
            "config_device_string": "wss://lnbits.example.com/api/v1/ws/abc123",
            "device_name": "Counter-01",
            "logging_enabled": true,
            "syslog_port": 514
        }"#,
    )
    .unwrap()
}
