//! Shape checks over a loaded configuration record.
//!
//! Only superficial checks are made: URL prefix, IPv4 dot count and
//! presence pairing of optional credentials. Errors block provisioning,
//! warnings are printed and otherwise ignored.

use crate::domain::config::{keys, ConfigRecord, PLACEHOLDER_DEVICE_STRING, PLACEHOLDER_SSID};
use serde::Serialize;

/// Required scheme for the payment backend endpoint
pub const SECURE_WEBSOCKET_PREFIX: &str = "wss://";

/// Outcome of validating a configuration record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Validate a configuration record
pub fn validate(record: &ConfigRecord) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_device_string(record, &mut report);
    check_wifi(record, &mut report);
    check_telegram(record, &mut report);
    check_static_ip(record, &mut report);

    report
}

fn check_device_string(record: &ConfigRecord, report: &mut ValidationReport) {
    let device_string = record.get(keys::DEVICE_STRING);
    if device_string.is_empty() {
        report.error(format!("{} is required", keys::DEVICE_STRING));
    } else if !device_string.starts_with(SECURE_WEBSOCKET_PREFIX) {
        report.error(format!(
            "{} must start with {} (secure WebSocket)",
            keys::DEVICE_STRING,
            SECURE_WEBSOCKET_PREFIX
        ));
    } else if device_string == PLACEHOLDER_DEVICE_STRING {
        report.error(format!(
            "{} still has placeholder value - update with your actual LNbits URL",
            keys::DEVICE_STRING
        ));
    }
}

fn check_wifi(record: &ConfigRecord, report: &mut ValidationReport) {
    let ssid = record.get(keys::SSID);
    let password = record.get(keys::PASSWORD);

    if ssid == PLACEHOLDER_SSID {
        report.warning("WiFi SSID has placeholder value - update or leave blank to use Ethernet only");
    }
    if !ssid.is_empty() && password.is_empty() {
        report.warning("WiFi SSID set but password is empty - WiFi may not connect");
    }
    if !password.is_empty() && ssid.is_empty() {
        report.warning("WiFi password set but SSID is empty");
    }
}

fn check_telegram(record: &ConfigRecord, report: &mut ValidationReport) {
    let bot_token = record.get(keys::TELEGRAM_BOT_TOKEN);
    let chat_id = record.get(keys::TELEGRAM_CHAT_ID);

    match (bot_token.is_empty(), chat_id.is_empty()) {
        (false, true) => report.error(format!(
            "{} required when {} is set",
            keys::TELEGRAM_CHAT_ID,
            keys::TELEGRAM_BOT_TOKEN
        )),
        (true, false) => report.error(format!(
            "{} required when {} is set",
            keys::TELEGRAM_BOT_TOKEN,
            keys::TELEGRAM_CHAT_ID
        )),
        _ => {}
    }
}

fn check_static_ip(record: &ConfigRecord, report: &mut ValidationReport) {
    let static_ip = record.get(keys::STATIC_IP);
    if !static_ip.is_empty() && !has_four_segments(&static_ip) {
        report.error(format!(
            "{} '{}' is not a valid IPv4 address",
            keys::STATIC_IP,
            static_ip
        ));
    }
}

/// Dot count only; segment contents are not range checked.
fn has_four_segments(address: &str) -> bool {
    address.split('.').count() == 4
}
