use crate::domain::error::{ProvisionError, ProvisionResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known configuration keys understood by the device firmware
pub mod keys {
    pub const SSID: &str = "config_ssid";
    pub const PASSWORD: &str = "config_password";
    pub const DEVICE_STRING: &str = "config_device_string";
    pub const TELEGRAM_BOT_TOKEN: &str = "telegram_bot_token";
    pub const TELEGRAM_CHAT_ID: &str = "telegram_chat_id";
    pub const DEVICE_NAME: &str = "device_name";
    pub const STATIC_IP: &str = "static_ip";
    pub const STATIC_GATEWAY: &str = "static_gateway";
    pub const STATIC_SUBNET: &str = "static_subnet";
    pub const THRESHOLD_INKEY: &str = "config_threshold_inkey";
    pub const THRESHOLD_AMOUNT: &str = "config_threshold_amount";
    pub const THRESHOLD_PIN: &str = "config_threshold_pin";
    pub const THRESHOLD_TIME: &str = "config_threshold_time";
    pub const DI_MONITOR_ENABLED: &str = "di_monitor_enabled";
    pub const DI_CHECK_TIMEOUT_MS: &str = "di_check_timeout_ms";
    pub const LOGGING_ENABLED: &str = "logging_enabled";
    pub const LOG_RETENTION_HOURS: &str = "log_retention_hours";
    pub const SYSLOG_SERVER: &str = "syslog_server";
    pub const SYSLOG_PORT: &str = "syslog_port";
}

/// Endpoint value shipped in the generated template
pub const PLACEHOLDER_DEVICE_STRING: &str =
    "wss://your.lnbits.com/bitcoinswitch/api/v1/ws/YOUR_DEVICE_ID";

/// WiFi network name shipped in the generated template
pub const PLACEHOLDER_SSID: &str = "YourWiFiSSID";

/// Keys starting with this prefix are documentation only
pub const COMMENT_PREFIX: char = '_';

const TEMPLATE: &[(&str, &str)] = &[
    ("_comment", "bitcoinSwitch Configuration Template - Edit values below"),
    (keys::SSID, PLACEHOLDER_SSID),
    (keys::PASSWORD, "YourWiFiPassword"),
    (keys::DEVICE_STRING, PLACEHOLDER_DEVICE_STRING),
    ("_comment_optional", "Optional parameters - leave empty to disable features"),
    (keys::TELEGRAM_BOT_TOKEN, ""),
    (keys::TELEGRAM_CHAT_ID, ""),
    (keys::DEVICE_NAME, "Waveshare-01"),
    ("_comment_ethernet", "Ethernet static IP config - leave blank for DHCP (recommended)"),
    (keys::STATIC_IP, ""),
    (keys::STATIC_GATEWAY, ""),
    (keys::STATIC_SUBNET, "255.255.255.0"),
    ("_comment_legacy", "Legacy threshold mode parameters (disabled in v1.0+, kept for compatibility)"),
    (keys::THRESHOLD_INKEY, ""),
    (keys::THRESHOLD_AMOUNT, ""),
    (keys::THRESHOLD_PIN, ""),
    (keys::THRESHOLD_TIME, ""),
    ("_comment_di_monitoring", "Digital Input monitoring (optional, uses 1:1 mapping)"),
    (keys::DI_MONITOR_ENABLED, "false"),
    (keys::DI_CHECK_TIMEOUT_MS, "2000"),
    ("_comment_logging", "Event logging configuration (optional)"),
    (keys::LOGGING_ENABLED, "true"),
    (keys::LOG_RETENTION_HOURS, "168"),
    (keys::SYSLOG_SERVER, ""),
    (keys::SYSLOG_PORT, "514"),
];

/// One `{name, value}` record as stored on the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub name: String,
    pub value: String,
}

/// Flat device configuration as read from disk.
///
/// Field order follows the source file and is preserved through to the
/// transmitted entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigRecord {
    fields: Map<String, Value>,
}

impl ConfigRecord {
    /// Parse a record from JSON text; the top level must be an object
    pub fn from_json_str(content: &str) -> ProvisionResult<Self> {
        let value: Value = serde_json::from_str(content).map_err(|e| ProvisionError::Config {
            message: format!("Invalid JSON: {}", e),
        })?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> ProvisionResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ProvisionError::Config {
                message: format!("Expected a JSON object at the top level, found {}", kind_of(&other)),
            }),
        }
    }

    /// Default template with placeholder values and explanatory comments
    pub fn template() -> Self {
        let fields = TEMPLATE
            .iter()
            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
            .collect();
        Self { fields }
    }

    /// String form of a field, empty when absent
    pub fn get(&self, key: &str) -> String {
        self.fields.get(key).map(coerce_to_string).unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of keys that will be sent to the device
    pub fn parameter_count(&self) -> usize {
        self.fields.keys().filter(|key| !is_comment_key(key)).count()
    }

    /// Transmission records, comments removed, values coerced to strings
    pub fn entries(&self) -> Vec<ConfigEntry> {
        self.fields
            .iter()
            .filter(|(key, _)| !is_comment_key(key))
            .map(|(key, value)| ConfigEntry {
                name: key.clone(),
                value: coerce_to_string(value),
            })
            .collect()
    }

    pub fn to_pretty_json(&self) -> ProvisionResult<String> {
        Ok(serde_json::to_string_pretty(&self.fields)?)
    }
}

pub fn is_comment_key(key: &str) -> bool {
    key.starts_with(COMMENT_PREFIX)
}

/// Device values are always strings on the wire.
pub fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
