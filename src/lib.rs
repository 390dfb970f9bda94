//! bitswitch-config library
//!
//! Loads and validates a bitcoinSwitch device configuration and writes it
//! to the device over its serial file-command protocol.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::communication::{DeviceLink, DeviceMode, Verification};
pub use crate::core::session::{run_session, Operator, ProvisionReport, ProvisionSession};
pub use domain::config::{ConfigEntry, ConfigRecord};
pub use domain::error::{ProvisionError, ProvisionResult};
pub use domain::settings::ProvisionerSettings;
