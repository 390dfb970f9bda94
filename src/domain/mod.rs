// Domain module - Configuration record, validation, settings and errors
pub mod config;
pub mod error;
pub mod settings;
pub mod validation;

pub use config::{ConfigEntry, ConfigRecord};
pub use error::{ProvisionError, ProvisionResult};
pub use settings::{FinalizeBehavior, ProvisionerSettings};
pub use validation::{validate, ValidationReport};
