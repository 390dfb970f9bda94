// Communication module - Device protocol and link abstraction
pub mod protocol;
pub mod transport;

pub use protocol::{classify_mode, DeviceCommand, DeviceMode, ModeProbe, ReadBack, Verification};
pub use transport::{ControlLine, DeviceLink};
