// Core module - Device protocol and provisioning session
pub mod communication;
pub mod session;
