// Serial module - Serial port link to the device
pub mod client;

pub use client::{available_ports, SerialClient};
