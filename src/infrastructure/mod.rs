// Infrastructure module - Serial port, files and logging
pub mod config;
pub mod logging;
pub mod serial;
