use crate::core::communication::{ControlLine, DeviceLink};
use crate::domain::error::{ProvisionError, ProvisionResult};
use crate::domain::settings::{ms, SerialSettings};
use async_trait::async_trait;
use serialport::{ClearBuffer, SerialPort};
use std::io::{self, Read, Write};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Upper bound on a single blocking read, so timeouts stay responsive
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Longest line kept; unterminated input beyond this is cut into a line
const MAX_LINE_BYTES: usize = 4096;

/// Serial port speaking the device's line protocol
pub struct SerialClient {
    port: Option<Box<dyn SerialPort>>,
    name: String,
    rx_buf: Vec<u8>,
}

impl SerialClient {
    /// Open `port_name` with the configured baud rate and read timeout
    pub fn open(port_name: &str, settings: &SerialSettings) -> ProvisionResult<Self> {
        let port = serialport::new(port_name, settings.baud_rate)
            .timeout(ms(settings.read_timeout_ms))
            .open()
            .map_err(|source| ProvisionError::Connection {
                port: port_name.to_string(),
                source,
            })?;

        info!("Serial port {} opened at {} baud", port_name, settings.baud_rate);

        Ok(Self {
            port: Some(port),
            name: port_name.to_string(),
            rx_buf: Vec::with_capacity(1024),
        })
    }

    fn port_mut(&mut self) -> ProvisionResult<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or_else(|| {
            ProvisionError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "serial port already closed",
            ))
        })
    }

    /// Split the first complete line off the receive buffer, or a
    /// `MAX_LINE_BYTES` slice when no terminator arrives in time
    fn take_line(&mut self) -> Option<String> {
        let end = match self.rx_buf.iter().position(|&b| b == b'\n') {
            Some(newline) => newline + 1,
            None if self.rx_buf.len() >= MAX_LINE_BYTES => {
                warn!("No line terminator in {} bytes from {}, splitting", MAX_LINE_BYTES, self.name);
                MAX_LINE_BYTES
            }
            None => return None,
        };
        let raw: Vec<u8> = self.rx_buf.drain(..end).collect();
        Some(String::from_utf8_lossy(&raw).trim().to_string())
    }

    fn read_chunk(&mut self, wait: Duration) -> ProvisionResult<usize> {
        let mut buffer = [0u8; 256];
        let port = self.port_mut()?;
        port.set_timeout(wait)?;

        let n = match port.read(&mut buffer) {
            Ok(n) => n,
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => 0,
            Err(e) => return Err(e.into()),
        };

        self.rx_buf.extend_from_slice(&buffer[..n]);
        Ok(n)
    }
}

/// Names of the serial ports present on this machine
pub fn available_ports() -> ProvisionResult<Vec<String>> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|port| port.port_name)
        .collect())
}

#[async_trait]
impl DeviceLink for SerialClient {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn write_line(&mut self, line: &str) -> ProvisionResult<()> {
        let port = self.port_mut()?;
        port.write_all(line.as_bytes())?;
        port.write_all(b"\n")?;
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> ProvisionResult<Option<String>> {
        let deadline = Instant::now() + timeout;

        loop {
            match self.take_line() {
                Some(line) if !line.is_empty() => return Ok(Some(line)),
                Some(_) => continue,
                None => {}
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            if self.read_chunk((deadline - now).min(POLL_INTERVAL))? == 0 {
                tokio::task::yield_now().await;
            }
        }
    }

    async fn clear(&mut self) -> ProvisionResult<()> {
        self.port_mut()?.clear(ClearBuffer::All)?;
        self.rx_buf.clear();
        Ok(())
    }

    async fn flush(&mut self) -> ProvisionResult<()> {
        self.port_mut()?.flush()?;
        Ok(())
    }

    async fn set_control_line(&mut self, line: ControlLine, level: bool) -> ProvisionResult<()> {
        debug!("Setting {} {}", line, if level { "high" } else { "low" });
        let port = self.port_mut()?;
        match line {
            ControlLine::Dtr => port.write_data_terminal_ready(level)?,
            ControlLine::Rts => port.write_request_to_send(level)?,
        }
        Ok(())
    }

    async fn close(&mut self) -> ProvisionResult<()> {
        if self.port.take().is_some() {
            self.rx_buf.clear();
            info!("Serial port {} closed", self.name);
        }
        Ok(())
    }
}
