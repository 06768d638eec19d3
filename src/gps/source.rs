// src/gps/source.rs
//! Positioning sources: serial NMEA and raw-NMEA TCP
//!
//! The ingest loop only sees a buffered line reader; which transport backs
//! it is decided here. Connection lifecycle (retries, reconnects) belongs
//! to the caller.

use crate::config::NavConfig;
use crate::error::{NavError, Result};
use std::time::Duration;
use tokio::io::{AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio_serial::SerialPortBuilderExt;

/// Buffered line source handed to the ingest loop.
pub type LineSource = BufReader<Box<dyn AsyncRead + Send + Unpin>>;

/// Where NMEA sentences come from.
#[derive(Debug, Clone)]
pub enum GpsSource {
    Serial { port: String, baudrate: u32 },
    Tcp { host: String, port: u16 },
}

impl GpsSource {
    /// Build the source described by the configuration.
    pub fn from_config(config: &NavConfig) -> Result<Self> {
        match config.source_type.as_str() {
            "serial" => {
                let port = config.serial_port.clone().ok_or_else(|| {
                    NavError::Connection("No serial port configured".to_string())
                })?;
                Ok(GpsSource::Serial {
                    port,
                    baudrate: config.serial_baudrate,
                })
            }
            "tcp" => Ok(GpsSource::Tcp {
                host: config.tcp_host.clone(),
                port: config.tcp_port,
            }),
            other => Err(NavError::Connection(format!(
                "Unknown source type {:?}",
                other
            ))),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            GpsSource::Serial { port, baudrate } => format!("{} at {} baud", port, baudrate),
            GpsSource::Tcp { host, port } => format!("{}:{}", host, port),
        }
    }

    /// Open the transport and wrap it as a line source.
    pub async fn connect(&self) -> Result<LineSource> {
        match self {
            GpsSource::Serial { port, baudrate } => {
                let serial = tokio_serial::new(port, *baudrate)
                    .timeout(Duration::from_millis(1000))
                    .open_native_async()
                    .map_err(|e| {
                        NavError::Connection(format!("Failed to open serial port {}: {}", port, e))
                    })?;
                Ok(BufReader::new(
                    Box::new(serial) as Box<dyn AsyncRead + Send + Unpin>
                ))
            }
            GpsSource::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port)).await.map_err(|e| {
                    NavError::Connection(format!(
                        "Failed to connect to {}:{}: {}",
                        host, port, e
                    ))
                })?;
                Ok(BufReader::new(
                    Box::new(stream) as Box<dyn AsyncRead + Send + Unpin>
                ))
            }
        }
    }
}

/// List available serial ports.
pub fn list_serial_ports() -> Result<()> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| NavError::Other(format!("Failed to list serial ports: {}", e)))?;

    if ports.is_empty() {
        println!("No serial ports found.");
    } else {
        println!("Available serial ports:");
        for port in ports {
            println!("  {} - {:?}", port.port_name, port.port_type);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_requires_serial_port() {
        let config = NavConfig::default();
        assert!(matches!(
            GpsSource::from_config(&config),
            Err(NavError::Connection(_))
        ));
    }

    #[test]
    fn from_config_builds_tcp_source() {
        let mut config = NavConfig::default();
        config.update_tcp("gpshost".to_string(), 10110);
        match GpsSource::from_config(&config).unwrap() {
            GpsSource::Tcp { host, port } => {
                assert_eq!(host, "gpshost");
                assert_eq!(port, 10110);
            }
            other => panic!("expected tcp source, got {:?}", other),
        }
    }
}
