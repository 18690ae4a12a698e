//! # Error Module
//!
//! This module provides custom error types for the `card_bridge` application.
//! It uses the `thiserror` crate for ergonomic error handling.
//!
//! Malformed device lines are never errors: the dispatcher drops them or
//! defaults the offending fields and logs the anomaly.

use thiserror::Error;

/// Result type alias for `card_bridge` operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Main error type for the `card_bridge` application.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Failed to open serial port.
    #[error("Failed to open serial port '{port_name}': {reason}")]
    PortOpen { port_name: String, reason: String },

    /// Failed to read from serial port.
    #[error("Failed to read from serial port: {0}")]
    PortRead(String),

    /// Failed to write to serial port.
    #[error("Failed to write to serial port: {0}")]
    PortWrite(String),

    /// Failed to enumerate serial ports.
    #[error("Failed to list serial ports: {0}")]
    PortList(String),

    /// A command was issued while no device is connected.
    #[error("Not connected")]
    NotConnected,

    /// A command could not be rendered for the device.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// File I/O error.
    #[error("File I/O error: {0}")]
    FileIo(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation exists on the device API but is not implemented here.
    #[error("{0} is not implemented")]
    Unimplemented(&'static str),
}

impl BridgeError {
    /// Creates a new port open error.
    #[must_use]
    pub fn port_open(port_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PortOpen {
            port_name: port_name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new port read error.
    #[must_use]
    pub fn port_read(msg: impl Into<String>) -> Self {
        Self::PortRead(msg.into())
    }

    /// Creates a new port write error.
    #[must_use]
    pub fn port_write(msg: impl Into<String>) -> Self {
        Self::PortWrite(msg.into())
    }

    /// Creates a new invalid command error.
    #[must_use]
    pub fn invalid_command(msg: impl Into<String>) -> Self {
        Self::InvalidCommand(msg.into())
    }

    /// Creates a new invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
