use log::{error, info};
use std::fmt;
use tokio::time::Duration;
use tokio_serial::SerialPortBuilderExt;
pub use tokio_serial::{DataBits, FlowControl, Parity, SerialStream, StopBits};

use crate::config::SerialConfig;
use crate::error::{BridgeError, Result};

/// serial port settings, 8N1 without flow control unless changed
#[derive(Clone, Debug, PartialEq)]
pub struct PortSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub flow_control: FlowControl,
    pub timeout: Duration,
}

impl PortSettings {
    /// settings for the reader firmware's fixed link
    pub fn new(port_name: impl Into<String>) -> Self {
        PortSettings {
            port_name: port_name.into(),
            baud_rate: 115200,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
            timeout: Duration::from_secs(2),
        }
    }

    /// settings with baud rate and read timeout taken from config
    pub fn from_config(port_name: impl Into<String>, config: &SerialConfig) -> Self {
        PortSettings {
            baud_rate: config.baud_rate,
            timeout: Duration::from_millis(config.read_timeout_ms),
            ..PortSettings::new(port_name)
        }
    }
}

impl fmt::Display for PortSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} baud, {} data bits, parity {}, {} stop bits",
            self.port_name, self.baud_rate, self.data_bits, self.parity, self.stop_bits
        )
    }
}

/// open serial port
pub fn open_port(settings: &PortSettings) -> Result<SerialStream> {
    match tokio_serial::new(settings.port_name.as_str(), settings.baud_rate)
        .data_bits(settings.data_bits)
        .parity(settings.parity)
        .stop_bits(settings.stop_bits)
        .flow_control(settings.flow_control)
        .timeout(settings.timeout)
        .open_native_async()
    {
        Ok(stream) => {
            info!("opened serial port: {}", settings);
            Ok(stream)
        }
        Err(e) => {
            error!("failed to open serial port {}: {}", settings.port_name, e);
            Err(BridgeError::port_open(&settings.port_name, e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_link_is_115200_8n1() {
        let settings = PortSettings::new("/dev/ttyACM0");
        assert_eq!(settings.baud_rate, 115200);
        assert_eq!(settings.data_bits, DataBits::Eight);
        assert_eq!(settings.parity, Parity::None);
        assert_eq!(settings.stop_bits, StopBits::One);
        assert_eq!(settings.timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_from_config() {
        let config = SerialConfig {
            baud_rate: 9600,
            read_timeout_ms: 250,
            ..SerialConfig::default()
        };
        let settings = PortSettings::from_config("COM3", &config);
        assert_eq!(settings.port_name, "COM3");
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.timeout, Duration::from_millis(250));
        assert_eq!(settings.flow_control, FlowControl::None);
    }

    #[tokio::test]
    async fn test_open_missing_port_is_port_open_error() {
        let settings = PortSettings::new("/dev/card-bridge-no-such-port");
        match open_port(&settings) {
            Err(BridgeError::PortOpen { port_name, .. }) => {
                assert_eq!(port_name, "/dev/card-bridge-no-such-port");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("opened a port that does not exist"),
        }
    }
}
