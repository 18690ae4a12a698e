//! Serial port discovery and the one-shot auto-connect scan.

use log::{info, warn};
use tokio_serial::available_ports;

use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::session::Bridge;

/// Name fragments of USB serial adapters the reader shows up as.
const CANDIDATE_MARKERS: &[&str] = &["usbmodem", "usbserial", "ttyacm", "ttyusb", "arduino"];

/// Whether a port name looks like it could be the reader.
pub fn is_candidate(port_name: &str) -> bool {
    let base = port_name.strip_prefix("/dev/").unwrap_or(port_name);
    let lower = base.to_ascii_lowercase();
    base.starts_with("tty.")
        || base.starts_with("cu.")
        || base.starts_with("COM")
        || CANDIDATE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Candidate device paths, sorted.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = available_ports().map_err(|e| BridgeError::PortList(e.to_string()))?;
    let mut names: Vec<String> = ports
        .into_iter()
        .map(|p| p.port_name)
        .filter(|name| is_candidate(name))
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}

/// First port whose name contains `pattern`, ignoring case.
pub fn find_device<'a>(ports: &'a [String], pattern: &str) -> Option<&'a str> {
    let pattern = pattern.to_ascii_lowercase();
    ports
        .iter()
        .find(|port| port.to_ascii_lowercase().contains(&pattern))
        .map(String::as_str)
}

/// Waits for the system to settle, scans once and connects to the first
/// matching port. Returns the port it connected to; gives up after one scan.
pub async fn auto_connect(bridge: &mut Bridge, config: &Config) -> Option<String> {
    tokio::time::sleep(config.timing.auto_connect_delay()).await;

    let ports = match list_ports() {
        Ok(ports) => ports,
        Err(e) => {
            warn!("auto-connect: {e}");
            return None;
        }
    };
    let Some(port) = find_device(&ports, &config.serial.auto_connect_pattern) else {
        info!(
            "auto-connect: no port matching '{}' among {:?}",
            config.serial.auto_connect_pattern, ports
        );
        return None;
    };

    info!("auto-connecting to {port}");
    match bridge.connect(port).await {
        Ok(()) => Some(port.to_string()),
        Err(e) => {
            warn!("auto-connect to {port} failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates() {
        assert!(is_candidate("/dev/tty.usbmodem212101"));
        assert!(is_candidate("/dev/cu.usbserial-110"));
        assert!(is_candidate("/dev/ttyACM0"));
        assert!(is_candidate("/dev/ttyUSB1"));
        assert!(is_candidate("COM4"));
        assert!(!is_candidate("/dev/ttyS0"));
        assert!(!is_candidate("/dev/null"));
    }

    #[test]
    fn test_find_device_ignores_case() {
        let ports = vec![
            "/dev/cu.Bluetooth-Incoming-Port".to_string(),
            "/dev/cu.usbmodem212101".to_string(),
            "/dev/tty.usbmodem212101".to_string(),
        ];
        assert_eq!(
            find_device(&ports, "USBMODEM"),
            Some("/dev/cu.usbmodem212101")
        );
        assert_eq!(find_device(&ports, "ttyACM"), None);
    }
}
