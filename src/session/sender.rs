//! Fire-and-forget command writer.

use log::debug;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::{BridgeError, Result};
use crate::protocol::DeviceCommand;

pub(crate) type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Writes newline-terminated commands to the connected device.
///
/// Cloning is cheap and every clone follows the bridge across reconnects.
/// Replies are not awaited: they arrive later on the read loop.
#[derive(Clone, Default)]
pub struct CommandSender {
    writer: Arc<Mutex<Option<BoxedWriter>>>,
}

impl CommandSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends `command` followed by `\n`, returning the number of bytes written.
    pub async fn send(&self, command: &str) -> Result<usize> {
        if command.contains(['\n', '\r']) {
            return Err(BridgeError::invalid_command(format!(
                "{command:?} spans more than one line"
            )));
        }
        let line = format!("{command}\n");

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(BridgeError::NotConnected)?;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| BridgeError::port_write(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| BridgeError::port_write(e.to_string()))?;

        debug!("-> {command} ({} bytes)", line.len());
        Ok(line.len())
    }

    pub async fn send_command(&self, command: &DeviceCommand) -> Result<usize> {
        self.send(&command.to_string()).await
    }

    pub async fn is_attached(&self) -> bool {
        self.writer.lock().await.is_some()
    }

    pub(crate) async fn attach(&self, writer: BoxedWriter) {
        *self.writer.lock().await = Some(writer);
    }

    /// Drops the write half, shutting it down first.
    pub(crate) async fn detach(&self) -> Result<()> {
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            writer
                .shutdown()
                .await
                .map_err(|e| BridgeError::port_write(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_send_without_device_is_not_connected() {
        let sender = CommandSender::new();
        assert!(matches!(
            sender.send("PING").await,
            Err(BridgeError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_send_appends_newline_and_counts_bytes() {
        let (mut device, host) = tokio::io::duplex(64);
        let sender = CommandSender::new();
        sender.attach(Box::new(host)).await;

        assert_eq!(sender.send("GET_MEMORY").await.unwrap(), 11);
        let written = sender
            .send_command(&DeviceCommand::remove_card("aa:bb:cc:dd").unwrap())
            .await
            .unwrap();
        assert_eq!(written, "REMOVE_CARD:AA:BB:CC:DD\n".len());

        sender.detach().await.unwrap();
        let mut received = String::new();
        device.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "GET_MEMORY\nREMOVE_CARD:AA:BB:CC:DD\n");
    }

    #[tokio::test]
    async fn test_multi_line_command_rejected() {
        let (_device, host) = tokio::io::duplex(64);
        let sender = CommandSender::new();
        sender.attach(Box::new(host)).await;
        assert!(matches!(
            sender.send("PING\nCLEAR_LOGS").await,
            Err(BridgeError::InvalidCommand(_))
        ));
    }

    #[tokio::test]
    async fn test_clones_share_the_writer() {
        let (_device, host) = tokio::io::duplex(64);
        let sender = CommandSender::new();
        let clone = sender.clone();
        sender.attach(Box::new(host)).await;
        assert!(clone.is_attached().await);
        sender.detach().await.unwrap();
        assert!(matches!(clone.send("PING").await, Err(BridgeError::NotConnected)));
    }
}
