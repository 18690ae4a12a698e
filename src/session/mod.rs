//! # Session Module
//!
//! Connection lifecycle for the reader. A [`Bridge`] owns at most one open
//! port and at most one read loop; every open/close goes through `&mut self`,
//! so a second concurrent reader can never be started. Connecting while
//! already connected is an explicit reconnect: the previous loop is stopped
//! and joined before the new one starts.
//!
//! The alias cache lives inside the [`Dispatcher`], which moves into the read
//! task for the duration of a connection and is handed back on disconnect.

pub mod reader;
pub mod scheduler;
pub mod sender;

use log::{info, warn};
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::events::EventPublisher;
use crate::protocol::{DeviceCommand, Dispatcher};
use crate::serial::{PortSettings, open_port};
use reader::{ReadLoop, drain_startup_noise};
use scheduler::Scheduler;
pub use sender::CommandSender;

/// Whether a port handle is currently open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// A running read loop.
struct Session {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Dispatcher>,
}

/// Bridges one reader device to an [`EventPublisher`].
pub struct Bridge {
    config: Config,
    publisher: Arc<dyn EventPublisher>,
    sender: CommandSender,
    state: ConnectionState,
    port_name: Option<String>,
    /// Parked here while no read loop owns it.
    dispatcher: Option<Dispatcher>,
    session: Option<Session>,
}

impl Bridge {
    pub fn new(config: Config, publisher: Arc<dyn EventPublisher>) -> Self {
        Bridge {
            config,
            publisher,
            sender: CommandSender::new(),
            state: ConnectionState::Disconnected,
            port_name: None,
            dispatcher: Some(Dispatcher::new()),
            session: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// `"connected"` with an open port, `"searching"` otherwise.
    pub fn status(&self) -> &'static str {
        if self.is_connected() {
            "connected"
        } else {
            "searching"
        }
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// A handle for sending commands from other tasks.
    pub fn sender(&self) -> CommandSender {
        self.sender.clone()
    }

    pub async fn send(&self, command: &DeviceCommand) -> Result<usize> {
        self.sender.send_command(command).await
    }

    /// Opens `port_name` with the configured link settings and starts the
    /// read loop.
    pub async fn connect(&mut self, port_name: &str) -> Result<()> {
        let settings = PortSettings::from_config(port_name, &self.config.serial);
        if self.is_connected() {
            info!("reconnecting to {port_name}");
            self.disconnect().await?;
        }
        let stream = open_port(&settings)?;
        self.attach(stream).await?;
        self.port_name = Some(port_name.to_string());
        Ok(())
    }

    /// Takes over an already open stream: waits for the device to reboot,
    /// discards its startup output, starts the read loop and requests the
    /// initial memory, card and log listings.
    pub async fn attach<S>(&mut self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        if self.is_connected() {
            self.disconnect().await?;
        }

        let (mut reader, writer) = tokio::io::split(stream);
        self.sender.attach(Box::new(writer)).await;
        self.state = ConnectionState::Connected;

        sleep(self.config.timing.settle()).await;
        drain_startup_noise(&mut reader).await;

        let dispatcher = self.dispatcher.take().unwrap_or_default();
        let mut scheduler = Scheduler::new(self.sender.clone());
        scheduler.schedule_sequence(
            vec![
                DeviceCommand::GetMemory,
                DeviceCommand::GetCards,
                DeviceCommand::GetLogs,
            ],
            self.config.timing.startup_fetch_delay(),
        );

        let read_loop = ReadLoop::new(
            reader,
            dispatcher,
            self.publisher.clone(),
            scheduler,
            self.config.serial.max_line_len,
        )
        .with_timing(
            self.config.timing.refresh_delay(),
            self.config.timing.idle_poll(),
        );

        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(read_loop.run(shutdown_rx));
        self.session = Some(Session { shutdown, task });
        Ok(())
    }

    /// Stops the read loop and closes the port. A no-op when disconnected.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            // Err only means the loop already exited.
            let _ = session.shutdown.send(());
            match session.task.await {
                Ok(dispatcher) => self.dispatcher = Some(dispatcher),
                Err(e) => {
                    warn!("read loop ended abnormally, alias cache lost: {e}");
                    self.dispatcher = Some(Dispatcher::new());
                }
            }
        }

        let was_connected = self.is_connected();
        self.state = ConnectionState::Disconnected;
        self.port_name = None;
        let closed = self.sender.detach().await;
        if was_connected {
            info!("disconnected");
        }
        closed
    }

    /// Placeholder kept for API parity with the desktop front end.
    pub async fn test_connection(&self) -> Result<bool> {
        if !self.is_connected() {
            return Err(BridgeError::NotConnected);
        }
        Err(BridgeError::Unimplemented("test_connection"))
    }

    /// Placeholder kept for API parity with the desktop front end.
    pub async fn last_scanned_card(&self) -> Result<String> {
        Err(BridgeError::Unimplemented("last_scanned_card"))
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            let _ = session.shutdown.send(());
        }
    }
}
