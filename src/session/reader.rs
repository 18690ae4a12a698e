//! The single read loop: serial bytes in, ordered UI events out.

use log::{debug, info};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep, timeout};

use super::scheduler::Scheduler;
use crate::error::BridgeError;
use crate::events::EventPublisher;
use crate::protocol::{DeviceCommand, Dispatcher, LineAssembler};

const READ_BUFFER_SIZE: usize = 256;

/// How long the port must stay quiet before startup noise counts as drained.
const DRAIN_WINDOW: Duration = Duration::from_millis(50);
/// Upper bound on drain reads so a chatty device cannot stall the connect.
const MAX_DRAIN_READS: usize = 16;

/// Reads and discards whatever the device printed while booting.
pub async fn drain_startup_noise<R>(reader: &mut R) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut buffer = [0u8; 1024];
    let mut cleared = 0;
    for _ in 0..MAX_DRAIN_READS {
        match timeout(DRAIN_WINDOW, reader.read(&mut buffer)).await {
            Ok(Ok(n)) if n > 0 => cleared += n,
            _ => break,
        }
    }
    if cleared > 0 {
        info!("cleared {cleared} bytes of startup data");
    }
    cleared
}

/// State owned by the read task for the lifetime of one connection.
pub struct ReadLoop<R> {
    reader: R,
    assembler: LineAssembler,
    dispatcher: Dispatcher,
    publisher: Arc<dyn EventPublisher>,
    scheduler: Scheduler,
    refresh_delay: Duration,
    idle_poll: Duration,
}

impl<R> ReadLoop<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(
        reader: R,
        dispatcher: Dispatcher,
        publisher: Arc<dyn EventPublisher>,
        scheduler: Scheduler,
        max_line_len: usize,
    ) -> Self {
        ReadLoop {
            reader,
            assembler: LineAssembler::new(max_line_len),
            dispatcher,
            publisher,
            scheduler,
            refresh_delay: Duration::from_millis(100),
            idle_poll: Duration::from_millis(100),
        }
    }

    pub fn with_timing(mut self, refresh_delay: Duration, idle_poll: Duration) -> Self {
        self.refresh_delay = refresh_delay;
        self.idle_poll = idle_poll;
        self
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Runs until `shutdown` fires or its sender is dropped, then hands the
    /// dispatcher (and with it the alias cache) back.
    ///
    /// Read errors and empty reads count as "no data yet": the loop backs off
    /// for `idle_poll` and tries again.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> Dispatcher {
        info!("read loop started");
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        loop {
            let idle = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                read = self.reader.read(&mut buffer) => match read {
                    Ok(0) => true,
                    Ok(n) => {
                        self.process(&buffer[..n]);
                        false
                    }
                    Err(e) => {
                        debug!("{}", BridgeError::port_read(e.to_string()));
                        true
                    }
                },
            };
            if idle {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => break,
                    _ = sleep(self.idle_poll) => {}
                }
            }
        }
        self.scheduler.cancel_all();
        info!("read loop stopped");
        self.dispatcher
    }

    /// Handles one chunk: every completed line is dispatched in order.
    pub fn process(&mut self, chunk: &[u8]) {
        for line in self.assembler.push(chunk) {
            debug!("<- {line:?}");
            let dispatch = self.dispatcher.dispatch(&line);
            if let Some(event) = dispatch.event {
                self.publisher.emit(&event);
            }
            if dispatch.refresh_memory {
                self.scheduler
                    .schedule(DeviceCommand::GetMemory, self.refresh_delay);
            }
        }
    }
}
