//! Deferred commands, sent after a fixed settle delay instead of waiting for
//! an acknowledgement the device never gives.

use log::warn;
use tokio::task::JoinSet;
use tokio::time::{Duration, sleep};

use super::sender::CommandSender;
use crate::protocol::DeviceCommand;

/// Timers that send commands later without blocking the read loop.
/// Dropping the scheduler cancels everything still pending.
pub struct Scheduler {
    sender: CommandSender,
    tasks: JoinSet<()>,
}

impl Scheduler {
    pub fn new(sender: CommandSender) -> Self {
        Self {
            sender,
            tasks: JoinSet::new(),
        }
    }

    /// Sends `command` once `delay` has elapsed.
    pub fn schedule(&mut self, command: DeviceCommand, delay: Duration) {
        self.schedule_sequence(vec![command], delay);
    }

    /// Sends `commands` in order, each `spacing` after the previous one.
    pub fn schedule_sequence(&mut self, commands: Vec<DeviceCommand>, spacing: Duration) {
        self.reap();
        let sender = self.sender.clone();
        self.tasks.spawn(async move {
            for command in commands {
                sleep(spacing).await;
                if let Err(e) = sender.send_command(&command).await {
                    warn!("deferred {command} not sent: {e}");
                }
            }
        });
    }

    /// Number of timers that have not fired yet.
    pub fn pending(&mut self) -> usize {
        self.reap();
        self.tasks.len()
    }

    pub fn cancel_all(&mut self) {
        self.tasks.abort_all();
    }

    fn reap(&mut self) {
        while self.tasks.try_join_next().is_some() {}
    }
}
