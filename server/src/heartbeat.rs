//! Per-synthesis progress heartbeat.
//!
//! Cloning-path synthesis can take seconds to minutes, so each
//! synthesis call owns a background task that reports elapsed time
//! once per second. The task must never outlive its synthesis call:
//! [`ProgressHeartbeat::stop`] aborts it and awaits the cancellation
//! before the caller moves on, on success and failure paths alike.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::protocol::ServerMessage;
use crate::transport::OutboundFrame;

pub const HEARTBEAT_MESSAGE: &str = "Generating voice...";

pub struct ProgressHeartbeat {
    handle: JoinHandle<()>,
}

impl ProgressHeartbeat {
    /// Spawn the heartbeat. First beat lands one second in; a
    /// zero-elapsed beat would only be noise.
    pub fn start(out: mpsc::Sender<OutboundFrame>) -> Self {
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticks = interval_at(started + Duration::from_secs(1), Duration::from_secs(1));
            loop {
                ticks.tick().await;
                let msg = ServerMessage::status(
                    HEARTBEAT_MESSAGE,
                    format!("{}s elapsed", started.elapsed().as_secs()),
                );
                if out.send(OutboundFrame::Message(msg)).await.is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }

    /// Cancel and await acknowledgement; the cancellation itself is
    /// swallowed.
    pub async fn stop(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}
