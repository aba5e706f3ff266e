//! Device position as an async source. A continuous watch is a scoped
//! resource: dropping the [`PositionWatch`] stops the producer.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::routing::Coordinate;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    Denied,

    #[error("position unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> Result<Coordinate, LocationError>;

    async fn watch_position(&self) -> Result<PositionWatch, LocationError>;
}

/// Producer half of a position watch.
#[derive(Debug, Clone)]
pub struct PositionFeed {
    tx: mpsc::Sender<Coordinate>,
}

impl PositionFeed {
    /// `false` once the watch has been released.
    pub async fn send(&self, position: Coordinate) -> bool {
        self.tx.send(position).await.is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves when the watch is released.
    pub async fn cancelled(&self) {
        self.tx.closed().await
    }
}

/// Consumer half of a position watch. Dropping it cancels the feed.
#[derive(Debug)]
pub struct PositionWatch {
    rx: mpsc::Receiver<Coordinate>,
}

impl PositionWatch {
    /// `None` when the producer has stopped.
    pub async fn recv(&mut self) -> Option<Coordinate> {
        self.rx.recv().await
    }
}

impl Drop for PositionWatch {
    fn drop(&mut self) {
        self.rx.close();
        debug!("position watch released");
    }
}

pub fn position_channel(buffer: usize) -> (PositionFeed, PositionWatch) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (PositionFeed { tx }, PositionWatch { rx })
}

/// Plays back a fixed track, one fix per `interval`. Used for demos and
/// tests where no device is present.
#[derive(Debug, Clone)]
pub struct ReplayPositionSource {
    track: Vec<Coordinate>,
    interval: Duration,
}

impl ReplayPositionSource {
    pub fn new(track: Vec<Coordinate>, interval: Duration) -> Self {
        Self { track, interval }
    }
}

#[async_trait]
impl PositionSource for ReplayPositionSource {
    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        self.track
            .first()
            .copied()
            .ok_or_else(|| LocationError::Unavailable("empty track".into()))
    }

    async fn watch_position(&self) -> Result<PositionWatch, LocationError> {
        let (feed, watch) = position_channel(8);
        let track = self.track.clone();
        let interval = self.interval;
        tokio::spawn(async move {
            for position in track {
                tokio::select! {
                    _ = feed.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                if !feed.send(position).await {
                    break;
                }
            }
            debug!(cancelled = feed.is_cancelled(), "position replay finished");
        });
        Ok(watch)
    }
}
