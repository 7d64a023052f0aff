use lesson_core::playback::PlaybackStatus;
use serde::Serialize;
use tokio::sync::mpsc;

/// Callbacks for whoever renders the player. Every method defaults to a no-op.
pub trait PlaybackListener: Send {
    fn on_progress(&mut self, _current_time: f64, _duration: f64) {}

    /// Fired once per playthrough when the end is near.
    fn on_near_end(&mut self) {}

    fn on_ended(&mut self) {}

    fn on_status(&mut self, _status: &PlaybackStatus) {}
}

/// Listener that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl PlaybackListener for NoopListener {}

/// Owned form of the listener callbacks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackNotification {
    Progress { current_time: f64, duration: f64 },
    NearEnd,
    Ended,
    Status(PlaybackStatus),
}

/// Forwards callbacks over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<PlaybackNotification>,
}

impl ChannelListener {
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<PlaybackNotification>) -> Self {
        Self { tx }
    }

    /// A listener plus the receiving end of its channel.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PlaybackNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn send(&self, notification: PlaybackNotification) {
        if self.tx.send(notification).is_err() {
            tracing::trace!("playback notification dropped, receiver closed");
        }
    }
}

impl PlaybackListener for ChannelListener {
    fn on_progress(&mut self, current_time: f64, duration: f64) {
        self.send(PlaybackNotification::Progress {
            current_time,
            duration,
        });
    }

    fn on_near_end(&mut self) {
        self.send(PlaybackNotification::NearEnd);
    }

    fn on_ended(&mut self) {
        self.send(PlaybackNotification::Ended);
    }

    fn on_status(&mut self, status: &PlaybackStatus) {
        self.send(PlaybackNotification::Status(status.clone()));
    }
}
