use async_trait::async_trait;
use thiserror::Error;

/// The platform refused to start playback, typically because no user gesture
/// preceded the request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("play request rejected: {reason}")]
pub struct PlayRejected {
    pub reason: String,
}

impl PlayRejected {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The platform media element driven by the controller.
///
/// Implementations report what happens to the media through
/// `lesson_core::playback::MediaEvent`s fed back into the controller.
#[async_trait]
pub trait MediaElement: Send {
    /// Point the element at `video_ref` and start fetching metadata.
    fn load(&mut self, video_ref: &str);

    /// Ask the element to start playing.
    ///
    /// # Errors
    ///
    /// Returns `PlayRejected` if the platform blocks playback.
    async fn play(&mut self) -> Result<(), PlayRejected>;

    fn pause(&mut self);

    fn seek(&mut self, seconds: f64);
}
