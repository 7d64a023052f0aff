//! Async driver for `lesson_core::playback::PlaybackMachine`.
//!
//! The machine decides; this module executes its effects against a media
//! element, a listener, tokio timers and the progress store.

mod controller;
mod listener;
mod media;
mod writer;

pub use controller::PlaybackController;
pub use listener::{ChannelListener, NoopListener, PlaybackListener, PlaybackNotification};
pub use media::{MediaElement, PlayRejected};
pub use writer::ThrottledProgressWriter;
