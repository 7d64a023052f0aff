#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use lesson_core::model::{LessonId, PlaybackSettings};
use lesson_core::playback::{LessonSource, MediaEvent};
use lesson_core::time::fixed_clock;
use services::playback::{ChannelListener, MediaElement, PlayRejected, PlaybackController};
use services::{PlaybackNotification, ProgressService};
use storage::repository::InMemoryRepository;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum MediaCall {
    Load(String),
    Play,
    Pause,
    Seek(f64),
}

/// Media element that records every call and optionally rejects `play`.
#[derive(Debug, Default)]
pub struct ScriptedMedia {
    pub calls: Vec<MediaCall>,
    pub reject_play: bool,
}

impl ScriptedMedia {
    pub fn rejecting() -> Self {
        Self {
            calls: Vec::new(),
            reject_play: true,
        }
    }

    pub fn count(&self, wanted: &MediaCall) -> usize {
        self.calls.iter().filter(|c| *c == wanted).count()
    }

    pub fn loads(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, MediaCall::Load(_)))
            .count()
    }
}

#[async_trait]
impl MediaElement for ScriptedMedia {
    fn load(&mut self, video_ref: &str) {
        self.calls.push(MediaCall::Load(video_ref.to_string()));
    }

    async fn play(&mut self) -> Result<(), PlayRejected> {
        self.calls.push(MediaCall::Play);
        if self.reject_play {
            Err(PlayRejected::new("user gesture required"))
        } else {
            Ok(())
        }
    }

    fn pause(&mut self) {
        self.calls.push(MediaCall::Pause);
    }

    fn seek(&mut self, seconds: f64) {
        self.calls.push(MediaCall::Seek(seconds));
    }
}

pub type Controller = PlaybackController<ScriptedMedia, ChannelListener>;

pub struct Harness {
    pub controller: Controller,
    pub progress: Arc<ProgressService>,
    pub notifications: mpsc::UnboundedReceiver<PlaybackNotification>,
}

impl Harness {
    pub fn new(media: ScriptedMedia) -> Self {
        Self::with_settings(media, PlaybackSettings::default())
    }

    pub fn with_settings(media: ScriptedMedia, settings: PlaybackSettings) -> Self {
        let progress = Arc::new(ProgressService::new(
            fixed_clock(),
            Arc::new(InMemoryRepository::new()),
        ));
        let (listener, notifications) = ChannelListener::channel();
        let controller = PlaybackController::new(settings, Arc::clone(&progress), media, listener);
        Self {
            controller,
            progress,
            notifications,
        }
    }

    pub fn drain(&mut self) -> Vec<PlaybackNotification> {
        let mut out = Vec::new();
        while let Ok(n) = self.notifications.try_recv() {
            out.push(n);
        }
        out
    }

    pub async fn stored_seconds(&self, lesson: &str) -> Option<f64> {
        self.progress
            .get(&LessonId::new(lesson))
            .await
            .unwrap()
            .map(|e| e.seconds_watched())
    }
}

pub fn source(lesson: &str) -> LessonSource {
    LessonSource::new(LessonId::new(lesson), format!("https://cdn.example/{lesson}.mp4"))
}

pub fn time(current_time: f64, duration: f64) -> MediaEvent {
    MediaEvent::TimeUpdate {
        current_time,
        duration,
    }
}

pub fn media_error() -> MediaEvent {
    MediaEvent::Error {
        message: "network".into(),
    }
}
