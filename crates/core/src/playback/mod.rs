//! Playback state machine.
//!
//! `PlaybackMachine` is a pure transition table: every media event, caller
//! request and timer firing goes through [`PlaybackMachine::dispatch`], which
//! updates the state and returns the side effects the driver must perform.
//! It never performs I/O and never reads a clock.

mod effect;
mod input;
mod machine;
mod state;

pub use effect::PlaybackEffect;
pub use input::{AutoplayOutcome, LessonSource, MediaEvent, PlaybackInput};
pub use machine::PlaybackMachine;
pub use state::{MediaErrorKind, PlaybackState, PlaybackStatus, RetryStatus};
