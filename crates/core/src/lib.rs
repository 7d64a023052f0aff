#![forbid(unsafe_code)]

pub mod error;
pub mod hierarchy;
pub mod model;
pub mod playback;
pub mod time;

pub use error::Error;
pub use hierarchy::{Hierarchy, build};
pub use time::Clock;
