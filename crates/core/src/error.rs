use thiserror::Error;

use crate::model::{ProgressError, SettingsError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
}
