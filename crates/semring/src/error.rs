//! Error types for pipeline runs.

use crate::{ConfigError, Stage};
use std::io;
use thiserror::Error;

/// Errors that can end a pipeline run.
///
/// The channel protocol itself never fails; these cover setup and the
/// threads that drive it.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The configuration was rejected before any thread started.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The OS refused to start a stage thread.
    #[error("failed to spawn {stage} thread: {source}")]
    Spawn {
        /// The stage whose thread could not start.
        stage: Stage,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A stage thread panicked.
    ///
    /// Returned as soon as the panicking stage exits; peers still blocked on
    /// a channel are left detached.
    #[error("{stage} thread panicked")]
    StagePanicked {
        /// The stage that panicked.
        stage: Stage,
    },
}

impl PipelineError {
    /// Returns the stage involved, if the error came from one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::InvalidConfig(_) => None,
            Self::Spawn { stage, .. } | Self::StagePanicked { stage } => Some(*stage),
        }
    }
}
