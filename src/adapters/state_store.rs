//! JSON persistence of the live signal state between process runs.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::error::TraderError;
use crate::domain::signal::SignalState;

#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no state has been saved yet.
    pub fn load(&self) -> Result<Option<SignalState>, TraderError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no saved signal state");
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let state: SignalState = serde_json::from_str(&content)?;
        info!(
            path = %self.path.display(),
            bars_seen = state.bars_seen(),
            "resumed signal state"
        );
        Ok(Some(state))
    }

    /// Written to a sibling temp file first, then renamed over the target.
    pub fn save(&self, state: &SignalState) -> Result<(), TraderError> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "saved signal state");
        Ok(())
    }
}
