//! Per-chain pipeline state (spec.md §3 "Pipeline state", §6 state-file
//! schema, §4.E atomic persistence).

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::registry::StageId;
use crate::error::StageError;

/// `.{chain}.dpam_state.json`: which stages have completed, and the error
/// message recorded for any stage that failed (spec.md §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineState {
    /// Ordered set of completed stage ids, serialized as their numeric id.
    pub completed_stages: Vec<u32>,
    /// `stage_id -> error message`, for stages that ran and failed
    /// (non-fatal: the driver continued).
    pub failed_stages: BTreeMap<u32, String>,
    /// When this state was last written to disk (set on every [`Self::persist`]
    /// call); `None` for a state that has never been persisted yet. Lets an
    /// operator tell a stalled chain from one that simply hasn't run
    /// recently without cross-referencing file mtimes.
    pub updated_at: Option<DateTime<Utc>>,
}

impl PipelineState {
    /// Load an existing state file, or a fresh empty state if none exists
    /// (spec.md §4.E: "a fresh run with no state starts from stage 1").
    pub fn load_or_fresh(path: &Path) -> Result<Self, StageError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|_| StageError::InputMissing {
            stage: "state",
            path: path.to_path_buf(),
        })?;
        serde_json::from_str(&text).map_err(|e| StageError::ParseError {
            stage: "state",
            detail: e.to_string(),
        })
    }

    pub fn is_completed(&self, stage: StageId) -> bool {
        self.completed_stages.contains(&stage.as_u32())
    }

    pub fn mark_completed(&mut self, stage: StageId) {
        let id = stage.as_u32();
        if !self.completed_stages.contains(&id) {
            self.completed_stages.push(id);
            self.completed_stages.sort_unstable();
        }
        self.failed_stages.remove(&id);
    }

    pub fn mark_failed(&mut self, stage: StageId, message: impl Into<String>) {
        self.failed_stages.insert(stage.as_u32(), message.into());
    }

    /// Atomic write: temp file in the same directory, then rename
    /// (spec.md §4.E "state file writes are atomic").
    pub fn persist(&mut self, path: &Path) -> Result<(), StageError> {
        self.updated_at = Some(Utc::now());
        let json = serde_json::to_vec_pretty(self).map_err(|e| StageError::ParseError {
            stage: "state",
            detail: e.to_string(),
        })?;
        let tmp_path = path.with_extension("json.tmp");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|_| StageError::InputMissing {
                stage: "state",
                path: parent.to_path_buf(),
            })?;
        }
        std::fs::write(&tmp_path, &json).map_err(|_| StageError::InputMissing {
            stage: "state",
            path: tmp_path.clone(),
        })?;
        std::fs::rename(&tmp_path, path).map_err(|_| StageError::InputMissing {
            stage: "state",
            path: path.to_path_buf(),
        })?;
        Ok(())
    }
}
