//! Classifier checkpoint loading (spec.md §4.D, §4.L).
//!
//! The checkpoint is a JSON file with two named layers, `dense` (the hidden
//! layer) and `dense_1` (the output layer) — the same layer names the
//! reference classifier checkpoint uses, kept so weights can be swapped in
//! without a conversion step.

use serde::Deserialize;

use crate::error::StageError;

#[derive(Debug, Clone, Deserialize)]
pub struct LayerWeights {
    /// `[in_features][out_features]` kernel matrix.
    pub kernel: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckpointFile {
    pub dense: LayerWeights,
    pub dense_1: LayerWeights,
}

impl CheckpointFile {
    pub fn load(path: &std::path::Path) -> Result<Self, StageError> {
        let text = std::fs::read_to_string(path).map_err(|_| StageError::InputMissing {
            stage: "checkpoint",
            path: path.to_path_buf(),
        })?;
        serde_json::from_str(&text).map_err(|e| StageError::ParseError {
            stage: "checkpoint",
            detail: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_layers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        std::fs::write(
            &path,
            r#"{"dense": {"kernel": [[0.1, 0.2]], "bias": [0.0, 0.0]},
                "dense_1": {"kernel": [[0.5], [0.5]], "bias": [0.0]}}"#,
        )
        .unwrap();
        let checkpoint = CheckpointFile::load(&path).unwrap();
        assert_eq!(checkpoint.dense.bias.len(), 2);
        assert_eq!(checkpoint.dense_1.kernel.len(), 2);
    }
}
