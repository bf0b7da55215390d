//! Fixed feed-forward classifier (spec.md §4.L, stage 16).
//!
//! Architecture is frozen by the spec: 13 input features -> dense(64, ReLU)
//! -> dense(2) -> softmax, output `classifier_prob = softmax[1]`
//! ("probability of a correct assignment"). Weights are loaded once from a
//! named checkpoint (layers `dense` / `dense_1`, spec.md §4.L) and shared
//! read-only across chains.

use ndarray::{Array1, Array2};

use crate::error::StageError;
use crate::refdata::checkpoint::{CheckpointFile, LayerWeights};

/// Number of input features stage 15 produces per (domain, template) pair.
pub const NUM_FEATURES: usize = 13;
const HIDDEN_UNITS: usize = 64;
const OUTPUT_UNITS: usize = 2;

/// Loaded, ready-to-evaluate classifier weights.
#[derive(Debug, Clone)]
pub struct Classifier {
    hidden_kernel: Array2<f32>,
    hidden_bias: Array1<f32>,
    output_kernel: Array2<f32>,
    output_bias: Array1<f32>,
}

impl Classifier {
    /// Build from a loaded checkpoint, validating the frozen architecture's
    /// dimensions.
    pub fn from_checkpoint(checkpoint: &CheckpointFile) -> Result<Self, StageError> {
        let hidden_kernel = to_matrix(&checkpoint.dense, NUM_FEATURES, HIDDEN_UNITS, "dense")?;
        let hidden_bias = to_vector(&checkpoint.dense.bias, HIDDEN_UNITS, "dense")?;
        let output_kernel =
            to_matrix(&checkpoint.dense_1, HIDDEN_UNITS, OUTPUT_UNITS, "dense_1")?;
        let output_bias = to_vector(&checkpoint.dense_1.bias, OUTPUT_UNITS, "dense_1")?;
        Ok(Self {
            hidden_kernel,
            hidden_bias,
            output_kernel,
            output_bias,
        })
    }

    /// Evaluate one feature row, returning `softmax[1]`.
    ///
    /// Deterministic float32 arithmetic throughout, per spec.md §4.L's
    /// "must reproduce reference outputs to <=1e-6 per row" requirement —
    /// no float64 roundtrip that could shift low-order bits.
    pub fn predict(&self, features: &[f32; NUM_FEATURES]) -> f64 {
        let input = Array1::from_vec(features.to_vec());
        let hidden = (input.dot(&self.hidden_kernel) + &self.hidden_bias).mapv(relu);
        let logits = hidden.dot(&self.output_kernel) + &self.output_bias;
        softmax(&logits)[1] as f64
    }
}

fn relu(x: f32) -> f32 {
    x.max(0.0)
}

fn softmax(logits: &Array1<f32>) -> Array1<f32> {
    let max = logits.iter().copied().fold(f32::MIN, f32::max);
    let exp: Array1<f32> = logits.mapv(|x| (x - max).exp());
    let sum: f32 = exp.sum();
    exp / sum
}

fn to_matrix(
    layer: &LayerWeights,
    in_features: usize,
    out_features: usize,
    name: &'static str,
) -> Result<Array2<f32>, StageError> {
    if layer.kernel.len() != in_features {
        return Err(StageError::InvariantViolation(format!(
            "{name} kernel has {} input rows, expected {in_features}",
            layer.kernel.len()
        )));
    }
    let mut flat = Vec::with_capacity(in_features * out_features);
    for row in &layer.kernel {
        if row.len() != out_features {
            return Err(StageError::InvariantViolation(format!(
                "{name} kernel row has {} columns, expected {out_features}",
                row.len()
            )));
        }
        flat.extend_from_slice(row);
    }
    Array2::from_shape_vec((in_features, out_features), flat)
        .map_err(|e| StageError::InvariantViolation(format!("{name} kernel shape error: {e}")))
}

fn to_vector(bias: &[f32], len: usize, name: &'static str) -> Result<Array1<f32>, StageError> {
    if bias.len() != len {
        return Err(StageError::InvariantViolation(format!(
            "{name} bias has {} entries, expected {len}",
            bias.len()
        )));
    }
    Ok(Array1::from_vec(bias.to_vec()))
}
