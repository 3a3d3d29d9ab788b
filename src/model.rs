//! Scoring Model
//!
//! A pre-trained dense feed-forward network deserialized from a JSON
//! artifact. The rest of the system treats it as an opaque function from an
//! 8-element feature vector to a probability in [0,1]; all shape checking
//! happens once at load time so `score` itself cannot fail.

use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

/// Fixed feature-vector layout:
/// [crop_code, stage_code, disease_code, ndvi, ndwi, min_temp, max_temp, humidity]
pub const FEATURE_DIM: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Sigmoid,
    Identity,
}

impl Activation {
    fn apply(self, z: f32) -> f32 {
        match self {
            Activation::Relu => z.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-z).exp()),
            Activation::Identity => z,
        }
    }
}

/// One dense layer. `weights[j]` holds the input weights of output unit `j`.
#[derive(Debug, Deserialize)]
pub struct LayerSpec {
    pub weights: Vec<Vec<f32>>,
    pub biases: Vec<f32>,
    pub activation: Activation,
}

/// On-disk shape of `model.json`.
#[derive(Debug, Deserialize)]
pub struct ModelSpec {
    pub input_dim: usize,
    pub layers: Vec<LayerSpec>,
}

/// The loaded model. Pure and side-effect-free; one inference call per
/// candidate disease, no batching.
pub struct RiskModel {
    layers: Vec<LayerSpec>,
}

impl RiskModel {
    /// Load and validate the artifact. Any failure is fatal to startup.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file: {:?}", path))?;
        let spec: ModelSpec = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed model file: {:?}", path))?;
        Self::from_spec(spec)
    }

    /// Validate layer shapes: the declared input width must be
    /// [`FEATURE_DIM`], every layer must chain onto the previous one, and
    /// the final layer must be a single sigmoid unit so the output is
    /// pinned to [0,1].
    pub fn from_spec(spec: ModelSpec) -> Result<Self> {
        ensure!(
            spec.input_dim == FEATURE_DIM,
            "model expects {} inputs, this service produces {}",
            spec.input_dim,
            FEATURE_DIM
        );
        ensure!(!spec.layers.is_empty(), "model has no layers");

        let mut width = spec.input_dim;
        for (i, layer) in spec.layers.iter().enumerate() {
            ensure!(!layer.weights.is_empty(), "layer {} has no units", i);
            for (j, row) in layer.weights.iter().enumerate() {
                ensure!(
                    row.len() == width,
                    "layer {} unit {} has {} weights, expected {}",
                    i,
                    j,
                    row.len(),
                    width
                );
            }
            ensure!(
                layer.biases.len() == layer.weights.len(),
                "layer {} has {} biases for {} units",
                i,
                layer.biases.len(),
                layer.weights.len()
            );
            width = layer.weights.len();
        }

        ensure!(width == 1, "model output width is {}, expected 1", width);
        ensure!(
            spec.layers.last().map(|l| l.activation) == Some(Activation::Sigmoid),
            "model output layer must be sigmoid to yield a probability"
        );

        Ok(RiskModel { layers: spec.layers })
    }

    /// Forward pass. Returns a probability in [0,1].
    pub fn score(&self, features: &[f32; FEATURE_DIM]) -> f32 {
        let mut current = features.to_vec();
        for layer in &self.layers {
            let mut next = Vec::with_capacity(layer.weights.len());
            for (row, bias) in layer.weights.iter().zip(&layer.biases) {
                let z: f32 = bias + row.iter().zip(&current).map(|(w, x)| w * x).sum::<f32>();
                next.push(layer.activation.apply(z));
            }
            current = next;
        }
        current[0]
    }
}
