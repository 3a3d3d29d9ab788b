//! Risk Scorer
//!
//! The core pipeline: validate a request against the encoding tables, build
//! one feature vector per candidate disease, invoke the model, convert the
//! probability to a rounded percentage and a discrete band, and rank the
//! results descending.
//!
//! Fail-fast: the first error aborts the whole request. There is no
//! partial-results policy and no retry anywhere in this path.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encodings::{normalize_key, EncodingTables};
use crate::model::{RiskModel, FEATURE_DIM};

/// One prediction request. Crop and stage are normalized (trim + lowercase)
/// before any lookup; the five environmental readings are passed to the
/// model uninspected — there is no declared valid range.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskRequest {
    pub crop: String,
    pub stage: String,
    pub ndvi: f32,
    pub ndwi: f32,
    pub min_temp: f32,
    pub max_temp: f32,
    pub humidity: f32,
}

/// Qualitative band derived from the risk percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Scored risk for a single disease.
#[derive(Debug, Clone, Serialize)]
pub struct DiseaseRisk {
    pub disease: String,
    /// In [0,100], rounded to 2 decimal places.
    pub percentage: f64,
    pub level: RiskLevel,
}

/// Request-path failures. The first three are caused by the request; the
/// last means the stage-disease map names a disease the encoding table does
/// not know — a broken asset, surfaced distinctly so operators can see it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RiskError {
    #[error("Unknown crop: {0}")]
    UnknownCrop(String),

    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    #[error("No diseases mapped for crop='{crop}', stage='{stage}'")]
    NoDiseaseMapping { crop: String, stage: String },

    #[error("Disease '{0}' missing from encodings.json")]
    MissingDiseaseEncoding(String),
}

/// Band thresholds: `< 20 → low`, `< 40 → medium`, otherwise `high`.
/// Inclusive-lower, exclusive-upper; the top band is unbounded.
pub fn risk_band(percentage: f64) -> RiskLevel {
    if percentage < 20.0 {
        RiskLevel::Low
    } else if percentage < 40.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Orchestrates validation, feature construction, inference, and ranking
/// for one request. Holds the process-wide read-only state; safe to call
/// from any number of concurrent request handlers.
pub struct RiskScorer {
    tables: EncodingTables,
    model: RiskModel,
}

impl RiskScorer {
    pub fn new(tables: EncodingTables, model: RiskModel) -> Self {
        RiskScorer { tables, model }
    }

    /// Score every disease tracked for the request's crop/stage pair and
    /// return them ranked descending by percentage, stable on input order
    /// for ties.
    pub fn predict(&self, request: &RiskRequest) -> Result<Vec<DiseaseRisk>, RiskError> {
        let crop = normalize_key(&request.crop);
        let stage = normalize_key(&request.stage);

        let crop_code = self
            .tables
            .crop_code(&crop)
            .ok_or_else(|| RiskError::UnknownCrop(crop.clone()))?;
        let stage_code = self
            .tables
            .stage_code(&stage)
            .ok_or_else(|| RiskError::UnknownStage(stage.clone()))?;

        let diseases = self
            .tables
            .diseases_for(&crop, &stage)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| RiskError::NoDiseaseMapping {
                crop: crop.clone(),
                stage: stage.clone(),
            })?;

        // Duplicates in the mapping are scored as given, not deduplicated.
        let mut results = Vec::with_capacity(diseases.len());
        for disease in diseases {
            let disease_code = self
                .tables
                .disease_code(disease)
                .ok_or_else(|| RiskError::MissingDiseaseEncoding(disease.clone()))?;

            let features: [f32; FEATURE_DIM] = [
                crop_code as f32,
                stage_code as f32,
                disease_code as f32,
                request.ndvi,
                request.ndwi,
                request.min_temp,
                request.max_temp,
                request.humidity,
            ];

            let probability = self.model.score(&features);
            let percentage = (f64::from(probability) * 100.0 * 100.0).round() / 100.0;

            results.push(DiseaseRisk {
                disease: disease.clone(),
                percentage,
                level: risk_band(percentage),
            });
        }

        // Stable sort: equal percentages keep the stage-disease map's order.
        results.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));

        Ok(results)
    }
}
