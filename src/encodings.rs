//! Encoding Tables
//!
//! Immutable name → integer-code mappings for crops, stages, and diseases,
//! plus the (crop, stage) → disease-list map. Loaded once at startup from
//! two JSON assets and read-only thereafter.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use rustc_hash::FxHashMap;
use serde::Deserialize;

/// On-disk shape of `encodings.json`.
#[derive(Debug, Deserialize)]
struct EncodingsDoc {
    crop: HashMap<String, i64>,
    stage: HashMap<String, i64>,
    disease: HashMap<String, i64>,
}

/// All lookup tables needed to vectorize a request.
///
/// Keys are stored lower-cased and whitespace-trimmed; callers are expected
/// to normalize with [`normalize_key`] before lookup.
pub struct EncodingTables {
    crop: FxHashMap<String, i64>,
    stage: FxHashMap<String, i64>,
    disease: FxHashMap<String, i64>,
    /// (crop, stage) → ordered disease names. A missing or empty entry both
    /// mean "no applicable diseases" for that pair.
    stage_diseases: FxHashMap<(String, String), Vec<String>>,
}

/// Trim and lower-case an identifier for table lookup.
pub fn normalize_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl EncodingTables {
    /// Load both assets from the model directory.
    ///
    /// Expects `encodings.json` (`{"crop": {...}, "stage": {...},
    /// "disease": {...}}`) and `stage_disease_map.json`
    /// (`{crop: {stage: [disease, ...]}}`). Any failure here must abort
    /// startup; the service never runs with partial tables.
    pub fn load(dir: &Path) -> Result<Self> {
        let enc_path = dir.join("encodings.json");
        let encodings = fs::read_to_string(&enc_path)
            .with_context(|| format!("Failed to read encodings file: {:?}", enc_path))?;

        let map_path = dir.join("stage_disease_map.json");
        let stage_map = fs::read_to_string(&map_path)
            .with_context(|| format!("Failed to read stage-disease map: {:?}", map_path))?;

        Self::from_json(&encodings, &stage_map)
    }

    /// Parse the two assets from JSON strings.
    pub fn from_json(encodings: &str, stage_map: &str) -> Result<Self> {
        let doc: EncodingsDoc = serde_json::from_str(encodings)
            .with_context(|| "Malformed encodings.json")?;

        ensure!(!doc.crop.is_empty(), "encodings.json has no crop entries");
        ensure!(!doc.stage.is_empty(), "encodings.json has no stage entries");
        ensure!(!doc.disease.is_empty(), "encodings.json has no disease entries");

        let nested: HashMap<String, HashMap<String, Vec<String>>> =
            serde_json::from_str(stage_map)
                .with_context(|| "Malformed stage_disease_map.json")?;

        let mut stage_diseases = FxHashMap::default();
        for (crop, stages) in nested {
            for (stage, diseases) in stages {
                stage_diseases.insert((normalize_key(&crop), normalize_key(&stage)), diseases);
            }
        }

        Ok(EncodingTables {
            crop: normalize_table(doc.crop),
            stage: normalize_table(doc.stage),
            disease: normalize_table(doc.disease),
            stage_diseases,
        })
    }

    /// Integer code for a crop name, if encoded.
    pub fn crop_code(&self, name: &str) -> Option<i64> {
        self.crop.get(name).copied()
    }

    /// Integer code for a growth-stage name, if encoded.
    pub fn stage_code(&self, name: &str) -> Option<i64> {
        self.stage.get(name).copied()
    }

    /// Integer code for a disease name, if encoded.
    pub fn disease_code(&self, name: &str) -> Option<i64> {
        self.disease.get(name).copied()
    }

    /// Ordered disease names tracked for a (crop, stage) pair.
    pub fn diseases_for(&self, crop: &str, stage: &str) -> Option<&[String]> {
        self.stage_diseases
            .get(&(crop.to_string(), stage.to_string()))
            .map(|v| v.as_slice())
    }

    /// Number of encoded diseases (startup logging).
    pub fn disease_count(&self) -> usize {
        self.disease.len()
    }

    /// Number of (crop, stage) pairs with a disease list (startup logging).
    pub fn mapping_count(&self) -> usize {
        self.stage_diseases.len()
    }
}

fn normalize_table(table: HashMap<String, i64>) -> FxHashMap<String, i64> {
    table
        .into_iter()
        .map(|(k, v)| (normalize_key(&k), v))
        .collect()
}
