//! Loading the fitted scaler and clustering model into a shared context

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::data::{FeatureVector, StandardScaler, FEATURE_NAMES};
use crate::error::SegmentError;
use crate::model::{predict_segment, ClusterLabel, KMeansModel, SegmentAssignment};

/// Version written into, and required from, every artifact file
pub const FORMAT_VERSION: u32 = 1;

pub const SCALER_FILE: &str = "scaler.json";
pub const MODEL_FILE: &str = "kmeans_model.json";

/// Deserialize one artifact. Open and read failures map to `ArtifactNotFound`,
/// content that does not parse or validate maps to `ArtifactInvalid`.
pub(crate) fn read_artifact<T: DeserializeOwned>(
    artifact: &'static str,
    path: &Path,
) -> crate::Result<T> {
    let not_found = |source: std::io::Error| SegmentError::ArtifactNotFound {
        artifact,
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(not_found)?;

    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        if e.is_io() {
            not_found(e.into())
        } else {
            SegmentError::ArtifactInvalid {
                artifact,
                path: Some(path.to_path_buf()),
                reason: e.to_string(),
            }
        }
    })
}

pub(crate) fn write_artifact<T: Serialize>(path: &Path, value: &T) -> crate::Result<()> {
    let to_write_error = |source: std::io::Error| SegmentError::ArtifactWrite {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(to_write_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| to_write_error(e.into()))?;
    writer.flush().map_err(to_write_error)
}

/// The two fitted artifacts, loaded once and shared read-only by every prediction
#[derive(Debug, Clone)]
pub struct SegmentationContext {
    pub scaler: StandardScaler,
    pub model: KMeansModel,
}

impl SegmentationContext {
    /// Build a context from already loaded artifacts, checking they agree on the feature schema
    pub fn new(scaler: StandardScaler, model: KMeansModel) -> crate::Result<Self> {
        let schema_error = |reason| SegmentError::ArtifactInvalid {
            artifact: "kmeans model",
            path: None,
            reason,
        };

        match (scaler.feature_names(), model.feature_names()) {
            (Some(scaler_names), Some(model_names)) if scaler_names != model_names => {
                return Err(schema_error(format!(
                    "model features [{}] differ from scaler features [{}]",
                    model_names.join(", "),
                    scaler_names.join(", ")
                )));
            }
            (None, Some(model_names))
                if !model_names.iter().map(String::as_str).eq(FEATURE_NAMES) =>
            {
                return Err(schema_error(format!(
                    "model features [{}] differ from [{}]",
                    model_names.join(", "),
                    FEATURE_NAMES.join(", ")
                )));
            }
            (None, None) => {
                warn!("artifacts record no feature names; only the feature count will be checked");
            }
            _ => {}
        }

        if scaler.n_features() != model.n_features() {
            return Err(schema_error(format!(
                "model centroids have {} dimensions but the scaler produces {}",
                model.n_features(),
                scaler.n_features()
            )));
        }

        Ok(Self { scaler, model })
    }

    /// Load `scaler.json` and `kmeans_model.json` from `dir`
    pub fn load(dir: &Path) -> crate::Result<Self> {
        Self::load_from(&dir.join(SCALER_FILE), &dir.join(MODEL_FILE))
    }

    pub fn load_from(scaler_path: &Path, model_path: &Path) -> crate::Result<Self> {
        let scaler = StandardScaler::load(scaler_path)?;
        info!(
            path = %scaler_path.display(),
            features = scaler.n_features(),
            "loaded scaler"
        );

        let model = KMeansModel::load(model_path)?;
        info!(
            path = %model_path.display(),
            clusters = model.n_clusters(),
            "loaded kmeans model"
        );

        Self::new(scaler, model)
    }

    pub fn predict(&self, features: &FeatureVector) -> crate::Result<ClusterLabel> {
        predict_segment(self, features)
    }

    /// Predict and keep the intermediate values for reporting
    pub fn assign(&self, features: &FeatureVector) -> crate::Result<SegmentAssignment> {
        let scaled = self.scaler.transform_features(features)?;
        self.model.assign(&scaled)
    }
}
