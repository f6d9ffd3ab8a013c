//! Fitted K-Means model and the scale-then-predict pipeline

use std::fmt;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::artifacts::{read_artifact, write_artifact, SegmentationContext, FORMAT_VERSION};
use crate::data::FeatureVector;
use crate::error::SegmentError;

/// Index of a customer segment, drawn from the centroids of the fitted model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterLabel(usize);

impl ClusterLabel {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cluster {}", self.0)
    }
}

/// A prediction together with the values it was derived from
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentAssignment {
    pub label: ClusterLabel,
    /// Euclidean distance to the winning centroid in scaled space
    pub distance: f64,
    pub scaled: Array1<f64>,
}

/// On-disk form of a fitted K-Means model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansParams {
    pub format_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    pub centroids: Vec<Vec<f64>>,
    /// Within-cluster sum of squares on the training data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inertia: Option<f64>,
    /// Number of training customers assigned to each cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_sizes: Option<Vec<usize>>,
}

/// K-Means model with centroids in normalized space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "KMeansParams", into = "KMeansParams")]
pub struct KMeansModel {
    features: Option<Vec<String>>,
    centroids: Array2<f64>,
    inertia: Option<f64>,
    cluster_sizes: Option<Vec<usize>>,
}

impl TryFrom<KMeansParams> for KMeansModel {
    type Error = String;

    fn try_from(params: KMeansParams) -> Result<Self, Self::Error> {
        if params.format_version != FORMAT_VERSION {
            return Err(format!(
                "unsupported format_version {} (expected {})",
                params.format_version, FORMAT_VERSION
            ));
        }

        let n_clusters = params.centroids.len();
        let n_features = params.centroids.first().map(Vec::len).unwrap_or(0);
        if n_clusters == 0 || n_features == 0 {
            return Err("model has no centroids".to_string());
        }
        if let Some(i) = params.centroids.iter().position(|row| row.len() != n_features) {
            return Err(format!(
                "centroid {} has {} dimensions, expected {}",
                i,
                params.centroids[i].len(),
                n_features
            ));
        }

        let centroids = Array2::from_shape_vec(
            (n_clusters, n_features),
            params.centroids.into_iter().flatten().collect(),
        )
        .map_err(|e| e.to_string())?;

        let mut model = Self {
            features: None,
            centroids,
            inertia: params.inertia,
            cluster_sizes: None,
        };
        model.check_features(params.features)?;
        model.check_cluster_sizes(params.cluster_sizes)?;
        Ok(model)
    }
}

impl From<KMeansModel> for KMeansParams {
    fn from(model: KMeansModel) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            features: model.features,
            centroids: model.centroids.outer_iter().map(|row| row.to_vec()).collect(),
            inertia: model.inertia,
            cluster_sizes: model.cluster_sizes,
        }
    }
}

impl KMeansModel {
    pub fn new(centroids: Array2<f64>, features: Option<Vec<String>>) -> crate::Result<Self> {
        let to_invalid = |reason| SegmentError::ArtifactInvalid {
            artifact: "kmeans model",
            path: None,
            reason,
        };

        if centroids.nrows() == 0 || centroids.ncols() == 0 {
            return Err(to_invalid("model has no centroids".to_string()));
        }

        let mut model = Self {
            features: None,
            centroids,
            inertia: None,
            cluster_sizes: None,
        };
        model.check_features(features).map_err(to_invalid)?;
        Ok(model)
    }

    /// Attach training statistics reported alongside predictions
    pub fn with_training_stats(
        mut self,
        inertia: f64,
        cluster_sizes: Vec<usize>,
    ) -> crate::Result<Self> {
        self.check_cluster_sizes(Some(cluster_sizes))
            .map_err(|reason| SegmentError::ArtifactInvalid {
                artifact: "kmeans model",
                path: None,
                reason,
            })?;
        self.inertia = Some(inertia);
        Ok(self)
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        read_artifact("kmeans model", path)
    }

    pub fn save(&self, path: &Path) -> crate::Result<()> {
        write_artifact(path, self)
    }

    pub fn n_clusters(&self) -> usize {
        self.centroids.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.centroids.ncols()
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        self.features.as_deref()
    }

    pub fn centroids(&self) -> &Array2<f64> {
        &self.centroids
    }

    pub fn centroid(&self, label: ClusterLabel) -> ArrayView1<'_, f64> {
        self.centroids.row(label.index())
    }

    pub fn inertia(&self) -> Option<f64> {
        self.inertia
    }

    /// Cluster sizes on the training data, if the artifact recorded them
    pub fn cluster_sizes(&self) -> Option<&[usize]> {
        self.cluster_sizes.as_deref()
    }

    /// Every label this model can produce
    pub fn labels(&self) -> impl Iterator<Item = ClusterLabel> {
        (0..self.n_clusters()).map(ClusterLabel)
    }

    /// Predict cluster for a scaled data point
    pub fn predict(&self, features: &Array1<f64>) -> crate::Result<ClusterLabel> {
        self.assign(features).map(|assignment| assignment.label)
    }

    /// Find the nearest centroid. Ties go to the lowest index.
    pub fn assign(&self, features: &Array1<f64>) -> crate::Result<SegmentAssignment> {
        if features.len() != self.n_features() {
            return Err(SegmentError::Prediction(format!(
                "feature vector has {} dimensions, model expects {}",
                features.len(),
                self.n_features()
            )));
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(SegmentError::Prediction(
                "feature vector contains non-finite values".to_string(),
            ));
        }

        let mut min_distance_sq = f64::INFINITY;
        let mut closest_cluster = 0;

        for (cluster_idx, centroid) in self.centroids.outer_iter().enumerate() {
            let distance_sq = squared_distance(&features.view(), &centroid);
            if distance_sq < min_distance_sq {
                min_distance_sq = distance_sq;
                closest_cluster = cluster_idx;
            }
        }

        // Finite inputs far from every centroid can still overflow the squared sum
        if !min_distance_sq.is_finite() {
            return Err(SegmentError::Prediction(
                "distance to every centroid overflows".to_string(),
            ));
        }

        Ok(SegmentAssignment {
            label: ClusterLabel(closest_cluster),
            distance: min_distance_sq.sqrt(),
            scaled: features.clone(),
        })
    }

    fn check_features(&mut self, features: Option<Vec<String>>) -> Result<(), String> {
        if let Some(ref names) = features {
            if names.len() != self.n_features() {
                return Err(format!(
                    "{} feature names for {}-dimensional centroids",
                    names.len(),
                    self.n_features()
                ));
            }
        }
        if self.centroids.iter().any(|v| !v.is_finite()) {
            return Err("centroids contain non-finite values".to_string());
        }
        self.features = features;
        Ok(())
    }

    fn check_cluster_sizes(&mut self, sizes: Option<Vec<usize>>) -> Result<(), String> {
        if let Some(ref sizes) = sizes {
            if sizes.len() != self.n_clusters() {
                return Err(format!(
                    "{} cluster sizes for {} clusters",
                    sizes.len(),
                    self.n_clusters()
                ));
            }
        }
        self.cluster_sizes = sizes;
        Ok(())
    }
}

/// Scale a customer's features and assign the nearest segment
pub fn predict_segment(
    ctx: &SegmentationContext,
    features: &FeatureVector,
) -> crate::Result<ClusterLabel> {
    let scaled = ctx.scaler.transform_features(features)?;
    let label = ctx.model.predict(&scaled)?;
    debug!(%features, %label, "predicted segment");
    Ok(label)
}

/// Squared Euclidean distance between two points
fn squared_distance(point1: &ArrayView1<f64>, point2: &ArrayView1<f64>) -> f64 {
    point1
        .iter()
        .zip(point2.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
}
