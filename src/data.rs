//! Customer feature vectors and the fitted standard scaler

use std::fmt;
use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::artifacts::{read_artifact, write_artifact, FORMAT_VERSION};
use crate::error::SegmentError;

/// Number of features the scaler and model were fitted on
pub const N_FEATURES: usize = 7;

/// Column names in the order the artifacts were fitted on
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "Age",
    "Income",
    "Total_spending",
    "NumWebPurchases",
    "NumStorePurchases",
    "NumWebVisitsMonth",
    "Recency",
];

/// Inclusive (min, max) bounds per feature, same order as `FEATURE_NAMES`
pub const FEATURE_BOUNDS: [(u32, u32); N_FEATURES] = [
    (18, 100),
    (0, 200_000),
    (0, 50_000),
    (0, 100),
    (0, 100),
    (0, 100),
    (0, 365),
];

/// Attributes of a single customer, in fitted order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureVector {
    pub age: u32,
    pub income: u32,
    pub total_spending: u32,
    pub num_web_purchases: u32,
    pub num_store_purchases: u32,
    pub num_web_visits_month: u32,
    /// Days since last purchase
    pub recency: u32,
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            age: 35,
            income: 50_000,
            total_spending: 2_000,
            num_web_purchases: 10,
            num_store_purchases: 5,
            num_web_visits_month: 8,
            recency: 30,
        }
    }
}

impl FeatureVector {
    pub fn from_values(values: [u32; N_FEATURES]) -> Self {
        Self {
            age: values[0],
            income: values[1],
            total_spending: values[2],
            num_web_purchases: values[3],
            num_store_purchases: values[4],
            num_web_visits_month: values[5],
            recency: values[6],
        }
    }

    pub fn values(&self) -> [u32; N_FEATURES] {
        [
            self.age,
            self.income,
            self.total_spending,
            self.num_web_purchases,
            self.num_store_purchases,
            self.num_web_visits_month,
            self.recency,
        ]
    }

    /// Raw values as floats, ready for the scaler
    pub fn to_array(&self) -> [f64; N_FEATURES] {
        self.values().map(f64::from)
    }

    /// Check every field against its declared bounds.
    ///
    /// This belongs to the input layer; the inference pipeline does not call it.
    pub fn validate(&self) -> crate::Result<()> {
        for ((&field, &(min, max)), value) in FEATURE_NAMES
            .iter()
            .zip(FEATURE_BOUNDS.iter())
            .zip(self.values())
        {
            if value < min || value > max {
                return Err(SegmentError::InvalidInput {
                    field,
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in FEATURE_NAMES.iter().zip(self.values()).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}

/// On-disk form of a fitted scaler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerParams {
    pub format_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Per-feature standardization fitted offline: `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScalerParams", into = "ScalerParams")]
pub struct StandardScaler {
    features: Option<Vec<String>>,
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl TryFrom<ScalerParams> for StandardScaler {
    type Error = String;

    fn try_from(params: ScalerParams) -> Result<Self, Self::Error> {
        if params.format_version != FORMAT_VERSION {
            return Err(format!(
                "unsupported format_version {} (expected {})",
                params.format_version, FORMAT_VERSION
            ));
        }
        if params.mean.is_empty() {
            return Err("scaler has no features".to_string());
        }
        if params.mean.len() != params.scale.len() {
            return Err(format!(
                "mean has {} entries but scale has {}",
                params.mean.len(),
                params.scale.len()
            ));
        }
        if let Some(ref names) = params.features {
            if names.len() != params.mean.len() {
                return Err(format!(
                    "{} feature names for {} fitted features",
                    names.len(),
                    params.mean.len()
                ));
            }
        }
        if let Some(i) = params.mean.iter().position(|m| !m.is_finite()) {
            return Err(format!("mean[{}] is not finite", i));
        }
        if let Some(i) = params.scale.iter().position(|s| !s.is_finite() || *s <= 0.0) {
            return Err(format!("scale[{}] must be finite and positive", i));
        }

        Ok(Self {
            features: params.features,
            mean: Array1::from(params.mean),
            scale: Array1::from(params.scale),
        })
    }
}

impl From<StandardScaler> for ScalerParams {
    fn from(scaler: StandardScaler) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            features: scaler.features,
            mean: scaler.mean.to_vec(),
            scale: scaler.scale.to_vec(),
        }
    }
}

impl StandardScaler {
    pub fn new(
        features: Option<Vec<String>>,
        mean: Vec<f64>,
        scale: Vec<f64>,
    ) -> crate::Result<Self> {
        Self::try_from(ScalerParams {
            format_version: FORMAT_VERSION,
            features,
            mean,
            scale,
        })
        .map_err(|reason| SegmentError::ArtifactInvalid {
            artifact: "scaler",
            path: None,
            reason,
        })
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        read_artifact("scaler", path)
    }

    pub fn save(&self, path: &Path) -> crate::Result<()> {
        write_artifact(path, self)
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Feature names recorded at fit time, if the artifact carries them
    pub fn feature_names(&self) -> Option<&[String]> {
        self.features.as_deref()
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }

    /// Scale a raw vector. Only the feature count is checked.
    pub fn transform(&self, raw: &[f64]) -> crate::Result<Array1<f64>> {
        if raw.len() != self.n_features() {
            return Err(SegmentError::TransformMismatch {
                expected: self.expected_schema(),
                found: (0..raw.len()).map(|i| format!("x{}", i)).collect(),
            });
        }

        let scaled = (&Array1::from(raw.to_vec()) - &self.mean) / &self.scale;
        if let Some(i) = scaled.iter().position(|v| !v.is_finite()) {
            return Err(SegmentError::Prediction(format!(
                "scaled value for feature {} is not finite",
                self.expected_schema()[i]
            )));
        }
        Ok(scaled)
    }

    /// Scale a customer's features, checking names and order when the scaler recorded them
    pub fn transform_features(&self, features: &FeatureVector) -> crate::Result<Array1<f64>> {
        let matches = match self.features {
            Some(ref names) => names.iter().map(String::as_str).eq(FEATURE_NAMES.iter().copied()),
            None => self.n_features() == N_FEATURES,
        };
        if !matches {
            return Err(SegmentError::TransformMismatch {
                expected: self.expected_schema(),
                found: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            });
        }

        self.transform(&features.to_array())
    }

    /// Map a scaled vector back to raw units
    pub fn inverse_transform(&self, scaled: &Array1<f64>) -> crate::Result<Array1<f64>> {
        if scaled.len() != self.n_features() {
            return Err(SegmentError::Prediction(format!(
                "cannot invert a {}-dimensional vector with a {}-feature scaler",
                scaled.len(),
                self.n_features()
            )));
        }
        Ok(scaled * &self.scale + &self.mean)
    }

    fn expected_schema(&self) -> Vec<String> {
        match self.features {
            Some(ref names) => names.clone(),
            None => (0..self.n_features()).map(|i| format!("x{}", i)).collect(),
        }
    }
}
