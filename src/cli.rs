//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;

use crate::artifacts::{MODEL_FILE, SCALER_FILE};
use crate::data::{FeatureVector, FEATURE_NAMES, N_FEATURES};

/// Predict which customer segment a new customer belongs to
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding the fitted artifacts
    #[arg(long, default_value = ".")]
    pub artifact_dir: PathBuf,

    /// File name of the fitted scaler inside the artifact directory
    #[arg(long, default_value = SCALER_FILE)]
    pub scaler: String,

    /// File name of the fitted K-Means model inside the artifact directory
    #[arg(long, default_value = MODEL_FILE)]
    pub model: String,

    /// Age in years
    #[arg(long, default_value_t = 35, value_parser = clap::value_parser!(u32).range(18..=100))]
    pub age: u32,

    /// Annual income
    #[arg(
        long,
        default_value_t = 50_000,
        value_parser = clap::value_parser!(u32).range(0..=200_000)
    )]
    pub income: u32,

    /// Total spending
    #[arg(long, default_value_t = 2_000, value_parser = clap::value_parser!(u32).range(0..=50_000))]
    pub total_spending: u32,

    /// Number of web purchases
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub num_web_purchases: u32,

    /// Number of store purchases
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub num_store_purchases: u32,

    /// Number of web visits per month
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub num_web_visits: u32,

    /// Recency (days since last purchase)
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(0..=365))]
    pub recency: u32,

    /// All seven values as a comma-separated string, overriding the individual flags.
    /// Example: --predict "35,50000,2000,10,5,8,30"
    #[arg(short, long)]
    pub predict: Option<String>,

    /// Load the artifacts once, then predict one customer per line read from stdin
    #[arg(short, long)]
    pub interactive: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn scaler_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.scaler)
    }

    pub fn model_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.model)
    }

    /// The customer described on the command line, bounds-checked
    pub fn feature_vector(&self) -> anyhow::Result<FeatureVector> {
        if let Some(ref predict_str) = self.predict {
            return parse_feature_values(predict_str);
        }

        let features = FeatureVector {
            age: self.age,
            income: self.income,
            total_spending: self.total_spending,
            num_web_purchases: self.num_web_purchases,
            num_store_purchases: self.num_store_purchases,
            num_web_visits_month: self.num_web_visits,
            recency: self.recency,
        };
        features.validate()?;
        Ok(features)
    }
}

/// Parse seven comma-separated values in fitted order and check their bounds
pub fn parse_feature_values(input: &str) -> anyhow::Result<FeatureVector> {
    let parts: Vec<&str> = input.split(',').map(str::trim).collect();
    if parts.len() != N_FEATURES {
        anyhow::bail!(
            "Expected {} comma-separated values ({}), got {}",
            N_FEATURES,
            FEATURE_NAMES.join(","),
            parts.len()
        );
    }

    let mut values = [0u32; N_FEATURES];
    for ((slot, part), name) in values.iter_mut().zip(&parts).zip(FEATURE_NAMES) {
        *slot = part
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid {} value: {}", name, part))?;
    }

    let features = FeatureVector::from_values(values);
    features.validate()?;
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_form() {
        let args = Args::try_parse_from(["segmentforge"]).unwrap();
        assert_eq!(args.feature_vector().unwrap(), FeatureVector::default());
        assert_eq!(args.scaler_path(), PathBuf::from("./scaler.json"));
        assert_eq!(args.model_path(), PathBuf::from("./kmeans_model.json"));
    }

    #[test]
    fn test_flag_bounds_are_enforced() {
        assert!(Args::try_parse_from(["segmentforge", "--age", "17"]).is_err());
        assert!(Args::try_parse_from(["segmentforge", "--age", "101"]).is_err());
        assert!(Args::try_parse_from(["segmentforge", "--recency", "366"]).is_err());
        assert!(Args::try_parse_from(["segmentforge", "--income", "-5"]).is_err());

        let args =
            Args::try_parse_from(["segmentforge", "--age", "100", "--income", "200000"]).unwrap();
        let features = args.feature_vector().unwrap();
        assert_eq!(features.age, 100);
        assert_eq!(features.income, 200_000);
    }

    #[test]
    fn test_predict_overrides_flags() {
        let args = Args::try_parse_from([
            "segmentforge",
            "--age",
            "50",
            "--predict",
            "18, 0, 0, 0, 0, 0, 0",
        ])
        .unwrap();
        assert_eq!(args.feature_vector().unwrap().values(), [18, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_parse_feature_values() {
        let features = parse_feature_values("35,50000,2000,10,5,8,30").unwrap();
        assert_eq!(features, FeatureVector::default());

        assert!(parse_feature_values("35,50000,2000").is_err());
        assert!(parse_feature_values("35,abc,2000,10,5,8,30").is_err());
        assert!(parse_feature_values("35,50000,2000,10,5,8,400").is_err());
        assert!(parse_feature_values("17,50000,2000,10,5,8,30").is_err());
    }
}
