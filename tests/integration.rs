//! Integration tests for SegmentForge

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use segmentforge::{
    predict_segment, FeatureVector, KMeansModel, SegmentError, SegmentationContext, StandardScaler,
    FEATURE_BOUNDS, FEATURE_NAMES, MODEL_FILE, N_FEATURES, SCALER_FILE,
};
use tempfile::TempDir;

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn load_fixture() -> SegmentationContext {
    SegmentationContext::load(&fixture_dir()).unwrap()
}

/// Copy the named fixture files into a fresh temporary directory
fn copy_fixtures(files: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for file in files {
        std::fs::copy(fixture_dir().join(file), dir.path().join(file)).unwrap();
    }
    dir
}

#[test]
fn test_pinned_example_customer() {
    let ctx = load_fixture();
    let features = FeatureVector {
        age: 35,
        income: 50_000,
        total_spending: 2_000,
        num_web_purchases: 10,
        num_store_purchases: 5,
        num_web_visits_month: 8,
        recency: 30,
    };

    let label = predict_segment(&ctx, &features).unwrap();
    assert_eq!(label.index(), 2);
    assert_eq!(label.to_string(), "Cluster 2");
}

#[test]
fn test_customers_near_each_centroid() {
    let ctx = load_fixture();

    let budget = FeatureVector::from_values([51, 35_200, 180, 3, 4, 7, 52]);
    let affluent = FeatureVector::from_values([50, 75_100, 1_200, 5, 10, 3, 46]);

    assert_eq!(ctx.predict(&budget).unwrap().index(), 0);
    assert_eq!(ctx.predict(&affluent).unwrap().index(), 1);
}

#[test]
fn test_prediction_is_deterministic() {
    let ctx = load_fixture();
    let features = FeatureVector::default();

    let first = ctx.predict(&features).unwrap();
    let second = ctx.predict(&features).unwrap();
    assert_eq!(first, second);

    let assignment = ctx.assign(&features).unwrap();
    assert_eq!(assignment.label, first);
    assert_eq!(assignment, ctx.assign(&features).unwrap());
}

#[test]
fn test_in_bounds_customers_get_fitted_labels() {
    let ctx = load_fixture();
    let labels: Vec<_> = ctx.model.labels().collect();
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..1000 {
        let mut values = [0u32; N_FEATURES];
        for (value, &(min, max)) in values.iter_mut().zip(FEATURE_BOUNDS.iter()) {
            *value = rng.gen_range(min..=max);
        }
        let features = FeatureVector::from_values(values);
        assert!(features.validate().is_ok());

        let label = ctx.predict(&features).unwrap();
        assert!(labels.contains(&label), "{} is not a fitted label", label);
    }
}

#[test]
fn test_boundary_ages() {
    let ctx = load_fixture();

    for age in [18, 100] {
        let features = FeatureVector {
            age,
            ..FeatureVector::default()
        };
        assert!(features.validate().is_ok());
        let label = ctx.predict(&features).unwrap();
        assert!(label.index() < ctx.model.n_clusters());
    }
}

#[test]
fn test_field_order_matters() {
    let ctx = load_fixture();
    let features = FeatureVector::default();

    let raw = features.to_array();
    let mut permuted = raw;
    permuted.swap(0, 1);

    let scaled = ctx.scaler.transform(&raw).unwrap();
    let scaled_permuted = ctx.scaler.transform(&permuted).unwrap();
    assert_ne!(scaled, scaled_permuted);

    // Feeding Income into the Age slot lands in a different segment
    assert_eq!(ctx.model.predict(&scaled).unwrap().index(), 2);
    assert_eq!(ctx.model.predict(&scaled_permuted).unwrap().index(), 0);
}

#[test]
fn test_missing_model_artifact() {
    let dir = copy_fixtures(&[SCALER_FILE]);

    match SegmentationContext::load(dir.path()) {
        Err(SegmentError::ArtifactNotFound { artifact, path, .. }) => {
            assert_eq!(artifact, "kmeans model");
            assert_eq!(path, dir.path().join(MODEL_FILE));
        }
        other => panic!("expected ArtifactNotFound, got {:?}", other),
    }
}

#[test]
fn test_missing_scaler_artifact() {
    let dir = copy_fixtures(&[MODEL_FILE]);

    let err = SegmentationContext::load(dir.path()).unwrap_err();
    assert!(matches!(err, SegmentError::ArtifactNotFound { .. }));
    assert!(err.to_string().contains("scaler"));
    assert!(err.to_string().contains(SCALER_FILE));
}

#[test]
fn test_scaler_schema_drift() {
    let dir = TempDir::new().unwrap();
    let fixture = load_fixture();

    // Same parameters, but the scaler claims Recency was fitted first
    let mut names: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
    names.rotate_right(1);
    let drifted = StandardScaler::new(
        Some(names),
        fixture.scaler.mean().to_vec(),
        fixture.scaler.scale().to_vec(),
    )
    .unwrap();
    let unnamed_model = KMeansModel::new(fixture.model.centroids().clone(), None).unwrap();
    drifted.save(&dir.path().join(SCALER_FILE)).unwrap();
    unnamed_model.save(&dir.path().join(MODEL_FILE)).unwrap();

    let ctx = SegmentationContext::load(dir.path()).unwrap();
    let result = ctx.predict(&FeatureVector::default());
    assert!(matches!(result, Err(SegmentError::TransformMismatch { .. })));
}

#[test]
fn test_saved_artifacts_reload_identically() {
    let fixture = load_fixture();
    let dir = TempDir::new().unwrap();

    fixture.scaler.save(&dir.path().join(SCALER_FILE)).unwrap();
    fixture.model.save(&dir.path().join(MODEL_FILE)).unwrap();
    let reloaded = SegmentationContext::load(dir.path()).unwrap();

    assert_eq!(reloaded.scaler, fixture.scaler);
    assert_eq!(reloaded.model, fixture.model);
    assert_eq!(reloaded.model.cluster_sizes(), Some(&[412, 287, 541][..]));
    assert_eq!(reloaded.model.inertia(), Some(5123.4));
}

#[test]
fn test_training_stats_survive_save() {
    let fixture = load_fixture();
    let dir = TempDir::new().unwrap();

    let model = KMeansModel::new(fixture.model.centroids().clone(), None)
        .unwrap()
        .with_training_stats(812.0, vec![5, 3, 2])
        .unwrap();
    model.save(&dir.path().join(MODEL_FILE)).unwrap();

    let reloaded = KMeansModel::load(&dir.path().join(MODEL_FILE)).unwrap();
    assert_eq!(reloaded.inertia(), Some(812.0));
    assert_eq!(reloaded.cluster_sizes(), Some(&[5, 3, 2][..]));
    assert!(reloaded.feature_names().is_none());
}
