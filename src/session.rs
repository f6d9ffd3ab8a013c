//! Interactive prediction session over a loaded context
//!
//! Each input line is one "Predict Segment" action: seven comma-separated values,
//! or an empty line to predict for the default customer. `quit` ends the session.

use std::io::{self, BufRead, Write};

use tracing::warn;

use crate::artifacts::SegmentationContext;
use crate::cli::parse_feature_values;
use crate::data::{FeatureVector, FEATURE_NAMES};

/// Outcome counts for one session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub predictions: usize,
    pub failures: usize,
}

/// Run predictions until `quit` or end of input
pub fn run_session<R: BufRead, W: Write>(
    ctx: &SegmentationContext,
    mut input: R,
    output: &mut W,
) -> io::Result<SessionSummary> {
    let mut summary = SessionSummary::default();

    writeln!(
        output,
        "Enter {} (comma-separated), an empty line for defaults, or 'quit'.",
        FEATURE_NAMES.join(",")
    )?;

    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                summary.failures += 1;
                writeln!(output, "Invalid input: {}", e)?;
                continue;
            }
        };
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        let features = if line.is_empty() {
            Ok(FeatureVector::default())
        } else {
            parse_feature_values(line)
        };

        let features = match features {
            Ok(features) => features,
            Err(e) => {
                summary.failures += 1;
                writeln!(output, "Invalid input: {}", e)?;
                continue;
            }
        };

        match ctx.predict(&features) {
            Ok(label) => {
                summary.predictions += 1;
                writeln!(output, "The predicted customer segment is: {}", label)?;
            }
            Err(e) => {
                summary.failures += 1;
                warn!(error = %e, "prediction failed");
                writeln!(output, "Prediction failed: {}", e)?;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{StandardScaler, N_FEATURES};
    use crate::model::KMeansModel;
    use ndarray::Array2;
    use std::io::Cursor;

    fn test_context() -> SegmentationContext {
        let scaler =
            StandardScaler::new(None, vec![0.0; N_FEATURES], vec![1.0; N_FEATURES]).unwrap();
        let mut centroids = Array2::zeros((2, N_FEATURES));
        centroids[[1, 0]] = 60.0;
        let model = KMeansModel::new(centroids, None).unwrap();
        SegmentationContext::new(scaler, model).unwrap()
    }

    #[test]
    fn test_session_predicts_each_line() {
        let ctx = test_context();
        let input = Cursor::new("20,0,0,0,0,0,0\n90,0,0,0,0,0,0\n");
        let mut output = Vec::new();

        let summary = run_session(&ctx, input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();

        assert_eq!(summary, SessionSummary { predictions: 2, failures: 0 });
        assert!(text.contains("segment is: Cluster 0"));
        assert!(text.contains("segment is: Cluster 1"));
    }

    #[test]
    fn test_session_survives_bad_input() {
        let ctx = test_context();
        let input = Cursor::new("not numbers\n\n17,0,0,0,0,0,0\nquit\n20,0,0,0,0,0,0\n");
        let mut output = Vec::new();

        let summary = run_session(&ctx, input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();

        // The empty line predicts for the default customer; input after quit is ignored
        assert_eq!(summary, SessionSummary { predictions: 1, failures: 2 });
        assert_eq!(text.matches("Invalid input").count(), 2);
    }

    #[test]
    fn test_session_survives_non_utf8_line() {
        let ctx = test_context();
        let input = Cursor::new(b"20,0,0,0,0,0,0\n\xff\xfe\n90,0,0,0,0,0,0\n".to_vec());
        let mut output = Vec::new();

        let summary = run_session(&ctx, input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();

        assert_eq!(summary, SessionSummary { predictions: 2, failures: 1 });
        assert_eq!(text.matches("Invalid input").count(), 1);
        assert!(text.contains("segment is: Cluster 1"));
    }
}
