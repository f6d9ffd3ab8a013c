//! SegmentForge: customer segment prediction from fitted artifacts
//!
//! This is the main entrypoint that loads the artifacts once and then runs either a
//! single prediction or an interactive session.

use std::io;
use std::process;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use segmentforge::{run_session, Args, SegmentationContext};
use tracing::{info, Level};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    init_logging(args.verbose);

    if args.verbose {
        println!("SegmentForge - Customer Segment Prediction");
        println!("==========================================\n");
    }

    // Without both artifacts no prediction can run, so stop before accepting input
    let ctx = match SegmentationContext::load_from(&args.scaler_path(), &args.model_path()) {
        Ok(ctx) => {
            println!("Models loaded successfully");
            ctx
        }
        Err(e) => {
            eprintln!("Model files could not be loaded: {}", e);
            eprintln!(
                "Place '{}' and '{}' in {}",
                args.scaler,
                args.model,
                args.artifact_dir.display()
            );
            process::exit(1);
        }
    };

    if args.interactive {
        let stdin = io::stdin();
        let summary = run_session(&ctx, stdin.lock(), &mut io::stdout())?;
        info!(
            predictions = summary.predictions,
            failures = summary.failures,
            "session finished"
        );
    } else {
        run_prediction_mode(&args, &ctx)?;
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

/// Run prediction mode for a single customer
fn run_prediction_mode(args: &Args, ctx: &SegmentationContext) -> Result<()> {
    let features = args.feature_vector()?;
    if args.verbose {
        println!("\nInput: {}", features);
    }

    let start_time = Instant::now();
    let assignment = match ctx.assign(&features) {
        Ok(assignment) => assignment,
        Err(e) => {
            eprintln!("Prediction failed: {}", e);
            process::exit(1);
        }
    };
    let elapsed = start_time.elapsed();

    let cluster = assignment.label;
    println!("The predicted customer segment is: {}", cluster);

    if !args.verbose {
        return Ok(());
    }

    println!("  Processing time: {:.3}ms", elapsed.as_secs_f64() * 1000.0);
    println!("\n{} details:", cluster);
    println!("  Distance to centroid (normalized): {:.3}", assignment.distance);
    if let Some(inertia) = ctx.model.inertia() {
        println!("  Within-cluster sum of squares (training): {:.2}", inertia);
    }

    let centroid = ctx.model.centroid(cluster).to_owned();
    let raw_centroid = ctx.scaler.inverse_transform(&centroid)?;
    for ((name, scaled), raw) in segmentforge::FEATURE_NAMES
        .iter()
        .zip(centroid.iter())
        .zip(raw_centroid.iter())
    {
        println!("  {:<18} centroid {:>8.2} (raw {:.1})", name, scaled, raw);
    }

    if let Some(sizes) = ctx.model.cluster_sizes() {
        let total: usize = sizes.iter().sum();
        let size = sizes[cluster.index()];
        let percentage = if total > 0 {
            size as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        println!(
            "  Size: {} customers ({:.1}% of training data)",
            size, percentage
        );
    }

    Ok(())
}
