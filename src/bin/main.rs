//! RSSVM Command Line Interface
//!
//! A command-line interface for training, evaluating, and using structured
//! SVM sequence labellers on labeled sequence files.

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{error, info, warn};
use rssvm::api::{TrainedModel, SSVM};
use rssvm::core::{Result, SSVMError, WeightInit};
use rssvm::data::{write_label_sequences, SequenceDataset};
use rssvm::persistence::SerializableModel;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "rssvm")]
#[command(about = "Structured output SVM trained with cutting planes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "RSSVM Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a new sequence labelling model
    Train(TrainArgs),
    /// Predict label sequences using a trained model
    Predict(PredictArgs),
    /// Evaluate a model on labeled sequences
    Evaluate(EvaluateArgs),
    /// Display model information
    Info(InfoArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Training data file (labeled sequence format)
    #[arg(long)]
    data: PathBuf,

    /// Output model file
    #[arg(short, long)]
    output: PathBuf,

    /// Number of hidden states (defaults to the largest label + 1)
    #[arg(short, long)]
    states: Option<usize>,

    /// Regularization parameter C
    #[arg(short = 'C', long, default_value = "1.0")]
    c: f64,

    /// Violation tolerance
    #[arg(short, long, default_value = "0.001")]
    precision: f64,

    /// Maximum number of QP solves
    #[arg(short, long, default_value = "1000")]
    max_iterations: usize,

    /// Skip constraints satisfied by at least this margin
    #[arg(long, default_value = "0.1", conflicts_with = "no_pruning")]
    prune_threshold: f64,

    /// Hand every constraint to every solve
    #[arg(long)]
    no_pruning: bool,

    /// Run the oracle calls of each sweep in parallel
    #[arg(long)]
    parallel: bool,

    /// Seed for the random weight initialisation
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Start from zero weights instead of random ones
    #[arg(long, conflicts_with = "seed")]
    zero_init: bool,

    /// Subtract the mean feature vector before training
    #[arg(long)]
    center: bool,
}

#[derive(Args)]
struct PredictArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Input data file
    #[arg(long)]
    data: PathBuf,

    /// Output predictions file (optional, prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Test data file
    #[arg(long)]
    data: PathBuf,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Evaluate(args) => evaluate_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn train_command(args: TrainArgs) -> Result<()> {
    info!("Training structured SVM model...");
    info!("Data file: {:?}", args.data);
    info!(
        "Parameters: C={}, precision={}, max_iter={}",
        args.c, args.precision, args.max_iterations
    );

    let dataset = SequenceDataset::from_file(&args.data)?;
    info!(
        "Loaded {} sequences ({} positions) with {} features",
        dataset.len(),
        dataset.n_positions(),
        dataset.n_features()
    );

    let weight_init = if args.zero_init {
        WeightInit::Zeros
    } else {
        WeightInit::Random { seed: args.seed }
    };
    let mut builder = SSVM::new()
        .with_c(args.c)
        .with_precision(args.precision)
        .with_max_iterations(args.max_iterations)
        .with_parallel(args.parallel)
        .with_weight_init(weight_init)
        .with_centering(args.center);
    builder = if args.no_pruning {
        builder.without_pruning()
    } else {
        builder.with_prune_threshold(args.prune_threshold)
    };

    let model = builder.train_from_file(&args.data, args.states)?;

    let info = model.info();
    if info.converged {
        info!("Training converged after {} iterations", info.iterations);
    } else {
        warn!(
            "Training stopped after {} iterations without converging",
            info.iterations
        );
    }
    info!("Objective: {:.6}", info.objective);
    info!(
        "Constraints: {} ({} support)",
        info.n_constraints, info.support_constraints
    );

    let serializable = SerializableModel::from_trained_model(&model);
    serializable.save_to_file(&args.output)?;
    info!("Model saved to: {:?}", args.output);

    // Quick evaluation on training data
    let metrics = model.evaluate_from_file(&args.data)?;
    info!(
        "Training exact match: {:.2}%, mean loss: {:.4}",
        metrics.exact_match_rate() * 100.0,
        metrics.mean_loss()
    );

    Ok(())
}

fn load_sequence_model(path: &Path) -> Result<(SerializableModel, TrainedModel)> {
    info!("Loading model from: {path:?}");
    let serializable_model = SerializableModel::load_from_file(path)?;
    let model = serializable_model.to_trained_model()?;
    if model.sequence_shape().is_none() {
        return Err(SSVMError::InvalidParameter(
            "Model was not trained on sequence data".to_string(),
        ));
    }
    Ok((serializable_model, model))
}

fn predict_command(args: PredictArgs) -> Result<()> {
    let (_, model) = load_sequence_model(&args.model)?;

    info!("Loading prediction data from: {:?}", args.data);
    let predictions = model.predict_from_file(&args.data)?;
    info!("Predicted {} sequences", predictions.len());

    if let Some(output_path) = args.output {
        let file = File::create(&output_path).map_err(SSVMError::IoError)?;
        let mut writer = BufWriter::new(file);
        write_label_sequences(&mut writer, &predictions)?;
        writer.flush()?;
        info!("Predictions saved to: {output_path:?}");
    } else {
        let stdout = io::stdout();
        let mut writer = stdout.lock();
        write_label_sequences(&mut writer, &predictions)?;
    }

    Ok(())
}

fn evaluate_command(args: EvaluateArgs) -> Result<()> {
    let (serializable_model, model) = load_sequence_model(&args.model)?;

    info!("Loading test data from: {:?}", args.data);
    let metrics = model.evaluate_from_file(&args.data)?;

    println!("=== Model Evaluation ===");
    serializable_model.print_summary();

    println!("\nTest Results:");
    println!("  Sequences:   {}", metrics.n_samples);
    println!("  Exact Match: {:.2}%", metrics.exact_match_rate() * 100.0);
    println!("  Mean Loss:   {:.4}", metrics.mean_loss());

    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let serializable_model = SerializableModel::load_from_file(&args.model)?;

    serializable_model.print_summary();

    println!("\nWeights:");
    let weights = &serializable_model.weights;
    let n_show = weights.len().min(10);
    for (i, &weight) in weights.iter().enumerate().take(n_show) {
        println!("  w{i}: {weight:.6}");
    }
    if weights.len() > n_show {
        println!("  ... ({} more)", weights.len() - n_show);
    }

    Ok(())
}
