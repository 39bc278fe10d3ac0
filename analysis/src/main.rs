//! `authorship` command-line tool.
//!
//! Describes and compares per-label feature distributions, draws comparison
//! figures, reports classification metrics for saved predictions, and scores
//! new texts with the hybrid classifier.
//!
//! Usage:
//!   authorship describe --data features.json --column perplexity
//!   authorship compare --data features.json --column perplexity --group-a human --group-b chatgpt
//!   authorship plot --data features.json --column perplexity --name Perplexity --mode hist --out figures/
//!   authorship report --predictions predictions.json
//!   authorship score --input texts.json --weights head.safetensors

use anyhow::Context;
use authorship_analysis::config::load_config;
use authorship_analysis::dataset::{load_predictions, load_score_inputs, ScoreInput, Table};
use authorship_analysis::describe::get_statistics_df;
use authorship_analysis::logging::init_logging;
use authorship_analysis::metrics::{classification_report, plot_confusion_matrix, print_metrics};
use authorship_analysis::plot::{
    plot_comparison, Canvas, JsonCanvas, PlotMode, PlotOptions, TextCanvas,
};
use authorship_analysis::ttest::compare_groups;
use authorship_core::AppConfig;
use authorship_model::{
    classify, probabilities, ClassifierHead, HfTextEncoder, HybridClassifier, Mode, TextEncoder,
};
use candle_core::Tensor;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "authorship",
    version,
    about = "Human vs AI authorship analysis and scoring"
)]
struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true, env = "AUTHORSHIP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Per-label count, mean, median, std, min, and max of one column.
    Describe {
        /// JSON table: an array of objects with a `label` key.
        #[arg(long)]
        data: PathBuf,

        #[arg(long)]
        column: String,
    },

    /// Welch's t-test between two labels on one column.
    Compare {
        #[arg(long)]
        data: PathBuf,

        #[arg(long)]
        column: String,

        #[arg(long)]
        group_a: String,

        #[arg(long)]
        group_b: String,

        /// Significance level for the verdict line.
        #[arg(long, default_value_t = 0.05)]
        alpha: f64,
    },

    /// Reference label against every other label, one figure each.
    Plot {
        #[arg(long)]
        data: PathBuf,

        #[arg(long)]
        column: String,

        /// Display name used in titles and on the x axis.
        #[arg(long)]
        name: String,

        #[arg(long, value_enum, default_value_t = ModeArg::Kde)]
        mode: ModeArg,

        /// Write figures as JSON files here instead of drawing to the terminal.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Overrides `analysis.bins`.
        #[arg(long)]
        bins: Option<usize>,

        /// Overrides `analysis.reference_label`.
        #[arg(long)]
        reference_label: Option<String>,
    },

    /// Accuracy, AUC, per-class report, and confusion matrix of predictions.
    Report {
        /// JSON array of `{label, predicted, probability}` objects.
        #[arg(long)]
        predictions: PathBuf,

        #[arg(long, default_value = "Confusion Matrix")]
        title: String,

        /// Write the confusion matrix figure as JSON here.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Score `{id, text, features}` inputs with the hybrid classifier.
    Score {
        #[arg(long)]
        input: PathBuf,

        /// Trained head weights (safetensors). Without them the head is random.
        #[arg(long)]
        weights: Option<PathBuf>,

        #[arg(long, default_value_t = 0.5)]
        threshold: f32,

        #[arg(long, default_value_t = 16)]
        batch_size: usize,

        /// Overrides `classifier.text_model_identifier`.
        #[arg(long)]
        model: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Kde,
    Hist,
}

impl From<ModeArg> for PlotMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Kde => PlotMode::Kde,
            ModeArg::Hist => PlotMode::Histogram,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    init_logging(&config.logging)?;
    if let Some(path) = &cli.config {
        info!(path = %path.display(), "Loaded configuration");
    }

    match cli.command {
        Commands::Describe { data, column } => {
            let table = load_table(&data)?;
            let stats = get_statistics_df(&table, &column)?;
            println!("{}", stats.to_table());
        }
        Commands::Compare {
            data,
            column,
            group_a,
            group_b,
            alpha,
        } => {
            let table = load_table(&data)?;
            let stats = get_statistics_df(&table, &column)?;
            let result = compare_groups(&stats, &group_a, &group_b)
                .with_context(|| format!("Welch's t-test of {group_a} vs {group_b} on {column}"))?;
            println!("{column}: {group_a} vs {group_b}: {result}");
            let verdict = if result.is_significant(alpha) {
                "significant"
            } else {
                "not significant"
            };
            println!("Difference in means is {verdict} at alpha = {alpha}");
        }
        Commands::Plot {
            data,
            column,
            name,
            mode,
            out,
            bins,
            reference_label,
        } => {
            let table = load_table(&data)?;
            let mut options = PlotOptions::from(&config.analysis);
            if let Some(bins) = bins {
                options.bins = bins;
            }
            if let Some(label) = reference_label {
                options.reference_label = label;
            }
            let mut canvas = open_canvas(out.as_deref())?;
            plot_comparison(&table, &column, &name, mode.into(), &options, canvas.as_mut())
                .with_context(|| format!("Failed to plot column {column}"))?;
        }
        Commands::Report {
            predictions,
            title,
            out,
        } => {
            let records = load_predictions(&predictions).with_context(|| {
                format!("Failed to load predictions from {}", predictions.display())
            })?;
            let y_true: Vec<i64> = records.iter().map(|r| r.label).collect();
            let y_pred: Vec<i64> = records.iter().map(|r| r.predicted).collect();
            let y_proba: Vec<f64> = records.iter().map(|r| r.probability).collect();

            print_metrics(&y_true, &y_pred, &y_proba)?;
            let labels = config.analysis.labels;
            println!("\n{}", classification_report(&y_true, &y_pred, labels)?);
            let mut canvas = open_canvas(out.as_deref())?;
            plot_confusion_matrix(&y_true, &y_pred, labels, &title, canvas.as_mut())?;
        }
        Commands::Score {
            input,
            weights,
            threshold,
            batch_size,
            model,
        } => {
            let mut config = config;
            if let Some(model) = model {
                config.classifier.text_model_identifier = model;
            }
            run_score(&config, &input, weights.as_deref(), threshold, batch_size).await?;
        }
    }

    Ok(())
}

fn load_table(path: &Path) -> anyhow::Result<Table> {
    Table::load_from_file(path)
        .with_context(|| format!("Failed to load table from {}", path.display()))
}

fn open_canvas(out: Option<&Path>) -> anyhow::Result<Box<dyn Canvas>> {
    Ok(match out {
        Some(dir) => Box::new(
            JsonCanvas::new(dir)
                .with_context(|| format!("Failed to create output directory {}", dir.display()))?,
        ),
        None => Box::new(TextCanvas::new(std::io::stdout())),
    })
}

async fn run_score(
    config: &AppConfig,
    input: &Path,
    weights: Option<&Path>,
    threshold: f32,
    batch_size: usize,
) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        anyhow::bail!("threshold {threshold} is outside [0, 1]");
    }
    if batch_size == 0 {
        anyhow::bail!("batch size must be positive");
    }

    let inputs = load_score_inputs(input)
        .with_context(|| format!("Failed to load inputs from {}", input.display()))?;
    if inputs.is_empty() {
        warn!(path = %input.display(), "No inputs to score");
        return Ok(());
    }

    let encoder = HfTextEncoder::load(&config.classifier, &config.encoder)
        .await
        .context("Failed to load text encoder")?;
    let head = match weights {
        Some(path) => ClassifierHead::load(
            path,
            encoder.hidden_size(),
            &config.classifier,
            encoder.device(),
        )
        .with_context(|| format!("Failed to load head weights from {}", path.display()))?,
        None => {
            warn!("No --weights given; scoring with an untrained classifier head");
            ClassifierHead::new_random(
                encoder.hidden_size(),
                &config.classifier,
                encoder.device(),
            )?
        }
    };
    let classifier = HybridClassifier::new(encoder, head)?;

    info!(inputs = inputs.len(), batch_size, "Scoring inputs");
    for chunk in inputs.chunks(batch_size) {
        let logits = score_batch(&classifier, chunk)?;
        let probs = probabilities(&logits)?;
        let predicted = classify(&probs, threshold)?;
        let logits = logits.to_vec1::<f32>().context("Failed to read logits")?;
        for (((item, logit), probability), predicted) in
            chunk.iter().zip(logits).zip(probs).zip(predicted)
        {
            let line = serde_json::json!({
                "id": item.id,
                "logit": logit,
                "probability": probability,
                "predicted": predicted,
            });
            println!("{line}");
        }
    }
    Ok(())
}

fn score_batch(
    classifier: &HybridClassifier<HfTextEncoder>,
    chunk: &[ScoreInput],
) -> anyhow::Result<Tensor> {
    let expected = classifier.head().num_features();
    if let Some(bad) = chunk.iter().find(|i| i.features.len() != expected) {
        anyhow::bail!(
            "input {} has {} features, classifier expects {expected}",
            bad.id,
            bad.features.len()
        );
    }

    let texts: Vec<&str> = chunk.iter().map(|i| i.text.as_str()).collect();
    let batch = classifier.encoder().tokenize(&texts)?;
    let flat: Vec<f32> = chunk.iter().flat_map(|i| i.features.iter().copied()).collect();
    let features = Tensor::from_vec(flat, (chunk.len(), expected), classifier.encoder().device())
        .context("Failed to build feature tensor")?;

    Ok(classifier.forward(
        &batch.input_ids,
        &batch.attention_mask,
        &features,
        Mode::Inference,
    )?)
}
