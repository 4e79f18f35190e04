use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use rs_markov_core::{BoxError, ChainModel, Document, run_parallel_training};

/// rs-markov — train a word-level Markov chain on title corpora and
/// sample novel titles from it.
#[derive(Parser, Debug)]
#[command(name = "rs-markov")]
#[command(about = "Markov chain title generator")]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Train the chain on one or more corpus files.
	///
	/// Each input file is one work unit; every non-blank line is one
	/// document, tokenized by splitting on runs of whitespace. Units are
	/// processed in parallel and the updated model is written back once
	/// all workers have finished. Any unreadable input aborts the whole
	/// run without touching the model file.
	Train {
		/// Corpus files, one title per line
		#[arg(required = true)]
		inputs: Vec<PathBuf>,

		/// Model file to update (created if missing)
		#[arg(short, long, default_value = "markov.json")]
		model: PathBuf,

		/// Chain order, ignored when the model file already exists
		#[arg(short, long, default_value_t = 4)]
		order: usize,

		/// Number of parallel workers (defaults to the CPU count)
		#[arg(short, long)]
		workers: Option<usize>,
	},

	/// Generate titles from a trained model.
	Generate {
		/// Model file to sample from
		#[arg(short, long, default_value = "markov.json")]
		model: PathBuf,

		/// Number of titles to generate
		#[arg(short, default_value_t = 1)]
		n: usize,
	},
}

/// Splits one corpus line into tokens (runs of whitespace as boundaries).
fn tokenize(line: &str) -> Document {
	line.split_whitespace().map(str::to_owned).collect()
}

/// Reads one corpus file into tokenized documents, skipping blank lines.
fn read_documents(path: &PathBuf) -> Result<Vec<Document>, BoxError> {
	let contents = fs::read_to_string(path)?;
	Ok(contents
		.lines()
		.map(tokenize)
		.filter(|document| !document.is_empty())
		.collect())
}

fn train(inputs: Vec<PathBuf>, model_path: PathBuf, order: usize, workers: Option<usize>) -> anyhow::Result<()> {
	let model = ChainModel::load(&model_path, order)
		.with_context(|| format!("cannot load markov chain from {}", model_path.display()))?;
	if model.order() != order {
		warn!(
			requested = order,
			actual = model.order(),
			"existing model keeps its own order"
		);
	}

	let workers = workers.unwrap_or_else(num_cpus::get).max(1);
	info!(units = inputs.len(), workers, order = model.order(), "training");

	let model = run_parallel_training(model, &inputs, workers, read_documents)
		.context("parallel training failed")?;

	model
		.save(&model_path)
		.with_context(|| format!("cannot save markov chain to {}", model_path.display()))?;
	info!(contexts = model.len(), model = %model_path.display(), "model saved");
	Ok(())
}

fn generate(model_path: PathBuf, n: usize) -> anyhow::Result<()> {
	let model = ChainModel::load(&model_path, 1)
		.with_context(|| format!("cannot load markov chain from {}", model_path.display()))?;
	if model.is_empty() {
		anyhow::bail!("model {} has no training data", model_path.display());
	}

	let mut rng = rand::rng();
	for _ in 0..n {
		let tokens = model
			.generate_sequence(&mut rng)
			.context("fail to generate tokens")?;
		println!("{}", tokens.join(" "));
	}
	Ok(())
}

fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.init();

	match Cli::parse().command {
		Commands::Train { inputs, model, order, workers } => train(inputs, model, order, workers),
		Commands::Generate { model, n } => generate(model, n),
	}
}
