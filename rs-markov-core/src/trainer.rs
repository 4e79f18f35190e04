use std::ops::Range;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::debug;

use crate::model::chain::{ChainModel, Document};

/// Error type accepted from document sources, so callers can plug in
/// whatever fetch implementation they have.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by [`run_parallel_training`].
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
	/// The worker count must be a positive integer.
	#[error("worker count must be at least 1")]
	NoWorkers,

	/// A document source failed. Fatal to the whole run: a partial
	/// training set is worse than no update at all.
	#[error("failed to fetch unit {unit}")]
	Fetch {
		unit: usize,
		#[source]
		source: BoxError,
	},

	/// A worker panicked while holding the model lock.
	#[error("model lock poisoned")]
	Poisoned,

	/// A worker panicked outside the model lock.
	#[error("training worker panicked")]
	WorkerPanic,
}

/// Partitions `n` work units into `workers` contiguous shards.
///
/// Shard sizes are `n / workers`, with the first `n % workers` shards one
/// unit larger, so sizes differ by at most 1 and concatenating the shards
/// in order reproduces `0..n` exactly. The partition is deterministic and
/// independent of runtime timing.
///
/// `workers` must be at least 1.
pub fn partition(n: usize, workers: usize) -> Vec<Range<usize>> {
	let base = n / workers;
	let remainder = n % workers;

	let mut shards = Vec::with_capacity(workers);
	let mut start = 0;
	for i in 0..workers {
		let len = base + usize::from(i < remainder);
		shards.push(start..start + len);
		start += len;
	}
	shards
}

/// Trains `model` over `units` with `workers` parallel workers.
///
/// The units are split into contiguous shards via [`partition`], one worker
/// per shard. Each worker calls `fetch` for every unit in its shard and
/// feeds the returned documents to [`ChainModel::add`] under a single
/// shared lock, so every add executes atomically against the shared
/// frequency map. `add` is commutative over counts, so the worker
/// interleaving does not affect the final model.
///
/// The coordinator blocks until every worker has finished (fan-in), then
/// hands the updated model back to the caller, who is responsible for
/// persisting it exactly once.
///
/// # Errors
/// - [`TrainError::NoWorkers`] if `workers` is zero.
/// - [`TrainError::Fetch`] if any unit's document retrieval fails. The
///   first failure wins, remaining workers stop at the next unit boundary,
///   and no partial result is returned.
pub fn run_parallel_training<U, F>(
	model: ChainModel,
	units: &[U],
	workers: usize,
	fetch: F,
) -> Result<ChainModel, TrainError>
where
	U: Sync,
	F: Fn(&U) -> Result<Vec<Document>, BoxError> + Sync,
{
	if workers == 0 {
		return Err(TrainError::NoWorkers);
	}

	let model = Mutex::new(model);
	let failed = AtomicBool::new(false);

	let outcome: Result<(), TrainError> = thread::scope(|scope| {
		let mut handles = Vec::with_capacity(workers);
		for shard in partition(units.len(), workers) {
			let model = &model;
			let failed = &failed;
			let fetch = &fetch;

			handles.push(scope.spawn(move || -> Result<(), TrainError> {
				for unit in shard {
					// Another worker already failed, stop early
					if failed.load(Ordering::Relaxed) {
						break;
					}

					let documents = match fetch(&units[unit]) {
						Ok(documents) => documents,
						Err(source) => {
							failed.store(true, Ordering::Relaxed);
							return Err(TrainError::Fetch { unit, source });
						}
					};

					let mut chain = model.lock().map_err(|_| TrainError::Poisoned)?;
					for document in &documents {
						chain.add(document);
					}
					drop(chain);

					debug!(unit, documents = documents.len(), "trained unit");
				}
				Ok(())
			}));
		}

		// Fan-in barrier: wait for every worker, keep the first error.
		let mut first_error = None;
		for handle in handles {
			let result = handle.join().unwrap_or(Err(TrainError::WorkerPanic));
			if let Err(e) = result {
				first_error.get_or_insert(e);
			}
		}
		match first_error {
			Some(e) => Err(e),
			None => Ok(()),
		}
	});
	outcome?;

	model.into_inner().map_err(|_| TrainError::Poisoned)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn doc(words: &[&str]) -> Document {
		words.iter().map(|w| (*w).to_owned()).collect()
	}

	fn assert_partition_properties(n: usize, workers: usize) {
		let shards = partition(n, workers);
		assert_eq!(shards.len(), workers);

		// Contiguous, in order, covering 0..n exactly once
		let flattened: Vec<usize> = shards.iter().cloned().flatten().collect();
		assert_eq!(flattened, (0..n).collect::<Vec<_>>());

		// Sizes differ by at most 1
		let sizes: Vec<usize> = shards.iter().map(|s| s.len()).collect();
		let min = sizes.iter().min().unwrap();
		let max = sizes.iter().max().unwrap();
		assert!(max - min <= 1, "shard sizes {sizes:?} differ by more than 1");
	}

	#[test]
	fn partition_covers_units_exactly_once() {
		for (n, workers) in [(0, 1), (0, 4), (1, 1), (5, 2), (7, 3), (8, 4), (3, 8), (100, 7)] {
			assert_partition_properties(n, workers);
		}
	}

	#[test]
	fn partition_puts_larger_shards_first() {
		let shards = partition(7, 3);
		assert_eq!(shards, vec![0..3, 3..5, 5..7]);
	}

	#[test]
	fn rejects_zero_workers() {
		let model = ChainModel::new(2).unwrap();
		let result = run_parallel_training(model, &[0usize], 0, |_| Ok(Vec::new()));
		assert!(matches!(result, Err(TrainError::NoWorkers)));
	}

	#[test]
	fn parallel_training_matches_sequential_adds() {
		let units: Vec<Vec<Document>> = vec![
			vec![doc(&["bitcoin", "to", "the", "moon"])],
			vec![doc(&["the", "moon", "is", "far"]), doc(&["buy", "the", "dip"])],
			vec![],
			vec![doc(&["sell", "everything"])],
		];

		let mut expected = ChainModel::new(2).unwrap();
		for documents in &units {
			for document in documents {
				expected.add(document);
			}
		}

		let trained = run_parallel_training(
			ChainModel::new(2).unwrap(),
			&units,
			3,
			|unit| Ok(unit.clone()),
		)
		.unwrap();

		assert_eq!(trained, expected);
	}

	#[test]
	fn more_workers_than_units_is_fine() {
		let units: Vec<Vec<Document>> = vec![vec![doc(&["a", "b"])]];
		let trained = run_parallel_training(
			ChainModel::new(1).unwrap(),
			&units,
			8,
			|unit| Ok(unit.clone()),
		)
		.unwrap();
		assert!(!trained.is_empty());
	}

	#[test]
	fn fetch_failure_aborts_the_run() {
		let units: Vec<usize> = (0..10).collect();
		let result = run_parallel_training(ChainModel::new(2).unwrap(), &units, 2, |unit| {
			if *unit == 7 {
				Err("page unavailable".into())
			} else {
				Ok(vec![doc(&["ok"])])
			}
		});

		match result {
			Err(TrainError::Fetch { unit, .. }) => assert_eq!(unit, 7),
			other => panic!("expected fetch error, got {other:?}"),
		}
	}

	#[test]
	fn training_an_existing_model_accumulates() {
		let mut model = ChainModel::new(2).unwrap();
		model.add(&doc(&["old", "title"]));
		let before = model.len();

		let units: Vec<Vec<Document>> = vec![vec![doc(&["new", "title"])]];
		let trained = run_parallel_training(model, &units, 1, |unit| Ok(unit.clone())).unwrap();
		assert!(trained.len() > before);
	}
}
