//! Word-level Markov chain training and generation library.
//!
//! This crate provides the model behind a synthetic title generator:
//! - A fixed-order Markov chain over whitespace-delimited tokens
//! - Weighted random sampling with an injectable random source
//! - JSON persistence with empty-model recovery for missing files
//! - A parallel trainer that shards work units across threads and
//!   funnels every update into one shared model under a single lock
//!
//! Fetching the training text (scraping, file reading) is deliberately
//! out of scope: callers hand the trainer a `fetch` function that turns
//! a work unit into tokenized documents.

/// Core chain model and generation logic.
pub mod model;

/// Work partitioning and parallel training coordination.
pub mod trainer;

pub use model::chain::{ChainError, ChainModel, Document, END_TOKEN, START_TOKEN};
pub use trainer::{BoxError, TrainError, partition, run_parallel_training};
