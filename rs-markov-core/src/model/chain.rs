use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use rand::Rng;

use serde::{Deserialize, Serialize};

use super::state::State;

/// Sentinel token prepended `order` times to every document before training.
/// Never part of the real vocabulary.
pub const START_TOKEN: &str = "^";

/// Sentinel token appended once to every document before training.
/// Sampling it terminates a generation loop.
pub const END_TOKEN: &str = "$";

/// A training document: the whitespace-split tokens of one input title.
pub type Document = Vec<String>;

/// Errors produced by [`ChainModel`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
	/// The model order must be a positive integer.
	#[error("order must be at least 1, got {0}")]
	InvalidOrder(usize),

	/// `generate` was called with a context whose length differs from the order.
	#[error("context length {got} does not match model order {expected}")]
	ContextLength { expected: usize, got: usize },

	/// The requested context was never observed during training.
	/// There is no fallback distribution, so the caller must treat this
	/// as fatal for the current generation attempt.
	#[error("unknown context {0:?}")]
	UnknownContext(String),

	/// The persisted model bytes are malformed.
	#[error("malformed model data: {0}")]
	Decode(#[from] serde_json::Error),

	/// Reading or writing the persisted model failed.
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

/// Fixed-order Markov chain over whitespace-delimited tokens.
///
/// The `ChainModel` maps every observed window of `order` consecutive
/// tokens to a frequency table of the tokens that followed it, and
/// samples next tokens with probability proportional to those counts.
///
/// # Responsibilities
/// - Accumulate transition counts from training documents
/// - Sample the next token for a given context window
/// - Generate whole token sequences between the START and END sentinels
/// - Round-trip through a self-describing JSON encoding
///
/// # Invariants
/// - `order` is always >= 1 and immutable for the model's lifetime
/// - Each state in `states` corresponds to a unique window of `order` tokens
/// - All state transitions have occurrence counts >= 1; no state is stored
///   with an empty transition table
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChainModel {
	/// The order of the chain (number of tokens in the context window).
	order: usize, // must be >= 1

	/// Mapping from a space-joined context window to its corresponding state.
	states: HashMap<String, State>,
}

/// Joins a context window into a state key.
///
/// Tokens come from whitespace splitting and therefore contain no
/// whitespace themselves, so a single-space join is unambiguous.
fn context_key(context: &[String]) -> String {
	context.join(" ")
}

impl ChainModel {
	/// Creates a new empty chain of the given order.
	///
	/// # Errors
	/// Returns [`ChainError::InvalidOrder`] if `order` is zero.
	pub fn new(order: usize) -> Result<Self, ChainError> {
		if order == 0 {
			return Err(ChainError::InvalidOrder(order));
		}
		Ok(Self { order, states: HashMap::new() })
	}

	/// Returns the order of the chain.
	pub fn order(&self) -> usize {
		self.order
	}

	/// Returns the number of distinct context windows observed so far.
	pub fn len(&self) -> usize {
		self.states.len()
	}

	/// Returns `true` if the model has never been trained.
	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	/// Adds one training document to the chain.
	///
	/// The document is padded with `order` START sentinels and terminated
	/// with one END sentinel, then every `(context, next)` pair inside the
	/// padded sequence increments its transition count.
	///
	/// # Notes
	/// - An empty document degrades gracefully: it records exactly the
	///   all-START to END transition.
	/// - Not safe for concurrent invocation against the same instance
	///   without external synchronization (see [`crate::trainer`]).
	pub fn add(&mut self, document: &[String]) {
		let mut padded: Vec<String> = Vec::with_capacity(document.len() + self.order + 1);
		padded.extend(std::iter::repeat_n(START_TOKEN.to_owned(), self.order));
		padded.extend(document.iter().cloned());
		padded.push(END_TOKEN.to_owned());

		// For each (context, next) pair in the padded sequence
		for window in padded.windows(self.order + 1) {
			let (context, next) = window.split_at(self.order);
			let key = context_key(context);
			let state = self.states.entry(key.clone()).or_insert_with(|| State::new(&key));
			state.add_transition(&next[0]);
		}
	}

	/// Samples the next token for the given context window.
	///
	/// The probability of each candidate is proportional to its recorded
	/// occurrence count. Pass a seeded RNG to make sampling reproducible.
	///
	/// # Errors
	/// - [`ChainError::ContextLength`] if `context` is not exactly `order` tokens.
	/// - [`ChainError::UnknownContext`] if the window was never observed
	///   during training.
	pub fn generate<R: Rng>(&self, context: &[String], rng: &mut R) -> Result<String, ChainError> {
		if context.len() != self.order {
			return Err(ChainError::ContextLength { expected: self.order, got: context.len() });
		}

		let key = context_key(context);
		let Some(state) = self.states.get(&key) else {
			return Err(ChainError::UnknownContext(key));
		};

		// A stored state always has at least one transition, kept for safety
		state.sample(rng).ok_or(ChainError::UnknownContext(key))
	}

	/// Generates a complete token sequence.
	///
	/// Starts from a window of `order` START sentinels and repeatedly
	/// samples the next token from the last `order` tokens, stopping once
	/// the most recently appended token is the END sentinel. The returned
	/// document excludes both sentinels.
	///
	/// # Errors
	/// Propagates any [`ChainError::UnknownContext`] from sampling. Training
	/// guarantees every context reachable from START has a transition, so an
	/// error here means the model is empty or corrupted; it is surfaced, not
	/// masked.
	pub fn generate_sequence<R: Rng>(&self, rng: &mut R) -> Result<Document, ChainError> {
		let mut tokens: Vec<String> = vec![START_TOKEN.to_owned(); self.order];

		loop {
			let context = &tokens[tokens.len() - self.order..];
			let next = self.generate(context, rng)?;
			let done = next == END_TOKEN;
			tokens.push(next);
			if done {
				break;
			}
		}

		Ok(tokens[self.order..tokens.len() - 1].to_vec())
	}

	/// Serializes the chain to a self-describing JSON byte stream.
	pub fn to_bytes(&self) -> Result<Vec<u8>, ChainError> {
		Ok(serde_json::to_vec(self)?)
	}

	/// Reconstructs a chain from a byte stream produced by [`Self::to_bytes`].
	///
	/// # Errors
	/// - [`ChainError::Decode`] if the bytes are not a valid encoded model.
	/// - [`ChainError::InvalidOrder`] if the encoded order is zero.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
		let model: Self = serde_json::from_slice(bytes)?;
		if model.order == 0 {
			return Err(ChainError::InvalidOrder(0));
		}
		Ok(model)
	}

	/// Loads a persisted chain, or creates an empty one of the given order.
	///
	/// A missing file is the normal "never trained" case and yields an empty
	/// model. An existing file wins over `order`: the model keeps the order
	/// it was trained with.
	///
	/// # Errors
	/// - [`ChainError::Decode`] if the file exists but is malformed.
	/// - [`ChainError::Io`] for any other read failure.
	pub fn load<P: AsRef<Path>>(path: P, order: usize) -> Result<Self, ChainError> {
		match fs::read(&path) {
			Ok(bytes) => Self::from_bytes(&bytes),
			Err(e) if e.kind() == ErrorKind::NotFound => Self::new(order),
			Err(e) => Err(e.into()),
		}
	}

	/// Persists the chain to the given path, overwriting any previous model.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ChainError> {
		fs::write(path, self.to_bytes()?)?;
		Ok(())
	}
}
