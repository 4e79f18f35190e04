use std::collections::HashMap;

use rand::Rng;

use serde::{Deserialize, Serialize};

/// Represents a state in the Markov chain.
///
/// A `State` corresponds to a fixed window of `order` consecutive tokens
/// (`key`, stored space-joined) and stores all observed transitions from
/// this window to the next token.
///
/// Conceptually, this is a node in a Markov chain where outgoing edges
/// are weighted by their number of observations.
///
/// ## Responsibilities:
/// - Accumulate transition occurrences during training
/// - Sample the next token using weighted random sampling
///
/// ## Invariants
/// - All transitions belong to the same `key`
/// - Each transition occurrence count is strictly positive
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct State {
	/// Identifier of the state (space-joined context window).
	key: String,
	/// Outgoing transitions indexed by the next token.
	/// The value represents how many times this transition was observed.
	/// Example: { "coin" => 42, "$" => 3 }
	transitions: HashMap<String, usize>,
}

impl State {
	/// Creates a new empty state for the given context key.
	pub fn new(key: &str) -> Self {
		Self {
			key: key.to_owned(),
			transitions: HashMap::new(),
		}
	}

	/// Records an occurrence of a transition toward `next_token`.
	///
	/// - If the transition already exists, its occurrence count is increased.
	/// - Otherwise, a new transition is created with an initial count of 1.
	pub fn add_transition(&mut self, next_token: &str) {
		*self.transitions.entry(next_token.to_owned()).or_insert(0) += 1;
	}

	/// Samples the next token using weighted random sampling.
	///
	/// The probability of selecting a token is proportional to its
	/// occurrence count.
	///
	/// This method performs:
	/// - an O(n) scan over the transitions
	/// - a cumulative subtraction to select a bucket
	///
	/// Returns `None` if the state has no transitions.
	pub fn sample<R: Rng>(&self, rng: &mut R) -> Option<String> {
		if self.transitions.is_empty() {
			return None;
		}

		// Compute the total number of occurrences
		let total: usize = self.transitions.values().sum();
		if total == 0 {
			// Should not happen due to invariants, but kept for safety
			return None;
		}

		// Randomly select a token
		let mut r = rng.random_range(0..total);

		let mut fallback: Option<&String> = None;
		for (next_token, occurrence) in &self.transitions {
			if r < *occurrence {
				return Some(next_token.clone());
			}
			r -= occurrence;
			fallback = Some(next_token);
		}

		// Fallback: should not happen, but kept for safety.
		fallback.cloned()
	}
}
