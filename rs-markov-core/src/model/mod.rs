//! Top-level module for the Markov chain model.
//!
//! This module provides the word-level chain used for title generation:
//! - Fixed-order chain model (`ChainModel`)
//! - Internal state management (`State`)

/// Fixed-order Markov chain (`order >= 1`).
///
/// Handles document ingestion, transition counting, probabilistic
/// next-token sampling, whole-sequence generation, and JSON persistence.
pub mod chain;

/// Internal representation of a single chain state (context window).
///
/// Tracks outgoing transitions and supports weighted random sampling.
/// This module is not exposed publicly.
mod state;
