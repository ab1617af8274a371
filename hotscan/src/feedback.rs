//! Learned penalties from user corrections.
//!
//! When a user corrects a detection ("that was not X"), the corrected-away
//! entity accumulates a small penalty that is subtracted from its future raw
//! similarity scores. The book is keyed by the *candidate* id being scored,
//! not by any pairing of ids (see DESIGN.md for the history of that signature).

use std::collections::HashMap;

/// Penalty added per recorded correction.
const PENALTY_STEP: f32 = 0.05;
/// Ceiling so a frequently-corrected entity can still match on strong evidence.
const PENALTY_CAP: f32 = 0.30;

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct FeedbackBook {
	penalties: HashMap<String, f32>,
}

impl FeedbackBook {
	pub fn new() -> Self {
		Self::default()
	}

	/// Record that `detected_id` was reported as a wrong detection.
	pub fn record_false_positive(&mut self, detected_id: &str) {
		let entry = self.penalties.entry(detected_id.to_string()).or_insert(0.0);
		*entry = (*entry + PENALTY_STEP).min(PENALTY_CAP);
	}

	/// Subtractive adjustment for a candidate's raw similarity score.
	pub fn penalty(&self, candidate_id: &str) -> f32 {
		self.penalties.get(candidate_id).copied().unwrap_or(0.0)
	}

	pub fn clear(&mut self) {
		self.penalties.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn penalties_accumulate_and_cap() {
		let mut book = FeedbackBook::new();
		assert_eq!(book.penalty("item_x"), 0.0);

		book.record_false_positive("item_x");
		assert!((book.penalty("item_x") - PENALTY_STEP).abs() < 1e-6);

		for _ in 0..20 {
			book.record_false_positive("item_x");
		}
		assert!((book.penalty("item_x") - PENALTY_CAP).abs() < 1e-6);
		assert_eq!(book.penalty("item_y"), 0.0);
	}
}
