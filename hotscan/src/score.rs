//! Post-hoc similarity adjustments.
//!
//! The raw metric score gets nudged by learned feedback, rarity context and
//! border agreement before threshold checks. The ceiling is deliberately
//! below 1.0 so downstream consumers can never treat a match as certain.

use catalog::Rarity;

use crate::config::Strategy;
use crate::feedback::FeedbackBook;
use crate::store::Template;

/// Hard ceiling on any similarity reported out of the matching engine.
pub const MAX_SIMILARITY: f32 = 0.99;

/// Score multiplier when the cell border rarity agrees with the candidate.
const BORDER_MATCH_FACTOR: f32 = 1.05;
/// Score multiplier when a detected border rarity contradicts the candidate.
const BORDER_MISMATCH_FACTOR: f32 = 0.85;

pub fn adjust(
	raw: f32,
	template: &Template,
	cell_border_rarity: Option<Rarity>,
	strategy: &Strategy,
	feedback: Option<&FeedbackBook>,
) -> f32 {
	let mut score = raw;

	if strategy.feedback_penalty
		&& let Some(book) = feedback
	{
		score -= book.penalty(&template.entity.id);
	}

	if strategy.rarity_context_boost {
		score += match template.rarity {
			Some(Rarity::Common) => 0.03,
			Some(Rarity::Uncommon) => 0.02,
			Some(Rarity::Legendary) => -0.02,
			_ => 0.0,
		};
	}

	if strategy.border_validation
		&& let Some(detected) = cell_border_rarity
	{
		if template.rarity == Some(detected) {
			score *= BORDER_MATCH_FACTOR;
		} else {
			score *= BORDER_MISMATCH_FACTOR;
		}
	}

	score.clamp(0.0, MAX_SIMILARITY)
}
