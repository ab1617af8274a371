//! Slot-matching engine.
//!
//! Drives candidate filtering and the pass/threshold protocol over the
//! segmented cells: strict first, relaxing only for whatever is left. A cell
//! that clears a pass is claimed permanently; a cell that never clears the
//! lowest tier simply produces no detection, which is normal.

use std::sync::Arc;

use catalog::Rarity;
use cv::{CellFeatures, Image, Roi};

use crate::config::{CandidateFilter, Strategy};
use crate::detection::{Detection, DetectionMethod};
use crate::feedback::FeedbackBook;
use crate::score;
use crate::store::{Template, TemplateStore};

/// Minimum color-profile overlap for rarity-first narrowing.
const PROFILE_OVERLAP_MIN: f32 = 0.5;

pub struct Matcher<'a> {
	store: &'a TemplateStore,
	strategy: &'a Strategy,
	feedback: Option<&'a FeedbackBook>,
}

impl<'a> Matcher<'a> {
	pub fn new(
		store: &'a TemplateStore,
		strategy: &'a Strategy,
		feedback: Option<&'a FeedbackBook>,
	) -> Self {
		Self {
			store,
			strategy,
			feedback,
		}
	}

	/// Match every cell against the store and return the accepted detections.
	pub fn run(&self, screenshot: &Image, rois: &[Roi]) -> Vec<Detection> {
		self.run_counted(screenshot, rois).0
	}

	/// As `run`, additionally reporting how many passes evaluated each cell.
	pub(crate) fn run_counted(&self, screenshot: &Image, rois: &[Roi]) -> (Vec<Detection>, Vec<u32>) {
		let features: Vec<CellFeatures> = rois
			.iter()
			.map(|roi| self.classify(&cell_view(screenshot, roi)))
			.collect();

		// Single-pass matching reuses the middle tier by convention.
		let passes: std::ops::Range<usize> = if self.strategy.multi_pass { 0..3 } else { 1..2 };

		let mut matched: Vec<Option<Detection>> = vec![None; rois.len()];
		let mut evals = vec![0u32; rois.len()];

		for pass in passes {
			for (i, roi) in rois.iter().enumerate() {
				if matched[i].is_some() {
					continue;
				}
				if features[i].is_empty {
					continue;
				}

				let cell = cell_view(screenshot, roi);
				if cell.width() == 0 || cell.height() == 0 {
					continue;
				}

				let candidates = self.filter_candidates(&features[i]);
				if candidates.is_empty() {
					continue;
				}

				evals[i] += 1;
				let Some((template, similarity)) =
					self.match_cell(&cell, &candidates, features[i].border_rarity)
				else {
					continue;
				};

				let tier = self
					.strategy
					.thresholds
					.for_rarity(template.rarity)
					.for_pass(pass);
				if similarity >= tier {
					// Optional debug snapshots.
					if std::env::var("HOTSCAN_WRITE_CELLS").as_deref() == Ok("1") {
						let _ = cell.save_png(format!("./debug_cell_{i}_{}.png", template.entity.id));
					}

					matched[i] = Some(Detection {
						kind: template.entity.kind,
						entity: template.entity.clone(),
						confidence: similarity,
						region: Some(*roi),
						method: self.method(),
					});
				}
			}
		}

		(matched.into_iter().flatten().collect(), evals)
	}

	fn method(&self) -> DetectionMethod {
		match self.strategy.filter {
			CandidateFilter::None => DetectionMethod::TemplateMatch,
			CandidateFilter::RarityFirst => DetectionMethod::Hybrid,
			CandidateFilter::ColorFirst => DetectionMethod::IconSimilarity,
		}
	}

	fn classify(&self, cell: &Image) -> CellFeatures {
		let is_empty = self.strategy.skip_empty_cells
			&& cv::cell::is_empty_cell(cell, self.strategy.empty_cell_variance);

		// Features feed both pre-filtering and score validation; only compute
		// what the active strategy actually consumes.
		let wants_border = self.strategy.border_validation
			|| self.strategy.filter == CandidateFilter::RarityFirst;
		let wants_profile = self.strategy.filter != CandidateFilter::None;

		let border_rarity = if !is_empty && wants_border {
			cv::cell::detect_border_rarity(cell)
		} else {
			None
		};
		let profile = if !is_empty && wants_profile {
			Some(cv::cell::extract_color_profile(cell))
		} else {
			None
		};

		CellFeatures {
			is_empty,
			border_rarity,
			profile,
		}
	}

	/// Candidate templates for one cell under the active filtering mode.
	///
	/// Never returns an empty set while the store has templates: over-filtered
	/// cells fall back to the full set instead of silently losing a detection.
	pub fn filter_candidates(&self, features: &CellFeatures) -> Vec<Arc<Template>> {
		let all = || self.store.templates().to_vec();

		match self.strategy.filter {
			CandidateFilter::None => all(),
			CandidateFilter::RarityFirst => {
				let Some(rarity) = features.border_rarity else {
					return all();
				};
				let same_rarity = self.store.of_rarity(rarity);

				let narrowed: Vec<Arc<Template>> = match &features.profile {
					Some(profile) => same_rarity
						.iter()
						.filter(|t| t.profile.overlap(profile) >= PROFILE_OVERLAP_MIN)
						.cloned()
						.collect(),
					None => same_rarity.to_vec(),
				};

				if narrowed.is_empty() { all() } else { narrowed }
			}
			CandidateFilter::ColorFirst => {
				let Some(profile) = &features.profile else {
					return all();
				};
				let same_color = self.store.of_color(profile.dominant);
				if same_color.is_empty() {
					all()
				} else {
					same_color.to_vec()
				}
			}
		}
	}

	/// Best-scoring template for one cell, with post adjustments applied.
	fn match_cell(
		&self,
		cell: &Image,
		candidates: &[Arc<Template>],
		border_rarity: Option<Rarity>,
	) -> Option<(Arc<Template>, f32)> {
		let cell_gray = cell.gray_values();

		let mut best: Option<(Arc<Template>, f32)> = None;
		for candidate in candidates {
			let resized = candidate
				.image
				.clone()
				.resized_to(cell.width(), cell.height());
			let raw = cv::similarity::score(
				self.strategy.algorithm,
				&cell_gray,
				&resized.as_image().gray_values(),
			);
			let adjusted = score::adjust(raw, candidate, border_rarity, self.strategy, self.feedback);

			// Strictly-greater keeps the earliest candidate on ties, so the
			// winner is deterministic for a fixed store order.
			match &best {
				Some((_, best_score)) if adjusted <= *best_score => {}
				_ => best = Some((candidate.clone(), adjusted)),
			}
		}

		best
	}
}

fn cell_view<'b>(screenshot: &Image<'b>, roi: &Roi) -> Image<'b> {
	screenshot.sub_image(roi.x, roi.y, roi.width, roi.height)
}
