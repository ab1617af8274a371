//! Per-screenshot detection pipeline.
//!
//! One linear flow: segment the slot grid, run text recognition, match slot
//! icons, fuse and report. Everything below the screenshot decode degrades
//! gracefully to "fewer detections" — a failed OCR call or an undetectable
//! grid never aborts the run.
//!
//! The template store is borrowed, not owned: callers construct and load it
//! once and must not reload/reset it while a run is in flight. Runs are not
//! cancellable mid-flight; a caller that wants cancellation discards the
//! eventual result.

use std::path::Path;

use anyhow::Result;
use catalog::Catalog;
use cv::OwnedImage;

use crate::config::Strategy;
use crate::detection::{DetectedBuild, Detection};
use crate::feedback::FeedbackBook;
use crate::fuse;
use crate::matcher::Matcher;
use crate::metrics::{MetricsSink, NullMetrics, Phase};
use crate::ocr::OcrSource;
use crate::store::{IconLoader, TemplateStore};

/// Coarse progress callback: percentage plus a short status line.
pub type ProgressFn<'a> = &'a dyn Fn(u8, &str);

static NULL_METRICS: NullMetrics = NullMetrics;

/// Load a store's templates while reporting the load phase to a metrics sink.
pub fn load_templates(
	store: &mut TemplateStore,
	catalog: &Catalog,
	loader: &dyn IconLoader,
	metrics: &dyn MetricsSink,
) -> Result<()> {
	metrics.phase_started(Phase::Load);
	let result = store.load(catalog, loader);
	metrics.phase_finished(Phase::Load);
	result
}

pub struct Detector<'a> {
	store: &'a TemplateStore,
	strategy: Strategy,
	ocr: Option<&'a dyn OcrSource>,
	feedback: Option<&'a FeedbackBook>,
	metrics: &'a dyn MetricsSink,
}

impl<'a> Detector<'a> {
	pub fn new(store: &'a TemplateStore) -> Self {
		Self {
			store,
			strategy: Strategy::default(),
			ocr: None,
			feedback: None,
			metrics: &NULL_METRICS,
		}
	}

	pub fn with_strategy(mut self, strategy: Strategy) -> Self {
		self.strategy = strategy;
		self
	}

	pub fn with_ocr(mut self, ocr: &'a dyn OcrSource) -> Self {
		self.ocr = Some(ocr);
		self
	}

	pub fn with_feedback(mut self, feedback: &'a FeedbackBook) -> Self {
		self.feedback = Some(feedback);
		self
	}

	pub fn with_metrics(mut self, metrics: &'a dyn MetricsSink) -> Self {
		self.metrics = metrics;
		self
	}

	/// Detect from an encoded screenshot file.
	///
	/// A screenshot that fails to decode is the one hard error of the
	/// pipeline; everything downstream degrades instead of failing.
	pub fn detect_file(
		&self,
		path: impl AsRef<Path>,
		progress: Option<ProgressFn>,
	) -> Result<Vec<Detection>> {
		let screenshot = OwnedImage::from_file(path)?;
		self.detect(&screenshot, progress)
	}

	/// Run the full pipeline over one decoded screenshot.
	pub fn detect(
		&self,
		screenshot: &OwnedImage,
		progress: Option<ProgressFn>,
	) -> Result<Vec<Detection>> {
		let report = |percent: u8, status: &str| {
			if let Some(cb) = progress {
				cb(percent, status);
			}
		};

		self.metrics.phase_started(Phase::Preprocess);
		report(5, "detecting slot grid");
		let rois = cv::compute_grid(&screenshot.as_image());
		if rois.is_empty() {
			log::debug!("no slot grid detected; continuing text-only");
		}
		self.metrics.phase_finished(Phase::Preprocess);

		report(25, "recognizing text");
		let ocr_detections = match self.ocr {
			Some(source) => match source.scan(screenshot) {
				Ok(scan) => scan.into_detections(),
				Err(err) => {
					log::warn!("text recognition failed; continuing icon-only: {err:#}");
					Vec::new()
				}
			},
			None => Vec::new(),
		};

		self.metrics.phase_started(Phase::Match);
		report(55, "matching slot icons");
		let cv_detections = if rois.is_empty() {
			Vec::new()
		} else if self.store.is_empty() {
			log::warn!("template store is empty; icon matching skipped");
			Vec::new()
		} else {
			Matcher::new(self.store, &self.strategy, self.feedback)
				.run(&screenshot.as_image(), &rois)
		};
		self.metrics.phase_finished(Phase::Match);

		self.metrics.phase_started(Phase::Postprocess);
		report(90, "aggregating results");
		let detections = fuse::combine_detections(ocr_detections, cv_detections);

		let avg_confidence = if detections.is_empty() {
			0.0
		} else {
			detections.iter().map(|d| d.confidence).sum::<f32>() / detections.len() as f32
		};
		self.metrics.record_detections(detections.len(), avg_confidence);
		self.metrics.phase_finished(Phase::Postprocess);

		report(100, "done");
		Ok(detections)
	}

	/// As `detect`, then resolve the final build (aggregated items/tomes,
	/// single-valued character/weapon).
	pub fn detect_build(
		&self,
		screenshot: &OwnedImage,
		progress: Option<ProgressFn>,
	) -> Result<DetectedBuild> {
		let detections = self.detect(screenshot, progress)?;
		Ok(fuse::resolve_build(&detections))
	}
}
