//! Text-recognition collaborator interface.
//!
//! The OCR engine itself lives outside this pipeline; we only consume its
//! labeled output. A scan failure is never fatal — the caller degrades to
//! icon-only detection.

use std::sync::Arc;

use anyhow::Result;
use catalog::{CatalogEntity, EntityKind};
use cv::OwnedImage;

use crate::detection::{Detection, DetectionMethod};

/// One entity recognized from screenshot text.
#[derive(Debug, Clone)]
pub struct OcrDetection {
	pub kind: EntityKind,
	pub entity: Arc<CatalogEntity>,
	pub confidence: f32,
	/// The raw recognized string, kept for debugging misresolutions.
	pub raw_text: String,
}

/// Everything one OCR pass recognized in a screenshot.
#[derive(Debug, Clone, Default)]
pub struct OcrScan {
	pub items: Vec<OcrDetection>,
	pub tomes: Vec<OcrDetection>,
	pub character: Option<OcrDetection>,
	pub weapon: Option<OcrDetection>,
}

impl OcrScan {
	/// Flatten into the common detection shape, provenance tagged `Ocr`.
	pub fn into_detections(self) -> Vec<Detection> {
		let single = |v: Option<OcrDetection>| v.into_iter();

		self.items
			.into_iter()
			.chain(self.tomes)
			.chain(single(self.character))
			.chain(single(self.weapon))
			.map(|d| Detection {
				kind: d.kind,
				entity: d.entity,
				confidence: d.confidence,
				region: None,
				method: DetectionMethod::Ocr,
			})
			.collect()
	}
}

pub trait OcrSource {
	fn scan(&self, screenshot: &OwnedImage) -> Result<OcrScan>;
}
