use std::sync::Arc;

use catalog::{CatalogEntity, EntityKind};
use cv::Roi;

/// How a detection was produced. Provenance survives fusion so consumers can
/// weigh text hits against icon hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
	/// Pure pixel-level template comparison (no candidate pre-filtering).
	TemplateMatch,
	/// Color-profile guided comparison.
	IconSimilarity,
	/// Rarity/color pre-filtering combined with template comparison.
	Hybrid,
	/// Text recognition.
	Ocr,
}

/// One detected entity for one screenshot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Detection {
	pub kind: EntityKind,
	pub entity: Arc<CatalogEntity>,
	/// Confidence in [0, 1]. Icon matches never reach 1.0 (see `score::MAX_SIMILARITY`).
	pub confidence: f32,
	/// Slot rectangle for icon matches; `None` for text detections.
	pub region: Option<Roi>,
	pub method: DetectionMethod,
}

/// Duplicate detections of one entity collapsed into a counted result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AggregatedDetection {
	pub entity: Arc<CatalogEntity>,
	/// Number of contributing detections; always >= 1.
	pub count: u32,
	/// Best evidence seen for this entity, never an average.
	pub confidence: f32,
}

/// Final per-screenshot result: single-valued character/weapon plus counted
/// items and tomes.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DetectedBuild {
	pub character: Option<Detection>,
	pub weapon: Option<Detection>,
	pub items: Vec<AggregatedDetection>,
	pub tomes: Vec<AggregatedDetection>,
}
