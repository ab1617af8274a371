//! End-to-end pipeline tests over synthetic screenshots.

use std::sync::{Arc, Mutex};

use catalog::{Catalog, CatalogEntity, EntityKind, Rarity};
use cv::{Color, OwnedImage};
use hotscan::{
	DetectionMethod, Detector, MemoryIconLoader, MetricsSink, OcrDetection, OcrScan, OcrSource,
	Phase, Strategy, TemplateStore,
};

const CELL: u32 = 64;

fn entity(id: &str, kind: EntityKind, rarity: Option<Rarity>) -> CatalogEntity {
	CatalogEntity {
		id: id.into(),
		name: id.into(),
		kind,
		rarity,
		tier: None,
		icon: Some(format!("{id}.webp")),
	}
}

/// Legendary icon: orange rarity frame around a structured gradient.
fn legendary_icon() -> OwnedImage {
	let mut img = OwnedImage::filled(CELL, CELL, Color::new(255, 152, 0));
	let inner = (0..(CELL - 8) * (CELL - 8))
		.map(|i| {
			let v = ((i * 11) % 256) as u8;
			Color::new(v, 255 - v, v / 3)
		})
		.collect();
	img.blit(4, 4, OwnedImage::from_pixels(CELL - 8, CELL - 8, inner).as_image());
	img
}

fn swirl_icon() -> OwnedImage {
	let pixels = (0..CELL * CELL)
		.map(|i| {
			let v = ((i * 5) % 256) as u8;
			Color::new(v / 2, v, 255 - v)
		})
		.collect();
	OwnedImage::from_pixels(CELL, CELL, pixels)
}

fn noise_icon(seed: u32) -> OwnedImage {
	let mut state = seed;
	let mut next = move || {
		state = state.wrapping_mul(1664525).wrapping_add(1013904223);
		(state >> 16) as u8
	};
	let pixels = (0..CELL * CELL)
		.map(|_| Color::new(next(), next(), next()))
		.collect();
	OwnedImage::from_pixels(CELL, CELL, pixels)
}

fn loaded_store() -> TemplateStore {
	let catalog = Catalog::from_entities([
		entity("item_sunforged_band", EntityKind::Item, Some(Rarity::Legendary)),
		entity("item_copper_ring", EntityKind::Item, Some(Rarity::Common)),
		entity("tome_of_embers", EntityKind::Tome, None),
	]);

	let mut loader = MemoryIconLoader::new();
	loader.insert("item_sunforged_band", legendary_icon());
	loader.insert("item_copper_ring", OwnedImage::filled(CELL, CELL, Color::new(200, 60, 40)));
	loader.insert("tome_of_embers", swirl_icon());

	let mut store = TemplateStore::new();
	store.load(&catalog, &loader).unwrap();
	store
}

struct PhaseRecorder {
	phases: Mutex<Vec<(Phase, bool)>>,
}

impl MetricsSink for PhaseRecorder {
	fn phase_started(&self, phase: Phase) {
		self.phases.lock().unwrap().push((phase, true));
	}
	fn phase_finished(&self, phase: Phase) {
		self.phases.lock().unwrap().push((phase, false));
	}
}

struct StubOcr {
	scan: OcrScan,
}

impl OcrSource for StubOcr {
	fn scan(&self, _screenshot: &OwnedImage) -> anyhow::Result<OcrScan> {
		Ok(self.scan.clone())
	}
}

struct FailingOcr;

impl OcrSource for FailingOcr {
	fn scan(&self, _screenshot: &OwnedImage) -> anyhow::Result<OcrScan> {
		anyhow::bail!("ocr backend unavailable")
	}
}

/// 1920x1080 preset screenshot: the legendary icon in slot 0, an empty slot,
/// two noise slots, everything else background.
fn preset_screenshot() -> OwnedImage {
	let mut img = OwnedImage::filled(1920, 1080, Color::new(26, 26, 28));

	// Slot positions from the 1080p preset: origin (704, 840), cell 64, gap 8.
	img.blit(704, 840, legendary_icon().as_image());
	// Slot 1 stays uniform background (empty).
	img.blit(704 + 2 * 72, 840, noise_icon(3).as_image());
	img.blit(704 + 3 * 72, 840, noise_icon(17).as_image());
	img
}

#[test]
fn known_icon_detected_once_noise_and_empty_cells_ignored() {
	let store = loaded_store();
	let recorder = PhaseRecorder { phases: Mutex::new(Vec::new()) };
	let detector = Detector::new(&store)
		.with_strategy(Strategy::balanced())
		.with_metrics(&recorder);

	let progress: Arc<Mutex<Vec<(u8, String)>>> = Arc::new(Mutex::new(Vec::new()));
	let progress_cb = {
		let progress = progress.clone();
		move |percent: u8, status: &str| {
			progress.lock().unwrap().push((percent, status.to_string()));
		}
	};

	let detections = detector
		.detect(&preset_screenshot(), Some(&progress_cb))
		.unwrap();

	assert_eq!(detections.len(), 1);
	let hit = &detections[0];
	assert_eq!(hit.entity.id, "item_sunforged_band");
	assert_eq!(hit.kind, EntityKind::Item);
	assert_eq!(hit.method, DetectionMethod::Hybrid);

	// The exact-icon match must clear the strict legendary tier.
	let legendary_pass1 = Strategy::balanced()
		.thresholds
		.for_rarity(Some(Rarity::Legendary))
		.pass1;
	assert!(hit.confidence >= legendary_pass1, "confidence {}", hit.confidence);

	let region = hit.region.unwrap();
	assert_eq!((region.x, region.y), (704, 840));

	// Progress runs to completion in order.
	let progress = progress.lock().unwrap();
	assert_eq!(progress.first().map(|(p, _)| *p), Some(5));
	assert_eq!(progress.last().map(|(p, _)| *p), Some(100));
	assert!(progress.windows(2).all(|w| w[0].0 <= w[1].0));

	// Phase boundaries nest properly: preprocess, match, postprocess.
	let phases = recorder.phases.lock().unwrap();
	let expected = [
		(Phase::Preprocess, true),
		(Phase::Preprocess, false),
		(Phase::Match, true),
		(Phase::Match, false),
		(Phase::Postprocess, true),
		(Phase::Postprocess, false),
	];
	assert_eq!(*phases, expected);
}

#[test]
fn unknown_resolution_degrades_to_text_only() {
	let store = loaded_store();

	let catalog_character = Arc::new(entity("char_norseman", EntityKind::Character, None));
	let stub = StubOcr {
		scan: OcrScan {
			items: vec![],
			tomes: vec![],
			character: Some(OcrDetection {
				kind: EntityKind::Character,
				entity: catalog_character.clone(),
				confidence: 0.77,
				raw_text: "NORSEMAN".into(),
			}),
			weapon: None,
		},
	};

	let detector = Detector::new(&store).with_ocr(&stub);

	// Featureless frame at a resolution with no preset: no grid, no panic.
	let screenshot = OwnedImage::filled(700, 450, Color::new(32, 32, 32));
	let detections = detector.detect(&screenshot, None).unwrap();

	assert_eq!(detections.len(), 1);
	assert_eq!(detections[0].method, DetectionMethod::Ocr);
	assert_eq!(detections[0].entity.id, "char_norseman");
	assert!(detections[0].region.is_none());

	let build = detector.detect_build(&screenshot, None).unwrap();
	assert_eq!(build.character.unwrap().entity.id, "char_norseman");
	assert!(build.items.is_empty());
}

#[test]
fn ocr_failure_degrades_to_icon_only() {
	let store = loaded_store();
	let detector = Detector::new(&store).with_ocr(&FailingOcr);

	let detections = detector.detect(&preset_screenshot(), None).unwrap();
	assert_eq!(detections.len(), 1);
	assert_eq!(detections[0].entity.id, "item_sunforged_band");
}

#[test]
fn undecodable_screenshot_is_the_one_hard_error() {
	let store = loaded_store();
	let detector = Detector::new(&store);

	let path = std::env::temp_dir().join("hotscan_not_an_image.png");
	std::fs::write(&path, b"definitely not a png").unwrap();
	assert!(detector.detect_file(&path, None).is_err());
	let _ = std::fs::remove_file(&path);
}
