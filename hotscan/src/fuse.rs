//! Detection fusion and duplicate aggregation.
//!
//! Text and icon detections are concatenated with provenance intact, then
//! collapsed per entity. Confidence of a group is the best evidence seen —
//! several weak duplicates must never dilute one strong match.

use std::collections::HashMap;
use std::sync::Arc;

use catalog::{CatalogEntity, EntityKind};

use crate::detection::{AggregatedDetection, DetectedBuild, Detection, DetectionMethod};

/// Anything aggregation can consume: raw detections count as one each,
/// already-aggregated results keep their counts. This makes aggregation
/// idempotent by construction.
pub trait Countable {
	fn entity(&self) -> &Arc<CatalogEntity>;
	fn confidence(&self) -> f32;
	fn count(&self) -> u32;
}

impl Countable for Detection {
	fn entity(&self) -> &Arc<CatalogEntity> {
		&self.entity
	}
	fn confidence(&self) -> f32 {
		self.confidence
	}
	fn count(&self) -> u32 {
		1
	}
}

impl Countable for AggregatedDetection {
	fn entity(&self) -> &Arc<CatalogEntity> {
		&self.entity
	}
	fn confidence(&self) -> f32 {
		self.confidence
	}
	fn count(&self) -> u32 {
		self.count
	}
}

/// Concatenate text and icon detections. No deduplication happens here;
/// provenance is preserved for the aggregation step.
pub fn combine_detections(ocr: Vec<Detection>, cv: Vec<Detection>) -> Vec<Detection> {
	let mut out = ocr;
	out.extend(cv);
	out
}

/// Group by entity id: count contributions, keep the maximum confidence.
///
/// Output order is first-seen input order, so grouping is order-independent
/// but a given call is stable.
pub fn aggregate_duplicates<T: Countable>(detections: &[T]) -> Vec<AggregatedDetection> {
	let mut index: HashMap<&str, usize> = HashMap::new();
	let mut out: Vec<AggregatedDetection> = Vec::new();

	for d in detections {
		let id = d.entity().id.as_str();
		match index.get(id) {
			Some(&i) => {
				let group = &mut out[i];
				group.count += d.count();
				if d.confidence() > group.confidence {
					group.confidence = d.confidence();
				}
			}
			None => {
				index.insert(id, out.len());
				out.push(AggregatedDetection {
					entity: d.entity().clone(),
					count: d.count(),
					confidence: d.confidence(),
				});
			}
		}
	}

	out
}

/// Resolve the final build: single-valued character/weapon, counted
/// items/tomes.
///
/// For character and weapon a text hit wins over any icon hit; among hits of
/// the same provenance the highest confidence wins.
pub fn resolve_build(detections: &[Detection]) -> DetectedBuild {
	let single = |kind: EntityKind| -> Option<Detection> {
		let of_kind = detections.iter().filter(|d| d.kind == kind);

		let best = |from_ocr: bool| {
			of_kind
				.clone()
				.filter(|d| (d.method == DetectionMethod::Ocr) == from_ocr)
				.max_by(|a, b| {
					a.confidence
						.partial_cmp(&b.confidence)
						.unwrap_or(std::cmp::Ordering::Equal)
				})
		};

		best(true).or_else(|| best(false)).cloned()
	};

	let counted = |kind: EntityKind| -> Vec<AggregatedDetection> {
		let of_kind: Vec<Detection> = detections.iter().filter(|d| d.kind == kind).cloned().collect();
		aggregate_duplicates(&of_kind)
	};

	DetectedBuild {
		character: single(EntityKind::Character),
		weapon: single(EntityKind::Weapon),
		items: counted(EntityKind::Item),
		tomes: counted(EntityKind::Tome),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn entity(id: &str, kind: EntityKind) -> Arc<CatalogEntity> {
		Arc::new(CatalogEntity {
			id: id.into(),
			name: id.into(),
			kind,
			rarity: None,
			tier: None,
			icon: None,
		})
	}

	fn detection(id: &str, kind: EntityKind, confidence: f32, method: DetectionMethod) -> Detection {
		Detection {
			kind,
			entity: entity(id, kind),
			confidence,
			region: None,
			method,
		}
	}

	#[test]
	fn duplicates_collapse_to_max_confidence() {
		let input = vec![
			detection("item_a", EntityKind::Item, 0.6, DetectionMethod::TemplateMatch),
			detection("item_b", EntityKind::Item, 0.7, DetectionMethod::TemplateMatch),
			detection("item_a", EntityKind::Item, 0.9, DetectionMethod::Hybrid),
		];

		let aggregated = aggregate_duplicates(&input);
		assert_eq!(aggregated.len(), 2);

		// First-seen order.
		assert_eq!(aggregated[0].entity.id, "item_a");
		assert_eq!(aggregated[0].count, 2);
		assert!((aggregated[0].confidence - 0.9).abs() < 1e-6);

		assert_eq!(aggregated[1].entity.id, "item_b");
		assert_eq!(aggregated[1].count, 1);
	}

	#[test]
	fn aggregation_is_idempotent() {
		let input = vec![
			detection("item_a", EntityKind::Item, 0.6, DetectionMethod::TemplateMatch),
			detection("item_a", EntityKind::Item, 0.9, DetectionMethod::TemplateMatch),
			detection("item_b", EntityKind::Item, 0.8, DetectionMethod::TemplateMatch),
		];

		let once = aggregate_duplicates(&input);
		let twice = aggregate_duplicates(&once);

		assert_eq!(once.len(), twice.len());
		for (a, b) in once.iter().zip(&twice) {
			assert_eq!(a.entity.id, b.entity.id);
			assert_eq!(a.count, b.count);
			assert_eq!(a.confidence, b.confidence);
		}
	}

	#[test]
	fn counts_sum_to_input_size() {
		let input: Vec<Detection> = (0..10)
			.map(|i| {
				detection(
					["item_a", "item_b", "item_c"][i % 3],
					EntityKind::Item,
					0.5 + (i as f32) / 100.0,
					DetectionMethod::TemplateMatch,
				)
			})
			.collect();

		let aggregated = aggregate_duplicates(&input);
		let total: u32 = aggregated.iter().map(|a| a.count).sum();
		assert_eq!(total as usize, input.len());
		assert!(aggregated.iter().all(|a| a.count >= 1));
	}

	#[test]
	fn combine_preserves_provenance_and_order() {
		let ocr = vec![detection("char_a", EntityKind::Character, 0.8, DetectionMethod::Ocr)];
		let cv = vec![detection("item_a", EntityKind::Item, 0.9, DetectionMethod::Hybrid)];

		let combined = combine_detections(ocr, cv);
		assert_eq!(combined.len(), 2);
		assert_eq!(combined[0].method, DetectionMethod::Ocr);
		assert_eq!(combined[1].method, DetectionMethod::Hybrid);
	}

	#[test]
	fn character_resolution_prefers_ocr() {
		let detections = vec![
			detection("char_cv", EntityKind::Character, 0.95, DetectionMethod::TemplateMatch),
			detection("char_ocr", EntityKind::Character, 0.60, DetectionMethod::Ocr),
			detection("weapon_cv", EntityKind::Weapon, 0.70, DetectionMethod::TemplateMatch),
			detection("item_a", EntityKind::Item, 0.80, DetectionMethod::Hybrid),
			detection("item_a", EntityKind::Item, 0.60, DetectionMethod::Ocr),
		];

		let build = resolve_build(&detections);

		// A weaker text hit still outranks a stronger icon hit.
		assert_eq!(build.character.as_ref().unwrap().entity.id, "char_ocr");
		// No text hit for the weapon: best icon hit wins.
		assert_eq!(build.weapon.as_ref().unwrap().entity.id, "weapon_cv");

		assert_eq!(build.items.len(), 1);
		assert_eq!(build.items[0].count, 2);
		assert!((build.items[0].confidence - 0.80).abs() < 1e-6);
		assert!(build.tomes.is_empty());
	}

	#[test]
	fn empty_input_resolves_to_empty_build() {
		let build = resolve_build(&[]);
		assert!(build.character.is_none());
		assert!(build.weapon.is_none());
		assert!(build.items.is_empty());
		assert!(build.tomes.is_empty());
	}
}
