//! Reference-icon template store.
//!
//! Templates are derived from catalog icons once and cached for the process
//! lifetime (reloadable via `reset`). The store is an explicit value owned by
//! the caller — construct one per game-data version, or one per test — and it
//! must not be loaded/reset while a detection run borrows it.

use std::{
	collections::HashMap,
	path::{Path, PathBuf},
	sync::Arc,
};

use anyhow::{Context, Result};
use catalog::{Catalog, CatalogEntity, Rarity};
use cv::{ColorBucket, ColorProfile, OwnedImage};
use rayon::prelude::*;

/// Cached, feature-annotated reference icon for one catalog entity.
#[derive(Debug, Clone)]
pub struct Template {
	pub entity: Arc<CatalogEntity>,
	pub image: OwnedImage,
	pub profile: ColorProfile,
	pub average_hsv: (f32, f32, f32),
	pub rarity: Option<Rarity>,
}

/// Source of decoded icon pixels, so stores can load from disk in production
/// and from memory in tests.
pub trait IconLoader: Sync {
	fn load_icon(&self, entity: &CatalogEntity) -> Result<OwnedImage>;
}

/// Loads icons from an asset directory.
///
/// Tries the catalog's recorded path first; when decoding fails (or the file
/// is missing), retries with the sibling format — exports drift between WebP
/// and PNG across game versions.
pub struct DirIconLoader {
	root: PathBuf,
}

impl DirIconLoader {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	fn try_load(&self, relative: &Path) -> Result<OwnedImage> {
		OwnedImage::from_file(self.root.join(relative))
	}
}

impl IconLoader for DirIconLoader {
	fn load_icon(&self, entity: &CatalogEntity) -> Result<OwnedImage> {
		let relative = entity
			.icon
			.as_deref()
			.map(PathBuf::from)
			.unwrap_or_else(|| PathBuf::from(format!("{}.webp", entity.id)));

		match self.try_load(&relative) {
			Ok(image) => Ok(image),
			Err(primary_err) => {
				let fallback = match relative.extension().and_then(|v| v.to_str()) {
					Some("webp") => relative.with_extension("png"),
					_ => relative.with_extension("webp"),
				};
				self.try_load(&fallback).map_err(|_| primary_err)
			}
		}
	}
}

/// In-memory icon source for tests and embedded asset packs.
#[derive(Default)]
pub struct MemoryIconLoader {
	icons: HashMap<String, OwnedImage>,
}

impl MemoryIconLoader {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, id: impl Into<String>, image: OwnedImage) {
		self.icons.insert(id.into(), image);
	}
}

impl IconLoader for MemoryIconLoader {
	fn load_icon(&self, entity: &CatalogEntity) -> Result<OwnedImage> {
		self.icons
			.get(&entity.id)
			.cloned()
			.with_context(|| format!("no icon for {}", entity.id))
	}
}

// ----------

#[derive(Default)]
pub struct TemplateStore {
	/// Catalog order; candidate iteration and fallbacks use this so results
	/// are deterministic.
	all: Vec<Arc<Template>>,
	by_id: HashMap<String, Arc<Template>>,
	by_rarity: HashMap<Rarity, Vec<Arc<Template>>>,
	by_color: HashMap<ColorBucket, Vec<Arc<Template>>>,
	loaded: bool,
}

impl TemplateStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Load templates for every catalog entity that has an icon.
	///
	/// All loads are fired at once; an entity whose icon fails to load or
	/// decode is logged and skipped, never failing the batch. A second call
	/// is a no-op until `reset`.
	pub fn load(&mut self, catalog: &Catalog, loader: &dyn IconLoader) -> Result<()> {
		if self.loaded {
			return Ok(());
		}

		let entities: Vec<_> = catalog
			.entities()
			.filter(|e| e.icon.is_some())
			.cloned()
			.collect();

		let results: Vec<(Arc<CatalogEntity>, Result<Template>)> = entities
			.into_par_iter()
			.map(|entity| {
				let template = build_template(&entity, loader);
				(entity, template)
			})
			.collect();

		for (entity, result) in results {
			match result {
				Ok(template) => self.insert(Arc::new(template)),
				Err(err) => {
					log::warn!("skipping template for {}: {err:#}", entity.id);
				}
			}
		}

		log::debug!("template store loaded: {} templates", self.all.len());
		self.loaded = true;
		Ok(())
	}

	fn insert(&mut self, template: Arc<Template>) {
		if let Some(rarity) = template.rarity {
			self.by_rarity.entry(rarity).or_default().push(template.clone());
		}
		self.by_color
			.entry(template.profile.dominant)
			.or_default()
			.push(template.clone());
		self.by_id.insert(template.entity.id.clone(), template.clone());
		self.all.push(template);
	}

	/// Drop every cached template and the loaded flag (data-refresh path).
	pub fn reset(&mut self) {
		self.all.clear();
		self.by_id.clear();
		self.by_rarity.clear();
		self.by_color.clear();
		self.loaded = false;
	}

	pub fn is_loaded(&self) -> bool {
		self.loaded
	}

	pub fn len(&self) -> usize {
		self.all.len()
	}

	pub fn is_empty(&self) -> bool {
		self.all.is_empty()
	}

	pub fn get(&self, id: &str) -> Option<&Arc<Template>> {
		self.by_id.get(id)
	}

	pub fn templates(&self) -> &[Arc<Template>] {
		&self.all
	}

	pub fn of_rarity(&self, rarity: Rarity) -> &[Arc<Template>] {
		self.by_rarity.get(&rarity).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn of_color(&self, bucket: ColorBucket) -> &[Arc<Template>] {
		self.by_color.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
	}
}

fn build_template(entity: &Arc<CatalogEntity>, loader: &dyn IconLoader) -> Result<Template> {
	let image = loader.load_icon(entity)?;
	let view = image.as_image();
	let profile = cv::cell::extract_color_profile(&view);
	let average_hsv = cv::cell::average_hsv(&view);

	Ok(Template {
		entity: entity.clone(),
		profile,
		average_hsv,
		rarity: entity.rarity,
		image,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use catalog::EntityKind;
	use cv::Color;

	fn entity(id: &str, rarity: Option<Rarity>) -> CatalogEntity {
		CatalogEntity {
			id: id.into(),
			name: id.into(),
			kind: EntityKind::Item,
			rarity,
			tier: None,
			icon: Some(format!("{id}.webp")),
		}
	}

	fn sample_store() -> (Catalog, MemoryIconLoader) {
		let catalog = Catalog::from_entities([
			entity("item_red", Some(Rarity::Common)),
			entity("item_blue", Some(Rarity::Legendary)),
			entity("item_broken", Some(Rarity::Rare)),
		]);

		let mut loader = MemoryIconLoader::new();
		loader.insert("item_red", OwnedImage::filled(16, 16, Color::new(210, 40, 40)));
		loader.insert("item_blue", OwnedImage::filled(16, 16, Color::new(40, 70, 220)));
		// item_broken has no icon bytes: its load fails and is skipped.

		(catalog, loader)
	}

	#[test]
	fn load_skips_failures_and_indexes() {
		let (catalog, loader) = sample_store();
		let mut store = TemplateStore::new();
		store.load(&catalog, &loader).unwrap();

		assert!(store.is_loaded());
		assert_eq!(store.len(), 2);
		assert!(store.get("item_broken").is_none());

		assert_eq!(store.of_rarity(Rarity::Common).len(), 1);
		assert_eq!(store.of_rarity(Rarity::Legendary).len(), 1);
		assert_eq!(store.of_color(ColorBucket::Red).len(), 1);
		assert_eq!(store.of_color(ColorBucket::Blue).len(), 1);

		// Catalog order is preserved for deterministic candidate iteration.
		let ids: Vec<_> = store.templates().iter().map(|t| t.entity.id.as_str()).collect();
		assert_eq!(ids, ["item_red", "item_blue"]);
	}

	#[test]
	fn load_is_idempotent_until_reset() {
		let (catalog, loader) = sample_store();
		let mut store = TemplateStore::new();
		store.load(&catalog, &loader).unwrap();
		store.load(&catalog, &loader).unwrap();
		assert_eq!(store.len(), 2);

		store.reset();
		assert!(!store.is_loaded());
		assert!(store.is_empty());
		assert!(store.of_rarity(Rarity::Common).is_empty());

		store.load(&catalog, &loader).unwrap();
		assert_eq!(store.len(), 2);
	}
}
