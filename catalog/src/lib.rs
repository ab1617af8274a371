use std::{
	collections::HashMap,
	fs::File,
	io::{BufReader, Read},
	path::Path,
	sync::Arc,
};

use anyhow::{Context, Result};

mod entity;
mod schema;

pub use entity::{CatalogEntity, EntityKind, Rarity, Tier};

/// The static game data: items, tomes, characters and weapons.
///
/// Loaded once by the hosting application and handed to the detection
/// pipeline; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
	pub items: Vec<Arc<CatalogEntity>>,
	pub tomes: Vec<Arc<CatalogEntity>>,
	pub characters: Vec<Arc<CatalogEntity>>,
	pub weapons: Vec<Arc<CatalogEntity>>,

	by_id: HashMap<String, Arc<CatalogEntity>>,
}

impl Catalog {
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let file = File::open(path).with_context(|| format!("open catalog {}", path.display()))?;
		Self::from_reader(BufReader::new(file))
	}

	pub fn from_reader(reader: impl Read) -> Result<Self> {
		let raw: schema::RawCatalog = serde_json::from_reader(reader).context("parse catalog JSON")?;
		Ok(Self::from_raw(raw))
	}

	pub fn from_json(json: &str) -> Result<Self> {
		let raw: schema::RawCatalog = serde_json::from_str(json).context("parse catalog JSON")?;
		Ok(Self::from_raw(raw))
	}

	fn from_raw(raw: schema::RawCatalog) -> Self {
		let mut catalog = Self::default();

		let convert = |list: Vec<schema::RawEntity>, kind| {
			list.into_iter()
				.map(|v| Arc::new(v.into_entity(kind)))
				.collect::<Vec<_>>()
		};

		catalog.items = convert(raw.items, EntityKind::Item);
		catalog.tomes = convert(raw.tomes, EntityKind::Tome);
		catalog.characters = convert(raw.characters, EntityKind::Character);
		catalog.weapons = convert(raw.weapons, EntityKind::Weapon);

		let mut by_id = HashMap::new();
		for entity in catalog.entities() {
			if by_id.insert(entity.id.clone(), entity.clone()).is_some() {
				log::warn!("duplicate catalog id {}", entity.id);
			}
		}
		catalog.by_id = by_id;

		catalog
	}

	/// Build a catalog directly from entity lists (test fixtures, embedded data).
	pub fn from_entities(entities: impl IntoIterator<Item = CatalogEntity>) -> Self {
		let mut catalog = Self::default();
		for entity in entities {
			let entity = Arc::new(entity);
			match entity.kind {
				EntityKind::Item => catalog.items.push(entity.clone()),
				EntityKind::Tome => catalog.tomes.push(entity.clone()),
				EntityKind::Character => catalog.characters.push(entity.clone()),
				EntityKind::Weapon => catalog.weapons.push(entity.clone()),
			}
			catalog.by_id.insert(entity.id.clone(), entity);
		}
		catalog
	}

	/// Iterate over every entity across all four families, in catalog order.
	pub fn entities(&self) -> impl Iterator<Item = &Arc<CatalogEntity>> {
		self.items
			.iter()
			.chain(self.tomes.iter())
			.chain(self.characters.iter())
			.chain(self.weapons.iter())
	}

	pub fn get(&self, id: &str) -> Option<&Arc<CatalogEntity>> {
		self.by_id.get(id)
	}

	pub fn len(&self) -> usize {
		self.by_id.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_id.is_empty()
	}

	fn of_kind(&self, kind: EntityKind) -> &[Arc<CatalogEntity>] {
		match kind {
			EntityKind::Item => &self.items,
			EntityKind::Tome => &self.tomes,
			EntityKind::Character => &self.characters,
			EntityKind::Weapon => &self.weapons,
		}
	}

	/// Attempts to find the closest entity of `kind` from a dirty ocr string.
	pub fn resolve_name(&self, kind: EntityKind, name: &str) -> Option<&Arc<CatalogEntity>> {
		let name = name.trim();
		// When OCR returns an empty/near-empty string, *don't* guess.
		// Levenshtein over the whole family would just pick the shortest name.
		if name.len() < 3 {
			return None;
		}

		let family = self.of_kind(kind);

		if let Some(exact) = family
			.iter()
			.find(|v| v.name.eq_ignore_ascii_case(name))
		{
			return Some(exact);
		}

		// OCR often prepends garbage ("x2 Tome of..."); retry on each
		// whitespace-trimmed suffix before falling back to edit distance.
		let mut start = 0;
		while let Some(index) = name[start..].find(' ') {
			start += index + 1;
			let sub = name[start..].trim_start();
			if let Some(exact) = family.iter().find(|v| v.name.eq_ignore_ascii_case(sub)) {
				return Some(exact);
			}
		}

		let mut min_entity = None;
		let mut min = usize::MAX;
		for entity in family {
			let lev = levenshtein::levenshtein(name, &entity.name);
			if lev < min {
				min_entity = Some(entity);
				min = lev;
			}
		}

		// If the best match is still very far away, report a miss so the
		// caller can surface the raw text instead of silently guessing.
		let best = min_entity?;
		let max_len = name.len().max(best.name.len());
		if min > (max_len / 2).max(3) {
			return None;
		}

		Some(best)
	}
}
