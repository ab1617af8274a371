//! Raw shape of the exported game data file.
//!
//! The export is produced by external tooling; fields we don't consume are
//! ignored. Rarity and tier arrive as free-form strings and are validated
//! during conversion, with unknown values logged and dropped to `None`.

use crate::entity::{CatalogEntity, EntityKind, Rarity, Tier};

#[derive(Debug, serde::Deserialize)]
pub struct RawCatalog {
	#[serde(default)]
	pub items: Vec<RawEntity>,
	#[serde(default)]
	pub tomes: Vec<RawEntity>,
	#[serde(default)]
	pub characters: Vec<RawEntity>,
	#[serde(default)]
	pub weapons: Vec<RawEntity>,
}

#[derive(Debug, serde::Deserialize)]
pub struct RawEntity {
	pub id: String,
	pub name: String,
	#[serde(default)]
	pub rarity: Option<String>,
	#[serde(default)]
	pub tier: Option<String>,
	#[serde(default)]
	pub icon: Option<String>,
}

impl RawEntity {
	pub fn into_entity(self, kind: EntityKind) -> CatalogEntity {
		let rarity = self.rarity.as_deref().and_then(|s| {
			let parsed = Rarity::parse(s);
			if parsed.is_none() {
				log::warn!("unknown rarity {s:?} on {}", self.id);
			}
			parsed
		});
		let tier = self.tier.as_deref().and_then(Tier::parse);

		CatalogEntity {
			id: self.id,
			name: self.name,
			kind,
			rarity,
			tier,
			icon: self.icon,
		}
	}
}
