use std::fmt;

/// Which of the four entity families a catalog entry belongs to.
///
/// Detections carry this tag so consumers can match exhaustively instead of
/// probing for fields that happen to exist on one family but not another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
	Item,
	Tome,
	Character,
	Weapon,
}

impl fmt::Display for EntityKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Item => write!(f, "item"),
			Self::Tome => write!(f, "tome"),
			Self::Character => write!(f, "character"),
			Self::Weapon => write!(f, "weapon"),
		}
	}
}

/// Item rarity. Only items carry one; tomes, characters and weapons do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
	Common,
	Uncommon,
	Rare,
	Epic,
	Legendary,
}

impl Rarity {
	/// All rarities in rank order (lowest first).
	///
	/// This order doubles as the tie-break when two rarity border colors are
	/// equally close to a sampled cell border.
	pub const ALL: [Rarity; 5] = [
		Rarity::Common,
		Rarity::Uncommon,
		Rarity::Rare,
		Rarity::Epic,
		Rarity::Legendary,
	];

	pub fn rank(&self) -> u8 {
		match self {
			Self::Common => 0,
			Self::Uncommon => 1,
			Self::Rare => 2,
			Self::Epic => 3,
			Self::Legendary => 4,
		}
	}

	pub fn parse(s: &str) -> Option<Self> {
		match s.trim().to_ascii_lowercase().as_str() {
			"common" => Some(Self::Common),
			"uncommon" => Some(Self::Uncommon),
			"rare" => Some(Self::Rare),
			"epic" => Some(Self::Epic),
			"legendary" => Some(Self::Legendary),
			_ => None,
		}
	}
}

impl fmt::Display for Rarity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Common => write!(f, "common"),
			Self::Uncommon => write!(f, "uncommon"),
			Self::Rare => write!(f, "rare"),
			Self::Epic => write!(f, "epic"),
			Self::Legendary => write!(f, "legendary"),
		}
	}
}

/// Community tier grade. Pure catalog metadata; the detector never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
pub enum Tier {
	S,
	A,
	B,
	C,
	D,
}

impl Tier {
	pub fn parse(s: &str) -> Option<Self> {
		match s.trim().to_ascii_uppercase().as_str() {
			"S" => Some(Self::S),
			"A" => Some(Self::A),
			"B" => Some(Self::B),
			"C" => Some(Self::C),
			"D" => Some(Self::D),
			_ => None,
		}
	}
}

/// One entry of the static game data.
///
/// Loaded once at startup and never mutated afterwards; the rest of the
/// pipeline shares entries via `Arc`.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CatalogEntity {
	pub id: String,
	pub name: String,
	pub kind: EntityKind,
	/// Items only; `None` for tomes, characters and weapons.
	pub rarity: Option<Rarity>,
	pub tier: Option<Tier>,
	/// Relative path of the reference icon asset, when one exists.
	pub icon: Option<String>,
}
