//! Strategy configuration.
//!
//! A `Strategy` is immutable for the duration of a detection run and
//! swappable between runs. Hosting applications that let the user pick a
//! speed/accuracy trade-off once can persist it as JSON in the platform
//! config directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use catalog::Rarity;
use serde::{Deserialize, Serialize};

pub use cv::Algorithm;

/// Candidate pre-filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateFilter {
    /// Every template is a candidate for every cell.
    None,
    /// Restrict to templates matching the cell's detected border rarity,
    /// narrowed further by color-profile overlap.
    RarityFirst,
    /// Restrict to templates sharing the cell's dominant color bucket.
    ColorFirst,
}

/// Acceptance thresholds for the three matching passes.
///
/// Pass 1 is the strictest; single-pass matching reuses the pass-2 tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub pass1: f32,
    pub pass2: f32,
    pub pass3: f32,
}

impl Thresholds {
    pub fn for_pass(&self, pass: usize) -> f32 {
        match pass {
            0 => self.pass1,
            1 => self.pass2,
            _ => self.pass3,
        }
    }
}

/// Strategy-wide default thresholds plus optional per-rarity overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    pub default: Thresholds,
    #[serde(default)]
    pub per_rarity: BTreeMap<Rarity, Thresholds>,
}

impl ThresholdTable {
    pub fn for_rarity(&self, rarity: Option<Rarity>) -> Thresholds {
        rarity
            .and_then(|r| self.per_rarity.get(&r).copied())
            .unwrap_or(self.default)
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        let mut per_rarity = BTreeMap::new();
        // Legendary icons are visually distinctive; demand more before
        // accepting one, and allow the relaxed pass to stay stricter too.
        per_rarity.insert(
            Rarity::Legendary,
            Thresholds { pass1: 0.88, pass2: 0.80, pass3: 0.70 },
        );

        Self {
            default: Thresholds { pass1: 0.85, pass2: 0.75, pass3: 0.62 },
            per_rarity,
        }
    }
}

/// Full matching configuration for one detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub algorithm: Algorithm,
    pub filter: CandidateFilter,

    /// Three decreasing-threshold passes instead of a single pass-2 check.
    pub multi_pass: bool,
    /// Skip cells whose pixel variance marks them as empty slots.
    pub skip_empty_cells: bool,
    /// Scale scores by whether the cell's border rarity agrees with the candidate.
    pub border_validation: bool,
    /// Small additive nudges by candidate rarity.
    pub rarity_context_boost: bool,
    /// Subtract learned penalties for previously corrected false positives.
    pub feedback_penalty: bool,

    pub thresholds: ThresholdTable,
    /// Total R+G+B variance below which a cell counts as empty.
    pub empty_cell_variance: f32,
}

impl Default for Strategy {
    fn default() -> Self {
        Self::balanced()
    }
}

impl Strategy {
    /// Cheapest settings: SSD over color-bucketed candidates, one pass.
    pub fn fast() -> Self {
        Self {
            algorithm: Algorithm::Ssd,
            filter: CandidateFilter::ColorFirst,
            multi_pass: false,
            skip_empty_cells: true,
            border_validation: false,
            rarity_context_boost: false,
            feedback_penalty: false,
            thresholds: ThresholdTable::default(),
            empty_cell_variance: cv::EMPTY_CELL_VARIANCE,
        }
    }

    /// The default trade-off: NCC with rarity pre-filtering and all score
    /// adjustments enabled.
    pub fn balanced() -> Self {
        Self {
            algorithm: Algorithm::Ncc,
            filter: CandidateFilter::RarityFirst,
            multi_pass: true,
            skip_empty_cells: true,
            border_validation: true,
            rarity_context_boost: true,
            feedback_penalty: true,
            thresholds: ThresholdTable::default(),
            empty_cell_variance: cv::EMPTY_CELL_VARIANCE,
        }
    }

    /// Most thorough: SSIM against the full template set, empty-cell
    /// skipping disabled.
    pub fn thorough() -> Self {
        Self {
            algorithm: Algorithm::Ssim,
            filter: CandidateFilter::None,
            multi_pass: true,
            skip_empty_cells: false,
            border_validation: true,
            rarity_context_boost: true,
            feedback_penalty: true,
            thresholds: ThresholdTable::default(),
            empty_cell_variance: cv::EMPTY_CELL_VARIANCE,
        }
    }

    /// Path to the persisted strategy file.
    pub fn path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("config_dir() unavailable")?;
        Ok(base.join("hotscan.json"))
    }

    /// Load the persisted strategy, falling back to defaults on any failure.
    pub fn load_or_default() -> Self {
        match Self::try_load() {
            Ok(strategy) => strategy,
            Err(err) => {
                log::warn!("failed to load strategy config; using defaults: {err:#}");
                Self::default()
            }
        }
    }

    pub fn try_load() -> Result<Self> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(&path).with_context(|| format!("read {:?}", path))?;
        let strategy = serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))?;
        Ok(strategy)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize strategy")?;
        fs::write(&path, json).with_context(|| format!("write {:?}", path))?;
        Ok(())
    }
}
