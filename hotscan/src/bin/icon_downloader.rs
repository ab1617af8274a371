//! Fetches catalog icon assets into a local template directory.
//!
//! Icons already on disk are skipped, so reruns only pull what a game-data
//! update added. Individual download failures are reported and do not stop
//! the batch.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

fn main() -> Result<()> {
	let mut args = std::env::args().skip(1);
	let (Some(catalog_path), Some(base_url), Some(out_dir)) = (args.next(), args.next(), args.next())
	else {
		bail!("usage: icon_downloader <catalog.json> <base-url> <out-dir>");
	};

	let catalog = catalog::Catalog::from_path(&catalog_path)?;
	let out_dir = PathBuf::from(out_dir);
	std::fs::create_dir_all(&out_dir).with_context(|| format!("create {}", out_dir.display()))?;

	let base_url = base_url.trim_end_matches('/');
	let mut fetched = 0u32;
	let mut present = 0u32;
	let mut failed = 0u32;

	for entity in catalog.entities() {
		let Some(icon) = &entity.icon else { continue };

		let target = out_dir.join(icon);
		if target.is_file() {
			present += 1;
			continue;
		}
		if let Some(parent) = target.parent() {
			std::fs::create_dir_all(parent)
				.with_context(|| format!("create {}", parent.display()))?;
		}

		let url = format!("{base_url}/{icon}");
		match fetch(&url) {
			Ok(bytes) => {
				std::fs::write(&target, bytes)
					.with_context(|| format!("write {}", target.display()))?;
				fetched += 1;
			}
			Err(err) => {
				eprintln!("failed to fetch icon for {}: {err:#}", entity.id);
				failed += 1;
			}
		}
	}

	println!("icons: {fetched} fetched, {present} already present, {failed} failed");
	Ok(())
}

fn fetch(url: &str) -> Result<Vec<u8>> {
	let mut res = ureq::get(url).call().with_context(|| format!("GET {url}"))?;
	let bytes = res
		.body_mut()
		.read_to_vec()
		.with_context(|| format!("read body of {url}"))?;
	Ok(bytes)
}
