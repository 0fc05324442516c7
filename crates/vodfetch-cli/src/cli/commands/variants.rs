//! `vodfetch variants` – list variant labels in a master playlist.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use vodfetch_core::manifest;
use vodfetch_core::source;

pub fn run_variants(manifest_url: &str) -> Result<()> {
    let url = Url::parse(manifest_url).context("invalid manifest URL")?;
    let master = source::fetch_playlist(&url, &HashMap::new(), Some(Duration::from_secs(30)))
        .map_err(|e| anyhow::anyhow!("fetch master playlist: {}", e))?;

    let labels = manifest::variant_labels(&master);
    if labels.is_empty() {
        println!("No variants found");
        return Ok(());
    }
    for label in labels {
        println!("{label}");
    }
    Ok(())
}
