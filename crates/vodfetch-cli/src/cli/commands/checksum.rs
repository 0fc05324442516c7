//! `vodfetch checksum` – SHA-256 of a finished artifact.

use anyhow::Result;
use std::path::Path;

use vodfetch_core::checksum;

pub fn run_checksum(path: &Path) -> Result<()> {
    let digest = checksum::sha256_path(path)?;
    println!("{digest}  {}", path.display());
    Ok(())
}
