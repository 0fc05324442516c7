//! Ordered concatenation of downloaded fragments into the final artifact.
//!
//! Pure byte-level concatenation in manifest index order; no container
//! remuxing. The destination is only ever created by an atomic rename of a
//! fully written `.part` file, so a failed merge leaves the destination path
//! exactly as it was before the job.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use crate::error::RetrievalError;
use crate::fetch::fragment_filename;
use crate::manifest::Manifest;
use crate::storage;

/// Concatenates every fragment of `manifest` from `fragment_dir` into
/// `destination`, strictly in index order.
///
/// Verifies that all fragment files exist before writing anything; a missing
/// fragment fails with `IncompleteFragmentSet` and performs no write at all.
pub fn merge(
    fragment_dir: &Path,
    manifest: &Manifest,
    destination: &Path,
) -> Result<PathBuf, RetrievalError> {
    let mut total: u64 = 0;
    let mut paths = Vec::with_capacity(manifest.len());
    for fragment in manifest.fragments() {
        let path = fragment_dir.join(fragment_filename(fragment.index));
        match fs::metadata(&path) {
            Ok(meta) => {
                total += meta.len();
                paths.push(path);
            }
            Err(_) => {
                return Err(RetrievalError::IncompleteFragmentSet {
                    index: fragment.index,
                });
            }
        }
    }

    let part = storage::temp_path(destination);
    let result = write_concat(&paths, total, &part, destination);
    if result.is_err() {
        let _ = fs::remove_file(&part);
    }
    result
}

fn write_concat(
    paths: &[PathBuf],
    total: u64,
    part: &Path,
    destination: &Path,
) -> Result<PathBuf, RetrievalError> {
    let file = File::create(part).map_err(RetrievalError::Reassembly)?;
    storage::preallocate(&file, total).map_err(RetrievalError::Reassembly)?;
    let mut writer = BufWriter::new(file);

    for path in paths {
        let mut fragment = File::open(path).map_err(RetrievalError::Reassembly)?;
        io::copy(&mut fragment, &mut writer).map_err(RetrievalError::Reassembly)?;
    }

    let file = writer
        .into_inner()
        .map_err(|e| RetrievalError::Reassembly(e.into_error()))?;
    file.sync_all().map_err(RetrievalError::Reassembly)?;
    drop(file);

    fs::rename(part, destination).map_err(RetrievalError::Reassembly)?;
    tracing::debug!(artifact = %destination.display(), bytes = total, "reassembly complete");
    Ok(destination.to_path_buf())
}
