//! Single-fragment HTTP GET with bounded retry and atomic write.
//!
//! Each fragment is written to `<index>.ts.part` and renamed to its final
//! zero-padded name only after the transfer completed and the status was
//! verified, so the reassembler never sees a half-written fragment.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::manifest::FragmentRef;
use crate::retry::{run_with_retry, FragmentError, RetryPolicy};
use crate::storage;

/// Fixed width of the zero-padded fragment index in file names. Directory
/// listing order coincides with playback order up to 10^8 fragments.
const INDEX_WIDTH: usize = 8;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Terminal result of one fragment: the local file on success, the last
/// attempt's error on failure, and the number of attempts that were used.
#[derive(Debug)]
pub struct FragmentResult {
    pub fragment: FragmentRef,
    pub outcome: Result<PathBuf, FragmentError>,
    pub attempts: u32,
}

/// File name for a fragment index: zero-padded so lexicographic order equals
/// playback order (`42` -> `00000042.ts`).
pub fn fragment_filename(index: usize) -> String {
    format!("{:0width$}.ts", index, width = INDEX_WIDTH)
}

/// Downloads one fragment into `dest_dir`, retrying per `policy`.
///
/// A response counts as successful only on a 2xx status with a non-empty
/// body; any other status, curl error, or timeout counts against the retry
/// budget. Never panics past this boundary; the caller decides what a failed
/// fragment means for the overall job.
pub fn fetch_fragment(
    fragment: &FragmentRef,
    dest_dir: &Path,
    headers: &HashMap<String, String>,
    timeout: Option<Duration>,
    policy: &RetryPolicy,
) -> FragmentResult {
    let final_path = dest_dir.join(fragment_filename(fragment.index));
    let part_path = storage::temp_path(&final_path);

    let mut attempts = 0u32;
    let outcome = run_with_retry(policy, || {
        attempts += 1;
        download_once(fragment.uri.as_str(), headers, timeout, &part_path)?;
        std::fs::rename(&part_path, &final_path).map_err(FragmentError::Storage)?;
        Ok(final_path.clone())
    });

    if outcome.is_err() {
        let _ = std::fs::remove_file(&part_path);
    }

    FragmentResult {
        fragment: fragment.clone(),
        outcome,
        attempts,
    }
}

/// One GET attempt: body streamed into `part_path`, truncating any stale
/// partial content from a previous attempt.
fn download_once(
    url: &str,
    custom_headers: &HashMap<String, String>,
    timeout: Option<Duration>,
    part_path: &Path,
) -> Result<(), FragmentError> {
    let file = File::create(part_path).map_err(FragmentError::Storage)?;
    let mut writer = BufWriter::new(file);
    let mut storage_error: Option<std::io::Error> = None;
    let mut bytes_received: u64 = 0;

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(FragmentError::Curl)?;
    easy.follow_location(true).map_err(FragmentError::Curl)?;
    easy.connect_timeout(CONNECT_TIMEOUT)
        .map_err(FragmentError::Curl)?;
    if let Some(t) = timeout {
        easy.timeout(t).map_err(FragmentError::Curl)?;
    }

    let mut list = curl::easy::List::new();
    for (k, v) in custom_headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))
            .map_err(FragmentError::Curl)?;
    }
    if !custom_headers.is_empty() {
        easy.http_headers(list).map_err(FragmentError::Curl)?;
    }

    let perform_result = {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                bytes_received += data.len() as u64;
                match writer.write_all(data) {
                    Ok(()) => Ok(data.len()),
                    Err(e) => {
                        storage_error = Some(e);
                        Ok(0) // abort transfer
                    }
                }
            })
            .map_err(FragmentError::Curl)?;
        transfer.perform()
    };

    if let Err(e) = perform_result {
        if e.is_write_error() {
            if let Some(io_err) = storage_error.take() {
                return Err(FragmentError::Storage(io_err));
            }
        }
        return Err(FragmentError::Curl(e));
    }

    let code = easy.response_code().map_err(FragmentError::Curl)? as u32;
    if !(200..300).contains(&code) {
        return Err(FragmentError::Http(code));
    }
    if bytes_received == 0 {
        return Err(FragmentError::EmptyBody);
    }

    writer.flush().map_err(FragmentError::Storage)?;
    Ok(())
}
