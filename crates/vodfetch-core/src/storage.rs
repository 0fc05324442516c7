//! Temp-file naming and preallocation shared by fragment writes and reassembly.
//!
//! Both the fragment fetcher and the reassembler write to a `.part` path and
//! rename only once the content is complete, so a crash never leaves a
//! final-named file with partial bytes.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path
/// (e.g. `video.mp4` -> `video.mp4.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Preallocate `size` bytes. On Unix tries `posix_fallocate` for real block
/// allocation; falls back to `set_len` on failure or non-Unix.
pub fn preallocate(file: &File, size: u64) -> io::Result<()> {
    #[cfg(unix)]
    {
        let fd = file.as_raw_fd();
        let r = unsafe { libc::posix_fallocate(fd, 0, size as libc::off_t) };
        if r == 0 {
            return Ok(());
        }
        tracing::debug!(errno = r, "posix_fallocate failed, falling back to set_len");
    }
    file.set_len(size)
}
