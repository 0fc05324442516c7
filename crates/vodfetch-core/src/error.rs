//! Job-level error taxonomy.
//!
//! Per-attempt fragment errors live in `retry::FragmentError`; everything that
//! survives its local retry budget is surfaced here with enough detail (which
//! fragment, which stage) for the caller to diagnose without retrying blindly.

use crate::retry::FragmentError;

/// Terminal failure of a retrieval job. Carries the stage and, for fragment
/// failures, the index and the number of attempts that were used.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// Requested variant label is absent from the master playlist. A retry
    /// cannot fix a structurally absent variant, so this is surfaced before
    /// any fragment fetch is attempted.
    #[error("no variant matching {0:?} in master playlist")]
    NoMatchingVariant(String),

    /// The selected playlist parsed to zero fragments.
    #[error("manifest contains no fragments")]
    EmptyManifest,

    /// The master or variant playlist could not be retrieved.
    #[error("failed to fetch playlist: {0}")]
    ManifestFetch(#[source] FragmentError),

    /// One fragment exhausted its retry budget. In-flight fragments were
    /// allowed to drain, but the job never proceeds to reassembly.
    #[error("fragment {index} failed after {attempts} attempts: {source}")]
    FragmentDownloadFailed {
        index: usize,
        attempts: u32,
        #[source]
        source: FragmentError,
    },

    /// A fragment file was missing from the workspace at merge time. The
    /// destination path is left untouched.
    #[error("fragment {index} missing from workspace during reassembly")]
    IncompleteFragmentSet { index: usize },

    /// Local filesystem error while writing the final artifact. The partial
    /// temp file is removed; the destination path is left untouched.
    #[error("reassembly failed: {0}")]
    Reassembly(#[source] std::io::Error),

    /// Workspace directory could not be created.
    #[error("workspace error: {0}")]
    Workspace(#[source] std::io::Error),

    /// Job inputs failed validation (empty source, missing destination
    /// parent, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
