//! Retrieval job orchestration.
//!
//! Drives one retrieval end to end: manifest resolution, workspace
//! acquisition, scheduled fragment fetching, reassembly. The workspace is
//! released on every exit path before the outcome is returned.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::error::RetrievalError;
use crate::fetch;
use crate::manifest::{self, Manifest};
use crate::reassemble;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::scheduler;
use crate::source;
use crate::workspace::Workspace;

/// Where the master playlist comes from: fetched over HTTP, or supplied
/// directly by a collaborator together with the base URI for resolution.
#[derive(Debug, Clone)]
pub enum ManifestSource {
    Remote(Url),
    Inline { master: String, base: Url },
}

/// Per-job knobs. Passed explicitly so parallel jobs can run with different
/// policies; nothing here is global state.
#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    /// Concurrent fragment downloads.
    pub concurrency: usize,
    /// Retry policy shared by playlist and fragment fetches.
    pub retry: RetryPolicy,
    /// Per-fragment overall timeout; `None` means transport defaults only.
    pub timeout: Option<Duration>,
    /// Extra request headers (e.g. client identification).
    pub headers: HashMap<String, String>,
    /// Override for the workspace root; `None` uses the system temp dir.
    pub workspace_root: Option<PathBuf>,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            concurrency: 10,
            retry: RetryPolicy::default(),
            timeout: None,
            headers: HashMap::new(),
            workspace_root: None,
        }
    }
}

/// Job lifecycle. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    ManifestResolved,
    Fetching,
    Reassembling,
    Completed,
    Failed,
}

/// One retrieval of one variant into one destination artifact.
pub struct RetrievalJob {
    source: ManifestSource,
    variant: String,
    destination: PathBuf,
    options: RetrievalOptions,
    state: JobState,
}

impl RetrievalJob {
    pub fn new(
        source: ManifestSource,
        variant: impl Into<String>,
        destination: impl Into<PathBuf>,
        options: RetrievalOptions,
    ) -> Self {
        Self {
            source,
            variant: variant.into(),
            destination: destination.into(),
            options,
            state: JobState::Created,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Runs the job to a terminal state and returns the artifact path on
    /// success. The caller owns the decision to retry a failed job; nothing
    /// is retried at this level.
    pub fn retrieve(&mut self) -> Result<PathBuf, RetrievalError> {
        let result = self.run();
        match &result {
            Ok(path) => {
                self.state = JobState::Completed;
                tracing::info!(artifact = %path.display(), "retrieval complete");
            }
            Err(e) => {
                self.state = JobState::Failed;
                tracing::error!(error = %e, "retrieval failed");
            }
        }
        result
    }

    fn run(&mut self) -> Result<PathBuf, RetrievalError> {
        self.validate()?;

        let (master, base) = self.master_playlist()?;
        let variant_url = manifest::select_variant(&master, &self.variant, &base)?;
        tracing::debug!(variant = %self.variant, url = %variant_url, "variant selected");

        let playlist = run_with_retry(&self.options.retry, || {
            source::fetch_playlist(&variant_url, &self.options.headers, self.options.timeout)
        })
        .map_err(RetrievalError::ManifestFetch)?;

        let parsed = manifest::parse(&playlist, &variant_url, &self.variant);
        if parsed.is_empty() {
            return Err(RetrievalError::EmptyManifest);
        }
        self.state = JobState::ManifestResolved;
        tracing::info!(
            variant = %self.variant,
            fragments = parsed.len(),
            "manifest resolved"
        );

        let workspace = match &self.options.workspace_root {
            Some(root) => Workspace::acquire_in(root),
            None => Workspace::acquire(),
        }
        .map_err(RetrievalError::Workspace)?;

        let outcome = self.fetch_and_merge(&parsed, &workspace);

        // Unconditional cleanup before the outcome is surfaced. A release
        // error after a successful merge does not fail the job; the artifact
        // is already in place.
        if let Err(e) = workspace.release() {
            tracing::warn!(error = %e, "workspace release failed");
        }

        outcome
    }

    fn master_playlist(&self) -> Result<(String, Url), RetrievalError> {
        match &self.source {
            ManifestSource::Remote(url) => {
                let master = run_with_retry(&self.options.retry, || {
                    source::fetch_playlist(url, &self.options.headers, self.options.timeout)
                })
                .map_err(RetrievalError::ManifestFetch)?;
                Ok((master, url.clone()))
            }
            ManifestSource::Inline { master, base } => Ok((master.clone(), base.clone())),
        }
    }

    fn fetch_and_merge(
        &mut self,
        manifest: &Manifest,
        workspace: &Workspace,
    ) -> Result<PathBuf, RetrievalError> {
        self.state = JobState::Fetching;
        let dest_dir = workspace.path();
        let options = &self.options;
        let results = scheduler::run(manifest, options.concurrency, |fragment| {
            fetch::fetch_fragment(
                fragment,
                dest_dir,
                &options.headers,
                options.timeout,
                &options.retry,
            )
        });

        for result in results {
            if let Err(source) = result.outcome {
                return Err(RetrievalError::FragmentDownloadFailed {
                    index: result.fragment.index,
                    attempts: result.attempts,
                    source,
                });
            }
        }

        self.state = JobState::Reassembling;
        reassemble::merge(workspace.path(), manifest, &self.destination)
    }

    fn validate(&self) -> Result<(), RetrievalError> {
        if self.variant.trim().is_empty() {
            return Err(RetrievalError::InvalidInput(
                "variant label is empty".to_string(),
            ));
        }
        if let ManifestSource::Inline { master, .. } = &self.source {
            if master.trim().is_empty() {
                return Err(RetrievalError::InvalidInput(
                    "manifest body is empty".to_string(),
                ));
            }
        }
        let parent = destination_parent(&self.destination);
        if !parent.is_dir() {
            return Err(RetrievalError::InvalidInput(format!(
                "destination parent {} is not a directory",
                parent.display()
            )));
        }
        Ok(())
    }
}

fn destination_parent(destination: &Path) -> PathBuf {
    match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline_source(master: &str) -> ManifestSource {
        ManifestSource::Inline {
            master: master.to_string(),
            base: Url::parse("https://vod.example.com/").unwrap(),
        }
    }

    const MASTER: &str = "\
#EXTM3U
https://vod.example.com/v1/720p60/index-dvr.m3u8
https://vod.example.com/v1/480p30/index-dvr.m3u8
";

    #[test]
    fn default_options() {
        let opts = RetrievalOptions::default();
        assert_eq!(opts.concurrency, 10);
        assert_eq!(opts.retry.max_attempts, 5);
        assert!(opts.timeout.is_none());
        assert!(opts.headers.is_empty());
        assert!(opts.workspace_root.is_none());
    }

    #[test]
    fn missing_destination_parent_fails_the_same_way_twice() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("no-such-dir").join("clip.mp4");

        for _ in 0..2 {
            let mut job = RetrievalJob::new(
                inline_source(MASTER),
                "720p60",
                &dest,
                RetrievalOptions::default(),
            );
            let err = job.retrieve().unwrap_err();
            assert!(matches!(err, RetrievalError::InvalidInput(_)));
            assert_eq!(job.state(), JobState::Failed);
            assert!(!dest.exists());
        }
    }

    #[test]
    fn empty_variant_label_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = RetrievalJob::new(
            inline_source(MASTER),
            "",
            dir.path().join("clip.mp4"),
            RetrievalOptions::default(),
        );
        assert!(matches!(
            job.retrieve(),
            Err(RetrievalError::InvalidInput(_))
        ));
    }

    #[test]
    fn empty_manifest_body_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = RetrievalJob::new(
            inline_source("   \n"),
            "720p60",
            dir.path().join("clip.mp4"),
            RetrievalOptions::default(),
        );
        assert!(matches!(
            job.retrieve(),
            Err(RetrievalError::InvalidInput(_))
        ));
    }

    #[test]
    fn absent_variant_fails_before_any_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = RetrievalJob::new(
            inline_source(MASTER),
            "1080p",
            dir.path().join("clip.mp4"),
            RetrievalOptions::default(),
        );
        let err = job.retrieve().unwrap_err();
        assert!(matches!(err, RetrievalError::NoMatchingVariant(l) if l == "1080p"));
        assert_eq!(job.state(), JobState::Failed);
    }
}
