//! Playlist parsing: master variant selection and fragment extraction.
//!
//! Input is line-oriented playlist text. Directive lines start with `#` and
//! are ignored for extraction; fragment lines end in `.ts` (before any query
//! string) and are resolved against the playlist's base URI. The literal line
//! order of the selected playlist is authoritative and is preserved through
//! every later stage.

use url::Url;

use crate::error::RetrievalError;

/// File suffix that identifies a fragment line.
const FRAGMENT_SUFFIX: &str = ".ts";

/// One addressable fragment of the asset. Created once during parsing and
/// never mutated; `index` is the position in playback/byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentRef {
    pub index: usize,
    pub uri: Url,
}

/// Ordered fragment list for one variant. Indices are contiguous from 0 and
/// strictly increasing in sequence order.
#[derive(Debug, Clone)]
pub struct Manifest {
    variant: String,
    fragments: Vec<FragmentRef>,
}

impl Manifest {
    pub fn new(variant: impl Into<String>, fragments: Vec<FragmentRef>) -> Self {
        Self {
            variant: variant.into(),
            fragments,
        }
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn fragments(&self) -> &[FragmentRef] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// True for a non-directive line whose path portion ends in the fragment suffix.
fn is_fragment_line(line: &str) -> bool {
    if line.is_empty() || line.starts_with('#') {
        return false;
    }
    let path = line.split('?').next().unwrap_or(line);
    path.ends_with(FRAGMENT_SUFFIX)
}

/// Picks the sub-playlist URI for the requested variant label out of a master
/// playlist. Candidate lines are non-directive URIs (absolute, or resolvable
/// against `base`) containing the label; the first match wins.
///
/// Fails with `NoMatchingVariant` when no line matches; a retry cannot fix a
/// structurally absent variant.
pub fn select_variant(master: &str, variant: &str, base: &Url) -> Result<Url, RetrievalError> {
    for line in master.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !line.contains(variant) {
            continue;
        }
        if let Ok(uri) = base.join(line) {
            if uri.scheme() == "http" || uri.scheme() == "https" {
                return Ok(uri);
            }
        }
    }
    Err(RetrievalError::NoMatchingVariant(variant.to_string()))
}

/// Lists the variant labels present in a master playlist, in playlist order,
/// deduplicated. The label is the parent path segment of each sub-playlist
/// URI (e.g. `.../720p60/index-dvr.m3u8` -> `720p60`).
pub fn variant_labels(master: &str) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for line in master.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Ok(uri) = Url::parse(line) else {
            continue;
        };
        let Some(segments) = uri.path_segments() else {
            continue;
        };
        let parts: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
        if parts.len() < 2 {
            continue;
        }
        let label = parts[parts.len() - 2].to_string();
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

/// Parses a variant playlist into an ordered `Manifest`. Fragment lines are
/// taken in literal order and resolved against `base`; indices are assigned
/// 0..n in that order. Pure parse, no side effects.
pub fn parse(playlist: &str, base: &Url, variant: &str) -> Manifest {
    let mut fragments = Vec::new();
    for line in playlist.lines() {
        let line = line.trim();
        if !is_fragment_line(line) {
            continue;
        }
        match base.join(line) {
            Ok(uri) => fragments.push(FragmentRef {
                index: fragments.len(),
                uri,
            }),
            Err(e) => {
                tracing::warn!(line, error = %e, "skipping unresolvable fragment line");
            }
        }
    }
    Manifest::new(variant, fragments)
}
