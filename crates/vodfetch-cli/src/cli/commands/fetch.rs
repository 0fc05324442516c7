//! `vodfetch fetch` – run one retrieval job.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use vodfetch_core::config::VodfetchConfig;
use vodfetch_core::job::{ManifestSource, RetrievalJob, RetrievalOptions};
use vodfetch_core::source::{signed_manifest_url, AccessToken};

#[derive(Debug)]
pub struct FetchArgs {
    pub manifest_url: String,
    pub variant: String,
    pub output: PathBuf,
    pub concurrency: Option<usize>,
    pub retries: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub auth_sig: Option<String>,
    pub auth_token: Option<String>,
    pub headers: Vec<String>,
}

pub fn run_fetch(cfg: &VodfetchConfig, args: FetchArgs) -> Result<()> {
    let mut manifest_url = Url::parse(&args.manifest_url).context("invalid manifest URL")?;
    if let (Some(signature), Some(value)) = (args.auth_sig, args.auth_token) {
        let token = AccessToken { signature, value };
        manifest_url = signed_manifest_url(&manifest_url, &token);
    }

    let mut retry = cfg.retry_policy();
    if let Some(n) = args.retries {
        retry.max_attempts = n.max(1);
    }

    let options = RetrievalOptions {
        concurrency: args.concurrency.unwrap_or(cfg.concurrency).max(1),
        retry,
        timeout: args
            .timeout_secs
            .map(Duration::from_secs)
            .or_else(|| cfg.fragment_timeout()),
        headers: parse_headers(&args.headers)?,
        workspace_root: None,
    };

    let mut job = RetrievalJob::new(
        ManifestSource::Remote(manifest_url),
        &args.variant,
        &args.output,
        options,
    );
    let artifact = job.retrieve()?;
    println!("Saved {}", artifact.display());
    Ok(())
}

/// Parses repeated "Name: value" flags into a header map.
fn parse_headers(raw: &[String]) -> Result<HashMap<String, String>> {
    let mut headers = HashMap::new();
    for entry in raw {
        let Some((name, value)) = entry.split_once(':') else {
            bail!("malformed header {:?}, expected \"Name: value\"", entry);
        };
        headers.insert(name.trim().to_string(), value.trim().to_string());
    }
    Ok(headers)
}
