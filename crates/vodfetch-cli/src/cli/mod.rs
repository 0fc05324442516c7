//! CLI for the vodfetch VOD retriever.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vodfetch_core::config;

use commands::{run_checksum, run_fetch, run_variants, FetchArgs};

/// Top-level CLI for the vodfetch VOD retriever.
#[derive(Debug, Parser)]
#[command(name = "vodfetch")]
#[command(about = "vodfetch: segmented HLS VOD retriever", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Retrieve one variant of a VOD into a single artifact file.
    Fetch {
        /// Master playlist URL.
        manifest_url: String,

        /// Variant/bitrate label to retrieve (e.g. "720p60", "chunked").
        #[arg(long)]
        variant: String,

        /// Output artifact path.
        #[arg(long, short)]
        output: PathBuf,

        /// Concurrent fragment downloads (default from config).
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,

        /// Attempts per fragment, including the first (default from config).
        #[arg(long, value_name = "N")]
        retries: Option<u32>,

        /// Per-fragment timeout in seconds (default: transport defaults only).
        #[arg(long, value_name = "SECS")]
        timeout_secs: Option<u64>,

        /// Authorization signature appended to the manifest URL.
        #[arg(long, requires = "auth_token", value_name = "SIG")]
        auth_sig: Option<String>,

        /// Authorization token value appended to the manifest URL.
        #[arg(long, requires = "auth_sig", value_name = "TOKEN")]
        auth_token: Option<String>,

        /// Extra request header, repeatable ("Name: value").
        #[arg(long = "header", value_name = "NAME:VALUE")]
        headers: Vec<String>,
    },

    /// List variant labels present in a master playlist.
    Variants {
        /// Master playlist URL.
        manifest_url: String,
    },

    /// Compute SHA-256 of a file (e.g. after retrieval).
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch {
                manifest_url,
                variant,
                output,
                concurrency,
                retries,
                timeout_secs,
                auth_sig,
                auth_token,
                headers,
            } => run_fetch(
                &cfg,
                FetchArgs {
                    manifest_url,
                    variant,
                    output,
                    concurrency,
                    retries,
                    timeout_secs,
                    auth_sig,
                    auth_token,
                    headers,
                },
            ),
            CliCommand::Variants { manifest_url } => run_variants(&manifest_url),
            CliCommand::Checksum { path } => run_checksum(&path),
        }
    }
}

#[cfg(test)]
pub(crate) fn parse(argv: &[&str]) -> CliCommand {
    Cli::parse_from(argv).command
}
