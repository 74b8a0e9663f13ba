//! CLI module for PMP Query Cache
//!
//! Operator commands over a persistent query cache:
//! - `get` / `put`: look up or store an answer
//! - `clear` / `purge`: drop all entries or only expired ones
//! - `stats`: entry count and configuration
//! - `demo`: walk through hits, paraphrases and misses on a scratch cache

pub mod cache;
pub mod demo;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::embedding::EmbeddingSettings;
use crate::infrastructure::logging::init_logging;

/// Store used by the CLI when the configuration names none
pub const DEFAULT_PERSIST_DIRECTORY: &str = "query_cache_db";

/// Default store for `--offline` runs, kept apart from remote-provider vectors
pub const DEFAULT_OFFLINE_PERSIST_DIRECTORY: &str = "query_cache_db_offline";

/// PMP Query Cache - semantic cache for question answering
#[derive(Parser)]
#[command(name = "pmp-query-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Cache directory (overrides configuration)
    #[arg(long, global = true)]
    pub persist_dir: Option<PathBuf>,

    /// Use the local hashing embedder instead of a remote provider
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Look up a cached answer
    Get(cache::GetArgs),

    /// Store an answer for a query
    Put(cache::PutArgs),

    /// Remove cached entries
    Clear(cache::ScopeArgs),

    /// Show cache statistics
    Stats(cache::StatsArgs),

    /// Remove expired entries
    Purge(cache::ScopeArgs),

    /// Run an end-to-end demonstration on a scratch cache
    Demo,
}

/// Load configuration, apply command-line overrides and start logging
pub fn bootstrap(global: &GlobalArgs) -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::load()?;
    apply_overrides(&mut config, global);

    init_logging(&config.logging);

    Ok(config)
}

fn apply_overrides(config: &mut AppConfig, global: &GlobalArgs) {
    if let Some(dir) = &global.persist_dir {
        config.cache.persist_directory = Some(dir.clone());
    }

    if config.cache.persist_directory.is_none() {
        let default = if global.offline {
            DEFAULT_OFFLINE_PERSIST_DIRECTORY
        } else {
            DEFAULT_PERSIST_DIRECTORY
        };
        config.cache.persist_directory = Some(PathBuf::from(default));
    }

    if global.offline {
        config.embedding = EmbeddingSettings::hashing(config.embedding.dimensions);
    }
}
