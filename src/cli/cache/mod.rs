//! Cache maintenance commands

use anyhow::Context;
use clap::Args;

use super::{bootstrap, GlobalArgs};
use crate::domain::{CacheStats, LookupOutcome, Scope, WriteOutcome};
use crate::infrastructure::services::QueryCacheService;

#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Session scope; omit for the global scope (or every scope for maintenance)
    #[arg(long)]
    pub session: Option<String>,
}

impl ScopeArgs {
    fn lookup_scope(&self) -> Scope {
        Scope::from_session_id(self.session.as_deref())
    }

    fn maintenance_scope(&self) -> Option<Scope> {
        self.session.as_deref().map(Scope::session)
    }
}

#[derive(Args, Debug)]
pub struct GetArgs {
    pub query: String,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Args, Debug)]
pub struct PutArgs {
    pub query: String,

    pub response: String,

    /// Extra metadata stored with the entry, as a JSON object
    #[arg(long)]
    pub metadata: Option<String>,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Print statistics as JSON
    #[arg(long)]
    pub json: bool,
}

async fn open_cache(global: &GlobalArgs) -> anyhow::Result<QueryCacheService> {
    let config = bootstrap(global)?;

    crate::try_create_query_cache(&config)
        .await
        .context("failed to open query cache")
}

pub async fn get(global: &GlobalArgs, args: GetArgs) -> anyhow::Result<()> {
    let cache = open_cache(global).await?;

    match cache.lookup(&args.query, &args.scope.lookup_scope()).await {
        LookupOutcome::Hit(hit) => {
            println!("HIT (similarity {:.4}, age {}s)", hit.similarity, hit.age.as_secs());
            println!("{}", hit.response_text);
        }
        LookupOutcome::Miss(reason) => println!("MISS ({:?})", reason),
        LookupOutcome::Failed(e) => println!("MISS (cache error: {})", e),
    }

    Ok(())
}

pub async fn put(global: &GlobalArgs, args: PutArgs) -> anyhow::Result<()> {
    let metadata = args
        .metadata
        .as_deref()
        .map(parse_metadata)
        .transpose()?;

    let cache = open_cache(global).await?;
    let outcome = cache
        .store_response(&args.query, &args.response, &args.scope.lookup_scope(), metadata)
        .await;

    match outcome {
        WriteOutcome::Stored(id) => println!("Stored {}", id),
        WriteOutcome::Skipped(reason) => println!("Skipped ({:?})", reason),
        WriteOutcome::Failed(e) => anyhow::bail!("failed to store response: {}", e),
    }

    Ok(())
}

pub async fn clear(global: &GlobalArgs, args: ScopeArgs) -> anyhow::Result<()> {
    let cache = open_cache(global).await?;
    let removed = cache.clear(args.maintenance_scope().as_ref()).await?;

    println!("Removed {} entries", removed);

    Ok(())
}

pub async fn purge(global: &GlobalArgs, args: ScopeArgs) -> anyhow::Result<()> {
    let cache = open_cache(global).await?;
    let removed = cache.purge_expired(args.maintenance_scope().as_ref()).await?;

    println!("Purged {} expired entries", removed);

    Ok(())
}

pub async fn stats(global: &GlobalArgs, args: StatsArgs) -> anyhow::Result<()> {
    let cache = open_cache(global).await?;
    let stats = cache.stats(args.scope.maintenance_scope().as_ref()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
    }

    Ok(())
}

pub(crate) fn print_stats(stats: &CacheStats) {
    println!("Enabled:              {}", stats.enabled);
    println!("Total entries:        {}", stats.entry_count);
    println!("Similarity threshold: {}", stats.similarity_threshold);
    println!("TTL:                  {:.1} hours", stats.ttl_hours());
}

fn parse_metadata(raw: &str) -> anyhow::Result<serde_json::Value> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("--metadata must be valid JSON")?;

    anyhow::ensure!(value.is_object(), "--metadata must be a JSON object");

    Ok(value)
}
