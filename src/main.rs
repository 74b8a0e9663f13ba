use clap::Parser;
use pmp_query_cache::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let global = cli.global;

    match cli.command {
        Command::Get(args) => cli::cache::get(&global, args).await,
        Command::Put(args) => cli::cache::put(&global, args).await,
        Command::Clear(args) => cli::cache::clear(&global, args).await,
        Command::Stats(args) => cli::cache::stats(&global, args).await,
        Command::Purge(args) => cli::cache::purge(&global, args).await,
        Command::Demo => cli::demo::run(&global).await,
    }
}
