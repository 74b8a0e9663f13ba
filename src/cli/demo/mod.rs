//! Demo command - exercises the cache end to end on a scratch in-memory store

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use super::cache::print_stats;
use super::{bootstrap, GlobalArgs};
use crate::config::AppConfig;
use crate::domain::conversation::{ResponseGenerator, Turn};
use crate::domain::{DomainError, Scope};
use crate::infrastructure::services::ChatSession;

const DEMO_SESSION: &str = "demo_session";

const SEED: &[(&str, &str)] = &[
    (
        "What is machine learning?",
        "Machine learning is a subset of AI that enables systems to learn from data.",
    ),
    (
        "Explain deep learning",
        "Deep learning is a subset of machine learning using neural networks with many layers.",
    ),
    (
        "What is RAG?",
        "RAG stands for Retrieval-Augmented Generation, combining retrieval with generation.",
    ),
];

const PARAPHRASES: &[&str] = &[
    "What's machine learning?",
    "Can you explain machine learning?",
    "Tell me about ML",
];

const UNRELATED: &str = "What is the weather today?";

/// Stand-in for the LLM: numbered canned answers
#[derive(Debug, Default)]
struct CannedGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl ResponseGenerator for CannedGenerator {
    async fn generate(&self, query: &str, _history: &[Turn]) -> Result<String, DomainError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        Ok(format!("Generated answer #{} for: {}", n, query))
    }
}

fn demo_config(mut config: AppConfig) -> AppConfig {
    config.cache = config
        .cache
        .with_enabled(true)
        .with_similarity_threshold(0.90)
        .with_ttl(Duration::from_secs(3600));
    config.cache.persist_directory = None;
    config
}

pub async fn run(global: &GlobalArgs) -> anyhow::Result<()> {
    let config = demo_config(bootstrap(global)?);

    println!("{}", "=".repeat(60));
    println!("Query Cache Demo");
    println!("{}", "=".repeat(60));

    println!("\n1. Initializing query cache...");
    let cache = Arc::new(
        crate::try_create_query_cache(&config)
            .await
            .context("cache setup failed (set OPENAI_API_KEY or pass --offline)")?,
    );
    println!("   ok: threshold {}", config.cache.similarity_threshold);

    let scope = Scope::session(DEMO_SESSION);

    println!("\n2. Adding query-response pairs...");
    for (query, response) in SEED {
        cache.put(query, response, &scope).await;
        println!("   cached: '{}'", query);
    }

    println!("\n3. Exact query (expect HIT)...");
    let exact = cache.get(SEED[0].0, &scope).await;
    match exact.response_text() {
        Some(text) => println!("   HIT: '{}'", text),
        None => println!("   MISS (unexpected)"),
    }

    println!("\n4. Similar queries (semantic matching)...");
    for query in PARAPHRASES {
        let label = if cache.get(query, &scope).await.is_hit() {
            "HIT "
        } else {
            "MISS"
        };
        println!("   {} '{}'", label, query);
    }

    println!("\n5. Cache stats...");
    print_stats(&cache.stats(None).await?);

    println!("\n6. Unrelated query (expect MISS)...");
    if cache.get(UNRELATED, &scope).await.is_hit() {
        println!("   unexpected HIT for '{}'", UNRELATED);
    } else {
        println!("   MISS for '{}'", UNRELATED);
    }

    println!("\n7. Conversation through the cache...");
    let generator = Arc::new(CannedGenerator::default());
    let mut session = ChatSession::new(cache.clone(), generator.clone(), "demo_chat");

    for query in ["How do I bake bread?", "How do I bake bread?"] {
        let turn = session.ask(query).await?;
        let source = if turn.from_cache { "cache" } else { "generator" };
        println!("   [{}] {}", source, turn.response);
    }
    println!(
        "   history: {} turns, generator calls: {}",
        session.history().len(),
        generator.calls.load(Ordering::SeqCst)
    );

    let stats = cache.stats(None).await?;
    println!(
        "\nDone: {} hits, {} misses ({:.0}% hit rate)",
        stats.hit_count,
        stats.miss_count,
        stats.hit_rate() * 100.0
    );

    Ok(())
}
