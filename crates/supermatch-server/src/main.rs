//! Supermatch — supervisor matching server and maintenance commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use supermatch_core::SupermatchConfig;
use supermatch_server::routes::cache::prune_cutoff;
use supermatch_server::{build_router, AppState};
use supermatch_store::SqliteStore;

fn resolve_data_dir() -> PathBuf {
    std::env::var("SUPERMATCH_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

fn print_help() {
    println!("Supermatch — research supervisor matching server");
    println!();
    println!("Usage: supermatch [command]");
    println!();
    println!("Commands:");
    println!("  (none) | serve           Start the server");
    println!("  index <profiles.json>    Index a JSON array of supervisor profiles");
    println!("  prune-cache <days>       Drop embedding cache entries unused for <days>");
    println!("  help                     Show this help message");
}

fn open_store(config: &SupermatchConfig) -> anyhow::Result<Arc<SqliteStore>> {
    let store = SqliteStore::open(&config.data_paths.vectordb, config.embedding.dimension)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;
    Ok(Arc::new(store))
}

fn build_state(config: SupermatchConfig) -> anyhow::Result<Arc<AppState>> {
    let store = open_store(&config)?;
    let provider = supermatch_infer::create_provider(&config.embedding)?;
    Ok(Arc::new(AppState::new(config, store, provider)?))
}

async fn run_index(config: SupermatchConfig, path: &Path) -> anyhow::Result<bool> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let profiles = match serde_json::from_str::<serde_json::Value>(&raw)? {
        serde_json::Value::Array(items) => items,
        single => vec![single],
    };

    let state = build_state(config)?;
    let report = state.indexer.index_all(&profiles).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.failures.is_empty())
}

async fn serve(config: SupermatchConfig) -> anyhow::Result<()> {
    let port = config.port;
    let state = build_state(config)?;
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Supermatch server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("serve");

    if matches!(command, "--help" | "-h" | "help") {
        print_help();
        return Ok(());
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());
    let config = SupermatchConfig::from_env(&data_dir)?;

    match command {
        "serve" => serve(config).await,
        "index" => {
            let Some(path) = args.get(2) else {
                eprintln!("Usage: supermatch index <profiles.json>");
                std::process::exit(1);
            };
            let clean = run_index(config, Path::new(path)).await?;
            std::process::exit(if clean { 0 } else { 1 });
        }
        "prune-cache" => {
            let days: i64 = match args.get(2).map(|d| d.parse()) {
                Some(Ok(days)) => days,
                _ => {
                    eprintln!("Usage: supermatch prune-cache <days>");
                    std::process::exit(1);
                }
            };
            let store = open_store(&config)?;
            let removed = store.prune_embedding_cache(prune_cutoff(days)?)?;
            println!("Removed {} cache entries ({} remaining)", removed, store.count_cache_entries()?);
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}. Use 'supermatch help' for usage.", other);
            std::process::exit(1);
        }
    }
}
