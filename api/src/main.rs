use std::sync::Arc;

use clap::Parser;

use blogful::{config::CONFIG, logger, server, service::ArticleService};
use blogful_shared::{
    db::{ArticleStore, PgArticleStore},
    memory::MemoryStore,
};

#[derive(Parser, Debug)]
#[command(version, about = "Articles API for blogful")]
struct Flags {
    /// Port to listen on, overrides the config file
    #[arg(short, long)]
    port: Option<u16>,

    /// Keep articles in memory instead of Postgres
    #[arg(long)]
    in_memory: bool,

    /// Skip running database migrations on startup
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let flags = Flags::parse();
    logger::init(&CONFIG.log_level)?;

    let store: Arc<dyn ArticleStore> = if flags.in_memory {
        tracing::warn!("Using in-memory store, articles will not persist");
        Arc::new(MemoryStore::new())
    } else {
        let store = PgArticleStore::connect(&CONFIG.database_url).await?;
        if !flags.no_migrate {
            store.migrate().await?;
        }
        Arc::new(store)
    };

    let app = server::router(ArticleService::new(store), &CONFIG.api_prefix);
    let addr = std::net::SocketAddr::new(
        CONFIG.server.host,
        flags.port.unwrap_or(CONFIG.server.port),
    );
    server::run_server(app, addr).await
}
