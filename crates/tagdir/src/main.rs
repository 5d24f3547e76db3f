//! tagdir: read-optimized tag directory service.
//!
//! Subcommands:
//! - `serve`: warm the public listing and serve the HTTP API
//! - `seed-content`: add a tagged content item to the database

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result, miette};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tagdir_directory::{
    DirectoryConfig, DirectoryService, Disabled, PublishHooks, SearchNotifier, SitemapBuilder,
    TagMutations,
};
use tagdir_publish::{BaiduPush, XmlSitemap};
use tagdir_store::{ContentState, CountAggregator, NewContentItem, SqliteStore, TagStore};
use tagdir_web::{AppState, BearerToken, create_router};

#[derive(Parser)]
#[command(name = "tagdir")]
#[command(about = "Read-optimized tag directory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the tag API
    Serve {
        /// SQLite database path
        #[arg(long, env = "TAGDIR_DB", default_value = "tagdir.db")]
        db: String,

        /// HTTP listen address
        #[arg(long, env = "TAGDIR_LISTEN", default_value = "0.0.0.0:3850")]
        listen: String,

        /// Bearer token that marks a caller as authorized
        #[arg(long, env = "TAGDIR_ADMIN_TOKEN")]
        admin_token: String,

        /// Public site base URL, used to build tag URLs
        #[arg(long, env = "TAGDIR_SITE_URL")]
        site_url: String,

        /// Where to write sitemap.xml (rebuilds are skipped when unset)
        #[arg(long, env = "TAGDIR_SITEMAP_PATH")]
        sitemap_path: Option<String>,

        /// Search push endpoint, e.g. http://data.zz.baidu.com
        #[arg(long, env = "TAGDIR_SEO_ENDPOINT")]
        seo_endpoint: Option<String>,

        /// Search push token
        #[arg(long, env = "TAGDIR_SEO_TOKEN")]
        seo_token: Option<String>,

        /// Minimum seconds between background refreshes of the public listing
        #[arg(long, default_value = "300")]
        refresh_cooldown_secs: u64,

        /// Number of tags in the cached public listing
        #[arg(long, default_value = "160")]
        canonical_page_size: u32,
    },

    /// Insert a content item tagged with existing tags
    SeedContent {
        /// SQLite database path
        #[arg(long, env = "TAGDIR_DB", default_value = "tagdir.db")]
        db: String,

        /// Content title
        #[arg(long)]
        title: String,

        /// Publication state
        #[arg(long, value_enum, default_value = "published")]
        state: StateArg,

        /// Whether the item is publicly visible
        #[arg(long)]
        public: bool,

        /// Tag slugs (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StateArg {
    Recycled,
    Draft,
    Published,
}

impl From<StateArg> for ContentState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Recycled => ContentState::Recycled,
            StateArg::Draft => ContentState::Draft,
            StateArg::Published => ContentState::Published,
        }
    }
}

struct ServeOptions {
    db: String,
    listen: String,
    admin_token: String,
    site_url: String,
    sitemap_path: Option<String>,
    seo_endpoint: Option<String>,
    seo_token: Option<String>,
    config: DirectoryConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                "tagdir=info,tagdir_directory=info,tagdir_publish=info,tagdir_web=info".to_string()
            }),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            db,
            listen,
            admin_token,
            site_url,
            sitemap_path,
            seo_endpoint,
            seo_token,
            refresh_cooldown_secs,
            canonical_page_size,
        } => {
            serve(ServeOptions {
                db,
                listen,
                admin_token,
                site_url,
                sitemap_path,
                seo_endpoint,
                seo_token,
                config: DirectoryConfig {
                    refresh_cooldown: Duration::from_secs(refresh_cooldown_secs),
                    canonical_page_size,
                },
            })
            .await
        }

        Commands::SeedContent {
            db,
            title,
            state,
            public,
            tags,
        } => seed_content(&db, title, state.into(), public, &tags),
    }
}

async fn serve(opts: ServeOptions) -> Result<()> {
    let store = Arc::new(SqliteStore::open(&opts.db).into_diagnostic()?);

    let sitemap: Arc<dyn SitemapBuilder> = match &opts.sitemap_path {
        Some(path) => Arc::new(XmlSitemap::new(
            Arc::clone(&store) as Arc<dyn TagStore>,
            opts.site_url.clone(),
            path,
        )),
        None => Arc::new(Disabled),
    };
    let search: Arc<dyn SearchNotifier> = match (&opts.seo_endpoint, &opts.seo_token) {
        (Some(endpoint), Some(token)) => Arc::new(BaiduPush::new(
            endpoint.clone(),
            opts.site_url.clone(),
            token.clone(),
        )),
        (None, None) => Arc::new(Disabled),
        _ => return Err(miette!("--seo-endpoint and --seo-token must be set together")),
    };

    let directory = Arc::new(DirectoryService::new(
        Arc::clone(&store) as Arc<dyn TagStore>,
        Arc::clone(&store) as Arc<dyn CountAggregator>,
        opts.config,
    ));
    let mutations = Arc::new(TagMutations::new(
        Arc::clone(&store) as Arc<dyn TagStore>,
        PublishHooks::new(opts.site_url.clone(), sitemap, search),
    ));

    directory.warm().await;

    let state = Arc::new(AppState {
        directory: Arc::clone(&directory),
        mutations: Arc::clone(&mutations),
        auth: Arc::new(BearerToken::new(opts.admin_token)),
    });
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&opts.listen)
        .await
        .into_diagnostic()?;

    info!(listen = %opts.listen, db = %opts.db, site = %opts.site_url, "tagdir started");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutdown requested");
        })
        .await
        .into_diagnostic()?;

    directory.shutdown().await;
    mutations.shutdown().await;
    info!("tagdir stopped");

    Ok(())
}

fn seed_content(
    db: &str,
    title: String,
    state: ContentState,
    public: bool,
    slugs: &[String],
) -> Result<()> {
    let store = SqliteStore::open(db).into_diagnostic()?;

    let mut tags = Vec::with_capacity(slugs.len());
    for slug in slugs {
        let tag = store
            .find_by_slug(slug)
            .into_diagnostic()?
            .ok_or_else(|| miette!("no tag with slug '{}'", slug))?;
        tags.push(tag.id);
    }

    let id = store
        .insert_content(&NewContentItem {
            title,
            state,
            public,
            tags,
        })
        .into_diagnostic()?;

    info!(id, tags = slugs.len(), "content item inserted");
    Ok(())
}
