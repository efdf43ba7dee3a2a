//! PropertyPulse CLI
//!
//! ```bash
//! pulse serve                    # API on server.bind, backed by MongoDB
//! pulse serve --memory           # in-memory store, nothing persisted
//! pulse indexes                  # create the collection indexes
//! pulse config                   # print the effective config, secrets masked
//! pulse token <user-id>          # mint a session token for local testing
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pulse_config::{Config, MediaConfig};
use pulse_media::{CloudinaryClient, MediaHost, RecordingMediaHost};
use pulse_mongodb::{MemoryStore, MongoStore, Store};
use pulse_service::Service;
use pulse_web::{AppState, Claims, SessionVerifier};

const DEFAULT_LOG_FILTER: &str = "pulse=info,tower_http=info";

#[derive(Parser)]
#[command(name = "pulse")]
#[command(about = "PropertyPulse - rental listings, reviews, bookmarks and inquiries")]
#[command(version)]
struct Cli {
    /// Config file [default: $PULSE_CONFIG, then <config_dir>/pulse/config.yaml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(
        long,
        global = true,
        env = "PULSE_LOG_JSON",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Keep everything in memory instead of connecting to MongoDB
        #[arg(long)]
        memory: bool,

        /// Listen address, overrides server.bind
        #[arg(long)]
        bind: Option<String>,
    },

    /// Create the MongoDB indexes and exit
    Indexes,

    /// Print the effective configuration with secrets masked
    Config,

    /// Sign a session token with auth.session_secret
    Token {
        /// User id (24 hex characters)
        sub: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        /// Lifetime in hours
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = Config::load(cli.config.as_deref()).context("loading config")?;

    match cli.command {
        Commands::Serve { memory, bind } => serve(config, memory, bind).await,
        Commands::Indexes => {
            let store = MongoStore::connect(&config.mongodb.uri, &config.mongodb.database).await?;
            store.ensure_indexes().await?;
            info!(database = store.database_name(), "Indexes ensured");
            store.shutdown().await;
            Ok(())
        }
        Commands::Config => {
            print!("{}", config.redacted().to_yaml()?);
            Ok(())
        }
        Commands::Token {
            sub,
            name,
            email,
            phone,
            hours,
        } => {
            pulse_core::UserId::parse(&sub)?;
            let sessions = SessionVerifier::new(&config.auth.session_secret, &config.auth.cookie_name);
            let claims = Claims {
                sub,
                name,
                email,
                phone,
                exp: Some(chrono::Utc::now().timestamp() + hours * 3600),
            };
            let Some(token) = sessions.sign(&claims) else {
                bail!("auth.session_secret is not set (PULSE_SESSION_SECRET)");
            };
            println!("{token}");
            Ok(())
        }
    }
}

fn init_logging(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn serve(config: Config, memory: bool, bind: Option<String>) -> Result<()> {
    let (store, mongo): (Arc<dyn Store>, Option<MongoStore>) = if memory {
        warn!("Using the in-memory store, nothing is persisted");
        (Arc::new(MemoryStore::new()), None)
    } else {
        let mongo = MongoStore::connect(&config.mongodb.uri, &config.mongodb.database)
            .await
            .context("connecting to MongoDB")?;
        mongo.ensure_indexes().await?;
        (Arc::new(mongo.clone()), Some(mongo))
    };

    let media = media_host(&config.media, memory)?;
    let service = Service::new(store, media, config.listing);
    let state = AppState::from_config(service, &config);
    if !state.sessions.is_enabled() {
        warn!("auth.session_secret is empty, every request is anonymous");
    }

    let addr = bind.unwrap_or_else(|| config.server.bind.clone());
    pulse_web::serve(Arc::new(state), &addr)
        .await
        .with_context(|| format!("serving on {addr}"))?;

    if let Some(mongo) = mongo {
        mongo.shutdown().await;
    }
    Ok(())
}

fn media_host(config: &MediaConfig, memory: bool) -> Result<Arc<dyn MediaHost>> {
    if memory || !config.is_configured() {
        warn!(folder = %config.folder, "Media host not configured, images stay in memory");
        return Ok(Arc::new(RecordingMediaHost::new(config.folder.clone())));
    }
    Ok(Arc::new(CloudinaryClient::new(config.clone())?))
}
