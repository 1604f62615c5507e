use std::sync::Arc;

use tracing::{error, info, warn};

use nimbus::auth::{register_admin, RegistrationRequest};
use nimbus::web::WebServer;
use nimbus::{AccountRepository, BlobStore, Config, Database, NimbusError};

/// Config file used when neither an argument nor `NIMBUS_CONFIG` is given.
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("NIMBUS_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = nimbus::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        nimbus::logging::init_console_only(&config.logging.level);
    }

    info!("Nimbus - personal cloud file storage");

    if let Err(e) = run(config).await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> nimbus::Result<()> {
    config.validate()?;

    let db = Database::open(&config.database.path).await?;
    info!("Database opened at {}", config.database.path);

    let storage = BlobStore::new(config.storage.root_path())?;
    info!("Blob storage at {}", storage.root().display());

    bootstrap_admin(&db, &config).await?;

    let server = WebServer::new(&config, Arc::new(db), Arc::new(storage))?;
    info!("Server configured on {}", server.addr());

    server.run().await.map_err(NimbusError::Io)
}

/// Create the configured administrator when no admin exists yet.
async fn bootstrap_admin(db: &Database, config: &Config) -> nimbus::Result<()> {
    let repo = AccountRepository::new(db.pool());
    if repo.count_admins().await? > 0 {
        return Ok(());
    }

    let Some((username, email, password)) = config.admin.credentials() else {
        warn!("No admin account exists and [admin] credentials are not configured");
        return Ok(());
    };

    let request = RegistrationRequest::new(username, email, password)
        .with_full_name(config.admin.full_name.clone());
    let account = register_admin(&repo, request).await?;
    info!(username = %account.username, "Created bootstrap admin account");
    Ok(())
}
