//! # HeartConnect Binary
//!
//! Assembles the adapters chosen by configuration and compile-time
//! features, then serves the API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use api_adapters::{router, AppState, RouterOptions};
use auth_adapters::{StaticDirectory, SupabaseDirectory};
use configs::{DatabaseSettings, EmailSettings, IdentityProvider, IdentitySettings, LogFormat, LogSettings, Settings};
use domains::{AccountDirectory, FeedbackRepo, MessageRepo, Notifier, TokenVerifier};
use notify_adapters::{EmailNotifier, LogMailer, Mailer, ResendMailer};
use services::{DirectoryScan, FeedbackService, MessageService};
use storage_adapters::MemoryStore;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

struct Stores {
    messages: Arc<dyn MessageRepo>,
    feedback: Arc<dyn FeedbackRepo>,
}

impl Stores {
    fn shared<S: MessageRepo + FeedbackRepo + 'static>(store: S) -> Self {
        let store = Arc::new(store);
        Self { messages: store.clone(), feedback: store }
    }
}

struct Identity {
    directory: Arc<dyn AccountDirectory>,
    tokens: Arc<dyn TokenVerifier>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_tracing(&settings.log);

    // 1. Storage
    let stores = build_stores(&settings.database).await?;

    // 2. Identity provider
    let identity = build_identity(&settings.identity)?;

    // 3. Notifications
    let notifier = build_notifier(&settings.email)?;

    // 4. Services and HTTP state
    let scan = DirectoryScan {
        page_size: settings.identity.page_size,
        max_pages: settings.identity.max_pages,
    };
    let messages = MessageService::new(stores.messages, identity.directory, notifier, scan);
    let feedback = FeedbackService::new(stores.feedback);
    let state = AppState::new(messages, feedback, identity.tokens);

    let app = router(
        state,
        &RouterOptions {
            request_timeout: Duration::from_secs(settings.server.request_timeout_secs),
            cors_origins: settings.server.cors_origins.clone(),
        },
    );

    let listener = TcpListener::bind((settings.server.host.as_str(), settings.server.port))
        .await
        .with_context(|| format!("binding {}:{}", settings.server.host, settings.server.port))?;
    info!(addr = %listener.local_addr()?, "HeartConnect listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HeartConnect stopped");
    Ok(())
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn build_stores(database: &DatabaseSettings) -> anyhow::Result<Stores> {
    if database.is_memory() {
        warn!("using the in-memory store; messages are lost on restart");
        return Ok(Stores::shared(MemoryStore::new()));
    }
    open_sqlite(database).await
}

#[cfg(feature = "db-sqlite")]
async fn open_sqlite(database: &DatabaseSettings) -> anyhow::Result<Stores> {
    let store = storage_adapters::SqliteStore::connect(&database.url, database.max_connections)
        .await
        .with_context(|| format!("opening {}", database.url))?;
    Ok(Stores::shared(store))
}

#[cfg(not(feature = "db-sqlite"))]
async fn open_sqlite(database: &DatabaseSettings) -> anyhow::Result<Stores> {
    bail!("database.url = {:?} needs the db-sqlite feature", database.url)
}

fn build_identity(identity: &IdentitySettings) -> anyhow::Result<Identity> {
    let directory: Arc<dyn AccountDirectory>;
    let provider_tokens: Arc<dyn TokenVerifier>;

    match identity.provider {
        IdentityProvider::Static => {
            let Some(seed) = identity.seed_file.as_deref() else {
                bail!("identity.seed_file is required for the static provider");
            };
            let dir = Arc::new(
                StaticDirectory::from_file(seed).with_context(|| format!("reading {seed}"))?,
            );
            info!(seed, "using static identity directory");
            directory = dir.clone();
            provider_tokens = dir;
        }
        IdentityProvider::Supabase => {
            let (Some(url), Some(key)) = (identity.url.as_deref(), identity.service_key.clone()) else {
                bail!("identity.url and identity.service_key are required for supabase");
            };
            let dir = Arc::new(
                SupabaseDirectory::new(url, key, Duration::from_secs(identity.timeout_secs))?
                    .with_scan(identity.page_size, identity.max_pages),
            );
            info!(url, "using supabase identity directory");
            directory = dir.clone();
            provider_tokens = dir;
        }
    }

    let tokens = local_token_verifier(identity, &directory).unwrap_or(provider_tokens);
    Ok(Identity { directory, tokens })
}

#[cfg(feature = "auth-jwt")]
fn local_token_verifier(
    identity: &IdentitySettings,
    directory: &Arc<dyn AccountDirectory>,
) -> Option<Arc<dyn TokenVerifier>> {
    let secret = identity.jwt_secret.as_ref()?;
    info!("verifying access tokens locally");
    Some(Arc::new(auth_adapters::JwtVerifier::new(secret, directory.clone())))
}

#[cfg(not(feature = "auth-jwt"))]
fn local_token_verifier(
    identity: &IdentitySettings,
    _directory: &Arc<dyn AccountDirectory>,
) -> Option<Arc<dyn TokenVerifier>> {
    if identity.jwt_secret.is_some() {
        warn!("identity.jwt_secret is set but the auth-jwt feature is off; delegating to the provider");
    }
    None
}

fn build_notifier(email: &EmailSettings) -> anyhow::Result<Arc<dyn Notifier>> {
    let mailer: Arc<dyn Mailer> = match (email.enabled, email.api_key.clone()) {
        (true, Some(key)) => Arc::new(ResendMailer::new(
            email.api_url.clone(),
            key,
            Duration::from_secs(email.timeout_secs),
        )?),
        (true, None) => bail!("email.api_key is required when email.enabled"),
        (false, _) => {
            info!("email delivery disabled; notifications are logged only");
            Arc::new(LogMailer)
        }
    };
    Ok(Arc::new(EmailNotifier::new(mailer, email.from.clone(), email.app_url.clone())))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
}
