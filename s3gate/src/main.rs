//! s3gate - HTTP gateway for S3 uploads
//!
//! Boots in three steps: load configuration and build the provider clients,
//! provision the bucket and policy, then serve the upload, presign and
//! delete endpoints. Any failure before serving exits with status 1.

use clap::Parser;
use s3gate::{
    bootstrap::{self, BootstrapOutcome, BootstrapTarget},
    config::{Backend, StorageSettings},
    AppState, ClientBundle,
};
use std::net::SocketAddr;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "s3gate")]
#[command(about = "HTTP gateway for S3 uploads with IAM policy bootstrap", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000", env = "S3GATE_PORT")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1", env = "S3GATE_HOST")]
    host: String,

    /// Provider backend
    #[arg(long, value_enum, default_value = "aws", env = "S3GATE_BACKEND")]
    backend: Backend,

    /// Configuration file name, without extension
    #[arg(long, default_value = "s3gate", env = "S3GATE_CONFIG")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "S3GATE_LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Before clap, so S3GATE_* values in .env are honoured too
    let dotenv = dotenvy::dotenv();
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "s3gate={level},s3gate_s3={level},s3gate_iam={level},tower_http=debug",
                    level = args.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = dotenv {
        if !err.not_found() {
            warn!(error = %err, "Ignoring unreadable .env file");
        }
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let settings = StorageSettings::load(&args.config)?;
    settings.validate(args.backend)?;

    info!("Starting s3gate...");
    info!("  Backend: {:?}", args.backend);
    info!("  Bucket: {} ({})", settings.bucket_name, settings.region);

    let clients = match args.backend {
        Backend::Aws => ClientBundle::connect(&settings).await,
        Backend::Ephemeral => ClientBundle::ephemeral(&settings.policy_arn),
    };

    match bootstrap::run(&clients, &BootstrapTarget::from(&settings)).await? {
        BootstrapOutcome::ExistingBucket { objects } => {
            info!(objects = objects.len(), "Bootstrap skipped, bucket already provisioned");
        }
        BootstrapOutcome::Provisioned {
            policy_version_id,
            statements_updated,
        } => {
            info!(
                policy_version_id = %policy_version_id,
                statements_updated,
                "Bootstrap provisioned bucket and policy"
            );
        }
    }

    let state = AppState::new(clients, settings.bucket_name, settings.object_key);
    let app = s3gate::create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
