//! Frame extraction worker binary.

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use framegrab_media::{check_tool, ToolPipeline};
use framegrab_queue::{QueueConfig, RedisJobQueue, RedisStatusStore};
use framegrab_storage::S3Store;
use framegrab_worker::{metrics, JobExecutor, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider already installed");
    }

    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting framegrab-worker");

    let config = WorkerConfig::from_env();
    if let Err(e) = config.validate() {
        error!("Invalid worker config: {}", e);
        std::process::exit(1);
    }
    info!("Worker config: {:?}", config);

    if let Some(port) = config.metrics_port {
        match metrics::init_metrics(port) {
            Ok(addr) => info!("Serving metrics on {}", addr),
            Err(e) => warn!("Metrics disabled: {}", e),
        }
    }

    for program in [&config.resolver.program, &config.extractor.program] {
        match check_tool(program) {
            Ok(path) => info!("Using {} at {}", program, path.display()),
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = tokio::fs::create_dir_all(&config.frames_dir).await {
        error!(
            "Frames directory {} unusable: {}",
            config.frames_dir.display(),
            e
        );
        std::process::exit(1);
    }

    let store = match S3Store::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create storage client: {}", e);
            std::process::exit(1);
        }
    };
    info!("Uploading to bucket {}", store.bucket());

    let queue_config = QueueConfig::from_env();
    let statuses = match RedisStatusStore::new(&queue_config.redis_url, config.status_ttl_secs) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create status store: {}", e);
            std::process::exit(1);
        }
    };
    let queue = match RedisJobQueue::new(queue_config) {
        Ok(q) => q,
        Err(e) => {
            error!("Failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };
    info!("Consuming jobs from {}", queue.queue_name());

    let pipeline = match ToolPipeline::new(config.resolver.clone(), config.extractor.clone()) {
        Ok(p) => p,
        Err(e) => {
            error!("Invalid tool config: {}", e);
            std::process::exit(1);
        }
    };

    let executor = match JobExecutor::new(
        config,
        Arc::new(queue),
        Arc::new(statuses),
        Arc::new(pipeline),
        Arc::new(store),
    ) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            error!("Failed to create job executor: {}", e);
            std::process::exit(1);
        }
    };

    // Setup signal handlers
    let signal_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal");
        signal_executor.shutdown();
    });

    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}

/// Colored output for dev, JSON with `LOG_FORMAT=json`.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("framegrab=info,aws_config=warn"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}
