use std::path::Path;

use framegrab_media::check_tool;
use framegrab_queue::RedisJobQueue;
use framegrab_storage::S3Store;
use framegrab_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();
    config.validate()?;

    println!(
        "worker-selfcheck: starting with frames_dir={}",
        config.frames_dir.display()
    );
    ensure_frames_dir(&config.frames_dir).await?;
    ensure_tool(&config.resolver.program)?;
    ensure_tool(&config.extractor.program)?;
    ensure_env_present(&[
        "STORAGE_BUCKET_NAME",
        "STORAGE_ACCESS_KEY_ID",
        "STORAGE_SECRET_ACCESS_KEY",
    ])?;

    if std::env::args().any(|a| a == "--ping") {
        let queue = RedisJobQueue::from_env()?;
        queue.ping().await?;
        println!(
            "worker-selfcheck: redis ok ({} pending on {})",
            queue.len().await?,
            queue.queue_name()
        );

        // HTTPS to the bucket needs a crypto provider
        let _ = rustls::crypto::ring::default_provider().install_default();
        let store = S3Store::from_env()?;
        store.check_connectivity().await?;
        println!("worker-selfcheck: bucket {} reachable", store.bucket());
    }

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_frames_dir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    let marker = path.join(".selfcheck");
    tokio::fs::write(&marker, b"ok").await?;
    tokio::fs::remove_file(&marker).await?;
    Ok(())
}

fn ensure_tool(program: &str) -> anyhow::Result<()> {
    let path = check_tool(program)?;
    println!("worker-selfcheck: {} at {}", program, path.display());
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}
