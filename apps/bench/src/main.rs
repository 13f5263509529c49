//! Launches many concurrent uploads of one file and reports how long the
//! whole batch took.

mod config;

use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chunkport_client::{ClientError, UploadController, UploadReceipt, connect};

use crate::config::BenchConfig;

#[derive(Debug, Default)]
struct Outcomes {
    success: usize,
    failure: usize,
    timeout: usize,
    error: usize,
}

impl Outcomes {
    fn record(&mut self, result: &Result<UploadReceipt, ClientError>) {
        match result {
            Ok(receipt) if receipt.status.is_success() => self.success += 1,
            Ok(_) => self.failure += 1,
            Err(ClientError::Timeout(_)) => self.timeout += 1,
            Err(e) => {
                warn!(error = %e, "upload failed");
                self.error += 1;
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = BenchConfig::locate();
    let config = match BenchConfig::load(path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, path = ?path, "failed to load config, using defaults");
            BenchConfig::default()
        }
    };

    let controller = UploadController::new(config.client.clone())?;
    info!(
        addr = %config.server_addr,
        file = %config.file.display(),
        uploads = config.uploads,
        chunk_size = config.client.chunk_size,
        "starting benchmark"
    );

    let start = Instant::now();
    let mut tasks = JoinSet::new();
    for i in 0..config.uploads {
        if i > 0 {
            tokio::time::sleep(config.stagger()).await;
        }
        let controller = controller.clone();
        let addr = config.server_addr;
        let file = config.file.clone();
        tasks.spawn(async move {
            let call = connect(addr, controller.config()).await?;
            controller.upload_file(call, &file).await
        });
    }

    let mut outcomes = Outcomes::default();
    while let Some(joined) = tasks.join_next().await {
        outcomes.record(&joined?);
    }

    let elapsed = start.elapsed().as_secs_f64();
    println!("{elapsed:.3}s");
    println!(
        "success={} failure={} timeout={} error={}",
        outcomes.success, outcomes.failure, outcomes.timeout, outcomes.error
    );
    Ok(())
}
