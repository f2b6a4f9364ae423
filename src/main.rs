//! bucketdu: A tool for informing you of the used space in S3 and GCS buckets.
#![forbid(unsafe_code)]
#![deny(missing_docs)]
use anyhow::{
    Context,
    Result,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{
    debug,
    info,
};
use tracing_subscriber::EnvFilter;

mod cli;
mod common;
mod task;

#[cfg(feature = "gcs")]
mod gcs;

#[cfg(feature = "s3")]
mod s3;

use common::{
    ClientConfig,
    Provider,
    StorageBackend,
};
use task::{
    SizeTask,
    TaskOptions,
    TaskOutcome,
    Totals,
};

// Exit code used when the requested bucket doesn't exist.
const EXIT_BUCKET_NOT_FOUND: u8 = 2;

// Exit code used when aggregation hit a fatal error.
const EXIT_FAILED: u8 = 1;

// Build the storage backend for the configured provider.
async fn backend(config: &ClientConfig) -> Result<Arc<dyn StorageBackend>> {
    let backend: Arc<dyn StorageBackend> = match config.provider {
        #[cfg(feature = "gcs")]
        Provider::Gcs => {
            let client = gcs::Client::new(config)
                .context("Failed to create GCS client")?;

            Arc::new(client)
        },
        #[cfg(feature = "s3")]
        Provider::S3 => Arc::new(s3::Client::new(config).await),
    };

    Ok(backend)
}

// Everything after the backend has been created is driven by TaskOptions.
fn task_options(config: ClientConfig) -> TaskOptions {
    TaskOptions {
        bucket_name:     config.bucket_name,
        max_concurrency: config.max_concurrency,
        quiet:           config.quiet,
        size_unit:       config.size_unit,
    }
}

fn print_totals(totals: &Totals, size_readable: &str) {
    println!("Total # of objects : {}", totals.total_objects);
    println!("Total raw size     : {} bytes", totals.total_bytes);
    println!("Total size         : {}", size_readable);
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logging goes to stderr so that it never mixes with the summary.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli::parse_args()?;

    info!(
        provider = ?config.provider,
        bucket = ?config.bucket_name,
        max_concurrency = config.max_concurrency,
        "Starting",
    );

    let backend = backend(&config).await?;
    let options = task_options(config);

    debug!("main: Task options: {:?}", options);

    let mut task = SizeTask::new(backend, options);

    let outcome = task.start()
        .await
        .context("Failed to start size task")?;

    match outcome {
        TaskOutcome::Complete(_) => {
            println!("Summary");
            println!("--");
            print_totals(&task.totals(), &task.size_readable());

            Ok(ExitCode::SUCCESS)
        },
        TaskOutcome::BucketNotFound { bucket } => {
            eprintln!("Bucket '{}' does not exist", bucket);

            Ok(ExitCode::from(EXIT_BUCKET_NOT_FOUND))
        },
        TaskOutcome::Failed { reason, partial } => {
            eprintln!("Sizing failed: {}", reason);

            println!("Partial totals (unreliable)");
            println!("--");
            print_totals(&partial, &partial.size_readable());

            Ok(ExitCode::from(EXIT_FAILED))
        },
    }
}
