use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dlq_events::{BatchProcessor, Config, DlqStatusCache, IngestClient, SqsEvent, SqsQueues};
use tokio::io::AsyncReadExt;

#[tokio::main]
pub async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = Cli::parse().run().await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

#[derive(Debug, Parser)]
#[command(name = "dlq-events")]
#[command(about = "forward AWS SQS (dead letter) messages as monitoring events", long_about = None)]
pub struct Cli {
    /// Use static test credentials, e.g. for LocalStack
    #[arg(long, global = true)]
    local: bool,

    /// Override the AWS endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Give up on unfinished records after this many milliseconds
    #[arg(long, global = true)]
    deadline_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Process one SQS event payload (file or stdin) and print the failed message ids
    Process { file: Option<PathBuf> },
    /// Drain a queue, forwarding its messages and deleting the delivered ones
    Forward {
        url: String,
        /// Maximum number of receive calls
        #[arg(long, default_value_t = 10)]
        max_receives: usize,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::from_env().context("invalid configuration")?;
        let queues = SqsQueues::from_config(self.aws_config().await);
        let ingest = IngestClient::from_config(&config).context("failed to build http client")?;
        let processor = BatchProcessor::new(
            config,
            queues.clone(),
            ingest,
            Arc::new(DlqStatusCache::new()),
        );

        match self.command {
            Commands::Process { ref file } => {
                let payload = read_input(file.as_deref()).await?;
                let event: SqsEvent =
                    serde_json::from_str(&payload).context("input is not an SQS event")?;

                let deadline = self
                    .deadline_ms
                    .map(|ms| tokio::time::Instant::now() + Duration::from_millis(ms));
                let outcome = processor
                    .process_until(&event.into_messages(), deadline)
                    .await;

                println!("{}", serde_json::to_string(&outcome)?);
            }
            Commands::Forward {
                ref url,
                max_receives,
            } => {
                let summary = queues.forward(url, &processor, max_receives).await?;
                println!(
                    "received: {}, forwarded: {}, failed: {}",
                    summary.received, summary.forwarded, summary.failed
                );
            }
        }

        Ok(())
    }

    async fn aws_config(&self) -> aws_config::SdkConfig {
        let mut loader = aws_config::from_env().region(
            // supports loading region from known env variables
            aws_config::meta::region::RegionProviderChain::default_provider()
                .or_else(aws_config::Region::from_static("us-east-1")),
        );

        if self.local {
            loader = loader.credentials_provider(aws_sdk_sqs::config::Credentials::new(
                "test", "test", None, None, "static",
            ));
        }

        if let Some(endpoint) = &self.endpoint {
            loader = loader.endpoint_url(endpoint);
        } else if self.local {
            loader = loader.endpoint_url("http://localhost:4566");
        }

        loader.load().await
    }
}

async fn read_input(file: Option<&std::path::Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut payload = String::new();
            tokio::io::stdin()
                .read_to_string(&mut payload)
                .await
                .context("failed to read stdin")?;
            Ok(payload)
        }
    }
}
