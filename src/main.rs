use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use cloudsight::{ClientConfig, CloudSightClient, JobStatus, Params};
use tracing_subscriber::EnvFilter;

/// Recognize an image with the CloudSight API and print the result as JSON.
///
/// Credentials come from CLOUDSIGHT_API_KEY and, for OAuth signing,
/// CLOUDSIGHT_API_SECRET (a .env file is honoured).
#[derive(Parser, Debug)]
#[command(name = "cloudsight", version)]
struct Args {
    /// Image file path, or an http(s) URL the service should fetch
    image: String,

    /// Give up waiting after this many seconds (0 waits forever)
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    #[arg(long)]
    locale: Option<String>,

    /// Language of the returned annotation
    #[arg(long)]
    language: Option<String>,

    /// Device id sent with the request; a random UUID when omitted
    #[arg(long)]
    device_id: Option<String>,

    /// Request the longest TTL the service allows
    #[arg(long)]
    max_ttl: bool,

    /// Repost once if the service reports the job as timed out
    #[arg(long)]
    repost: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Recognition failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let client = CloudSightClient::from_config(&config)?;

    tracing::info!(oauth = client.signer().is_oauth(), "CloudSight client initialized");

    let mut params = Params::new();
    if let Some(locale) = &args.locale {
        params.set_locale(locale);
    }
    if let Some(language) = &args.language {
        params.set_language(language);
    }
    let device_id = args
        .device_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    params.set_device_id(&device_id);
    if args.max_ttl {
        params.set_max_ttl();
    }

    let job = if args.image.starts_with("http://") || args.image.starts_with("https://") {
        client.remote_image_request(&args.image, Some(params)).await?
    } else {
        let path = PathBuf::from(&args.image);
        let data = tokio::fs::read(&path).await?;
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("image")
            .to_string();
        client.image_request(data, &filename, Some(params)).await?
    };

    let timeout = Duration::from_secs(args.timeout);
    client.wait_job(&job, timeout).await?;

    if args.repost && job.status().await == JobStatus::Timeout {
        client.repost_job(&job).await?;
        client.wait_job(&job, timeout).await?;
    }

    let snapshot = job.snapshot().await;
    tracing::info!(
        token = %snapshot.token,
        status = %snapshot.status,
        description = %snapshot.status.description(),
        "Recognition finished"
    );
    if snapshot.status == JobStatus::Skipped {
        tracing::warn!(
            token = %snapshot.token,
            reason = %snapshot.skip_reason.as_str(),
            description = %snapshot.skip_reason.description(),
            "Image was skipped"
        );
    }
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}
