//! `sftpbridge`: runs one sync invocation.
//!
//! Reads a trigger payload (scheduled rule or storage notification), wires the
//! S3, SQS and SFTP adapters into the router, and prints the outcomes as JSON.

mod logging;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use serde::Deserialize;
use sftpbridge_aws::{AwsConfig, S3ObjectStore, SqsRetryQueue};
use sftpbridge_core::config_source::{ObjectStoreConfigSource, StaticConfigSource};
use sftpbridge_core::ports::{ConfigSource, ObjectStore};
use sftpbridge_core::{BridgeConfig, InvocationContext, InvocationRouter, Outcome};
use sftpbridge_sftp::SftpConnector;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "sftpbridge")]
#[command(about = "Bidirectional SFTP <-> S3 sync, one invocation per run")]
#[command(version)]
struct Args {
    /// Trigger payload file, or `-` for stdin
    #[arg(long, default_value = "-")]
    event: String,

    /// Function name; names the config object and the retry queue
    #[arg(long, env = "AWS_LAMBDA_FUNCTION_NAME")]
    function_name: Option<String>,

    /// Full function ARN (overrides name, region and account)
    #[arg(long, env = "SFTPBRIDGE_FUNCTION_ARN")]
    function_arn: Option<String>,

    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    #[arg(long, env = "AWS_ACCOUNT_ID")]
    account_id: Option<String>,

    /// Local stream configuration JSON instead of the config bucket
    #[arg(long, env = "SFTPBRIDGE_STREAMS")]
    streams: Option<PathBuf>,

    /// Engine and AWS settings JSON
    #[arg(long, env = "SFTPBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "SFTPBRIDGE_S3_ENDPOINT")]
    s3_endpoint: Option<String>,

    #[arg(long, env = "SFTPBRIDGE_SQS_ENDPOINT")]
    sqs_endpoint: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, env = "SFTPBRIDGE_JSON_LOGS")]
    json_logs: bool,
}

/// Contents of the `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    bridge: BridgeConfig,
    aws: AwsConfig,
}

impl Settings {
    fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing settings {}", path.display()))
    }

    /// Command-line values win over the settings file.
    fn apply_overrides(&mut self, args: &Args) {
        if let Some(region) = &args.region {
            self.aws.region = region.clone();
        }
        if let Some(endpoint) = &args.s3_endpoint {
            self.aws.s3_endpoint_override = Some(endpoint.clone());
        }
        if let Some(endpoint) = &args.sqs_endpoint {
            self.aws.sqs_endpoint_override = Some(endpoint.clone());
        }
    }
}

fn invocation_context(args: &Args, aws: &AwsConfig) -> Result<InvocationContext> {
    if let Some(arn) = &args.function_arn {
        return InvocationContext::from_function_arn(arn)
            .ok_or_else(|| anyhow!("malformed function ARN: {arn}"));
    }
    let function_name = args
        .function_name
        .clone()
        .ok_or_else(|| anyhow!("--function-name or --function-arn is required"))?;
    let account_id = match (&args.account_id, &args.streams) {
        (Some(account), _) => account.clone(),
        (None, Some(_)) => "local".to_string(),
        (None, None) => bail!("--account-id is required to locate the stream configuration"),
    };
    Ok(InvocationContext::new(function_name, aws.region.clone(), account_id))
}

fn read_event(source: &str) -> Result<serde_json::Value> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading event from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("reading event {source}"))?
    };
    serde_json::from_str(&raw).context("event is not valid JSON")
}

async fn run(args: Args) -> Result<Vec<Outcome>> {
    let mut settings = Settings::load(args.config.as_deref())?;
    settings.apply_overrides(&args);
    let context = invocation_context(&args, &settings.aws)?;
    let event = read_event(&args.event)?;
    info!(
        "invocation for {} in {}/{}",
        context.function_name, context.region, context.account_id
    );

    let sdk_config = settings.aws.load_sdk_config().await;
    let store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(&sdk_config, &settings.aws));
    let queue = Arc::new(SqsRetryQueue::new(
        &sdk_config,
        &settings.aws,
        context.function_name.clone(),
    ));
    let config_source: Arc<dyn ConfigSource> = match &args.streams {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading streams {}", path.display()))?;
            Arc::new(StaticConfigSource::from_json(&raw)?)
        }
        None => Arc::new(ObjectStoreConfigSource::new(Arc::clone(&store))),
    };

    let router = InvocationRouter::new(
        settings.bridge,
        config_source,
        store,
        Arc::new(SftpConnector::default()),
        queue,
    );
    Ok(router.handle(&context, event).await?)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.json_logs);

    let request_id = Uuid::new_v4();
    let span = info_span!("invocation", %request_id);
    match run(args).instrument(span).await {
        Ok(outcomes) => match serde_json::to_string_pretty(&outcomes) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("failed to render outcomes: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!("invocation {request_id} failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
