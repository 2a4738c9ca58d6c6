use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::{Stream, StreamExt, stream};
use plugin_tool_stream::{
    client::DaemonClient,
    config::ClientConfig,
    invoker::invoke_tool,
    limits::ReassemblyLimits,
    metrics::REASSEMBLY_METRICS,
    models::{CredentialType, ToolInvokeMessage, ToolInvokeRequest, ToolProviderId},
    streaming::{decode_stream, reassemble_stream},
};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tool-stream")]
#[command(about = "Invoke plugin tools and reassemble streamed blobs")]
struct Cli {
    /// Path to a TOML config file (defaults to environment variables)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Invoke a tool on the plugin daemon
    Invoke {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        user: String,
        /// Provider id, `org/plugin/provider` or a bare name
        #[arg(long)]
        provider: ToolProviderId,
        #[arg(long)]
        tool: String,
        /// Tool parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,
        /// Credentials as a JSON object
        #[arg(long, default_value = "{}")]
        credentials: String,
        #[arg(long, value_enum, default_value_t = CredentialType::ApiKey)]
        credential_type: CredentialType,
        /// Directory to write reassembled blobs into
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Decode a recorded daemon response offline
    Replay {
        file: PathBuf,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Override the per-blob ceiling in bytes
        #[arg(long)]
        max_blob_bytes: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Invoke {
            tenant,
            user,
            provider,
            tool,
            params,
            credentials,
            credential_type,
            output_dir,
        } => {
            let config = load_config(cli.config.as_deref())?;
            config.validate()?;

            let mut request = ToolInvokeRequest::new(tenant, user, provider, tool);
            request.tool_parameters = parse_object(&params).context("invalid --params")?;
            request.credentials = parse_object(&credentials).context("invalid --credentials")?;
            request.credential_type = credential_type;

            let client = DaemonClient::new(config.daemon.clone())?;
            let messages = invoke_tool(&client, &request, config.limits).await?;
            print_messages(messages, output_dir.as_deref()).await?;
        }
        Command::Replay {
            file,
            output_dir,
            max_blob_bytes,
        } => {
            let mut limits = match cli.config.as_deref() {
                Some(path) => ClientConfig::from_file(path)?.limits,
                None => ReassemblyLimits::default(),
            };
            if let Some(max) = max_blob_bytes {
                limits.max_blob_bytes = max;
            }
            limits.validate()?;

            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let body = stream::iter([Ok::<_, std::io::Error>(bytes::Bytes::from(data))]);
            let messages = reassemble_stream(decode_stream(body), limits);
            print_messages(messages, output_dir.as_deref()).await?;
        }
    }

    info!("{}", REASSEMBLY_METRICS.snapshot());
    Ok(())
}

fn load_config(path: Option<&str>) -> Result<ClientConfig> {
    let config = match path {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::from_env()?,
    };
    Ok(config)
}

fn parse_object(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(raw)? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("expected a JSON object, got {}", other),
    }
}

async fn print_messages<S>(messages: S, output_dir: Option<&Path>) -> Result<()>
where
    S: Stream<Item = plugin_tool_stream::Result<ToolInvokeMessage>>,
{
    let mut messages = std::pin::pin!(messages);
    if let Some(dir) = output_dir {
        tokio::fs::create_dir_all(dir).await?;
    }

    let mut blob_count = 0usize;
    while let Some(message) = messages.next().await {
        let message = message?;
        let line = match message.as_blob() {
            Some(blob) => {
                let mut summary = json!({
                    "type": "blob",
                    "size": blob.len(),
                    "meta": message.meta,
                });
                if let Some(dir) = output_dir {
                    let path = dir.join(format!("{}.bin", blob_count));
                    tokio::fs::write(&path, blob).await?;
                    summary["path"] = json!(path.display().to_string());
                }
                blob_count += 1;
                summary
            }
            None => serde_json::to_value(&message)?,
        };
        println!("{}", line);
    }

    Ok(())
}
