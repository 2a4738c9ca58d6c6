use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DaemonConfig;
use crate::error::{Result, ToolStreamError};
use crate::invoker::{ByteStream, InvokeFuture, ToolInvoker};
use crate::models::ToolInvokeRequest;

pub struct DaemonClient {
    client: Client,
    config: DaemonConfig,
}

impl DaemonClient {
    pub fn new(config: DaemonConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ToolStreamError::InternalError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    /// Full URL for a daemon path
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl ToolInvoker for DaemonClient {
    fn invoke(&self, request: &ToolInvokeRequest) -> InvokeFuture {
        let url = self.url(&request.path());
        let body = request.body();
        let plugin_id = request.provider.plugin_id();
        let client = self.client.clone();
        let api_key = self.config.api_key.clone();

        Box::pin(async move { Self::invoke_impl(url, body, plugin_id, client, api_key).await })
    }

    fn name(&self) -> &str {
        "PluginDaemon"
    }
}

impl DaemonClient {
    async fn invoke_impl(
        url: String,
        body: serde_json::Value,
        plugin_id: String,
        client: Client,
        api_key: String,
    ) -> Result<ByteStream> {
        let body = serde_json::to_vec(&body)?;
        info!("PluginDaemon: Sending {} bytes to: {}", body.len(), url);
        debug!(plugin_id = %plugin_id, "Dispatching tool invocation");

        let response = client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("X-Plugin-ID", &plugin_id)
            .header("X-Api-Key", &api_key)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                ToolStreamError::UpstreamError(format!("Plugin daemon request failed: {}", e))
            })?;

        let status = response.status();
        info!("PluginDaemon responded with status: {}", status);

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ToolStreamError::UpstreamError(format!(
                "Plugin daemon error {}: {}",
                status, error_body
            )));
        }

        Ok(Box::pin(response.bytes_stream()))
    }
}
