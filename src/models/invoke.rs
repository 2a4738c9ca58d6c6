use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::provider_id::ToolProviderId;

/// How the tool's credentials were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialType {
    #[default]
    ApiKey,
    Oauth2,
    Unauthorized,
}

/// A single tool invocation dispatched to the plugin daemon
#[derive(Debug, Clone)]
pub struct ToolInvokeRequest {
    pub tenant_id: String,
    pub user_id: String,
    pub provider: ToolProviderId,
    pub tool_name: String,
    pub credentials: Map<String, Value>,
    pub credential_type: CredentialType,
    pub tool_parameters: Map<String, Value>,
    pub conversation_id: Option<String>,
    pub app_id: Option<String>,
    pub message_id: Option<String>,
}

impl ToolInvokeRequest {
    pub fn new(
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        provider: ToolProviderId,
        tool_name: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            provider,
            tool_name: tool_name.into(),
            credentials: Map::new(),
            credential_type: CredentialType::default(),
            tool_parameters: Map::new(),
            conversation_id: None,
            app_id: None,
            message_id: None,
        }
    }

    /// Path relative to the daemon endpoint
    pub fn path(&self) -> String {
        format!("plugin/{}/dispatch/tool/invoke", self.tenant_id)
    }

    pub fn body(&self) -> Value {
        json!({
            "user_id": self.user_id,
            "conversation_id": self.conversation_id,
            "app_id": self.app_id,
            "message_id": self.message_id,
            "data": {
                "provider": self.provider.provider_name,
                "tool": self.tool_name,
                "credentials": self.credentials,
                "credential_type": self.credential_type,
                "tool_parameters": self.tool_parameters,
            }
        })
    }
}
