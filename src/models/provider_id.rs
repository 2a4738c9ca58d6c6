use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ToolStreamError};

/// Organization assumed for bare provider names
const DEFAULT_ORGANIZATION: &str = "langgenius";

/// Fully qualified tool provider: `organization/plugin_name/provider_name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolProviderId {
    pub organization: String,
    pub plugin_name: String,
    pub provider_name: String,
}

impl ToolProviderId {
    /// Parse a provider id.
    ///
    /// Accepts the full three-segment form or a single bare name, which
    /// expands to `langgenius/<name>/<name>`. Segments may only contain
    /// lowercase ASCII letters, digits, `_` and `-`.
    pub fn parse(value: &str) -> Result<Self> {
        let segments: Vec<&str> = value.split('/').collect();
        if !segments.iter().all(|s| is_valid_segment(s)) {
            return Err(ToolStreamError::InvalidProviderId(value.to_string()));
        }

        match segments.as_slice() {
            [organization, plugin_name, provider_name] => Ok(Self {
                organization: organization.to_string(),
                plugin_name: plugin_name.to_string(),
                provider_name: provider_name.to_string(),
            }),
            [name] => Ok(Self {
                organization: DEFAULT_ORGANIZATION.to_string(),
                plugin_name: name.to_string(),
                provider_name: name.to_string(),
            }),
            _ => Err(ToolStreamError::InvalidProviderId(value.to_string())),
        }
    }

    /// Value of the `X-Plugin-ID` header
    pub fn plugin_id(&self) -> String {
        format!("{}/{}", self.organization, self.plugin_name)
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
}

impl FromStr for ToolProviderId {
    type Err = ToolStreamError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ToolProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.organization, self.plugin_name, self.provider_name
        )
    }
}
