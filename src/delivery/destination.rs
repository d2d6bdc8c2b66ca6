use crate::config::{ConfigError, LrwConfig};
use reqwest::Url;
use std::fmt;
use std::str::FromStr;

/// Supported Learning Record Warehouse integrations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    /// Posts to the configured server URL unchanged
    Unizin,
    /// Posts to `<server>/caliper/event?key=<token>`
    LtiTool,
}

impl FromStr for DestinationKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unizin" => Ok(DestinationKind::Unizin),
            "ltitool" => Ok(DestinationKind::LtiTool),
            _ => Err(ConfigError::UnsupportedDestination(s.to_string())),
        }
    }
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestinationKind::Unizin => write!(f, "unizin"),
            DestinationKind::LtiTool => write!(f, "ltitool"),
        }
    }
}

impl DestinationKind {
    /// Build the request target for this kind of receiver
    pub fn endpoint(&self, server: &str, token: &str) -> Result<String, ConfigError> {
        match self {
            DestinationKind::Unizin => {
                Url::parse(server).map_err(|e| invalid_server(server, e))?;
                Ok(server.to_string())
            }
            DestinationKind::LtiTool => {
                let base = format!("{}/caliper/event", server.trim_end_matches('/'));
                let mut url = Url::parse(&base).map_err(|e| invalid_server(server, e))?;
                url.query_pairs_mut().append_pair("key", token);
                Ok(url.to_string())
            }
        }
    }
}

fn invalid_server(server: &str, e: impl fmt::Display) -> ConfigError {
    ConfigError::Validation(format!("invalid LRW server URL '{}': {}", server, e))
}

/// A fully resolved delivery target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub kind: DestinationKind,
    pub endpoint: String,
    pub token: String,
    pub sensor_id: String,
}

impl Destination {
    /// Resolve the destination from config. Fails when the kind is unset or
    /// unsupported, or the server URL does not parse.
    pub fn from_config(lrw: &LrwConfig) -> Result<Self, ConfigError> {
        let kind: DestinationKind = lrw
            .lrw_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingDestination)?
            .parse()?;

        let endpoint = kind.endpoint(&lrw.server, &lrw.token)?;

        Ok(Self {
            kind,
            endpoint,
            token: lrw.token.clone(),
            sensor_id: lrw.sensor_id(),
        })
    }

    /// The endpoint with the access key masked, for logs
    pub fn redacted_endpoint(&self) -> String {
        match (self.kind, self.endpoint.split_once("?key=")) {
            (DestinationKind::LtiTool, Some((base, _))) => format!("{}?key=***", base),
            _ => self.endpoint.clone(),
        }
    }
}
