use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chain_stark::networks::{Network, LOCALHOST_URL};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::ToolkitError;

/// File name of the gateway configuration.
pub const NODE_FILENAME: &str = "node.json";

/// Default polling interval in watch mode.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Network name to gateway base URL, as stored in `node.json`.
///
/// Networks without an entry use their built-in default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeConfig {
    gateways: BTreeMap<String, String>,
}

/// Gateway and feeder-gateway endpoints of one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub gateway: Url,
    pub feeder_gateway: Url,
}

impl NodeConfig {
    /// Only the local devnet.
    pub fn with_defaults() -> Self {
        let mut gateways = BTreeMap::new();
        gateways.insert(Network::Localhost.name().to_string(), LOCALHOST_URL.to_string());
        Self { gateways }
    }

    /// Loads `node.json`. A missing file yields [`NodeConfig::with_defaults`].
    pub fn load(path: &Path) -> Result<Self, ToolkitError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "node config not found, using defaults");
                return Ok(Self::with_defaults());
            }
            Err(err) => return Err(ToolkitError::Config(format!("{}: {err}", path.display()))),
        };
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| ToolkitError::Config(format!("{}: {e}", path.display())))?;
        for (network, url) in &config.gateways {
            if !validate_url(url) {
                return Err(ToolkitError::Config(format!(
                    "invalid gateway URL for {network}: {url}"
                )));
            }
        }
        debug!(path = %path.display(), networks = config.gateways.len(), "node config loaded");
        Ok(config)
    }

    /// Writes the config back as JSON.
    pub fn save(&self, path: &Path) -> Result<(), ToolkitError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ToolkitError::Config(e.to_string()))?;
        fs::write(path, json).map_err(|e| ToolkitError::Config(format!("{}: {e}", path.display())))
    }

    /// Overrides the base URL of a network.
    pub fn set_gateway(&mut self, network: Network, url: &str) -> Result<(), ToolkitError> {
        if !validate_url(url) {
            return Err(ToolkitError::Config(format!("invalid gateway URL: {url}")));
        }
        self.gateways.insert(network.name().to_string(), url.to_string());
        Ok(())
    }

    /// Base URL for `network`: the configured one, else the network default.
    pub fn base_url(&self, network: Network) -> String {
        self.gateways
            .get(network.name())
            .cloned()
            .unwrap_or_else(|| network.default_base_url())
    }

    /// `<base>gateway` and `<base>feeder_gateway`.
    pub fn endpoints(&self, network: Network) -> Result<Endpoints, ToolkitError> {
        let mut base = self.base_url(network);
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)?;
        Ok(Endpoints {
            gateway: base.join("gateway")?,
            feeder_gateway: base.join("feeder_gateway")?,
        })
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}

/// Everything the toolkit needs, resolved once at startup and passed down.
#[derive(Debug, Clone)]
pub struct ToolkitConfig {
    pub network: Network,
    pub registry_dir: PathBuf,
    pub node: NodeConfig,
    pub poll_interval: Duration,
    pub watch_timeout: Option<Duration>,
}

impl ToolkitConfig {
    /// Reads `node.json` from `project_dir`; registry files live alongside it.
    pub fn load(project_dir: &Path, network: Network) -> Result<Self, ToolkitError> {
        Ok(Self {
            network,
            registry_dir: project_dir.to_path_buf(),
            node: NodeConfig::load(&project_dir.join(NODE_FILENAME))?,
            poll_interval: DEFAULT_POLL_INTERVAL,
            watch_timeout: None,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_watch_timeout(mut self, timeout: Duration) -> Self {
        self.watch_timeout = Some(timeout);
        self
    }

    pub fn endpoints(&self) -> Result<Endpoints, ToolkitError> {
        self.node.endpoints(self.network)
    }
}
