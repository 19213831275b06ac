use std::str::FromStr;

use serde::{Deserialize, Serialize};
use starknet_ff::FieldElement;

use crate::error::StarkError;

/// Default base URL of a locally running devnet.
pub const LOCALHOST_URL: &str = "http://127.0.0.1:5050/";

/// Sequencer host for the integration network.
pub const INTEGRATION_HOST: &str = "external.integration.starknet.io";

/// Sequencer host for the Goerli testnet.
pub const GOERLI_HOST: &str = "alpha4.starknet.io";

/// Sequencer host for the second Goerli testnet.
pub const GOERLI2_HOST: &str = "alpha4-2.starknet.io";

/// Sequencer host for mainnet.
pub const MAINNET_HOST: &str = "alpha-mainnet.starknet.io";

/// Short string `"SN_MAIN"`.
pub const SN_MAIN: FieldElement = FieldElement::from_mont([
    17696389056366564951,
    18446744073709551615,
    18446744073709551615,
    502562008147966918,
]);

/// Short string `"SN_GOERLI"`.
pub const SN_GOERLI: FieldElement = FieldElement::from_mont([
    3753493103916128178,
    18446744073709548950,
    18446744073709551615,
    398700013197595345,
]);

/// Short string `"SN_GOERLI2"`.
pub const SN_GOERLI2: FieldElement = FieldElement::from_mont([
    1663542769632127759,
    18446744073708869172,
    18446744073709551615,
    33650220878420990,
]);

/// Supported networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Localhost,
    Integration,
    Goerli,
    Goerli2,
    Mainnet,
}

impl Network {
    pub const ALL: [Network; 5] = [
        Network::Localhost,
        Network::Integration,
        Network::Goerli,
        Network::Goerli2,
        Network::Mainnet,
    ];

    /// Parses a network name, accepting the `testnet` and `127.0.0.1`
    /// spellings.
    pub fn parse(name: &str) -> Result<Self, StarkError> {
        match name {
            "localhost" | "127.0.0.1" => Ok(Network::Localhost),
            "integration" => Ok(Network::Integration),
            "goerli" | "testnet" => Ok(Network::Goerli),
            "goerli2" => Ok(Network::Goerli2),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(StarkError::UnknownNetwork(other.to_string())),
        }
    }

    /// Canonical name, also used as the registry file prefix.
    pub fn name(self) -> &'static str {
        match self {
            Network::Localhost => "localhost",
            Network::Integration => "integration",
            Network::Goerli => "goerli",
            Network::Goerli2 => "goerli2",
            Network::Mainnet => "mainnet",
        }
    }

    /// Chain id mixed into every transaction hash.
    pub fn chain_id(self) -> FieldElement {
        match self {
            Network::Mainnet => SN_MAIN,
            Network::Goerli2 => SN_GOERLI2,
            _ => SN_GOERLI,
        }
    }

    /// Sequencer host for public networks. `None` for localhost.
    pub fn host(self) -> Option<&'static str> {
        match self {
            Network::Localhost => None,
            Network::Integration => Some(INTEGRATION_HOST),
            Network::Goerli => Some(GOERLI_HOST),
            Network::Goerli2 => Some(GOERLI2_HOST),
            Network::Mainnet => Some(MAINNET_HOST),
        }
    }

    /// Default base URL, with a trailing slash.
    pub fn default_base_url(self) -> String {
        match self.host() {
            Some(host) => format!("https://{host}/"),
            None => LOCALHOST_URL.to_string(),
        }
    }

    pub fn is_public(self) -> bool {
        self != Network::Localhost
    }
}

impl FromStr for Network {
    type Err = StarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::parse(s)
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
