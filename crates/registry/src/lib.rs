//! Local registry of accounts, deployments and declarations.
//!
//! Each network has its own namespace of three files inside the registry
//! directory. Writes take the per-network lock file, re-read the backing
//! file, validate, write, and only then update the in-memory index, so a
//! failed registration leaves both disk and memory untouched.

pub mod accounts;
pub mod declarations;
pub mod deployments;
pub mod error;
pub mod lock;
pub mod records;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chain_stark::networks::Network;
use tracing::debug;

pub use accounts::AccountStore;
pub use declarations::DeclarationLog;
pub use deployments::DeploymentLog;
pub use error::RegistryError;
pub use lock::DEFAULT_LOCK_TIMEOUT;
pub use records::{AccountRecord, DeclarationRecord, DeploymentRecord, Identifier};

/// All three stores for one network.
#[derive(Debug)]
pub struct Registry {
    dir: PathBuf,
    network: Network,
    pub accounts: AccountStore,
    pub deployments: DeploymentLog,
    pub declarations: DeclarationLog,
}

impl Registry {
    /// Opens the registry for `network` in `dir`. Missing files are empty
    /// stores; the directory is created if needed.
    pub fn open(dir: impl AsRef<Path>, network: Network) -> Result<Self, RegistryError> {
        Self::open_with_timeout(dir, network, DEFAULT_LOCK_TIMEOUT)
    }

    pub fn open_with_timeout(
        dir: impl AsRef<Path>,
        network: Network,
        lock_timeout: Duration,
    ) -> Result<Self, RegistryError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let name = network.name();

        let registry = Self {
            dir: dir.to_path_buf(),
            network,
            accounts: AccountStore::load(dir, name, lock_timeout)?,
            deployments: DeploymentLog::load(dir, name, lock_timeout)?,
            declarations: DeclarationLog::load(dir, name, lock_timeout)?,
        };
        debug!(
            network = %network,
            accounts = registry.accounts.len(),
            deployments = registry.deployments.len(),
            declarations = registry.declarations.len(),
            "registry loaded"
        );
        Ok(registry)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
