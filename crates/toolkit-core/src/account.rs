use chain_stark::call::Call;
use chain_stark::felt::{is_alias, parse_felt, prepare_params, to_hex};
use chain_stark::hash::calculate_contract_address;
use chain_stark::networks::Network;
use chain_stark::signer::Signer;
use chain_stark::udc::{deploy_call, predict_address};
use registry::Registry;
use secrecy::{ExposeSecret, SecretString};
use starknet_ff::FieldElement;
use tracing::{debug, info};

use crate::error::ToolkitError;
use crate::gateway::Gateway;
use crate::transaction::{TxKind, TxWrapper};

/// Directory compiled ABIs are expected in when no path is given.
pub const DEFAULT_ABI_DIR: &str = "artifacts/abis";

/// Class and salt a counterfactual address was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountDeployment {
    pub class_hash: FieldElement,
    pub salt: FieldElement,
}

/// An account contract together with the key that controls it.
#[derive(Debug)]
pub struct Account {
    signer: Signer,
    address: FieldElement,
    network: Network,
    index: u64,
    deployment: Option<AccountDeployment>,
}

impl Account {
    pub fn new(signer: Signer, address: FieldElement, network: Network, index: u64) -> Self {
        Self {
            signer,
            address,
            network,
            index,
            deployment: None,
        }
    }

    /// Looks up the signer's public key in the registry.
    pub fn load(signer: Signer, registry: &Registry) -> Result<Self, ToolkitError> {
        let public_key = signer.public_key();
        let record = registry.accounts.get(&public_key).ok_or_else(|| {
            ToolkitError::UnknownIdentifier(format!(
                "no account registered for {} on {}",
                to_hex(&public_key),
                registry.network()
            ))
        })?;
        debug!(address = %to_hex(&record.address), index = record.index, "account loaded");
        Ok(Self::new(signer, record.address, registry.network(), record.index))
    }

    /// Reads the private key from the environment variable `var` and loads
    /// the matching registered account.
    pub fn from_env(var: &str, registry: &Registry) -> Result<Self, ToolkitError> {
        let secret: SecretString = std::env::var(var)
            .map_err(|_| ToolkitError::MissingKey(var.to_string()))?
            .into();
        let signer = Signer::from_token(secret.expose_secret())?;
        Self::load(signer, registry)
    }

    /// An account that does not exist yet. Its address is derived from the
    /// class hash, the salt and the public key as sole constructor
    /// argument; the index is the next free one in the registry.
    pub fn counterfactual(
        signer: Signer,
        registry: &Registry,
        class_hash: FieldElement,
        salt: FieldElement,
    ) -> Self {
        let address =
            calculate_contract_address(salt, class_hash, &[signer.public_key()], FieldElement::ZERO);
        let index = registry.accounts.next_index();
        let mut account = Self::new(signer, address, registry.network(), index);
        account.deployment = Some(AccountDeployment { class_hash, salt });
        account
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn public_key(&self) -> FieldElement {
        self.signer.public_key()
    }

    pub fn address(&self) -> FieldElement {
        self.address
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// Set only for accounts built with [`Account::counterfactual`].
    pub fn deployment(&self) -> Option<AccountDeployment> {
        self.deployment
    }

    /// Contract address for an alias from the deployments log, or a
    /// numeric token taken literally.
    pub fn resolve_target(&self, target: &str, registry: &Registry) -> Result<FieldElement, ToolkitError> {
        if is_alias(target) {
            return registry
                .deployments
                .resolve(target)
                .map(|record| record.address)
                .ok_or_else(|| ToolkitError::UnknownIdentifier(target.to_string()));
        }
        Ok(parse_felt(target)?)
    }

    async fn nonce_or_fetch(
        &self,
        nonce: Option<FieldElement>,
        gateway: &dyn Gateway,
    ) -> Result<FieldElement, ToolkitError> {
        match nonce {
            Some(nonce) => Ok(nonce),
            None => {
                let nonce = gateway.get_nonce(self.address).await?;
                debug!(address = %to_hex(&self.address), nonce = %to_hex(&nonce), "fetched nonce");
                Ok(nonce)
            }
        }
    }

    /// Builds an invoke of `method` on `target` with raw parameters.
    #[allow(clippy::too_many_arguments)]
    pub async fn send<S: AsRef<str>>(
        &self,
        target: &str,
        method: &str,
        params: &[S],
        max_fee: FieldElement,
        nonce: Option<FieldElement>,
        registry: &Registry,
        gateway: &dyn Gateway,
    ) -> Result<TxWrapper<'_>, ToolkitError> {
        let to = self.resolve_target(target, registry)?;
        let calldata = prepare_params(params)?;
        self.invoke(vec![Call::new(to, method, calldata)], max_fee, nonce, gateway)
            .await
    }

    /// Builds a multicall invoke.
    pub async fn invoke(
        &self,
        calls: Vec<Call>,
        max_fee: FieldElement,
        nonce: Option<FieldElement>,
        gateway: &dyn Gateway,
    ) -> Result<TxWrapper<'_>, ToolkitError> {
        let nonce = self.nonce_or_fetch(nonce, gateway).await?;
        Ok(TxWrapper::new(self, TxKind::Invoke { calls }, nonce, max_fee))
    }

    /// Builds a declare of a compiled class whose hash is already known.
    pub async fn declare(
        &self,
        contract_class: serde_json::Value,
        class_hash: FieldElement,
        alias: Option<&str>,
        max_fee: FieldElement,
        nonce: Option<FieldElement>,
        gateway: &dyn Gateway,
    ) -> Result<TxWrapper<'_>, ToolkitError> {
        let nonce = self.nonce_or_fetch(nonce, gateway).await?;
        let kind = TxKind::Declare {
            contract_class,
            class_hash,
            alias: alias.map(str::to_string),
        };
        Ok(TxWrapper::new(self, kind, nonce, max_fee))
    }

    /// Builds a Universal Deployer invoke. `class` is a declaration alias or
    /// a class hash; the ABI path defaults to `artifacts/abis/<class>.json`.
    #[allow(clippy::too_many_arguments)]
    pub async fn deploy_contract<S: AsRef<str>>(
        &self,
        class: &str,
        salt: FieldElement,
        unique: bool,
        constructor_params: &[S],
        alias: Option<&str>,
        abi_path: Option<&str>,
        max_fee: FieldElement,
        nonce: Option<FieldElement>,
        registry: &Registry,
        gateway: &dyn Gateway,
    ) -> Result<TxWrapper<'_>, ToolkitError> {
        let class_hash = match registry.declarations.resolve(class) {
            Some(record) => record.class_hash,
            None if is_alias(class) => {
                return Err(ToolkitError::UnknownIdentifier(class.to_string()));
            }
            None => parse_felt(class)?,
        };
        let constructor_calldata = prepare_params(constructor_params)?;
        let predicted_address =
            predict_address(self.address, class_hash, salt, unique, &constructor_calldata);
        let abi_path = abi_path
            .map(str::to_string)
            .unwrap_or_else(|| format!("{DEFAULT_ABI_DIR}/{class}.json"));

        info!(
            class_hash = %to_hex(&class_hash),
            address = %to_hex(&predicted_address),
            "deploying through the universal deployer"
        );

        let nonce = self.nonce_or_fetch(nonce, gateway).await?;
        let kind = TxKind::DeployContract {
            calls: vec![deploy_call(class_hash, salt, unique, &constructor_calldata)],
            predicted_address,
            alias: alias.map(str::to_string),
            abi_path,
        };
        Ok(TxWrapper::new(self, kind, nonce, max_fee))
    }

    /// Builds the deploy-account transaction for this counterfactual
    /// account, with the class and salt its address was derived from. The
    /// nonce of an undeployed account is always zero.
    pub fn deploy_account(
        &self,
        alias: Option<&str>,
        max_fee: FieldElement,
    ) -> Result<TxWrapper<'_>, ToolkitError> {
        let AccountDeployment { class_hash, salt } = self.deployment.ok_or_else(|| {
            ToolkitError::Config(format!(
                "account {} was not derived counterfactually",
                to_hex(&self.address)
            ))
        })?;
        let kind = TxKind::DeployAccount {
            class_hash,
            salt,
            constructor_calldata: vec![self.public_key()],
            alias: alias.map(str::to_string),
        };
        Ok(TxWrapper::new(self, kind, FieldElement::ZERO, max_fee))
    }
}
