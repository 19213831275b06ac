//! Transaction wrappers: sign, submit, optionally watch, then record the
//! result in the local registry.

use std::time::Duration;

use chain_stark::call::{encode, Call};
use chain_stark::felt::to_hex;
use chain_stark::hash::{
    declare_transaction_hash, deploy_account_transaction_hash, execute_calldata,
    invoke_transaction_hash, query_version, DECLARE_VERSION, TRANSACTION_VERSION,
};
use chain_stark::selector::{get_selector_from_name, EXECUTE_ENTRY_POINT};
use registry::Registry;
use starknet_ff::FieldElement;
use tracing::{debug, info, warn};

use crate::account::Account;
use crate::config::ToolkitConfig;
use crate::error::ToolkitError;
use crate::gateway::{FeeEstimate, Gateway, StatusReport, SubmitReceipt, TxStatus};
use crate::payload::{
    signature_felts, DeclarePayload, DeployAccountPayload, InvokePayload, TransactionPayload,
};

/// What a wrapper submits, and what it records once the network accepts it.
#[derive(Debug, Clone)]
pub enum TxKind {
    /// Plain multicall through the account's `__execute__`.
    Invoke { calls: Vec<Call> },
    /// Declares a compiled class. The class hash is computed by the
    /// compiler and supplied by the caller.
    Declare {
        contract_class: serde_json::Value,
        class_hash: FieldElement,
        alias: Option<String>,
    },
    /// Universal Deployer invoke with a predicted address.
    DeployContract {
        calls: Vec<Call>,
        predicted_address: FieldElement,
        alias: Option<String>,
        abi_path: String,
    },
    /// Counterfactual deployment of the wrapper's own account.
    DeployAccount {
        class_hash: FieldElement,
        salt: FieldElement,
        constructor_calldata: Vec<FieldElement>,
        alias: Option<String>,
    },
}

impl TxKind {
    fn version(&self) -> u64 {
        match self {
            TxKind::Invoke { .. } | TxKind::DeployContract { .. } => TRANSACTION_VERSION,
            TxKind::Declare { .. } | TxKind::DeployAccount { .. } => DECLARE_VERSION,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TxKind::Invoke { .. } => "invoke",
            TxKind::Declare { .. } => "declare",
            TxKind::DeployContract { .. } => "deploy_contract",
            TxKind::DeployAccount { .. } => "deploy_account",
        }
    }
}

/// Lifecycle of a wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Built,
    Submitted,
    Pending,
    Accepted,
    Rejected,
}

/// Poll the status endpoint every `interval` until the transaction is
/// accepted or rejected. Without a timeout the poll only stops when the
/// future is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchMode {
    pub interval: Duration,
    pub timeout: Option<Duration>,
}

impl WatchMode {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn from_config(config: &ToolkitConfig) -> Self {
        Self {
            interval: config.poll_interval,
            timeout: config.watch_timeout,
        }
    }
}

/// Result of [`TxWrapper::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: FieldElement,
    pub state: TxState,
    /// Deployed address for contract and account deployments.
    pub address: Option<FieldElement>,
    /// Declared class hash.
    pub class_hash: Option<FieldElement>,
    pub failure_reason: Option<String>,
}

/// A transaction bound to the account that signs it.
#[derive(Debug)]
pub struct TxWrapper<'a> {
    account: &'a Account,
    kind: TxKind,
    nonce: FieldElement,
    max_fee: FieldElement,
    state: TxState,
}

impl<'a> TxWrapper<'a> {
    pub fn new(account: &'a Account, kind: TxKind, nonce: FieldElement, max_fee: FieldElement) -> Self {
        Self {
            account,
            kind,
            nonce,
            max_fee,
            state: TxState::Built,
        }
    }

    pub fn kind(&self) -> &TxKind {
        &self.kind
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn nonce(&self) -> FieldElement {
        self.nonce
    }

    pub fn max_fee(&self) -> FieldElement {
        self.max_fee
    }

    /// Hash and signed payload. `query` selects the estimate/simulate
    /// version so the signature cannot be replayed as a real transaction.
    pub fn sign(&self, query: bool) -> Result<(FieldElement, TransactionPayload), ToolkitError> {
        let version = if query {
            query_version(self.kind.version())
        } else {
            FieldElement::from(self.kind.version())
        };
        let sender = self.account.address();
        let chain_id = self.account.network().chain_id();
        let signer = self.account.signer();

        match &self.kind {
            TxKind::Invoke { calls } | TxKind::DeployContract { calls, .. } => {
                let (call_array, calldata) = encode(calls);
                let hash = invoke_transaction_hash(
                    sender,
                    &call_array,
                    &calldata,
                    self.nonce,
                    self.max_fee,
                    chain_id,
                    version,
                );
                let signature = signer.sign(&hash)?;
                let payload = TransactionPayload::Invoke(InvokePayload {
                    contract_address: sender,
                    entry_point_selector: get_selector_from_name(EXECUTE_ENTRY_POINT),
                    calldata: execute_calldata(&call_array, &calldata, self.nonce),
                    signature: signature_felts(&signature),
                    max_fee: self.max_fee,
                    version,
                });
                Ok((hash, payload))
            }
            TxKind::Declare {
                contract_class,
                class_hash,
                ..
            } => {
                let hash = declare_transaction_hash(
                    sender,
                    *class_hash,
                    self.max_fee,
                    chain_id,
                    self.nonce,
                    version,
                );
                let signature = signer.sign(&hash)?;
                let payload = TransactionPayload::Declare(DeclarePayload {
                    sender_address: sender,
                    contract_class: contract_class.clone(),
                    signature: signature_felts(&signature),
                    max_fee: self.max_fee,
                    version,
                    nonce: self.nonce,
                });
                Ok((hash, payload))
            }
            TxKind::DeployAccount {
                class_hash,
                salt,
                constructor_calldata,
                ..
            } => {
                let hash = deploy_account_transaction_hash(
                    sender,
                    *class_hash,
                    *salt,
                    constructor_calldata,
                    self.max_fee,
                    chain_id,
                    self.nonce,
                    version,
                );
                let signature = signer.sign(&hash)?;
                let payload = TransactionPayload::DeployAccount(DeployAccountPayload {
                    class_hash: *class_hash,
                    contract_address_salt: *salt,
                    constructor_calldata: constructor_calldata.clone(),
                    signature: signature_felts(&signature),
                    max_fee: self.max_fee,
                    version,
                    nonce: self.nonce,
                });
                Ok((hash, payload))
            }
        }
    }

    /// Fails before any network call if the records this transaction would
    /// write conflict with the registry.
    pub fn check_registry(&self, registry: &Registry) -> Result<(), ToolkitError> {
        if registry.network() != self.account.network() {
            return Err(ToolkitError::Config(format!(
                "registry is for {}, account is on {}",
                registry.network(),
                self.account.network()
            )));
        }

        match &self.kind {
            TxKind::Invoke { .. } => {}
            TxKind::Declare {
                class_hash, alias, ..
            } => registry
                .declarations
                .check_available(*class_hash, alias.as_deref())?,
            TxKind::DeployContract {
                alias, abi_path, ..
            } => registry
                .deployments
                .check_available(abi_path, alias.as_deref())?,
            TxKind::DeployAccount { alias, .. } => registry
                .accounts
                .check_available(&self.account.public_key(), alias.as_deref())?,
        }
        Ok(())
    }

    /// Signs and submits, optionally watches, and records the result. A
    /// wrapper is submitted at most once.
    ///
    /// Rejected transactions return `Ok` with [`TxState::Rejected`] and
    /// leave the registry untouched.
    pub async fn execute(
        &mut self,
        gateway: &dyn Gateway,
        registry: &mut Registry,
        watch: Option<WatchMode>,
    ) -> Result<TxOutcome, ToolkitError> {
        if self.state != TxState::Built {
            return Err(ToolkitError::Config(format!(
                "{} transaction was already submitted (state {:?})",
                self.kind.label(),
                self.state
            )));
        }
        self.check_registry(registry)?;

        let (hash, payload) = self.sign(false)?;

        let receipt = gateway.add_transaction(&payload).await?;
        self.state = TxState::Submitted;
        if receipt.transaction_hash != hash {
            warn!(
                local = %to_hex(&hash),
                gateway = %to_hex(&receipt.transaction_hash),
                "gateway reported a different transaction hash"
            );
        }
        info!(
            kind = self.kind.label(),
            tx_hash = %to_hex(&receipt.transaction_hash),
            code = %receipt.code,
            "transaction submitted"
        );

        let mut failure_reason = None;
        if let Some(watch) = watch {
            let report = self.watch(gateway, receipt.transaction_hash, watch).await?;
            failure_reason = report.failure_reason;
        }

        let mut outcome = TxOutcome {
            tx_hash: receipt.transaction_hash,
            state: self.state,
            address: None,
            class_hash: None,
            failure_reason,
        };

        if self.state == TxState::Rejected {
            warn!(
                tx_hash = %to_hex(&outcome.tx_hash),
                reason = outcome.failure_reason.as_deref().unwrap_or("unknown"),
                "transaction rejected, nothing registered"
            );
            return Ok(outcome);
        }

        self.commit(registry, &receipt, &mut outcome)?;
        Ok(outcome)
    }

    async fn watch(
        &mut self,
        gateway: &dyn Gateway,
        tx_hash: FieldElement,
        watch: WatchMode,
    ) -> Result<StatusReport, ToolkitError> {
        match watch.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.poll(gateway, tx_hash, watch.interval))
                .await
                .map_err(|_| ToolkitError::PollingTimeout {
                    tx_hash: to_hex(&tx_hash),
                    waited: timeout,
                })?,
            None => self.poll(gateway, tx_hash, watch.interval).await,
        }
    }

    async fn poll(
        &mut self,
        gateway: &dyn Gateway,
        tx_hash: FieldElement,
        interval: Duration,
    ) -> Result<StatusReport, ToolkitError> {
        loop {
            let report = gateway.transaction_status(tx_hash).await?;
            match report.status {
                TxStatus::Pending => {
                    self.state = TxState::Pending;
                    debug!(tx_hash = %to_hex(&tx_hash), status = %report.raw_status, "waiting");
                    tokio::time::sleep(interval).await;
                }
                TxStatus::Accepted => {
                    self.state = TxState::Accepted;
                    info!(tx_hash = %to_hex(&tx_hash), status = %report.raw_status, "transaction accepted");
                    return Ok(report);
                }
                TxStatus::Rejected => {
                    self.state = TxState::Rejected;
                    return Ok(report);
                }
            }
        }
    }

    fn commit(
        &self,
        registry: &mut Registry,
        receipt: &SubmitReceipt,
        outcome: &mut TxOutcome,
    ) -> Result<(), ToolkitError> {
        match &self.kind {
            TxKind::Invoke { .. } => {}
            TxKind::Declare {
                class_hash, alias, ..
            } => {
                let class_hash = receipt.class_hash.unwrap_or(*class_hash);
                registry.declarations.register(class_hash, alias.as_deref())?;
                outcome.class_hash = Some(class_hash);
            }
            TxKind::DeployContract {
                predicted_address,
                alias,
                abi_path,
                ..
            } => {
                registry
                    .deployments
                    .register(*predicted_address, abi_path, alias.as_deref())?;
                outcome.address = Some(*predicted_address);
            }
            TxKind::DeployAccount { alias, .. } => {
                let address = receipt.address.unwrap_or(self.account.address());
                registry
                    .accounts
                    .register_next(self.account.public_key(), address, alias.as_deref())?;
                outcome.address = Some(address);
            }
        }
        Ok(())
    }

    /// Fee estimate signed with the query version. Never touches the
    /// registry.
    pub async fn estimate_fee(&self, gateway: &dyn Gateway) -> Result<FeeEstimate, ToolkitError> {
        let (_, payload) = self.sign(true)?;
        gateway.estimate_fee(&payload).await
    }

    /// Simulation trace signed with the query version. Never touches the
    /// registry.
    pub async fn simulate(&self, gateway: &dyn Gateway) -> Result<serde_json::Value, ToolkitError> {
        let (_, payload) = self.sign(true)?;
        gateway.simulate(&payload).await
    }
}
