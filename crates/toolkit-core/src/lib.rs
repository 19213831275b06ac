//! StarkNet deployment toolkit core.
//!
//! - **Accounts**: load a registered account or derive a counterfactual one
//! - **Transactions**: build, sign, submit and watch invoke, declare,
//!   contract-deployment and account-deployment transactions
//! - **Gateway**: sequencer gateway client behind the [`Gateway`] trait
//! - **Config**: `node.json` gateway overrides and watch settings
//!
//! Successful transactions are recorded in the per-network [`Registry`].

pub mod account;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod payload;
pub mod transaction;

pub use account::{Account, AccountDeployment};
pub use config::{Endpoints, NodeConfig, ToolkitConfig};
pub use error::ToolkitError;
pub use gateway::{FeeEstimate, Gateway, HttpGateway, StatusReport, SubmitReceipt, TxStatus};
pub use payload::TransactionPayload;
pub use registry::Registry;
pub use transaction::{TxKind, TxOutcome, TxState, TxWrapper, WatchMode};
