use async_trait::async_trait;
use chain_stark::felt::{parse_felt, to_hex};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use starknet_ff::FieldElement;
use tracing::debug;
use url::Url;

use crate::config::Endpoints;
use crate::error::ToolkitError;
use crate::payload::TransactionPayload;

/// Coarse status of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Accepted,
    Rejected,
}

impl TxStatus {
    /// Maps a raw `tx_status` string. `None` for values this client does not
    /// know.
    pub fn from_raw(status: &str) -> Option<Self> {
        match status {
            "NOT_RECEIVED" | "RECEIVED" | "PENDING" => Some(TxStatus::Pending),
            "ACCEPTED_ON_L2" | "ACCEPTED_ON_L1" => Some(TxStatus::Accepted),
            "REJECTED" | "REVERTED" => Some(TxStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self != TxStatus::Pending
    }
}

/// Status report from the feeder gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub status: TxStatus,
    pub raw_status: String,
    pub failure_reason: Option<String>,
}

/// Response of `add_transaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub code: String,
    pub transaction_hash: FieldElement,
    pub address: Option<FieldElement>,
    pub class_hash: Option<FieldElement>,
}

/// Response of `estimate_fee`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeeEstimate {
    pub overall_fee: u128,
    pub unit: String,
    #[serde(default)]
    pub gas_price: Option<u128>,
    #[serde(default)]
    pub gas_usage: Option<u128>,
}

/// Sequencer gateway operations used by the transaction executor.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn add_transaction(&self, tx: &TransactionPayload) -> Result<SubmitReceipt, ToolkitError>;

    async fn estimate_fee(&self, tx: &TransactionPayload) -> Result<FeeEstimate, ToolkitError>;

    /// Simulation trace, returned as-is.
    async fn simulate(&self, tx: &TransactionPayload) -> Result<serde_json::Value, ToolkitError>;

    async fn transaction_status(&self, tx_hash: FieldElement) -> Result<StatusReport, ToolkitError>;

    async fn get_nonce(&self, address: FieldElement) -> Result<FieldElement, ToolkitError>;
}

#[derive(Debug, Deserialize)]
struct RawReceipt {
    code: String,
    transaction_hash: String,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    class_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    tx_status: String,
    #[serde(default)]
    tx_failure_reason: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    code: String,
    message: String,
}

fn felt_field(name: &str, value: &str) -> Result<FieldElement, ToolkitError> {
    parse_felt(value).map_err(|e| ToolkitError::UnexpectedResponse(format!("{name}: {e}")))
}

impl TryFrom<RawReceipt> for SubmitReceipt {
    type Error = ToolkitError;

    fn try_from(raw: RawReceipt) -> Result<Self, Self::Error> {
        Ok(Self {
            code: raw.code,
            transaction_hash: felt_field("transaction_hash", &raw.transaction_hash)?,
            address: raw.address.as_deref().map(|a| felt_field("address", a)).transpose()?,
            class_hash: raw
                .class_hash
                .as_deref()
                .map(|h| felt_field("class_hash", h))
                .transpose()?,
        })
    }
}

impl TryFrom<RawStatus> for StatusReport {
    type Error = ToolkitError;

    fn try_from(raw: RawStatus) -> Result<Self, Self::Error> {
        let status = TxStatus::from_raw(&raw.tx_status).ok_or_else(|| {
            ToolkitError::UnexpectedResponse(format!("unknown tx_status {}", raw.tx_status))
        })?;
        let failure_reason = raw.tx_failure_reason.map(|reason| match reason {
            serde_json::Value::Object(ref fields) => fields
                .get("error_message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| reason.to_string()),
            other => other.to_string(),
        });
        Ok(Self {
            status,
            raw_status: raw.tx_status,
            failure_reason,
        })
    }
}

/// HTTP client for a sequencer gateway.
pub struct HttpGateway {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpGateway {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn url(base: &Url, method: &str) -> Result<Url, ToolkitError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| ToolkitError::Config(format!("{base} cannot be a base URL")))?
            .pop_if_empty()
            .push(method);
        Ok(url)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        base: &Url,
        method: &str,
        tx: &TransactionPayload,
    ) -> Result<T, ToolkitError> {
        let url = Self::url(base, method)?;
        debug!(%url, "gateway request");
        let resp = self.client.post(url).json(tx).send().await?;
        Self::decode(resp).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, ToolkitError> {
        let mut url = Self::url(&self.endpoints.feeder_gateway, method)?;
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        debug!(%url, "feeder gateway request");
        let resp = self.client.get(url).send().await?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ToolkitError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(error_from_body(status, &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Error for a non-success response. A `{code, message}` body is the
/// network refusing the transaction; anything else is a transport failure.
fn error_from_body(status: reqwest::StatusCode, body: &str) -> ToolkitError {
    match serde_json::from_str::<GatewayErrorBody>(body) {
        Ok(err) => ToolkitError::SubmissionFailure {
            code: err.code,
            message: err.message,
        },
        Err(_) => ToolkitError::Transport(format!("gateway returned {status}: {body}")),
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn add_transaction(&self, tx: &TransactionPayload) -> Result<SubmitReceipt, ToolkitError> {
        let raw: RawReceipt = self
            .post(&self.endpoints.gateway, "add_transaction", tx)
            .await?;
        raw.try_into()
    }

    async fn estimate_fee(&self, tx: &TransactionPayload) -> Result<FeeEstimate, ToolkitError> {
        self.post(&self.endpoints.feeder_gateway, "estimate_fee", tx)
            .await
    }

    async fn simulate(&self, tx: &TransactionPayload) -> Result<serde_json::Value, ToolkitError> {
        self.post(&self.endpoints.feeder_gateway, "simulate_transaction", tx)
            .await
    }

    async fn transaction_status(&self, tx_hash: FieldElement) -> Result<StatusReport, ToolkitError> {
        let raw: RawStatus = self
            .get(
                "get_transaction_status",
                &[("transactionHash", to_hex(&tx_hash))],
            )
            .await?;
        raw.try_into()
    }

    async fn get_nonce(&self, address: FieldElement) -> Result<FieldElement, ToolkitError> {
        let raw: String = self
            .get("get_nonce", &[("contractAddress", to_hex(&address))])
            .await?;
        felt_field("nonce", &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use chain_stark::networks::Network;

    #[test]
    fn status_mapping() {
        assert_eq!(TxStatus::from_raw("NOT_RECEIVED"), Some(TxStatus::Pending));
        assert_eq!(TxStatus::from_raw("RECEIVED"), Some(TxStatus::Pending));
        assert_eq!(TxStatus::from_raw("PENDING"), Some(TxStatus::Pending));
        assert_eq!(TxStatus::from_raw("ACCEPTED_ON_L2"), Some(TxStatus::Accepted));
        assert_eq!(TxStatus::from_raw("ACCEPTED_ON_L1"), Some(TxStatus::Accepted));
        assert_eq!(TxStatus::from_raw("REJECTED"), Some(TxStatus::Rejected));
        assert_eq!(TxStatus::from_raw("REVERTED"), Some(TxStatus::Rejected));
        assert_eq!(TxStatus::from_raw("SOMETHING_ELSE"), None);
        assert!(!TxStatus::Pending.is_terminal());
        assert!(TxStatus::Rejected.is_terminal());
    }

    #[test]
    fn receipt_parsing() {
        let raw: RawReceipt = serde_json::from_str(
            r#"{"code": "TRANSACTION_RECEIVED", "transaction_hash": "0x1a", "address": "0x99"}"#,
        )
        .unwrap();
        let receipt = SubmitReceipt::try_from(raw).unwrap();
        assert_eq!(receipt.transaction_hash, FieldElement::from(26u64));
        assert_eq!(receipt.address, Some(FieldElement::from(0x99u64)));
        assert_eq!(receipt.class_hash, None);
    }

    #[test]
    fn receipt_with_bad_hash_is_unexpected() {
        let raw: RawReceipt =
            serde_json::from_str(r#"{"code": "TRANSACTION_RECEIVED", "transaction_hash": "nope"}"#)
                .unwrap();
        assert!(matches!(
            SubmitReceipt::try_from(raw),
            Err(ToolkitError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn status_with_failure_reason() {
        let raw: RawStatus = serde_json::from_str(
            r#"{"tx_status": "REJECTED", "tx_failure_reason": {"code": "X", "error_message": "out of gas"}}"#,
        )
        .unwrap();
        let report = StatusReport::try_from(raw).unwrap();
        assert_eq!(report.status, TxStatus::Rejected);
        assert_eq!(report.raw_status, "REJECTED");
        assert_eq!(report.failure_reason.as_deref(), Some("out of gas"));
    }

    #[test]
    fn unknown_status_is_unexpected() {
        let raw: RawStatus = serde_json::from_str(r#"{"tx_status": "LOST"}"#).unwrap();
        assert!(StatusReport::try_from(raw).is_err());
    }

    #[test]
    fn fee_estimate_parsing() {
        let fee: FeeEstimate =
            serde_json::from_str(r#"{"overall_fee": 21000, "unit": "wei", "gas_price": 1}"#).unwrap();
        assert_eq!(fee.overall_fee, 21000);
        assert_eq!(fee.gas_usage, None);
    }

    #[test]
    fn error_body_becomes_submission_failure() {
        let err = error_from_body(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"code": "StarknetErrorCode.INVALID_TRANSACTION_NONCE", "message": "nonce too low"}"#,
        );
        match err {
            ToolkitError::SubmissionFailure { code, message } => {
                assert_eq!(code, "StarknetErrorCode.INVALID_TRANSACTION_NONCE");
                assert_eq!(message, "nonce too low");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unstructured_error_body_is_transport() {
        let err = error_from_body(reqwest::StatusCode::BAD_GATEWAY, "upstream unavailable");
        match err {
            ToolkitError::Transport(message) => {
                assert!(message.contains("502"));
                assert!(message.contains("upstream unavailable"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn method_urls() {
        let endpoints = NodeConfig::with_defaults().endpoints(Network::Localhost).unwrap();
        let url = HttpGateway::url(&endpoints.gateway, "add_transaction").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5050/gateway/add_transaction");
        let url = HttpGateway::url(&endpoints.feeder_gateway, "get_nonce").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5050/feeder_gateway/get_nonce");
    }
}
