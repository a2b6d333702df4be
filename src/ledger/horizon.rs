use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::LedgerError;
use crate::ledger::{
    client::LedgerClient,
    envelope::build_signed_payment,
    models::{AccountState, PaymentRequest, ResultCodes, SubmitResponse},
};

pub const PUBLIC_NETWORK_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";
pub const PUBLIC_HORIZON_URL: &str = "https://horizon.stellar.org";

#[derive(Debug, Clone)]
pub struct StellarConfig {
    pub horizon_url: String,
    pub network_passphrase: String,
    /// Upper bound for one HTTP round trip to Horizon
    pub request_timeout: Duration,
}

impl Default for StellarConfig {
    fn default() -> Self {
        Self {
            horizon_url: PUBLIC_HORIZON_URL.to_string(),
            network_passphrase: PUBLIC_NETWORK_PASSPHRASE.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Horizon problem document (RFC 7807 style error body)
#[derive(Debug, Deserialize)]
struct Problem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    detail: String,
    #[serde(default)]
    extras: Option<ProblemExtras>,
}

#[derive(Debug, Deserialize)]
struct ProblemExtras {
    #[serde(default)]
    result_codes: Option<ResultCodes>,
}

#[derive(Debug, Deserialize)]
struct FeeStats {
    last_ledger_base_fee: String,
}

/// Ledger client talking to a Horizon server over HTTP
pub struct HorizonClient {
    config: StellarConfig,
    client: Client,
    /// Last base fee Horizon reported, served when `/fee_stats` is unavailable
    last_base_fee: RwLock<Option<u32>>,
}

impl HorizonClient {
    pub fn new(config: StellarConfig) -> Result<Self, LedgerError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LedgerError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            last_base_fee: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.horizon_url.trim_end_matches('/'), path)
    }

    async fn fee_stats(&self) -> Result<u32, LedgerError> {
        let response = self.client.get(self.url("fee_stats")).send().await?;
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let stats: FeeStats = response.json().await?;
        stats
            .last_ledger_base_fee
            .parse::<u32>()
            .map_err(|_| LedgerError::Malformed(format!("Invalid base fee: {}", stats.last_ledger_base_fee)))
    }

    /// Turn a non-success response into a `LedgerError::Status`
    async fn status_error(response: Response) -> LedgerError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        match serde_json::from_str::<Problem>(&body) {
            Ok(problem) => {
                let detail = if problem.detail.is_empty() {
                    problem.title
                } else {
                    format!("{}: {}", problem.title, problem.detail)
                };
                LedgerError::Status {
                    status,
                    detail,
                    result_codes: problem.extras.and_then(|e| e.result_codes),
                }
            }
            Err(_) => LedgerError::Status {
                status,
                detail: body,
                result_codes: None,
            },
        }
    }
}

#[async_trait]
impl LedgerClient for HorizonClient {
    async fn load_account(&self, account_id: &str) -> Result<AccountState, LedgerError> {
        let response = self
            .client
            .get(self.url(&format!("accounts/{}", account_id)))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let account: AccountState = response.json().await?;
        debug!("Loaded account {} at sequence {}", account.account_id, account.sequence);
        Ok(account)
    }

    async fn fetch_base_fee(&self) -> Result<u32, LedgerError> {
        match self.fee_stats().await {
            Ok(fee) => {
                *self.last_base_fee.write() = Some(fee);
                Ok(fee)
            }
            Err(e) => match *self.last_base_fee.read() {
                Some(cached) => {
                    warn!("fee_stats unavailable ({}), using last known base fee {}", e, cached);
                    Ok(cached)
                }
                None => Err(e),
            },
        }
    }

    async fn submit_payment(&self, request: PaymentRequest<'_>) -> Result<SubmitResponse, LedgerError> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let signed = build_signed_payment(&request, &self.config.network_passphrase, now)?;

        info!(
            "Submitting transaction {} (seq {}, fee {})",
            signed.hash,
            request.source.next_sequence()?,
            request.fee_per_op
        );

        let response = self
            .client
            .post(self.url("transactions"))
            .form(&[("tx", signed.envelope_xdr)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let mut body: SubmitResponse = response.json().await?;
        if body.hash.is_none() {
            body.hash = Some(signed.hash);
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::keys::Keypair;
    use crate::ledger::models::Balance;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SEED: &str = "SAAACAQDAQCQMBYIBEFAWDANBYHRAEISCMKBKFQXDAMRUGY4DUPB6NKI";
    const ACCOUNT: &str = "GAB2CB576PHBBPQ5ODORRZ2LYCMWPZGWGCN2KDK7DXOIMZASKUY3QZ6Q";
    const RECEIVER: &str = "GDVEU3DD4KOFECV66VIHWEZOYX4ZKR3WV27L464SIIPOU2IUI3JCZA57";

    fn client_for(server: &MockServer) -> HorizonClient {
        HorizonClient::new(StellarConfig {
            horizon_url: server.uri(),
            network_passphrase: "Test SDF Network ; September 2015".to_string(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn account() -> AccountState {
        AccountState {
            account_id: ACCOUNT.to_string(),
            sequence: "100".to_string(),
            balances: vec![Balance { asset_type: "native".to_string(), balance: "50.0000000".to_string() }],
        }
    }

    #[tokio::test]
    async fn test_load_account() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/accounts/{}", ACCOUNT)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": ACCOUNT,
                "account_id": ACCOUNT,
                "sequence": "4294967296",
                "balances": [
                    { "balance": "12.0000000", "asset_type": "credit_alphanum4", "asset_code": "USDC" },
                    { "balance": "250.1234567", "asset_type": "native" }
                ]
            })))
            .mount(&server)
            .await;

        let account = client_for(&server).load_account(ACCOUNT).await.unwrap();

        assert_eq!(account.sequence_number().unwrap(), 4294967296);
        assert_eq!(account.native_balance().unwrap(), dec!(250.1234567));
    }

    #[tokio::test]
    async fn test_load_account_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/accounts/{}", ACCOUNT)))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "type": "https://stellar.org/horizon-errors/not_found",
                "title": "Resource Missing",
                "status": 404,
                "detail": "The resource at the url requested was not found."
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).load_account(ACCOUNT).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_fetch_base_fee_caches_last_value() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fee_stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "last_ledger": "123",
                "last_ledger_base_fee": "100"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fee_stats"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.fetch_base_fee().await.unwrap(), 100);
        // Second call hits the 503 and falls back to the cached value
        assert_eq!(client.fetch_base_fee().await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_submit_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transactions"))
            .and(body_string_contains("tx="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "successful": true,
                "hash": "deadbeef",
                "ledger": 777
            })))
            .expect(1)
            .mount(&server)
            .await;

        let kp = Keypair::from_secret_seed(SEED).unwrap();
        let source = account();
        let response = client_for(&server)
            .submit_payment(PaymentRequest {
                source: &source,
                destination: RECEIVER,
                amount: dec!(12.5),
                fee_per_op: 100,
                validity: Duration::from_secs(100),
                keypair: &kp,
            })
            .await
            .unwrap();

        assert!(response.successful);
        assert_eq!(response.hash.as_deref(), Some("deadbeef"));
    }

    #[tokio::test]
    async fn test_submit_failure_carries_result_codes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transactions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "type": "https://stellar.org/horizon-errors/transaction_failed",
                "title": "Transaction Failed",
                "status": 400,
                "detail": "The transaction failed when submitted to the stellar network.",
                "extras": {
                    "result_codes": { "transaction": "tx_failed", "operations": ["op_underfunded"] }
                }
            })))
            .mount(&server)
            .await;

        let kp = Keypair::from_secret_seed(SEED).unwrap();
        let source = account();
        let err = client_for(&server)
            .submit_payment(PaymentRequest {
                source: &source,
                destination: RECEIVER,
                amount: dec!(1),
                fee_per_op: 100,
                validity: Duration::from_secs(100),
                keypair: &kp,
            })
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(400));
        let codes = err.result_codes().unwrap();
        assert_eq!(codes.transaction, "tx_failed");
        assert!(codes.has_operation("op_underfunded"));
    }

    #[tokio::test]
    async fn test_gateway_timeout_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transactions"))
            .respond_with(ResponseTemplate::new(504).set_body_string("upstream timed out"))
            .mount(&server)
            .await;

        let kp = Keypair::from_secret_seed(SEED).unwrap();
        let source = account();
        let err = client_for(&server)
            .submit_payment(PaymentRequest {
                source: &source,
                destination: RECEIVER,
                amount: dec!(1),
                fee_per_op: 100,
                validity: Duration::from_secs(100),
                keypair: &kp,
            })
            .await
            .unwrap_err();

        match err {
            LedgerError::Status { status, detail, result_codes } => {
                assert_eq!(status, 504);
                assert_eq!(detail, "upstream timed out");
                assert!(result_codes.is_none());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
