//! Toss Payments API client.
//!
//! Only the two calls the checkout flow needs: confirming an authorized
//! payment and cancelling an approved one. With `test_mode` set, both calls
//! are answered locally so the flow can run without provider credentials.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::TossConfig;

/// Errors returned by the Toss client.
#[derive(Debug, Error)]
pub enum TossError {
    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Toss answered with an error body.
    #[error("{message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The request or response could not be built or read.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl TossError {
    /// Whether Toss itself rejected the request (as opposed to the call failing).
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status < 500)
    }
}

/// Easy-pay details (KakaoPay, NaverPay, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct EasyPay {
    pub provider: Option<String>,
}

/// The parts of a Toss payment object the store uses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TossPayment {
    pub payment_key: String,
    pub order_id: String,
    pub status: String,
    pub method: Option<String>,
    pub easy_pay: Option<EasyPay>,
    pub total_amount: Option<Decimal>,
    pub approved_at: Option<DateTime<FixedOffset>>,
}

impl TossPayment {
    /// Approval time in UTC, if Toss reported one.
    #[must_use]
    pub fn approved_at_utc(&self) -> Option<DateTime<Utc>> {
        self.approved_at.map(|at| at.with_timezone(&Utc))
    }
}

#[derive(Debug, Deserialize)]
struct TossErrorBody {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmBody<'a> {
    payment_key: &'a str,
    order_id: &'a str,
    amount: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CancelBody<'a> {
    cancel_reason: &'a str,
}

/// Toss Payments client.
#[derive(Clone)]
pub struct TossClient {
    client: reqwest::Client,
    api_url: Url,
    client_key: String,
    test_mode: bool,
}

impl std::fmt::Debug for TossClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TossClient")
            .field("api_url", &self.api_url.as_str())
            .field("test_mode", &self.test_mode)
            .finish_non_exhaustive()
    }
}

impl TossClient {
    /// Create a client authenticated with the configured secret key.
    ///
    /// # Errors
    ///
    /// Returns `TossError::Parse` if the key cannot form a header, or
    /// `TossError::Http` if the HTTP client cannot be built.
    pub fn new(config: &TossConfig) -> Result<Self, TossError> {
        let credentials = STANDARD.encode(format!("{}:", config.secret_key.expose_secret()));
        let mut auth = HeaderValue::from_str(&format!("Basic {credentials}"))
            .map_err(|e| TossError::Parse(format!("Invalid secret key format: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            client_key: config.client_key.clone(),
            test_mode: config.test_mode,
        })
    }

    /// Public key for the browser payment widget.
    #[must_use]
    pub fn client_key(&self) -> &str {
        &self.client_key
    }

    #[must_use]
    pub const fn is_test_mode(&self) -> bool {
        self.test_mode
    }

    /// Confirm an authorized payment.
    ///
    /// # Errors
    ///
    /// Returns `TossError::Api` if Toss rejects the confirmation, or
    /// `TossError::Http` if the call fails.
    pub async fn confirm(
        &self,
        payment_key: &str,
        order_id: &str,
        amount: Decimal,
    ) -> Result<TossPayment, TossError> {
        if self.test_mode {
            tracing::info!(payment_key, order_id, "test mode: approving payment locally");
            return Ok(simulated(payment_key, order_id, "DONE", Some(amount)));
        }

        let url = self.endpoint(&["confirm"])?;
        let body = ConfirmBody {
            payment_key,
            order_id,
            amount,
        };
        self.post(url, &body).await
    }

    /// Cancel an approved payment in full.
    ///
    /// # Errors
    ///
    /// Returns `TossError::Api` if Toss rejects the cancellation, or
    /// `TossError::Http` if the call fails.
    pub async fn cancel(&self, payment_key: &str, reason: &str) -> Result<TossPayment, TossError> {
        if self.test_mode {
            tracing::info!(payment_key, "test mode: cancelling payment locally");
            return Ok(simulated(payment_key, "", "CANCELED", None));
        }

        let url = self.endpoint(&[payment_key, "cancel"])?;
        self.post(url, &CancelBody {
            cancel_reason: reason,
        })
        .await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TossError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| TossError::Parse(format!("cannot extend API URL {}", self.api_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post<B: Serialize + Sync>(&self, url: Url, body: &B) -> Result<TossPayment, TossError> {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let parsed: Option<TossErrorBody> = serde_json::from_str(&text).ok();
            let (code, message) = parsed.map_or_else(
                || ("UNKNOWN".to_owned(), text.clone()),
                |b| {
                    (
                        b.code.unwrap_or_else(|| "UNKNOWN".to_owned()),
                        b.message.unwrap_or_else(|| text.clone()),
                    )
                },
            );
            return Err(TossError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| TossError::Parse(e.to_string()))
    }
}

fn simulated(payment_key: &str, order_id: &str, status: &str, amount: Option<Decimal>) -> TossPayment {
    TossPayment {
        payment_key: payment_key.to_owned(),
        order_id: order_id.to_owned(),
        status: status.to_owned(),
        method: Some("CARD".to_owned()),
        easy_pay: None,
        total_amount: amount,
        approved_at: Some(Utc::now().fixed_offset()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn client(api_url: &str, test_mode: bool) -> TossClient {
        TossClient::new(&TossConfig {
            secret_key: SecretString::from("test_sk_abc".to_owned()),
            client_key: "test_ck_abc".to_owned(),
            api_url: Url::parse(api_url).unwrap(),
            test_mode,
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_paths() {
        let toss = client("https://api.tosspayments.com/v1/payments", false);
        assert_eq!(
            toss.endpoint(&["confirm"]).unwrap().as_str(),
            "https://api.tosspayments.com/v1/payments/confirm"
        );
        assert_eq!(
            toss.endpoint(&["pk/1", "cancel"]).unwrap().as_str(),
            "https://api.tosspayments.com/v1/payments/pk%2F1/cancel"
        );

        let trailing = client("https://api.tosspayments.com/v1/payments/", false);
        assert_eq!(
            trailing.endpoint(&["confirm"]).unwrap().as_str(),
            "https://api.tosspayments.com/v1/payments/confirm"
        );
    }

    #[tokio::test]
    async fn test_mode_confirms_locally() {
        let toss = client("http://127.0.0.1:9/unreachable", true);
        let payment = toss
            .confirm("pk_1", "ORDER_ABC", Decimal::new(1000, 0))
            .await
            .unwrap();
        assert_eq!(payment.status, "DONE");
        assert_eq!(payment.total_amount, Some(Decimal::new(1000, 0)));
        assert!(payment.approved_at_utc().is_some());

        let cancelled = toss.cancel("pk_1", "changed mind").await.unwrap();
        assert_eq!(cancelled.status, "CANCELED");
    }

    #[test]
    fn test_parses_provider_payment() {
        let payment: TossPayment = serde_json::from_str(
            r#"{
                "paymentKey": "pk_1",
                "orderId": "ORDER_ABC",
                "status": "DONE",
                "method": "간편결제",
                "easyPay": {"provider": "카카오페이"},
                "totalAmount": 15000,
                "approvedAt": "2024-02-01T10:00:00+09:00"
            }"#,
        )
        .unwrap();
        assert_eq!(payment.easy_pay.unwrap().provider.as_deref(), Some("카카오페이"));
        assert_eq!(
            payment.approved_at.unwrap().with_timezone(&Utc).to_rfc3339(),
            "2024-02-01T01:00:00+00:00"
        );
    }

    #[test]
    fn test_rejection_vs_outage() {
        let rejected = TossError::Api {
            status: 400,
            code: "INVALID_CARD".to_owned(),
            message: "card declined".to_owned(),
        };
        let outage = TossError::Api {
            status: 503,
            code: "UNKNOWN".to_owned(),
            message: String::new(),
        };
        assert!(rejected.is_rejection());
        assert!(!outage.is_rejection());
        assert_eq!(rejected.to_string(), "card declined");
    }
}
