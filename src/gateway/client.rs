//! HTTP client for the processor's API.
//!
//! Each endpoint gets a typed request and response struct; a body that does
//! not decode is an upstream error, never a silently-null field. The
//! [`ProcessorApi`] trait is the seam tests mock out.

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::error;

/// Inquiry status code the processor uses for a verified, settled payment.
pub const VERIFIED_PAID_STATUS: i64 = 100;

pub const CREATE_PAYMENT_PATH: &str = "/v1/payment";
pub const INQUIRY_PATH: &str = "/v1/payment/inquiry";

#[derive(Debug, Clone, Serialize)]
pub struct CreatePaymentRequest {
    pub order_id: String,
    pub amount: i64,
    pub phone: String,
    pub desc: String,
    pub callback: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentData {
    pub id: String,
    pub link: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InquiryRequest {
    pub id: String,
    pub order_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InquiryData {
    pub status: i64,
    #[serde(deserialize_with = "string_or_number")]
    pub track_id: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub card_no: Option<String>,
}

/// Structured body the processor attaches to 4xx responses.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    error_message: Option<String>,
}

#[async_trait]
pub trait ProcessorApi: Send + Sync {
    async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
    ) -> GatewayResult<CreatePaymentData>;

    async fn inquire(&self, request: &InquiryRequest) -> GatewayResult<InquiryData>;
}

pub struct IdpayClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    sandbox: bool,
}

impl IdpayClient {
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Upstream {
                url: config.base_url.clone(),
                http_status: None,
                error_code: None,
                error_message: None,
                message: format!("failed to initialize HTTP client: {}", e),
            })?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            sandbox: config.mode.is_sandbox(),
        })
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> GatewayResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header("X-API-KEY", &self.api_key)
            .header("X-SANDBOX", if self.sandbox { "true" } else { "false" })
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Upstream {
                url: url.clone(),
                http_status: None,
                error_code: None,
                error_message: None,
                message: format!("processor request failed: {}", e),
            })?;

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        if (200..300).contains(&status) {
            serde_json::from_str::<T>(&text).map_err(|e| GatewayError::Upstream {
                url,
                http_status: Some(status),
                error_code: None,
                error_message: None,
                message: format!("invalid processor response body: {}", e),
            })
        } else {
            error!(%url, status, "processor returned an error response");
            Err(classify_failure(status, &text, &url))
        }
    }
}

#[async_trait]
impl ProcessorApi for IdpayClient {
    async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
    ) -> GatewayResult<CreatePaymentData> {
        self.post_json(CREATE_PAYMENT_PATH, request).await
    }

    async fn inquire(&self, request: &InquiryRequest) -> GatewayResult<InquiryData> {
        self.post_json(INQUIRY_PATH, request).await
    }
}

/// Turn a non-success HTTP response into an upstream error. 4xx bodies are
/// parsed for the processor's structured `{error_code, error_message}`;
/// 5xx bodies are carried verbatim.
pub(crate) fn classify_failure(http_status: u16, body: &str, url: &str) -> GatewayError {
    if (400..500).contains(&http_status) {
        let parsed = serde_json::from_str::<ApiErrorBody>(body).unwrap_or_default();
        let message = match &parsed.error_message {
            Some(detail) => format!("HTTP {}: {}", http_status, detail),
            None => format!("HTTP {}: {}", http_status, body),
        };
        GatewayError::Upstream {
            url: url.to_string(),
            http_status: Some(http_status),
            error_code: parsed.error_code,
            error_message: parsed.error_message,
            message,
        }
    } else {
        GatewayError::Upstream {
            url: url.to_string(),
            http_status: Some(http_status),
            error_code: None,
            error_message: None,
            message: format!("HTTP {}: {}", http_status, body),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_payment_request_uses_processor_field_names() {
        let request = CreatePaymentRequest {
            order_id: "42".to_string(),
            amount: 100000,
            phone: String::new(),
            desc: "Order number #42".to_string(),
            callback: "https://shop.example/checkout/42/payment/return/k1".to_string(),
        };
        let json = serde_json::to_value(&request).expect("serialization should succeed");
        assert_eq!(json["order_id"], "42");
        assert_eq!(json["amount"], 100000);
        assert_eq!(json["phone"], "");
        assert_eq!(json["desc"], "Order number #42");
        assert_eq!(
            json["callback"],
            "https://shop.example/checkout/42/payment/return/k1"
        );
    }

    #[test]
    fn inquiry_data_accepts_numeric_track_id_and_card_no() {
        let data: InquiryData = serde_json::from_value(serde_json::json!({
            "status": 100,
            "track_id": 12345,
            "card_no": 6037
        }))
        .expect("deserialization should succeed");
        assert_eq!(data.status, 100);
        assert_eq!(data.track_id, "12345");
        assert_eq!(data.card_no.as_deref(), Some("6037"));
    }

    #[test]
    fn inquiry_data_accepts_string_fields_and_missing_card_no() {
        let data: InquiryData = serde_json::from_value(serde_json::json!({
            "status": 11,
            "track_id": "T9"
        }))
        .expect("deserialization should succeed");
        assert_eq!(data.status, 11);
        assert_eq!(data.track_id, "T9");
        assert!(data.card_no.is_none());
    }

    #[test]
    fn inquiry_data_rejects_missing_status() {
        let result = serde_json::from_value::<InquiryData>(serde_json::json!({
            "track_id": "T9"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn client_errors_carry_the_structured_body() {
        let error = classify_failure(
            406,
            r#"{"error_code": 34, "error_message": "amount below the minimum"}"#,
            "https://api.idpay.ir/v1/payment",
        );
        match error {
            GatewayError::Upstream {
                http_status,
                error_code,
                error_message,
                ..
            } => {
                assert_eq!(http_status, Some(406));
                assert_eq!(error_code, Some(34));
                assert_eq!(error_message.as_deref(), Some("amount below the minimum"));
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[test]
    fn unparseable_client_error_body_falls_back_to_raw_text() {
        let error = classify_failure(404, "not found", "https://api.idpay.ir/v1/payment");
        match error {
            GatewayError::Upstream {
                http_status,
                error_code,
                error_message,
                message,
                ..
            } => {
                assert_eq!(http_status, Some(404));
                assert!(error_code.is_none());
                assert!(error_message.is_none());
                assert!(message.contains("not found"));
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[test]
    fn server_errors_keep_the_raw_message_and_no_structured_fields() {
        let error = classify_failure(
            502,
            "upstream unavailable",
            "https://api.idpay.ir/v1/payment/inquiry",
        );
        match &error {
            GatewayError::Upstream {
                http_status,
                error_message,
                message,
                ..
            } => {
                assert_eq!(*http_status, Some(502));
                assert!(error_message.is_none());
                assert!(message.contains("upstream unavailable"));
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
        assert!(error.is_retryable());
    }
}
