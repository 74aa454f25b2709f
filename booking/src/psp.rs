//! Payment service provider adapter: the seven operations spec §6 names,
//! wrapped with the resilience primitives from `booking_runtime`.

use crate::config::PspConfig;
use crate::error::{BookingError, PspErrorClass, Result};
use async_trait::async_trait;
use booking_runtime::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};
use booking_runtime::retry::{retry_with_backoff, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of a PSP call that the caller classifies further via
/// [`PspErrorClass`] on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PspIntent {
    /// PSP-assigned payment intent id.
    pub intent_id: String,
    /// PSP-assigned payment method id, once attached.
    pub payment_method_id: Option<String>,
    /// Raw status string from the PSP, kept for audit logs.
    pub status: String,
}

/// Outcome of a transfer-style call (capture, refund, manual transfer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PspTransfer {
    /// PSP-assigned transfer or refund id.
    pub transfer_id: String,
    /// Amount actually moved, cents.
    pub amount_cents: i64,
}

/// The seven PSP operations the engine drives, per spec §6.
///
/// Every call takes a pre-derived idempotency key (see
/// [`crate::idempotency`]) so retries after a crash collapse into the
/// original attempt instead of double-charging.
#[async_trait]
pub trait PspAdapter: Send + Sync {
    /// Create a new authorization, or retry one that previously failed
    /// transiently, under the given idempotency key.
    async fn create_or_retry_auth(
        &self,
        idempotency_key: &str,
        payment_method_id: &str,
        amount_cents: i64,
    ) -> Result<PspIntent>;

    /// Confirm a previously created authorization (3DS / off-session flows).
    async fn confirm_auth(&self, idempotency_key: &str, intent_id: &str) -> Result<PspIntent>;

    /// Capture some or all of an authorized amount.
    async fn capture_auth(
        &self,
        idempotency_key: &str,
        intent_id: &str,
        amount_cents: i64,
    ) -> Result<PspTransfer>;

    /// Refund a previously captured amount.
    async fn refund(
        &self,
        idempotency_key: &str,
        intent_id: &str,
        amount_cents: i64,
    ) -> Result<PspTransfer>;

    /// Cancel an authorization that was never captured.
    async fn cancel_auth(&self, idempotency_key: &str, intent_id: &str) -> Result<()>;

    /// Issue a manual transfer to an instructor outside the capture flow
    /// (used when a capture failure escalates to manual review but the
    /// instructor is still owed a payout).
    async fn manual_transfer(
        &self,
        idempotency_key: &str,
        instructor_account_id: &str,
        amount_cents: i64,
    ) -> Result<PspTransfer>;

    /// Set or update an instructor's automated payout schedule.
    async fn set_payout_schedule(&self, instructor_account_id: &str, interval_days: u32)
        -> Result<()>;
}

/// HTTP-backed [`PspAdapter`], circuit-broken and retried.
pub struct HttpPspAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    breaker: CircuitBreaker,
    retry_policy: RetryPolicy,
}

impl HttpPspAdapter {
    /// Build an adapter from configuration, with default circuit breaker and
    /// retry tuning appropriate for a payment processor dependency.
    #[must_use]
    pub fn new(config: &PspConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            breaker: CircuitBreaker::new(
                CircuitBreakerConfig::builder()
                    .failure_threshold(5)
                    .timeout(Duration::from_secs(30))
                    .success_threshold(2)
                    .build(),
            ),
            retry_policy: RetryPolicy::builder()
                .max_retries(2)
                .initial_delay(Duration::from_millis(200))
                .max_delay(Duration::from_secs(2))
                .multiplier(2.0)
                .build(),
        }
    }

    async fn call_json<T: serde::de::DeserializeOwned>(
        &self,
        idempotency_key: &str,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let client = &self.client;
        let api_key = self.api_key.clone();

        let breaker_result = self
            .breaker
            .call(|| {
                let client = client.clone();
                let url = url.clone();
                let api_key = api_key.clone();
                let idempotency_key = idempotency_key.to_string();
                let body = body.clone();
                retry_with_backoff(self.retry_policy.clone(), move || {
                    let client = client.clone();
                    let url = url.clone();
                    let api_key = api_key.clone();
                    let idempotency_key = idempotency_key.clone();
                    let body = body.clone();
                    async move { send_request(&client, &url, &api_key, &idempotency_key, body).await }
                })
            })
            .await;

        match breaker_result {
            Ok(response) => Ok(response),
            Err(CircuitBreakerError::Open) => Err(BookingError::Psp {
                class: PspErrorClass::SystemError,
                message: "circuit breaker open".to_string(),
            }),
            Err(CircuitBreakerError::Inner(err)) => Err(err),
        }
    }
}

async fn send_request<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    idempotency_key: &str,
    body: serde_json::Value,
) -> Result<T> {
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .header("Idempotency-Key", idempotency_key)
        .json(&body)
        .send()
        .await
        .map_err(|err| BookingError::Psp {
            class: PspErrorClass::SystemError,
            message: err.to_string(),
        })?;

    let status = response.status();
    if status.is_success() {
        response.json::<T>().await.map_err(|err| BookingError::Psp {
            class: PspErrorClass::SystemError,
            message: format!("decode failure: {err}"),
        })
    } else {
        let class = classify_status(status.as_u16());
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        Err(BookingError::Psp { class, message })
    }
}

fn classify_status(status: u16) -> PspErrorClass {
    match status {
        402 => PspErrorClass::CardDeclined,
        409 => PspErrorClass::AlreadyCaptured,
        410 => PspErrorClass::AuthExpired,
        400 | 422 => PspErrorClass::InvalidState,
        _ => PspErrorClass::SystemError,
    }
}

#[async_trait]
impl PspAdapter for HttpPspAdapter {
    async fn create_or_retry_auth(
        &self,
        idempotency_key: &str,
        payment_method_id: &str,
        amount_cents: i64,
    ) -> Result<PspIntent> {
        self.call_json(
            idempotency_key,
            "/v1/payment_intents/authorize",
            serde_json::json!({
                "payment_method_id": payment_method_id,
                "amount_cents": amount_cents,
            }),
        )
        .await
    }

    async fn confirm_auth(&self, idempotency_key: &str, intent_id: &str) -> Result<PspIntent> {
        self.call_json(
            idempotency_key,
            "/v1/payment_intents/confirm",
            serde_json::json!({ "intent_id": intent_id }),
        )
        .await
    }

    async fn capture_auth(
        &self,
        idempotency_key: &str,
        intent_id: &str,
        amount_cents: i64,
    ) -> Result<PspTransfer> {
        self.call_json(
            idempotency_key,
            "/v1/payment_intents/capture",
            serde_json::json!({ "intent_id": intent_id, "amount_cents": amount_cents }),
        )
        .await
    }

    async fn refund(
        &self,
        idempotency_key: &str,
        intent_id: &str,
        amount_cents: i64,
    ) -> Result<PspTransfer> {
        self.call_json(
            idempotency_key,
            "/v1/refunds",
            serde_json::json!({ "intent_id": intent_id, "amount_cents": amount_cents }),
        )
        .await
    }

    async fn cancel_auth(&self, idempotency_key: &str, intent_id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call_json(
                idempotency_key,
                "/v1/payment_intents/cancel",
                serde_json::json!({ "intent_id": intent_id }),
            )
            .await?;
        Ok(())
    }

    async fn manual_transfer(
        &self,
        idempotency_key: &str,
        instructor_account_id: &str,
        amount_cents: i64,
    ) -> Result<PspTransfer> {
        self.call_json(
            idempotency_key,
            "/v1/transfers",
            serde_json::json!({
                "destination_account_id": instructor_account_id,
                "amount_cents": amount_cents,
            }),
        )
        .await
    }

    async fn set_payout_schedule(
        &self,
        instructor_account_id: &str,
        interval_days: u32,
    ) -> Result<()> {
        let _: serde_json::Value = self
            .call_json(
                instructor_account_id,
                "/v1/accounts/payout_schedule",
                serde_json::json!({
                    "account_id": instructor_account_id,
                    "interval_days": interval_days,
                }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_declined_cards() {
        assert_eq!(classify_status(402), PspErrorClass::CardDeclined);
    }

    #[test]
    fn classifies_already_captured_as_conflict() {
        assert_eq!(classify_status(409), PspErrorClass::AlreadyCaptured);
    }

    #[test]
    fn classifies_expired_auth() {
        assert_eq!(classify_status(410), PspErrorClass::AuthExpired);
    }

    #[test]
    fn unrecognized_status_falls_back_to_system_error() {
        assert_eq!(classify_status(503), PspErrorClass::SystemError);
    }
}
