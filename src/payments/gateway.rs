use anyhow::Context;
use axum::async_trait;

use crate::config::ChargeConfig;

/// One-time charge request forwarded to the payment processor.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    /// Amount in minor units (cents for a 2-decimal currency).
    pub amount: i64,
    pub currency: String,
    pub description: String,
    /// Opaque client-side payment token ("source").
    pub source: String,
}

#[async_trait]
pub trait ChargeClient: Send + Sync {
    /// Create the charge and return the processor's response verbatim.
    async fn create_charge(&self, req: ChargeRequest) -> anyhow::Result<serde_json::Value>;
}

pub struct HttpChargeClient {
    http: reqwest::Client,
    api_url: String,
    secret_key: String,
}

impl HttpChargeClient {
    pub fn new(cfg: &ChargeConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: cfg.api_url.clone(),
            secret_key: cfg.secret_key.clone(),
        }
    }
}

#[async_trait]
impl ChargeClient for HttpChargeClient {
    async fn create_charge(&self, req: ChargeRequest) -> anyhow::Result<serde_json::Value> {
        let params = [
            ("amount", req.amount.to_string()),
            ("currency", req.currency),
            ("description", req.description),
            ("source", req.source),
        ];

        let resp = self
            .http
            .post(&self.api_url)
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .context("charge request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp.json().await.context("charge response not json")?;
        if !status.is_success() {
            let msg = body
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .unwrap_or("charge rejected");
            anyhow::bail!("{}", msg);
        }
        Ok(body)
    }
}

/// Highest chargeable total, mirroring the offer price cap.
pub const MAX_CHARGE_TOTAL: f64 = 100_000.0;

/// Convert a price in major units to minor units, rounding to the nearest
/// cent. Assumes a 2-decimal-minor-unit currency. Non-finite or
/// out-of-range totals are rejected rather than saturated.
pub fn to_minor_units(total: f64) -> anyhow::Result<i64> {
    anyhow::ensure!(
        total.is_finite() && (0.0..=MAX_CHARGE_TOTAL).contains(&total),
        "total must be between 0 and {}",
        MAX_CHARGE_TOTAL
    );
    Ok((total * 100.0).round() as i64)
}
