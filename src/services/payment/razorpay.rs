use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::{signature, OrderRequest, PaymentGateway, ProviderOrder};

pub struct RazorpayGateway {
    api_url: String,
    key_id: String,
    key_secret: String,
    webhook_secret: String,
    client: reqwest::Client,
}

impl RazorpayGateway {
    pub fn new(api_url: String, key_id: String, key_secret: String, webhook_secret: String) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            key_id,
            key_secret,
            webhook_secret,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn create_order(&self, request: &OrderRequest) -> anyhow::Result<ProviderOrder> {
        let body = json!({
            "amount": request.amount_minor,
            "currency": request.currency,
            "receipt": request.receipt,
            "notes": request.notes,
        });

        let resp = self
            .client
            .post(format!("{}/orders", self.api_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .context("failed to call payment API")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse payment API response")?;

        if !status.is_success() {
            anyhow::bail!("payment API error ({}): {}", status, data);
        }

        let order_id = data["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing order id in payment API response"))?;

        Ok(ProviderOrder {
            order_id,
            amount_minor: data["amount"].as_i64().unwrap_or(request.amount_minor),
            currency: data["currency"]
                .as_str()
                .unwrap_or(&request.currency)
                .to_string(),
        })
    }

    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, sig: &str) -> bool {
        signature::verify_payment_signature(&self.key_secret, order_id, payment_id, sig)
    }

    fn verify_webhook_signature(&self, body: &[u8], sig: &str) -> bool {
        signature::verify_webhook_signature(&self.webhook_secret, body, sig)
    }
}
