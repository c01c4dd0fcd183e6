use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::MessagingProvider;
use crate::config::AppConfig;

const API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Longest body the Messages API accepts.
const MAX_BODY_CHARS: usize = 1600;

pub struct TwilioSmsProvider {
    account_sid: String,
    auth_token: String,
    from_number: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct MessageResource {
    sid: String,
    status: Option<String>,
}

impl TwilioSmsProvider {
    pub fn new(account_sid: String, auth_token: String, from_number: String) -> Self {
        Self {
            account_sid,
            auth_token,
            from_number,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.twilio_account_sid.clone(),
            config.twilio_auth_token.clone(),
            config.twilio_phone_number.clone(),
        )
    }

    /// Sending is skipped when credentials are missing, e.g. in local runs.
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }
}

/// Reduce a contact number to E.164 (`+` and digits).
pub fn normalize_phone(raw: &str) -> anyhow::Result<String> {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();

    let digits = compact
        .strip_prefix('+')
        .with_context(|| format!("phone number must include a country code: {raw}"))?;
    anyhow::ensure!(
        (8..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()),
        "not a valid phone number: {raw}"
    );
    Ok(compact)
}

fn clip_body(body: &str) -> &str {
    match body.char_indices().nth(MAX_BODY_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[async_trait]
impl MessagingProvider for TwilioSmsProvider {
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()> {
        if !self.is_configured() {
            tracing::debug!(to = %to, "SMS provider not configured, dropping message");
            return Ok(());
        }
        let to = normalize_phone(to)?;

        let url = format!("{API_BASE}/Accounts/{}/Messages.json", self.account_sid);
        let message: MessageResource = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to.as_str()), ("From", &self.from_number), ("Body", clip_body(body))])
            .send()
            .await
            .context("failed to send Twilio SMS")?
            .error_for_status()
            .context("Twilio API returned error")?
            .json()
            .await
            .context("failed to parse Twilio response")?;

        tracing::debug!(sid = %message.sid, status = ?message.status, "SMS queued");
        Ok(())
    }
}
