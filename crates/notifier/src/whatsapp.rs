use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use common::{config::TwilioConfig, Error, Result};

use crate::MessageChannel;

const BASE_URL: &str = "https://api.twilio.com/2010-04-01";

/// WhatsApp delivery through the Twilio Messages REST API.
pub struct WhatsAppChannel {
    account_sid: String,
    auth_token: String,
    from: String,
    base_url: String,
    http: Client,
}

impl WhatsAppChannel {
    pub fn new(cfg: &TwilioConfig, timeout: Duration) -> Result<Self> {
        Self::with_base_url(cfg, timeout, BASE_URL)
    }

    /// Point the client at a different API root.
    pub fn with_base_url(
        cfg: &TwilioConfig,
        timeout: Duration,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            account_sid: cfg.account_sid.clone(),
            auth_token: cfg.auth_token.clone(),
            from: cfg.whatsapp_from.clone(),
            base_url: base_url.into(),
            http,
        })
    }
}

/// Twilio addresses WhatsApp numbers as `whatsapp:+<E.164>`.
fn whatsapp_address(number: &str) -> String {
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{number}")
    }
}

#[async_trait]
impl MessageChannel for WhatsAppChannel {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    async fn send(&self, destination: &str, text: &str) -> Result<()> {
        let url = format!(
            "{}/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );
        let from = whatsapp_address(&self.from);
        let to = whatsapp_address(destination);
        let form = [("From", from.as_str()), ("To", to.as_str()), ("Body", text)];

        debug!(to = %to, "Sending WhatsApp message");
        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<TwilioError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        Err(Error::Messaging(format!("whatsapp: HTTP {status}: {detail}")))
    }
}

#[derive(Deserialize)]
struct TwilioError {
    message: String,
}
