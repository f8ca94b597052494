//! WhatsApp carrier: outbound sends via the Twilio Messages API.

use crate::channels::CarrierHandle;
use crate::compose::truncate_reply;
use async_trait::async_trait;
use serde::Deserialize;

const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Twilio sandbox sender used when no number is configured.
const DEFAULT_FROM_NUMBER: &str = "whatsapp:+14155238886";

/// Hard WhatsApp body limit; bodies are clamped before the API call.
const MAX_BODY_CHARS: usize = 1600;

#[derive(Debug, Deserialize)]
struct MessageCreatedResponse {
    #[serde(default)]
    sid: String,
}

/// WhatsApp carrier connector: sends messages via Twilio's Messages endpoint.
pub struct WhatsAppChannel {
    id: String,
    account_sid: Option<String>,
    auth_token: Option<String>,
    from_number: String,
    base_url: String,
    client: reqwest::Client,
}

impl WhatsAppChannel {
    pub fn new(
        account_sid: Option<String>,
        auth_token: Option<String>,
        from_number: Option<String>,
        base_url: Option<String>,
    ) -> Self {
        Self {
            id: "whatsapp".to_string(),
            account_sid,
            auth_token,
            from_number: from_number.unwrap_or_else(|| DEFAULT_FROM_NUMBER.to_string()),
            base_url: base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| TWILIO_API_BASE.to_string()),
            client: reqwest::Client::new(),
        }
    }

    /// Send a WhatsApp message via POST Accounts/{sid}/Messages.json. Returns the
    /// message SID on success.
    pub async fn send_message(&self, to: &str, body: &str) -> Result<String, String> {
        let account_sid = self
            .account_sid
            .as_ref()
            .ok_or("twilio account sid not configured")?;
        let auth_token = self
            .auth_token
            .as_ref()
            .ok_or("twilio auth token not configured")?;
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, account_sid
        );
        let body = truncate_reply(body, MAX_BODY_CHARS);
        let params = [
            ("From", normalize_number(&self.from_number)),
            ("To", normalize_number(to)),
            ("Body", body),
        ];
        let res = self
            .client
            .post(&url)
            .basic_auth(account_sid, Some(auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("message create failed: {} {}", status, body));
        }
        let data: MessageCreatedResponse = res.json().await.map_err(|e| e.to_string())?;
        Ok(data.sid)
    }
}

#[async_trait]
impl CarrierHandle for WhatsAppChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send_message(&self, to: &str, body: &str) -> Result<(), String> {
        WhatsAppChannel::send_message(self, to, body).await.map(|_| ())
    }
}

/// Twilio expects WhatsApp addresses as "whatsapp:+<number>".
fn normalize_number(number: &str) -> String {
    let n = number.trim();
    if n.starts_with("whatsapp:") {
        n.to_string()
    } else {
        format!("whatsapp:{}", n)
    }
}
