//! SendGrid v3 `mail/send` client.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::SendGridConfig;
use crate::relay::{Mailbox, MailRelay, OutboundEmail, RelayError};

#[derive(Clone)]
pub struct SendGridRelay {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl SendGridRelay {
    pub fn new(config: &SendGridConfig, api_key: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        if api_key.is_none() {
            tracing::warn!("SendGrid API key is not set");
        }
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

fn mailbox_json(mailbox: &Mailbox) -> Value {
    match mailbox.name() {
        Some(name) => json!({ "email": mailbox.email(), "name": name }),
        None => json!({ "email": mailbox.email() }),
    }
}

/// Provider payload with sender headers set and all tracking off.
pub fn payload(email: &OutboundEmail) -> Value {
    let mut content = Vec::new();
    if let Some(text) = &email.text {
        content.push(json!({ "type": "text/plain", "value": text }));
    }
    if let Some(html) = email.html.as_ref().or(email.text.as_ref()) {
        content.push(json!({ "type": "text/html", "value": html }));
    }

    let sender = email.from.email();
    let mut body = json!({
        "personalizations": [{
            "to": email.to.iter().map(mailbox_json).collect::<Vec<_>>(),
        }],
        "from": mailbox_json(&email.from),
        "subject": email.subject,
        "content": content,
        "headers": {
            "Sender": sender,
            "X-Original-Sender": sender,
            "Precedence": "normal",
        },
        "tracking_settings": {
            "click_tracking": { "enable": false, "enable_text": false },
            "open_tracking": { "enable": false },
            "subscription_tracking": { "enable": false },
        },
    });
    if let Some(reply_to) = &email.reply_to {
        body["reply_to"] = mailbox_json(reply_to);
    }
    body
}

#[async_trait]
impl MailRelay for SendGridRelay {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn send(&self, email: &OutboundEmail) -> Result<(), RelayError> {
        let key = self.api_key.as_deref().ok_or(RelayError::NotConfigured)?;
        let response = self
            .client
            .post(format!("{}/v3/mail/send", self.api_url))
            .bearer_auth(key)
            .json(&payload(email))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, details = %details, "SendGrid rejected email");
            return Err(RelayError::Upstream {
                status: Some(status.as_u16()),
                details,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> OutboundEmail {
        OutboundEmail {
            to: vec![Mailbox::Address("bob@example.com".to_string())],
            from: Mailbox::Named {
                email: "alice@dexmail.app".to_string(),
                name: Some("Alice".to_string()),
            },
            subject: "Hello".to_string(),
            text: Some("plain".to_string()),
            html: None,
            reply_to: None,
        }
    }

    #[test]
    fn test_payload_shape() {
        let body = payload(&email());
        assert_eq!(body["personalizations"][0]["to"][0]["email"], "bob@example.com");
        assert_eq!(body["from"]["name"], "Alice");
        assert_eq!(body["headers"]["Sender"], "alice@dexmail.app");
        assert_eq!(body["headers"]["X-Original-Sender"], "alice@dexmail.app");
        assert_eq!(body["headers"]["Precedence"], "normal");
        assert_eq!(body["tracking_settings"]["open_tracking"]["enable"], false);
        // html falls back to the text body
        assert_eq!(body["content"][1]["type"], "text/html");
        assert_eq!(body["content"][1]["value"], "plain");
        assert!(body.get("reply_to").is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_relay() {
        let relay = SendGridRelay::new(&SendGridConfig::default(), None, Duration::from_secs(1)).unwrap();
        assert!(!relay.is_configured());
        assert!(matches!(relay.send(&email()).await, Err(RelayError::NotConfigured)));
    }
}
