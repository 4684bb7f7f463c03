//! Outbound email to ordinary mailboxes through SendGrid.

pub mod sendgrid;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub use sendgrid::SendGridRelay;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("SendGrid API key not configured")]
    NotConfigured,

    #[error("Missing required fields")]
    MissingFields,

    #[error("Invalid subject")]
    InvalidSubject,

    #[error("Failed to send email")]
    Upstream { status: Option<u16>, details: String },
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Upstream {
            status: e.status().map(|s| s.as_u16()),
            details: e.to_string(),
        }
    }
}

/// A mailbox, written either as a bare address or `{email, name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Mailbox {
    Address(String),
    Named {
        email: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl Mailbox {
    pub fn email(&self) -> &str {
        match self {
            Mailbox::Address(email) => email,
            Mailbox::Named { email, .. } => email,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Mailbox::Address(_) => None,
            Mailbox::Named { name, .. } => name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(Mailbox),
    Many(Vec<Mailbox>),
}

impl Recipients {
    pub fn into_vec(self) -> Vec<Mailbox> {
        match self {
            Recipients::One(m) => vec![m],
            Recipients::Many(list) => list,
        }
    }
}

/// Body of `POST /api/sendgrid/send` as clients send it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    pub to: Option<Recipients>,
    pub from: Option<Mailbox>,
    pub subject: Option<serde_json::Value>,
    pub text: Option<String>,
    pub html: Option<String>,
    pub reply_to: Option<Mailbox>,
}

/// A validated message ready for the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: Vec<Mailbox>,
    pub from: Mailbox,
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
    pub reply_to: Option<Mailbox>,
}

/// Drop control characters and angle brackets, then trim.
pub fn sanitize_subject(subject: &str) -> String {
    subject
        .chars()
        .filter(|c| !c.is_control() && *c != '<' && *c != '>')
        .collect::<String>()
        .trim()
        .to_string()
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl TryFrom<RelayRequest> for OutboundEmail {
    type Error = RelayError;

    fn try_from(req: RelayRequest) -> Result<Self, Self::Error> {
        let to: Vec<Mailbox> = req
            .to
            .map(Recipients::into_vec)
            .unwrap_or_default()
            .into_iter()
            .filter(|m| !m.email().trim().is_empty())
            .collect();
        let from = req.from.filter(|m| !m.email().trim().is_empty());
        let subject = match req.subject {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) if s.is_empty() => None,
            Some(other) => Some(other),
        };

        let (Some(from), Some(subject)) = (from, subject) else {
            return Err(RelayError::MissingFields);
        };
        if to.is_empty() || !(present(&req.text) || present(&req.html)) {
            return Err(RelayError::MissingFields);
        }

        let subject = match subject {
            serde_json::Value::String(s) if !s.trim().is_empty() => sanitize_subject(&s),
            _ => return Err(RelayError::InvalidSubject),
        };
        if subject.is_empty() {
            return Err(RelayError::InvalidSubject);
        }

        Ok(OutboundEmail {
            to,
            from,
            subject,
            text: req.text.filter(|t| !t.is_empty()),
            html: req.html.filter(|h| !h.is_empty()),
            reply_to: req.reply_to,
        })
    }
}

#[async_trait]
pub trait MailRelay: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn send(&self, email: &OutboundEmail) -> Result<(), RelayError>;
}

pub type SharedRelay = Arc<dyn MailRelay>;

/// Validate and deliver a client request.
pub async fn relay_email(relay: &dyn MailRelay, request: RelayRequest) -> Result<(), RelayError> {
    if !relay.is_configured() {
        return Err(RelayError::NotConfigured);
    }
    let email = OutboundEmail::try_from(request)?;
    relay.send(&email).await?;
    tracing::info!(
        to = %email.to.iter().map(Mailbox::email).collect::<Vec<_>>().join(","),
        "Relayed email"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: serde_json::Value) -> RelayRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_sanitize_subject() {
        assert_eq!(sanitize_subject("  Hello <b>World</b>\u{0007} "), "Hello bWorld/b");
        assert_eq!(sanitize_subject("Line\r\nBreak"), "LineBreak");
    }

    #[test]
    fn test_valid_request() {
        let email = OutboundEmail::try_from(request(json!({
            "to": "bob@example.com",
            "from": {"email": "alice@dexmail.app", "name": "Alice"},
            "subject": "Hi <there>",
            "text": "hello",
            "replyTo": "alice@dexmail.app"
        })))
        .unwrap();
        assert_eq!(email.to, vec![Mailbox::Address("bob@example.com".to_string())]);
        assert_eq!(email.from.name(), Some("Alice"));
        assert_eq!(email.subject, "Hi there");
        assert!(email.html.is_none());
    }

    #[test]
    fn test_missing_fields() {
        let cases = [
            json!({"from": "a@x.io", "subject": "s", "text": "t"}),
            json!({"to": "b@x.io", "subject": "s", "text": "t"}),
            json!({"to": "b@x.io", "from": "a@x.io", "text": "t"}),
            json!({"to": "b@x.io", "from": "a@x.io", "subject": "s"}),
            json!({"to": ["b@x.io"], "from": "a@x.io", "subject": "", "html": "<p>t</p>"}),
        ];
        for case in cases {
            assert!(matches!(
                OutboundEmail::try_from(request(case)),
                Err(RelayError::MissingFields)
            ));
        }
    }

    #[test]
    fn test_invalid_subject() {
        for subject in [json!("   "), json!(42), json!("<>")] {
            let result = OutboundEmail::try_from(request(json!({
                "to": "b@x.io", "from": "a@x.io", "subject": subject, "text": "t"
            })));
            assert!(matches!(result, Err(RelayError::InvalidSubject)));
        }
    }
}
