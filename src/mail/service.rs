use alloy::primitives::B256;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;

use crate::auth::{is_valid_email, normalize_email};
use crate::blockchain::{IndexedMail, SharedMailer};
use crate::claim::{format_assets_for_display, ClaimRecord, ClaimService, ClaimTicket};
use crate::ipfs::{CidRegistry, SharedContentStore};
use crate::mail::thread::{self, attachment_notice, split_segments};
use crate::mail::{
    DeleteResponse, FlagAction, FolderView, MailError, MailFlags, MailMessage, MessageDetail,
    SendEmailData, SendEmailResponse, SentMail, StoredMail, UNAVAILABLE_SUBJECT,
};
use crate::storage::{JsonStore, StoreError};

/// Text appended to a recipient's copy when assets are waiting for them.
fn claim_notice(record: &ClaimRecord, ticket: &ClaimTicket) -> String {
    let assets = format_assets_for_display(&record.assets).join(", ");
    let days = (record.expires_at - record.created_at).num_days();
    format!(
        "\n\n---\nYou have received crypto assets: {}\nYour Claim Code: {} {}\nClaim them at {}\nThis claim expires in {} days.",
        if assets.is_empty() { "see attachment" } else { &assets },
        &ticket.code[..3],
        &ticket.code[3..],
        ticket.claim_url,
        days
    )
}

#[derive(Clone)]
pub struct MailService {
    mailer: SharedMailer,
    content: SharedContentStore,
    registry: CidRegistry,
    claims: ClaimService,
    flags: JsonStore<(String, u64), MailFlags>,
    sent: JsonStore<String, Vec<SentMail>>,
}

impl MailService {
    pub fn new(
        mailer: SharedMailer,
        content: SharedContentStore,
        registry: CidRegistry,
        claims: ClaimService,
        flags: JsonStore<(String, u64), MailFlags>,
        sent: JsonStore<String, Vec<SentMail>>,
    ) -> Self {
        Self {
            mailer,
            content,
            registry,
            claims,
            flags,
            sent,
        }
    }

    /// Pin a message and remember its CID under the on-chain key.
    async fn pin(&self, doc: &StoredMail, timestamp: DateTime<Utc>) -> Result<(String, B256), MailError> {
        let value = serde_json::to_value(doc)
            .map_err(|e| MailError::Upload(crate::ipfs::IpfsError::Malformed(e.to_string())))?;
        let cid = self
            .content
            .put_json(&format!("email-{}", timestamp.timestamp_millis()), &value)
            .await?;
        Ok((cid.clone(), self.registry.register(&cid)))
    }

    pub async fn send_email(&self, data: SendEmailData) -> Result<SendEmailResponse, MailError> {
        let from = normalize_email(&data.from);
        if !is_valid_email(&from) {
            return Err(MailError::InvalidSender(data.from));
        }
        let mut recipients = Vec::with_capacity(data.to.len());
        for to in &data.to {
            let to = normalize_email(to);
            if !is_valid_email(&to) {
                return Err(MailError::InvalidRecipient(to));
            }
            recipients.push(to);
        }

        let timestamp = Utc::now();
        let crypto = data.crypto_transfer.filter(|c| c.enabled);
        let has_crypto = crypto.is_some();
        let doc = StoredMail {
            from: from.clone(),
            to: recipients.clone(),
            subject: data.subject,
            body: data.body,
            timestamp: Some(timestamp),
            in_reply_to: data.in_reply_to,
            crypto_transfer: crypto.clone(),
        };

        let mut message_id = String::new();
        let mut first_claim = None;
        let (cid, key) = match crypto.as_ref().filter(|_| !recipients.is_empty()) {
            None => {
                let (cid, key) = self.pin(&doc, timestamp).await?;
                for recipient in &recipients {
                    let tx_hash = self.mailer.index_mail(recipient, key, false, has_crypto).await?;
                    tracing::info!(to = %recipient, tx_hash = %tx_hash, "Mail indexed");
                    if message_id.is_empty() {
                        message_id = tx_hash.to_string();
                    }
                }
                (cid, key)
            }
            Some(transfer) => {
                // Every recipient gets a copy carrying their own claim code.
                let mut first = None;
                for recipient in &recipients {
                    let record = self.claims.create_claim(recipient, transfer.assets.clone());
                    let ticket = self.claims.ticket(&record);
                    let mut copy = doc.clone();
                    copy.body.push_str(&claim_notice(&record, &ticket));

                    let delivered = match self.pin(&copy, timestamp).await {
                        Ok((cid, key)) => self
                            .mailer
                            .index_mail(recipient, key, false, true)
                            .await
                            .map(|tx_hash| (cid, key, tx_hash))
                            .map_err(MailError::from),
                        Err(e) => Err(e),
                    };
                    // A claim whose code never reached the recipient must not stay redeemable.
                    let (cid, key, tx_hash) =
                        delivered.inspect_err(|_| self.claims.discard_claim(&record.token))?;
                    tracing::info!(to = %recipient, tx_hash = %tx_hash, "Mail with assets indexed");

                    if first.is_none() {
                        message_id = tx_hash.to_string();
                        first_claim = Some(ticket);
                        first = Some((cid, key));
                    }
                }
                match first {
                    Some(first) => first,
                    None => self.pin(&doc, timestamp).await?,
                }
            }
        };

        self.sent.entry_or_default(from.clone()).push(SentMail {
            message_id: message_id.clone(),
            cid: cid.clone(),
            to: recipients,
            subject: doc.subject,
            body: doc.body,
            timestamp,
            has_crypto_transfer: has_crypto,
            in_reply_to: doc.in_reply_to,
        });
        tracing::info!(from = %from, cid = %cid, "Mail sent");

        Ok(SendEmailResponse {
            message_id,
            cid,
            key: key.to_string(),
            claim: first_claim,
        })
    }

    fn flags_for(&self, email: &str, id: u64) -> MailFlags {
        self.flags.get(&(email.to_string(), id)).unwrap_or_default()
    }

    /// Join an index record with its IPFS content and the user's flags.
    async fn reconcile(&self, email: &str, indexed: IndexedMail) -> MailMessage {
        let cid = self.registry.resolve(&indexed.cid_hash);
        let stored = match &cid {
            Some(cid) => match self.content.get_json(cid).await {
                Ok(Some(value)) => match serde_json::from_value::<StoredMail>(value) {
                    Ok(stored) => Some(stored),
                    Err(e) => {
                        tracing::warn!(id = indexed.id, cid = %cid, error = %e, "Unreadable mail content");
                        None
                    }
                },
                Ok(None) => {
                    tracing::warn!(id = indexed.id, cid = %cid, "Mail content missing from IPFS");
                    None
                }
                Err(e) => {
                    tracing::warn!(id = indexed.id, cid = %cid, error = %e, "IPFS fetch failed");
                    None
                }
            },
            None => {
                tracing::debug!(id = indexed.id, key = %indexed.cid_hash, "No CID registered for key");
                None
            }
        };

        let timestamp = DateTime::from_timestamp(indexed.timestamp as i64, 0).unwrap_or_default();
        let flags = self.flags_for(email, indexed.id);
        match stored {
            Some(stored) => MailMessage {
                message_id: indexed.id.to_string(),
                from: if stored.from.is_empty() { indexed.sender.to_string() } else { stored.from },
                to: if stored.to.is_empty() { vec![indexed.recipient_email] } else { stored.to },
                subject: stored.subject,
                body: stored.body,
                timestamp,
                has_crypto_transfer: indexed.has_crypto,
                ipfs_cid: cid,
                in_reply_to: stored.in_reply_to,
                content_available: true,
                flags,
            },
            None => MailMessage {
                message_id: indexed.id.to_string(),
                from: indexed.sender.to_string(),
                to: vec![indexed.recipient_email],
                subject: UNAVAILABLE_SUBJECT.to_string(),
                body: String::new(),
                timestamp,
                has_crypto_transfer: indexed.has_crypto,
                ipfs_cid: cid,
                in_reply_to: None,
                content_available: false,
                flags,
            },
        }
    }

    /// Every message indexed for `email`, newest first.
    ///
    /// Never fails: an unreachable chain yields an empty list and a single
    /// unreadable record is skipped.
    pub async fn get_inbox(&self, email: &str) -> Vec<MailMessage> {
        let email = normalize_email(email);
        let ids = match self.mailer.inbox_ids(&email).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(email = %email, error = %e, "Error fetching inbox");
                return Vec::new();
            }
        };

        let records = join_all(ids.iter().rev().map(|&id| self.mailer.mail(id))).await;
        let mut indexed = Vec::with_capacity(records.len());
        for (id, record) in ids.iter().rev().zip(records) {
            match record {
                Ok(record) => indexed.push(record),
                Err(e) => tracing::warn!(id, error = %e, "Skipping unreadable mail record"),
            }
        }

        join_all(indexed.into_iter().map(|record| self.reconcile(&email, record))).await
    }

    pub async fn list_folder(&self, email: &str, view: FolderView) -> Vec<MailMessage> {
        let mut messages = self.get_inbox(email).await;
        messages.retain(|m| view.matches(&m.flags));
        messages
    }

    pub async fn unread_count(&self, email: &str) -> usize {
        self.list_folder(email, FolderView::Inbox)
            .await
            .iter()
            .filter(|m| !m.flags.read)
            .count()
    }

    /// Messages this service sent on behalf of `email`, newest first.
    pub fn get_sent(&self, email: &str) -> Vec<MailMessage> {
        let email = normalize_email(email);
        let mut sent = self.sent.get(&email).unwrap_or_default();
        sent.reverse();
        sent.into_iter()
            .map(|s| MailMessage {
                message_id: s.message_id,
                from: email.clone(),
                to: s.to,
                subject: s.subject,
                body: s.body,
                timestamp: s.timestamp,
                has_crypto_transfer: s.has_crypto_transfer,
                ipfs_cid: Some(s.cid),
                in_reply_to: s.in_reply_to,
                content_available: true,
                flags: MailFlags {
                    read: true,
                    ..MailFlags::default()
                },
            })
            .collect()
    }

    /// One inbox message. Messages addressed to someone else are reported
    /// as not found.
    pub async fn get_message(&self, id: u64, email: &str) -> Result<MailMessage, MailError> {
        let email = normalize_email(email);
        let indexed = self.mailer.mail(id).await?;
        if indexed.recipient_email != email {
            return Err(MailError::NotFound(id));
        }
        Ok(self.reconcile(&email, indexed).await)
    }

    pub async fn get_message_detail(&self, id: u64, email: &str) -> Result<MessageDetail, MailError> {
        let message = self.get_message(id, email).await?;
        Ok(MessageDetail {
            segments: split_segments(&message.body),
            attachment_notice: attachment_notice(message.has_crypto_transfer, &message.body),
            message,
        })
    }

    pub fn apply_flag(&self, id: u64, email: &str, action: &FlagAction) -> MailFlags {
        let mut flags = self.flags.entry_or_default((normalize_email(email), id));
        flags.apply(action);
        flags.clone()
    }

    /// Deleting moves the message to trash; the chain index is append-only.
    pub fn delete_message(&self, id: u64, email: &str) -> DeleteResponse {
        self.apply_flag(id, email, &FlagAction::Trash);
        tracing::info!(id, email = %email, "Message moved to trash");
        DeleteResponse {
            success: true,
            message_id: id.to_string(),
        }
    }

    /// Reply to message `id` as `email`, quoting the original.
    pub async fn reply(&self, id: u64, email: &str, text: &str) -> Result<SendEmailResponse, MailError> {
        let original = self.get_message(id, email).await?;
        let data = SendEmailData {
            from: email.to_string(),
            to: vec![original.from.clone()],
            subject: thread::reply_subject(&original.subject),
            body: thread::reply_body(text, original.timestamp, &original.from, &original.body),
            in_reply_to: Some(original.message_id),
            crypto_transfer: None,
        };
        self.send_email(data).await
    }

    /// Forward message `id` as `email` to new recipients.
    pub async fn forward(&self, id: u64, email: &str, to: Vec<String>, note: &str) -> Result<SendEmailResponse, MailError> {
        let original = self.get_message(id, email).await?;
        let body = format!(
            "{}{}",
            note,
            thread::forward_body(
                &original.from,
                &original.from,
                original.timestamp,
                &original.subject,
                &original.body
            )
        );
        self.send_email(SendEmailData {
            from: email.to_string(),
            to,
            subject: thread::forward_subject(&original.subject),
            body,
            in_reply_to: None,
            crypto_transfer: None,
        })
        .await
    }

    pub fn save(&self) -> Result<(), StoreError> {
        self.flags.save()?;
        self.sent.save()?;
        self.registry.save()
    }
}
