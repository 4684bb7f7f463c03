use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::claim::{ClaimTicket, CryptoAsset};
use crate::mail::thread::{AttachmentNotice, Segment};

/// Subject shown when a message's content cannot be fetched.
pub const UNAVAILABLE_SUBJECT: &str = "(content unavailable)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Folder {
    #[default]
    Inbox,
    Archive,
    Spam,
    Trash,
}

/// Per-user state for one message. Local to this service, never on-chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailFlags {
    pub read: bool,
    pub starred: bool,
    pub folder: Folder,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum FlagAction {
    MarkRead,
    MarkUnread,
    Star,
    Unstar,
    Archive,
    Spam,
    Trash,
    Restore,
    AddLabel { label: String },
    RemoveLabel { label: String },
}

impl MailFlags {
    pub fn apply(&mut self, action: &FlagAction) {
        match action {
            FlagAction::MarkRead => self.read = true,
            FlagAction::MarkUnread => self.read = false,
            FlagAction::Star => self.starred = true,
            FlagAction::Unstar => self.starred = false,
            FlagAction::Archive => self.folder = Folder::Archive,
            FlagAction::Spam => self.folder = Folder::Spam,
            FlagAction::Trash => self.folder = Folder::Trash,
            FlagAction::Restore => self.folder = Folder::Inbox,
            FlagAction::AddLabel { label } => {
                let label = label.trim();
                if !label.is_empty() && !self.labels.iter().any(|l| l == label) {
                    self.labels.push(label.to_string());
                }
            }
            FlagAction::RemoveLabel { label } => self.labels.retain(|l| l != label.trim()),
        }
    }
}

/// Named listing over a user's messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderView {
    Inbox,
    Starred,
    Read,
    Archive,
    Spam,
    Trash,
}

impl FolderView {
    pub fn matches(&self, flags: &MailFlags) -> bool {
        match self {
            FolderView::Inbox => flags.folder == Folder::Inbox,
            FolderView::Starred => flags.starred && flags.folder != Folder::Trash,
            FolderView::Read => flags.read && flags.folder != Folder::Trash,
            FolderView::Archive => flags.folder == Folder::Archive,
            FolderView::Spam => flags.folder == Folder::Spam,
            FolderView::Trash => flags.folder == Folder::Trash,
        }
    }
}

impl FromStr for FolderView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inbox" => Ok(FolderView::Inbox),
            "starred" => Ok(FolderView::Starred),
            "read" => Ok(FolderView::Read),
            "archive" => Ok(FolderView::Archive),
            "spam" => Ok(FolderView::Spam),
            "trash" => Ok(FolderView::Trash),
            other => Err(format!("Unknown folder: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoTransfer {
    pub enabled: bool,
    pub assets: Vec<CryptoAsset>,
}

/// The JSON document pinned to IPFS for every message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoredMail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub in_reply_to: Option<String>,
    pub crypto_transfer: Option<CryptoTransfer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SendEmailData {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub in_reply_to: Option<String>,
    pub crypto_transfer: Option<CryptoTransfer>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    /// Hash of the first indexing transaction; empty with no recipients.
    pub message_id: String,
    pub cid: String,
    /// The `bytes32` content key stored on-chain.
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim: Option<ClaimTicket>,
}

/// A message as the sender's log remembers it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMail {
    pub message_id: String,
    pub cid: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub has_crypto_transfer: bool,
    pub in_reply_to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailMessage {
    pub message_id: String,
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub has_crypto_transfer: bool,
    pub ipfs_cid: Option<String>,
    pub in_reply_to: Option<String>,
    pub content_available: bool,
    #[serde(flatten)]
    pub flags: MailFlags,
}

/// A single message with its thread broken out for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDetail {
    #[serde(flatten)]
    pub message: MailMessage,
    pub segments: Vec<Segment>,
    pub attachment_notice: AttachmentNotice,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub success: bool,
    pub message_id: String,
}
