//! Values produced by [`MailSession`](super::MailSession).

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::fingerprint::FolderFingerprint;
use crate::transport::{BodyPart, FetchResult, Flag, Headers};

/// Summary of one message in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    /// Folder the message lives in.
    pub folder: String,
    /// Sequence number at fetch time.
    pub seq: u32,
    /// Unique identifier.
    pub uid: u32,
    /// Size in octets.
    pub size: u32,
    /// Server arrival date.
    pub internal_date: Option<DateTime<FixedOffset>>,
    /// Flags.
    pub flags: Vec<Flag>,
    /// Header fields.
    pub headers: Headers,
    /// MIME structure, when fetched.
    pub body_structure: Option<BodyPart>,
    /// Other members of the thread this message anchors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub threads: Vec<u32>,
}

impl MessageSummary {
    /// Builds a summary from a fetch result.
    #[must_use]
    pub fn from_fetch(folder: &str, fetched: FetchResult) -> Self {
        Self {
            folder: folder.to_string(),
            seq: fetched.seq,
            uid: fetched.uid.unwrap_or_default(),
            size: fetched.size.unwrap_or_default(),
            internal_date: fetched.internal_date,
            flags: fetched.flags,
            headers: fetched.headers,
            body_structure: fetched.body_structure,
            threads: Vec::new(),
        }
    }

    /// `Subject:` header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("Subject")
    }

    /// `From:` header.
    #[must_use]
    pub fn from(&self) -> Option<&str> {
        self.headers.get("From")
    }

    /// `Message-ID:` header.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.headers.get("Message-ID")
    }

    /// Returns true if the message has been read.
    #[must_use]
    pub fn is_seen(&self) -> bool {
        self.flags.contains(&Flag::Seen)
    }

    /// Returns true if the message is flagged.
    #[must_use]
    pub fn is_flagged(&self) -> bool {
        self.flags.contains(&Flag::Flagged)
    }
}

/// A message that arrived since the caller last looked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    /// Folder.
    pub folder: String,
    /// UID.
    pub uid: u32,
    /// `Subject:` header.
    pub subject: Option<String>,
    /// `From:` header.
    pub from: Option<String>,
}

/// Status of one folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderInformation {
    /// Folder.
    pub folder: String,
    /// Current fingerprint.
    pub fingerprint: FolderFingerprint,
    /// Number of messages.
    pub message_count: u32,
    /// Number of unseen messages.
    pub unseen_count: u32,
    /// Next UID.
    pub uid_next: u32,
    /// Flags of the UIDs the caller asked about.
    pub flags: BTreeMap<u32, Vec<Flag>>,
    /// Messages that arrived since the caller's previous next UID.
    pub new_messages: Vec<NewMessage>,
}

/// A page of messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCollection {
    /// Folder.
    pub folder: String,
    /// Fingerprint at listing time.
    pub fingerprint: FolderFingerprint,
    /// Next UID at listing time.
    pub uid_next: u32,
    /// Requested offset.
    pub offset: usize,
    /// Requested limit.
    pub limit: usize,
    /// Search string as given.
    pub search: String,
    /// Number of messages in the folder.
    pub message_count: u32,
    /// Number of unseen messages in the folder.
    pub unseen_count: u32,
    /// Number of matches; the message count when not searching.
    pub search_count: usize,
    /// Messages that arrived since the caller's previous next UID.
    pub new_messages: Vec<NewMessage>,
    /// Messages on this page.
    pub messages: Vec<MessageSummary>,
}

/// Listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageListRequest {
    /// Folder.
    pub folder: String,
    /// Number of entries to skip.
    pub offset: usize,
    /// Page size.
    pub limit: usize,
    /// Search string.
    pub search: String,
    /// Next UID from the caller's previous listing.
    pub prev_uid_next: Option<u32>,
    /// Use server-side sort when available.
    pub use_sort: bool,
    /// Use server-side threads when available.
    pub use_threads: bool,
}

impl MessageListRequest {
    /// First page of `folder` with ten entries.
    #[must_use]
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            offset: 0,
            limit: 10,
            search: String::new(),
            prev_uid_next: None,
            use_sort: false,
            use_threads: false,
        }
    }

    /// Sets offset and limit.
    #[must_use]
    pub const fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// Sets the search string.
    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Sets the previous next UID for new-message detection.
    #[must_use]
    pub const fn prev_uid_next(mut self, uid_next: u32) -> Self {
        self.prev_uid_next = Some(uid_next);
        self
    }

    /// Requests server-side sorting.
    #[must_use]
    pub const fn sorted(mut self, use_sort: bool) -> Self {
        self.use_sort = use_sort;
        self
    }

    /// Requests server-side threading.
    #[must_use]
    pub const fn threaded(mut self, use_threads: bool) -> Self {
        self.use_threads = use_threads;
        self
    }
}

/// Thread membership of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadInfo {
    /// The other members of the thread.
    pub members: Vec<u32>,
    /// Summaries of those members.
    pub messages: Vec<MessageSummary>,
}

/// A single message with its display part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDetail {
    /// Summary fields.
    pub summary: MessageSummary,
    /// Part id of the fetched text part.
    pub text_part: Option<String>,
    /// Raw content of that part.
    pub text: Option<Vec<u8>>,
}
