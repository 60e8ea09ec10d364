//! Values exchanged with a mailbox transport.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Message flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    /// Message has been read.
    Seen,
    /// Message has been answered.
    Answered,
    /// Message is flagged for special attention.
    Flagged,
    /// Message is marked for deletion.
    Deleted,
    /// Message is a draft.
    Draft,
    /// Message is recent (first session to see it).
    Recent,
    /// Custom keyword flag, or `\*` in a permanent-flags list.
    Keyword(String),
}

impl Flag {
    /// Parses a flag string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "\\SEEN" => Self::Seen,
            "\\ANSWERED" => Self::Answered,
            "\\FLAGGED" => Self::Flagged,
            "\\DELETED" => Self::Deleted,
            "\\DRAFT" => Self::Draft,
            "\\RECENT" => Self::Recent,
            _ => Self::Keyword(s.to_string()),
        }
    }

    /// Returns the flag as it appears on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Seen => "\\Seen",
            Self::Answered => "\\Answered",
            Self::Flagged => "\\Flagged",
            Self::Deleted => "\\Deleted",
            Self::Draft => "\\Draft",
            Self::Recent => "\\Recent",
            Self::Keyword(s) => s,
        }
    }

    /// Returns true for the `\*` marker that allows new keywords.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Keyword(k) if k == "\\*")
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of message numbers or UIDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSet {
    /// Explicit identifiers, in caller order.
    List(Vec<u32>),
    /// From the given identifier to the highest one (`n:*`).
    From(u32),
    /// Every message (`1:*`).
    All,
}

impl IdSet {
    /// Returns true if the set names no identifier at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::List(ids) if ids.is_empty())
    }
}

impl From<&[u32]> for IdSet {
    fn from(ids: &[u32]) -> Self {
        Self::List(ids.to_vec())
    }
}

impl fmt::Display for IdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(ids) => {
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{id}")?;
                }
                Ok(())
            }
            Self::From(start) => write!(f, "{start}:*"),
            Self::All => f.write_str("1:*"),
        }
    }
}

/// Items that can be requested in a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// Unique identifier.
    Uid,
    /// Flags.
    Flags,
    /// Message size in octets.
    Rfc822Size,
    /// Server arrival date.
    InternalDate,
    /// MIME structure.
    BodyStructure,
    /// All header fields, without setting `\Seen`.
    Header,
    /// Selected header fields, without setting `\Seen`.
    HeaderFields(Vec<String>),
    /// One body part by part id, without setting `\Seen`.
    BodyPeek(String),
}

/// Store modes used by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAction {
    /// `+FLAGS.SILENT`
    AddSilent,
    /// `-FLAGS.SILENT`
    RemoveSilent,
}

/// Server-side sort keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Internal date.
    Arrival,
    /// `Date:` header.
    Date,
    /// Base subject.
    Subject,
    /// Size.
    Size,
    /// Descending modifier for the following key.
    Reverse,
}

impl SortKey {
    /// Wire name of the key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arrival => "ARRIVAL",
            Self::Date => "DATE",
            Self::Subject => "SUBJECT",
            Self::Size => "SIZE",
            Self::Reverse => "REVERSE",
        }
    }
}

/// Server-side threading algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadAlgorithm {
    /// `THREAD=REFERENCES`
    References,
    /// `THREAD=ORDEREDSUBJECT`
    OrderedSubject,
}

impl ThreadAlgorithm {
    /// Capability name that advertises the algorithm.
    #[must_use]
    pub const fn capability(self) -> &'static str {
        match self {
            Self::References => "THREAD=REFERENCES",
            Self::OrderedSubject => "THREAD=ORDEREDSUBJECT",
        }
    }
}

/// One element of a thread response.
///
/// Each level is read in protocol order; a branch holds a reply subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadNode {
    /// A message identifier.
    Id(u32),
    /// A nested subtree.
    Branch(Vec<ThreadNode>),
}

/// Fields requested in a status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusField {
    /// Number of messages.
    Messages,
    /// Number of messages without `\Seen`.
    Unseen,
    /// Next UID to be assigned.
    UidNext,
    /// UID validity.
    UidValidity,
}

/// Result of a status query. Fields not requested stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderStatus {
    /// Number of messages.
    pub messages: Option<u32>,
    /// Number of unseen messages.
    pub unseen: Option<u32>,
    /// Next UID.
    pub uid_next: Option<u32>,
    /// UID validity.
    pub uid_validity: Option<u32>,
}

/// State reported when a folder is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedFolder {
    /// Number of messages.
    pub exists: u32,
    /// Number of recent messages.
    pub recent: u32,
    /// Flags the client may change permanently.
    pub permanent_flags: Vec<Flag>,
    /// Next UID, if reported.
    pub uid_next: Option<u32>,
    /// True when selected read-only.
    pub read_only: bool,
}

impl SelectedFolder {
    /// Returns true if `flag` may be stored permanently.
    #[must_use]
    pub fn allows_flag(&self, flag: &Flag) -> bool {
        self.permanent_flags
            .iter()
            .any(|f| f == flag || f.is_wildcard())
    }
}

/// One entry of a folder listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFolder {
    /// Protocol-encoded full name.
    pub raw_name: String,
    /// Hierarchy delimiter; `None` for a flat namespace.
    pub delimiter: Option<char>,
    /// Name attributes such as `\Noselect`.
    pub attributes: Vec<String>,
}

impl ListedFolder {
    /// Creates a listing entry with no attributes.
    #[must_use]
    pub fn new(raw_name: impl Into<String>, delimiter: Option<char>) -> Self {
        Self {
            raw_name: raw_name.into(),
            delimiter,
            attributes: Vec::new(),
        }
    }
}

/// Storage quota of the current user, in kilobytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    /// Used storage.
    pub used: u64,
    /// Storage limit.
    pub limit: u64,
}

/// Parsed header fields in message order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// Creates an empty header list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a field.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Builder form of [`Headers::push`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// First value of a field, matched case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if no field is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// A node of a message's MIME structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyPart {
    /// Part id (`1`, `1.2`, ...).
    pub part_id: String,
    /// Lowercase `type/subtype`.
    pub mime_type: String,
    /// Content disposition, if any.
    pub disposition: Option<String>,
    /// Size in octets.
    pub size: u32,
    /// Sub-parts of a multipart.
    #[serde(default)]
    pub children: Vec<BodyPart>,
}

impl BodyPart {
    /// Creates a leaf part.
    #[must_use]
    pub fn leaf(part_id: impl Into<String>, mime_type: impl Into<String>, size: u32) -> Self {
        Self {
            part_id: part_id.into(),
            mime_type: mime_type.into().to_ascii_lowercase(),
            disposition: None,
            size,
            children: Vec::new(),
        }
    }

    /// Creates a multipart node.
    #[must_use]
    pub fn multipart(
        part_id: impl Into<String>,
        mime_type: impl Into<String>,
        children: Vec<Self>,
    ) -> Self {
        Self {
            part_id: part_id.into(),
            mime_type: mime_type.into().to_ascii_lowercase(),
            disposition: None,
            size: 0,
            children,
        }
    }

    /// Sets the content disposition.
    #[must_use]
    pub fn with_disposition(mut self, disposition: impl Into<String>) -> Self {
        self.disposition = Some(disposition.into());
        self
    }

    /// Returns true for parts marked as attachments.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.disposition
            .as_deref()
            .is_some_and(|d| d.eq_ignore_ascii_case("attachment"))
    }

    /// Picks the part to display: the first inline HTML part, else the
    /// first inline plain-text part.
    #[must_use]
    pub fn preferred_text_part(&self) -> Option<&Self> {
        self.find_inline("text/html")
            .or_else(|| self.find_inline("text/plain"))
    }

    fn find_inline(&self, mime_type: &str) -> Option<&Self> {
        if self.children.is_empty() {
            return (self.mime_type == mime_type && !self.is_attachment()).then_some(self);
        }
        self.children.iter().find_map(|c| c.find_inline(mime_type))
    }
}

/// One message in a fetch response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResult {
    /// Sequence number.
    pub seq: u32,
    /// UID, if requested.
    pub uid: Option<u32>,
    /// Flags, if requested.
    pub flags: Vec<Flag>,
    /// Size, if requested.
    pub size: Option<u32>,
    /// Internal date, if requested.
    pub internal_date: Option<DateTime<FixedOffset>>,
    /// Header fields, if requested.
    pub headers: Headers,
    /// MIME structure, if requested.
    pub body_structure: Option<BodyPart>,
    /// Body part contents, if requested.
    pub body: Option<Vec<u8>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn flag_parse_round_trip() {
        assert_eq!(Flag::parse("\\seen"), Flag::Seen);
        assert_eq!(Flag::parse("$Label1"), Flag::Keyword("$Label1".into()));
        assert_eq!(Flag::Flagged.to_string(), "\\Flagged");
        assert!(Flag::parse("\\*").is_wildcard());
    }

    #[test]
    fn id_set_display() {
        assert_eq!(IdSet::List(vec![4, 2, 9]).to_string(), "4,2,9");
        assert_eq!(IdSet::From(120).to_string(), "120:*");
        assert_eq!(IdSet::All.to_string(), "1:*");
        assert!(IdSet::List(Vec::new()).is_empty());
    }

    #[test]
    fn permanent_flags_wildcard() {
        let folder = SelectedFolder {
            permanent_flags: vec![Flag::Seen, Flag::Keyword("\\*".into())],
            ..SelectedFolder::default()
        };
        assert!(folder.allows_flag(&Flag::Seen));
        assert!(folder.allows_flag(&Flag::Keyword("$Work".into())));

        let strict = SelectedFolder {
            permanent_flags: vec![Flag::Seen],
            ..SelectedFolder::default()
        };
        assert!(!strict.allows_flag(&Flag::Flagged));
    }

    #[test]
    fn headers_lookup_is_case_insensitive() {
        let headers = Headers::new()
            .with("Subject", "Hello")
            .with("Message-ID", "<a@b>");
        assert_eq!(headers.get("subject"), Some("Hello"));
        assert_eq!(headers.get("MESSAGE-ID"), Some("<a@b>"));
        assert_eq!(headers.get("From"), None);
    }

    #[test]
    fn preferred_part_prefers_html() {
        let structure = BodyPart::multipart(
            "",
            "multipart/mixed",
            vec![
                BodyPart::multipart(
                    "1",
                    "multipart/alternative",
                    vec![
                        BodyPart::leaf("1.1", "text/plain", 10),
                        BodyPart::leaf("1.2", "TEXT/HTML", 20),
                    ],
                ),
                BodyPart::leaf("2", "text/html", 30).with_disposition("attachment"),
            ],
        );
        assert_eq!(structure.preferred_text_part().unwrap().part_id, "1.2");
    }

    #[test]
    fn preferred_part_falls_back_to_plain() {
        let structure = BodyPart::multipart(
            "",
            "multipart/mixed",
            vec![
                BodyPart::leaf("1", "text/plain", 10),
                BodyPart::leaf("2", "text/html", 30).with_disposition("Attachment"),
            ],
        );
        assert_eq!(structure.preferred_text_part().unwrap().part_id, "1");

        let image = BodyPart::leaf("1", "image/png", 99);
        assert!(image.preferred_text_part().is_none());
    }
}
