//! Folder hierarchy.

mod natural;
mod tree;

pub use natural::natural_cmp;
pub use tree::{FolderTree, build_tree};

use serde::{Deserialize, Serialize};
use utf7_imap::{decode_utf7_imap, encode_utf7_imap};

use crate::transport::ListedFolder;

/// Canonical name of the inbox.
pub const INBOX: &str = "INBOX";

/// Well-known provider root that is listed right after the inbox.
pub const PROVIDER_ROOT: &str = "[GMAIL]";

/// A folder in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Protocol-encoded full name.
    pub raw_name: String,
    /// Decoded full name.
    pub full_name: String,
    /// Decoded last segment of the name.
    pub name: String,
    /// Hierarchy delimiter; `None` for a flat namespace.
    pub delimiter: Option<char>,
    /// Whether the user is subscribed.
    pub subscribed: bool,
    /// False for a placeholder standing in for a missing hierarchy level.
    pub exists: bool,
    /// Whether the folder can be selected.
    pub selectable: bool,
    /// Name attributes as listed.
    pub attributes: Vec<String>,
    /// Child folders, in display order.
    pub children: Vec<Folder>,
}

impl Folder {
    /// Creates a folder from a listing entry.
    #[must_use]
    pub fn from_listing(listed: ListedFolder, subscribed: bool) -> Self {
        let selectable = !listed
            .attributes
            .iter()
            .any(|a| a.eq_ignore_ascii_case("\\Noselect") || a.eq_ignore_ascii_case("\\NonExistent"));
        let mut folder = Self::named(listed.raw_name, listed.delimiter);
        folder.subscribed = subscribed;
        folder.selectable = selectable;
        folder.attributes = listed.attributes;
        folder
    }

    /// Creates a placeholder for a hierarchy level the listing omitted.
    #[must_use]
    pub fn placeholder(raw_name: impl Into<String>, delimiter: Option<char>) -> Self {
        let mut folder = Self::named(raw_name.into(), delimiter);
        folder.exists = false;
        folder.selectable = false;
        folder
    }

    fn named(raw_name: String, delimiter: Option<char>) -> Self {
        let full_name = decode_name(&raw_name);
        let name = match delimiter {
            Some(d) => full_name
                .rsplit(d)
                .next()
                .unwrap_or(&full_name)
                .to_string(),
            None => full_name.clone(),
        };
        Self {
            raw_name,
            full_name,
            name,
            delimiter,
            subscribed: false,
            exists: true,
            selectable: true,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Returns true if this is the inbox.
    #[must_use]
    pub fn is_inbox(&self) -> bool {
        self.raw_name.eq_ignore_ascii_case(INBOX)
    }

    /// Returns true if the folder has children.
    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Returns true if `raw_name` lies strictly below this folder.
    #[must_use]
    pub fn contains(&self, raw_name: &str) -> bool {
        self.delimiter.is_some_and(|d| {
            raw_name
                .strip_prefix(self.raw_name.as_str())
                .is_some_and(|rest| rest.starts_with(d))
        })
    }
}

/// Decodes a modified UTF-7 folder name for display.
#[must_use]
pub fn decode_name(raw: &str) -> String {
    if raw.contains('&') {
        decode_utf7_imap(raw.to_string())
    } else {
        raw.to_string()
    }
}

/// Encodes a display name to modified UTF-7.
#[must_use]
pub fn encode_name(name: &str) -> String {
    encode_utf7_imap(name.to_string())
}
