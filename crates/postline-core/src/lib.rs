//! # postline-core
//!
//! Mailbox orchestration for postline.
//!
//! This crate provides:
//! - Folder trees built from flat listings, with natural ordering
//! - Message listing by sequence, search, server-side sort or threads
//! - A search query language compiled into server search criteria
//! - Thread compilation into anchor maps
//! - A listing cache keyed by folder fingerprints (in memory or `SQLite`)
//! - Message submission driven from configuration
//!
//! The mailbox protocol itself sits behind [`MailboxTransport`]; the
//! submission protocol lives in `postline-smtp`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
mod error;
pub mod fingerprint;
pub mod folder;
pub mod search;
pub mod service;
pub mod session;
pub mod thread;
pub mod transport;

pub use cache::{CacheKey, ListingCache, MemoryListingCache, SqliteListingCache};
pub use config::{Config, ListingConfig, Security, SmtpConfig};
pub use error::{Error, ErrorKind, Result};
pub use fingerprint::FolderFingerprint;
pub use folder::{Folder, FolderTree, build_tree};
pub use search::{SearchCriteria, SearchQueryBuilder};
pub use service::{OutgoingMessage, send_email};
pub use session::{
    FolderInformation, MailSession, MessageCollection, MessageDetail, MessageListRequest,
    MessageSummary, NewMessage, ThreadInfo,
};
pub use thread::{ThreadAnchorMap, ThreadMembers};
pub use transport::{Endpoint, MailboxTransport};
