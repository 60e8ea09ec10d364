//! The mailbox-access seam.
//!
//! [`MailSession`](crate::MailSession) never speaks the wire protocol
//! itself. It drives a [`MailboxTransport`], which owns one connection and
//! returns structured results. Commands run strictly one at a time; the
//! `&mut self` receivers enforce that no two are in flight.

mod types;

pub use types::{
    BodyPart, FetchItem, FetchResult, Flag, FolderStatus, Headers, IdSet, ListedFolder, Quota,
    SelectedFolder, SortKey, StatusField, StoreAction, ThreadAlgorithm, ThreadNode,
};

use std::future::Future;

use crate::Result;
use crate::search::SearchCriteria;

/// Connection identity used to scope cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Logged-in user.
    pub user: String,
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

/// An authenticated mailbox-access connection.
///
/// Failures are reported as [`Error`](crate::Error) values: a rejected
/// command as [`Error::NegativeReply`](crate::Error::NegativeReply), a
/// broken connection as [`Error::Connection`](crate::Error::Connection) or
/// [`Error::Io`](crate::Error::Io).
pub trait MailboxTransport: Send {
    /// Selects a folder, read-only when `read_only` is set.
    fn select_folder(
        &mut self,
        folder: &str,
        read_only: bool,
    ) -> impl Future<Output = Result<SelectedFolder>> + Send;

    /// Fetches data items for the given messages.
    fn fetch(
        &mut self,
        items: &[FetchItem],
        ids: &IdSet,
        by_uid: bool,
    ) -> impl Future<Output = Result<Vec<FetchResult>>> + Send;

    /// Searches the selected folder.
    ///
    /// Criteria are rendered with [`SearchCriteria::to_wire`]; literals
    /// suit servers that advertise `LITERAL+`.
    fn search(
        &mut self,
        criteria: &SearchCriteria,
        by_uid: bool,
        charset: Option<&str>,
    ) -> impl Future<Output = Result<Vec<u32>>> + Send;

    /// Searches and sorts the selected folder on the server.
    fn sort(
        &mut self,
        keys: &[SortKey],
        criteria: &SearchCriteria,
        by_uid: bool,
    ) -> impl Future<Output = Result<Vec<u32>>> + Send;

    /// Threads the selected folder on the server.
    fn thread(
        &mut self,
        algorithm: ThreadAlgorithm,
        criteria: Option<&SearchCriteria>,
        by_uid: bool,
    ) -> impl Future<Output = Result<Vec<ThreadNode>>> + Send;

    /// Changes flags on messages of the selected folder.
    fn store_flags(
        &mut self,
        ids: &IdSet,
        by_uid: bool,
        flags: &[Flag],
        action: StoreAction,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Expunges deleted messages, limited to `ids` when given.
    fn expunge(
        &mut self,
        ids: Option<&IdSet>,
        by_uid: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Copies messages of the selected folder into `destination`.
    fn copy(
        &mut self,
        ids: &IdSet,
        by_uid: bool,
        destination: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Appends a message; returns its UID when the server reports one.
    fn append(
        &mut self,
        folder: &str,
        message: &[u8],
        flags: &[Flag],
    ) -> impl Future<Output = Result<Option<u32>>> + Send;

    /// Lists folders matching `pattern` under `reference`.
    fn list_folders(
        &mut self,
        reference: &str,
        pattern: &str,
    ) -> impl Future<Output = Result<Vec<ListedFolder>>> + Send;

    /// Lists subscribed folders matching `pattern` under `reference`.
    fn list_subscribed(
        &mut self,
        reference: &str,
        pattern: &str,
    ) -> impl Future<Output = Result<Vec<ListedFolder>>> + Send;

    /// Queries folder status without selecting it.
    fn folder_status(
        &mut self,
        folder: &str,
        fields: &[StatusField],
    ) -> impl Future<Output = Result<FolderStatus>> + Send;

    /// Creates a folder.
    fn create_folder(&mut self, folder: &str) -> impl Future<Output = Result<()>> + Send;

    /// Renames a folder.
    fn rename_folder(&mut self, from: &str, to: &str)
    -> impl Future<Output = Result<()>> + Send;

    /// Deletes a folder.
    fn delete_folder(&mut self, folder: &str) -> impl Future<Output = Result<()>> + Send;

    /// Subscribes to a folder.
    fn subscribe(&mut self, folder: &str) -> impl Future<Output = Result<()>> + Send;

    /// Unsubscribes from a folder.
    fn unsubscribe(&mut self, folder: &str) -> impl Future<Output = Result<()>> + Send;

    /// Root quota of the current user, if the server has one.
    fn quota(&mut self) -> impl Future<Output = Result<Option<Quota>>> + Send;

    /// Returns true if the server advertised the capability.
    fn capability_supported(&self, name: &str) -> bool;

    /// Identity of this connection.
    fn endpoint(&self) -> Endpoint;
}
