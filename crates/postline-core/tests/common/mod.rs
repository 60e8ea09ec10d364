//! Scripted mailbox transport shared by the integration tests.
//!
//! Folder state and command outcomes are set up front; every command the
//! session issues is recorded as a short line in `calls`.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use postline_core::transport::{
    FetchItem, FetchResult, Flag, FolderStatus, Headers, IdSet, ListedFolder, Quota,
    SelectedFolder, SortKey, StatusField, StoreAction, ThreadAlgorithm, ThreadNode,
};
use postline_core::{Endpoint, Error, MailboxTransport, Result, SearchCriteria};

/// Routes session logs to the test output; filter with `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postline_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

#[derive(Debug, Default)]
pub struct MockTransport {
    pub capabilities: Vec<String>,
    pub status: FolderStatus,
    pub selected: SelectedFolder,
    pub messages: Vec<FetchResult>,
    pub search_replies: VecDeque<Result<Vec<u32>>>,
    pub sort_reply: Vec<u32>,
    pub thread_replies: VecDeque<Result<Vec<ThreadNode>>>,
    pub listings: HashMap<(String, String), Vec<ListedFolder>>,
    pub subscriptions: HashMap<(String, String), Vec<ListedFolder>>,
    pub append_uid: Option<u32>,
    pub quota: Option<Quota>,
    pub calls: Vec<String>,
}

impl MockTransport {
    /// A folder holding `count` messages with sequence numbers `1..=count`
    /// and UIDs ten times their sequence number.
    pub fn with_messages(count: u32) -> Self {
        let messages = (1..=count)
            .map(|seq| message(seq, seq * 10, &format!("Message {seq}")))
            .collect();
        Self {
            status: FolderStatus {
                messages: Some(count),
                unseen: Some(1),
                uid_next: Some(count * 10 + 1),
                uid_validity: Some(1),
            },
            selected: SelectedFolder {
                exists: count,
                permanent_flags: vec![Flag::Seen, Flag::Flagged, Flag::Deleted],
                ..SelectedFolder::default()
            },
            messages,
            ..Self::default()
        }
    }

    pub fn capability(mut self, name: &str) -> Self {
        self.capabilities.push(name.to_string());
        self
    }

    pub fn listing(mut self, reference: &str, pattern: &str, folders: &[(&str, char)]) -> Self {
        self.listings
            .insert(key(reference, pattern), listed(folders));
        self
    }

    pub fn subscribed(mut self, reference: &str, pattern: &str, folders: &[(&str, char)]) -> Self {
        self.subscriptions
            .insert(key(reference, pattern), listed(folders));
        self
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn matching(&self, ids: &IdSet, by_uid: bool) -> Vec<FetchResult> {
        self.messages
            .iter()
            .filter(|m| {
                let id = if by_uid { m.uid.unwrap_or_default() } else { m.seq };
                match ids {
                    IdSet::List(list) => list.contains(&id),
                    IdSet::From(first) => id >= *first,
                    IdSet::All => true,
                }
            })
            .cloned()
            .collect()
    }
}

pub fn message(seq: u32, uid: u32, subject: &str) -> FetchResult {
    FetchResult {
        seq,
        uid: Some(uid),
        size: Some(1024),
        headers: Headers::new()
            .with("Subject", subject)
            .with("From", "alice@example.com")
            .with("Message-ID", format!("<{uid}@example.com>")),
        ..FetchResult::default()
    }
}

pub fn negative(command: &str) -> Error {
    Error::NegativeReply {
        command: command.to_string(),
        lines: vec![format!("A1 NO {command} failed")],
    }
}

fn key(reference: &str, pattern: &str) -> (String, String) {
    (reference.to_string(), pattern.to_string())
}

fn listed(folders: &[(&str, char)]) -> Vec<ListedFolder> {
    folders
        .iter()
        .map(|(name, delimiter)| ListedFolder::new(*name, Some(*delimiter)))
        .collect()
}

impl MailboxTransport for MockTransport {
    async fn select_folder(&mut self, folder: &str, read_only: bool) -> Result<SelectedFolder> {
        let mode = if read_only { "ro" } else { "rw" };
        self.calls.push(format!("SELECT {folder} {mode}"));
        let mut selected = self.selected.clone();
        selected.read_only = read_only;
        Ok(selected)
    }

    async fn fetch(&mut self, items: &[FetchItem], ids: &IdSet, by_uid: bool) -> Result<Vec<FetchResult>> {
        let mode = if by_uid { "uid" } else { "seq" };
        self.calls
            .push(format!("FETCH {mode} {ids} {}", items.len()));
        Ok(self.matching(ids, by_uid))
    }

    async fn search(
        &mut self,
        criteria: &SearchCriteria,
        _by_uid: bool,
        charset: Option<&str>,
    ) -> Result<Vec<u32>> {
        self.calls.push(format!(
            "SEARCH {} {criteria}",
            charset.unwrap_or("-")
        ));
        self.search_replies.pop_front().unwrap_or_else(|| {
            Ok(self.messages.iter().filter_map(|m| m.uid).collect())
        })
    }

    async fn sort(&mut self, keys: &[SortKey], criteria: &SearchCriteria, _by_uid: bool) -> Result<Vec<u32>> {
        self.calls.push(format!("SORT {keys:?} {criteria}"));
        Ok(self.sort_reply.clone())
    }

    async fn thread(
        &mut self,
        algorithm: ThreadAlgorithm,
        criteria: Option<&SearchCriteria>,
        _by_uid: bool,
    ) -> Result<Vec<ThreadNode>> {
        let criteria = criteria.map_or_else(|| "-".to_string(), ToString::to_string);
        self.calls.push(format!("THREAD {algorithm:?} {criteria}"));
        self.thread_replies.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn store_flags(
        &mut self,
        ids: &IdSet,
        by_uid: bool,
        flags: &[Flag],
        action: StoreAction,
    ) -> Result<()> {
        let mode = if by_uid { "uid" } else { "seq" };
        let flags: Vec<&str> = flags.iter().map(Flag::as_str).collect();
        self.calls
            .push(format!("STORE {mode} {ids} {action:?} {}", flags.join(" ")));
        Ok(())
    }

    async fn expunge(&mut self, ids: Option<&IdSet>, _by_uid: bool) -> Result<()> {
        let ids = ids.map_or_else(|| "-".to_string(), ToString::to_string);
        self.calls.push(format!("EXPUNGE {ids}"));
        Ok(())
    }

    async fn copy(&mut self, ids: &IdSet, _by_uid: bool, destination: &str) -> Result<()> {
        self.calls.push(format!("COPY {ids} {destination}"));
        Ok(())
    }

    async fn append(&mut self, folder: &str, message: &[u8], _flags: &[Flag]) -> Result<Option<u32>> {
        self.calls
            .push(format!("APPEND {folder} {}", message.len()));
        Ok(self.append_uid)
    }

    async fn list_folders(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListedFolder>> {
        self.calls.push(format!("LIST {reference:?} {pattern:?}"));
        Ok(self
            .listings
            .get(&key(reference, pattern))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_subscribed(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListedFolder>> {
        self.calls.push(format!("LSUB {reference:?} {pattern:?}"));
        Ok(self
            .subscriptions
            .get(&key(reference, pattern))
            .cloned()
            .unwrap_or_default())
    }

    async fn folder_status(&mut self, folder: &str, _fields: &[StatusField]) -> Result<FolderStatus> {
        self.calls.push(format!("STATUS {folder}"));
        Ok(self.status.clone())
    }

    async fn create_folder(&mut self, folder: &str) -> Result<()> {
        self.calls.push(format!("CREATE {folder}"));
        Ok(())
    }

    async fn rename_folder(&mut self, from: &str, to: &str) -> Result<()> {
        self.calls.push(format!("RENAME {from} {to}"));
        Ok(())
    }

    async fn delete_folder(&mut self, folder: &str) -> Result<()> {
        self.calls.push(format!("DELETE {folder}"));
        Ok(())
    }

    async fn subscribe(&mut self, folder: &str) -> Result<()> {
        self.calls.push(format!("SUBSCRIBE {folder}"));
        Ok(())
    }

    async fn unsubscribe(&mut self, folder: &str) -> Result<()> {
        self.calls.push(format!("UNSUBSCRIBE {folder}"));
        Ok(())
    }

    async fn quota(&mut self) -> Result<Option<Quota>> {
        self.calls.push("QUOTA".to_string());
        Ok(self.quota)
    }

    fn capability_supported(&self, name: &str) -> bool {
        self.capabilities
            .iter()
            .any(|c| c.eq_ignore_ascii_case(name))
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint {
            user: "alice".into(),
            host: "imap.example.com".into(),
            port: 993,
        }
    }
}
